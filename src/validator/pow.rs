//! Stateless proof-of-work challenge.
//!
//! GET hands out a nonce and a proof. The nonce is the hex-encoded expiry
//! of the challenge and the proof is `HMAC(identity || nonce)`, so the
//! server keeps no record of what it issued. POST takes back
//! `nonce-proof-solution` and accepts it when the proof still matches the
//! requesting identity, the nonce has not expired and
//! `SHA256(nonce || solution)` starts with [`DIFFICULTY_ZERO_BYTES`] zero
//! bytes.

use sha2::digest::Update;
use subtle::ConstantTimeEq;

use super::{write_body_head, Method, ValidatorRequest, ValidatorResponse};
use crate::berghain::Berghain;
use crate::error::ValidationError;
use crate::level::LevelConfig;
use crate::pool::{ByteReader, DIGEST_LEN};
use crate::token::{decode_lower_hex, encode_hex_into};

/// Value of `"t"` in the body.
pub const KIND: u8 = 1;

/// Length of the hex nonce.
pub const NONCE_HEX_LEN: usize = 16;

/// Length of the hex proof.
pub const PROOF_HEX_LEN: usize = DIGEST_LEN * 2;

/// A solution body must be longer than this.
pub const MIN_SOLUTION_LEN: usize = NONCE_HEX_LEN + 1 + PROOF_HEX_LEN + 1;

/// Most digits accepted in the solution number.
pub const MAX_SOLUTION_DIGITS: usize = 20;

/// Leading zero bytes required of the work digest.
pub const DIFFICULTY_ZERO_BYTES: usize = 2;

/// Separator between the fields of a solution.
pub const SEPARATOR: u8 = b'-';

/// Whether `digest` meets the difficulty target.
#[must_use]
pub fn meets_difficulty(digest: &[u8]) -> bool {
    digest.len() >= DIFFICULTY_ZERO_BYTES && digest[..DIFFICULTY_ZERO_BYTES].iter().all(|b| *b == 0)
}

pub(crate) fn run(
    engine: &Berghain,
    level: &LevelConfig,
    req: &ValidatorRequest<'_>,
    resp: &mut ValidatorResponse,
) -> Result<(), ValidationError> {
    match req.method {
        Method::Get => issue_challenge(engine, level, req, resp),
        Method::Post => {
            verify_solution(engine, req)?;
            engine.issue_token(&req.identifier, level, &mut resp.token)
        }
        Method::Other => Err(ValidationError::InvalidMethod),
    }
}

fn issue_challenge(
    engine: &Berghain,
    level: &LevelConfig,
    req: &ValidatorRequest<'_>,
    resp: &mut ValidatorResponse,
) -> Result<(), ValidationError> {
    let expires_at = engine.clock().expires_at(level.duration).to_le_bytes();
    let mut nonce = [0u8; NONCE_HEX_LEN];
    hex::encode_to_slice(expires_at, &mut nonce)?;

    let mut mac = engine.keyed.acquire();
    req.identifier.write_identity_digest(&mut *mac);
    mac.update(&nonce);
    let proof = mac.finalize_reset();

    let body = &mut resp.body;
    write_body_head(body, level, KIND)?;
    body.write(b", \"r\": \"")?;
    body.write(&nonce)?;
    body.write(b"\", \"s\": \"")?;
    encode_hex_into(body, &proof)?;
    body.write(b"\"}")?;
    Ok(())
}

fn verify_solution(engine: &Berghain, req: &ValidatorRequest<'_>) -> Result<(), ValidationError> {
    if req.body.len() <= MIN_SOLUTION_LEN {
        return Err(ValidationError::InvalidLength);
    }

    let mut reader = ByteReader::new(req.body);
    let nonce = reader.read_n(NONCE_HEX_LEN)?;
    reader.expect_separator(SEPARATOR)?;
    let proof = reader.read_n(PROOF_HEX_LEN)?;
    reader.expect_separator(SEPARATOR)?;
    let solution = reader.rest();

    let mut mac = engine.keyed.acquire();
    req.identifier.write_identity_digest(&mut *mac);
    mac.update(nonce);
    let expected = mac.finalize_reset();

    let mut scratch = engine.scratch.acquire();
    encode_hex_into(&mut scratch, &expected)?;
    if !bool::from(scratch.readable().ct_eq(proof)) {
        return Err(ValidationError::InvalidHmac);
    }

    let mut expires_at = [0u8; 8];
    decode_lower_hex(nonce, &mut expires_at)?;
    if engine.clock().unix_seconds() > u64::from_le_bytes(expires_at) {
        return Err(ValidationError::Expired);
    }

    if solution.len() > MAX_SOLUTION_DIGITS || !solution.iter().all(u8::is_ascii_digit) {
        return Err(ValidationError::InvalidSolution);
    }

    let mut sha = engine.plain.acquire();
    sha.update(nonce);
    sha.update(solution);
    if meets_difficulty(&sha.finalize_reset()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidSolution)
    }
}
