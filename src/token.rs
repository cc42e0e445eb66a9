//! Stateless passage tokens.
//!
//! A token is three lowercase hex fields joined by `|`:
//!
//! ```text
//! <level: 1 byte>|<expires_at: u64 LE>|<hmac-sha256>
//! ```
//!
//! The HMAC covers `host || address octets || level || expires_at`, with
//! the address always written as 16 octets. The level and expiry are read
//! back from the token itself when verifying, so the signature is their
//! only binding.

use sha2::digest::Update;
use subtle::ConstantTimeEq;

use crate::berghain::Berghain;
use crate::error::ValidationError;
use crate::identity::RequestIdentifier;
use crate::level::LevelConfig;
use crate::pool::{ByteReader, ScratchBuffer, DIGEST_LEN};

/// Field separator.
pub const SEPARATOR: u8 = b'|';

const LEVEL_HEX_LEN: usize = 2;
const EXPIRES_HEX_LEN: usize = 16;
const SUM_HEX_LEN: usize = DIGEST_LEN * 2;

/// Exact length of an encoded token.
pub const ENCODED_TOKEN_LEN: usize = LEVEL_HEX_LEN + 1 + EXPIRES_HEX_LEN + 1 + SUM_HEX_LEN;

/// Hex-encodes `bytes` at the write cursor of `out`.
pub(crate) fn encode_hex_into(out: &mut ScratchBuffer, bytes: &[u8]) -> Result<(), ValidationError> {
    let dst = out.write_n(bytes.len() * 2)?;
    hex::encode_to_slice(bytes, dst)?;
    Ok(())
}

/// Decodes `src` into `dst`, accepting only lowercase hex.
///
/// `hex` alone also takes uppercase digits, which would give every byte
/// two valid spellings.
pub(crate) fn decode_lower_hex(src: &[u8], dst: &mut [u8]) -> Result<(), ValidationError> {
    if !src.iter().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return Err(ValidationError::Malformed);
    }
    hex::decode_to_slice(src, dst)?;
    Ok(())
}

fn decode_field<'b>(scratch: &'b mut ScratchBuffer, src: &[u8]) -> Result<&'b [u8], ValidationError> {
    let dst = scratch.write_n(src.len() / 2)?;
    decode_lower_hex(src, dst)?;
    Ok(dst)
}

impl Berghain {
    /// Issues a token for `id`, valid for `level.duration` from now, and
    /// appends it to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::BufferOverflow`] when `out` cannot hold
    /// [`ENCODED_TOKEN_LEN`] more bytes.
    pub fn issue_token(
        &self,
        id: &RequestIdentifier<'_>,
        level: &LevelConfig,
        out: &mut ScratchBuffer,
    ) -> Result<(), ValidationError> {
        let expires_at = self.clock().expires_at(level.duration).to_le_bytes();

        let mut mac = self.keyed.acquire();
        id.write_identity_digest(&mut *mac);
        mac.update(&expires_at);
        let sum = mac.finalize_reset();

        encode_hex_into(out, &[id.level])?;
        out.write(&[SEPARATOR])?;
        encode_hex_into(out, &expires_at)?;
        out.write(&[SEPARATOR])?;
        encode_hex_into(out, &sum)
    }

    /// Verifies `token` against `id`.
    ///
    /// A token is accepted for its embedded level and for every lower one.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::Empty`] when no token was presented
    /// - [`ValidationError::InvalidLength`] when it is not [`ENCODED_TOKEN_LEN`] bytes
    /// - [`ValidationError::LevelTooLow`] when `id.level` exceeds the embedded level
    /// - [`ValidationError::Expired`] when the embedded expiry has passed
    /// - [`ValidationError::InvalidHmac`] when the signature does not match
    /// - [`ValidationError::Malformed`] on bad hex or separators
    pub fn verify_token(&self, id: &RequestIdentifier<'_>, token: &[u8]) -> Result<(), ValidationError> {
        if token.is_empty() {
            return Err(ValidationError::Empty);
        }
        if token.len() != ENCODED_TOKEN_LEN {
            return Err(ValidationError::InvalidLength);
        }

        let mut reader = ByteReader::new(token);
        let mut scratch = self.scratch.acquire();
        let mut mac = self.keyed.acquire();
        id.write_host_and_addr(&mut *mac);

        let level = match decode_field(&mut scratch, reader.read_n(LEVEL_HEX_LEN)?)? {
            [level] => *level,
            _ => return Err(ValidationError::Malformed),
        };
        if id.level > level {
            return Err(ValidationError::LevelTooLow);
        }
        mac.update(&[level]);
        reader.expect_separator(SEPARATOR)?;

        let expires_at: [u8; 8] = decode_field(&mut scratch, reader.read_n(EXPIRES_HEX_LEN)?)?
            .try_into()
            .map_err(|_| ValidationError::Malformed)?;
        if self.clock().unix_seconds() > u64::from_le_bytes(expires_at) {
            return Err(ValidationError::Expired);
        }
        mac.update(&expires_at);
        reader.expect_separator(SEPARATOR)?;

        let expected = mac.finalize_reset();
        let sum = decode_field(&mut scratch, reader.read_n(SUM_HEX_LEN)?)?;
        if bool::from(expected.as_slice().ct_eq(sum)) {
            Ok(())
        } else {
            Err(ValidationError::InvalidHmac)
        }
    }
}
