//! End-to-end validator scenarios through the engine facade.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use berghain::secret::SECRET_LEN;
use berghain::validator::pow::{meets_difficulty, MIN_SOLUTION_LEN};
use berghain::{
    ApproximateClock, Berghain, Countdown, LevelConfig, Method, RequestIdentifier, Secret,
    ValidationError, ValidationType, ValidatorRequest,
};
use proptest::prelude::*;
use rand::RngCore;
use sha2::{Digest, Sha256};

fn random_secret() -> Secret {
    let mut bytes = [0u8; SECRET_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    Secret::from_bytes(bytes)
}

fn engine(levels: Vec<LevelConfig>) -> Berghain {
    Berghain::new(&random_secret(), levels, Arc::new(ApproximateClock::new())).unwrap()
}

fn pow_engine() -> Berghain {
    engine(vec![
        LevelConfig::new(Duration::from_secs(60), ValidationType::None),
        LevelConfig::new(Duration::from_secs(60), ValidationType::ProofOfWork),
    ])
}

fn json_field<'a>(body: &'a str, key: &str) -> &'a str {
    let marker = format!("\"{key}\": \"");
    let start = body.find(&marker).unwrap() + marker.len();
    let len = body[start..].find('"').unwrap();
    &body[start..start + len]
}

fn brute_force(nonce: &str) -> u64 {
    (0u64..)
        .find(|n| {
            let digest = Sha256::new()
                .chain_update(nonce)
                .chain_update(n.to_string())
                .finalize();
            meets_difficulty(&digest)
        })
        .unwrap()
}

fn get_challenge(engine: &Berghain, id: RequestIdentifier<'_>) -> String {
    let req = ValidatorRequest {
        method: Method::Get,
        body: b"",
        identifier: id,
    };
    let mut resp = engine.acquire_response();
    engine.run_validator(&req, &mut resp).unwrap();
    assert!(resp.token().is_empty(), "GET must not issue a token");
    String::from_utf8(resp.body().to_vec()).unwrap()
}

fn post_solution(
    engine: &Berghain,
    id: RequestIdentifier<'_>,
    body: &[u8],
) -> Result<Vec<u8>, ValidationError> {
    let req = ValidatorRequest {
        method: Method::Post,
        body,
        identifier: id,
    };
    let mut resp = engine.acquire_response();
    engine.run_validator(&req, &mut resp)?;
    Ok(resp.token().to_vec())
}

fn solved_body(engine: &Berghain, id: RequestIdentifier<'_>) -> String {
    let body = get_challenge(engine, id);
    let nonce = json_field(&body, "r");
    let proof = json_field(&body, "s");
    format!("{nonce}-{proof}-{}", brute_force(nonce))
}

#[test]
fn test_none_level_end_to_end() {
    let engine = engine(vec![LevelConfig::new(Duration::from_secs(60), ValidationType::None)
        .with_countdown(Countdown::new(3).unwrap())]);
    let id = RequestIdentifier::new(IpAddr::from([1, 2, 3, 4]), b"example.com", 1);
    let req = ValidatorRequest {
        method: Method::Get,
        body: b"",
        identifier: id,
    };

    let mut resp = engine.acquire_response();
    engine.run_validator(&req, &mut resp).unwrap();

    assert_eq!(resp.body(), b"{\"c\": 3, \"t\": 0}");
    assert_eq!(engine.verify_token(&id, resp.token()), Ok(()));
}

#[test]
fn test_none_level_ignores_method_and_body() {
    let engine = engine(vec![LevelConfig::new(Duration::from_secs(60), ValidationType::None)]);
    let id = RequestIdentifier::new(IpAddr::from([1, 2, 3, 4]), b"example.com", 1);
    let req = ValidatorRequest {
        method: Method::Other,
        body: b"whatever",
        identifier: id,
    };

    let mut resp = engine.acquire_response();
    assert_eq!(engine.run_validator(&req, &mut resp), Ok(()));
    assert!(!resp.token().is_empty());
}

#[test]
fn test_pow_end_to_end() {
    let engine = pow_engine();
    let id = RequestIdentifier::new(IpAddr::from([1, 2, 3, 4]), b"example.com", 2);

    let challenge = get_challenge(&engine, id);
    assert!(challenge.contains("\"t\": 1"), "{challenge}");
    assert_eq!(json_field(&challenge, "r").len(), 16);
    assert_eq!(json_field(&challenge, "s").len(), 64);

    let nonce = json_field(&challenge, "r");
    let proof = json_field(&challenge, "s");
    let body = format!("{nonce}-{proof}-{}", brute_force(nonce));
    assert!(body.len() > MIN_SOLUTION_LEN);

    let token = post_solution(&engine, id, body.as_bytes()).unwrap();
    assert_eq!(engine.verify_token(&id, &token), Ok(()));
    // A level 2 token also serves level 1.
    let lower = RequestIdentifier { level: 1, ..id };
    assert_eq!(engine.verify_token(&lower, &token), Ok(()));
}

#[test]
fn test_pow_replay_from_other_address_fails() {
    let engine = pow_engine();
    let id = RequestIdentifier::new(IpAddr::from([1, 2, 3, 4]), b"example.com", 2);
    let body = solved_body(&engine, id);

    let attacker = RequestIdentifier::new(IpAddr::from([5, 6, 7, 8]), b"example.com", 2);
    assert_eq!(
        post_solution(&engine, attacker, body.as_bytes()),
        Err(ValidationError::InvalidHmac)
    );
}

#[test]
fn test_pow_replay_for_other_host_fails() {
    let engine = pow_engine();
    let id = RequestIdentifier::new(IpAddr::from([1, 2, 3, 4]), b"example.com", 2);
    let body = solved_body(&engine, id);

    let other = RequestIdentifier::new(IpAddr::from([1, 2, 3, 4]), b"example.org", 2);
    assert_eq!(
        post_solution(&engine, other, body.as_bytes()),
        Err(ValidationError::InvalidHmac)
    );
}

#[test]
fn test_pow_replay_at_other_level_fails() {
    let engine = engine(vec![
        LevelConfig::new(Duration::from_secs(60), ValidationType::ProofOfWork),
        LevelConfig::new(Duration::from_secs(600), ValidationType::ProofOfWork),
    ]);
    let id = RequestIdentifier::new(IpAddr::from([1, 2, 3, 4]), b"example.com", 2);
    let body = solved_body(&engine, id);

    let lower = RequestIdentifier { level: 1, ..id };
    assert_eq!(
        post_solution(&engine, lower, body.as_bytes()),
        Err(ValidationError::InvalidHmac)
    );
}

#[test]
fn test_pow_token_does_not_transfer() {
    let engine = pow_engine();
    let id = RequestIdentifier::new(IpAddr::from([1, 2, 3, 4]), b"example.com", 2);
    let token = post_solution(&engine, id, solved_body(&engine, id).as_bytes()).unwrap();

    let other = RequestIdentifier::new(IpAddr::from([1, 2, 3, 5]), b"example.com", 2);
    assert_eq!(engine.verify_token(&other, &token), Err(ValidationError::InvalidHmac));
}

#[test]
fn test_pow_proof_mismatch_fails_even_when_work_is_valid() {
    let engine = pow_engine();
    let id = RequestIdentifier::new(IpAddr::from([1, 2, 3, 4]), b"example.com", 2);
    let challenge = get_challenge(&engine, id);
    let nonce = json_field(&challenge, "r");
    let forged = "0".repeat(64);
    let body = format!("{nonce}-{forged}-{}", brute_force(nonce));

    assert_eq!(
        post_solution(&engine, id, body.as_bytes()),
        Err(ValidationError::InvalidHmac)
    );
}

#[test]
fn test_pow_other_method() {
    let engine = pow_engine();
    let req = ValidatorRequest {
        method: Method::parse(b"PUT"),
        body: b"",
        identifier: RequestIdentifier::new(IpAddr::from([1, 2, 3, 4]), b"example.com", 2),
    };
    let mut resp = engine.acquire_response();
    assert_eq!(engine.run_validator(&req, &mut resp), Err(ValidationError::InvalidMethod));
}

#[test]
fn test_pow_expired_challenge() {
    let engine = pow_engine();
    let id = RequestIdentifier::new(IpAddr::from([1, 2, 3, 4]), b"example.com", 2);
    let body = solved_body(&engine, id);

    engine.clock().advance(Duration::from_secs(120));
    assert_eq!(
        post_solution(&engine, id, body.as_bytes()),
        Err(ValidationError::Expired)
    );
}

#[test]
fn test_concurrent_validation_is_independent() {
    let engine = Arc::new(engine(vec![LevelConfig::new(
        Duration::from_secs(60),
        ValidationType::None,
    )]));

    let handles: Vec<_> = (0..8u8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                let id = RequestIdentifier::new(IpAddr::from([10, 0, 0, i]), b"example.com", 1);
                let other = RequestIdentifier::new(IpAddr::from([10, 0, 1, i]), b"example.com", 1);
                for _ in 0..200 {
                    let req = ValidatorRequest {
                        method: Method::Get,
                        body: b"",
                        identifier: id,
                    };
                    let mut resp = engine.acquire_response();
                    engine.run_validator(&req, &mut resp).unwrap();
                    assert_eq!(engine.verify_token(&id, resp.token()), Ok(()));
                    assert_eq!(
                        engine.verify_token(&other, resp.token()),
                        Err(ValidationError::InvalidHmac)
                    );
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Bodies at or below the minimum length never reach the HMAC.
    #[test]
    fn prop_short_pow_body_is_invalid_length(body in prop::collection::vec(any::<u8>(), 0..=MIN_SOLUTION_LEN)) {
        let engine = pow_engine();
        let id = RequestIdentifier::new(IpAddr::from([1, 2, 3, 4]), b"example.com", 2);
        prop_assert_eq!(post_solution(&engine, id, &body), Err(ValidationError::InvalidLength));
    }

    /// Arbitrary solution bodies are never accepted.
    #[test]
    fn prop_garbage_pow_body_is_rejected(body in prop::collection::vec(any::<u8>(), MIN_SOLUTION_LEN + 1..200)) {
        let engine = pow_engine();
        let id = RequestIdentifier::new(IpAddr::from([1, 2, 3, 4]), b"example.com", 2);
        prop_assert!(post_solution(&engine, id, &body).is_err());
    }
}
