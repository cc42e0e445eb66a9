//! Reusable HMAC-SHA256 and SHA-256 state.
//!
//! The keyed pool is built from one pre-keyed template, so handing out a
//! new hasher is a clone instead of a key schedule.

use hmac::{Hmac, Mac};
use sha2::digest::Update;
use sha2::{Digest, Sha256};

use super::{Pool, Reset};
use crate::secret::Secret;

/// Output size of the hash in bytes.
pub const DIGEST_LEN: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 bound to one secret.
#[derive(Clone)]
pub struct KeyedHasher {
    mac: HmacSha256,
}

impl KeyedHasher {
    /// Keys a new hasher with `secret`.
    #[must_use]
    pub fn new(secret: &Secret) -> Self {
        // HMAC accepts keys of any length.
        let mac = match HmacSha256::new_from_slice(secret.expose()) {
            Ok(mac) => mac,
            Err(_) => unreachable!("hmac accepts any key length"),
        };
        Self { mac }
    }

    /// Returns the tag of everything written so far and starts over.
    pub fn finalize_reset(&mut self) -> [u8; DIGEST_LEN] {
        let tag = Mac::finalize_reset(&mut self.mac).into_bytes();
        let mut out = [0; DIGEST_LEN];
        out.copy_from_slice(&tag);
        out
    }

    /// Builds a pool of hashers cloned from one keyed template.
    #[must_use]
    pub fn pool(secret: &Secret) -> Pool<Self> {
        let template = Self::new(secret);
        Pool::new(move || template.clone())
    }
}

impl Update for KeyedHasher {
    fn update(&mut self, data: &[u8]) {
        Mac::update(&mut self.mac, data);
    }
}

impl Reset for KeyedHasher {
    fn reset(&mut self) {
        Mac::reset(&mut self.mac);
    }
}

/// Plain SHA-256.
#[derive(Clone, Default)]
pub struct PlainHasher {
    sha: Sha256,
}

impl PlainHasher {
    /// Returns the digest of everything written so far and starts over.
    pub fn finalize_reset(&mut self) -> [u8; DIGEST_LEN] {
        let digest = Digest::finalize_reset(&mut self.sha);
        let mut out = [0; DIGEST_LEN];
        out.copy_from_slice(&digest);
        out
    }

    /// Builds a pool of plain hashers.
    #[must_use]
    pub fn pool() -> Pool<Self> {
        Pool::new(Self::default)
    }
}

impl Update for PlainHasher {
    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.sha, data);
    }
}

impl Reset for PlainHasher {
    fn reset(&mut self) {
        Digest::reset(&mut self.sha);
    }
}
