//! HMAC secret.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::ConfigError;

/// Required secret length in bytes.
pub const SECRET_LEN: usize = 32;

/// Fixed-length binary secret. Wiped from memory when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret([u8; SECRET_LEN]);

impl Secret {
    /// Wraps raw key bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; SECRET_LEN]) -> Self {
        Self(bytes)
    }

    /// Copies a secret out of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSecretLength`] unless `bytes` is exactly
    /// [`SECRET_LEN`] long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        let arr: [u8; SECRET_LEN] =
            bytes
                .try_into()
                .map_err(|_| ConfigError::InvalidSecretLength {
                    expected: SECRET_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(arr))
    }

    /// Decodes a standard base64 secret.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSecret`] on bad base64 and
    /// [`ConfigError::InvalidSecretLength`] on a wrong decoded length.
    pub fn from_base64(encoded: &str) -> Result<Self, ConfigError> {
        let mut bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| ConfigError::InvalidSecret(e.to_string()))?;
        let secret = Self::from_slice(&bytes);
        bytes.zeroize();
        secret
    }

    pub(crate) fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice_requires_exact_length() {
        assert!(Secret::from_slice(&[0; SECRET_LEN]).is_ok());
        assert!(matches!(
            Secret::from_slice(&[0; 16]),
            Err(ConfigError::InvalidSecretLength {
                expected: 32,
                actual: 16
            })
        ));
    }

    #[test]
    fn test_from_base64() {
        let encoded = STANDARD.encode([9u8; SECRET_LEN]);
        let secret = Secret::from_base64(&encoded).unwrap();
        assert_eq!(secret.expose(), &[9u8; SECRET_LEN]);
    }

    #[test]
    fn test_from_base64_rejects_garbage() {
        assert!(matches!(
            Secret::from_base64("not base64!"),
            Err(ConfigError::InvalidSecret(_))
        ));
    }

    #[test]
    fn test_debug_is_redacted() {
        let secret = Secret::from_bytes([1; SECRET_LEN]);
        assert_eq!(format!("{secret:?}"), "Secret([REDACTED])");
    }
}
