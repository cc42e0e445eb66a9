//! Validation error kinds.
//!
//! Every kind is local to one call. None of them is process-fatal: the
//! caller decides whether to re-issue a challenge, answer with a 4xx or
//! silently drop the request.

use thiserror::Error;

/// Error returned by token verification and by the validators.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// No token was presented
    #[error("empty")]
    Empty,

    /// Token or challenge solution has the wrong byte length
    #[error("invalid length")]
    InvalidLength,

    /// Token was granted for a lower level than the requested one
    #[error("cookie level too low")]
    LevelTooLow,

    /// Embedded expiration has passed
    #[error("expired")]
    Expired,

    /// Signature does not match the recomputed one
    #[error("invalid hmac")]
    InvalidHmac,

    /// Proof-of-work difficulty target not met
    #[error("invalid solution")]
    InvalidSolution,

    /// Unsupported HTTP method for the challenge endpoint
    #[error("invalid method")]
    InvalidMethod,

    /// Validation type outside of the known set
    #[error("unknown validation type")]
    UnknownValidationType,

    /// Non-canonical hex or a missing separator
    #[error("malformed encoding")]
    Malformed,

    /// Scratch buffer capacity exceeded while writing
    #[error("scratch buffer overflow")]
    BufferOverflow,
}

impl ValidationError {
    /// Stable machine-readable code, suitable for metric labels.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Empty => "BERGHAIN_TOKEN_EMPTY",
            Self::InvalidLength => "BERGHAIN_INVALID_LENGTH",
            Self::LevelTooLow => "BERGHAIN_LEVEL_TOO_LOW",
            Self::Expired => "BERGHAIN_EXPIRED",
            Self::InvalidHmac => "BERGHAIN_INVALID_HMAC",
            Self::InvalidSolution => "BERGHAIN_INVALID_SOLUTION",
            Self::InvalidMethod => "BERGHAIN_INVALID_METHOD",
            Self::UnknownValidationType => "BERGHAIN_UNKNOWN_VALIDATION_TYPE",
            Self::Malformed => "BERGHAIN_MALFORMED",
            Self::BufferOverflow => "BERGHAIN_BUFFER_OVERFLOW",
        }
    }

    /// Whether the error points at tampered input rather than a stale or
    /// missing token.
    #[must_use]
    pub const fn is_tampering(&self) -> bool {
        matches!(self, Self::InvalidHmac | Self::Malformed)
    }

    /// An absent token is the normal state of a client that has not been
    /// validated yet.
    #[must_use]
    pub const fn is_benign(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Whether the client should be sent through validation again.
    #[must_use]
    pub const fn requires_revalidation(&self) -> bool {
        matches!(self, Self::Empty | Self::LevelTooLow | Self::Expired)
    }
}

impl From<hex::FromHexError> for ValidationError {
    fn from(_: hex::FromHexError) -> Self {
        Self::Malformed
    }
}
