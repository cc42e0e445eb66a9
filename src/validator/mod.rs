//! Validation policies.
//!
//! A level selects one [`ValidationType`]. Running it fills a
//! [`ValidatorResponse`] with a body for the client and, once the client
//! has passed, a token.

pub mod none;
pub mod pow;

use crate::berghain::Berghain;
use crate::error::ValidationError;
use crate::identity::RequestIdentifier;
use crate::level::{LevelConfig, ValidationType};
use crate::pool::{Reset, ScratchBuffer};
use crate::token::ENCODED_TOKEN_LEN;

/// Capacity of a response body buffer.
pub const BODY_CAPACITY: usize = 256;

/// HTTP method of a challenge request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Fetch a challenge
    Get,
    /// Submit a solution
    Post,
    /// Anything else
    Other,
}

impl Method {
    /// Parses a method name. Matching is exact and case-sensitive.
    #[must_use]
    pub fn parse(raw: &[u8]) -> Self {
        match raw {
            b"GET" => Self::Get,
            b"POST" => Self::Post,
            _ => Self::Other,
        }
    }
}

/// Decoded challenge request.
#[derive(Debug, Clone, Copy)]
pub struct ValidatorRequest<'a> {
    /// Request method
    pub method: Method,
    /// Request body, empty for GET
    pub body: &'a [u8],
    /// Who is asking
    pub identifier: RequestIdentifier<'a>,
}

/// Output of one validator run.
#[derive(Debug, Clone)]
pub struct ValidatorResponse {
    pub(crate) body: ScratchBuffer,
    pub(crate) token: ScratchBuffer,
}

impl ValidatorResponse {
    /// Creates an empty response.
    #[must_use]
    pub fn new() -> Self {
        Self {
            body: ScratchBuffer::new(BODY_CAPACITY),
            token: ScratchBuffer::new(ENCODED_TOKEN_LEN),
        }
    }

    /// Body to forward to the client.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        self.body.readable()
    }

    /// Issued token, empty unless validation passed.
    #[must_use]
    pub fn token(&self) -> &[u8] {
        self.token.readable()
    }
}

impl Default for ValidatorResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl Reset for ValidatorResponse {
    fn reset(&mut self) {
        self.body.reset();
        self.token.reset();
    }
}

impl ValidationType {
    pub(crate) fn run(
        self,
        engine: &Berghain,
        level: &LevelConfig,
        req: &ValidatorRequest<'_>,
        resp: &mut ValidatorResponse,
    ) -> Result<(), ValidationError> {
        match self {
            Self::None => none::run(engine, level, req, resp),
            Self::ProofOfWork => pow::run(engine, level, req, resp),
        }
    }
}

/// Writes `{"c": <countdown>, "t": <kind>` without the closing brace.
pub(crate) fn write_body_head(
    body: &mut ScratchBuffer,
    level: &LevelConfig,
    kind: u8,
) -> Result<(), ValidationError> {
    body.write(b"{\"c\": ")?;
    body.write(&[level.countdown.as_ascii_digit()])?;
    body.write(b", \"t\": ")?;
    body.write(&[b'0' + kind])?;
    Ok(())
}
