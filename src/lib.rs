//! Berghain - stateless bot mitigation for reverse-proxy offload.
//!
//! This crate issues and verifies HMAC-signed passage tokens bound to a
//! client identity, and can gate issuance behind a proof-of-work
//! challenge. It holds no per-request state: everything a later request
//! needs travels in the token or the challenge.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod berghain;
pub mod clock;
pub mod config;
pub mod error;
pub mod frontend;
pub mod identity;
pub mod level;
pub mod observability;
pub mod pool;
pub mod secret;
pub mod token;
pub mod validator;

pub use berghain::Berghain;
pub use clock::{ApproximateClock, ClockRefresher};
pub use config::{Config, ConfigError};
pub use error::ValidationError;
pub use frontend::{ChallengeFields, ChallengeReply, Frontend, FrontendError, Instance, ValidateFields, Verdict};
pub use identity::RequestIdentifier;
pub use level::{Countdown, LevelConfig, ValidationType};
pub use secret::Secret;
pub use token::ENCODED_TOKEN_LEN;
pub use validator::{Method, ValidatorRequest, ValidatorResponse};
