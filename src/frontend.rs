//! Request handlers over decoded proxy fields.
//!
//! The proxy sends two kinds of messages: a token check and a challenge
//! run. Both arrive here already decoded. A [`Frontend`] answers them
//! with one engine, an [`Instance`] routes them to a frontend by name.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::berghain::Berghain;
use crate::error::ValidationError;
use crate::identity::{addr_from_octets, RequestIdentifier, MAX_HOST_LEN};
use crate::observability::metrics::{outcome_label, BerghainMetrics, OUTCOME_DISABLED};
use crate::validator::{Method, ValidatorRequest};

/// Name of the frontend used when none matches.
pub const DEFAULT_FRONTEND: &str = "default";

/// Rejection of decoded fields before any validation runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrontendError {
    /// Source address is neither 4 nor 16 bytes
    #[error("invalid source address length {0}")]
    InvalidAddress(usize),

    /// Host exceeds [`MAX_HOST_LEN`]
    #[error("host too long: {0} bytes")]
    HostTooLong(usize),

    /// Method other than GET or POST
    #[error("unsupported request method")]
    UnsupportedMethod,
}

/// Fields of a token check.
#[derive(Debug, Clone, Copy)]
pub struct ValidateFields<'a> {
    /// Requested level, 0 disables validation
    pub level: u8,
    /// Raw source address octets
    pub src: &'a [u8],
    /// Requested host
    pub host: &'a [u8],
    /// Token presented by the client, possibly empty
    pub cookie: &'a [u8],
}

/// Fields of a challenge run.
#[derive(Debug, Clone, Copy)]
pub struct ChallengeFields<'a> {
    /// Requested level, 0 disables validation
    pub level: u8,
    /// Raw source address octets
    pub src: &'a [u8],
    /// Requested host
    pub host: &'a [u8],
    /// HTTP method
    pub method: &'a [u8],
    /// HTTP body
    pub body: &'a [u8],
}

/// Answer to a token check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Level 0, nothing was checked
    Disabled,
    /// Token accepted
    Valid,
    /// Token rejected
    Invalid(ValidationError),
}

impl Verdict {
    /// The flag handed back to the proxy.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Disabled | Self::Valid)
    }
}

/// Answer to a challenge run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeReply {
    /// Body to forward to the client
    pub body: Vec<u8>,
    /// Token to set, when one was issued
    pub token: Option<Vec<u8>>,
    /// Result of the validator
    pub outcome: Result<(), ValidationError>,
}

/// One named engine.
#[derive(Debug)]
pub struct Frontend {
    name: String,
    engine: Berghain,
    metrics: Option<Arc<BerghainMetrics>>,
}

impl Frontend {
    /// Creates a frontend.
    #[must_use]
    pub fn new(name: impl Into<String>, engine: Berghain) -> Self {
        Self {
            name: name.into(),
            engine,
            metrics: None,
        }
    }

    /// Records outcomes into `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<BerghainMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Frontend name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Underlying engine.
    #[must_use]
    pub fn engine(&self) -> &Berghain {
        &self.engine
    }

    /// Checks the token of a request.
    ///
    /// # Errors
    ///
    /// Returns [`FrontendError`] when the address or host are unusable.
    pub fn validate(&self, fields: &ValidateFields<'_>) -> Result<Verdict, FrontendError> {
        if fields.level == 0 {
            self.record_validation(OUTCOME_DISABLED);
            return Ok(Verdict::Disabled);
        }
        let id = identifier(fields.src, fields.host, fields.level)?;

        let result = self.engine.verify_token(&id, fields.cookie);
        self.record_validation(outcome_label(result));
        match result {
            Ok(()) => Ok(Verdict::Valid),
            Err(e) => {
                if e.is_tampering() {
                    warn!(frontend = %self.name, level = fields.level, error = %e, "Token rejected");
                } else {
                    debug!(frontend = %self.name, level = fields.level, error = %e, "Token rejected");
                }
                Ok(Verdict::Invalid(e))
            }
        }
    }

    /// Runs the validator of the requested level.
    ///
    /// Returns `None` for level 0. Validator failures are reported in
    /// [`ChallengeReply::outcome`] together with whatever body was written.
    ///
    /// # Errors
    ///
    /// Returns [`FrontendError`] when the address, host or method are
    /// unusable.
    pub fn challenge(&self, fields: &ChallengeFields<'_>) -> Result<Option<ChallengeReply>, FrontendError> {
        if fields.level == 0 {
            return Ok(None);
        }
        let identifier = identifier(fields.src, fields.host, fields.level)?;
        let method = match Method::parse(fields.method) {
            Method::Other => return Err(FrontendError::UnsupportedMethod),
            method => method,
        };

        let req = ValidatorRequest {
            method,
            body: fields.body,
            identifier,
        };
        let validator = self.engine.level_config(fields.level).validation_type;
        let mut resp = self.engine.acquire_response();
        let outcome = self.engine.run_validator(&req, &mut resp);

        if let Some(metrics) = &self.metrics {
            metrics.record_challenge(&self.name, validator, outcome_label(outcome));
        }
        if let Err(e) = outcome {
            if e.is_tampering() {
                warn!(frontend = %self.name, level = fields.level, %validator, error = %e, "Challenge failed");
            } else {
                debug!(frontend = %self.name, level = fields.level, %validator, error = %e, "Challenge failed");
            }
        }

        let token = (!resp.token().is_empty()).then(|| resp.token().to_vec());
        Ok(Some(ChallengeReply {
            body: resp.body().to_vec(),
            token,
            outcome,
        }))
    }

    fn record_validation(&self, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_validation(&self.name, outcome);
        }
    }
}

fn identifier<'a>(src: &[u8], host: &'a [u8], level: u8) -> Result<RequestIdentifier<'a>, FrontendError> {
    let src_addr = addr_from_octets(src).ok_or(FrontendError::InvalidAddress(src.len()))?;
    if host.len() > MAX_HOST_LEN {
        return Err(FrontendError::HostTooLong(host.len()));
    }
    Ok(RequestIdentifier::new(src_addr, host, level))
}

/// Named frontends with a mandatory default.
#[derive(Debug)]
pub struct Instance {
    default: Frontend,
    named: HashMap<String, Frontend>,
}

impl Instance {
    /// Creates an instance routing everything to `default`.
    #[must_use]
    pub fn new(default: Frontend) -> Self {
        Self {
            default,
            named: HashMap::new(),
        }
    }

    /// Adds a named frontend, replacing one with the same name.
    #[must_use]
    pub fn with_frontend(mut self, frontend: Frontend) -> Self {
        self.named.insert(frontend.name.clone(), frontend);
        self
    }

    /// Attaches `metrics` to every frontend.
    #[must_use]
    pub fn with_metrics(mut self, metrics: &Arc<BerghainMetrics>) -> Self {
        self.default.metrics = Some(Arc::clone(metrics));
        for frontend in self.named.values_mut() {
            frontend.metrics = Some(Arc::clone(metrics));
        }
        self
    }

    /// Resolves a frontend by raw name. Unknown and non-UTF-8 names get the
    /// default.
    #[must_use]
    pub fn frontend(&self, name: &[u8]) -> &Frontend {
        std::str::from_utf8(name)
            .ok()
            .and_then(|name| self.named.get(name))
            .unwrap_or(&self.default)
    }

    /// The default frontend.
    #[must_use]
    pub fn default_frontend(&self) -> &Frontend {
        &self.default
    }

    /// Number of frontends, default included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.named.len() + 1
    }

    /// Always false, an instance has at least its default.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}
