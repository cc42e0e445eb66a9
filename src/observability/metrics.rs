//! Validation Metrics
//!
//! Prometheus counters for token checks and challenge runs, labelled by
//! frontend and outcome.

use prometheus::{CounterVec, Opts, Registry};

use crate::error::ValidationError;
use crate::level::ValidationType;

/// Outcome label of a successful check.
pub const OUTCOME_OK: &str = "ok";

/// Outcome label of a request on a disabled level.
pub const OUTCOME_DISABLED: &str = "disabled";

/// Label value for `result`.
#[must_use]
pub fn outcome_label(result: Result<(), ValidationError>) -> &'static str {
    match result {
        Ok(()) => OUTCOME_OK,
        Err(e) => e.code(),
    }
}

/// Berghain metrics
#[derive(Debug, Clone)]
pub struct BerghainMetrics {
    /// Token verifications
    pub validations: CounterVec,
    /// Validator runs
    pub challenges: CounterVec,
}

impl BerghainMetrics {
    /// Creates and registers the counters.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let validations = CounterVec::new(
            Opts::new("validations_total", "Total token validations").namespace("berghain"),
            &["frontend", "outcome"],
        )?;
        registry.register(Box::new(validations.clone()))?;

        let challenges = CounterVec::new(
            Opts::new("challenges_total", "Total validator runs").namespace("berghain"),
            &["frontend", "validator", "outcome"],
        )?;
        registry.register(Box::new(challenges.clone()))?;

        Ok(Self {
            validations,
            challenges,
        })
    }

    /// Records a token validation
    pub fn record_validation(&self, frontend: &str, outcome: &str) {
        self.validations
            .with_label_values(&[frontend, outcome])
            .inc();
    }

    /// Records a validator run
    pub fn record_challenge(&self, frontend: &str, validator: ValidationType, outcome: &str) {
        self.challenges
            .with_label_values(&[frontend, validator.as_str(), outcome])
            .inc();
    }
}
