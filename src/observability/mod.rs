//! Observability Module
//!
//! Provides tracing subscriber setup and Prometheus counters for
//! validation outcomes.

pub mod logging;
pub mod metrics;

pub use logging::{init_tracing, LogFormat, TracingConfig};
pub use metrics::BerghainMetrics;
