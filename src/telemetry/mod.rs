//! Telemetry for the harness.
//!
//! Structured logging to stderr or a file, and counters through the
//! `metrics` facade.

mod logging;
mod metrics;

pub use logging::{init_logging, LogConfig, LogError, LogFormat};
pub use self::metrics::{record_restore_failure, record_scenario_outcome, record_transport_failure};
