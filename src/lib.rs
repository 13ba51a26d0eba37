//! kparam-check
//!
//! A conformance harness for the runtime parameters of a loaded kernel
//! module. It writes valid and invalid values to the module's parameters,
//! re-reads them, inspects the kernel log and asserts the module enforces
//! its documented contract.
//!
//! # Layering
//!
//! - [`accessor`]: stateless gateway to the module (sysfs parameters, module
//!   registry, kernel log, privileged writes).
//! - [`orchestrator`]: runs [`scenario`]s one at a time through
//!   snapshot, act, settle, observe, evaluate, restore, and builds a
//!   [`report::TestReport`].
//!
//! The orchestrator only sees the [`accessor::ParameterStore`] trait, so any
//! store can be injected in place of the live module.

pub mod accessor;
pub mod cli;
pub mod config;
pub mod orchestrator;
pub mod param;
pub mod report;
pub mod scenario;
pub mod telemetry;

pub use accessor::{AccessError, AccessorConfig, LogWindow, ParameterStore};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use param::ParamName;
pub use report::{TestReport, TestResult};
pub use scenario::{Observation, Scenario};
