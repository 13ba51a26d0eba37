//! Run counters through the `metrics` facade.
//!
//! No recorder is installed by the harness itself; embedding tools may
//! install one before calling the orchestrator.

use ::metrics::counter;

use crate::param::ParamName;

pub fn record_scenario_outcome(passed: bool) {
    let outcome = if passed { "passed" } else { "failed" };
    counter!("kparam_scenarios_total", "outcome" => outcome).increment(1);
}

pub fn record_transport_failure(param: ParamName) {
    counter!("kparam_transport_failures_total", "param" => param.as_str()).increment(1);
}

pub fn record_restore_failure(param: ParamName) {
    counter!("kparam_restore_failures_total", "param" => param.as_str()).increment(1);
}
