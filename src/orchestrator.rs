//! Scenario sequencing: snapshot, act, settle, observe, evaluate, restore.
//!
//! Scenarios run strictly one at a time against the single live component.
//! The restore phase is the only isolation between them, so it is
//! synchronous and verified by re-reading every parameter it wrote.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::accessor::ParameterStore;
use crate::param::ParamName;
use crate::report::{RestoreFailure, RestoreOutcome, TestReport, TestResult, TransportRecord};
use crate::scenario::{EvalError, Observation, Predicate, Reading, Scenario, Snapshot, Step};
use crate::telemetry;

/// Timing of a run.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Pause before every observation so the component can update and log.
    pub settle_delay: Duration,
    /// Pause between scenarios.
    pub pause_between: Duration,
    /// Log lines included in the final state dump.
    pub final_log_lines: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(100),
            pause_between: Duration::from_millis(500),
            final_log_lines: 5,
        }
    }
}

/// Runs scenarios against an injected [`ParameterStore`].
pub struct Orchestrator<S> {
    store: S,
    config: OrchestratorConfig,
}

impl<S: ParameterStore> Orchestrator<S> {
    pub fn new(store: S, config: OrchestratorConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run every scenario in order and collect a report.
    pub async fn run(&self, scenarios: &[Scenario]) -> TestReport {
        self.run_with(scenarios, |_| {}).await
    }

    /// Like [`run`](Self::run), calling `on_result` as each scenario completes.
    pub async fn run_with<F>(&self, scenarios: &[Scenario], mut on_result: F) -> TestReport
    where
        F: FnMut(&TestResult),
    {
        let mut report = TestReport::new(self.store.component_name());

        if let Err(e) = self.store.clear_diagnostic_log().await {
            warn!(error = %e, "could not clear diagnostic log; windows may include older lines");
        }

        for (i, scenario) in scenarios.iter().enumerate() {
            let result = self.run_scenario(scenario).await;
            telemetry::record_scenario_outcome(result.passed);
            on_result(&result);
            report.push(result);

            if i + 1 < scenarios.len() && !self.config.pause_between.is_zero() {
                tokio::time::sleep(self.config.pause_between).await;
            }
        }

        let final_state = self.snapshot(&ParamName::ALL).await;
        let final_log = self
            .store
            .read_diagnostic_log_window(self.config.final_log_lines)
            .await;
        report.finish(final_state, final_log);

        info!(
            passed = report.passed(),
            total = report.total(),
            run_id = %report.run_id,
            "run complete"
        );
        report
    }

    /// Run one scenario through the full protocol.
    pub async fn run_scenario(&self, scenario: &Scenario) -> TestResult {
        info!(scenario = scenario.name, "starting scenario");

        let pre = self.snapshot(&scenario.observes).await;
        let mut observation = Observation {
            pre: pre.clone(),
            ..Default::default()
        };
        let mut writes = Vec::new();

        for step in &scenario.steps {
            match step {
                Step::Write { param, value } => {
                    let result = self.store.write_parameter(*param, value).await;
                    if let Err(e) = &result {
                        // Not evidence either way; the re-read decides.
                        info!(param = %param, value = %value, error = %e, "write not delivered");
                        telemetry::record_transport_failure(*param);
                    }
                    writes.push(TransportRecord::new(*param, value, &result));
                }
                Step::Checkpoint => {
                    self.settle().await;
                    observation
                        .checkpoints
                        .push(self.snapshot(&scenario.observes).await);
                }
            }
        }

        self.settle().await;
        observation.post = self.snapshot(&scenario.observes).await;
        observation.log = self
            .store
            .read_diagnostic_log_window(scenario.log_lines)
            .await;

        let verdict = evaluate(scenario.predicate, &observation);
        let restore = self.restore(&scenario.observes, &pre).await;

        let (passed, error) = match verdict {
            Ok(passed) => (passed, None),
            Err(e) => {
                warn!(scenario = scenario.name, error = %e, "predicate could not reach a verdict");
                (false, Some(e.to_string()))
            }
        };
        debug!(scenario = scenario.name, passed, "scenario finished");

        TestResult {
            name: scenario.name.to_string(),
            rationale: scenario.rationale.to_string(),
            passed,
            error,
            writes,
            observation,
            restore,
        }
    }

    /// Read every listed parameter. Failures are kept as readings.
    pub async fn snapshot(&self, params: &[ParamName]) -> Snapshot {
        let mut snapshot = Snapshot::default();
        for &param in params {
            let reading = Reading::from(self.store.read_parameter(param).await);
            if let Reading::Unobservable(reason) = &reading {
                warn!(param = %param, reason = %reason, "parameter unobservable");
            }
            snapshot.insert(param, reading);
        }
        snapshot
    }

    /// Put drifted parameters back, in order, verifying each by re-read
    /// after the settle delay.
    ///
    /// Parameters already equal to their snapshot are not written, since a
    /// redundant `ch_val` write would also store a character into `my_str`.
    async fn restore(&self, params: &[ParamName], pre: &Snapshot) -> RestoreOutcome {
        let mut outcome = RestoreOutcome::default();

        for &param in params {
            let current = self.store.read_parameter(param).await;

            let expected = match pre.value(param) {
                Ok(v) => v,
                Err(e) => {
                    outcome.failed.push(RestoreFailure {
                        param,
                        expected: None,
                        actual: current.ok(),
                        reason: format!("no snapshot to restore from: {}", e),
                    });
                    continue;
                }
            };

            match &current {
                Ok(cur) if cur == expected => continue,
                _ => {}
            }

            if !param.is_writable() {
                match current {
                    Ok(_) => {
                        warn!(param = %param, "read-only parameter left changed");
                        outcome.drifted_read_only.push(param);
                    }
                    Err(e) => outcome.failed.push(RestoreFailure {
                        param,
                        expected: Some(expected.to_string()),
                        actual: None,
                        reason: e.to_string(),
                    }),
                }
                continue;
            }

            let failure = match self.restore_one(param, expected).await {
                Ok(()) => {
                    outcome.restored.push(param);
                    continue;
                }
                Err(f) => f,
            };
            warn!(param = %param, reason = %failure.reason, "restore failed");
            telemetry::record_restore_failure(param);
            outcome.failed.push(failure);
        }

        outcome
    }

    async fn restore_one(&self, param: ParamName, expected: &str) -> Result<(), RestoreFailure> {
        let fail = |actual: Option<String>, reason: String| RestoreFailure {
            param,
            expected: Some(expected.to_string()),
            actual,
            reason,
        };

        let text = param.restore_text(expected).ok_or_else(|| {
            fail(None, format!("cannot derive a writable value from {:?}", expected))
        })?;

        self.store
            .write_parameter(param, &text)
            .await
            .map_err(|e| fail(None, format!("write not delivered: {}", e)))?;

        self.settle().await;
        match self.store.read_parameter(param).await {
            Ok(v) if v == expected => Ok(()),
            Ok(v) => Err(fail(Some(v), "value differs after restore".to_string())),
            Err(e) => Err(fail(None, format!("unobservable after restore: {}", e))),
        }
    }

    async fn settle(&self) {
        if !self.config.settle_delay.is_zero() {
            tokio::time::sleep(self.config.settle_delay).await;
        }
    }
}

/// Apply a predicate, turning a panic into a failed verdict.
fn evaluate(predicate: Predicate, observation: &Observation) -> Result<bool, EvalError> {
    match catch_unwind(AssertUnwindSafe(|| predicate(observation))) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(EvalError::Panicked(message))
        }
    }
}
