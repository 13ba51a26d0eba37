//! Per-scenario results and the aggregated run report.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::accessor::{AccessError, LogWindow};
use crate::param::ParamName;
use crate::scenario::{Observation, Snapshot};

/// Transport outcome of one write request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportRecord {
    pub param: ParamName,
    pub value: String,
    pub delivered: bool,
    pub error: Option<String>,
}

impl TransportRecord {
    pub fn new(param: ParamName, value: &str, result: &Result<(), AccessError>) -> Self {
        Self {
            param,
            value: value.to_string(),
            delivered: result.is_ok(),
            error: result.as_ref().err().map(|e| e.to_string()),
        }
    }
}

/// A parameter that could not be put back to its snapshot value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreFailure {
    pub param: ParamName,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub reason: String,
}

/// What the restore phase did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreOutcome {
    /// Written back and verified by re-read.
    pub restored: Vec<ParamName>,
    pub failed: Vec<RestoreFailure>,
    /// Read-only parameters left different from their snapshot.
    pub drifted_read_only: Vec<ParamName>,
}

impl RestoreOutcome {
    /// State after the scenario matches the state before it.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.drifted_read_only.is_empty()
    }
}

/// Outcome of one scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub rationale: String,
    pub passed: bool,
    /// Set when the predicate could not reach a verdict.
    pub error: Option<String>,
    pub writes: Vec<TransportRecord>,
    pub observation: Observation,
    pub restore: RestoreOutcome,
}

impl TestResult {
    /// Rationale and evidence, printed whether the scenario passed or not.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(60);
        out.push_str(&format!("{}\nTEST: {}\n{}\n", rule, self.name, rule));
        out.push_str(&format!("{}\n", self.rationale));
        out.push_str(&format!("  before: {}\n", self.observation.pre));
        for w in &self.writes {
            match &w.error {
                None => out.push_str(&format!("  write {}={:?}: delivered\n", w.param, w.value)),
                Some(e) => out.push_str(&format!(
                    "  write {}={:?}: transport failed ({})\n",
                    w.param, w.value, e
                )),
            }
        }
        for (i, cp) in self.observation.checkpoints.iter().enumerate() {
            out.push_str(&format!("  checkpoint {}: {}\n", i, cp));
        }
        out.push_str(&format!("  after:  {}\n", self.observation.post));
        out.push_str("  log:\n");
        for line in self.observation.log.to_string().lines() {
            out.push_str(&format!("    {}\n", line));
        }
        if let Some(e) = &self.error {
            out.push_str(&format!("  error: {}\n", e));
        }
        for f in &self.restore.failed {
            out.push_str(&format!("  restore {} failed: {}\n", f.param, f.reason));
        }
        for p in &self.restore.drifted_read_only {
            out.push_str(&format!("  {} is read-only and was left changed\n", p));
        }
        out.push_str(&format!(
            "Result: {}\n",
            if self.passed { "✅ PASSED" } else { "❌ FAILED" }
        ));
        out
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestReport {
    pub run_id: Uuid,
    pub host: String,
    pub component: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub results: Vec<TestResult>,
    pub final_state: Snapshot,
    pub final_log: LogWindow,
}

impl TestReport {
    pub fn new(component: &str) -> Self {
        let host = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".to_string());
        Self {
            run_id: Uuid::new_v4(),
            host,
            component: component.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            results: Vec::new(),
            final_state: Snapshot::default(),
            final_log: LogWindow::default(),
        }
    }

    pub fn push(&mut self, result: TestResult) {
        self.results.push(result);
    }

    pub fn finish(&mut self, final_state: Snapshot, final_log: LogWindow) {
        self.final_state = final_state;
        self.final_log = final_log;
        self.finished_at = Some(Utc::now());
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn all_passed(&self) -> bool {
        self.passed() == self.total()
    }

    /// Scenarios whose restore phase left state behind.
    pub fn unclean_restores(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| !r.restore.is_clean())
            .map(|r| r.name.as_str())
            .collect()
    }

    /// Outcome pairs in run order.
    pub fn outcomes(&self) -> Vec<(&str, bool)> {
        self.results.iter().map(|r| (r.name.as_str(), r.passed)).collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for TestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(
            f,
            "{}\nSUMMARY ({} on {}, run {})\n{}",
            rule, self.component, self.host, self.run_id, rule
        )?;
        for r in &self.results {
            writeln!(f, "{} {}", if r.passed { "✅" } else { "❌" }, r.name)?;
        }
        writeln!(f, "\nPassed: {}/{}", self.passed(), self.total())?;
        if self.all_passed() {
            writeln!(f, "\n🎉 All scenarios passed")?;
        } else {
            writeln!(f, "\n⚠️  Failed: {}", self.total() - self.passed())?;
        }
        let unclean = self.unclean_restores();
        if !unclean.is_empty() {
            writeln!(f, "State not fully restored after: {}", unclean.join(", "))?;
        }

        writeln!(f, "\n{}\nFINAL STATE\n{}", rule, rule)?;
        for (p, reading) in self.final_state.iter() {
            writeln!(f, "  {:<8} {}", format!("{}:", p), reading)?;
        }
        writeln!(f, "\nRecent component log:")?;
        for line in self.final_log.to_string().lines() {
            writeln!(f, "  {}", line)?;
        }
        Ok(())
    }
}
