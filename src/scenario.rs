//! Scenarios as data.
//!
//! A scenario lists the parameters it observes, the steps it performs and a
//! predicate over what was observed. The orchestrator owns the loop; adding
//! a scenario never touches it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::accessor::{AccessError, LogWindow};
use crate::param::{CharRendering, ParamName, DEFAULT_CH_VAL, DEFAULT_IDX, DEFAULT_MY_STR};

/// Log text the component emits. These are a fixed external contract.
pub mod evidence {
    use crate::param::CharRendering;

    /// Rejection marker, matched case-insensitively.
    pub const OUT_OF_RANGE: &str = "out of range";

    pub fn idx_accepted(idx: u64) -> String {
        format!("idx value = {}", idx)
    }

    pub fn ch_val_accepted(code: u8) -> String {
        format!("ch_val value = {}", CharRendering::new(code))
    }
}

/// Why a predicate could not reach a verdict.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvalError {
    #[error("{param} could not be observed: {reason}")]
    Unobservable { param: ParamName, reason: String },

    #[error("{param} was not captured by this scenario")]
    NotCaptured { param: ParamName },

    #[error("checkpoint {index} was not captured")]
    MissingCheckpoint { index: usize },

    #[error("predicate panicked: {0}")]
    Panicked(String),
}

/// One parameter as seen at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Reading {
    Value(String),
    Unobservable(String),
}

impl From<Result<String, AccessError>> for Reading {
    fn from(r: Result<String, AccessError>) -> Self {
        match r {
            Ok(v) => Reading::Value(v),
            Err(e) => Reading::Unobservable(e.to_string()),
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Value(v) => f.write_str(v),
            Reading::Unobservable(reason) => write!(f, "<unobservable: {}>", reason),
        }
    }
}

/// Readings of a set of parameters taken together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    readings: BTreeMap<ParamName, Reading>,
}

impl Snapshot {
    pub fn insert(&mut self, param: ParamName, reading: Reading) {
        self.readings.insert(param, reading);
    }

    pub fn get(&self, param: ParamName) -> Option<&Reading> {
        self.readings.get(&param)
    }

    /// Observed text, or the reason it is unavailable.
    pub fn value(&self, param: ParamName) -> Result<&str, EvalError> {
        match self.readings.get(&param) {
            Some(Reading::Value(v)) => Ok(v),
            Some(Reading::Unobservable(reason)) => Err(EvalError::Unobservable {
                param,
                reason: reason.clone(),
            }),
            None => Err(EvalError::NotCaptured { param }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParamName, &Reading)> {
        self.readings.iter()
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (p, r) in &self.readings {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", p, r)?;
            first = false;
        }
        Ok(())
    }
}

/// Everything a predicate may look at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub pre: Snapshot,
    pub checkpoints: Vec<Snapshot>,
    pub post: Snapshot,
    pub log: LogWindow,
}

impl Observation {
    pub fn checkpoint(&self, index: usize) -> Result<&Snapshot, EvalError> {
        self.checkpoints
            .get(index)
            .ok_or(EvalError::MissingCheckpoint { index })
    }

    /// Post-action value equals the snapshot taken before acting.
    pub fn unchanged(&self, param: ParamName) -> Result<bool, EvalError> {
        Ok(self.post.value(param)? == self.pre.value(param)?)
    }
}

/// An action performed during the act phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    Write { param: ParamName, value: String },
    /// Settle, then capture the observed parameters mid-scenario.
    Checkpoint,
}

pub type Predicate = fn(&Observation) -> Result<bool, EvalError>;

/// A setup/act/observe/evaluate/restore unit.
#[derive(Clone)]
pub struct Scenario {
    pub name: &'static str,
    pub rationale: &'static str,
    /// Parameters snapshotted and restored, in restore order.
    pub observes: Vec<ParamName>,
    pub steps: Vec<Step>,
    pub log_lines: usize,
    pub predicate: Predicate,
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("observes", &self.observes)
            .field("steps", &self.steps)
            .field("log_lines", &self.log_lines)
            .finish()
    }
}

impl Scenario {
    pub fn new(name: &'static str, rationale: &'static str, predicate: Predicate) -> Self {
        Self {
            name,
            rationale,
            observes: Vec::new(),
            steps: Vec::new(),
            log_lines: 3,
            predicate,
        }
    }

    pub fn observing(mut self, params: &[ParamName]) -> Self {
        self.observes = params.to_vec();
        self
    }

    pub fn write(mut self, param: ParamName, value: impl Into<String>) -> Self {
        self.steps.push(Step::Write {
            param,
            value: value.into(),
        });
        self
    }

    pub fn checkpoint(mut self) -> Self {
        self.steps.push(Step::Checkpoint);
        self
    }

    pub fn log_lines(mut self, lines: usize) -> Self {
        self.log_lines = lines;
        self
    }

    /// Parameters this scenario writes to, in first-write order.
    pub fn written(&self) -> Vec<ParamName> {
        let mut out = Vec::new();
        for step in &self.steps {
            if let Step::Write { param, .. } = step {
                if !out.contains(param) {
                    out.push(*param);
                }
            }
        }
        out
    }
}

fn initial_state(obs: &Observation) -> Result<bool, EvalError> {
    let default_ch = CharRendering::new(DEFAULT_CH_VAL).to_string();
    Ok(obs.post.value(ParamName::Idx)? == DEFAULT_IDX
        && obs.post.value(ParamName::ChVal)?.contains(&default_ch)
        && obs.post.value(ParamName::MyStr)?.contains(DEFAULT_MY_STR))
}

fn idx_rejected_and_logged(obs: &Observation) -> Result<bool, EvalError> {
    Ok(obs.unchanged(ParamName::Idx)? && obs.log.contains_ignore_case(evidence::OUT_OF_RANGE))
}

fn idx_rejected(obs: &Observation) -> Result<bool, EvalError> {
    obs.unchanged(ParamName::Idx)
}

fn ch_val_rejected_and_logged(obs: &Observation) -> Result<bool, EvalError> {
    Ok(obs.unchanged(ParamName::ChVal)? && obs.log.contains_ignore_case(evidence::OUT_OF_RANGE))
}

fn ch_val_rejected(obs: &Observation) -> Result<bool, EvalError> {
    obs.unchanged(ParamName::ChVal)
}

fn idx_accepted(obs: &Observation) -> Result<bool, EvalError> {
    Ok(obs.post.value(ParamName::Idx)? == "10" && obs.log.contains(&evidence::idx_accepted(10)))
}

fn ch_val_accepted(obs: &Observation) -> Result<bool, EvalError> {
    let rendered = obs.post.value(ParamName::ChVal)?;
    Ok(rendered.contains('X')
        && rendered.contains("88")
        && obs.log.contains(&evidence::ch_val_accepted(88)))
}

fn string_follows_writes(obs: &Observation) -> Result<bool, EvalError> {
    let original = obs.pre.value(ParamName::MyStr)?;
    let first = obs.checkpoint(0)?.value(ParamName::MyStr)?;
    let second = obs.checkpoint(1)?.value(ParamName::MyStr)?;
    Ok(first.chars().next() == Some('H')
        && first != original
        && second.chars().nth(1) == Some('e'))
}

fn my_str_unchanged(obs: &Observation) -> Result<bool, EvalError> {
    obs.unchanged(ParamName::MyStr)
}

/// The fixed, ordered catalogue run by default.
pub fn catalogue() -> Vec<Scenario> {
    use ParamName::*;

    vec![
        Scenario::new(
            "Initial state",
            "A freshly loaded module starts at idx=0, ch_val='A' (65), my_str=\"Default string\".",
            initial_state,
        )
        .observing(&[Idx, ChVal, MyStr])
        .log_lines(5),
        Scenario::new(
            "idx too large (100)",
            "idx accepts 0-63; 100 must be rejected and logged as out of range.",
            idx_rejected_and_logged,
        )
        .observing(&[Idx])
        .write(Idx, "100"),
        Scenario::new(
            "idx negative (-5)",
            "idx is unsigned; -5 must be rejected.",
            idx_rejected,
        )
        .observing(&[Idx])
        .write(Idx, "-5"),
        Scenario::new(
            "ch_val too large (300)",
            "ch_val accepts 0-255; 300 must be rejected and logged as out of range.",
            ch_val_rejected_and_logged,
        )
        .observing(&[ChVal])
        .write(ChVal, "300"),
        Scenario::new(
            "ch_val not a number ('abc')",
            "ch_val only accepts decimal text; 'abc' must be rejected.",
            ch_val_rejected,
        )
        .observing(&[ChVal])
        .write(ChVal, "abc"),
        Scenario::new(
            "Valid idx (10)",
            "idx=10 is in range; it must be stored and logged.",
            idx_accepted,
        )
        .observing(&[Idx])
        .write(Idx, "10"),
        Scenario::new(
            "Valid ch_val (88='X')",
            "With idx=5, ch_val=88 must be stored, rendered as X (88) and logged.",
            ch_val_accepted,
        )
        .observing(&[Idx, ChVal, MyStr])
        .write(Idx, "5")
        .write(ChVal, "88")
        .log_lines(5),
        Scenario::new(
            "String modification via idx and ch_val",
            "Writing ch_val stores its character into my_str at position idx.",
            string_follows_writes,
        )
        .observing(&[Idx, ChVal, MyStr])
        .write(Idx, "0")
        .write(ChVal, "72")
        .checkpoint()
        .write(Idx, "1")
        .write(ChVal, "101")
        .checkpoint()
        .log_lines(10),
        Scenario::new(
            "my_str is read-only",
            "my_str is derived; a direct write must never change it.",
            my_str_unchanged,
        )
        .observing(&[MyStr])
        .write(MyStr, "Hello World"),
    ]
}

/// Boundary cases for the rejection ranges. Opt-in with `--extended`.
pub fn extended() -> Vec<Scenario> {
    use ParamName::*;

    vec![
        Scenario::new(
            "idx boundary (64)",
            "64 is the first index past the end of my_str and must be rejected.",
            idx_rejected,
        )
        .observing(&[Idx])
        .write(Idx, "64"),
        Scenario::new(
            "ch_val boundary (256)",
            "256 does not fit a byte and must be rejected and logged as out of range.",
            ch_val_rejected_and_logged,
        )
        .observing(&[ChVal])
        .write(ChVal, "256"),
        Scenario::new(
            "ch_val negative (-1)",
            "ch_val is unsigned; -1 must be rejected.",
            ch_val_rejected,
        )
        .observing(&[ChVal])
        .write(ChVal, "-1"),
    ]
}
