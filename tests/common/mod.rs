//! In-memory stand-in for the kernel module, for orchestrator tests.
//!
//! Mirrors the module's parameter handlers: unsigned decimal parsing,
//! range checks with an "out of range" warning, acceptance logging, and
//! `ch_val` writes storing the character into `my_str` at `idx`. Accepted
//! writes can be made to land after a delay, like a component whose state
//! update is asynchronous to the write.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use kparam_check::accessor::{AccessError, LogFilter, LogWindow, ParameterStore};
use kparam_check::param::parse_unsigned;
use kparam_check::ParamName;

const STR_SIZE: usize = 64;

#[derive(Debug, Clone)]
pub struct FakeOptions {
    pub loaded: bool,
    /// Largest idx accepted instead of the documented domain.
    pub idx_limit: Option<u64>,
    /// Accept every numeric value, skipping range checks.
    pub ignore_range: bool,
    /// Parameters whose reads fail.
    pub unreadable: HashSet<ParamName>,
    /// Every write fails at the transport.
    pub transport_down: bool,
    /// Specific writes that fail at the transport.
    pub refused: Vec<(ParamName, String)>,
    /// Delay between a delivered write and the state change it causes.
    pub lag: Duration,
}

impl Default for FakeOptions {
    fn default() -> Self {
        Self {
            loaded: true,
            idx_limit: None,
            ignore_range: false,
            unreadable: HashSet::new(),
            transport_down: false,
            refused: Vec::new(),
            lag: Duration::ZERO,
        }
    }
}

struct State {
    idx: u64,
    ch_val: u8,
    my_str: [u8; STR_SIZE],
    log: Vec<String>,
    journal: Vec<(ParamName, String)>,
    pending: VecDeque<(Instant, ParamName, String)>,
    clears: usize,
    clock: u64,
}

impl State {
    fn emit(&mut self, line: String) {
        self.clock += 1;
        self.log.push(format!("[{:>5}.000000] {}", self.clock, line));
    }

    fn my_str(&self) -> String {
        let end = self.my_str.iter().position(|b| *b == 0).unwrap_or(STR_SIZE);
        String::from_utf8_lossy(&self.my_str[..end]).into_owned()
    }
}

pub struct FakeModule {
    name: String,
    options: FakeOptions,
    state: Mutex<State>,
}

impl FakeModule {
    pub fn new() -> Self {
        Self::with_options(FakeOptions::default())
    }

    pub fn with_options(options: FakeOptions) -> Self {
        let mut my_str = [0u8; STR_SIZE];
        my_str[..14].copy_from_slice(b"Default string");
        let mut state = State {
            idx: 0,
            ch_val: b'A',
            my_str,
            log: Vec::new(),
            journal: Vec::new(),
            pending: VecDeque::new(),
            clears: 0,
            clock: 0,
        };
        state.emit("hello, from kernel ".to_string());
        state.emit("Initial: idx=0, ch_val='A'(65), my_str=Default string".to_string());
        Self {
            name: "my_module".to_string(),
            options,
            state: Mutex::new(state),
        }
    }

    /// Every write request in arrival order, delivered or not.
    pub fn journal(&self) -> Vec<(ParamName, String)> {
        self.state.lock().journal.clone()
    }

    pub fn clears(&self) -> usize {
        self.state.lock().clears
    }

    pub fn my_str(&self) -> String {
        self.state.lock().my_str()
    }

    pub fn idx(&self) -> u64 {
        let mut state = self.state.lock();
        self.apply_due(&mut state);
        state.idx
    }

    fn in_range(&self, name: ParamName, text: &str, value: u64) -> bool {
        if self.options.ignore_range {
            return true;
        }
        match (name, self.options.idx_limit) {
            (ParamName::Idx, Some(limit)) => value <= limit,
            _ => name.domain().admits(text),
        }
    }

    /// Apply writes whose lag has elapsed, in arrival order.
    fn apply_due(&self, state: &mut State) {
        let now = Instant::now();
        while state.pending.front().is_some_and(|(due, _, _)| *due <= now) {
            if let Some((_, name, text)) = state.pending.pop_front() {
                self.apply(state, name, &text);
            }
        }
    }

    fn apply(&self, state: &mut State, name: ParamName, text: &str) {
        match name {
            ParamName::Idx => self.set_idx(state, text),
            ParamName::ChVal => self.set_ch_val(state, text),
            ParamName::MyStr => {}
        }
    }

    fn set_idx(&self, state: &mut State, text: &str) {
        let Some(v) = parse_unsigned(text) else { return };
        if !self.in_range(ParamName::Idx, text, v) {
            state.emit(format!("idx {} out of range ({})", v, ParamName::Idx.domain()));
            return;
        }
        state.idx = v;
        state.emit(format!("idx value = {} ", v));
    }

    fn set_ch_val(&self, state: &mut State, text: &str) {
        let Some(v) = parse_unsigned(text) else { return };
        if !self.in_range(ParamName::ChVal, text, v) {
            state.emit(format!("ch_val {} out of range ({})", v, ParamName::ChVal.domain()));
            return;
        }
        let ch = v as u8;
        state.ch_val = ch;
        state.emit(format!("ch_val value = {} ({})", char::from(ch), ch));
        let pos = (state.idx as usize).min(STR_SIZE - 1);
        state.my_str[pos] = ch;
    }
}

#[async_trait]
impl ParameterStore for FakeModule {
    fn component_name(&self) -> &str {
        &self.name
    }

    async fn is_component_active(&self) -> bool {
        self.options.loaded
    }

    async fn read_parameter(&self, name: ParamName) -> Result<String, AccessError> {
        if self.options.unreadable.contains(&name) {
            return Err(AccessError::PermissionDenied {
                path: format!("/sys/module/my_module/parameters/{}", name),
            });
        }
        let mut state = self.state.lock();
        self.apply_due(&mut state);
        let text = match name {
            ParamName::Idx => format!("{} \n", state.idx),
            ParamName::ChVal => format!("{} ({}) \n", char::from(state.ch_val), state.ch_val),
            ParamName::MyStr => format!("{} \n", state.my_str()),
        };
        Ok(text.trim().to_string())
    }

    async fn write_parameter(&self, name: ParamName, value: &str) -> Result<(), AccessError> {
        let mut state = self.state.lock();
        self.apply_due(&mut state);
        state.journal.push((name, value.to_string()));

        let refused = self
            .options
            .refused
            .iter()
            .any(|(p, v)| *p == name && v == value);
        if self.options.transport_down || refused {
            return Err(AccessError::CommandFailed {
                command: format!("sudo tee /sys/module/my_module/parameters/{}", name),
                status: "exit status: 1".to_string(),
                stderr: "sudo: a password is required".to_string(),
            });
        }

        if name == ParamName::MyStr {
            return Err(AccessError::PermissionDenied {
                path: "/sys/module/my_module/parameters/my_str".to_string(),
            });
        }
        if self.options.lag.is_zero() {
            self.apply(&mut state, name, value);
        } else {
            let due = Instant::now() + self.options.lag;
            state.pending.push_back((due, name, value.to_string()));
        }
        Ok(())
    }

    async fn clear_diagnostic_log(&self) -> Result<(), AccessError> {
        let mut state = self.state.lock();
        state.log.clear();
        state.clears += 1;
        Ok(())
    }

    async fn read_diagnostic_log_window(&self, max_lines: usize) -> LogWindow {
        let text = {
            let mut state = self.state.lock();
            self.apply_due(&mut state);
            state.log.join("\n")
        };
        LogWindow::tail(&text, &LogFilter::for_component(&self.name), max_lines)
    }
}
