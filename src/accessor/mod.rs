//! Gateway to the component's externally owned state.
//!
//! The harness never holds component state of its own. Everything it knows
//! about the module comes through [`ParameterStore`]: the exposed parameter
//! files, the loaded-module registry and the kernel ring buffer.
//!
//! Writes go through an [`ElevatedWriter`] so the privilege mechanism can be
//! swapped (sudo, direct root access, a test double) without touching the
//! scenarios.

mod command;
mod dmesg;
mod elevate;
mod sysfs;

pub use dmesg::KernelRingBuffer;
pub use elevate::{DirectWriter, SudoWriter};
pub use sysfs::SysfsStore;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::param::ParamName;

/// Failure to observe or reach the component.
///
/// None of these mean the component rejected a value. Semantic acceptance is
/// only ever decided by re-reading the parameter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("{path}: not found")]
    NotFound { path: String },

    #[error("{path}: permission denied")]
    PermissionDenied { path: String },

    #[error("{path}: {message}")]
    Io { path: String, message: String },

    #[error("`{command}` could not be started: {message}")]
    Spawn { command: String, message: String },

    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },
}

impl AccessError {
    pub(crate) fn from_io(path: &Path, err: &io::Error) -> Self {
        let path = path.display().to_string();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io {
                path,
                message: err.to_string(),
            },
        }
    }

    pub(crate) fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }
}

/// Narrow interface to the live component.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Name of the component as it appears in the module registry.
    fn component_name(&self) -> &str;

    /// Whether the component is currently loaded.
    ///
    /// Inspection failures count as "not loaded".
    async fn is_component_active(&self) -> bool;

    /// Current text of a parameter, whitespace-trimmed.
    async fn read_parameter(&self, name: ParamName) -> Result<String, AccessError>;

    /// Request a write. `Ok` only means the transport delivered it.
    async fn write_parameter(&self, name: ParamName, value: &str) -> Result<(), AccessError>;

    /// Truncate the diagnostic log to establish a clean baseline.
    async fn clear_diagnostic_log(&self) -> Result<(), AccessError>;

    /// Last `max_lines` component lines of the diagnostic log.
    ///
    /// A log that cannot be read yields an empty window.
    async fn read_diagnostic_log_window(&self, max_lines: usize) -> LogWindow;
}

/// Capability to write text to a path that needs elevated privilege.
#[async_trait]
pub trait ElevatedWriter: Send + Sync {
    async fn elevated_write(&self, path: &Path, text: &str) -> Result<(), AccessError>;
}

/// Host-wide append-only log stream.
#[async_trait]
pub trait DiagnosticLog: Send + Sync {
    async fn clear(&self) -> Result<(), AccessError>;

    /// Entire accumulated log text.
    async fn read_all(&self) -> Result<String, AccessError>;
}

/// Selects the log lines that belong to the component.
///
/// The module does not prefix its messages, so the filter matches on the
/// module name and on the component's own vocabulary (parameter names and
/// its rejection marker). An empty token list keeps every line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    tokens: Vec<String>,
}

impl LogFilter {
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }

    pub fn for_component(module: &str) -> Self {
        let mut tokens = vec![module.to_string()];
        tokens.extend(ParamName::ALL.iter().map(|p| p.as_str().to_string()));
        tokens.push(crate::scenario::evidence::OUT_OF_RANGE.to_string());
        Self { tokens }
    }

    pub fn matches(&self, line: &str) -> bool {
        if self.tokens.is_empty() {
            return true;
        }
        let lower = line.to_lowercase();
        self.tokens.iter().any(|t| lower.contains(&t.to_lowercase()))
    }
}

/// Bounded most-recent-lines view of the diagnostic log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogWindow {
    lines: Vec<String>,
}

impl LogWindow {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Keep the last `max_lines` lines of `text` accepted by `filter`.
    pub fn tail(text: &str, filter: &LogFilter, max_lines: usize) -> Self {
        let matching: Vec<&str> = text
            .lines()
            .filter(|l| !l.trim().is_empty() && filter.matches(l))
            .collect();
        let start = matching.len().saturating_sub(max_lines);
        Self {
            lines: matching[start..].iter().map(|l| l.to_string()).collect(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }

    pub fn contains_ignore_case(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.lines.iter().any(|l| l.to_lowercase().contains(&needle))
    }
}

impl fmt::Display for LogWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lines.is_empty() {
            return f.write_str("(no component log lines)");
        }
        f.write_str(&self.lines.join("\n"))
    }
}

/// Where the component lives and how to reach it.
#[derive(Debug, Clone)]
pub struct AccessorConfig {
    /// Module name as listed in the registry.
    pub module: String,
    /// Directory holding one sub-directory per loaded module.
    pub sysfs_root: PathBuf,
    /// Loaded-module registry file.
    pub modules_file: PathBuf,
    /// Elevation program for writes and log clearing. `None` writes directly.
    pub elevate: Option<String>,
    /// Upper bound for any single external operation.
    pub op_timeout: Duration,
}

impl Default for AccessorConfig {
    fn default() -> Self {
        Self {
            module: "my_module".to_string(),
            sysfs_root: PathBuf::from("/sys/module"),
            modules_file: PathBuf::from("/proc/modules"),
            elevate: Some("sudo".to_string()),
            op_timeout: Duration::from_secs(10),
        }
    }
}

impl AccessorConfig {
    /// `<sysfs_root>/<module>/parameters`
    pub fn params_dir(&self) -> PathBuf {
        self.sysfs_root.join(&self.module).join("parameters")
    }
}

/// Build the production store for the configured module.
pub fn create_store(config: AccessorConfig) -> SysfsStore {
    let writer: Box<dyn ElevatedWriter> = match &config.elevate {
        Some(program) => Box::new(SudoWriter::new(program.clone(), config.op_timeout)),
        None => Box::new(DirectWriter::new(config.op_timeout)),
    };
    let log = KernelRingBuffer::new(config.elevate.clone(), config.op_timeout);
    SysfsStore::new(config, writer, Box::new(log))
}
