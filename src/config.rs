//! Harness configuration loading from environment variables.
//!
//! All configuration values are loaded from `KPARAM_*` environment variables
//! with sensible defaults. Invalid values fall back to defaults without crashing.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `KPARAM_MODULE` | my_module | Module under test |
//! | `KPARAM_SYSFS_ROOT` | /sys/module | Root of per-module parameter directories |
//! | `KPARAM_MODULES_FILE` | /proc/modules | Loaded-module registry |
//! | `KPARAM_ELEVATE` | sudo | Elevation program; empty writes directly |
//! | `KPARAM_SETTLE_MS` | 100 | Pause before each observation (ms) |
//! | `KPARAM_PAUSE_MS` | 500 | Pause between scenarios (ms) |
//! | `KPARAM_OP_TIMEOUT_MS` | 10000 | Per-operation timeout (ms) |
//! | `KPARAM_LOG_WINDOW` | 5 | Log lines in the final state dump |
//! | `KPARAM_LOG` | warn | Harness log filter |
//! | `KPARAM_LOG_FORMAT` | pretty | `pretty` or `json` |
//! | `KPARAM_LOG_FILE` | (stderr) | Harness log file |

use std::path::PathBuf;
use std::time::Duration;

use crate::accessor::AccessorConfig;
use crate::orchestrator::OrchestratorConfig;
use crate::telemetry::{LogConfig, LogFormat};

pub const DEFAULT_MODULE: &str = "my_module";
pub const DEFAULT_SYSFS_ROOT: &str = "/sys/module";
pub const DEFAULT_MODULES_FILE: &str = "/proc/modules";
pub const DEFAULT_ELEVATE: &str = "sudo";
pub const DEFAULT_SETTLE_MS: u64 = 100;
pub const DEFAULT_PAUSE_MS: u64 = 500;
pub const DEFAULT_OP_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_LOG_WINDOW: usize = 5;

const MIN_OP_TIMEOUT_MS: u64 = 100;
const MAX_LOG_WINDOW: usize = 1000;

/// Every variable this module reads.
pub const ENV_KEYS: &[&str] = &[
    "KPARAM_MODULE",
    "KPARAM_SYSFS_ROOT",
    "KPARAM_MODULES_FILE",
    "KPARAM_ELEVATE",
    "KPARAM_SETTLE_MS",
    "KPARAM_PAUSE_MS",
    "KPARAM_OP_TIMEOUT_MS",
    "KPARAM_LOG_WINDOW",
    "KPARAM_LOG",
    "KPARAM_LOG_FORMAT",
    "KPARAM_LOG_FILE",
];

/// Effective configuration summary, flattened for display.
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub module: String,
    pub sysfs_root: String,
    pub modules_file: String,
    pub elevate: String,
    pub settle_ms: u64,
    pub pause_ms: u64,
    pub op_timeout_ms: u64,
    pub log_window: usize,
    pub log_level: String,
    pub log_format: String,
}

/// All harness configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub accessor: AccessorConfig,
    pub orchestrator: OrchestratorConfig,
    pub log: LogConfig,
    /// Unparseable values that were replaced by defaults.
    pub ignored: Vec<String>,
}

struct Loader {
    ignored: Vec<String>,
}

impl Loader {
    fn string(&mut self, key: &str, default: &str) -> String {
        std::env::var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Parse a `u64` env var, returning `default` on missing or invalid.
    fn u64(&mut self, key: &str, default: u64) -> u64 {
        match std::env::var(key) {
            Ok(val) => match val.trim().parse::<u64>() {
                Ok(v) => v,
                Err(_) => {
                    self.ignored.push(format!("{}={}", key, val));
                    default
                }
            },
            Err(_) => default,
        }
    }

    /// Parse a `usize` env var, returning `default` on missing or invalid.
    fn usize(&mut self, key: &str, default: usize) -> usize {
        match std::env::var(key) {
            Ok(val) => match val.trim().parse::<usize>() {
                Ok(v) => v,
                Err(_) => {
                    self.ignored.push(format!("{}={}", key, val));
                    default
                }
            },
            Err(_) => default,
        }
    }
}

/// Load accessor configuration from environment.
fn load_accessor_config(env: &mut Loader) -> AccessorConfig {
    let module = env.string("KPARAM_MODULE", DEFAULT_MODULE);
    let module = if module.trim().is_empty() {
        DEFAULT_MODULE.to_string()
    } else {
        module.trim().to_string()
    };
    let elevate = env.string("KPARAM_ELEVATE", DEFAULT_ELEVATE);
    let elevate = Some(elevate.trim().to_string()).filter(|e| !e.is_empty());
    let op_timeout_ms = env.u64("KPARAM_OP_TIMEOUT_MS", DEFAULT_OP_TIMEOUT_MS);
    let op_timeout_ms = op_timeout_ms.max(MIN_OP_TIMEOUT_MS);

    AccessorConfig {
        module,
        sysfs_root: PathBuf::from(env.string("KPARAM_SYSFS_ROOT", DEFAULT_SYSFS_ROOT)),
        modules_file: PathBuf::from(env.string("KPARAM_MODULES_FILE", DEFAULT_MODULES_FILE)),
        elevate,
        op_timeout: Duration::from_millis(op_timeout_ms),
    }
}

/// Load orchestrator timing from environment.
fn load_orchestrator_config(env: &mut Loader) -> OrchestratorConfig {
    let settle_ms = env.u64("KPARAM_SETTLE_MS", DEFAULT_SETTLE_MS);
    let pause_ms = env.u64("KPARAM_PAUSE_MS", DEFAULT_PAUSE_MS);
    let log_window = env.usize("KPARAM_LOG_WINDOW", DEFAULT_LOG_WINDOW);
    OrchestratorConfig {
        settle_delay: Duration::from_millis(settle_ms),
        pause_between: Duration::from_millis(pause_ms),
        final_log_lines: log_window.clamp(1, MAX_LOG_WINDOW),
    }
}

/// Load harness logging configuration from environment.
fn load_log_config(env: &mut Loader) -> LogConfig {
    let level = env.string("KPARAM_LOG", "warn");
    let format = match std::env::var("KPARAM_LOG_FORMAT") {
        Ok(val) => val.parse::<LogFormat>().unwrap_or_else(|_| {
            env.ignored.push(format!("KPARAM_LOG_FORMAT={}", val));
            LogFormat::default()
        }),
        Err(_) => LogFormat::default(),
    };
    let output_path = std::env::var("KPARAM_LOG_FILE")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from);
    LogConfig {
        format,
        level,
        output_path,
    }
}

/// Load all configuration from environment variables.
///
/// Missing or invalid values fall back to safe defaults without panicking.
pub fn load() -> EnvConfig {
    let mut env = Loader { ignored: Vec::new() };
    let accessor = load_accessor_config(&mut env);
    let orchestrator = load_orchestrator_config(&mut env);
    let log = load_log_config(&mut env);
    EnvConfig {
        accessor,
        orchestrator,
        log,
        ignored: env.ignored,
    }
}

impl EnvConfig {
    /// Return a flat summary of all effective values.
    pub fn effective_config(&self) -> EffectiveConfig {
        EffectiveConfig {
            module: self.accessor.module.clone(),
            sysfs_root: self.accessor.sysfs_root.display().to_string(),
            modules_file: self.accessor.modules_file.display().to_string(),
            elevate: self.accessor.elevate.clone().unwrap_or_default(),
            settle_ms: self.orchestrator.settle_delay.as_millis() as u64,
            pause_ms: self.orchestrator.pause_between.as_millis() as u64,
            op_timeout_ms: self.accessor.op_timeout.as_millis() as u64,
            log_window: self.orchestrator.final_log_lines,
            log_level: self.log.level.clone(),
            log_format: match self.log.format {
                LogFormat::Json => "json".to_string(),
                LogFormat::Pretty => "pretty".to_string(),
            },
        }
    }
}
