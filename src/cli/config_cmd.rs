// Copyright 2024-2026 kparam-check Contributors
// SPDX-License-Identifier: Apache-2.0

//! Config CLI subcommands: show, defaults, validate.
//!
//! These commands read configuration directly from environment variables
//! and never touch the module.

use crate::config::{self, EffectiveConfig, EnvConfig};

/// Print effective config as key-value pairs to stdout.
pub fn run_show(env: &EnvConfig) {
    print_config(&env.effective_config());
}

/// Print default config values (no env overrides) to stdout.
pub fn run_defaults() {
    println!("KPARAM_MODULE={}", config::DEFAULT_MODULE);
    println!("KPARAM_SYSFS_ROOT={}", config::DEFAULT_SYSFS_ROOT);
    println!("KPARAM_MODULES_FILE={}", config::DEFAULT_MODULES_FILE);
    println!("KPARAM_ELEVATE={}", config::DEFAULT_ELEVATE);
    println!("KPARAM_SETTLE_MS={}", config::DEFAULT_SETTLE_MS);
    println!("KPARAM_PAUSE_MS={}", config::DEFAULT_PAUSE_MS);
    println!("KPARAM_OP_TIMEOUT_MS={}", config::DEFAULT_OP_TIMEOUT_MS);
    println!("KPARAM_LOG_WINDOW={}", config::DEFAULT_LOG_WINDOW);
    println!("KPARAM_LOG=warn");
    println!("KPARAM_LOG_FORMAT=pretty");
}

/// Collect warnings about obvious misconfigurations.
pub fn validate(env: &EnvConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    for entry in &env.ignored {
        warnings.push(format!("ignored unparseable value {}", entry));
    }

    if !env.accessor.sysfs_root.is_dir() {
        warnings.push(format!(
            "KPARAM_SYSFS_ROOT ({}) is not a directory",
            env.accessor.sysfs_root.display()
        ));
    }

    if std::fs::metadata(&env.accessor.modules_file).is_err() {
        warnings.push(format!(
            "KPARAM_MODULES_FILE ({}) is not readable; the module will always look unloaded",
            env.accessor.modules_file.display()
        ));
    }

    if env.orchestrator.settle_delay.is_zero() {
        warnings.push(
            "KPARAM_SETTLE_MS is 0; log lines may not be visible yet when observed".to_string(),
        );
    }

    warnings
}

/// Validate configuration for obvious misconfigurations.
///
/// Returns 0 if valid, 1 if any warnings are found.
pub fn run_validate(env: &EnvConfig) -> u8 {
    let warnings = validate(env);
    if warnings.is_empty() {
        println!("Configuration is valid.");
        0
    } else {
        for w in &warnings {
            eprintln!("WARNING: {}", w);
        }
        1
    }
}

fn print_config(cfg: &EffectiveConfig) {
    println!("KPARAM_MODULE={}", cfg.module);
    println!("KPARAM_SYSFS_ROOT={}", cfg.sysfs_root);
    println!("KPARAM_MODULES_FILE={}", cfg.modules_file);
    println!("KPARAM_ELEVATE={}", cfg.elevate);
    println!("KPARAM_SETTLE_MS={}", cfg.settle_ms);
    println!("KPARAM_PAUSE_MS={}", cfg.pause_ms);
    println!("KPARAM_OP_TIMEOUT_MS={}", cfg.op_timeout_ms);
    println!("KPARAM_LOG_WINDOW={}", cfg.log_window);
    println!("KPARAM_LOG={}", cfg.log_level);
    println!("KPARAM_LOG_FORMAT={}", cfg.log_format);
}
