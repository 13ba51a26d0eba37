// Copyright 2024-2026 kparam-check Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI module for kparam-check commands.
//!
//! ## Usage
//!
//! ```bash
//! kparam-check              # Run the scenario catalogue (default)
//! kparam-check run --json   # Same, JSON report on stdout
//! kparam-check check        # Exit 0 if the module is loaded
//! kparam-check show         # Print current parameter values
//! kparam-check config show  # Print effective configuration
//! ```

pub mod config_cmd;
pub mod privilege;
pub mod run_cmd;
pub mod show_cmd;

pub use run_cmd::{run_against, run_suite, RunOptions};
pub use show_cmd::{run_check, run_show};

use thiserror::Error;

use crate::param::{ParamName, UnknownParam};

/// Every scenario passed / command succeeded.
pub const EXIT_OK: u8 = 0;
/// At least one scenario failed.
pub const EXIT_FAILED: u8 = 1;
/// Bad arguments or configuration.
pub const EXIT_USAGE: u8 = 2;
/// The module under test is not loaded.
pub const EXIT_NOT_LOADED: u8 = 3;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CliError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Unknown option: {0}")]
    UnknownOption(String),

    #[error("Option {0} requires a value")]
    MissingValue(String),
}

/// Parsed command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    /// Command words, e.g. `["config", "show"]`. Empty means `run`.
    pub command: Vec<String>,
    pub module: Option<String>,
    pub assume_yes: bool,
    pub json: bool,
    pub extended: bool,
}

impl CliArgs {
    pub fn command(&self) -> &str {
        self.command.first().map(|s| s.as_str()).unwrap_or("run")
    }

    pub fn subcommand(&self) -> Option<&str> {
        self.command.get(1).map(|s| s.as_str())
    }

    /// Parameter names given after the command, or all of them.
    pub fn selected_params(&self) -> Result<Vec<ParamName>, UnknownParam> {
        if self.command.len() <= 1 {
            return Ok(ParamName::ALL.to_vec());
        }
        self.command[1..].iter().map(|word| word.parse()).collect()
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            assume_yes: self.assume_yes,
            json: self.json,
            extended: self.extended,
        }
    }
}

/// Parse arguments after the program name.
pub fn parse_args(args: &[String]) -> Result<CliArgs, CliError> {
    let mut parsed = CliArgs::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--module" | "-m" => {
                let value = iter
                    .next()
                    .ok_or_else(|| CliError::MissingValue(arg.clone()))?;
                parsed.module = Some(value.clone());
            }
            "--yes" | "-y" => parsed.assume_yes = true,
            "--json" => parsed.json = true,
            "--extended" => parsed.extended = true,
            "-h" | "--help" => parsed.command.insert(0, "help".to_string()),
            "-V" | "--version" => parsed.command.insert(0, "version".to_string()),
            flag if flag.starts_with('-') => return Err(CliError::UnknownOption(flag.to_string())),
            word => parsed.command.push(word.to_string()),
        }
    }

    Ok(parsed)
}
