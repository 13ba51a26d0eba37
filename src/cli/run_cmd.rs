// Copyright 2024-2026 kparam-check Contributors
// SPDX-License-Identifier: Apache-2.0

//! `run`: execute the scenario catalogue and print the report.

use crate::accessor::{self, ParameterStore};
use crate::cli::{privilege, EXIT_FAILED, EXIT_NOT_LOADED, EXIT_OK, EXIT_USAGE};
use crate::config::EnvConfig;
use crate::orchestrator::{Orchestrator, OrchestratorConfig};
use crate::scenario;

/// Per-run switches from the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Skip the root confirmation prompt.
    pub assume_yes: bool,
    /// Print the report as JSON instead of text.
    pub json: bool,
    /// Append the boundary scenarios to the catalogue.
    pub extended: bool,
}

/// Run against the live module described by `env`.
///
/// Returns the process exit code.
pub async fn run_suite(env: EnvConfig, opts: RunOptions) -> u8 {
    if privilege::is_elevated() && !opts.assume_yes {
        let stdin = std::io::stdin();
        if !privilege::confirm(stdin.lock(), std::io::stderr()) {
            eprintln!("Aborted.");
            return EXIT_OK;
        }
    }

    let store = accessor::create_store(env.accessor);
    run_against(store, env.orchestrator, opts).await
}

/// Run against any store. Refuses to start if the component is absent.
pub async fn run_against<S: ParameterStore>(
    store: S,
    config: OrchestratorConfig,
    opts: RunOptions,
) -> u8 {
    let module = store.component_name().to_string();
    if !store.is_component_active().await {
        eprintln!("Module {} is not loaded!", module);
        eprintln!("Load it with: sudo insmod {}.ko", module);
        return EXIT_NOT_LOADED;
    }

    let mut scenarios = scenario::catalogue();
    if opts.extended {
        scenarios.extend(scenario::extended());
    }

    if !opts.json {
        println!("🚀 Checking parameters of {} ({} scenarios)", module, scenarios.len());
        println!("Time: {}", chrono::Local::now().format("%a %b %e %H:%M:%S %Y"));
    }

    let orchestrator = Orchestrator::new(store, config);
    let report = orchestrator
        .run_with(&scenarios, |result| {
            if !opts.json {
                println!("\n{}", result.render());
            }
        })
        .await;

    if opts.json {
        match report.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to serialize report: {}", e);
                return EXIT_USAGE;
            }
        }
    } else {
        println!("\n{}", report);
    }

    if report.all_passed() {
        EXIT_OK
    } else {
        EXIT_FAILED
    }
}
