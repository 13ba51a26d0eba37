// Copyright 2024-2026 kparam-check Contributors
// SPDX-License-Identifier: Apache-2.0

//! `check` and `show`: read-only views of the module.
//!
//! Neither command writes to the module or clears the log.

use crate::accessor::ParameterStore;
use crate::cli::{EXIT_FAILED, EXIT_NOT_LOADED, EXIT_OK};
use crate::param::ParamName;

/// Exit 0 if the module is loaded, 3 otherwise.
pub async fn run_check<S: ParameterStore>(store: &S) -> u8 {
    if store.is_component_active().await {
        println!("{} is loaded", store.component_name());
        EXIT_OK
    } else {
        println!("{} is not loaded", store.component_name());
        EXIT_NOT_LOADED
    }
}

/// Print the selected parameters with their domains, then the recent
/// component log.
///
/// Returns 1 if any parameter could not be read.
pub async fn run_show<S: ParameterStore>(
    store: &S,
    params: &[ParamName],
    log_lines: usize,
) -> u8 {
    if !store.is_component_active().await {
        eprintln!("Module {} is not loaded!", store.component_name());
        return EXIT_NOT_LOADED;
    }

    let mut unreadable = 0;
    println!("Current parameter values:");
    for &param in params {
        let label = format!("{}:", param);
        match store.read_parameter(param).await {
            Ok(value) => println!("  {:<8} {:<20} [{}]", label, value, param.domain()),
            Err(e) => {
                println!("  {:<8} <unobservable: {}>", label, e);
                unreadable += 1;
            }
        }
    }

    println!("\nRecent component log:");
    let window = store.read_diagnostic_log_window(log_lines).await;
    for line in window.to_string().lines() {
        println!("  {}", line);
    }

    if unreadable == 0 {
        EXIT_OK
    } else {
        EXIT_FAILED
    }
}
