//! Fuzz target for command line parsing. Must never panic.

#![no_main]

use kparam_check::cli::parse_args;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|args: Vec<String>| {
    if let Ok(parsed) = parse_args(&args) {
        let _ = parsed.command();
        let _ = parsed.run_options();
    }
});
