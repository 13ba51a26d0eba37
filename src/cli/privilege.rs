// Copyright 2024-2026 kparam-check Contributors
// SPDX-License-Identifier: Apache-2.0

//! Guard against accidental destructive runs as root.

use std::io::{BufRead, Write};

/// Whether the harness itself runs with an effective UID of root.
#[cfg(unix)]
pub fn is_elevated() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(not(unix))]
pub fn is_elevated() -> bool {
    false
}

/// Ask for explicit confirmation. Only `y`/`Y` proceeds.
pub fn confirm<R: BufRead, W: Write>(mut input: R, mut output: W) -> bool {
    let _ = writeln!(output, "⚠️  Warning: running as root!");
    let _ = writeln!(
        output,
        "Scenarios write to live module parameters. Running as a regular user is recommended."
    );
    let _ = write!(output, "Continue? (y/N): ");
    let _ = output.flush();

    let mut answer = String::new();
    if input.read_line(&mut answer).is_err() {
        return false;
    }
    answer.trim().eq_ignore_ascii_case("y")
}
