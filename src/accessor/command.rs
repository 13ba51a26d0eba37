//! Bounded execution of external helper programs.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::AccessError;

fn describe(program: &str, args: &[&str]) -> String {
    let mut line = program.to_string();
    for a in args {
        line.push(' ');
        line.push_str(a);
    }
    line
}

/// Run `program args...`, optionally feeding `stdin`, and return its stdout.
///
/// The child is killed if it outlives `timeout`. A non-zero exit status is an
/// error carrying the child's stderr.
pub(crate) async fn run(
    program: &str,
    args: &[&str],
    stdin: Option<&str>,
    timeout: Duration,
) -> Result<String, AccessError> {
    let command_line = describe(program, args);

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if stdin.is_some() {
        cmd.stdin(Stdio::piped());
    }

    let exec = async {
        let mut child = cmd.spawn().map_err(|e| AccessError::Spawn {
            command: command_line.clone(),
            message: e.to_string(),
        })?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes())
                .await
                .map_err(|e| AccessError::Io {
                    path: command_line.clone(),
                    message: e.to_string(),
                })?;
            // Closing stdin lets the child see EOF.
            drop(pipe);
        }

        child.wait_with_output().await.map_err(|e| AccessError::Io {
            path: command_line.clone(),
            message: e.to_string(),
        })
    };

    let output = tokio::time::timeout(timeout, exec)
        .await
        .map_err(|_| AccessError::timeout(command_line.clone(), timeout))??;

    if !output.status.success() {
        return Err(AccessError::CommandFailed {
            command: command_line,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
