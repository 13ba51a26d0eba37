//! Privileged write transports.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::{command, AccessError, ElevatedWriter};

/// Writes through an elevation helper: `<program> tee <path>`.
///
/// The text is passed on stdin, never through a shell, so parameter values
/// cannot be interpreted as shell syntax.
pub struct SudoWriter {
    program: String,
    timeout: Duration,
}

impl SudoWriter {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ElevatedWriter for SudoWriter {
    async fn elevated_write(&self, path: &Path, text: &str) -> Result<(), AccessError> {
        let target = path.to_string_lossy();
        let line = format!("{}\n", text);
        command::run(&self.program, &["tee", &target], Some(&line), self.timeout).await?;
        Ok(())
    }
}

/// Writes in-process. Used when the harness already holds the privilege.
pub struct DirectWriter {
    timeout: Duration,
}

impl DirectWriter {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ElevatedWriter for DirectWriter {
    async fn elevated_write(&self, path: &Path, text: &str) -> Result<(), AccessError> {
        let write = async {
            // Never create: a missing parameter file is an observation, not a fixup.
            let mut file = tokio::fs::OpenOptions::new()
                .write(true)
                .truncate(true)
                .open(path)
                .await
                .map_err(|e| AccessError::from_io(path, &e))?;
            file.write_all(format!("{}\n", text).as_bytes())
                .await
                .map_err(|e| AccessError::from_io(path, &e))?;
            file.flush().await.map_err(|e| AccessError::from_io(path, &e))
        };

        tokio::time::timeout(self.timeout, write)
            .await
            .map_err(|_| AccessError::timeout(format!("write {}", path.display()), self.timeout))?
    }
}
