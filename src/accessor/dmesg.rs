//! Kernel ring buffer as the component's diagnostic log.

use std::time::Duration;

use async_trait::async_trait;

use super::{command, AccessError, DiagnosticLog};

/// `dmesg` reader. Clearing needs privilege, reading usually does not.
pub struct KernelRingBuffer {
    elevate: Option<String>,
    timeout: Duration,
}

impl KernelRingBuffer {
    pub fn new(elevate: Option<String>, timeout: Duration) -> Self {
        Self { elevate, timeout }
    }
}

#[async_trait]
impl DiagnosticLog for KernelRingBuffer {
    async fn clear(&self) -> Result<(), AccessError> {
        match &self.elevate {
            Some(program) => command::run(program, &["dmesg", "-C"], None, self.timeout).await?,
            None => command::run("dmesg", &["-C"], None, self.timeout).await?,
        };
        Ok(())
    }

    async fn read_all(&self) -> Result<String, AccessError> {
        command::run("dmesg", &[], None, self.timeout).await
    }
}
