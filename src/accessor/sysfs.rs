//! `ParameterStore` backed by `/sys/module/<name>/parameters`.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{
    AccessError, AccessorConfig, DiagnosticLog, ElevatedWriter, LogFilter, LogWindow,
    ParameterStore,
};
use crate::param::ParamName;

/// Production accessor for a loaded kernel module.
pub struct SysfsStore {
    config: AccessorConfig,
    params_dir: PathBuf,
    writer: Box<dyn ElevatedWriter>,
    log: Box<dyn DiagnosticLog>,
    filter: LogFilter,
}

impl SysfsStore {
    pub fn new(
        config: AccessorConfig,
        writer: Box<dyn ElevatedWriter>,
        log: Box<dyn DiagnosticLog>,
    ) -> Self {
        let params_dir = config.params_dir();
        let filter = LogFilter::for_component(&config.module);
        Self {
            config,
            params_dir,
            writer,
            log,
            filter,
        }
    }

    pub fn param_path(&self, name: ParamName) -> PathBuf {
        self.params_dir.join(name.as_str())
    }
}

#[async_trait]
impl ParameterStore for SysfsStore {
    fn component_name(&self) -> &str {
        &self.config.module
    }

    async fn is_component_active(&self) -> bool {
        let path = &self.config.modules_file;
        let read = tokio::time::timeout(self.config.op_timeout, tokio::fs::read(path)).await;
        let bytes = match read {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => {
                debug!(path = %path.display(), error = %e, "module registry unreadable");
                return false;
            }
            Err(_) => {
                debug!(path = %path.display(), "module registry read timed out");
                return false;
            }
        };
        let registry = String::from_utf8_lossy(&bytes);
        registry
            .lines()
            .any(|line| line.split_whitespace().next() == Some(self.config.module.as_str()))
    }

    async fn read_parameter(&self, name: ParamName) -> Result<String, AccessError> {
        let path = self.param_path(name);
        let bytes = tokio::time::timeout(self.config.op_timeout, tokio::fs::read(&path))
            .await
            .map_err(|_| {
                AccessError::timeout(format!("read {}", path.display()), self.config.op_timeout)
            })?
            .map_err(|e| AccessError::from_io(&path, &e))?;
        // Glyphs above 0x7f are raw bytes, not UTF-8.
        Ok(String::from_utf8_lossy(&bytes).trim().to_string())
    }

    async fn write_parameter(&self, name: ParamName, value: &str) -> Result<(), AccessError> {
        let path = self.param_path(name);
        debug!(param = %name, value, "requesting write");
        self.writer.elevated_write(&path, value).await
    }

    async fn clear_diagnostic_log(&self) -> Result<(), AccessError> {
        self.log.clear().await
    }

    async fn read_diagnostic_log_window(&self, max_lines: usize) -> LogWindow {
        match self.log.read_all().await {
            Ok(text) => LogWindow::tail(&text, &self.filter, max_lines),
            Err(e) => {
                warn!(error = %e, "diagnostic log unreadable");
                LogWindow::default()
            }
        }
    }
}
