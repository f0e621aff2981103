use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a whole run. Per-item failures inside a batch are
/// logged and counted instead of being raised.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{kind} not found: {}", path.display())]
    InputNotFound { kind: &'static str, path: PathBuf },

    #[error("{tool} failed: {message}")]
    ExternalTool { tool: String, message: String },
}

impl ToolError {
    pub fn missing(kind: &'static str, path: impl Into<PathBuf>) -> Self {
        Self::InputNotFound { kind, path: path.into() }
    }

    pub fn external(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalTool { tool: tool.into(), message: message.into() }
    }
}

/// Fails with `InputNotFound` unless `path` is an existing directory.
pub fn require_dir(path: &std::path::Path) -> crate::Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(ToolError::missing("directory", path).into())
    }
}

/// Fails with `InputNotFound` unless `path` is an existing regular file.
pub fn require_file(path: &std::path::Path) -> crate::Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ToolError::missing("file", path).into())
    }
}
