use crate::tool::ToolKind;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Send timestamped log lines to stderr and append them to
/// `<log_dir>/<tool>.log`. Returns the log file path.
///
/// Only the first call in a process installs the subscriber; later calls
/// still create the log directory and report the path.
pub fn init(log_dir: &Path, tool: ToolKind) -> crate::Result<PathBuf> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;

    let file_name = tool.log_file_name();
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(&file_name)
        .build(log_dir)
        .with_context(|| format!("opening log file in {}", log_dir.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(fmt::layer().with_writer(appender).with_ansi(false).with_target(false))
        .try_init();

    Ok(log_dir.join(file_name))
}
