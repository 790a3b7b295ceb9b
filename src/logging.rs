//! Logging setup for the pipeline binary

use std::env;
use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither RUST_LOG nor --log-level give a valid one
pub const DEFAULT_LEVEL: &str = "info";

/// Configuration for the logging system
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level filter (e.g., "debug", "info", "warn", "error")
    pub level: String,
    /// Optional log file path. If None, logs only to stderr
    pub file_path: Option<PathBuf>,
    /// Whether to use structured JSON format for logs
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL.to_string(),
            file_path: None,
            json_format: false,
        }
    }
}

impl LogConfig {
    /// Create LogConfig from environment variables
    pub fn from_env() -> Self {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LEVEL.to_string());

        let file_path = env::var("PCH_PIPELINE_LOG_FILE").ok().map(|path| {
            let mut path_buf = PathBuf::from(path);

            // Add process ID if PCH_PIPELINE_LOG_UNIQUE is set
            if env::var("PCH_PIPELINE_LOG_UNIQUE").unwrap_or_default() == "true" {
                path_buf = unique_log_path(&path_buf, std::process::id());
            }

            path_buf
        });

        let json_format = env::var("PCH_PIPELINE_LOG_JSON").unwrap_or_default() == "true";

        Self {
            level,
            file_path,
            json_format,
        }
    }

    /// Override values from CLI arguments
    pub fn with_overrides(mut self, level: Option<String>, file_path: Option<PathBuf>) -> Self {
        if let Some(level) = level {
            self.level = level;
        }
        if let Some(file_path) = file_path {
            self.file_path = Some(file_path);
        }
        self
    }
}

/// Insert the process id between file stem and extension
fn unique_log_path(path: &Path, pid: u32) -> PathBuf {
    let Some(filename) = path.file_stem() else {
        return path.to_path_buf();
    };
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

    let unique_filename = if extension.is_empty() {
        format!("{}.{}", filename.to_string_lossy(), pid)
    } else {
        format!("{}.{}.{}", filename.to_string_lossy(), pid, extension)
    };
    path.with_file_name(unique_filename)
}

/// Install the global subscriber
///
/// Logs go to the configured file or to stderr, never to stdout: stdout
/// carries the JSON report.
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_new(&config.level).or_else(|_| EnvFilter::try_new(DEFAULT_LEVEL))?;

    let (writer, ansi) = match &config.file_path {
        Some(file_path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(file_path)?;
            (BoxMakeWriter::new(Arc::new(file)), false)
        }
        None => (BoxMakeWriter::new(io::stderr), io::stderr().is_terminal()),
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.json_format {
        registry
            .with(fmt::layer().json().with_writer(writer).with_ansi(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(ansi)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true),
            )
            .init();
    }

    Ok(())
}

/// Log how long a pipeline stage took
#[macro_export]
macro_rules! log_timing {
    ($level:expr, $operation:expr, $duration:expr) => {
        tracing::event!(
            $level,
            operation = $operation,
            duration_ms = $duration.as_millis(),
            pid = std::process::id(),
            "Performance timing"
        );
    };
}
