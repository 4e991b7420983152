//! Logging configuration and initialization.
//!
//! stdout is the IPC channel, so every log line goes to stderr.

use tracing_subscriber::{fmt, EnvFilter};

pub const FORMAT_ENV: &str = "SCHOOLD_LOG_FORMAT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl LoggingConfig {
    /// Defaults, with the output format taken from `SCHOOLD_LOG_FORMAT` when set.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(format) = std::env::var(FORMAT_ENV) {
            cfg.format = format;
        }
        cfg
    }

    /// Initialize the tracing subscriber. `RUST_LOG` overrides `level`.
    pub fn init(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        let result = match self.format.as_str() {
            "json" => fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init(),
            _ => fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .try_init(),
        };
        if result.is_err() {
            tracing::debug!("tracing subscriber already installed");
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}
