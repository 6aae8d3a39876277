//! Logging utilities
//!
//! Provides logging configuration and helpers.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Log level configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// Pick the level from an explicit setting, falling back on `default`
    pub fn resolve(explicit: Option<&str>, default: LogLevel) -> Self {
        explicit.and_then(Self::from_str).unwrap_or(default)
    }
}

/// Initialize the logger with specified level.
///
/// Logs go to stderr; stdout carries the run report.
pub fn init_logger(level: LogLevel) {
    let filter = EnvFilter::new(format!("test_backend={}", level.to_tracing_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!(LogLevel::from_str("info"), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_str("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_str("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str("unknown"), None);
    }

    #[test]
    fn test_resolve_level() {
        assert_eq!(LogLevel::resolve(None, LogLevel::Info), LogLevel::Info);
        assert_eq!(LogLevel::resolve(None, LogLevel::Debug), LogLevel::Debug);
        assert_eq!(LogLevel::resolve(Some("error"), LogLevel::Debug), LogLevel::Error);
        assert_eq!(LogLevel::resolve(Some("bogus"), LogLevel::Info), LogLevel::Info);
    }
}
