//! RewardCraft Logging
//!
//! Logging setup shared by the CLI and integration tests.
//!
//! ## Usage
//!
//! ```no_run
//! use rewardcraft_logging::{init, LogLevel};
//!
//! // From a `-v` count (common CLI pattern)
//! init(LogLevel::from_verbosity(1));
//! ```
//!
//! `RUST_LOG` overrides the level when set. Without it, dependencies log at
//! `warn` and the `rewardcraft_*` crates at the chosen level, so HTTP client
//! chatter stays out of `-v` output.

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::EnvFilter;

/// Log level for the application
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// `false` → `Info`, `true` → `Debug`
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Self::Debug
        } else {
            Self::Info
        }
    }

    /// Create a log level from a verbosity count
    ///
    /// - `0` → `Info`
    /// - `1` → `Debug`
    /// - `2+` → `Trace`
    pub fn from_verbosity(count: u8) -> Self {
        match count {
            0 => Self::Info,
            1 => Self::Debug,
            _ => Self::Trace,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    /// Filter directive used when `RUST_LOG` is unset.
    pub fn directive(&self) -> String {
        match self {
            Self::Error | Self::Warn => self.as_str().to_string(),
            _ => format!("warn,rewardcraft={}", self.as_str()),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

fn filter_for(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()))
}

/// Initialize logging with the specified level
///
/// # Panics
///
/// Panics if a global subscriber is already set. Use `try_init` if you need
/// to handle this case.
pub fn init(level: LogLevel) {
    try_init(level).expect("Failed to initialize logging");
}

/// Try to initialize logging, returning an error if already initialized
pub fn try_init(level: LogLevel) -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(level))
        .with_target(false)
        .try_init()
        .map_err(|e| e.to_string())
}

/// Initialize logging with module targets shown
pub fn init_with_target(level: LogLevel, show_target: bool) -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(level))
        .with_target(show_target)
        .try_init()
        .map_err(|e| e.to_string())
}

/// Initialize logging for tests (captures output for test framework)
#[cfg(any(test, feature = "test-utils"))]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_verbose() {
        assert_eq!(LogLevel::from_verbose(false), LogLevel::Info);
        assert_eq!(LogLevel::from_verbose(true), LogLevel::Debug);
    }

    #[test]
    fn test_log_level_from_verbosity() {
        assert_eq!(LogLevel::from_verbosity(0), LogLevel::Info);
        assert_eq!(LogLevel::from_verbosity(1), LogLevel::Debug);
        assert_eq!(LogLevel::from_verbosity(2), LogLevel::Trace);
        assert_eq!(LogLevel::from_verbosity(10), LogLevel::Trace);
    }

    #[test]
    fn test_directive_scopes_own_crates() {
        assert_eq!(LogLevel::Debug.directive(), "warn,rewardcraft=debug");
        assert_eq!(LogLevel::Info.directive(), "warn,rewardcraft=info");
        assert_eq!(LogLevel::Error.directive(), "error");
    }

    #[test]
    fn test_parse_round_trip() {
        for level in [
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ] {
            assert_eq!(level.to_string().parse::<LogLevel>().unwrap(), level);
        }
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_log_level_default() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
        assert!(LogLevel::Trace > LogLevel::Info);
    }

    #[test]
    fn test_init_test_is_idempotent() {
        init_test();
        init_test();
        assert!(try_init(LogLevel::Info).is_err());
    }
}
