//! Leveled logging sink
//!
//! Every component that logs is handed an explicitly owned [`Logger`]. Messages
//! above the configured threshold are dropped before they are formatted; the
//! rest go to an installed callback or, by default, to `tracing`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError};

/// Message severity. Lower value means more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Level {
    #[serde(alias = "emerg")]
    Emergency = 0,
    Alert = 1,
    #[serde(alias = "crit")]
    Critical = 2,
    #[serde(alias = "err")]
    Error = 3,
    #[serde(alias = "warn")]
    Warning = 4,
    Notice = 5,
    Info = 6,
    Debug = 7,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Emergency => "emergency",
            Level::Alert => "alert",
            Level::Critical => "critical",
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Notice => "notice",
            Level::Info => "info",
            Level::Debug => "debug",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Level::Emergency,
            1 => Level::Alert,
            2 => Level::Critical,
            3 => Level::Error,
            4 => Level::Warning,
            5 => Level::Notice,
            6 => Level::Info,
            _ => Level::Debug,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown log level `{0}`")]
pub struct ParseLevelError(String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "emergency" | "emerg" => Ok(Level::Emergency),
            "alert" => Ok(Level::Alert),
            "critical" | "crit" => Ok(Level::Critical),
            "error" | "err" => Ok(Level::Error),
            "warning" | "warn" => Ok(Level::Warning),
            "notice" => Ok(Level::Notice),
            "info" => Ok(Level::Info),
            "debug" => Ok(Level::Debug),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Receives every message that passes the threshold.
pub type LogCallback = Box<dyn Fn(Level, &str) + Send + Sync>;

/// Thread-safe leveled sink.
pub struct Logger {
    level: AtomicU8,
    callback: Mutex<Option<LogCallback>>,
}

impl Logger {
    /// Creates a sink with threshold [`Level::Warning`] writing to `tracing`.
    pub fn new() -> Self {
        Self::with_level(Level::Warning)
    }

    pub fn with_level(level: Level) -> Self {
        Self {
            level: AtomicU8::new(level as u8),
            callback: Mutex::new(None),
        }
    }

    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Whether a message at `level` would be delivered.
    pub fn enabled(&self, level: Level) -> bool {
        level <= self.level()
    }

    /// Installs a callback, or restores the default destination with `None`.
    pub fn set_callback(&self, callback: Option<LogCallback>) {
        *self.callback.lock().unwrap_or_else(PoisonError::into_inner) = callback;
    }

    /// Delivers a message. Prefer the [`log!`](crate::log) macro, which builds
    /// the arguments lazily.
    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }

        let message = fmt::format(args);

        let callback = self.callback.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cb) = callback.as_ref() {
            cb(level, &message);
            return;
        }
        drop(callback);

        emit(level, &message);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level())
            .finish_non_exhaustive()
    }
}

fn emit(level: Level, message: &str) {
    match level {
        Level::Emergency | Level::Alert | Level::Critical | Level::Error => {
            tracing::error!(severity = level.as_str(), "{}", message)
        }
        Level::Warning => tracing::warn!("{}", message),
        Level::Notice => tracing::info!(severity = level.as_str(), "{}", message),
        Level::Info => tracing::info!("{}", message),
        Level::Debug => tracing::debug!("{}", message),
    }
}

/// Logs through a [`Logger`] without formatting disabled messages.
///
/// ```
/// # use httpd_reactor::{log, Level, Logger};
/// let logger = Logger::with_level(Level::Info);
/// log!(logger, Level::Info, "accepted client on socket {}", 7);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log($level, format_args!($($arg)+))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn levels_order_by_severity() {
        assert!(Level::Emergency < Level::Error);
        assert!(Level::Warning < Level::Debug);
        assert_eq!(Level::Debug as u8, 7);
    }

    #[test]
    fn parse_level_aliases() {
        assert_eq!("warn".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!("CRIT".parse::<Level>().unwrap(), Level::Critical);
        assert!("verbose".parse::<Level>().is_err());
    }

    #[test]
    fn default_threshold_is_warning() {
        let logger = Logger::new();
        assert_eq!(logger.level(), Level::Warning);
        assert!(logger.enabled(Level::Error));
        assert!(!logger.enabled(Level::Info));
    }

    #[test]
    fn callback_receives_formatted_message() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let logger = Logger::with_level(Level::Debug);
        logger.set_callback(Some(Box::new(move |level, msg| {
            sink.lock().unwrap().push((level, msg.to_string()));
        })));

        crate::log!(logger, Level::Debug, "test {}", "hello");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[(Level::Debug, "test hello".to_string())]);
    }
}
