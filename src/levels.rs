//! Log level parsing and severity ordering.
//!
//! The same alias table a caller's level string is normally given in
//! (`success` folds into `Info`, `critical`/`fatal` fold into `Error`),
//! extended with an explicit severity ordering so the criticality predicate
//! can ask "is this ERROR or higher" without depending on `tracing::Level`,
//! which this crate has no reason to tie the event payload's shape to.

/// A parsed log level, used only for the criticality predicate — advisory,
/// never required for a payload to be accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
}

impl Level {
    /// Parse a level name, case-insensitively, honoring common aliases.
    pub fn parse(name: &str) -> Option<Level> {
        match name.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" | "success" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warning),
            "error" | "critical" | "fatal" => Some(Level::Error),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
        }
    }

    /// Is this level ERROR or higher?
    pub fn is_critical(self) -> bool {
        self >= Level::Error
    }
}
