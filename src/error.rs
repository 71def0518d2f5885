//! Error types for the throttling engine.
//!
//! A small set of variants, each carrying enough detail to render a useful
//! message, with a `Display` impl and a `Result` alias. No panics leave this
//! module; every fallible path here is a configuration or validation error
//! surfaced at construction time.

use std::fmt;

/// Errors produced while building or configuring an [`crate::Engine`].
///
/// Intake operations themselves never return `Result`: this type is only
/// reachable from [`crate::EngineConfig`] validation and builder misuse.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// `min_interval` was greater than `max_interval`.
    InvalidIntervalBounds { min_ms: u64, max_ms: u64 },
    /// `max_buffer_size` was zero.
    InvalidBufferSize,
    /// `rate_window` was zero.
    InvalidRateWindow,
    /// `direct_pass_threshold` was negative or not finite.
    InvalidDirectPassThreshold(f64),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidIntervalBounds { min_ms, max_ms } => write!(
                f,
                "min_interval ({min_ms}ms) must be less than or equal to max_interval ({max_ms}ms)"
            ),
            EngineError::InvalidBufferSize => {
                write!(f, "max_buffer_size must be greater than zero")
            }
            EngineError::InvalidRateWindow => write!(f, "rate_window must be greater than zero"),
            EngineError::InvalidDirectPassThreshold(v) => {
                write!(f, "direct_pass_threshold must be a non-negative finite number, got {v}")
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// Convenience `Result` alias for engine construction and configuration.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_values() {
        let err = EngineError::InvalidIntervalBounds { min_ms: 500, max_ms: 10 };
        let msg = err.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("10"));
    }

}
