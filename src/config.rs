//! Engine configuration.
//!
//! A chainable builder that validates on `build()` rather than clamping
//! silently at each setter.

use crate::error::{EngineError, Result};
use std::time::Duration;

/// Tunables recognized by the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Master switch; when false, no buffering occurs.
    pub enabled: bool,
    /// Lower bound on emission interval.
    pub min_interval: Duration,
    /// Upper bound; pinned during high-load mode.
    pub max_interval: Duration,
    /// Period over which intake rate is measured.
    pub rate_window: Duration,
    /// Cap on `LogBuffer` length.
    pub max_buffer_size: usize,
    /// Rate under which non-critical logs may bypass buffering. `None`
    /// disables the direct-pass optimization entirely.
    pub direct_pass_threshold: Option<f64>,
    /// Ticker period for guaranteed emission.
    pub periodic_flush_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_interval: Duration::from_millis(16),
            max_interval: Duration::from_millis(250),
            rate_window: Duration::from_secs(1),
            max_buffer_size: 5000,
            direct_pass_threshold: Some(10.0),
            periodic_flush_interval: Duration::from_millis(250),
        }
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Validate that the configured bounds are internally consistent. Called
    /// by [`EngineConfigBuilder::build`]; also usable on a hand-built struct.
    pub fn validate(&self) -> Result<()> {
        if self.min_interval > self.max_interval {
            return Err(EngineError::InvalidIntervalBounds {
                min_ms: self.min_interval.as_millis() as u64,
                max_ms: self.max_interval.as_millis() as u64,
            });
        }
        if self.max_buffer_size == 0 {
            return Err(EngineError::InvalidBufferSize);
        }
        if self.rate_window.is_zero() {
            return Err(EngineError::InvalidRateWindow);
        }
        if let Some(threshold) = self.direct_pass_threshold {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(EngineError::InvalidDirectPassThreshold(threshold));
            }
        }
        Ok(())
    }

    /// 80% of `max_buffer_size`: the async-flush pressure trigger.
    pub fn flush_pressure_threshold(&self) -> usize {
        (self.max_buffer_size * 4) / 5
    }
}

/// Chainable builder for [`EngineConfig`]. `build()` validates rather than
/// clamping silently at each setter: an out-of-order `min_interval`/
/// `max_interval` pair is a configuration mistake worth surfacing, not
/// silently reordering.
#[derive(Debug, Clone)]
pub struct EngineConfigBuilder {
    inner: EngineConfig,
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self { inner: EngineConfig::default() }
    }
}

impl EngineConfigBuilder {
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.inner.enabled = enabled;
        self
    }

    pub fn min_interval(mut self, interval: Duration) -> Self {
        self.inner.min_interval = interval;
        self
    }

    pub fn max_interval(mut self, interval: Duration) -> Self {
        self.inner.max_interval = interval;
        self
    }

    pub fn rate_window(mut self, window: Duration) -> Self {
        self.inner.rate_window = window;
        self
    }

    pub fn max_buffer_size(mut self, size: usize) -> Self {
        self.inner.max_buffer_size = size;
        self
    }

    pub fn direct_pass_threshold(mut self, threshold: Option<f64>) -> Self {
        self.inner.direct_pass_threshold = threshold;
        self
    }

    pub fn periodic_flush_interval(mut self, interval: Duration) -> Self {
        self.inner.periodic_flush_interval = interval;
        self
    }

    pub fn build(self) -> Result<EngineConfig> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_bounds() {
        let result = EngineConfig::builder()
            .min_interval(Duration::from_millis(500))
            .max_interval(Duration::from_millis(10))
            .build();
        assert!(matches!(result, Err(EngineError::InvalidIntervalBounds { .. })));
    }

    #[test]
    fn rejects_zero_buffer_size() {
        let result = EngineConfig::builder().max_buffer_size(0).build();
        assert_eq!(result.unwrap_err(), EngineError::InvalidBufferSize);
    }

    #[test]
    fn rejects_zero_rate_window() {
        let result = EngineConfig::builder().rate_window(Duration::ZERO).build();
        assert_eq!(result.unwrap_err(), EngineError::InvalidRateWindow);
    }

    #[test]
    fn flush_pressure_threshold_is_eighty_percent() {
        let cfg = EngineConfig::builder().max_buffer_size(5000).build().unwrap();
        assert_eq!(cfg.flush_pressure_threshold(), 4000);
    }
}
