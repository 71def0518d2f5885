//! Maps measured intake rate to the current emission interval.

use crate::config::EngineConfig;
use std::time::Duration;

/// Compute the emission interval for a measured `rate` (events/second).
///
/// Table-driven and monotone non-decreasing in `rate`, clamped to
/// `[min_interval, max_interval]`:
///
/// | rate        | interval      |
/// |-------------|---------------|
/// | < 10        | `min_interval`|
/// | 10..100     | 50ms          |
/// | 100..500    | 100ms         |
/// | >= 500      | `max_interval`|
pub fn compute_interval(rate: f64, cfg: &EngineConfig) -> Duration {
    let tiered = if rate < 10.0 {
        cfg.min_interval
    } else if rate < 100.0 {
        Duration::from_millis(50)
    } else if rate < 500.0 {
        Duration::from_millis(100)
    } else {
        cfg.max_interval
    };
    tiered.clamp(cfg.min_interval, cfg.max_interval)
}

/// Should a non-critical event at this rate bypass buffering for direct,
/// low-latency emission? Only when high-load mode is not pinning the
/// interval and the configured threshold is enabled.
pub fn should_direct_pass(rate: f64, high_load_mode: bool, cfg: &EngineConfig) -> bool {
    if high_load_mode {
        return false;
    }
    match cfg.direct_pass_threshold {
        Some(threshold) => rate < threshold,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn cfg() -> EngineConfig {
        EngineConfig::default()
    }

    #[test]
    fn low_rate_uses_min_interval() {
        assert_eq!(compute_interval(0.0, &cfg()), cfg().min_interval);
        assert_eq!(compute_interval(9.9, &cfg()), cfg().min_interval);
    }

    #[test]
    fn mid_tiers_use_configured_steps() {
        assert_eq!(compute_interval(50.0, &cfg()), Duration::from_millis(50));
        assert_eq!(compute_interval(200.0, &cfg()), Duration::from_millis(100));
    }

    #[test]
    fn high_rate_uses_max_interval() {
        assert_eq!(compute_interval(10_000.0, &cfg()), cfg().max_interval);
    }

    #[test]
    fn monotone_non_decreasing_across_tiers() {
        let c = cfg();
        let rates = [0.0, 5.0, 9.9, 10.0, 50.0, 99.9, 100.0, 300.0, 499.9, 500.0, 10_000.0];
        let mut prev = Duration::ZERO;
        for r in rates {
            let interval = compute_interval(r, &c);
            assert!(interval >= prev, "interval regressed at rate {r}");
            prev = interval;
        }
    }

    #[test]
    fn result_always_within_configured_bounds() {
        let c = EngineConfig::builder()
            .min_interval(Duration::from_millis(20))
            .max_interval(Duration::from_millis(200))
            .build()
            .unwrap();
        for r in [0.0, 15.0, 50.0, 150.0, 1000.0] {
            let interval = compute_interval(r, &c);
            assert!(interval >= c.min_interval && interval <= c.max_interval);
        }
    }

    #[test]
    fn direct_pass_disabled_in_high_load_mode() {
        assert!(!should_direct_pass(0.0, true, &cfg()));
    }

    #[test]
    fn direct_pass_gated_by_threshold() {
        let c = cfg();
        assert!(should_direct_pass(1.0, false, &c));
        assert!(!should_direct_pass(50.0, false, &c));
    }

    #[test]
    fn direct_pass_disabled_when_threshold_is_none() {
        let c = EngineConfig::builder().direct_pass_threshold(None).build().unwrap();
        assert!(!should_direct_pass(0.0, false, &c));
    }
}
