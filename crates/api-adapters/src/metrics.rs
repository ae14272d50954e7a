//! # Metrics
//!
//! Prometheus counters for the ad engine, rendered in OpenMetrics text at
//! `/metrics`.

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::registry::Registry;

#[derive(Debug)]
pub struct AdMetrics {
    registry: Registry,
    pub impressions_recorded: Counter,
    pub ads_expired: Counter,
    pub sweeps: Counter,
    pub replay_fallbacks: Counter,
}

impl AdMetrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("kaboom_ads");

        let impressions_recorded = Counter::default();
        registry.register(
            "impressions_recorded",
            "Replay impressions persisted",
            impressions_recorded.clone(),
        );

        let ads_expired = Counter::default();
        registry.register(
            "expired",
            "Ads moved to expired by the cap check or a sweep",
            ads_expired.clone(),
        );

        let sweeps = Counter::default();
        registry.register("sweeps", "Completed expiry sweeps", sweeps.clone());

        let replay_fallbacks = Counter::default();
        registry.register(
            "replay_fallbacks",
            "Replay requests answered with no eligible ad",
            replay_fallbacks.clone(),
        );

        Self {
            registry,
            impressions_recorded,
            ads_expired,
            sweeps,
            replay_fallbacks,
        }
    }

    /// Records the outcome of one sweep, whichever path triggered it.
    pub fn observe_sweep(&self, expired: usize) {
        self.sweeps.inc();
        self.ads_expired.inc_by(expired as u64);
    }

    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut buf = String::new();
        encode(&mut buf, &self.registry)?;
        Ok(buf)
    }
}

impl Default for AdMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_prefixed_counters() {
        let metrics = AdMetrics::new();
        metrics.impressions_recorded.inc();
        metrics.observe_sweep(3);

        let text = metrics.render().unwrap();
        assert!(text.contains("kaboom_ads_impressions_recorded_total 1"));
        assert!(text.contains("kaboom_ads_expired_total 3"));
        assert!(text.contains("kaboom_ads_sweeps_total 1"));
        assert!(text.contains("kaboom_ads_replay_fallbacks_total 0"));
    }
}
