//! Configuration types.

use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum onboarding photos before the photo task counts as complete.
    pub min_photos: usize,
    /// Hard cap on onboarding photos; submissions past this are rejected.
    pub max_photos: usize,
    /// Lower bound of the counter-offer band, as a ratio of the offered rate.
    pub counter_floor_ratio: Decimal,
    /// Upper bound of the counter-offer band, as a ratio of the offered rate.
    pub counter_ceiling_ratio: Decimal,
    /// Platform fee taken off the booking total.
    pub platform_fee_ratio: Decimal,
    /// Remaining time below which a request is flagged as expiring soon.
    /// Presentation urgency only; does not gate any action.
    pub expiring_soon: Duration,
    /// Expiry ticker resolution.
    pub tick_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_photos: 3,
            max_photos: 8,
            counter_floor_ratio: dec!(0.5),
            counter_ceiling_ratio: dec!(2),
            platform_fee_ratio: dec!(0.10),
            expiring_soon: Duration::from_secs(12 * 3600), // 12 hours
            tick_interval: Duration::from_secs(1),
        }
    }
}

/// HTTP surface and upstream configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Address the API server binds to.
    pub bind_addr: String,
    /// Base URL of the platform's internal API (host directory, fleet,
    /// insurance, payout, booking desk).
    pub upstream_base_url: String,
    /// Per-request timeout for upstream calls.
    pub upstream_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            upstream_base_url: "http://localhost:9000".to_string(),
            upstream_timeout: Duration::from_secs(10), // 10 seconds
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_business_rules() {
        let config = EngineConfig::default();
        assert_eq!(config.min_photos, 3);
        assert_eq!(config.max_photos, 8);
        assert_eq!(config.counter_floor_ratio, dec!(0.5));
        assert_eq!(config.counter_ceiling_ratio, dec!(2));
        assert_eq!(config.platform_fee_ratio, dec!(0.10));
        assert_eq!(config.expiring_soon, Duration::from_secs(43_200));
        assert_eq!(config.tick_interval, Duration::from_secs(1));
    }
}
