//! Booking request offers and earnings math.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A booking-request proposal assigned to a recruited host. Immutable until
/// superseded; the negotiated rate lives on the negotiation state, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingOffer {
    /// Booking request ID.
    pub request_id: Uuid,
    /// Short description of the vehicle the guest wants.
    pub vehicle_summary: String,
    /// Guest identity summary (name, rating).
    pub guest_summary: String,
    /// First rental day.
    pub start_date: NaiveDate,
    /// Last rental day.
    pub end_date: NaiveDate,
    /// Rental duration in days.
    pub duration_days: u32,
    /// Platform-offered daily rate.
    pub daily_rate: Decimal,
    /// Pickup city.
    pub pickup_city: String,
    /// Pickup state/region code.
    pub pickup_state: String,
    /// Hard negotiation deadline.
    pub expires_at: DateTime<Utc>,
}

/// Earnings breakdown for a rate and duration, shown during negotiation and
/// used at finalization. The formula is the same whether the rate is the
/// original offer or an approved counter-offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarningsPreview {
    pub daily_rate: Decimal,
    pub duration_days: u32,
    /// `daily_rate × duration_days`.
    pub total: Decimal,
    /// `total × platform fee ratio`.
    pub platform_fee: Decimal,
    /// `total − platform_fee`.
    pub host_earnings: Decimal,
}

impl EarningsPreview {
    /// Compute the breakdown, rounded to cents.
    pub fn compute(daily_rate: Decimal, duration_days: u32, fee_ratio: Decimal) -> Self {
        let total = (daily_rate * Decimal::from(duration_days)).round_dp(2);
        let platform_fee = (total * fee_ratio).round_dp(2);
        let host_earnings = total - platform_fee;
        Self {
            daily_rate,
            duration_days,
            total,
            platform_fee,
            host_earnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn earnings_reference_case() {
        // rate=45, duration=14 → total 630.00, fee 63.00, host 567.00
        let preview = EarningsPreview::compute(dec!(45), 14, dec!(0.10));
        assert_eq!(preview.total, dec!(630.00));
        assert_eq!(preview.platform_fee, dec!(63.00));
        assert_eq!(preview.host_earnings, dec!(567.00));
    }

    #[test]
    fn earnings_round_to_cents() {
        let preview = EarningsPreview::compute(dec!(33.33), 3, dec!(0.10));
        assert_eq!(preview.total, dec!(99.99));
        assert_eq!(preview.platform_fee, dec!(10.00));
        assert_eq!(preview.host_earnings, dec!(89.99));
    }

    #[test]
    fn fee_plus_earnings_equals_total() {
        for rate in [dec!(19.99), dec!(45), dec!(120.50)] {
            for days in [1u32, 7, 30] {
                let p = EarningsPreview::compute(rate, days, dec!(0.10));
                assert_eq!(p.platform_fee + p.host_earnings, p.total);
            }
        }
    }
}
