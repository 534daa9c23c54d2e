use chrono::{Duration, NaiveDateTime};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::AppConfig;
use crate::models::{Booking, RefundQuote, RefundTier};

#[derive(Debug, Clone)]
pub struct CancellationPolicy {
    /// Sorted by `min_days`, longest lead time first.
    tiers: Vec<RefundTier>,
    minor_units: u32,
}

impl CancellationPolicy {
    pub fn new(mut tiers: Vec<RefundTier>, minor_units: u32) -> anyhow::Result<Self> {
        tiers.sort_by(|a, b| b.min_days.cmp(&a.min_days));

        for tier in &tiers {
            anyhow::ensure!(
                tier.percentage <= 100,
                "refund percentage {} exceeds 100",
                tier.percentage
            );
        }
        for pair in tiers.windows(2) {
            anyhow::ensure!(
                pair[0].min_days != pair[1].min_days,
                "duplicate refund tier for {} days",
                pair[0].min_days
            );
            anyhow::ensure!(
                pair[0].percentage >= pair[1].percentage,
                "refund tiers must not grow as the appointment approaches ({} days: {}%, {} days: {}%)",
                pair[0].min_days,
                pair[0].percentage,
                pair[1].min_days,
                pair[1].percentage
            );
        }

        Ok(Self { tiers, minor_units })
    }

    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        Self::new(config.refund_tiers.clone(), config.currency_minor_units)
    }

    /// Whole days until the appointment, rounded up.
    pub fn days_until(appointment: NaiveDateTime, now: NaiveDateTime) -> i64 {
        let remaining = appointment - now;
        // num_days truncates toward zero, so only a positive remainder rounds up.
        let whole = remaining.num_days();
        if remaining > Duration::days(whole) {
            whole + 1
        } else {
            whole
        }
    }

    pub fn percentage_for(&self, days_until: i64) -> u8 {
        self.tiers
            .iter()
            .find(|t| days_until >= t.min_days)
            .map(|t| t.percentage)
            .unwrap_or(0)
    }

    pub fn refund_amount(&self, price: Decimal, percentage: u8) -> Decimal {
        (price * Decimal::from(percentage) / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(self.minor_units, RoundingStrategy::MidpointAwayFromZero)
    }

    pub fn compute_refund(&self, booking: &Booking, now: NaiveDateTime) -> RefundQuote {
        let days_until = Self::days_until(booking.appointment_at(), now);
        let percentage = self.percentage_for(days_until);

        RefundQuote {
            days_until,
            percentage,
            amount: self.refund_amount(booking.service_price, percentage),
        }
    }
}

impl Default for CancellationPolicy {
    fn default() -> Self {
        Self {
            tiers: RefundTier::defaults(),
            minor_units: 2,
        }
    }
}
