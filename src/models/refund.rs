use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Refund earned when cancelling at least `min_days` before the appointment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RefundTier {
    pub min_days: i64,
    pub percentage: u8,
}

impl RefundTier {
    pub fn defaults() -> Vec<RefundTier> {
        vec![
            RefundTier {
                min_days: 7,
                percentage: 100,
            },
            RefundTier {
                min_days: 3,
                percentage: 75,
            },
            RefundTier {
                min_days: 1,
                percentage: 50,
            },
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RefundQuote {
    pub days_until: i64,
    pub percentage: u8,
    pub amount: Decimal,
}
