use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub reference: String,
    pub centre_id: i64,
    pub service_id: Option<i64>,
    pub service_name: String,
    pub service_price: Decimal,
    pub date: NaiveDate,
    #[serde(with = "hh_mm")]
    pub time: NaiveTime,
    pub status: BookingStatus,
    pub guest_first_name: String,
    pub guest_last_name: String,
    pub guest_phone: String,
    pub guest_email: String,
    pub guest_age_range: Option<String>,
    pub guest_gender: Option<String>,
    pub guest_state: Option<String>,
    #[serde(rename = "guestLGA")]
    pub guest_lga: Option<String>,
    pub user_id: Option<String>,
    pub reschedule_reason: Option<String>,
    pub cancellation_reason: Option<String>,
    pub additional_feedback: Option<String>,
    pub agreed_to_terms: bool,
    pub refund_percentage: Option<u8>,
    pub refund_amount: Option<Decimal>,
    pub reschedule_count: i64,
    pub version: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    pub fn appointment_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    pub fn guest_name(&self) -> String {
        format!("{} {}", self.guest_first_name, self.guest_last_name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    /// Transition target only; a rescheduled booking keeps its prior status.
    Rescheduled,
    NoShow,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 6] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
        BookingStatus::Rescheduled,
        BookingStatus::NoShow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Rescheduled => "RESCHEDULED",
            BookingStatus::NoShow => "NO_SHOW",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(BookingStatus::Pending),
            "CONFIRMED" => Some(BookingStatus::Confirmed),
            "COMPLETED" => Some(BookingStatus::Completed),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            "RESCHEDULED" => Some(BookingStatus::Rescheduled),
            "NO_SHOW" => Some(BookingStatus::NoShow),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::NoShow
        )
    }

    /// Targets reachable from this status in one transition.
    pub fn allowed_targets(&self) -> &'static [BookingStatus] {
        match self {
            BookingStatus::Pending => &[
                BookingStatus::Confirmed,
                BookingStatus::Cancelled,
                BookingStatus::Rescheduled,
            ],
            BookingStatus::Confirmed => &[
                BookingStatus::Completed,
                BookingStatus::Cancelled,
                BookingStatus::Rescheduled,
                BookingStatus::NoShow,
            ],
            BookingStatus::Completed
            | BookingStatus::Cancelled
            | BookingStatus::Rescheduled
            | BookingStatus::NoShow => &[],
        }
    }

    pub fn can_transition_to(&self, target: BookingStatus) -> bool {
        self.allowed_targets().contains(&target)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Booking request as submitted by the booking form. Every field is optional
/// so that missing ones are reported together instead of failing to parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub centre_id: Option<i64>,
    pub service_id: Option<i64>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub guest_first_name: Option<String>,
    pub guest_last_name: Option<String>,
    pub guest_phone: Option<String>,
    pub guest_email: Option<String>,
    pub guest_age_range: Option<String>,
    pub guest_gender: Option<String>,
    pub guest_state: Option<String>,
    #[serde(rename = "guestLGA", alias = "guestLga")]
    pub guest_lga: Option<String>,
    pub service_name: Option<String>,
    pub service_price: Option<Decimal>,
    pub user_id: Option<String>,
    #[serde(default)]
    pub agreed_to_terms: bool,
    pub additional_feedback: Option<String>,
}

/// Caller-supplied inputs for a status transition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionContext {
    #[serde(default)]
    pub agreed_to_terms: bool,
    pub cancellation_reason: Option<String>,
    pub custom_reason: Option<String>,
    pub additional_feedback: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub reschedule_reason: Option<String>,
    pub expected_version: Option<i64>,
}

pub(crate) mod hh_mm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, "%H:%M").map_err(serde::de::Error::custom)
    }
}
