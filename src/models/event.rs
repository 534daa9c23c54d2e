use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{Booking, BookingStatus, RefundQuote};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BookingEventKind {
    BookingCreated,
    BookingCancelled,
    BookingRescheduled,
    BookingStatusChanged,
}

impl BookingEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingEventKind::BookingCreated => "BookingCreated",
            BookingEventKind::BookingCancelled => "BookingCancelled",
            BookingEventKind::BookingRescheduled => "BookingRescheduled",
            BookingEventKind::BookingStatusChanged => "BookingStatusChanged",
        }
    }
}

/// Published once a booking change has been committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingEvent {
    pub kind: BookingEventKind,
    pub booking_id: String,
    pub reference: String,
    pub centre_id: i64,
    pub status: BookingStatus,
    pub guest_name: String,
    pub guest_phone: String,
    pub guest_email: String,
    pub appointment_at: NaiveDateTime,
    pub refund: Option<RefundQuote>,
    pub occurred_at: NaiveDateTime,
}

impl BookingEvent {
    pub fn new(kind: BookingEventKind, booking: &Booking, refund: Option<RefundQuote>) -> Self {
        Self {
            kind,
            booking_id: booking.id.clone(),
            reference: booking.reference.clone(),
            centre_id: booking.centre_id,
            status: booking.status,
            guest_name: booking.guest_name(),
            guest_phone: booking.guest_phone.clone(),
            guest_email: booking.guest_email.clone(),
            appointment_at: booking.appointment_at(),
            refund,
            occurred_at: booking.updated_at,
        }
    }
}
