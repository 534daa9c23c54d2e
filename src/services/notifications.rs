use std::sync::Arc;

use crate::models::{BookingEvent, BookingEventKind};
use crate::state::AppState;

/// Publishes a committed booking change to stream subscribers and, when
/// Twilio is configured, texts the guest. Delivery failures are logged only.
pub fn publish(state: &Arc<AppState>, event: BookingEvent) {
    // No subscribers is not an error.
    let _ = state.events_tx.send(event.clone());

    if !state.config.twilio_configured() {
        tracing::debug!(kind = event.kind.as_str(), reference = %event.reference, "sms disabled, skipping");
        return;
    }

    let state = Arc::clone(state);
    tokio::spawn(async move {
        let body = sms_body(&event);
        if let Err(e) = state.messaging.send_message(&event.guest_phone, &body).await {
            tracing::error!(error = %e, reference = %event.reference, "failed to send booking sms");
        }
    });
}

pub fn sms_body(event: &BookingEvent) -> String {
    let when = event.appointment_at.format("%a %d %b %Y, %H:%M");
    match event.kind {
        BookingEventKind::BookingCreated => format!(
            "Hi {}, your booking {} for {when} has been received. We'll confirm it shortly.",
            event.guest_name, event.reference
        ),
        BookingEventKind::BookingCancelled => match &event.refund {
            Some(refund) if refund.percentage > 0 => format!(
                "Booking {} has been cancelled. A refund of {} ({}%) will be processed.",
                event.reference, refund.amount, refund.percentage
            ),
            _ => format!(
                "Booking {} has been cancelled. No refund applies at this notice.",
                event.reference
            ),
        },
        BookingEventKind::BookingRescheduled => format!(
            "Booking {} has been moved to {when}.",
            event.reference
        ),
        BookingEventKind::BookingStatusChanged => format!(
            "Booking {} for {when} is now {}.",
            event.reference,
            event.status.as_str().replace('_', " ").to_lowercase()
        ),
    }
}
