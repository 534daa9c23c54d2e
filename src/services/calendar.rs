use chrono::Duration;

use crate::models::{Booking, BookingStatus, Centre};

const DEFAULT_DURATION_MINUTES: i64 = 30;

/// Minutes parsed from a service duration such as "45 mins" or "1 hour".
fn duration_minutes(raw: Option<&str>) -> i64 {
    let Some(raw) = raw else {
        return DEFAULT_DURATION_MINUTES;
    };
    let lower = raw.to_lowercase();
    let amount: i64 = lower
        .split(|c: char| !c.is_ascii_digit())
        .find(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    match amount {
        0 => DEFAULT_DURATION_MINUTES,
        n if lower.contains("hour") || lower.contains("hr") => n * 60,
        n => n,
    }
}

/// Escapes a TEXT property value (RFC 5545, section 3.3.11).
fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            c => out.push(c),
        }
    }
    out
}

pub fn generate_ics(booking: &Booking, centre: &Centre) -> String {
    let duration = booking
        .service_id
        .and_then(|id| centre.service(id))
        .map(|s| duration_minutes(s.time_duration.as_deref()))
        .unwrap_or(DEFAULT_DURATION_MINUTES);

    let start = booking.appointment_at();
    let dtstart = start.format("%Y%m%dT%H%M%S").to_string();
    let dtend = (start + Duration::minutes(duration))
        .format("%Y%m%dT%H%M%S")
        .to_string();
    let dtstamp = booking.updated_at.format("%Y%m%dT%H%M%S").to_string();
    let uid = format!("{}@medidirect", booking.id);

    let summary = escape_text(&format!("{} at {}", booking.service_name, centre.name));
    let location = escape_text(&format!("{}, {}", centre.locality.lga, centre.locality.state));
    let description = escape_text(&format!("Booking reference {}", booking.reference));
    let status = match booking.status {
        BookingStatus::Cancelled => "CANCELLED",
        BookingStatus::Pending => "TENTATIVE",
        _ => "CONFIRMED",
    };

    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//MediDirect//Bookings//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         LOCATION:{location}\r\n\
         DESCRIPTION:{description}\r\n\
         STATUS:{status}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    )
}
