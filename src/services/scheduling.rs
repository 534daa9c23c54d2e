use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::errors::{AppError, FieldError};
use crate::models::Centre;

/// Parses a requested appointment date and time, recording field errors
/// instead of failing on the first one.
pub fn parse_appointment(
    date: Option<&str>,
    time: Option<&str>,
    now: NaiveDateTime,
    errors: &mut Vec<FieldError>,
) -> Option<(NaiveDate, NaiveTime)> {
    let date = match date.map(str::trim).filter(|s| !s.is_empty()) {
        None => {
            errors.push(FieldError::new("date", "is required"));
            None
        }
        Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Err(_) => {
                errors.push(FieldError::new("date", "must be a calendar date (YYYY-MM-DD)"));
                None
            }
            Ok(d) if d < now.date() => {
                errors.push(FieldError::new("date", "must be today or later"));
                None
            }
            Ok(d) => Some(d),
        },
    };

    let time = match time.map(str::trim).filter(|s| !s.is_empty()) {
        None => {
            errors.push(FieldError::new("time", "is required"));
            None
        }
        Some(raw) => match NaiveTime::parse_from_str(raw, "%H:%M") {
            Ok(t) => Some(t),
            Err(_) => {
                errors.push(FieldError::new("time", "must be a time of day (HH:MM)"));
                None
            }
        },
    };

    Some((date?, time?))
}

/// Checks that `centre` takes bookings and is open at the requested slot.
pub fn validate_slot(centre: &Centre, date: NaiveDate, time: NaiveTime) -> Result<(), AppError> {
    if !centre.is_verified() {
        return Err(AppError::validation(
            "centreId",
            format!("centre {} is not accepting bookings", centre.id),
        ));
    }

    centre
        .operating_hours
        .check(date, time)
        .map_err(|violation| {
            AppError::SchedulingConflict(format!(
                "{violation} (opening hours: {})",
                centre.operating_hours.to_human_readable()
            ))
        })
}

/// Key under which a booking claims its slot when slots are exclusive.
pub fn slot_key(centre_id: i64, date: NaiveDate, time: NaiveTime) -> String {
    format!("{centre_id}|{}|{}", date.format("%Y-%m-%d"), time.format("%H:%M"))
}
