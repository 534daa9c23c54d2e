use std::collections::HashMap;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;

use crate::errors::AppError;
use crate::models::{
    Booking, BookingStatus, Centre, CentreStatus, Locality, OperatingHours, Service,
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

// ── Centres ──

pub fn list_centres(
    conn: &Connection,
    status: Option<CentreStatus>,
) -> Result<Vec<Centre>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, state, lga, average_rating, status, operating_hours
         FROM centres WHERE (?1 IS NULL OR status = ?1) ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![status.map(|s| s.as_str())], |row| {
        Ok(parse_centre_row(row))
    })?;

    let mut centres = vec![];
    for row in rows {
        centres.push(row??);
    }

    let mut services = services_by_centre(conn)?;
    for centre in &mut centres {
        centre.services = services.remove(&centre.id).unwrap_or_default();
    }
    Ok(centres)
}

pub fn get_centre(conn: &Connection, id: i64) -> Result<Option<Centre>, AppError> {
    let centre = conn
        .query_row(
            "SELECT id, name, state, lga, average_rating, status, operating_hours
             FROM centres WHERE id = ?1",
            params![id],
            |row| Ok(parse_centre_row(row)),
        )
        .optional()?;

    match centre {
        Some(centre) => {
            let mut centre = centre?;
            centre.services = services_for_centre(conn, id)?;
            Ok(Some(centre))
        }
        None => Ok(None),
    }
}

/// Replaces a centre and its service list.
pub fn upsert_centre(conn: &Connection, centre: &Centre) -> Result<(), AppError> {
    let hours = serde_json::to_string(&centre.operating_hours)
        .map_err(|e| AppError::Internal(e.into()))?;

    conn.execute(
        "INSERT INTO centres (id, name, state, lga, average_rating, status, operating_hours)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id) DO UPDATE SET
           name = excluded.name,
           state = excluded.state,
           lga = excluded.lga,
           average_rating = excluded.average_rating,
           status = excluded.status,
           operating_hours = excluded.operating_hours",
        params![
            centre.id,
            centre.name,
            centre.locality.state,
            centre.locality.lga,
            centre.average_rating,
            centre.status.as_str(),
            hours,
        ],
    )?;

    conn.execute("DELETE FROM services WHERE centre_id = ?1", params![centre.id])?;
    for service in &centre.services {
        conn.execute(
            "INSERT INTO services (id, centre_id, service_name, service_type, price, discount_price,
                                   is_available, time_duration, result_delivery_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                service.id,
                centre.id,
                service.service_name,
                service.service_type,
                service.price.to_string(),
                service.discount_price.map(|d| d.to_string()),
                service.is_available as i32,
                service.time_duration,
                service.result_delivery_time,
            ],
        )?;
    }
    Ok(())
}

fn services_for_centre(conn: &Connection, centre_id: i64) -> Result<Vec<Service>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, centre_id, service_name, service_type, price, discount_price, is_available,
                time_duration, result_delivery_time
         FROM services WHERE centre_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![centre_id], |row| Ok(parse_service_row(row)))?;

    let mut services = vec![];
    for row in rows {
        services.push(row??.1);
    }
    Ok(services)
}

fn services_by_centre(conn: &Connection) -> Result<HashMap<i64, Vec<Service>>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, centre_id, service_name, service_type, price, discount_price, is_available,
                time_duration, result_delivery_time
         FROM services ORDER BY centre_id ASC, id ASC",
    )?;
    let rows = stmt.query_map([], |row| Ok(parse_service_row(row)))?;

    let mut grouped: HashMap<i64, Vec<Service>> = HashMap::new();
    for row in rows {
        let (centre_id, service) = row??;
        grouped.entry(centre_id).or_default().push(service);
    }
    Ok(grouped)
}

fn parse_centre_row(row: &rusqlite::Row) -> Result<Centre, AppError> {
    let status_str: String = row.get(5)?;
    let hours_json: String = row.get(6)?;

    Ok(Centre {
        id: row.get(0)?,
        name: row.get(1)?,
        locality: Locality {
            state: row.get(2)?,
            lga: row.get(3)?,
        },
        services: vec![],
        average_rating: row.get(4)?,
        status: CentreStatus::parse(&status_str)
            .ok_or_else(|| corrupt("centres.status", &status_str))?,
        operating_hours: serde_json::from_str::<OperatingHours>(&hours_json)
            .map_err(|_| corrupt("centres.operating_hours", &hours_json))?,
    })
}

fn parse_service_row(row: &rusqlite::Row) -> Result<(i64, Service), AppError> {
    let price: String = row.get(4)?;
    let discount: Option<String> = row.get(5)?;

    Ok((
        row.get(1)?,
        Service {
            id: row.get(0)?,
            service_name: row.get(2)?,
            service_type: row.get(3)?,
            price: parse_decimal("services.price", &price)?,
            discount_price: discount
                .map(|d| parse_decimal("services.discount_price", &d))
                .transpose()?,
            is_available: row.get::<_, i32>(6)? != 0,
            time_duration: row.get(7)?,
            result_delivery_time: row.get(8)?,
        },
    ))
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, reference, centre_id, service_id, service_name, service_price, date, time, \
     status, guest_first_name, guest_last_name, guest_phone, guest_email, guest_age_range, guest_gender, \
     guest_state, guest_lga, user_id, reschedule_reason, cancellation_reason, additional_feedback, \
     agreed_to_terms, refund_percentage, refund_amount, reschedule_count, version, created_at, updated_at";

/// Draws the next booking reference from the store's counter.
pub fn next_booking_reference(conn: &Connection) -> Result<String, AppError> {
    let value: i64 = conn.query_row(
        "UPDATE counters SET value = value + 1 WHERE name = 'booking_reference' RETURNING value",
        [],
        |row| row.get(0),
    )?;
    Ok(format!("BK{value:06}"))
}

pub fn insert_booking(
    conn: &Connection,
    booking: &Booking,
    slot_key: Option<&str>,
) -> Result<(), AppError> {
    conn.execute(
        &format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS}, slot_key)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                     ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29)"
        ),
        params![
            booking.id,
            booking.reference,
            booking.centre_id,
            booking.service_id,
            booking.service_name,
            booking.service_price.to_string(),
            booking.date.format(DATE_FORMAT).to_string(),
            booking.time.format(TIME_FORMAT).to_string(),
            booking.status.as_str(),
            booking.guest_first_name,
            booking.guest_last_name,
            booking.guest_phone,
            booking.guest_email,
            booking.guest_age_range,
            booking.guest_gender,
            booking.guest_state,
            booking.guest_lga,
            booking.user_id,
            booking.reschedule_reason,
            booking.cancellation_reason,
            booking.additional_feedback,
            booking.agreed_to_terms as i32,
            booking.refund_percentage,
            booking.refund_amount.map(|a| a.to_string()),
            booking.reschedule_count,
            booking.version,
            booking.created_at.format(TIMESTAMP_FORMAT).to_string(),
            booking.updated_at.format(TIMESTAMP_FORMAT).to_string(),
            slot_key,
        ],
    )
    .map_err(slot_taken)?;
    Ok(())
}

/// Writes the mutable fields of `booking`, guarded by `expected_version`.
/// The stored version becomes `expected_version + 1`.
pub fn update_booking(
    conn: &Connection,
    booking: &Booking,
    expected_version: i64,
    slot_key: Option<&str>,
) -> Result<(), AppError> {
    let count = conn
        .execute(
            "UPDATE bookings SET
               date = ?1, time = ?2, status = ?3, reschedule_reason = ?4,
               cancellation_reason = ?5, additional_feedback = ?6, agreed_to_terms = ?7,
               refund_percentage = ?8, refund_amount = ?9, reschedule_count = ?10,
               slot_key = ?11, updated_at = ?12, version = version + 1
             WHERE id = ?13 AND version = ?14",
            params![
                booking.date.format(DATE_FORMAT).to_string(),
                booking.time.format(TIME_FORMAT).to_string(),
                booking.status.as_str(),
                booking.reschedule_reason,
                booking.cancellation_reason,
                booking.additional_feedback,
                booking.agreed_to_terms as i32,
                booking.refund_percentage,
                booking.refund_amount.map(|a| a.to_string()),
                booking.reschedule_count,
                slot_key,
                booking.updated_at.format(TIMESTAMP_FORMAT).to_string(),
                booking.id,
                expected_version,
            ],
        )
        .map_err(slot_taken)?;

    if count == 0 {
        return Err(AppError::Conflict(format!(
            "booking {} was modified concurrently; reload and retry",
            booking.reference
        )));
    }
    Ok(())
}

/// Looks a booking up by id or by its `BK…` reference.
pub fn get_booking(conn: &Connection, id_or_reference: &str) -> Result<Option<Booking>, AppError> {
    let result = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1 OR reference = ?1"),
            params![id_or_reference],
            |row| Ok(parse_booking_row(row)),
        )
        .optional()?;

    result.transpose()
}

pub fn list_bookings_for_user(conn: &Connection, user_id: &str) -> Result<Vec<Booking>, AppError> {
    list_bookings_where(conn, "user_id = ?1", user_id)
}

pub fn list_bookings_for_guest(conn: &Connection, email: &str) -> Result<Vec<Booking>, AppError> {
    list_bookings_where(conn, "lower(guest_email) = lower(?1)", email)
}

fn list_bookings_where(
    conn: &Connection,
    predicate: &str,
    value: &str,
) -> Result<Vec<Booking>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE {predicate}
         ORDER BY date DESC, time DESC, reference DESC"
    ))?;
    let rows = stmt.query_map(params![value], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

fn parse_booking_row(row: &rusqlite::Row) -> Result<Booking, AppError> {
    let service_price: String = row.get(5)?;
    let date_str: String = row.get(6)?;
    let time_str: String = row.get(7)?;
    let status_str: String = row.get(8)?;
    let refund_amount: Option<String> = row.get(23)?;
    let created_at_str: String = row.get(26)?;
    let updated_at_str: String = row.get(27)?;

    Ok(Booking {
        id: row.get(0)?,
        reference: row.get(1)?,
        centre_id: row.get(2)?,
        service_id: row.get(3)?,
        service_name: row.get(4)?,
        service_price: parse_decimal("bookings.service_price", &service_price)?,
        date: NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
            .map_err(|_| corrupt("bookings.date", &date_str))?,
        time: NaiveTime::parse_from_str(&time_str, TIME_FORMAT)
            .map_err(|_| corrupt("bookings.time", &time_str))?,
        status: BookingStatus::parse(&status_str)
            .ok_or_else(|| corrupt("bookings.status", &status_str))?,
        guest_first_name: row.get(9)?,
        guest_last_name: row.get(10)?,
        guest_phone: row.get(11)?,
        guest_email: row.get(12)?,
        guest_age_range: row.get(13)?,
        guest_gender: row.get(14)?,
        guest_state: row.get(15)?,
        guest_lga: row.get(16)?,
        user_id: row.get(17)?,
        reschedule_reason: row.get(18)?,
        cancellation_reason: row.get(19)?,
        additional_feedback: row.get(20)?,
        agreed_to_terms: row.get::<_, i32>(21)? != 0,
        refund_percentage: row.get(22)?,
        refund_amount: refund_amount
            .map(|a| parse_decimal("bookings.refund_amount", &a))
            .transpose()?,
        reschedule_count: row.get(24)?,
        version: row.get(25)?,
        created_at: NaiveDateTime::parse_from_str(&created_at_str, TIMESTAMP_FORMAT)
            .map_err(|_| corrupt("bookings.created_at", &created_at_str))?,
        updated_at: NaiveDateTime::parse_from_str(&updated_at_str, TIMESTAMP_FORMAT)
            .map_err(|_| corrupt("bookings.updated_at", &updated_at_str))?,
    })
}

fn parse_decimal(column: &str, raw: &str) -> Result<Decimal, AppError> {
    Decimal::from_str(raw).map_err(|_| corrupt(column, raw))
}

fn corrupt(column: &str, raw: &str) -> AppError {
    AppError::Internal(anyhow::anyhow!("unreadable value in {column}: {raw:?}"))
}

fn slot_taken(err: rusqlite::Error) -> AppError {
    if err.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation)
        && err.to_string().contains("slot_key")
    {
        return AppError::SchedulingConflict("that time slot is already booked".to_string());
    }
    err.into()
}
