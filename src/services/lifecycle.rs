use chrono::NaiveDateTime;
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::config::AppConfig;
use crate::db::queries;
use crate::errors::{AppError, FieldError};
use crate::models::{
    Booking, BookingEvent, BookingEventKind, BookingStatus, Centre, NewBooking, RefundQuote,
    TransitionContext,
};
use crate::services::cancellation::CancellationPolicy;
use crate::services::scheduling;

const OTHER_REASON: &str = "Other";

/// Result of a committed transition, with the event to publish for it.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub booking: Booking,
    pub refund: Option<RefundQuote>,
    pub event: BookingEvent,
}

#[derive(Debug, Clone, Default)]
pub struct BookingLifecycle {
    pub policy: CancellationPolicy,
    pub single_booking_per_slot: bool,
}

impl BookingLifecycle {
    pub fn new(policy: CancellationPolicy, single_booking_per_slot: bool) -> Self {
        Self {
            policy,
            single_booking_per_slot,
        }
    }

    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        Ok(Self::new(
            CancellationPolicy::from_config(config)?,
            config.single_booking_per_slot,
        ))
    }

    fn claim_slot(&self, booking: &Booking) -> Option<String> {
        let holds_slot = matches!(booking.status, BookingStatus::Pending | BookingStatus::Confirmed);
        (self.single_booking_per_slot && holds_slot)
            .then(|| scheduling::slot_key(booking.centre_id, booking.date, booking.time))
    }

    /// Validates a booking request and persists it as `PENDING`.
    /// Either the whole booking is written or nothing is.
    pub fn create(
        &self,
        conn: &mut Connection,
        payload: &NewBooking,
        now: NaiveDateTime,
    ) -> Result<Booking, AppError> {
        let mut errors = vec![];

        if payload.centre_id.is_none() {
            errors.push(FieldError::new("centreId", "is required"));
        }
        let schedule = scheduling::parse_appointment(
            payload.date.as_deref(),
            payload.time.as_deref(),
            now,
            &mut errors,
        );
        let first_name = required(&mut errors, "guestFirstName", &payload.guest_first_name);
        let last_name = required(&mut errors, "guestLastName", &payload.guest_last_name);
        let phone = required(&mut errors, "guestPhone", &payload.guest_phone);
        let email = required(&mut errors, "guestEmail", &payload.guest_email);
        let service_name = required(&mut errors, "serviceName", &payload.service_name);

        if let Some(phone) = &phone {
            if !is_valid_phone(phone) {
                errors.push(FieldError::new("guestPhone", "must be a phone number"));
            }
        }
        if let Some(email) = &email {
            if !is_valid_email(email) {
                errors.push(FieldError::new("guestEmail", "must be an email address"));
            }
        }
        match payload.service_price {
            None => errors.push(FieldError::new("servicePrice", "is required")),
            Some(price) if price < Decimal::ZERO => {
                errors.push(FieldError::new("servicePrice", "must not be negative"))
            }
            Some(_) => {}
        }

        let (
            Some(centre_id),
            Some((date, time)),
            Some(first_name),
            Some(last_name),
            Some(phone),
            Some(email),
            Some(service_name),
            Some(service_price),
            true,
        ) = (
            payload.centre_id,
            schedule,
            first_name,
            last_name,
            phone,
            email,
            service_name,
            payload.service_price,
            errors.is_empty(),
        )
        else {
            return Err(AppError::Validation(errors));
        };

        let tx = conn.transaction()?;

        let centre = load_centre(&tx, centre_id)?;
        if let Some(service_id) = payload.service_id {
            let service = centre.service(service_id).ok_or_else(|| {
                AppError::NotFound(format!("service {service_id} at centre {centre_id}"))
            })?;
            if !service.is_available {
                return Err(AppError::validation(
                    "serviceId",
                    format!("{} is not currently offered", service.service_name),
                ));
            }
            if service.effective_price() != service_price {
                tracing::warn!(
                    centre_id,
                    service_id,
                    listed = %service.effective_price(),
                    submitted = %service_price,
                    "booking price differs from listed price"
                );
            }
        }
        scheduling::validate_slot(&centre, date, time)?;

        let booking = Booking {
            id: uuid::Uuid::new_v4().to_string(),
            reference: queries::next_booking_reference(&tx)?,
            centre_id,
            service_id: payload.service_id,
            service_name,
            service_price,
            date,
            time,
            status: BookingStatus::Pending,
            guest_first_name: first_name,
            guest_last_name: last_name,
            guest_phone: phone,
            guest_email: email,
            guest_age_range: optional(&payload.guest_age_range),
            guest_gender: optional(&payload.guest_gender),
            guest_state: optional(&payload.guest_state),
            guest_lga: optional(&payload.guest_lga),
            user_id: optional(&payload.user_id),
            reschedule_reason: None,
            cancellation_reason: None,
            additional_feedback: optional(&payload.additional_feedback),
            agreed_to_terms: payload.agreed_to_terms,
            refund_percentage: None,
            refund_amount: None,
            reschedule_count: 0,
            version: 1,
            created_at: now,
            updated_at: now,
        };

        queries::insert_booking(&tx, &booking, self.claim_slot(&booking).as_deref())?;
        tx.commit()?;

        tracing::info!(
            booking_id = %booking.id,
            reference = %booking.reference,
            centre_id = booking.centre_id,
            date = %booking.date,
            "booking created"
        );
        Ok(booking)
    }

    /// Moves a booking along its state machine. A failed transition leaves
    /// the stored booking untouched.
    pub fn transition(
        &self,
        conn: &mut Connection,
        id_or_reference: &str,
        target: BookingStatus,
        ctx: &TransitionContext,
        now: NaiveDateTime,
    ) -> Result<TransitionOutcome, AppError> {
        let tx = conn.transaction()?;

        let current = load_booking(&tx, id_or_reference)?;
        if let Some(expected) = ctx.expected_version {
            if expected != current.version {
                return Err(AppError::Conflict(format!(
                    "booking {} is at version {}, not {expected}; reload and retry",
                    current.reference, current.version
                )));
            }
        }
        if !current.status.can_transition_to(target) {
            tracing::warn!(
                booking_id = %current.id,
                from = %current.status,
                to = %target,
                "rejected booking transition"
            );
            return Err(AppError::InvalidStateTransition {
                from: current.status,
                to: target,
            });
        }

        let mut next = current.clone();
        let mut refund = None;
        let kind = match target {
            BookingStatus::Cancelled => {
                let reason = cancellation_reason(ctx)?;
                let quote = self.policy.compute_refund(&current, now);
                next.status = BookingStatus::Cancelled;
                next.cancellation_reason = Some(reason);
                next.additional_feedback =
                    optional(&ctx.additional_feedback).or(next.additional_feedback.take());
                next.agreed_to_terms = true;
                next.refund_percentage = Some(quote.percentage);
                next.refund_amount = Some(quote.amount);
                refund = Some(quote);
                BookingEventKind::BookingCancelled
            }
            BookingStatus::Rescheduled => {
                let mut errors = vec![];
                let Some((date, time)) = scheduling::parse_appointment(
                    ctx.date.as_deref(),
                    ctx.time.as_deref(),
                    now,
                    &mut errors,
                ) else {
                    return Err(AppError::Validation(errors));
                };
                let centre = load_centre(&tx, current.centre_id)?;
                scheduling::validate_slot(&centre, date, time)?;

                next.date = date;
                next.time = time;
                next.reschedule_reason = optional(&ctx.reschedule_reason);
                next.reschedule_count += 1;
                BookingEventKind::BookingRescheduled
            }
            BookingStatus::NoShow => {
                if now < current.appointment_at() {
                    return Err(AppError::validation(
                        "status",
                        "a booking can only be marked no-show after its appointment time",
                    ));
                }
                next.status = BookingStatus::NoShow;
                BookingEventKind::BookingStatusChanged
            }
            BookingStatus::Confirmed | BookingStatus::Completed => {
                next.status = target;
                BookingEventKind::BookingStatusChanged
            }
            BookingStatus::Pending => {
                return Err(AppError::InvalidStateTransition {
                    from: current.status,
                    to: target,
                })
            }
        };
        next.updated_at = now;

        queries::update_booking(&tx, &next, current.version, self.claim_slot(&next).as_deref())?;
        tx.commit()?;
        next.version = current.version + 1;

        tracing::info!(
            booking_id = %next.id,
            reference = %next.reference,
            from = %current.status,
            to = %target,
            status = %next.status,
            "booking transitioned"
        );

        let event = BookingEvent::new(kind, &next, refund.clone());
        Ok(TransitionOutcome {
            booking: next,
            refund,
            event,
        })
    }

    /// Refund the booking would earn if cancelled at `now`, without cancelling it.
    pub fn quote_refund(
        &self,
        conn: &Connection,
        id_or_reference: &str,
        now: NaiveDateTime,
    ) -> Result<RefundQuote, AppError> {
        let booking = load_booking(conn, id_or_reference)?;
        if !booking.status.can_transition_to(BookingStatus::Cancelled) {
            return Err(AppError::InvalidStateTransition {
                from: booking.status,
                to: BookingStatus::Cancelled,
            });
        }
        Ok(self.policy.compute_refund(&booking, now))
    }

    pub fn get(&self, conn: &Connection, id_or_reference: &str) -> Result<Booking, AppError> {
        load_booking(conn, id_or_reference)
    }

    pub fn list_for_user(&self, conn: &Connection, user_id: &str) -> Result<Vec<Booking>, AppError> {
        queries::list_bookings_for_user(conn, user_id)
    }

    pub fn list_for_guest(&self, conn: &Connection, email: &str) -> Result<Vec<Booking>, AppError> {
        queries::list_bookings_for_guest(conn, email)
    }
}

pub fn created_event(booking: &Booking) -> BookingEvent {
    BookingEvent::new(BookingEventKind::BookingCreated, booking, None)
}

fn load_booking(conn: &Connection, id_or_reference: &str) -> Result<Booking, AppError> {
    queries::get_booking(conn, id_or_reference)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id_or_reference}")))
}

fn load_centre(conn: &Connection, centre_id: i64) -> Result<Centre, AppError> {
    queries::get_centre(conn, centre_id)?
        .ok_or_else(|| AppError::NotFound(format!("centre {centre_id}")))
}

fn cancellation_reason(ctx: &TransitionContext) -> Result<String, AppError> {
    let mut errors = vec![];
    if !ctx.agreed_to_terms {
        errors.push(FieldError::new(
            "agreedToTerms",
            "the cancellation terms must be accepted",
        ));
    }

    let reason = match optional(&ctx.cancellation_reason) {
        None => {
            errors.push(FieldError::new("cancellationReason", "is required"));
            None
        }
        Some(reason) if reason.eq_ignore_ascii_case(OTHER_REASON) => {
            match optional(&ctx.custom_reason) {
                Some(custom) => Some(custom),
                None => {
                    errors.push(FieldError::new(
                        "customReason",
                        "is required when the reason is Other",
                    ));
                    None
                }
            }
        }
        Some(reason) => Some(reason),
    };

    match reason {
        Some(reason) if errors.is_empty() => Ok(reason),
        _ => Err(AppError::Validation(errors)),
    }
}

fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn required(errors: &mut Vec<FieldError>, field: &str, value: &Option<String>) -> Option<String> {
    let value = optional(value);
    if value.is_none() {
        errors.push(FieldError::new(field, "is required"));
    }
    value
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.contains(char::is_whitespace)
        && domain
            .split('.')
            .collect::<Vec<_>>()
            .windows(2)
            .all(|w| !w[0].is_empty() && !w[1].is_empty())
        && domain.contains('.')
}

fn is_valid_phone(phone: &str) -> bool {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    let digits: String = digits
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    (7..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}
