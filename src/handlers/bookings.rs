use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::success;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, NewBooking, RefundQuote, TransitionContext};
use crate::services::lifecycle::{self, TransitionOutcome};
use crate::services::{notifications, store};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionResponse {
    pub booking: Booking,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund: Option<RefundQuote>,
}

// POST /bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewBooking>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let now = state.config.local_now();
    let booking_lifecycle = state.lifecycle.clone();

    let booking = store::run(&state, "create_booking", move |conn| {
        booking_lifecycle.create(conn, &payload, now)
    })
    .await?;

    notifications::publish(&state, lifecycle::created_event(&booking));
    Ok((StatusCode::CREATED, success(booking)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingListQuery {
    pub user_id: Option<String>,
    pub guest_email: Option<String>,
}

// GET /bookings?userId= | ?guestEmail=
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BookingListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let booking_lifecycle = state.lifecycle.clone();
    let bookings = match (
        query.user_id.filter(|s| !s.trim().is_empty()),
        query.guest_email.filter(|s| !s.trim().is_empty()),
    ) {
        (Some(user_id), _) => {
            store::run(&state, "list_bookings_for_user", move |conn| {
                booking_lifecycle.list_for_user(conn, &user_id)
            })
            .await?
        }
        (None, Some(email)) => {
            store::run(&state, "list_bookings_for_guest", move |conn| {
                booking_lifecycle.list_for_guest(conn, email.trim())
            })
            .await?
        }
        (None, None) => {
            return Err(AppError::InvalidArgument(
                "userId or guestEmail is required".to_string(),
            ))
        }
    };

    Ok(success(bookings))
}

// GET /bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let booking_lifecycle = state.lifecycle.clone();
    let booking = store::run(&state, "get_booking", move |conn| booking_lifecycle.get(conn, &id)).await?;
    Ok(success(booking))
}

// GET /bookings/:id/refund-quote
pub async fn refund_quote(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let now = state.config.local_now();
    let booking_lifecycle = state.lifecycle.clone();
    let quote = store::run(&state, "quote_refund", move |conn| {
        booking_lifecycle.quote_refund(conn, &id, now)
    })
    .await?;
    Ok(success(quote))
}

// POST /bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<TransitionContext>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(ctx) = body?;
    transition(&state, id, BookingStatus::Cancelled, ctx).await
}

// POST /bookings/:id/reschedule
pub async fn reschedule_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<TransitionContext>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(ctx) = body?;
    transition(&state, id, BookingStatus::Rescheduled, ctx).await
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: String,
    #[serde(flatten)]
    pub context: TransitionContext,
}

// POST /bookings/:id/status
pub async fn change_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<StatusChange>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(change) = body?;
    let target = BookingStatus::parse(&change.status.replace('-', "_")).ok_or_else(|| {
        AppError::InvalidArgument(format!("unknown booking status {:?}", change.status))
    })?;
    transition(&state, id, target, change.context).await
}

async fn transition(
    state: &Arc<AppState>,
    id: String,
    target: BookingStatus,
    ctx: TransitionContext,
) -> Result<Json<super::ApiResponse<TransitionResponse>>, AppError> {
    let now = state.config.local_now();
    let booking_lifecycle = state.lifecycle.clone();

    let TransitionOutcome {
        booking,
        refund,
        event,
    } = store::run(state, "transition_booking", move |conn| {
        booking_lifecycle.transition(conn, &id, target, &ctx, now)
    })
    .await?;

    notifications::publish(state, event);
    Ok(success(TransitionResponse { booking, refund }))
}
