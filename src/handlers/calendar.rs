use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::db::queries;
use crate::errors::AppError;
use crate::services::calendar::generate_ics;
use crate::services::store;
use crate::state::AppState;

// GET /calendar/:id.ics
pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Response, AppError> {
    let booking_id = raw_id.strip_suffix(".ics").unwrap_or(&raw_id).to_string();

    let (booking, centre) = {
        let booking_id = booking_id.clone();
        store::run(&state, "calendar_export", move |conn| {
            let booking = queries::get_booking(conn, &booking_id)?
                .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;
            let centre = queries::get_centre(conn, booking.centre_id)?
                .ok_or_else(|| AppError::NotFound(format!("centre {}", booking.centre_id)))?;
            Ok((booking, centre))
        })
        .await?
    };

    let ics = generate_ics(&booking, &centre);
    let filename = format!("booking-{}.ics", booking.reference);

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        ics,
    )
        .into_response())
}
