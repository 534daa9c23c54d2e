pub mod bookings;
pub mod calendar;
pub mod centres;
pub mod events;
pub mod health;

use axum::extract::rejection::JsonRejection;
use serde::Serialize;

use crate::errors::AppError;

/// Success envelope shared by every JSON endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    pub data: T,
}

pub fn success<T: Serialize>(data: T) -> axum::Json<ApiResponse<T>> {
    axum::Json(ApiResponse {
        status: "success",
        data,
    })
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidArgument(rejection.body_text())
    }
}

/// Parses an optional numeric query parameter, rejecting garbage rather
/// than silently falling back to the default.
pub(crate) fn parse_param<T: std::str::FromStr>(
    name: &str,
    raw: Option<&str>,
) -> Result<Option<T>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|_| {
            AppError::InvalidArgument(format!("{name} must be a number, got {value:?}"))
        }),
    }
}
