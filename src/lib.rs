pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use state::AppState;

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/centres", get(handlers::centres::list_centres))
        .route("/centres/:id", get(handlers::centres::get_centre))
        .route(
            "/bookings",
            get(handlers::bookings::list_bookings).post(handlers::bookings::create_booking),
        )
        .route("/bookings/:id", get(handlers::bookings::get_booking))
        .route(
            "/bookings/:id/cancel",
            post(handlers::bookings::cancel_booking),
        )
        .route(
            "/bookings/:id/reschedule",
            post(handlers::bookings::reschedule_booking),
        )
        .route(
            "/bookings/:id/status",
            post(handlers::bookings::change_status),
        )
        .route(
            "/bookings/:id/refund-quote",
            get(handlers::bookings::refund_quote),
        )
        .route("/calendar/:id", get(handlers::calendar::download_ics))
        .route("/events/bookings", get(handlers::events::booking_events))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
