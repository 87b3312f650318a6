pub mod bookings;
pub mod health;
pub mod webhook;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/bookings", post(bookings::create_booking))
        .route("/api/bookings/repayment", post(bookings::create_repayment))
        .route("/api/bookings/payment/notif", post(webhook::payment_notification))
        .route("/api/bookings/check", get(bookings::check_booked))
        .route("/api/bookings/today", get(bookings::ending_today))
        .route("/api/bookings/report", get(bookings::payment_report))
        .with_state(state)
}
