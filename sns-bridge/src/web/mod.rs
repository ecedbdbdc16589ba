//! Web server module for handling inbound SNS deliveries.

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};

pub use handlers::{health, sns_notify, AppState, ErrorResponse, HealthResponse, NotifyAck};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/sns/notify", post(sns_notify))
        .with_state(state)
}
