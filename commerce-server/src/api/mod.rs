//! HTTP API for commerce-server
//!
//! Handlers are thin: they extract input, call the managers and let
//! `ServiceError` → `AppError` produce the error envelope.

pub mod addresses;
pub mod health;
pub mod orders;
pub mod payments;
pub mod stripe_webhook;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Gateway webhook (signature-verified, raw body)
    let webhook = Router::new().route(
        "/api/webhooks/stripe",
        post(stripe_webhook::handle_webhook),
    );

    Router::new()
        .route("/health", get(health::health_check))
        .merge(orders::router())
        .merge(payments::router())
        .merge(addresses::router())
        .merge(webhook)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
