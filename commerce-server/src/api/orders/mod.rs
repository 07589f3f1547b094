//! Order API Module
//!
//! Lifecycle transitions are POST actions on the order resource; PATCH is
//! the administrative field merge.

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Order router
pub fn router() -> Router<AppState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handler::create).get(handler::list))
        .route("/summary", get(handler::summary))
        .route("/number/{order_number}", get(handler::get_by_number))
        .route("/user/{user_id}", get(handler::list_by_user))
        .route("/{id}", get(handler::get_by_id).patch(handler::update))
        // Lifecycle
        .route("/{id}/process", post(handler::process))
        .route("/{id}/ship", post(handler::ship))
        .route("/{id}/deliver", post(handler::deliver))
        .route("/{id}/cancel", post(handler::cancel))
        .route("/{id}/refund", post(handler::mark_refunded))
}
