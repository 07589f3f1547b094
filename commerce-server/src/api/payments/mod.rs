//! Payment API Module

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Payment router
pub fn router() -> Router<AppState> {
    Router::new().nest("/api/payments", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handler::create).get(handler::list))
        .route("/order/{order_id}", get(handler::list_by_order))
        .route("/user/{user_id}", get(handler::list_by_user))
        .route(
            "/{id}",
            get(handler::get_by_id)
                .patch(handler::update)
                .delete(handler::remove),
        )
        // Reconciliation
        .route("/{id}/process", post(handler::process))
        .route("/{id}/confirm", post(handler::confirm))
        .route("/{id}/refund", post(handler::refund))
        .route("/{id}/cancel", post(handler::cancel))
}
