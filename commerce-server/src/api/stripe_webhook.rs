//! Stripe webhook handler
//!
//! POST /api/webhooks/stripe, raw body for signature verification.
//!
//! Once the signature checks out the endpoint answers 200, including for
//! unknown intents and unhandled event types. Only storage failures answer
//! 500 so the gateway redelivers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use shared::error::AppError;

use crate::error::ServiceError;
use crate::gateway::signature::{SIGNATURE_HEADER, SignatureError, construct_event};
use crate::state::AppState;

/// Handle incoming Stripe webhook events
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // 1. Signature header
    let Some(sig_header) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        tracing::warn!("Missing Stripe-Signature header");
        return ServiceError::Authentication("Missing Stripe-Signature header".to_string())
            .into_response();
    };

    // 2. Verify and parse
    let event = match construct_event(
        &body,
        sig_header,
        &state.webhook.secret,
        state.webhook.tolerance_secs,
    ) {
        Ok(event) => event,
        Err(SignatureError::InvalidPayload(e)) => {
            tracing::warn!(%e, "Failed to parse webhook JSON");
            return AppError::invalid_request(format!("Invalid webhook payload: {e}"))
                .into_response();
        }
        Err(e) => {
            tracing::warn!(error = %e, "Webhook signature verification failed");
            return ServiceError::Authentication(e.to_string()).into_response();
        }
    };

    // 3. Dispatch
    match state.webhooks.handle(&event) {
        Ok(outcome) => (
            StatusCode::OK,
            Json(serde_json::json!({ "received": true, "outcome": format!("{outcome:?}") })),
        )
            .into_response(),
        Err(ServiceError::Storage(e)) => {
            tracing::error!(event_id = %event.id, %e, "Storage error handling webhook event");
            ServiceError::Storage(e).into_response()
        }
        Err(e) => {
            // Redelivery would hit the same error
            tracing::error!(event_id = %event.id, error = %e, "Webhook event could not be applied");
            (StatusCode::OK, Json(serde_json::json!({ "received": true }))).into_response()
        }
    }
}
