//! Unified service-layer error type
//!
//! `ServiceError` is what the order and payment managers return. It carries
//! the domain taxonomy (not found, invalid state, invalid argument, gateway,
//! authentication) plus storage failures, and converts into the API-layer
//! `AppError` at the handler boundary.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};
use std::fmt;
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::storage::StorageError;

/// Record kinds named in not-found and invalid-state errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Order,
    Payment,
    Address,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Entity::Order => "Order",
            Entity::Payment => "Payment",
            Entity::Address => "Address",
        })
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Referenced record does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: String },

    /// Transition not allowed from the current status
    #[error("{message}")]
    InvalidState { entity: Entity, message: String },

    /// Caller-supplied value rejected
    #[error("{message}")]
    InvalidArgument { code: ErrorCode, message: String },

    /// Reserved for adapter errors surfaced as-is. The managers capture
    /// gateway failures on the payment or report `PaymentIntentFailed`.
    #[error("Payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Webhook signature verification failed
    #[error("{0}")]
    Authentication(String),

    /// Document store failure
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ServiceError {
    pub fn not_found(entity: Entity, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn invalid_state(entity: Entity, message: impl Into<String>) -> Self {
        Self::InvalidState {
            entity,
            message: message.into(),
        }
    }

    pub fn invalid_argument(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            code,
            message: message.into(),
        }
    }

    /// Plain input validation failure
    pub fn validation(message: impl Into<String>) -> Self {
        Self::invalid_argument(ErrorCode::ValidationFailed, message)
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::NotFound { entity, id } => {
                let code = match entity {
                    Entity::Order => ErrorCode::OrderNotFound,
                    Entity::Payment => ErrorCode::PaymentNotFound,
                    Entity::Address => ErrorCode::AddressNotFound,
                };
                AppError::with_message(code, format!("{entity} {id} not found")).with_detail("id", id)
            }
            ServiceError::InvalidState { entity, message } => {
                let code = match entity {
                    Entity::Payment => ErrorCode::PaymentInvalidState,
                    Entity::Order | Entity::Address => ErrorCode::OrderInvalidState,
                };
                AppError::with_message(code, message)
            }
            ServiceError::InvalidArgument { code, message } => AppError::with_message(code, message),
            ServiceError::Gateway(GatewayError::Timeout(limit)) => AppError::with_message(
                ErrorCode::TimeoutError,
                format!("Payment gateway timed out after {}ms", limit.as_millis()),
            ),
            ServiceError::Gateway(err) => {
                tracing::warn!(error = %err, "Payment gateway error");
                AppError::with_message(ErrorCode::PaymentGatewayError, err.to_string())
            }
            ServiceError::Authentication(message) => AppError::invalid_signature(message),
            ServiceError::Storage(err) => {
                tracing::error!(error = %err, "Service storage error");
                AppError::new(ErrorCode::DatabaseError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

/// Convenience type alias for service-layer results
pub type ServiceResult<T> = Result<T, ServiceError>;
