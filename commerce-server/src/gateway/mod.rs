//! Payment gateway adapter
//!
//! The reconciliation core only sees the [`PaymentGateway`] trait. The
//! production implementation talks to Stripe over REST ([`StripeGateway`]);
//! tests plug in a scripted gateway.
//!
//! Amounts crossing this boundary are integer minor units.

pub mod signature;
pub mod stripe;

pub use signature::{SignatureError, construct_event, sign_payload};
pub use stripe::StripeGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Gateway call errors
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Error reported by the gateway API
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("gateway call timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("invalid gateway response: {0}")]
    InvalidResponse(String),
}

/// Intent lifecycle status as reported by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    /// Status string this adapter does not know
    Other(String),
}

impl IntentStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "requires_payment_method" => Self::RequiresPaymentMethod,
            "requires_confirmation" => Self::RequiresConfirmation,
            "requires_action" => Self::RequiresAction,
            "processing" => Self::Processing,
            "requires_capture" => Self::RequiresCapture,
            "canceled" => Self::Canceled,
            "succeeded" => Self::Succeeded,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::RequiresPaymentMethod => "requires_payment_method",
            Self::RequiresConfirmation => "requires_confirmation",
            Self::RequiresAction => "requires_action",
            Self::Processing => "processing",
            Self::RequiresCapture => "requires_capture",
            Self::Canceled => "canceled",
            Self::Succeeded => "succeeded",
            Self::Other(other) => other,
        }
    }

    /// Customer or merchant must act before the intent can settle
    pub fn needs_action(&self) -> bool {
        matches!(
            self,
            Self::RequiresPaymentMethod
                | Self::RequiresConfirmation
                | Self::RequiresAction
                | Self::RequiresCapture
        )
    }
}

impl fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gateway view of a charge attempt
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentIntent {
    pub id: String,
    pub status: IntentStatus,
    /// Minor units
    pub amount: i64,
    pub currency: String,
    pub receipt_url: Option<String>,
    /// Last decline or error message reported by the gateway
    pub last_error: Option<String>,
}

/// Metadata attached to a new intent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentMetadata {
    pub order_id: String,
    pub user_id: String,
}

/// Refund created at the gateway
#[derive(Debug, Clone, PartialEq)]
pub struct Refund {
    pub id: String,
    pub status: String,
}

/// Inbound gateway event after signature verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created: i64,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(
        &self,
        amount: i64,
        currency: &str,
        metadata: &IntentMetadata,
    ) -> Result<PaymentIntent, GatewayError>;

    async fn get_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError>;

    /// Attach a payment method and confirm the intent
    async fn confirm_intent(
        &self,
        intent_id: &str,
        payment_method: &str,
    ) -> Result<PaymentIntent, GatewayError>;

    async fn cancel_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError>;

    /// Refund the intent's charge; `None` refunds the full amount
    async fn refund(&self, intent_id: &str, amount: Option<i64>) -> Result<Refund, GatewayError>;
}

/// Bound a gateway call by `limit`; expiry becomes [`GatewayError::Timeout`]
pub async fn with_timeout<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, GatewayError>>,
) -> Result<T, GatewayError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| GatewayError::Timeout(limit))?
}
