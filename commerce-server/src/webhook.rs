//! Gateway event dispatcher
//!
//! Events arrive at least once, possibly duplicated and out of order with
//! respect to API-driven processing. Each handler looks the payment up by
//! gateway intent id and applies a guarded transition, so replaying an
//! event converges on the same state. Lookup misses and unknown event
//! types are logged and acknowledged.

use serde_json::Value;

use crate::error::ServiceResult;
use crate::gateway::WebhookEvent;
use crate::gateway::stripe::parse_intent;
use crate::payments::PaymentManager;

pub const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";
pub const PAYMENT_FAILED: &str = "payment_intent.payment_failed";
pub const PAYMENT_CANCELED: &str = "payment_intent.canceled";
pub const CHARGE_REFUNDED: &str = "charge.refunded";

/// Result of dispatching one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Payment moved to a new status
    Applied,
    /// Payment was already in the target state (or past it)
    Unchanged,
    /// No payment carries the event's intent id
    UnknownPayment,
    /// Event type not handled, or payload without an intent id
    Ignored,
}

impl WebhookOutcome {
    fn from_changed(changed: bool) -> Self {
        if changed { Self::Applied } else { Self::Unchanged }
    }
}

#[derive(Clone)]
pub struct WebhookHandler {
    payments: PaymentManager,
}

impl WebhookHandler {
    pub fn new(payments: PaymentManager) -> Self {
        Self { payments }
    }

    /// Dispatch a verified event.
    ///
    /// Only storage failures surface as errors, so the gateway redelivers.
    pub fn handle(&self, event: &WebhookEvent) -> ServiceResult<WebhookOutcome> {
        let object = &event.data.object;
        tracing::info!(event_id = %event.id, event_type = %event.event_type, "Received gateway event");

        let outcome = match event.event_type.as_str() {
            PAYMENT_SUCCEEDED => self.on_payment_succeeded(object)?,
            PAYMENT_FAILED => self.on_payment_failed(object)?,
            PAYMENT_CANCELED => self.on_payment_canceled(object)?,
            CHARGE_REFUNDED => self.on_charge_refunded(object)?,
            other => {
                tracing::debug!(event_type = other, "Unhandled webhook event type");
                WebhookOutcome::Ignored
            }
        };

        tracing::debug!(event_id = %event.id, outcome = ?outcome, "Gateway event handled");
        Ok(outcome)
    }

    /// payment_intent.succeeded → PAID and order sync
    fn on_payment_succeeded(&self, object: &Value) -> ServiceResult<WebhookOutcome> {
        let Ok(intent) = parse_intent(object) else {
            tracing::warn!("payment_intent.succeeded without a usable intent");
            return Ok(WebhookOutcome::Ignored);
        };
        let Some(payment) = self.lookup(&intent.id)? else {
            return Ok(WebhookOutcome::UnknownPayment);
        };

        let (_, changed) =
            self.payments
                .apply_gateway_success(&payment.id, &intent.id, intent.receipt_url)?;
        Ok(WebhookOutcome::from_changed(changed))
    }

    /// payment_intent.payment_failed → FAILED with the gateway's message
    fn on_payment_failed(&self, object: &Value) -> ServiceResult<WebhookOutcome> {
        let Ok(intent) = parse_intent(object) else {
            tracing::warn!("payment_intent.payment_failed without a usable intent");
            return Ok(WebhookOutcome::Ignored);
        };
        let Some(payment) = self.lookup(&intent.id)? else {
            return Ok(WebhookOutcome::UnknownPayment);
        };

        let message = intent
            .last_error
            .unwrap_or_else(|| "Payment failed".to_string());
        let (_, changed) = self.payments.apply_gateway_failure(&payment.id, message)?;
        Ok(WebhookOutcome::from_changed(changed))
    }

    /// payment_intent.canceled → FAILED
    fn on_payment_canceled(&self, object: &Value) -> ServiceResult<WebhookOutcome> {
        let Some(intent_id) = object["id"].as_str() else {
            tracing::warn!("payment_intent.canceled without intent id");
            return Ok(WebhookOutcome::Ignored);
        };
        let Some(payment) = self.lookup(intent_id)? else {
            return Ok(WebhookOutcome::UnknownPayment);
        };

        let (_, changed) = self
            .payments
            .apply_gateway_failure(&payment.id, "Payment was canceled")?;
        Ok(WebhookOutcome::from_changed(changed))
    }

    /// charge.refunded → REFUNDED and order sync, looked up via the charge's intent
    fn on_charge_refunded(&self, object: &Value) -> ServiceResult<WebhookOutcome> {
        let Some(intent_id) = object["payment_intent"].as_str() else {
            tracing::warn!(charge_id = ?object["id"].as_str(), "charge.refunded without payment_intent");
            return Ok(WebhookOutcome::Ignored);
        };
        let Some(payment) = self.lookup(intent_id)? else {
            return Ok(WebhookOutcome::UnknownPayment);
        };

        let (_, changed) = self.payments.apply_gateway_refund(&payment.id)?;
        Ok(WebhookOutcome::from_changed(changed))
    }

    fn lookup(&self, intent_id: &str) -> ServiceResult<Option<shared::Payment>> {
        let payment = self.payments.find_by_intent(intent_id)?;
        if payment.is_none() {
            tracing::warn!(intent_id, "No payment found for gateway intent");
        }
        Ok(payment)
    }
}
