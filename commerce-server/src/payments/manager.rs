//! PaymentManager - payment creation, gateway reconciliation and order sync
//!
//! # Failure capture
//!
//! Guard failures (wrong status, bad amount, missing intent) are returned
//! before any gateway call. Once a gateway call is attempted during
//! processing, confirmation, refund or cancellation, its failure is written
//! onto the payment (FAILED + message) and the updated payment is returned
//! instead of an error.

use std::sync::Arc;
use std::time::Duration;

use shared::error::ErrorCode;
use shared::payment::{
    CreatePaymentInput, Payment, PaymentFilter, PaymentStatus, UpdatePaymentInput,
};
use shared::util::{new_id, now_millis};

use crate::error::{Entity, ServiceError, ServiceResult};
use crate::gateway::{IntentMetadata, IntentStatus, PaymentGateway, PaymentIntent, with_timeout};
use crate::money;
use crate::orders::OrderManager;
use crate::storage::CommerceStorage;

/// Payment flow settings
#[derive(Debug, Clone)]
pub struct PaymentSettings {
    /// Method name (case-insensitive) that selects the gateway flow
    pub gateway_method: String,
    /// Currency used when a payment does not name one
    pub currency: String,
    /// Deadline for every gateway call
    pub gateway_timeout: Duration,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            gateway_method: "stripe".to_string(),
            currency: "usd".to_string(),
            gateway_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Clone)]
pub struct PaymentManager {
    storage: CommerceStorage,
    orders: OrderManager,
    gateway: Arc<dyn PaymentGateway>,
    settings: PaymentSettings,
}

fn intent_missing() -> ServiceError {
    ServiceError::invalid_argument(ErrorCode::PaymentIntentMissing, "No payment intent ID found")
}

impl PaymentManager {
    pub fn new(
        storage: CommerceStorage,
        orders: OrderManager,
        gateway: Arc<dyn PaymentGateway>,
        settings: PaymentSettings,
    ) -> Self {
        Self {
            storage,
            orders,
            gateway,
            settings,
        }
    }

    pub fn settings(&self) -> &PaymentSettings {
        &self.settings
    }

    /// Whether `method` goes through the payment gateway
    pub fn is_gateway_method(&self, method: &str) -> bool {
        method.trim().eq_ignore_ascii_case(&self.settings.gateway_method)
    }

    // ========== Creation ==========

    /// Create a PENDING payment for an existing order.
    ///
    /// The amount must equal the order total at cent precision; the stored
    /// amount is the order total. Gateway payments get an intent
    /// first; if that fails nothing is stored.
    pub async fn create(&self, input: CreatePaymentInput) -> ServiceResult<Payment> {
        money::require_amount(input.amount, "amount")?;
        if input.method.trim().is_empty() {
            return Err(ServiceError::validation("method is required"));
        }

        let order = self.orders.find_one(&input.order_id)?;
        if !money::amounts_equal(input.amount, order.total) {
            return Err(ServiceError::invalid_argument(
                ErrorCode::PaymentAmountMismatch,
                format!(
                    "Payment amount {} does not match order total {}",
                    input.amount, order.total
                ),
            ));
        }

        let currency = input
            .currency
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| self.settings.currency.clone())
            .to_lowercase();

        let payment_intent_id = if self.is_gateway_method(&input.method) {
            let metadata = IntentMetadata {
                order_id: input.order_id.clone(),
                user_id: input.user_id.clone(),
            };
            let intent = with_timeout(
                self.settings.gateway_timeout,
                self.gateway
                    .create_intent(money::to_minor_units(order.total), &currency, &metadata),
            )
            .await
            .map_err(|e| {
                tracing::warn!(order_id = %input.order_id, error = %e, "Payment intent creation failed");
                ServiceError::invalid_argument(
                    ErrorCode::PaymentIntentFailed,
                    format!("Failed to create payment intent: {e}"),
                )
            })?;
            Some(intent.id)
        } else {
            None
        };

        let now = now_millis();
        let payment = Payment {
            id: new_id(),
            order_id: input.order_id,
            user_id: input.user_id,
            method: input.method,
            amount: order.total,
            currency,
            status: PaymentStatus::Pending,
            transaction_id: None,
            payment_intent_id,
            receipt_url: None,
            failure_message: None,
            created_at: now,
            updated_at: now,
            paid_at: None,
            failed_at: None,
        };
        self.storage.insert_payment(&payment)?;

        tracing::info!(
            payment_id = %payment.id,
            order_id = %payment.order_id,
            intent_id = ?payment.payment_intent_id,
            amount = payment.amount,
            "Payment created"
        );
        Ok(payment)
    }

    // ========== Queries ==========

    pub fn find_one(&self, payment_id: &str) -> ServiceResult<Payment> {
        self.storage
            .get_payment(payment_id)?
            .ok_or_else(|| ServiceError::not_found(Entity::Payment, payment_id))
    }

    /// Payments matching `filter`, newest first
    pub fn find_all(&self, filter: &PaymentFilter) -> ServiceResult<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .storage
            .get_all_payments()?
            .into_iter()
            .filter(|payment| filter.matches(payment))
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }

    pub fn find_by_order(&self, order_id: &str) -> ServiceResult<Vec<Payment>> {
        self.find_all(&PaymentFilter {
            order_id: Some(order_id.to_string()),
            ..Default::default()
        })
    }

    pub fn find_by_user(&self, user_id: &str) -> ServiceResult<Vec<Payment>> {
        self.find_all(&PaymentFilter {
            user_id: Some(user_id.to_string()),
            ..Default::default()
        })
    }

    /// Payment attached to a gateway intent, if any
    pub fn find_by_intent(&self, intent_id: &str) -> ServiceResult<Option<Payment>> {
        Ok(self.storage.find_payment_by_intent(intent_id)?)
    }

    // ========== Reconciliation ==========

    /// Settle a PENDING payment.
    ///
    /// Gateway payments take their outcome from the current intent; manual
    /// payments are marked PAID directly.
    pub async fn process(&self, payment_id: &str) -> ServiceResult<Payment> {
        let payment = self.find_one(payment_id)?;
        if payment.status != PaymentStatus::Pending {
            return Err(ServiceError::invalid_state(
                Entity::Payment,
                format!("Cannot process a payment with status {}", payment.status),
            ));
        }

        if !self.is_gateway_method(&payment.method) {
            let transaction_id = format!("tx_{}", now_millis());
            let (payment, _) = self.settle_paid(payment_id, transaction_id, None)?;
            return Ok(payment);
        }

        let intent_id = payment.payment_intent_id.clone().ok_or_else(intent_missing)?;
        let fetched = with_timeout(
            self.settings.gateway_timeout,
            self.gateway.get_intent(&intent_id),
        )
        .await;
        match fetched {
            Ok(intent) => self.apply_intent(payment_id, intent),
            Err(e) => {
                let (payment, _) = self.record_failure(payment_id, e.to_string())?;
                Ok(payment)
            }
        }
    }

    /// Submit a payment method for a PENDING gateway payment and settle
    /// from the confirmed intent
    pub async fn confirm(&self, payment_id: &str, payment_method: &str) -> ServiceResult<Payment> {
        let payment = self.find_one(payment_id)?;
        if payment.status != PaymentStatus::Pending {
            return Err(ServiceError::invalid_state(
                Entity::Payment,
                format!("Cannot confirm a payment with status {}", payment.status),
            ));
        }
        if !self.is_gateway_method(&payment.method) {
            return Err(ServiceError::invalid_argument(
                ErrorCode::PaymentInvalidMethod,
                format!(
                    "Cannot confirm payment. Method is not {}: {}",
                    self.settings.gateway_method, payment.method
                ),
            ));
        }
        if payment_method.trim().is_empty() {
            return Err(ServiceError::validation("payment_method is required"));
        }

        let intent_id = payment.payment_intent_id.clone().ok_or_else(intent_missing)?;
        let confirmed = with_timeout(
            self.settings.gateway_timeout,
            self.gateway.confirm_intent(&intent_id, payment_method),
        )
        .await;
        match confirmed {
            Ok(intent) => self.apply_intent(payment_id, intent),
            Err(e) => {
                let (payment, _) = self.record_failure(payment_id, e.to_string())?;
                Ok(payment)
            }
        }
    }

    /// Refund a PAID payment, fully or up to its amount.
    ///
    /// A partial refund still ends in REFUNDED. A zero amount means a full refund.
    pub async fn refund(&self, payment_id: &str, amount: Option<f64>) -> ServiceResult<Payment> {
        let amount = amount.filter(|a| *a != 0.0);
        let payment = self.find_one(payment_id)?;
        if payment.status != PaymentStatus::Paid {
            return Err(ServiceError::invalid_state(
                Entity::Payment,
                "Cannot refund payment that is not paid",
            ));
        }
        if let Some(amount) = amount {
            money::require_amount(amount, "refund amount")?;
            if money::exceeds(amount, payment.amount) {
                return Err(ServiceError::invalid_argument(
                    ErrorCode::PaymentRefundExceedsAmount,
                    "Refund amount cannot exceed payment amount",
                ));
            }
        }

        if self.is_gateway_method(&payment.method) {
            let intent_id = payment.payment_intent_id.clone().ok_or_else(intent_missing)?;
            let refunded = with_timeout(
                self.settings.gateway_timeout,
                self.gateway.refund(&intent_id, amount.map(money::to_minor_units)),
            )
            .await;
            match refunded {
                Ok(refund) => {
                    tracing::info!(payment_id, refund_id = %refund.id, status = %refund.status, "Gateway refund created");
                }
                Err(e) => {
                    let message = format!("Refund failed: {e}");
                    tracing::error!(payment_id, error = %e, "Gateway refund failed");
                    let (payment, _) =
                        self.move_status(payment_id, &[PaymentStatus::Paid], PaymentStatus::Failed, |p| {
                            p.failure_message = Some(message);
                            p.failed_at = Some(now_millis());
                        })?;
                    return Ok(payment);
                }
            }
        }

        let (payment, _) = self.apply_refunded(payment_id, &[PaymentStatus::Paid])?;
        Ok(payment)
    }

    /// Cancel a PENDING payment and its gateway intent
    pub async fn cancel(&self, payment_id: &str) -> ServiceResult<Payment> {
        let payment = self.find_one(payment_id)?;
        if payment.status != PaymentStatus::Pending {
            return Err(ServiceError::invalid_state(
                Entity::Payment,
                format!("Cannot cancel a payment with status {}", payment.status),
            ));
        }

        if self.is_gateway_method(&payment.method) {
            let intent_id = payment.payment_intent_id.clone().ok_or_else(intent_missing)?;
            let cancelled = with_timeout(
                self.settings.gateway_timeout,
                self.gateway.cancel_intent(&intent_id),
            )
            .await;
            if let Err(e) = cancelled {
                let (payment, _) =
                    self.record_failure(payment_id, format!("Failed to cancel payment intent: {e}"))?;
                return Ok(payment);
            }
        }

        let (payment, _) = self.move_status(
            payment_id,
            &[PaymentStatus::Pending],
            PaymentStatus::Cancelled,
            |_| {},
        )?;
        if payment.status == PaymentStatus::Cancelled {
            self.orders
                .mark_payment_status(&payment.order_id, PaymentStatus::Cancelled)?;
        }
        Ok(payment)
    }

    // ========== Administration ==========

    /// Unconditional field merge.
    ///
    /// Entering PAID sets `paid_at`; entering PAID or REFUNDED syncs the order.
    pub fn update(&self, payment_id: &str, input: UpdatePaymentInput) -> ServiceResult<Payment> {
        let mut previous = None;
        let payment = self
            .storage
            .update_payment(payment_id, |payment| {
                let now = now_millis();
                previous = Some(payment.status);
                if let Some(status) = input.status {
                    if status == PaymentStatus::Paid && payment.status != PaymentStatus::Paid {
                        payment.paid_at = Some(now);
                    }
                    if status == PaymentStatus::Failed && payment.status != PaymentStatus::Failed {
                        payment.failed_at = Some(now);
                    }
                    payment.status = status;
                }
                if let Some(transaction_id) = input.transaction_id {
                    payment.transaction_id = Some(transaction_id);
                }
                if let Some(intent_id) = input.payment_intent_id {
                    payment.payment_intent_id = Some(intent_id);
                }
                if let Some(receipt_url) = input.receipt_url {
                    payment.receipt_url = Some(receipt_url);
                }
                if let Some(failure_message) = input.failure_message {
                    payment.failure_message = Some(failure_message);
                }
                payment.updated_at = now;
                Ok::<_, ServiceError>(true)
            })?
            .ok_or_else(|| ServiceError::not_found(Entity::Payment, payment_id))?;

        tracing::info!(payment_id, status = %payment.status, "Payment updated");
        if let Some(previous) = previous
            && previous != payment.status
            && matches!(payment.status, PaymentStatus::Paid | PaymentStatus::Refunded)
        {
            self.orders
                .mark_payment_status(&payment.order_id, payment.status)?;
        }
        Ok(payment)
    }

    /// Delete a payment record; `false` when it did not exist
    pub fn remove(&self, payment_id: &str) -> ServiceResult<bool> {
        let removed = self.storage.remove_payment(payment_id)?;
        if removed {
            tracing::info!(payment_id, "Payment removed");
        }
        Ok(removed)
    }

    // ========== Gateway Events ==========

    /// Intent succeeded at the gateway. Returns whether the payment changed.
    ///
    /// The order sync runs even when the payment was already PAID.
    pub fn apply_gateway_success(
        &self,
        payment_id: &str,
        intent_id: &str,
        receipt_url: Option<String>,
    ) -> ServiceResult<(Payment, bool)> {
        self.settle_paid(payment_id, intent_id.to_string(), receipt_url)
    }

    /// Intent failed at the gateway; applies only to PENDING payments
    pub fn apply_gateway_failure(
        &self,
        payment_id: &str,
        message: impl Into<String>,
    ) -> ServiceResult<(Payment, bool)> {
        self.record_failure(payment_id, message.into())
    }

    /// Charge refunded at the gateway
    pub fn apply_gateway_refund(&self, payment_id: &str) -> ServiceResult<(Payment, bool)> {
        self.apply_refunded(
            payment_id,
            &[
                PaymentStatus::Pending,
                PaymentStatus::Paid,
                PaymentStatus::Failed,
            ],
        )
    }

    // ========== Transitions ==========

    fn apply_intent(&self, payment_id: &str, intent: PaymentIntent) -> ServiceResult<Payment> {
        match intent.status {
            IntentStatus::Succeeded => {
                let (payment, _) = self.settle_paid(payment_id, intent.id, intent.receipt_url)?;
                Ok(payment)
            }
            status if status.needs_action() => {
                tracing::info!(payment_id, intent_status = %status, "Payment awaiting customer action");
                Err(ServiceError::invalid_state(
                    Entity::Payment,
                    format!("Payment requires further action: {status}"),
                ))
            }
            IntentStatus::Processing => Err(ServiceError::invalid_state(
                Entity::Payment,
                "Payment is still processing at the gateway",
            )),
            IntentStatus::Canceled => {
                let (payment, _) = self.record_failure(payment_id, "Payment was canceled".to_string())?;
                Ok(payment)
            }
            other => {
                let message = intent
                    .last_error
                    .unwrap_or_else(|| format!("Unexpected payment status: {other}"));
                let (payment, _) = self.record_failure(payment_id, message)?;
                Ok(payment)
            }
        }
    }

    /// PENDING or FAILED → PAID, then sync the order if the payment is PAID
    fn settle_paid(
        &self,
        payment_id: &str,
        transaction_id: String,
        receipt_url: Option<String>,
    ) -> ServiceResult<(Payment, bool)> {
        let (payment, changed) = self.move_status(
            payment_id,
            &[PaymentStatus::Pending, PaymentStatus::Failed],
            PaymentStatus::Paid,
            |payment| {
                payment.transaction_id = Some(transaction_id);
                if receipt_url.is_some() {
                    payment.receipt_url = receipt_url;
                }
                payment.paid_at = Some(now_millis());
            },
        )?;
        if payment.status == PaymentStatus::Paid {
            self.orders
                .mark_payment_status(&payment.order_id, PaymentStatus::Paid)?;
        }
        Ok((payment, changed))
    }

    /// PENDING → FAILED with `message`; no order effect
    fn record_failure(&self, payment_id: &str, message: String) -> ServiceResult<(Payment, bool)> {
        let (payment, changed) = self.move_status(
            payment_id,
            &[PaymentStatus::Pending],
            PaymentStatus::Failed,
            |payment| {
                payment.failure_message = Some(message);
                payment.failed_at = Some(now_millis());
            },
        )?;
        if changed {
            tracing::error!(
                payment_id,
                order_id = %payment.order_id,
                failure = ?payment.failure_message,
                "Payment failed"
            );
        }
        Ok((payment, changed))
    }

    /// `from` → REFUNDED, then sync the order if the payment is REFUNDED
    fn apply_refunded(
        &self,
        payment_id: &str,
        from: &[PaymentStatus],
    ) -> ServiceResult<(Payment, bool)> {
        let (payment, changed) =
            self.move_status(payment_id, from, PaymentStatus::Refunded, |_| {})?;
        if payment.status == PaymentStatus::Refunded {
            self.orders
                .mark_payment_status(&payment.order_id, PaymentStatus::Refunded)?;
        }
        Ok((payment, changed))
    }

    /// Check-then-set status move inside one write transaction.
    ///
    /// A payment not in `from` is returned unchanged with `false`.
    fn move_status(
        &self,
        payment_id: &str,
        from: &[PaymentStatus],
        to: PaymentStatus,
        apply: impl FnOnce(&mut Payment),
    ) -> ServiceResult<(Payment, bool)> {
        let mut previous = None;
        let payment = self
            .storage
            .update_payment(payment_id, |payment| {
                if !from.contains(&payment.status) {
                    return Ok::<_, ServiceError>(false);
                }
                previous = Some(payment.status);
                payment.status = to;
                apply(payment);
                payment.updated_at = now_millis();
                Ok(true)
            })?
            .ok_or_else(|| ServiceError::not_found(Entity::Payment, payment_id))?;

        if let Some(from) = previous {
            tracing::info!(
                payment_id,
                order_id = %payment.order_id,
                from = %from,
                to = %to,
                "Payment status changed"
            );
        }
        Ok((payment, previous.is_some()))
    }
}
