//! OrderManager - order creation, queries and guarded lifecycle transitions
//!
//! Every transition is a check-then-set inside one storage write
//! transaction: the guard sees the stored status, and a rejected guard
//! leaves the document untouched.
//!
//! # Transitions
//!
//! ```text
//! process  : PENDING    → PROCESSING
//! ship     : PROCESSING → SHIPPED     (optional tracking number)
//! deliver  : SHIPPED    → DELIVERED   (sets delivered_at)
//! cancel   : any except DELIVERED → CANCELLED
//! ```

use std::sync::Arc;

use rust_decimal::Decimal;
use shared::error::ErrorCode;
use shared::order::{
    CreateOrderInput, Order, OrderFilter, OrderStatus, OrderSummary, PaymentInfo,
    UpdateOrderInput,
};
use shared::payment::PaymentStatus;
use shared::util::{new_id, now_millis, order_number};

use crate::address::AddressBook;
use crate::error::{Entity, ServiceError, ServiceResult};
use crate::money;
use crate::storage::CommerceStorage;

/// Attempts at drawing an unused order number before giving up
const ORDER_NUMBER_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct OrderManager {
    storage: CommerceStorage,
    addresses: Arc<dyn AddressBook>,
}

fn invalid_transition(action: &str, status: OrderStatus) -> ServiceError {
    ServiceError::invalid_state(
        Entity::Order,
        format!("Cannot {action} an order with status {status}"),
    )
}

impl OrderManager {
    pub fn new(storage: CommerceStorage, addresses: Arc<dyn AddressBook>) -> Self {
        Self { storage, addresses }
    }

    // ========== Creation ==========

    /// Validate and persist a new PENDING order.
    ///
    /// A referenced address must resolve; its one-line form fills a blank
    /// shipping address.
    pub async fn create(&self, input: CreateOrderInput) -> ServiceResult<Order> {
        money::validate_order_input(&input)?;

        let mut shipping = input.shipping;
        if let Some(address_id) = &input.address_id {
            let address = self.addresses.find_one(address_id).await?;
            if shipping.address.trim().is_empty() {
                shipping.address = address.one_line();
            }
        }

        let now = now_millis();
        let mut order = Order {
            id: new_id(),
            order_number: order_number(),
            user_id: input.user_id,
            items: input.items,
            subtotal: input.subtotal,
            tax: input.tax,
            total: input.total,
            status: OrderStatus::Pending,
            payment: PaymentInfo {
                method: input.payment_method,
                status: PaymentStatus::Pending,
                transaction_id: None,
            },
            shipping,
            address_id: input.address_id,
            refund_reason: None,
            created_at: now,
            updated_at: now,
            delivered_at: None,
        };

        for _ in 0..ORDER_NUMBER_ATTEMPTS {
            if self.storage.insert_order(&order)? {
                tracing::info!(
                    order_id = %order.id,
                    order_number = %order.order_number,
                    total = order.total,
                    "Order created"
                );
                return Ok(order);
            }
            tracing::debug!(order_number = %order.order_number, "Order number taken, retrying");
            order.order_number = order_number();
        }

        Err(ServiceError::invalid_argument(
            ErrorCode::AlreadyExists,
            "Could not allocate a unique order number",
        ))
    }

    // ========== Queries ==========

    pub fn find_one(&self, order_id: &str) -> ServiceResult<Order> {
        self.storage
            .get_order(order_id)?
            .ok_or_else(|| ServiceError::not_found(Entity::Order, order_id))
    }

    pub fn find_by_order_number(&self, order_number: &str) -> ServiceResult<Order> {
        self.storage
            .find_order_by_number(order_number)?
            .ok_or_else(|| ServiceError::not_found(Entity::Order, order_number))
    }

    /// Orders of one user, newest first
    pub fn find_by_user(&self, user_id: &str) -> ServiceResult<Vec<Order>> {
        self.find_all(&OrderFilter::for_user(user_id))
    }

    /// Orders matching `filter`, newest first
    pub fn find_all(&self, filter: &OrderFilter) -> ServiceResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .storage
            .get_all_orders()?
            .into_iter()
            .filter(|order| filter.matches(order))
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// Per-status counts and revenue of non-cancelled orders created in range
    pub fn summary(&self, start_date: Option<i64>, end_date: Option<i64>) -> ServiceResult<OrderSummary> {
        let filter = OrderFilter {
            start_date,
            end_date,
            ..Default::default()
        };

        let mut summary = OrderSummary::default();
        let mut revenue = Decimal::ZERO;
        for order in self.storage.get_all_orders()? {
            if !filter.matches(&order) {
                continue;
            }
            summary.count(order.status);
            if order.status != OrderStatus::Cancelled {
                revenue += money::to_decimal(order.total);
            }
        }
        summary.total_revenue = money::to_f64(revenue);
        Ok(summary)
    }

    // ========== Lifecycle Transitions ==========

    pub fn process(&self, order_id: &str) -> ServiceResult<Order> {
        let order = self.transition(order_id, |order| {
            if order.status != OrderStatus::Pending {
                return Err(invalid_transition("process", order.status));
            }
            order.status = OrderStatus::Processing;
            Ok(())
        })?;
        tracing::info!(order_id = %order.id, "Order processing");
        Ok(order)
    }

    pub fn ship(&self, order_id: &str, tracking_number: Option<String>) -> ServiceResult<Order> {
        let order = self.transition(order_id, |order| {
            if order.status != OrderStatus::Processing {
                return Err(invalid_transition("ship", order.status));
            }
            order.status = OrderStatus::Shipped;
            if let Some(tracking) = tracking_number {
                order.shipping.tracking_number = Some(tracking);
            }
            Ok(())
        })?;
        tracing::info!(
            order_id = %order.id,
            tracking_number = ?order.shipping.tracking_number,
            "Order shipped"
        );
        Ok(order)
    }

    pub fn deliver(&self, order_id: &str) -> ServiceResult<Order> {
        let order = self.transition(order_id, |order| {
            if order.status != OrderStatus::Shipped {
                return Err(invalid_transition("mark as delivered", order.status));
            }
            order.status = OrderStatus::Delivered;
            order.delivered_at = Some(now_millis());
            Ok(())
        })?;
        tracing::info!(order_id = %order.id, "Order delivered");
        Ok(order)
    }

    pub fn cancel(&self, order_id: &str) -> ServiceResult<Order> {
        let order = self.transition(order_id, |order| {
            if order.status == OrderStatus::Delivered {
                return Err(ServiceError::invalid_state(
                    Entity::Order,
                    "Cannot cancel a delivered order",
                ));
            }
            order.status = OrderStatus::Cancelled;
            Ok(())
        })?;
        tracing::info!(order_id = %order.id, "Order cancelled");
        Ok(order)
    }

    /// Record a refund on the embedded payment snapshot; fulfillment status is untouched
    pub fn mark_refunded(&self, order_id: &str, reason: Option<String>) -> ServiceResult<Order> {
        let order = self.transition(order_id, |order| {
            order.payment.status = PaymentStatus::Refunded;
            if reason.is_some() {
                order.refund_reason = reason;
            }
            Ok(())
        })?;
        tracing::info!(order_id = %order.id, reason = ?order.refund_reason, "Order marked refunded");
        Ok(order)
    }

    /// Sync the order with a payment outcome.
    ///
    /// Check-then-set on every field, so re-applying the same status is a
    /// no-op: PAID advances PENDING to PROCESSING, REFUNDED or CANCELLED
    /// cancel any order not already cancelled.
    pub fn mark_payment_status(
        &self,
        order_id: &str,
        payment_status: PaymentStatus,
    ) -> ServiceResult<Order> {
        let mut moved_from = None;
        let order = self
            .storage
            .update_order(order_id, |order| {
                let mut changed = false;
                if order.payment.status != payment_status {
                    order.payment.status = payment_status;
                    changed = true;
                }

                let target = match payment_status {
                    PaymentStatus::Paid if order.status == OrderStatus::Pending => {
                        Some(OrderStatus::Processing)
                    }
                    PaymentStatus::Refunded | PaymentStatus::Cancelled
                        if order.status != OrderStatus::Cancelled =>
                    {
                        Some(OrderStatus::Cancelled)
                    }
                    _ => None,
                };
                if let Some(target) = target {
                    moved_from = Some(order.status);
                    order.status = target;
                    changed = true;
                }

                if changed {
                    order.updated_at = now_millis();
                }
                Ok::<_, ServiceError>(changed)
            })?
            .ok_or_else(|| ServiceError::not_found(Entity::Order, order_id))?;

        if let Some(from) = moved_from {
            tracing::info!(
                order_id = %order.id,
                payment_status = %payment_status,
                from = %from,
                to = %order.status,
                "Order status synced from payment"
            );
        }
        Ok(order)
    }

    // ========== Administration ==========

    /// Unconditional field merge; lifecycle guards do not apply
    pub async fn update(&self, order_id: &str, input: UpdateOrderInput) -> ServiceResult<Order> {
        if let Some(address_id) = &input.address_id {
            self.addresses.find_one(address_id).await?;
        }
        for (value, field) in [
            (input.subtotal, "subtotal"),
            (input.tax, "tax"),
            (input.total, "total"),
        ] {
            if let Some(value) = value {
                money::require_amount(value, field)?;
            }
        }

        let order = self.transition(order_id, |order| {
            if let Some(items) = input.items {
                order.items = items;
            }
            if let Some(subtotal) = input.subtotal {
                order.subtotal = subtotal;
            }
            if let Some(tax) = input.tax {
                order.tax = tax;
            }
            if let Some(total) = input.total {
                order.total = total;
            }
            if let Some(status) = input.status {
                order.status = status;
            }
            if let Some(payment) = input.payment {
                order.payment = payment;
            }
            if let Some(shipping) = input.shipping {
                order.shipping = shipping;
            }
            if let Some(address_id) = input.address_id {
                order.address_id = Some(address_id);
            }
            Ok(())
        })?;
        tracing::info!(order_id = %order.id, status = %order.status, "Order updated");
        Ok(order)
    }

    /// Apply a guarded mutation and bump `updated_at`
    fn transition(
        &self,
        order_id: &str,
        apply: impl FnOnce(&mut Order) -> ServiceResult<()>,
    ) -> ServiceResult<Order> {
        self.storage
            .update_order(order_id, |order| {
                apply(order)?;
                order.updated_at = now_millis();
                Ok::<_, ServiceError>(true)
            })?
            .ok_or_else(|| ServiceError::not_found(Entity::Order, order_id))
    }
}
