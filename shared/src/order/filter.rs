//! Order query filter and summary report

use super::types::{Order, OrderStatus};
use crate::payment::PaymentStatus;
use serde::{Deserialize, Serialize};

/// Order query filter, every field optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderFilter {
    pub user_id: Option<String>,
    pub order_number: Option<String>,
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    /// Matches orders with any line item for this product
    pub product_id: Option<String>,
    pub address_id: Option<String>,
    /// Inclusive lower bound on `created_at` (millis)
    pub start_date: Option<i64>,
    /// Inclusive upper bound on `created_at` (millis)
    pub end_date: Option<i64>,
}

impl OrderFilter {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Default::default()
        }
    }

    pub fn matches(&self, order: &Order) -> bool {
        if let Some(user_id) = &self.user_id
            && order.user_id != *user_id
        {
            return false;
        }
        if let Some(number) = &self.order_number
            && order.order_number != *number
        {
            return false;
        }
        if let Some(status) = self.status
            && order.status != status
        {
            return false;
        }
        if let Some(payment_status) = self.payment_status
            && order.payment.status != payment_status
        {
            return false;
        }
        if let Some(product_id) = &self.product_id
            && !order.contains_product(product_id)
        {
            return false;
        }
        if let Some(address_id) = &self.address_id
            && order.address_id.as_deref() != Some(address_id.as_str())
        {
            return false;
        }
        in_range(order.created_at, self.start_date, self.end_date)
    }
}

/// Whether `ts` lies within the optional inclusive bounds
pub fn in_range(ts: i64, start: Option<i64>, end: Option<i64>) -> bool {
    start.is_none_or(|s| ts >= s) && end.is_none_or(|e| ts <= e)
}

/// Order counts per status plus revenue over non-cancelled orders
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub total_orders: u64,
    pub pending: u64,
    pub processing: u64,
    pub shipped: u64,
    pub delivered: u64,
    pub cancelled: u64,
    pub total_revenue: f64,
}

impl OrderSummary {
    /// Count one order; revenue is accumulated by the caller
    pub fn count(&mut self, status: OrderStatus) {
        self.total_orders += 1;
        match status {
            OrderStatus::Pending => self.pending += 1,
            OrderStatus::Processing => self.processing += 1,
            OrderStatus::Shipped => self.shipped += 1,
            OrderStatus::Delivered => self.delivered += 1,
            OrderStatus::Cancelled => self.cancelled += 1,
        }
    }
}
