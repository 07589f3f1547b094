//! Payment document, inputs and filter

use crate::order::filter::in_range;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
    Cancelled,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 5] = [
        PaymentStatus::Pending,
        PaymentStatus::Paid,
        PaymentStatus::Failed,
        PaymentStatus::Refunded,
        PaymentStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted payment document
///
/// `amount` is fixed at creation and never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: String,
    pub order_id: String,
    pub user_id: String,
    /// Free-text method, compared case-insensitively against the gateway marker
    pub method: String,
    /// Amount in major units
    pub amount: f64,
    pub currency: String,
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Gateway intent id, indexed for webhook lookup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<i64>,
}

/// Payment creation input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentInput {
    pub order_id: String,
    pub user_id: String,
    pub method: String,
    pub amount: f64,
    /// Falls back to the configured default currency
    #[serde(default)]
    pub currency: Option<String>,
}

/// Administrative field merge
///
/// Amount and method are deliberately absent: they are fixed at creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePaymentInput {
    #[serde(default)]
    pub status: Option<PaymentStatus>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub payment_intent_id: Option<String>,
    #[serde(default)]
    pub receipt_url: Option<String>,
    #[serde(default)]
    pub failure_message: Option<String>,
}

/// Payment query filter, every field optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentFilter {
    pub user_id: Option<String>,
    pub order_id: Option<String>,
    /// Case-insensitive method match
    pub method: Option<String>,
    pub status: Option<PaymentStatus>,
    pub transaction_id: Option<String>,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
}

impl PaymentFilter {
    pub fn matches(&self, payment: &Payment) -> bool {
        if let Some(user_id) = &self.user_id
            && payment.user_id != *user_id
        {
            return false;
        }
        if let Some(order_id) = &self.order_id
            && payment.order_id != *order_id
        {
            return false;
        }
        if let Some(method) = &self.method
            && !payment.method.eq_ignore_ascii_case(method)
        {
            return false;
        }
        if let Some(status) = self.status
            && payment.status != status
        {
            return false;
        }
        if let Some(tx) = &self.transaction_id
            && payment.transaction_id.as_deref() != Some(tx.as_str())
        {
            return false;
        }
        in_range(payment.created_at, self.start_date, self.end_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payment() -> Payment {
        Payment {
            id: "pay-1".to_string(),
            order_id: "o-1".to_string(),
            user_id: "u-1".to_string(),
            method: "Stripe".to_string(),
            amount: 100.0,
            currency: "usd".to_string(),
            status: PaymentStatus::Paid,
            transaction_id: Some("pi_1".to_string()),
            payment_intent_id: Some("pi_1".to_string()),
            receipt_url: None,
            failure_message: None,
            created_at: 5_000,
            updated_at: 5_000,
            paid_at: Some(5_000),
            failed_at: None,
        }
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&PaymentStatus::Refunded).unwrap();
        assert_eq!(json, "\"REFUNDED\"");
        assert_eq!(PaymentStatus::Paid.to_string(), "paid");
    }

    #[test]
    fn test_filter_method_case_insensitive() {
        let filter = PaymentFilter {
            method: Some("stripe".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&sample_payment()));
    }

    #[test]
    fn test_filter_rejects_mismatches() {
        let payment = sample_payment();
        let by_status = PaymentFilter {
            status: Some(PaymentStatus::Pending),
            ..Default::default()
        };
        assert!(!by_status.matches(&payment));

        let by_tx = PaymentFilter {
            transaction_id: Some("pi_2".to_string()),
            ..Default::default()
        };
        assert!(!by_tx.matches(&payment));

        let by_date = PaymentFilter {
            end_date: Some(4_999),
            ..Default::default()
        };
        assert!(!by_date.matches(&payment));
    }

    #[test]
    fn test_optional_fields_skipped() {
        let mut payment = sample_payment();
        payment.receipt_url = None;
        let json = serde_json::to_value(&payment).unwrap();
        assert!(json.get("receipt_url").is_none());
        assert_eq!(json["status"], "PAID");
    }
}
