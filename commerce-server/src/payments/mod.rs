//! Payment reconciliation
//!
//! [`PaymentManager`] owns the payment state machine and keeps each order's
//! embedded payment snapshot in step through
//! [`OrderManager::mark_payment_status`](crate::orders::OrderManager::mark_payment_status).
//!
//! ```text
//! PENDING ──→ PAID ──→ REFUNDED
//!    ├──────→ FAILED
//!    └──────→ CANCELLED
//! ```
//!
//! Payment and order are two separate commits. Every order-side effect is
//! idempotent, so replaying a gateway event repairs an order left behind
//! by a crash between the two.

pub mod manager;

pub use manager::{PaymentManager, PaymentSettings};

pub use shared::payment::{
    CreatePaymentInput, Payment, PaymentFilter, PaymentStatus, UpdatePaymentInput,
};
