//! Order lifecycle
//!
//! - **manager**: [`OrderManager`] guards the fulfillment state machine and
//!   exposes the payment-status sync used by payment reconciliation
//!
//! # State Machine
//!
//! ```text
//! PENDING → PROCESSING → SHIPPED → DELIVERED
//!    └──────────┴───────────┴──→ CANCELLED
//! ```
//!
//! Payment-driven moves go through [`OrderManager::mark_payment_status`]:
//! PAID advances PENDING to PROCESSING, REFUNDED/CANCELLED cancel the order.

pub mod manager;

pub use manager::OrderManager;

// Re-export shared types for convenience
pub use shared::order::{
    CreateOrderInput, Order, OrderFilter, OrderItem, OrderStatus, OrderSummary, UpdateOrderInput,
};
