//! Order records
//!
//! - [`Order`]: persisted order with embedded payment/shipping snapshot
//! - [`OrderStatus`]: fulfillment state machine states
//! - Inputs for creation and administrative update
//! - [`OrderFilter`] / [`OrderSummary`] for queries and reporting

pub mod filter;
pub mod types;

pub use filter::{OrderFilter, OrderSummary};
pub use types::*;
