//! Shared types for the commerce backend
//!
//! Domain records (orders, payments, addresses), the unified error
//! system and small utilities used by every crate in the workspace.

pub mod address;
pub mod error;
pub mod order;
pub mod payment;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use address::Address;
pub use order::{Order, OrderStatus};
pub use payment::{Payment, PaymentStatus};
