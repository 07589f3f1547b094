//! commerce-server: order lifecycle and payment reconciliation
//!
//! # Modules
//!
//! - **orders**: order creation, queries and the fulfillment state machine
//! - **payments**: payment state machine, gateway reconciliation, order sync
//! - **webhook**: idempotent dispatcher for gateway events
//! - **gateway**: payment gateway trait, Stripe REST adapter, webhook signatures
//! - **storage**: redb document store
//! - **api**: axum HTTP routes
//!
//! # Consistency
//!
//! Orders and payments are committed separately. The payment record is the
//! source of truth; every order-side effect of a payment transition is an
//! idempotent check-then-set, so replayed gateway events repair the order.

pub mod address;
pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logger;
pub mod money;
pub mod orders;
pub mod payments;
pub mod state;
pub mod storage;
pub mod webhook;

pub use config::Config;
pub use error::{ServiceError, ServiceResult};
pub use state::AppState;
