//! Payment records
//!
//! The payment collection is the source of truth for payment history and
//! gateway reconciliation; orders only carry a denormalized snapshot.

pub mod types;

pub use types::*;
