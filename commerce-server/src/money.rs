//! Money utilities using rust_decimal for precision
//!
//! Amounts are stored as `f64` major units. Comparisons and gateway
//! conversions go through `Decimal` so that binary float noise never
//! decides whether a payment matches an order or a refund is too large.

use rust_decimal::prelude::*;
use shared::error::ErrorCode;
use shared::order::CreateOrderInput;

use crate::error::{ServiceError, ServiceResult};

/// Rounding strategy for monetary values (2 decimal places, half away from zero)
const DECIMAL_PLACES: u32 = 2;

/// Minor units per major unit
const MINOR_PER_MAJOR: i64 = 100;

/// Maximum allowed price per item
const MAX_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per item
const MAX_QUANTITY: i32 = 9999;
/// Maximum allowed order or payment amount
const MAX_AMOUNT: f64 = 100_000_000.0;

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    round_money(value).to_f64().unwrap_or_default()
}

#[inline]
fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Whether two amounts are equal at cent precision
pub fn amounts_equal(a: f64, b: f64) -> bool {
    round_money(to_decimal(a)) == round_money(to_decimal(b))
}

/// Whether `a` is greater than `b` at cent precision
pub fn exceeds(a: f64, b: f64) -> bool {
    round_money(to_decimal(a)) > round_money(to_decimal(b))
}

/// Major units to gateway minor units, rounded to the nearest integer
pub fn to_minor_units(amount: f64) -> i64 {
    (to_decimal(amount) * Decimal::from(MINOR_PER_MAJOR))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or_default()
}

/// Validate that a f64 value is finite (not NaN, not Infinity)
#[inline]
fn require_finite(value: f64, field_name: &str) -> ServiceResult<()> {
    if !value.is_finite() {
        return Err(ServiceError::validation(format!(
            "{} must be a finite number, got {}",
            field_name, value
        )));
    }
    Ok(())
}

/// Validate a non-negative, bounded amount
pub fn require_amount(value: f64, field_name: &str) -> ServiceResult<()> {
    require_finite(value, field_name)?;
    if value < 0.0 {
        return Err(ServiceError::validation(format!(
            "{} must be non-negative, got {}",
            field_name, value
        )));
    }
    if value > MAX_AMOUNT {
        return Err(ServiceError::invalid_argument(
            ErrorCode::ValueOutOfRange,
            format!(
                "{} exceeds maximum allowed ({}), got {}",
                field_name, MAX_AMOUNT, value
            ),
        ));
    }
    Ok(())
}

/// Validate an order creation input before anything is persisted
pub fn validate_order_input(input: &CreateOrderInput) -> ServiceResult<()> {
    if input.user_id.trim().is_empty() {
        return Err(ServiceError::validation("user_id is required"));
    }
    if input.items.is_empty() {
        return Err(ServiceError::invalid_argument(
            ErrorCode::OrderEmpty,
            "order must contain at least one item",
        ));
    }

    for item in &input.items {
        if item.product_id.trim().is_empty() {
            return Err(ServiceError::validation("item product_id is required"));
        }

        require_finite(item.price, "price")?;
        if item.price < 0.0 {
            return Err(ServiceError::validation(format!(
                "price must be non-negative, got {}",
                item.price
            )));
        }
        if item.price > MAX_PRICE {
            return Err(ServiceError::invalid_argument(
                ErrorCode::ValueOutOfRange,
                format!(
                    "price exceeds maximum allowed ({}), got {}",
                    MAX_PRICE, item.price
                ),
            ));
        }

        if item.quantity < 1 {
            return Err(ServiceError::validation(format!(
                "quantity must be at least 1, got {}",
                item.quantity
            )));
        }
        if item.quantity > MAX_QUANTITY {
            return Err(ServiceError::invalid_argument(
                ErrorCode::ValueOutOfRange,
                format!(
                    "quantity exceeds maximum allowed ({}), got {}",
                    MAX_QUANTITY, item.quantity
                ),
            ));
        }
    }

    require_amount(input.subtotal, "subtotal")?;
    require_amount(input.tax, "tax")?;
    require_amount(input.total, "total")?;
    require_amount(input.shipping.cost, "shipping cost")?;

    if input.payment_method.trim().is_empty() {
        return Err(ServiceError::validation("payment_method is required"));
    }
    if input.shipping.address.trim().is_empty() && input.address_id.is_none() {
        return Err(ServiceError::validation(
            "shipping address or address_id is required",
        ));
    }
    Ok(())
}
