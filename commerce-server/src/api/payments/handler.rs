//! Payment API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::error::AppResult;
use shared::payment::{CreatePaymentInput, Payment, PaymentFilter, UpdatePaymentInput};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    /// Gateway payment method token
    pub payment_method: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefundRequest {
    /// Major units; full refund when absent
    #[serde(default)]
    pub amount: Option<f64>,
}

pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreatePaymentInput>,
) -> AppResult<Json<Payment>> {
    let payment = state.payments.create(input).await?;
    Ok(Json(payment))
}

/// List payments matching the query filter
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<PaymentFilter>,
) -> AppResult<Json<Vec<Payment>>> {
    Ok(Json(state.payments.find_all(&filter)?))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Payment>> {
    Ok(Json(state.payments.find_one(&id)?))
}

pub async fn list_by_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> AppResult<Json<Vec<Payment>>> {
    Ok(Json(state.payments.find_by_order(&order_id)?))
}

pub async fn list_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<Payment>>> {
    Ok(Json(state.payments.find_by_user(&user_id)?))
}

/// Administrative update
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdatePaymentInput>,
) -> AppResult<Json<Payment>> {
    Ok(Json(state.payments.update(&id, input)?))
}

/// Administrative removal
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<bool>> {
    Ok(Json(state.payments.remove(&id)?))
}

pub async fn process(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Payment>> {
    Ok(Json(state.payments.process(&id).await?))
}

pub async fn confirm(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ConfirmRequest>,
) -> AppResult<Json<Payment>> {
    Ok(Json(state.payments.confirm(&id, &req.payment_method).await?))
}

pub async fn refund(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RefundRequest>,
) -> AppResult<Json<Payment>> {
    Ok(Json(state.payments.refund(&id, req.amount).await?))
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Payment>> {
    Ok(Json(state.payments.cancel(&id).await?))
}
