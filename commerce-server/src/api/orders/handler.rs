//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::error::AppResult;
use shared::order::{CreateOrderInput, Order, OrderFilter, OrderSummary, UpdateOrderInput};

use crate::state::AppState;

/// Date range for the summary report (millis, inclusive)
#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ShipRequest {
    #[serde(default)]
    pub tracking_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefundRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Create an order
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateOrderInput>,
) -> AppResult<Json<Order>> {
    let order = state.orders.create(input).await?;
    Ok(Json(order))
}

/// List orders matching the query filter
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
) -> AppResult<Json<Vec<Order>>> {
    Ok(Json(state.orders.find_all(&filter)?))
}

pub async fn summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> AppResult<Json<OrderSummary>> {
    Ok(Json(state.orders.summary(query.start_date, query.end_date)?))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.orders.find_one(&id)?))
}

pub async fn get_by_number(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.orders.find_by_order_number(&order_number)?))
}

pub async fn list_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<Order>>> {
    Ok(Json(state.orders.find_by_user(&user_id)?))
}

/// Administrative update (no lifecycle guards)
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateOrderInput>,
) -> AppResult<Json<Order>> {
    let order = state.orders.update(&id, input).await?;
    Ok(Json(order))
}

pub async fn process(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.orders.process(&id)?))
}

pub async fn ship(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ShipRequest>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.orders.ship(&id, req.tracking_number)?))
}

pub async fn deliver(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.orders.deliver(&id)?))
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.orders.cancel(&id)?))
}

/// Record a refund on the order's payment snapshot
pub async fn mark_refunded(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RefundRequest>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.orders.mark_refunded(&id, req.reason)?))
}
