//! Address registration
//!
//! Minimal stand-in for the address service so orders can reference
//! address ids.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::put,
};
use shared::Address;
use shared::error::{AppError, AppResult};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/addresses/{id}", put(put_address))
}

/// Insert or replace an address; the path id wins over the body id
pub async fn put_address(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut address): Json<Address>,
) -> AppResult<Json<Address>> {
    if id.trim().is_empty() {
        return Err(AppError::validation("address id is required"));
    }
    address.id = id;
    state.addresses.register(&address)?;
    Ok(Json(address))
}
