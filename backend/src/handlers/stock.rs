//! HTTP handlers for stock ledger endpoints

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{AddStockRequest, TransferStockRequest, UpdateStockQuantityRequest};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::AppState;

/// Optional partial-removal amount
#[derive(Debug, Deserialize)]
pub struct RemoveStockParams {
    pub quantity: Option<i32>,
}

/// Add stock to a warehouse
pub async fn add_stock(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((inventory_id, warehouse_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<AddStockRequest>,
) -> AppResult<StatusCode> {
    input.validate()?;
    state
        .ledger
        .add_stock(warehouse_id, inventory_id, &input.stock_items)
        .await?;
    tracing::debug!(user_id = %user.user_id, "Stock added");
    Ok(StatusCode::NO_CONTENT)
}

/// Set the absolute quantity of a product in a warehouse
pub async fn update_stock_quantity(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((inventory_id, warehouse_id, product_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(input): Json<UpdateStockQuantityRequest>,
) -> AppResult<StatusCode> {
    input.validate()?;
    state
        .ledger
        .update_stock_quantity(inventory_id, warehouse_id, product_id, input.new_quantity)
        .await?;
    tracing::debug!(user_id = %user.user_id, "Stock quantity updated");
    Ok(StatusCode::NO_CONTENT)
}

/// Remove a product from a warehouse, entirely or by `?quantity=N`
pub async fn remove_stock(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((inventory_id, warehouse_id, product_id)): Path<(Uuid, Uuid, Uuid)>,
    params: Result<Query<RemoveStockParams>, QueryRejection>,
) -> AppResult<StatusCode> {
    let Query(params) = params?;
    match params.quantity {
        Some(quantity) => {
            state
                .ledger
                .remove_stock_quantity(inventory_id, warehouse_id, product_id, quantity)
                .await?
        }
        None => {
            state
                .ledger
                .remove_stock(inventory_id, warehouse_id, product_id)
                .await?
        }
    }
    tracing::debug!(user_id = %user.user_id, "Stock removed");
    Ok(StatusCode::NO_CONTENT)
}

/// Transfer stock between two warehouses
pub async fn transfer_stock(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(inventory_id): Path<Uuid>,
    Json(input): Json<TransferStockRequest>,
) -> AppResult<StatusCode> {
    input.validate()?;
    state
        .ledger
        .transfer_stock(
            inventory_id,
            input.from_warehouse_id,
            input.to_warehouse_id,
            &input.transfer_items,
        )
        .await?;
    tracing::debug!(user_id = %user.user_id, "Stock transferred");
    Ok(StatusCode::NO_CONTENT)
}
