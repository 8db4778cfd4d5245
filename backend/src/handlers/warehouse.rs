//! HTTP handlers for warehouse endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::{ProductStorages, Warehouse, WarehouseRequest, WarehouseWithStock};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::AppState;

/// List warehouses of an inventory
pub async fn list_warehouses(
    State(state): State<AppState>,
    Path(inventory_id): Path<Uuid>,
) -> AppResult<Json<Vec<Warehouse>>> {
    let warehouses = state.warehouses.list_warehouses(inventory_id).await?;
    Ok(Json(warehouses))
}

/// Create a warehouse
pub async fn create_warehouse(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(inventory_id): Path<Uuid>,
    Json(input): Json<WarehouseRequest>,
) -> AppResult<(StatusCode, Json<Warehouse>)> {
    input.validate()?;
    let warehouse = state
        .warehouses
        .create_warehouse(inventory_id, input)
        .await?;
    tracing::debug!(user_id = %user.user_id, warehouse_id = %warehouse.id, "Warehouse created");
    Ok((StatusCode::CREATED, Json(warehouse)))
}

/// Get a warehouse with its current stock
pub async fn get_warehouse(
    State(state): State<AppState>,
    Path((inventory_id, warehouse_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<WarehouseWithStock>> {
    let warehouse = state
        .warehouses
        .get_warehouse_with_stock(inventory_id, warehouse_id)
        .await?;
    Ok(Json(warehouse))
}

/// Update warehouse metadata
pub async fn update_warehouse(
    State(state): State<AppState>,
    Path((inventory_id, warehouse_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<WarehouseRequest>,
) -> AppResult<Json<Warehouse>> {
    input.validate()?;
    let warehouse = state
        .warehouses
        .update_warehouse(inventory_id, warehouse_id, input)
        .await?;
    Ok(Json(warehouse))
}

/// Delete a warehouse and release its stock
pub async fn delete_warehouse(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((inventory_id, warehouse_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    state
        .warehouses
        .delete_warehouse(inventory_id, warehouse_id)
        .await?;
    tracing::debug!(user_id = %user.user_id, "Warehouse {} deleted", warehouse_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Where a product is stocked
pub async fn get_product_storages(
    State(state): State<AppState>,
    Path((inventory_id, product_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ProductStorages>> {
    let storages = state
        .warehouses
        .get_product_storages(inventory_id, product_id)
        .await?;
    Ok(Json(storages))
}
