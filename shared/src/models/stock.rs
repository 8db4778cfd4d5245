//! Warehouse stock ledger models and arithmetic

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

/// How much of a product sits in a warehouse
///
/// Rows never hold zero: a link that reaches zero is deleted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseProductLink {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: i32,
}

/// One line of an add-stock batch
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StockItemRequest {
    pub product_id: Uuid,
    #[serde(alias = "quantityInStock")]
    #[validate(range(min = 1))]
    pub quantity: i32,
}

/// Add-stock batch payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddStockRequest {
    #[validate(length(min = 1))]
    pub stock_items: Vec<StockItemRequest>,
}

/// One line of a transfer batch
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TransferItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub transfer_quantity: i32,
}

/// Transfer payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TransferStockRequest {
    pub from_warehouse_id: Uuid,
    pub to_warehouse_id: Uuid,
    #[validate(length(min = 1))]
    pub transfer_items: Vec<TransferItemRequest>,
}

/// Set-absolute-quantity payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStockQuantityRequest {
    #[validate(range(min = 0))]
    pub new_quantity: i32,
}

/// A withdrawal asked for more than the warehouse holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Insufficient stock for product {product_id}. Available: {available}, Requested: {requested}")]
pub struct StockShortfall {
    pub product_id: Uuid,
    pub available: i32,
    pub requested: i32,
}

/// Write to apply to a single link row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkWrite {
    /// Row stays as it is (or stays absent)
    Unchanged,
    Insert(i32),
    Update(i32),
    Delete,
}

/// Everything a set-absolute-quantity mutation has to write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantityUpdatePlan {
    /// Change applied to `product.total_stock`
    pub delta: i32,
    /// New ceiling when the requested quantity exceeds the current one
    pub raised_ceiling: Option<i32>,
    pub link: LinkWrite,
}

/// Plan setting a warehouse's quantity of a product to `new_quantity`.
///
/// `current` is the locked link quantity (`None` when no row exists).
/// The ceiling only ever moves upward.
pub fn plan_quantity_update(
    current: Option<i32>,
    new_quantity: i32,
    total_quantity: i32,
) -> QuantityUpdatePlan {
    let current_quantity = current.unwrap_or(0);
    let link = match (current_quantity, new_quantity) {
        (0, 0) => LinkWrite::Unchanged,
        (_, 0) => LinkWrite::Delete,
        (0, n) => LinkWrite::Insert(n),
        (c, n) if c == n => LinkWrite::Unchanged,
        (_, n) => LinkWrite::Update(n),
    };

    QuantityUpdatePlan {
        delta: new_quantity - current_quantity,
        raised_ceiling: (new_quantity > total_quantity).then_some(new_quantity),
        link,
    }
}

/// Check a withdrawal of `requested` units against `available` and
/// return what remains at the source.
pub fn plan_withdrawal(
    product_id: Uuid,
    available: i32,
    requested: i32,
) -> Result<i32, StockShortfall> {
    if available < requested {
        return Err(StockShortfall {
            product_id,
            available,
            requested,
        });
    }
    Ok(available - requested)
}

/// Link write for a row left with `remaining` units after a withdrawal
pub fn link_write_after_withdrawal(remaining: i32) -> LinkWrite {
    if remaining == 0 {
        LinkWrite::Delete
    } else {
        LinkWrite::Update(remaining)
    }
}

/// Units that can still be placed before `total_stock` reaches the ceiling
pub fn ceiling_headroom(total_quantity: i32, total_stock: i32) -> i32 {
    (total_quantity - total_stock).max(0)
}
