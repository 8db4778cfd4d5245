//! Warehouse models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::Product;

/// Storage type applied when a request leaves it blank
pub const DEFAULT_STORAGE_TYPE: &str = "units";

/// A warehouse belonging to one inventory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Warehouse {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    /// Advisory only, never enforced as a hard cap
    pub capacity: i32,
    pub storage_type: String,
    pub is_main: bool,
    pub manager: String,
    pub phone: String,
    pub email: String,
    pub inventory_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating or updating a warehouse
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 200))]
    #[serde(default)]
    pub location: String,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub capacity: i32,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub storage_type: String,
    #[serde(default)]
    pub is_main: bool,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub manager: String,
    #[serde(default)]
    pub phone: String,
    #[validate(email)]
    #[serde(default)]
    pub email: Option<String>,
}

impl WarehouseRequest {
    /// Storage type with the default applied for blank values
    pub fn storage_type_or_default(&self) -> &str {
        let trimmed = self.storage_type.trim();
        if trimmed.is_empty() {
            DEFAULT_STORAGE_TYPE
        } else {
            trimmed
        }
    }
}

/// A product together with how much of it one warehouse holds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StockItem {
    pub product: Product,
    pub quantity_in_stock: i32,
}

/// Warehouse detail view: metadata plus its live stock
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseWithStock {
    #[serde(flatten)]
    pub warehouse: Warehouse,
    pub stock_items: Vec<StockItem>,
    /// Units held across every product in the warehouse
    pub total_units: i64,
}

impl WarehouseWithStock {
    pub fn new(warehouse: Warehouse, stock_items: Vec<StockItem>) -> Self {
        let total_units = stock_items
            .iter()
            .map(|item| i64::from(item.quantity_in_stock))
            .sum();
        Self {
            warehouse,
            stock_items,
            total_units,
        }
    }
}

/// One warehouse holding a product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Storage {
    pub warehouse: Warehouse,
    pub stock_quantity: i32,
}

/// Per-product view of the ledger: where a product is stocked
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProductStorages {
    pub product: Product,
    pub storages: Vec<Storage>,
}
