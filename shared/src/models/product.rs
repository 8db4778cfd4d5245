//! Product models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A product belonging to one inventory
///
/// `total_stock` is derived: it always equals the sum of the product's
/// warehouse link quantities and is only written by the stock ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub sku: String,
    pub brand: String,
    pub model: String,
    pub description: String,
    /// Purchased/intended quantity ceiling
    pub total_quantity: i32,
    /// Quantity placed into warehouses
    pub total_stock: i32,
    pub restock_level: i32,
    pub optimal_level: i32,
    /// Minor currency units
    pub cost_price: i64,
    /// Minor currency units
    pub selling_price: i64,
    pub inventory_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stock-relevant columns of a product, as read under lock by the ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProductStock {
    pub id: Uuid,
    pub name: String,
    pub inventory_id: Uuid,
    pub total_quantity: i32,
    pub total_stock: i32,
}

impl From<&Product> for ProductStock {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            inventory_id: product.inventory_id,
            total_quantity: product.total_quantity,
            total_stock: product.total_stock,
        }
    }
}
