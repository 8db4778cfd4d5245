//! Persistence seam for the stock ledger
//!
//! [`StockStore`] exposes the plain read paths and opens transactions;
//! [`StockTransaction`] carries the locked reads and writes a ledger
//! mutation is made of. A transaction that is neither committed nor rolled
//! back is rolled back when dropped.
//!
//! Lock order inside every transaction: warehouses (ascending id), then
//! products (ascending id), then link rows. Product rows are the
//! serialisation point for a product's link rows and aggregate stock.

mod memory;
mod postgres;

use async_trait::async_trait;
use shared::{
    LinkWrite, Product, ProductStock, StockItem, Storage, Warehouse, WarehouseProductLink,
};
use uuid::Uuid;

use crate::error::AppResult;

pub use memory::{FailPoint, MemoryStockStore};
pub use postgres::PgStockStore;

/// Strength of a warehouse row lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLock {
    /// Held by stock mutations; blocks deletion only
    Share,
    /// Held while deleting the warehouse
    Exclusive,
}

/// Ownership columns of a warehouse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarehouseRef {
    pub id: Uuid,
    pub inventory_id: Uuid,
}

#[async_trait]
pub trait StockStore: Send + Sync {
    /// Connectivity check for health endpoints
    async fn ping(&self) -> AppResult<()>;

    /// Open a transaction
    async fn begin(&self) -> AppResult<Box<dyn StockTransaction>>;

    /// Warehouses of an inventory, newest first
    async fn list_warehouses(&self, inventory_id: Uuid) -> AppResult<Vec<Warehouse>>;

    async fn find_warehouse(&self, warehouse_id: Uuid) -> AppResult<Option<Warehouse>>;

    /// Products held by a warehouse with their quantities, by product name
    async fn stock_items(&self, warehouse_id: Uuid) -> AppResult<Vec<StockItem>>;

    async fn find_product(&self, product_id: Uuid) -> AppResult<Option<Product>>;

    /// Warehouses holding a product with their quantities, by warehouse name
    async fn product_storages(&self, product_id: Uuid) -> AppResult<Vec<Storage>>;

    /// Whether another warehouse of the inventory already uses `name`
    async fn warehouse_name_taken(
        &self,
        inventory_id: Uuid,
        name: &str,
        excluding: Option<Uuid>,
    ) -> AppResult<bool>;

    async fn insert_warehouse(&self, warehouse: &Warehouse) -> AppResult<()>;

    async fn update_warehouse(&self, warehouse: &Warehouse) -> AppResult<()>;
}

#[async_trait]
pub trait StockTransaction: Send {
    async fn lock_warehouse(
        &mut self,
        warehouse_id: Uuid,
        lock: RowLock,
    ) -> AppResult<Option<WarehouseRef>>;

    async fn lock_product(&mut self, product_id: Uuid) -> AppResult<Option<ProductStock>>;

    /// Locked quantity of a link row, `None` when the row is absent
    async fn lock_link(&mut self, warehouse_id: Uuid, product_id: Uuid) -> AppResult<Option<i32>>;

    /// Every link row of a warehouse, locked
    async fn lock_warehouse_links(
        &mut self,
        warehouse_id: Uuid,
    ) -> AppResult<Vec<WarehouseProductLink>>;

    /// Upsert a link row, adding `quantity` to any existing value.
    /// Returns the resulting quantity.
    async fn add_to_link(
        &mut self,
        warehouse_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<i32>;

    async fn write_link(
        &mut self,
        warehouse_id: Uuid,
        product_id: Uuid,
        write: LinkWrite,
    ) -> AppResult<()>;

    /// `total_stock += delta`
    async fn adjust_total_stock(&mut self, product_id: Uuid, delta: i32) -> AppResult<()>;

    /// Raise `total_quantity` to `ceiling` if it is lower
    async fn raise_total_quantity(&mut self, product_id: Uuid, ceiling: i32) -> AppResult<()>;

    /// Delete a warehouse and its remaining link rows
    async fn delete_warehouse(&mut self, warehouse_id: Uuid) -> AppResult<()>;

    async fn commit(self: Box<Self>) -> AppResult<()>;

    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// Commit on success, roll back on failure, and hand back the outcome
pub async fn settle<T>(tx: Box<dyn StockTransaction>, outcome: AppResult<T>) -> AppResult<T> {
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}
