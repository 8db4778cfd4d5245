//! Warehouse management service
//!
//! Warehouse metadata reads go through the cache; a warehouse's stock join
//! is always read live.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use shared::{ProductStorages, Warehouse, WarehouseRequest, WarehouseWithStock};
use uuid::Uuid;

use super::ledger::{lock_products, require_warehouse};
use crate::cache::{self, keys, CacheClient};
use crate::error::{AppError, AppResult};
use crate::store::{settle, RowLock, StockStore, StockTransaction};

/// Warehouse service for CRUD and read composition
#[derive(Clone)]
pub struct WarehouseService {
    store: Arc<dyn StockStore>,
    cache: Arc<dyn CacheClient>,
    ttl: Duration,
}

impl WarehouseService {
    pub fn new(store: Arc<dyn StockStore>, cache: Arc<dyn CacheClient>, ttl: Duration) -> Self {
        Self { store, cache, ttl }
    }

    /// List warehouses of an inventory, newest first
    pub async fn list_warehouses(&self, inventory_id: Uuid) -> AppResult<Vec<Warehouse>> {
        let key = keys::warehouse_list(inventory_id);
        if let Some(cached) = cache::get_json::<Vec<Warehouse>>(self.cache.as_ref(), &key).await {
            return Ok(cached);
        }

        let warehouses = self.store.list_warehouses(inventory_id).await?;
        cache::set_json(self.cache.as_ref(), &key, &warehouses, self.ttl).await;
        Ok(warehouses)
    }

    /// Get warehouse metadata by ID
    pub async fn get_warehouse(&self, inventory_id: Uuid, warehouse_id: Uuid) -> AppResult<Warehouse> {
        let key = keys::warehouse(warehouse_id);
        let warehouse = match cache::get_json::<Warehouse>(self.cache.as_ref(), &key).await {
            Some(cached) => cached,
            None => {
                let warehouse = self
                    .store
                    .find_warehouse(warehouse_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?;
                cache::set_json(self.cache.as_ref(), &key, &warehouse, self.ttl).await;
                warehouse
            }
        };

        // Hide warehouses of other inventories
        if warehouse.inventory_id != inventory_id {
            return Err(AppError::NotFound("Warehouse".to_string()));
        }

        Ok(warehouse)
    }

    /// Warehouse metadata plus its current stock, ordered by product name
    pub async fn get_warehouse_with_stock(
        &self,
        inventory_id: Uuid,
        warehouse_id: Uuid,
    ) -> AppResult<WarehouseWithStock> {
        let warehouse = self.get_warehouse(inventory_id, warehouse_id).await?;
        let stock_items = self.store.stock_items(warehouse_id).await?;

        Ok(WarehouseWithStock::new(warehouse, stock_items))
    }

    /// Every warehouse holding a product, with the quantity held in each
    pub async fn get_product_storages(
        &self,
        inventory_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<ProductStorages> {
        let product = self
            .store
            .find_product(product_id)
            .await?
            .filter(|p| p.inventory_id == inventory_id)
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let storages = self.store.product_storages(product_id).await?;

        Ok(ProductStorages { product, storages })
    }

    /// Create a warehouse
    pub async fn create_warehouse(
        &self,
        inventory_id: Uuid,
        request: WarehouseRequest,
    ) -> AppResult<Warehouse> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("name", "Warehouse name is required"));
        }

        if self
            .store
            .warehouse_name_taken(inventory_id, &name, None)
            .await?
        {
            return Err(AppError::validation("name", "Warehouse name already exists"));
        }

        let now = Utc::now();
        let warehouse = Warehouse {
            id: Uuid::new_v4(),
            name,
            location: request.location.trim().to_string(),
            capacity: request.capacity,
            storage_type: request.storage_type_or_default().to_string(),
            is_main: request.is_main,
            manager: request.manager.trim().to_string(),
            phone: request.phone.trim().to_string(),
            email: request.email.unwrap_or_default(),
            inventory_id,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_warehouse(&warehouse).await?;
        cache::invalidate(
            self.cache.as_ref(),
            &[keys::warehouse_list(inventory_id)],
        )
        .await;

        tracing::info!(warehouse_id = %warehouse.id, "Created warehouse {}", warehouse.name);
        Ok(warehouse)
    }

    /// Update warehouse metadata
    pub async fn update_warehouse(
        &self,
        inventory_id: Uuid,
        warehouse_id: Uuid,
        request: WarehouseRequest,
    ) -> AppResult<Warehouse> {
        let existing = self
            .store
            .find_warehouse(warehouse_id)
            .await?
            .filter(|w| w.inventory_id == inventory_id)
            .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?;

        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("name", "Warehouse name is required"));
        }

        if name != existing.name
            && self
                .store
                .warehouse_name_taken(inventory_id, &name, Some(warehouse_id))
                .await?
        {
            return Err(AppError::validation("name", "Warehouse name already exists"));
        }

        let warehouse = Warehouse {
            name,
            location: request.location.trim().to_string(),
            capacity: request.capacity,
            storage_type: request.storage_type_or_default().to_string(),
            is_main: request.is_main,
            manager: request.manager.trim().to_string(),
            phone: request.phone.trim().to_string(),
            email: request.email.unwrap_or_default(),
            updated_at: Utc::now(),
            ..existing
        };

        self.store.update_warehouse(&warehouse).await?;
        cache::invalidate(
            self.cache.as_ref(),
            &[
                keys::warehouse(warehouse_id),
                keys::warehouse_list(inventory_id),
            ],
        )
        .await;

        tracing::info!(warehouse_id = %warehouse_id, "Updated warehouse");
        Ok(warehouse)
    }

    /// Delete a warehouse, taking its stock out of every product's total
    pub async fn delete_warehouse(&self, inventory_id: Uuid, warehouse_id: Uuid) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        let applied = remove_warehouse(tx.as_mut(), inventory_id, warehouse_id).await;
        let touched_products = match settle(tx, applied).await {
            Ok(products) => products,
            Err(e) => {
                if !e.is_validation() && !matches!(e, AppError::NotFound(_)) {
                    tracing::error!(warehouse_id = %warehouse_id, error = %e, "Failed to delete warehouse");
                }
                return Err(e);
            }
        };

        let mut touched = vec![
            keys::warehouse(warehouse_id),
            keys::warehouse_list(inventory_id),
            keys::product_list(inventory_id),
        ];
        touched.extend(touched_products.into_iter().map(keys::product));
        cache::invalidate(self.cache.as_ref(), &touched).await;

        tracing::info!(warehouse_id = %warehouse_id, "Deleted warehouse");
        Ok(())
    }
}

/// Returns the products whose stock was released
async fn remove_warehouse(
    tx: &mut dyn StockTransaction,
    inventory_id: Uuid,
    warehouse_id: Uuid,
) -> AppResult<Vec<Uuid>> {
    require_warehouse(tx, warehouse_id, inventory_id, RowLock::Exclusive).await?;
    // The exclusive warehouse lock already keeps ledger writers out of these rows
    let links = tx.lock_warehouse_links(warehouse_id).await?;
    lock_products(tx, inventory_id, links.iter().map(|l| l.product_id)).await?;

    for link in &links {
        tx.adjust_total_stock(link.product_id, -link.quantity)
            .await?;
    }
    tx.delete_warehouse(warehouse_id).await?;

    Ok(links.into_iter().map(|l| l.product_id).collect())
}
