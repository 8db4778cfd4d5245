//! Warehouse stock ledger
//!
//! Every mutation runs in one store transaction: warehouses are locked
//! first, then the touched products in ascending id order, then the link
//! rows. Nothing is written until the warehouse and every product have
//! passed their ownership checks, and any failure rolls the whole batch
//! back. Cache keys are invalidated only after the commit.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;

use shared::{
    ceiling_headroom, link_write_after_withdrawal, plan_quantity_update, plan_withdrawal,
    validate_new_quantity, validate_removal_quantity, validate_stock_items, validate_transfer,
    LinkWrite, ProductStock, StockItemRequest, TransferItemRequest,
};
use uuid::Uuid;

use crate::cache::{self, keys, CacheClient};
use crate::config::LedgerConfig;
use crate::error::{AppError, AppResult};
use crate::store::{settle, RowLock, StockStore, StockTransaction, WarehouseRef};

/// Stock ledger service
#[derive(Clone)]
pub struct StockLedger {
    store: Arc<dyn StockStore>,
    cache: Arc<dyn CacheClient>,
    policy: LedgerConfig,
}

impl StockLedger {
    pub fn new(store: Arc<dyn StockStore>, cache: Arc<dyn CacheClient>, policy: LedgerConfig) -> Self {
        Self {
            store,
            cache,
            policy,
        }
    }

    /// Place stock into a warehouse, adding to whatever is already there
    #[tracing::instrument(name = "add_stock", skip(self, items), fields(items = items.len()))]
    pub async fn add_stock(
        &self,
        warehouse_id: Uuid,
        inventory_id: Uuid,
        items: &[StockItemRequest],
    ) -> AppResult<()> {
        validate_stock_items(items).map_err(|msg| AppError::validation("stockItems", msg))?;

        let result = self
            .within_deadline("add_stock", async {
                let mut tx = self.store.begin().await?;
                let applied = self
                    .apply_add_stock(tx.as_mut(), warehouse_id, inventory_id, items)
                    .await;
                Ok::<_, AppError>((tx, applied))
            })
            .await;

        if let Err(e) = &result {
            log_failure("add_stock", e);
        }
        result?;

        let mut touched = vec![
            keys::warehouse(warehouse_id),
            keys::warehouse_list(inventory_id),
            keys::product_list(inventory_id),
        ];
        touched.extend(unique_ids(items.iter().map(|i| i.product_id)).map(keys::product));
        cache::invalidate(self.cache.as_ref(), &touched).await;

        tracing::info!("Added stock for {} item(s)", items.len());
        Ok(())
    }

    /// Take a product out of a warehouse entirely. Absent stock is a no-op.
    #[tracing::instrument(name = "remove_stock", skip(self))]
    pub async fn remove_stock(
        &self,
        inventory_id: Uuid,
        warehouse_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<()> {
        let result = self
            .within_deadline("remove_stock", async {
                let mut tx = self.store.begin().await?;
                let applied = apply_remove_stock(
                    tx.as_mut(),
                    inventory_id,
                    warehouse_id,
                    product_id,
                )
                .await;
                Ok::<_, AppError>((tx, applied))
            })
            .await;

        let removed = match result {
            Ok(removed) => removed,
            Err(e) => {
                log_failure("remove_stock", &e);
                return Err(e);
            }
        };

        if removed == 0 {
            tracing::debug!("Nothing to remove");
            return Ok(());
        }

        self.invalidate_single(inventory_id, warehouse_id, product_id)
            .await;
        tracing::info!(removed, "Removed stock");
        Ok(())
    }

    /// Take `quantity` units of a product out of a warehouse
    #[tracing::instrument(name = "remove_stock_quantity", skip(self))]
    pub async fn remove_stock_quantity(
        &self,
        inventory_id: Uuid,
        warehouse_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<()> {
        validate_removal_quantity(quantity).map_err(|msg| AppError::validation("quantity", msg))?;

        let result = self
            .within_deadline("remove_stock_quantity", async {
                let mut tx = self.store.begin().await?;
                let applied = apply_remove_quantity(
                    tx.as_mut(),
                    inventory_id,
                    warehouse_id,
                    product_id,
                    quantity,
                )
                .await;
                Ok::<_, AppError>((tx, applied))
            })
            .await;

        if let Err(e) = &result {
            log_failure("remove_stock_quantity", e);
        }
        result?;

        self.invalidate_single(inventory_id, warehouse_id, product_id)
            .await;
        tracing::info!("Removed {} unit(s)", quantity);
        Ok(())
    }

    /// Set a warehouse's quantity of a product to an absolute value.
    /// Raises the product's ceiling when the new quantity exceeds it.
    #[tracing::instrument(name = "update_stock_quantity", skip(self))]
    pub async fn update_stock_quantity(
        &self,
        inventory_id: Uuid,
        warehouse_id: Uuid,
        product_id: Uuid,
        new_quantity: i32,
    ) -> AppResult<()> {
        validate_new_quantity(new_quantity)
            .map_err(|msg| AppError::validation("newQuantity", msg))?;

        let result = self
            .within_deadline("update_stock_quantity", async {
                let mut tx = self.store.begin().await?;
                let applied = apply_update_quantity(
                    tx.as_mut(),
                    inventory_id,
                    warehouse_id,
                    product_id,
                    new_quantity,
                )
                .await;
                Ok::<_, AppError>((tx, applied))
            })
            .await;

        if let Err(e) = &result {
            log_failure("update_stock_quantity", e);
        }
        result?;

        self.invalidate_single(inventory_id, warehouse_id, product_id)
            .await;
        tracing::info!("Stock quantity set to {}", new_quantity);
        Ok(())
    }

    /// Move stock between two warehouses of one inventory. Aggregate stock
    /// is untouched; a shortfall on any item rejects the whole batch.
    #[tracing::instrument(name = "transfer_stock", skip(self, items), fields(items = items.len()))]
    pub async fn transfer_stock(
        &self,
        inventory_id: Uuid,
        from_warehouse_id: Uuid,
        to_warehouse_id: Uuid,
        items: &[TransferItemRequest],
    ) -> AppResult<()> {
        validate_transfer(from_warehouse_id, to_warehouse_id, items)
            .map_err(|msg| AppError::validation("transferItems", msg))?;

        let result = self
            .within_deadline("transfer_stock", async {
                let mut tx = self.store.begin().await?;
                let applied = apply_transfer(
                    tx.as_mut(),
                    inventory_id,
                    from_warehouse_id,
                    to_warehouse_id,
                    items,
                )
                .await;
                Ok::<_, AppError>((tx, applied))
            })
            .await;

        if let Err(e) = &result {
            log_failure("transfer_stock", e);
        }
        result?;

        let mut touched = vec![
            keys::warehouse(from_warehouse_id),
            keys::warehouse(to_warehouse_id),
            keys::warehouse_list(inventory_id),
            keys::product_list(inventory_id),
        ];
        touched.extend(unique_ids(items.iter().map(|i| i.product_id)).map(keys::product));
        cache::invalidate(self.cache.as_ref(), &touched).await;

        tracing::info!("Transferred {} item(s)", items.len());
        Ok(())
    }

    async fn apply_add_stock(
        &self,
        tx: &mut dyn StockTransaction,
        warehouse_id: Uuid,
        inventory_id: Uuid,
        items: &[StockItemRequest],
    ) -> AppResult<()> {
        require_warehouse(tx, warehouse_id, inventory_id, RowLock::Share).await?;
        let mut products =
            lock_products(tx, inventory_id, items.iter().map(|i| i.product_id)).await?;

        for item in items {
            let product = products
                .get_mut(&item.product_id)
                .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

            let total_stock = product
                .total_stock
                .checked_add(item.quantity)
                .ok_or_else(|| AppError::validation("quantity", "Stock quantity is too large"))?;

            if self.policy.enforce_ceiling_on_add && total_stock > product.total_quantity {
                return Err(AppError::ValidationError(format!(
                    "Cannot add {} units of \"{}\". Only {} units available",
                    item.quantity,
                    product.name,
                    ceiling_headroom(product.total_quantity, product.total_stock)
                )));
            }

            tx.add_to_link(warehouse_id, item.product_id, item.quantity)
                .await?;
            tx.adjust_total_stock(item.product_id, item.quantity)
                .await?;
            product.total_stock = total_stock;
        }

        Ok(())
    }

    /// Run `begin` plus the staged writes under the operation deadline.
    /// The commit runs after it, so a sent COMMIT is never cut off.
    async fn within_deadline<T, F>(&self, operation: &'static str, work: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<(Box<dyn StockTransaction>, AppResult<T>)>>,
    {
        let limit = self.policy.operation_timeout();
        // Dropping the unfinished future drops its transaction, which rolls back
        let (tx, applied) = tokio::time::timeout(limit, work).await.map_err(|_| {
            AppError::Timeout(format!("{} did not finish within {:?}", operation, limit))
        })??;
        settle(tx, applied).await
    }

    async fn invalidate_single(&self, inventory_id: Uuid, warehouse_id: Uuid, product_id: Uuid) {
        let touched = [
            keys::warehouse(warehouse_id),
            keys::warehouse_list(inventory_id),
            keys::product(product_id),
            keys::product_list(inventory_id),
        ];
        cache::invalidate(self.cache.as_ref(), &touched).await;
    }
}

async fn apply_remove_stock(
    tx: &mut dyn StockTransaction,
    inventory_id: Uuid,
    warehouse_id: Uuid,
    product_id: Uuid,
) -> AppResult<i32> {
    require_warehouse(tx, warehouse_id, inventory_id, RowLock::Share).await?;

    let Some(product) = tx.lock_product(product_id).await? else {
        return Ok(0);
    };
    ensure_product_in_inventory(&product, inventory_id)?;

    let present = tx.lock_link(warehouse_id, product_id).await?.unwrap_or(0);
    if present == 0 {
        return Ok(0);
    }

    tx.write_link(warehouse_id, product_id, LinkWrite::Delete)
        .await?;
    tx.adjust_total_stock(product_id, -present).await?;

    Ok(present)
}

async fn apply_remove_quantity(
    tx: &mut dyn StockTransaction,
    inventory_id: Uuid,
    warehouse_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<()> {
    require_warehouse(tx, warehouse_id, inventory_id, RowLock::Share).await?;
    require_product(tx, product_id, inventory_id).await?;

    let available = tx.lock_link(warehouse_id, product_id).await?.unwrap_or(0);
    let remaining = plan_withdrawal(product_id, available, quantity)?;

    tx.write_link(
        warehouse_id,
        product_id,
        link_write_after_withdrawal(remaining),
    )
    .await?;
    tx.adjust_total_stock(product_id, -quantity).await?;

    Ok(())
}

async fn apply_update_quantity(
    tx: &mut dyn StockTransaction,
    inventory_id: Uuid,
    warehouse_id: Uuid,
    product_id: Uuid,
    new_quantity: i32,
) -> AppResult<()> {
    require_warehouse(tx, warehouse_id, inventory_id, RowLock::Share).await?;
    let product = require_product(tx, product_id, inventory_id).await?;

    let current = tx.lock_link(warehouse_id, product_id).await?;
    let plan = plan_quantity_update(current, new_quantity, product.total_quantity);
    product
        .total_stock
        .checked_add(plan.delta)
        .ok_or_else(|| AppError::validation("newQuantity", "Stock quantity is too large"))?;

    if let Some(ceiling) = plan.raised_ceiling {
        tx.raise_total_quantity(product_id, ceiling).await?;
    }
    tx.write_link(warehouse_id, product_id, plan.link).await?;
    tx.adjust_total_stock(product_id, plan.delta).await?;

    Ok(())
}

async fn apply_transfer(
    tx: &mut dyn StockTransaction,
    inventory_id: Uuid,
    from_warehouse_id: Uuid,
    to_warehouse_id: Uuid,
    items: &[TransferItemRequest],
) -> AppResult<()> {
    for warehouse_id in unique_ids([from_warehouse_id, to_warehouse_id]) {
        require_warehouse(tx, warehouse_id, inventory_id, RowLock::Share).await?;
    }
    lock_products(tx, inventory_id, items.iter().map(|i| i.product_id)).await?;

    for item in items {
        // Re-read under lock so repeated products see the earlier lines
        let available = tx
            .lock_link(from_warehouse_id, item.product_id)
            .await?
            .unwrap_or(0);
        let remaining = plan_withdrawal(item.product_id, available, item.transfer_quantity)?;

        tx.write_link(
            from_warehouse_id,
            item.product_id,
            link_write_after_withdrawal(remaining),
        )
        .await?;
        tx.add_to_link(to_warehouse_id, item.product_id, item.transfer_quantity)
            .await?;
    }

    Ok(())
}

/// Lock a warehouse and check it belongs to the inventory
pub(crate) async fn require_warehouse(
    tx: &mut dyn StockTransaction,
    warehouse_id: Uuid,
    inventory_id: Uuid,
    lock: RowLock,
) -> AppResult<WarehouseRef> {
    let warehouse = tx
        .lock_warehouse(warehouse_id, lock)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?;

    if warehouse.inventory_id != inventory_id {
        return Err(AppError::ValidationError(
            "Warehouse does not belong to specified inventory".to_string(),
        ));
    }

    Ok(warehouse)
}

/// Lock a product and check it belongs to the inventory
pub(crate) async fn require_product(
    tx: &mut dyn StockTransaction,
    product_id: Uuid,
    inventory_id: Uuid,
) -> AppResult<ProductStock> {
    let product = tx
        .lock_product(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
    ensure_product_in_inventory(&product, inventory_id)?;
    Ok(product)
}

fn ensure_product_in_inventory(product: &ProductStock, inventory_id: Uuid) -> AppResult<()> {
    if product.inventory_id != inventory_id {
        return Err(AppError::ValidationError(
            "Product does not belong to specified inventory".to_string(),
        ));
    }
    Ok(())
}

/// Lock every distinct product in ascending id order
pub(crate) async fn lock_products(
    tx: &mut dyn StockTransaction,
    inventory_id: Uuid,
    product_ids: impl IntoIterator<Item = Uuid>,
) -> AppResult<HashMap<Uuid, ProductStock>> {
    let mut locked = HashMap::new();
    for product_id in unique_ids(product_ids) {
        let product = require_product(tx, product_id, inventory_id).await?;
        locked.insert(product_id, product);
    }
    Ok(locked)
}

fn unique_ids(ids: impl IntoIterator<Item = Uuid>) -> impl Iterator<Item = Uuid> {
    ids.into_iter().collect::<BTreeSet<_>>().into_iter()
}

fn log_failure(operation: &str, err: &AppError) {
    match err {
        e if e.is_validation() => tracing::debug!(operation, error = %e, "Ledger request rejected"),
        AppError::NotFound(_) => tracing::debug!(operation, error = %err, "Ledger request rejected"),
        AppError::Concurrency(_) => {
            tracing::warn!(operation, error = %err, "Ledger transaction conflicted")
        }
        _ => tracing::error!(operation, error = %err, "Ledger transaction failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_ids_sorted_and_deduplicated() {
        let a = Uuid::from_u128(3);
        let b = Uuid::from_u128(1);
        let ids: Vec<Uuid> = unique_ids([a, b, a]).collect();
        assert_eq!(ids, vec![b, a]);
    }
}
