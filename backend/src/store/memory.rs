//! In-process stock store
//!
//! Backs the test suites and local runs without PostgreSQL. A transaction
//! holds the state lock for its whole lifetime and works on a private copy,
//! so transactions are fully serialised and a rollback is simply dropping
//! the copy.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use shared::{
    LinkWrite, Product, ProductStock, StockItem, Storage, Warehouse, WarehouseProductLink,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{RowLock, StockStore, StockTransaction, WarehouseRef};
use crate::error::{AppError, AppResult};

/// Transactional step that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    AddToLink,
    WriteLink,
    AdjustTotalStock,
    RaiseTotalQuantity,
    DeleteWarehouse,
    Commit,
}

#[derive(Debug, Clone, Default)]
struct LedgerState {
    warehouses: HashMap<Uuid, Warehouse>,
    products: HashMap<Uuid, Product>,
    links: BTreeMap<(Uuid, Uuid), i32>,
}

impl LedgerState {
    fn name_taken(&self, inventory_id: Uuid, name: &str, excluding: Option<Uuid>) -> bool {
        self.warehouses.values().any(|w| {
            w.inventory_id == inventory_id && w.name == name && Some(w.id) != excluding
        })
    }

    fn product_mut(&mut self, product_id: Uuid) -> AppResult<&mut Product> {
        self.products
            .get_mut(&product_id)
            .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }
}

#[derive(Clone, Default)]
pub struct MemoryStockStore {
    state: Arc<Mutex<LedgerState>>,
    fail_point: Arc<std::sync::Mutex<Option<FailPoint>>>,
    commit_delay: Arc<std::sync::Mutex<Option<Duration>>>,
}

impl MemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the given step fail in every later transaction, or clear it
    pub fn inject_failure(&self, point: Option<FailPoint>) {
        if let Ok(mut guard) = self.fail_point.lock() {
            *guard = point;
        }
    }

    /// Stall every later commit for `delay` before publishing, or clear it
    pub fn delay_commit(&self, delay: Option<Duration>) {
        if let Ok(mut guard) = self.commit_delay.lock() {
            *guard = delay;
        }
    }

    pub async fn seed_warehouse(&self, warehouse: Warehouse) {
        self.state
            .lock()
            .await
            .warehouses
            .insert(warehouse.id, warehouse);
    }

    pub async fn seed_product(&self, product: Product) {
        self.state.lock().await.products.insert(product.id, product);
    }

    /// Place stock directly, keeping the product's total stock in step
    pub async fn seed_link(&self, warehouse_id: Uuid, product_id: Uuid, quantity: i32) {
        let mut state = self.state.lock().await;
        *state.links.entry((warehouse_id, product_id)).or_insert(0) += quantity;
        if let Some(product) = state.products.get_mut(&product_id) {
            product.total_stock += quantity;
        }
    }

    pub async fn link_quantity(&self, warehouse_id: Uuid, product_id: Uuid) -> Option<i32> {
        self.state
            .lock()
            .await
            .links
            .get(&(warehouse_id, product_id))
            .copied()
    }

    pub async fn product(&self, product_id: Uuid) -> Option<Product> {
        self.state.lock().await.products.get(&product_id).cloned()
    }

    pub async fn warehouse(&self, warehouse_id: Uuid) -> Option<Warehouse> {
        self.state.lock().await.warehouses.get(&warehouse_id).cloned()
    }

    /// Every link row of a product
    pub async fn links_for_product(&self, product_id: Uuid) -> Vec<WarehouseProductLink> {
        self.state
            .lock()
            .await
            .links
            .iter()
            .filter(|((_, p), _)| *p == product_id)
            .map(|(&(warehouse_id, product_id), &quantity)| WarehouseProductLink {
                product_id,
                warehouse_id,
                quantity,
            })
            .collect()
    }
}

#[async_trait]
impl StockStore for MemoryStockStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn begin(&self) -> AppResult<Box<dyn StockTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        let working = (*guard).clone();
        Ok(Box::new(MemoryTransaction {
            guard,
            working,
            fail_point: self.fail_point.clone(),
            commit_delay: self.commit_delay.clone(),
        }))
    }

    async fn list_warehouses(&self, inventory_id: Uuid) -> AppResult<Vec<Warehouse>> {
        let state = self.state.lock().await;
        let mut warehouses: Vec<Warehouse> = state
            .warehouses
            .values()
            .filter(|w| w.inventory_id == inventory_id)
            .cloned()
            .collect();
        warehouses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(warehouses)
    }

    async fn find_warehouse(&self, warehouse_id: Uuid) -> AppResult<Option<Warehouse>> {
        Ok(self.state.lock().await.warehouses.get(&warehouse_id).cloned())
    }

    async fn stock_items(&self, warehouse_id: Uuid) -> AppResult<Vec<StockItem>> {
        let state = self.state.lock().await;
        let mut items: Vec<StockItem> = state
            .links
            .iter()
            .filter(|((w, _), _)| *w == warehouse_id)
            .filter_map(|((_, product_id), &quantity)| {
                state.products.get(product_id).map(|product| StockItem {
                    product: product.clone(),
                    quantity_in_stock: quantity,
                })
            })
            .collect();
        items.sort_by(|a, b| a.product.name.cmp(&b.product.name));
        Ok(items)
    }

    async fn find_product(&self, product_id: Uuid) -> AppResult<Option<Product>> {
        Ok(self.state.lock().await.products.get(&product_id).cloned())
    }

    async fn product_storages(&self, product_id: Uuid) -> AppResult<Vec<Storage>> {
        let state = self.state.lock().await;
        let mut storages: Vec<Storage> = state
            .links
            .iter()
            .filter(|((_, p), _)| *p == product_id)
            .filter_map(|((warehouse_id, _), &quantity)| {
                state.warehouses.get(warehouse_id).map(|warehouse| Storage {
                    warehouse: warehouse.clone(),
                    stock_quantity: quantity,
                })
            })
            .collect();
        storages.sort_by(|a, b| a.warehouse.name.cmp(&b.warehouse.name));
        Ok(storages)
    }

    async fn warehouse_name_taken(
        &self,
        inventory_id: Uuid,
        name: &str,
        excluding: Option<Uuid>,
    ) -> AppResult<bool> {
        Ok(self
            .state
            .lock()
            .await
            .name_taken(inventory_id, name, excluding))
    }

    async fn insert_warehouse(&self, warehouse: &Warehouse) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.name_taken(warehouse.inventory_id, &warehouse.name, None) {
            return Err(AppError::DuplicateEntry("name".to_string()));
        }
        state.warehouses.insert(warehouse.id, warehouse.clone());
        Ok(())
    }

    async fn update_warehouse(&self, warehouse: &Warehouse) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.name_taken(warehouse.inventory_id, &warehouse.name, Some(warehouse.id)) {
            return Err(AppError::DuplicateEntry("name".to_string()));
        }
        match state.warehouses.get_mut(&warehouse.id) {
            Some(existing) => {
                *existing = warehouse.clone();
                Ok(())
            }
            None => Err(AppError::NotFound("Warehouse".to_string())),
        }
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<LedgerState>,
    working: LedgerState,
    fail_point: Arc<std::sync::Mutex<Option<FailPoint>>>,
    commit_delay: Arc<std::sync::Mutex<Option<Duration>>>,
}

impl MemoryTransaction {
    fn check(&self, point: FailPoint) -> AppResult<()> {
        let armed = self
            .fail_point
            .lock()
            .map(|guard| *guard == Some(point))
            .unwrap_or(false);
        if armed {
            return Err(AppError::Store(format!("injected failure at {:?}", point)));
        }
        Ok(())
    }
}

#[async_trait]
impl StockTransaction for MemoryTransaction {
    async fn lock_warehouse(
        &mut self,
        warehouse_id: Uuid,
        _lock: RowLock,
    ) -> AppResult<Option<WarehouseRef>> {
        Ok(self
            .working
            .warehouses
            .get(&warehouse_id)
            .map(|w| WarehouseRef {
                id: w.id,
                inventory_id: w.inventory_id,
            }))
    }

    async fn lock_product(&mut self, product_id: Uuid) -> AppResult<Option<ProductStock>> {
        Ok(self.working.products.get(&product_id).map(ProductStock::from))
    }

    async fn lock_link(&mut self, warehouse_id: Uuid, product_id: Uuid) -> AppResult<Option<i32>> {
        Ok(self.working.links.get(&(warehouse_id, product_id)).copied())
    }

    async fn lock_warehouse_links(
        &mut self,
        warehouse_id: Uuid,
    ) -> AppResult<Vec<WarehouseProductLink>> {
        Ok(self
            .working
            .links
            .iter()
            .filter(|((w, _), _)| *w == warehouse_id)
            .map(|(&(warehouse_id, product_id), &quantity)| WarehouseProductLink {
                product_id,
                warehouse_id,
                quantity,
            })
            .collect())
    }

    async fn add_to_link(
        &mut self,
        warehouse_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<i32> {
        self.check(FailPoint::AddToLink)?;
        let entry = self
            .working
            .links
            .entry((warehouse_id, product_id))
            .or_insert(0);
        *entry = entry
            .checked_add(quantity)
            .ok_or_else(|| AppError::validation("quantity", "Stock quantity is too large"))?;
        Ok(*entry)
    }

    async fn write_link(
        &mut self,
        warehouse_id: Uuid,
        product_id: Uuid,
        write: LinkWrite,
    ) -> AppResult<()> {
        self.check(FailPoint::WriteLink)?;
        let key = (warehouse_id, product_id);
        match write {
            LinkWrite::Unchanged => {}
            LinkWrite::Insert(quantity) => {
                if self.working.links.contains_key(&key) {
                    return Err(AppError::DuplicateEntry(
                        "warehouse_product_link_pkey".to_string(),
                    ));
                }
                self.working.links.insert(key, quantity);
            }
            LinkWrite::Update(quantity) => {
                if let Some(existing) = self.working.links.get_mut(&key) {
                    *existing = quantity;
                }
            }
            LinkWrite::Delete => {
                self.working.links.remove(&key);
            }
        }
        Ok(())
    }

    async fn adjust_total_stock(&mut self, product_id: Uuid, delta: i32) -> AppResult<()> {
        self.check(FailPoint::AdjustTotalStock)?;
        let product = self.working.product_mut(product_id)?;
        let total = product.total_stock.checked_add(delta).unwrap_or(-1);
        if total < 0 {
            return Err(AppError::ValidationError(
                "Value violates a stock constraint".to_string(),
            ));
        }
        product.total_stock = total;
        product.updated_at = Utc::now();
        Ok(())
    }

    async fn raise_total_quantity(&mut self, product_id: Uuid, ceiling: i32) -> AppResult<()> {
        self.check(FailPoint::RaiseTotalQuantity)?;
        let product = self.working.product_mut(product_id)?;
        product.total_quantity = product.total_quantity.max(ceiling);
        product.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_warehouse(&mut self, warehouse_id: Uuid) -> AppResult<()> {
        self.check(FailPoint::DeleteWarehouse)?;
        self.working.links.retain(|(w, _), _| *w != warehouse_id);
        self.working.warehouses.remove(&warehouse_id);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.check(FailPoint::Commit)?;
        let delay = self.commit_delay.lock().ok().and_then(|guard| *guard);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let MemoryTransaction {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}
