//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use inventory_ledger::cache::CacheClient;
use inventory_ledger::config::{
    CacheConfig, Config, DatabaseConfig, JwtConfig, LedgerConfig, ServerConfig,
};
use inventory_ledger::error::{AppError, AppResult};
use inventory_ledger::services::{StockLedger, WarehouseService};
use inventory_ledger::store::MemoryStockStore;
use shared::{Product, Warehouse};
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret";

/// Cache that remembers every key it was asked to delete
#[derive(Default)]
pub struct RecordingCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    deleted: Mutex<Vec<String>>,
    failing: Mutex<bool>,
}

impl RecordingCache {
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    /// Make every call fail from now on
    pub fn fail(&self) {
        *self.failing.lock().unwrap() = true;
    }

    fn check(&self) -> AppResult<()> {
        if *self.failing.lock().unwrap() {
            return Err(AppError::Cache("cache unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheClient for RecordingCache {
    async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        self.check()?;
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>, _ttl: Duration) -> AppResult<()> {
        self.check()?;
        self.entries.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.deleted.lock().unwrap().push(key.to_string());
        self.check()?;
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

pub fn product(inventory_id: Uuid, name: &str, total_quantity: i32) -> Product {
    let now = Utc::now();
    Product {
        id: Uuid::new_v4(),
        name: name.to_string(),
        code: name.to_uppercase(),
        sku: format!("SKU-{}", name),
        brand: String::new(),
        model: String::new(),
        description: String::new(),
        total_quantity,
        total_stock: 0,
        restock_level: 0,
        optimal_level: 0,
        cost_price: 100,
        selling_price: 150,
        inventory_id,
        created_at: now,
        updated_at: now,
    }
}

/// Warehouse created `age_secs` seconds after a fixed epoch
pub fn warehouse(inventory_id: Uuid, name: &str, age_secs: i64) -> Warehouse {
    let created_at = Utc
        .timestamp_opt(1_700_000_000 + age_secs, 0)
        .single()
        .unwrap();
    Warehouse {
        id: Uuid::new_v4(),
        name: name.to_string(),
        location: "Bangkok".to_string(),
        capacity: 1000,
        storage_type: "units".to_string(),
        is_main: false,
        manager: String::new(),
        phone: String::new(),
        email: String::new(),
        inventory_id,
        created_at,
        updated_at: created_at,
    }
}

/// One inventory with two warehouses and three products
pub struct Fixture {
    pub store: MemoryStockStore,
    pub cache: Arc<RecordingCache>,
    pub ledger: StockLedger,
    pub warehouses: WarehouseService,
    pub inventory_id: Uuid,
    pub w1: Warehouse,
    pub w2: Warehouse,
    pub p1: Product,
    pub p2: Product,
    pub p3: Product,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_policy(LedgerConfig::default()).await
    }

    pub async fn with_policy(policy: LedgerConfig) -> Self {
        let store = MemoryStockStore::new();
        let cache = Arc::new(RecordingCache::default());
        let inventory_id = Uuid::new_v4();

        let w1 = warehouse(inventory_id, "Main", 0);
        let w2 = warehouse(inventory_id, "Overflow", 10);
        let p1 = product(inventory_id, "arabica", 20);
        let p2 = product(inventory_id, "robusta", 100);
        let p3 = product(inventory_id, "liberica", 100);

        for w in [&w1, &w2] {
            store.seed_warehouse(w.clone()).await;
        }
        for p in [&p1, &p2, &p3] {
            store.seed_product(p.clone()).await;
        }

        let ledger = StockLedger::new(Arc::new(store.clone()), cache.clone(), policy);
        let warehouses = WarehouseService::new(
            Arc::new(store.clone()),
            cache.clone(),
            Duration::from_secs(60),
        );

        Self {
            store,
            cache,
            ledger,
            warehouses,
            inventory_id,
            w1,
            w2,
            p1,
            p2,
            p3,
        }
    }

    pub async fn qty(&self, warehouse: &Warehouse, product: &Product) -> i32 {
        self.store
            .link_quantity(warehouse.id, product.id)
            .await
            .unwrap_or(0)
    }

    pub async fn total_stock(&self, product: &Product) -> i32 {
        self.store.product(product.id).await.unwrap().total_stock
    }

    pub async fn total_quantity(&self, product: &Product) -> i32 {
        self.store.product(product.id).await.unwrap().total_quantity
    }

    /// Sum of a product's link rows must equal its total stock
    pub async fn assert_aggregate(&self, product: &Product) {
        let links = self.store.links_for_product(product.id).await;
        assert!(links.iter().all(|l| l.quantity > 0), "zero row kept: {:?}", links);
        let sum: i32 = links.iter().map(|l| l.quantity).sum();
        assert_eq!(sum, self.total_stock(product).await, "aggregate drift for {}", product.name);
    }
}

pub fn test_config() -> Config {
    Config {
        environment: "test".to_string(),
        server: ServerConfig::default(),
        database: DatabaseConfig {
            url: "postgres://localhost/unused".to_string(),
            max_connections: 1,
            min_connections: 0,
            acquire_timeout_secs: 1,
        },
        cache: CacheConfig::default(),
        ledger: LedgerConfig::default(),
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
        },
    }
}
