//! PostgreSQL implementation of the stock store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{
    LinkWrite, Product, ProductStock, StockItem, Storage, Warehouse, WarehouseProductLink,
};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{RowLock, StockStore, StockTransaction, WarehouseRef};
use crate::error::{AppError, AppResult};

const WAREHOUSE_COLUMNS: &str = "w.id, w.name, w.location, w.capacity, w.storage_type, w.is_main, \
     w.manager, w.phone, w.email, w.inventory_id, w.created_at, w.updated_at";

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.code, p.sku, p.brand, p.model, p.description, \
     p.total_quantity, p.total_stock, p.restock_level, p.optimal_level, \
     p.cost_price, p.selling_price, p.inventory_id, p.created_at, p.updated_at";

/// Row for warehouse queries
#[derive(Debug, FromRow)]
struct WarehouseRow {
    id: Uuid,
    name: String,
    location: String,
    capacity: i32,
    storage_type: String,
    is_main: bool,
    manager: String,
    phone: String,
    email: String,
    inventory_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<WarehouseRow> for Warehouse {
    fn from(row: WarehouseRow) -> Self {
        Warehouse {
            id: row.id,
            name: row.name,
            location: row.location,
            capacity: row.capacity,
            storage_type: row.storage_type,
            is_main: row.is_main,
            manager: row.manager,
            phone: row.phone,
            email: row.email,
            inventory_id: row.inventory_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Row for product queries
#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    code: String,
    sku: String,
    brand: String,
    model: String,
    description: String,
    total_quantity: i32,
    total_stock: i32,
    restock_level: i32,
    optimal_level: i32,
    cost_price: i64,
    selling_price: i64,
    inventory_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            code: row.code,
            sku: row.sku,
            brand: row.brand,
            model: row.model,
            description: row.description,
            total_quantity: row.total_quantity,
            total_stock: row.total_stock,
            restock_level: row.restock_level,
            optimal_level: row.optimal_level,
            cost_price: row.cost_price,
            selling_price: row.selling_price,
            inventory_id: row.inventory_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Row for the warehouse stock join
#[derive(Debug, FromRow)]
struct StockItemRow {
    #[sqlx(flatten)]
    product: ProductRow,
    quantity: i32,
}

/// Row for the product storages join
#[derive(Debug, FromRow)]
struct StorageRow {
    #[sqlx(flatten)]
    warehouse: WarehouseRow,
    quantity: i32,
}

/// Row for the locked product read
#[derive(Debug, FromRow)]
struct ProductStockRow {
    id: Uuid,
    name: String,
    inventory_id: Uuid,
    total_quantity: i32,
    total_stock: i32,
}

impl From<ProductStockRow> for ProductStock {
    fn from(row: ProductStockRow) -> Self {
        ProductStock {
            id: row.id,
            name: row.name,
            inventory_id: row.inventory_id,
            total_quantity: row.total_quantity,
            total_stock: row.total_stock,
        }
    }
}

/// Stock store over a PostgreSQL pool
#[derive(Clone)]
pub struct PgStockStore {
    db: PgPool,
}

impl PgStockStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StockStore for PgStockStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    async fn begin(&self) -> AppResult<Box<dyn StockTransaction>> {
        let tx = self.db.begin().await?;
        Ok(Box::new(PgStockTransaction { tx }))
    }

    async fn list_warehouses(&self, inventory_id: Uuid) -> AppResult<Vec<Warehouse>> {
        let rows = sqlx::query_as::<_, WarehouseRow>(&format!(
            "SELECT {WAREHOUSE_COLUMNS} FROM warehouses w \
             WHERE w.inventory_id = $1 ORDER BY w.created_at DESC"
        ))
        .bind(inventory_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_warehouse(&self, warehouse_id: Uuid) -> AppResult<Option<Warehouse>> {
        let row = sqlx::query_as::<_, WarehouseRow>(&format!(
            "SELECT {WAREHOUSE_COLUMNS} FROM warehouses w WHERE w.id = $1"
        ))
        .bind(warehouse_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn stock_items(&self, warehouse_id: Uuid) -> AppResult<Vec<StockItem>> {
        let rows = sqlx::query_as::<_, StockItemRow>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}, wpl.quantity
            FROM warehouse_product_link wpl
            JOIN products p ON wpl.product_id = p.id
            WHERE wpl.warehouse_id = $1
            ORDER BY p.name ASC
            "#
        ))
        .bind(warehouse_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| StockItem {
                product: row.product.into(),
                quantity_in_stock: row.quantity,
            })
            .collect())
    }

    async fn find_product(&self, product_id: Uuid) -> AppResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1"
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn product_storages(&self, product_id: Uuid) -> AppResult<Vec<Storage>> {
        let rows = sqlx::query_as::<_, StorageRow>(&format!(
            r#"
            SELECT {WAREHOUSE_COLUMNS}, wpl.quantity
            FROM warehouse_product_link wpl
            JOIN warehouses w ON wpl.warehouse_id = w.id
            WHERE wpl.product_id = $1
            ORDER BY w.name ASC
            "#
        ))
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Storage {
                warehouse: row.warehouse.into(),
                stock_quantity: row.quantity,
            })
            .collect())
    }

    async fn warehouse_name_taken(
        &self,
        inventory_id: Uuid,
        name: &str,
        excluding: Option<Uuid>,
    ) -> AppResult<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM warehouses
                WHERE name = $1 AND inventory_id = $2 AND ($3::uuid IS NULL OR id != $3)
            )
            "#,
        )
        .bind(name)
        .bind(inventory_id)
        .bind(excluding)
        .fetch_one(&self.db)
        .await?;

        Ok(taken)
    }

    async fn insert_warehouse(&self, warehouse: &Warehouse) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO warehouses (
                id, name, location, capacity, storage_type,
                is_main, manager, phone, email, inventory_id,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(warehouse.id)
        .bind(&warehouse.name)
        .bind(&warehouse.location)
        .bind(warehouse.capacity)
        .bind(&warehouse.storage_type)
        .bind(warehouse.is_main)
        .bind(&warehouse.manager)
        .bind(&warehouse.phone)
        .bind(&warehouse.email)
        .bind(warehouse.inventory_id)
        .bind(warehouse.created_at)
        .bind(warehouse.updated_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn update_warehouse(&self, warehouse: &Warehouse) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE warehouses
            SET name = $1, location = $2, capacity = $3, storage_type = $4,
                is_main = $5, manager = $6, phone = $7, email = $8, updated_at = $9
            WHERE id = $10
            "#,
        )
        .bind(&warehouse.name)
        .bind(&warehouse.location)
        .bind(warehouse.capacity)
        .bind(&warehouse.storage_type)
        .bind(warehouse.is_main)
        .bind(&warehouse.manager)
        .bind(&warehouse.phone)
        .bind(&warehouse.email)
        .bind(warehouse.updated_at)
        .bind(warehouse.id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Warehouse".to_string()));
        }

        Ok(())
    }
}

/// Open PostgreSQL transaction; sqlx rolls it back if it is dropped
struct PgStockTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StockTransaction for PgStockTransaction {
    async fn lock_warehouse(
        &mut self,
        warehouse_id: Uuid,
        lock: RowLock,
    ) -> AppResult<Option<WarehouseRef>> {
        let query = match lock {
            RowLock::Share => "SELECT id, inventory_id FROM warehouses WHERE id = $1 FOR SHARE",
            RowLock::Exclusive => {
                "SELECT id, inventory_id FROM warehouses WHERE id = $1 FOR UPDATE"
            }
        };

        let row = sqlx::query_as::<_, (Uuid, Uuid)>(query)
            .bind(warehouse_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.map(|(id, inventory_id)| WarehouseRef { id, inventory_id }))
    }

    async fn lock_product(&mut self, product_id: Uuid) -> AppResult<Option<ProductStock>> {
        let row = sqlx::query_as::<_, ProductStockRow>(
            r#"
            SELECT id, name, inventory_id, total_quantity, total_stock
            FROM products
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(product_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn lock_link(&mut self, warehouse_id: Uuid, product_id: Uuid) -> AppResult<Option<i32>> {
        let quantity = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT quantity
            FROM warehouse_product_link
            WHERE warehouse_id = $1 AND product_id = $2
            FOR UPDATE
            "#,
        )
        .bind(warehouse_id)
        .bind(product_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(quantity)
    }

    async fn lock_warehouse_links(
        &mut self,
        warehouse_id: Uuid,
    ) -> AppResult<Vec<WarehouseProductLink>> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid, i32)>(
            r#"
            SELECT product_id, warehouse_id, quantity
            FROM warehouse_product_link
            WHERE warehouse_id = $1
            ORDER BY product_id
            FOR UPDATE
            "#,
        )
        .bind(warehouse_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(product_id, warehouse_id, quantity)| WarehouseProductLink {
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
        let total = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO warehouse_product_link (product_id, warehouse_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (product_id, warehouse_id)
            DO UPDATE SET quantity = warehouse_product_link.quantity + EXCLUDED.quantity
            RETURNING quantity
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .bind(quantity)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(total)
    }

    async fn write_link(
        &mut self,
        warehouse_id: Uuid,
        product_id: Uuid,
        write: LinkWrite,
    ) -> AppResult<()> {
        match write {
            LinkWrite::Unchanged => {}
            LinkWrite::Insert(quantity) => {
                sqlx::query(
                    "INSERT INTO warehouse_product_link (product_id, warehouse_id, quantity) \
                     VALUES ($1, $2, $3)",
                )
                .bind(product_id)
                .bind(warehouse_id)
                .bind(quantity)
                .execute(&mut *self.tx)
                .await?;
            }
            LinkWrite::Update(quantity) => {
                sqlx::query(
                    "UPDATE warehouse_product_link SET quantity = $1 \
                     WHERE warehouse_id = $2 AND product_id = $3",
                )
                .bind(quantity)
                .bind(warehouse_id)
                .bind(product_id)
                .execute(&mut *self.tx)
                .await?;
            }
            LinkWrite::Delete => {
                sqlx::query(
                    "DELETE FROM warehouse_product_link \
                     WHERE warehouse_id = $1 AND product_id = $2",
                )
                .bind(warehouse_id)
                .bind(product_id)
                .execute(&mut *self.tx)
                .await?;
            }
        }

        Ok(())
    }

    async fn adjust_total_stock(&mut self, product_id: Uuid, delta: i32) -> AppResult<()> {
        sqlx::query(
            "UPDATE products SET total_stock = total_stock + $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(delta)
        .bind(product_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn raise_total_quantity(&mut self, product_id: Uuid, ceiling: i32) -> AppResult<()> {
        sqlx::query(
            "UPDATE products SET total_quantity = GREATEST(total_quantity, $1), updated_at = NOW() \
             WHERE id = $2",
        )
        .bind(ceiling)
        .bind(product_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn delete_warehouse(&mut self, warehouse_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM warehouse_product_link WHERE warehouse_id = $1")
            .bind(warehouse_id)
            .execute(&mut *self.tx)
            .await?;

        sqlx::query("DELETE FROM warehouses WHERE id = $1")
            .bind(warehouse_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
