//! Read-through cache for warehouse and product list/detail views
//!
//! The cache is advisory: entries are deleted (never updated in place) after
//! a write commits, and a failing cache never fails the request that used it.

mod local;

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::error::AppResult;

pub use local::MokaCache;

/// Byte-level cache client injected into the services
#[async_trait]
pub trait CacheClient: Send + Sync {
    /// Fetch a value, `None` on a miss
    async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>>;

    /// Store a value for `ttl`
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> AppResult<()>;

    /// Drop a value; deleting a missing key succeeds
    async fn delete(&self, key: &str) -> AppResult<()>;
}

/// Cache that never holds anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait]
impl CacheClient for NoopCache {
    async fn get(&self, _key: &str) -> AppResult<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> AppResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> AppResult<()> {
        Ok(())
    }
}

/// Cache key layout
pub mod keys {
    use super::Uuid;

    pub fn warehouse(warehouse_id: Uuid) -> String {
        format!("warehouse:{}", warehouse_id)
    }

    pub fn warehouse_list(inventory_id: Uuid) -> String {
        format!("warehouses:{}", inventory_id)
    }

    pub fn product(product_id: Uuid) -> String {
        format!("product:{}", product_id)
    }

    pub fn product_list(inventory_id: Uuid) -> String {
        format!("products:{}", inventory_id)
    }
}

/// Read and decode a JSON entry. Errors and undecodable entries are misses.
pub async fn get_json<T: DeserializeOwned>(cache: &dyn CacheClient, key: &str) -> Option<T> {
    match cache.get(key).await {
        Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to decode cached entry");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(key, error = %e, "Cache read failed");
            None
        }
    }
}

/// Encode and store a JSON entry, logging failures
pub async fn set_json<T: Serialize + ?Sized>(
    cache: &dyn CacheClient,
    key: &str,
    value: &T,
    ttl: Duration,
) {
    let bytes = match serde_json::to_vec(value) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(key, error = %e, "Failed to encode entry for caching");
            return;
        }
    };

    if let Err(e) = cache.set(key, bytes, ttl).await {
        tracing::warn!(key, error = %e, "Cache write failed");
    }
}

/// Delete every key, logging failures and carrying on
pub async fn invalidate(cache: &dyn CacheClient, keys: &[String]) {
    for key in keys {
        if let Err(e) = cache.delete(key).await {
            tracing::warn!(key = %key, error = %e, "Cache invalidation failed");
        }
    }
}
