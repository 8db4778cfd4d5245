//! In-process cache backed by `moka`, with a TTL per entry

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::{future::Cache, Expiry};

use super::CacheClient;
use crate::error::AppResult;

#[derive(Clone)]
struct CachedBytes {
    bytes: Vec<u8>,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, CachedBytes> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedBytes,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedBytes,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Cache client constructed once per process and shared by handle
#[derive(Clone)]
pub struct MokaCache {
    inner: Cache<String, CachedBytes>,
}

impl MokaCache {
    pub fn new(max_capacity: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { inner }
    }
}

#[async_trait]
impl CacheClient for MokaCache {
    async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        Ok(self.inner.get(key).await.map(|entry| entry.bytes))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> AppResult<()> {
        self.inner
            .insert(key.to_string(), CachedBytes { bytes: value, ttl })
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.inner.invalidate(key).await;
        Ok(())
    }
}
