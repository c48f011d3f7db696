//! Result cache — content-addressed get/set/invalidate with TTL.
//!
//! The engine talks to an opaque [`CacheStore`] (get/set-with-TTL/delete/
//! clear). A store outage degrades reads to a miss and turns writes into a
//! logged warning (fail-open); it never fails the request. Entries expire at
//! their absolute TTL — reads do not extend lifetimes.

use crate::types::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Cache lookup outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Hit(Value),
    Miss,
}

/// Storage contract: get/set-with-TTL/delete/clear. Implementations must be
/// safe for concurrent callers; last-write-wins on racing sets is acceptable.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
    /// Remove every key starting with `prefix` (per-tool scope).
    async fn delete_prefix(&self, prefix: &str) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// What to drop on [`CacheLayer::clear`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearScope<'a> {
    All,
    Tool(&'a str),
}

/// Cache layer wrapping a store with fail-open semantics and a per-operation
/// deadline so a slow backend cannot stall the calling path.
pub struct CacheLayer {
    store: Arc<dyn CacheStore>,
    op_timeout: Duration,
}

impl std::fmt::Debug for CacheLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheLayer")
            .field("op_timeout", &self.op_timeout)
            .finish_non_exhaustive()
    }
}

impl CacheLayer {
    pub fn new(store: Arc<dyn CacheStore>, op_timeout: Duration) -> Self {
        Self { store, op_timeout }
    }

    /// Look up a fingerprint. Store errors and slow reads degrade to `Miss`.
    pub async fn lookup(&self, fingerprint: &str) -> Lookup {
        match tokio::time::timeout(self.op_timeout, self.store.get(fingerprint)).await {
            Ok(Ok(Some(value))) => Lookup::Hit(value),
            Ok(Ok(None)) => Lookup::Miss,
            Ok(Err(e)) => {
                tracing::warn!(fingerprint, error = %e, "Cache read failed, degrading to miss");
                Lookup::Miss
            }
            Err(_) => {
                tracing::warn!(fingerprint, "Cache read timed out, degrading to miss");
                Lookup::Miss
            }
        }
    }

    /// Write-through a successful result. Failures are logged, never fatal.
    pub async fn store(&self, fingerprint: &str, value: Value, ttl: Duration) {
        match tokio::time::timeout(self.op_timeout, self.store.set(fingerprint, value, ttl)).await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(fingerprint, error = %e, "Cache write failed");
            }
            Err(_) => {
                tracing::warn!(fingerprint, "Cache write timed out");
            }
        }
    }

    /// Remove a single entry.
    pub async fn invalidate(&self, fingerprint: &str) -> Result<()> {
        self.store.delete(fingerprint).await
    }

    /// Drop every entry, or every entry of one tool.
    pub async fn clear(&self, scope: ClearScope<'_>) -> Result<()> {
        match scope {
            ClearScope::All => self.store.clear().await,
            ClearScope::Tool(tool) => {
                self.store
                    .delete_prefix(&crate::engine::fingerprint::scope_prefix(tool))
                    .await
            }
        }
    }
}

// =============================================================================
// In-memory store
// =============================================================================

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

/// In-memory cache store. Expiry is checked on read; expired entries are
/// removed lazily.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        if ttl.is_zero() {
            return Err(Error::schema("Cache TTL must be positive"));
        }
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<()> {
        self.entries
            .lock()
            .await
            .retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.lock().await.clear();
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
