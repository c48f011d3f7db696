//! Rate limiting — fixed-window admission per tool and caller.
//!
//! `admit` atomically increments the counter for the (tool, caller) window
//! via [`CounterStore::incr_with_expiry`]. A post-increment count above the
//! quota denies the call and the increment stays — the window remains full
//! until it expires. Windows anchor at the first request in the window, so
//! a caller can never spend a double quota across an aligned boundary.
//!
//! A counter-store failure denies (fail closed) to preserve the quota
//! guarantee when the shared backend is unreachable.

use crate::registry::RateQuota;
use crate::types::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Admission decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Allowed {
        /// Calls left in the current window after this one.
        remaining: u32,
    },
    Denied {
        /// Time until the window rolls over.
        retry_after: Duration,
    },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed { .. })
    }
}

/// Storage contract: atomic increment-with-expiry. Two concurrent callers
/// must never both observe a count within quota when only one slot remains.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment the counter for `key`, creating it with lifetime `ttl` if
    /// absent or expired. Returns the post-increment count and the window's
    /// remaining lifetime.
    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<(u64, Duration)>;
}

/// Rate limiter over a shared counter store.
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    /// Check the (tool, caller) window and record this call if admitted.
    pub async fn admit(&self, tool: &str, caller: &str, quota: &RateQuota) -> Admission {
        let key = format!("rl:{}:{}", tool, caller);

        match self.store.incr_with_expiry(&key, quota.window).await {
            Ok((count, remaining_window)) => {
                if count > u64::from(quota.max_calls) {
                    Admission::Denied {
                        retry_after: remaining_window,
                    }
                } else {
                    Admission::Allowed {
                        remaining: quota.max_calls.saturating_sub(count as u32),
                    }
                }
            }
            Err(e) => {
                tracing::warn!(tool, caller, error = %e, "Counter store failed, denying (fail closed)");
                Admission::Denied {
                    retry_after: quota.window,
                }
            }
        }
    }
}

// =============================================================================
// In-memory store
// =============================================================================

#[derive(Debug)]
struct CounterEntry {
    count: u64,
    expires_at: Instant,
}

/// In-memory counter store. The mutex makes increment-check-expiry atomic
/// with respect to concurrent callers, matching the trait contract.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    entries: Mutex<HashMap<String, CounterEntry>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<(u64, Duration)> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let entry = entries
            .entry(key.to_string())
            .and_modify(|e| {
                if e.expires_at <= now {
                    e.count = 0;
                    e.expires_at = now + ttl;
                }
            })
            .or_insert_with(|| CounterEntry {
                count: 0,
                expires_at: now + ttl,
            });

        entry.count += 1;
        Ok((entry.count, entry.expires_at.saturating_duration_since(now)))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Error;

    fn quota(max_calls: u32, window: Duration) -> RateQuota {
        RateQuota { max_calls, window }
    }

    fn limiter() -> RateLimiter {
        RateLimiter::new(Arc::new(MemoryCounterStore::new()))
    }

    #[tokio::test]
    async fn test_admits_up_to_quota_then_denies() {
        let limiter = limiter();
        let q = quota(5, Duration::from_secs(60));

        for _ in 0..5 {
            assert!(limiter.admit("search", "alice", &q).await.is_allowed());
        }

        match limiter.admit("search", "alice", &q).await {
            Admission::Denied { retry_after } => {
                assert!(retry_after > Duration::ZERO);
                assert!(retry_after <= Duration::from_secs(60));
            }
            other => panic!("expected denial, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_new_window_admits_again() {
        let limiter = limiter();
        let q = quota(2, Duration::from_millis(50));

        assert!(limiter.admit("search", "alice", &q).await.is_allowed());
        assert!(limiter.admit("search", "alice", &q).await.is_allowed());
        assert!(!limiter.admit("search", "alice", &q).await.is_allowed());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(limiter.admit("search", "alice", &q).await.is_allowed());
    }

    #[tokio::test]
    async fn test_denied_increment_is_not_rolled_back() {
        let limiter = limiter();
        let q = quota(1, Duration::from_secs(60));

        assert!(limiter.admit("search", "alice", &q).await.is_allowed());
        // Every further attempt keeps the window full; none sneaks through
        for _ in 0..3 {
            assert!(!limiter.admit("search", "alice", &q).await.is_allowed());
        }
    }

    #[tokio::test]
    async fn test_tools_and_callers_are_isolated() {
        let limiter = limiter();
        let q = quota(1, Duration::from_secs(60));

        assert!(limiter.admit("search", "alice", &q).await.is_allowed());
        assert!(!limiter.admit("search", "alice", &q).await.is_allowed());

        // Different tool, same caller
        assert!(limiter.admit("complete", "alice", &q).await.is_allowed());
        // Same tool, different caller
        assert!(limiter.admit("search", "bob", &q).await.is_allowed());
    }

    #[tokio::test]
    async fn test_concurrent_callers_never_exceed_quota() {
        let limiter = Arc::new(limiter());
        let q = quota(5, Duration::from_secs(60));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let limiter = limiter.clone();
            let q = q.clone();
            handles.push(tokio::spawn(async move {
                limiter.admit("search", "alice", &q).await.is_allowed()
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 5);
    }

    #[tokio::test]
    async fn test_store_failure_fails_closed() {
        let mut mock = MockCounterStore::new();
        mock.expect_incr_with_expiry()
            .returning(|_, _| Err(Error::backend("store unreachable")));
        let limiter = RateLimiter::new(Arc::new(mock));
        let q = quota(100, Duration::from_secs(60));

        match limiter.admit("search", "alice", &q).await {
            Admission::Denied { retry_after } => assert_eq!(retry_after, Duration::from_secs(60)),
            other => panic!("expected fail-closed denial, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_remaining_counts_down() {
        let limiter = limiter();
        let q = quota(3, Duration::from_secs(60));

        assert_eq!(
            limiter.admit("search", "alice", &q).await,
            Admission::Allowed { remaining: 2 }
        );
        assert_eq!(
            limiter.admit("search", "alice", &q).await,
            Admission::Allowed { remaining: 1 }
        );
        assert_eq!(
            limiter.admit("search", "alice", &q).await,
            Admission::Allowed { remaining: 0 }
        );
    }
}
