//! Per-invocation metrics.
//!
//! Atomic counters aggregated for the `status` surface, plus one structured
//! tracing event per terminal invocation for external aggregation.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::engine::dispatcher::{InvocationResult, InvocationStatus};

/// Process-wide engine counters.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    invocations: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    rejections: AtomicU64,
    cache_hits: AtomicU64,
    retried_calls: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record a terminal invocation and emit the observability event.
    pub fn record(&self, result: &InvocationResult) {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        match result.status {
            InvocationStatus::Success => {
                self.successes.fetch_add(1, Ordering::Relaxed);
            }
            InvocationStatus::Error => {
                if result.rejected {
                    self.rejections.fetch_add(1, Ordering::Relaxed);
                } else {
                    self.failures.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        if result.cache_hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        }
        if result.attempts > 1 {
            self.retried_calls.fetch_add(1, Ordering::Relaxed);
        }

        tracing::info!(
            target: "mcp_engine::invocation",
            tool = %result.tool,
            status = ?result.status,
            cache_hit = result.cache_hit,
            attempts = result.attempts,
            elapsed_ms = result.elapsed_ms,
            error_kind = result.error.as_ref().map(|e| e.kind),
            "invocation completed"
        );
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            invocations: self.invocations.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            retried_calls: self.retried_calls.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time counter values.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub invocations: u64,
    pub successes: u64,
    pub failures: u64,
    pub rejections: u64,
    pub cache_hits: u64,
    pub retried_calls: u64,
}

impl MetricsSnapshot {
    pub fn success_rate(&self) -> f64 {
        if self.invocations == 0 {
            return 1.0;
        }
        self.successes as f64 / self.invocations as f64
    }

    pub fn cache_hit_rate(&self) -> f64 {
        if self.invocations == 0 {
            return 0.0;
        }
        self.cache_hits as f64 / self.invocations as f64
    }
}
