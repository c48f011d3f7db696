//! Execution engine — dispatcher, rate limiter, cache, retry, metrics.
//!
//! The [`Engine`] facade owns the registry, handler registry, and
//! dispatcher, and exposes the plugin-registration boundary: installing
//! `(ToolDefinition, handler)` pairs, enabling/disabling tools, and cache
//! administration. Requests flow through [`Dispatcher::dispatch`].

pub mod cache;
pub mod dispatcher;
pub mod fingerprint;
pub mod metrics;
pub mod rate_limiter;
pub mod retry;

pub use cache::{CacheLayer, CacheStore, ClearScope, Lookup, MemoryCacheStore};
pub use dispatcher::{
    Dispatcher, ErrorInfo, InvocationRequest, InvocationResult, InvocationStatus,
};
pub use fingerprint::fingerprint;
pub use metrics::{EngineMetrics, MetricsSnapshot};
pub use rate_limiter::{Admission, CounterStore, MemoryCounterStore, RateLimiter};
pub use retry::{RetryController, RetryOutcome};

use crate::plugins::{HandlerRegistry, ToolHandler};
use crate::registry::{Registry, ResourceDescriptor, ToolDefinition};
use crate::types::{Config, Result};
use std::sync::Arc;

/// Engine facade: registry + handlers + dispatcher behind one handle.
#[derive(Debug)]
pub struct Engine {
    registry: Arc<Registry>,
    handlers: Arc<HandlerRegistry>,
    dispatcher: Dispatcher,
}

impl Engine {
    /// Build an engine with in-memory counter and cache stores.
    pub fn new(config: &Config) -> Self {
        Self::with_stores(
            config,
            Arc::new(MemoryCounterStore::new()),
            Arc::new(MemoryCacheStore::new()),
        )
    }

    /// Build an engine over externally-shared stores (e.g. a distributed
    /// counter/cache backend satisfying the store traits).
    pub fn with_stores(
        config: &Config,
        counter_store: Arc<dyn CounterStore>,
        cache_store: Arc<dyn CacheStore>,
    ) -> Self {
        let registry = Arc::new(Registry::new());
        let handlers = Arc::new(HandlerRegistry::new());
        let metrics = EngineMetrics::new();

        let dispatcher = Dispatcher::new(
            registry.clone(),
            handlers.clone(),
            RateLimiter::new(counter_store),
            CacheLayer::new(cache_store, config.engine.cache_op_timeout),
            RetryController::new(config.engine.retry.clone()),
            metrics,
            config.engine.call_timeout,
        );

        Self {
            registry,
            handlers,
            dispatcher,
        }
    }

    /// Install a tool: definition plus implementation, atomically. If the
    /// handler registration fails the definition is rolled back, so the
    /// registry never advertises a tool that cannot resolve.
    pub fn install_tool(
        &self,
        definition: ToolDefinition,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<()> {
        let name = definition.name.clone();
        self.registry.register_tool(definition)?;
        if let Err(e) = self.handlers.register(name.clone(), handler) {
            let _ = self.registry.unregister_tool(&name);
            return Err(e);
        }
        Ok(())
    }

    pub fn register_resource(&self, descriptor: ResourceDescriptor) -> Result<()> {
        self.registry.register_resource(descriptor)
    }

    /// Enable or disable a tool for the *next* dispatch lookup.
    pub fn set_tool_enabled(&self, name: &str, enabled: bool) -> Result<()> {
        self.registry.set_enabled(name, enabled)
    }

    /// Run one invocation to a terminal state.
    pub async fn dispatch(&self, request: InvocationRequest) -> InvocationResult {
        self.dispatcher.dispatch(request).await
    }

    pub async fn invalidate_cache(
        &self,
        tool: &str,
        parameters: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<()> {
        self.dispatcher.invalidate(tool, parameters).await
    }

    pub async fn clear_cache(&self, scope: ClearScope<'_>) -> Result<()> {
        self.dispatcher.clear_cache(scope).await
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.dispatcher.metrics().snapshot()
    }
}
