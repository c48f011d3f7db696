//! Plugin interface — the capability contract a tool implementation
//! satisfies to be dispatched.
//!
//! Implementations receive validated, default-filled parameters and the
//! resolved resource set they declared, and return a payload or a classified
//! error (`Error::implementation` vs `Error::implementation_transient`).
//! Retried implementations must be safe to invoke repeatedly for the same
//! input; the engine enforces nothing beyond the transient/permanent split.
//!
//! Plugin *loading* is external: callers hand `(ToolDefinition, handler)`
//! pairs to the engine at startup or at runtime.

pub mod builtin;

use crate::registry::ResourceSet;
use crate::types::{Error, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A dispatchable tool implementation.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn execute(&self, params: &Map<String, Value>, resources: &ResourceSet)
        -> Result<Value>;
}

/// Name → implementation map. Mutations take effect for the next dispatch
/// lookup; in-flight invocations keep their resolved `Arc`.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn ToolHandler>>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.handlers.read().map(|h| h.len()).unwrap_or(0);
        f.debug_struct("HandlerRegistry")
            .field("handlers", &count)
            .finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an implementation. Fails with `Duplicate` on collision.
    pub fn register(&self, name: impl Into<String>, handler: Arc<dyn ToolHandler>) -> Result<()> {
        let name = name.into();
        let mut handlers = self
            .handlers
            .write()
            .map_err(|_| Error::backend("Handler registry lock poisoned"))?;
        if handlers.contains_key(&name) {
            return Err(Error::duplicate(format!(
                "Handler already registered: {}",
                name
            )));
        }
        handlers.insert(name, handler);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.handlers.read().ok()?.get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let mut handlers = self
            .handlers
            .write()
            .map_err(|_| Error::backend("Handler registry lock poisoned"))?;
        if handlers.remove(name).is_none() {
            return Err(Error::not_found(format!("Unknown handler: {}", name)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoHandler;

    #[async_trait]
    impl ToolHandler for EchoHandler {
        async fn execute(
            &self,
            params: &Map<String, Value>,
            _resources: &ResourceSet,
        ) -> Result<Value> {
            Ok(Value::Object(params.clone()))
        }
    }

    #[tokio::test]
    async fn test_register_resolve_execute() {
        let registry = HandlerRegistry::new();
        registry.register("echo", Arc::new(EchoHandler)).unwrap();

        let handler = registry.resolve("echo").unwrap();
        let mut params = Map::new();
        params.insert("x".into(), serde_json::json!(1));

        let out = handler
            .execute(&params, &ResourceSet::default())
            .await
            .unwrap();
        assert_eq!(out, serde_json::json!({"x": 1}));
    }

    #[test]
    fn test_duplicate_handler_rejected() {
        let registry = HandlerRegistry::new();
        registry.register("echo", Arc::new(EchoHandler)).unwrap();
        assert!(matches!(
            registry.register("echo", Arc::new(EchoHandler)),
            Err(Error::Duplicate(_))
        ));
    }

    #[test]
    fn test_remove_handler() {
        let registry = HandlerRegistry::new();
        registry.register("echo", Arc::new(EchoHandler)).unwrap();
        registry.remove("echo").unwrap();
        assert!(registry.resolve("echo").is_none());
        assert!(registry.remove("echo").is_err());
    }
}
