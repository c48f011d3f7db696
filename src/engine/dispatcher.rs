//! Dispatcher — the per-invocation state machine.
//!
//! `Received → Validated → Admitted → CacheChecked → Executing → Completed`,
//! with early-exit terminals `Rejected` (validation/admission) and `Failed`
//! (exhausted retries or permanent error). Side effects are strictly
//! ordered: nothing runs before admission, no cache write happens before a
//! successful execution, and a cache hit touches neither resources nor the
//! implementation.

use crate::engine::cache::{CacheLayer, ClearScope, Lookup};
use crate::engine::fingerprint::fingerprint;
use crate::engine::metrics::EngineMetrics;
use crate::engine::rate_limiter::{Admission, RateLimiter};
use crate::engine::retry::RetryController;
use crate::plugins::HandlerRegistry;
use crate::registry::Registry;
use crate::types::{Error, RequestId, Result};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

// =============================================================================
// Invocation types
// =============================================================================

/// A decoded tool-invocation request. One per call; the caller identity is
/// trusted (verified upstream of the engine).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationRequest {
    pub tool: String,
    pub caller_id: String,

    #[serde(default)]
    pub parameters: Map<String, Value>,

    #[serde(default = "Utc::now")]
    pub submitted_at: DateTime<Utc>,

    #[serde(default)]
    pub request_id: RequestId,
}

impl InvocationRequest {
    pub fn new(tool: impl Into<String>, caller_id: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            caller_id: caller_id.into(),
            parameters: Map::new(),
            submitted_at: Utc::now(),
            request_id: RequestId::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Terminal invocation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStatus {
    Success,
    Error,
}

/// Structured error surfaced to callers.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

impl ErrorInfo {
    fn from_error(error: &Error) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
            retry_after_ms: error.retry_after().map(|d| d.as_millis() as u64),
        }
    }
}

// Deserialize needs an owned-ish kind; incoming values intern to "UNKNOWN"
// unless they match a known kind. Results are produced locally in practice.
impl<'de> Deserialize<'de> for ErrorInfo {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            kind: String,
            message: String,
            #[serde(default)]
            retry_after_ms: Option<u64>,
        }
        let raw = Raw::deserialize(deserializer)?;
        Ok(ErrorInfo {
            kind: intern_kind(&raw.kind),
            message: raw.message,
            retry_after_ms: raw.retry_after_ms,
        })
    }
}

fn intern_kind(kind: &str) -> &'static str {
    const KNOWN: [&str; 10] = [
        "SCHEMA_ERROR",
        "NOT_FOUND",
        "DUPLICATE_KIND",
        "RATE_LIMITED",
        "IMPLEMENTATION_MISSING",
        "TRANSIENT_BACKEND_ERROR",
        "IMPLEMENTATION_ERROR",
        "TIMEOUT",
        "SERIALIZATION_ERROR",
        "IO_ERROR",
    ];
    KNOWN.iter().find(|k| **k == kind).copied().unwrap_or("UNKNOWN")
}

/// Terminal result returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationResult {
    pub request_id: RequestId,
    pub tool: String,
    pub status: InvocationStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,

    pub cache_hit: bool,
    pub attempts: u32,
    pub elapsed_ms: u64,

    /// True when the terminal state was `Rejected` (validation/admission)
    /// rather than `Failed` (execution).
    pub rejected: bool,
}

impl InvocationResult {
    pub fn success(
        request_id: RequestId,
        tool: String,
        payload: Value,
        cache_hit: bool,
        attempts: u32,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            request_id,
            tool,
            status: InvocationStatus::Success,
            payload: Some(payload),
            error: None,
            cache_hit,
            attempts,
            elapsed_ms,
            rejected: false,
        }
    }

    pub fn rejected(request_id: RequestId, tool: String, error: &Error, elapsed_ms: u64) -> Self {
        Self {
            request_id,
            tool,
            status: InvocationStatus::Error,
            payload: None,
            error: Some(ErrorInfo::from_error(error)),
            cache_hit: false,
            attempts: 0,
            elapsed_ms,
            rejected: true,
        }
    }

    pub fn failed(
        request_id: RequestId,
        tool: String,
        error: &Error,
        attempts: u32,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            request_id,
            tool,
            status: InvocationStatus::Error,
            payload: None,
            error: Some(ErrorInfo::from_error(error)),
            cache_hit: false,
            attempts,
            elapsed_ms,
            rejected: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == InvocationStatus::Success
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Orchestrates one invocation across registry, limiter, cache, retry, and
/// the resolved implementation. Shared across worker tasks via `Arc`.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    handlers: Arc<HandlerRegistry>,
    limiter: RateLimiter,
    cache: CacheLayer,
    retry: RetryController,
    metrics: Arc<EngineMetrics>,
    call_timeout: Duration,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<Registry>,
        handlers: Arc<HandlerRegistry>,
        limiter: RateLimiter,
        cache: CacheLayer,
        retry: RetryController,
        metrics: Arc<EngineMetrics>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            handlers,
            limiter,
            cache,
            retry,
            metrics,
            call_timeout,
        }
    }

    /// Run one invocation to a terminal state.
    pub async fn dispatch(&self, request: InvocationRequest) -> InvocationResult {
        let started = Instant::now();

        // Received → Validated: lookup, resource resolution, parameter checks.
        // All failures here happen before any limiter or cache traffic.
        let definition = match self.registry.lookup_tool_for_dispatch(&request.tool) {
            Ok(d) => d,
            Err(e) => return self.finish_rejected(&request, e, started),
        };
        let resources = match self.registry.resolve_resources(&definition) {
            Ok(r) => r,
            Err(e) => return self.finish_rejected(&request, e, started),
        };

        let mut params = Value::Object(request.parameters.clone());
        let validation_errors = match definition.validate_params(&params) {
            Ok(errors) => errors,
            Err(e) => return self.finish_rejected(&request, e, started),
        };
        if !validation_errors.is_empty() {
            let e = Error::schema(validation_errors.join("; "));
            return self.finish_rejected(&request, e, started);
        }
        definition.fill_defaults(&mut params);
        let params = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        // Validated → Admitted
        match self
            .limiter
            .admit(&request.tool, &request.caller_id, &definition.quota)
            .await
        {
            Admission::Allowed { .. } => {}
            Admission::Denied { retry_after } => {
                let e = Error::rate_limited(
                    format!("Quota exhausted for tool '{}'", request.tool),
                    retry_after,
                );
                return self.finish_rejected(&request, e, started);
            }
        }

        // Admitted → CacheChecked: a hit completes without touching
        // resources or the implementation.
        let cache_key = definition
            .cache
            .enabled
            .then(|| fingerprint(&request.tool, &params));
        if let Some(key) = &cache_key {
            if let Lookup::Hit(payload) = self.cache.lookup(key).await {
                let result = InvocationResult::success(
                    request.request_id.clone(),
                    request.tool.clone(),
                    payload,
                    true,
                    0,
                    elapsed_ms(started),
                );
                self.metrics.record(&result);
                return result;
            }
        }

        // CacheChecked(miss) → Executing
        let handler = match self.handlers.resolve(&request.tool) {
            Some(h) => h,
            None => {
                let e = Error::implementation_missing(format!(
                    "No implementation registered for tool '{}'",
                    request.tool
                ));
                return self.finish_failed(&request, e, 0, started);
            }
        };

        let attempt_timeout = definition.timeout.unwrap_or(self.call_timeout);
        let outcome = self
            .retry
            .execute(move || {
                let handler = handler.clone();
                let params = params.clone();
                let resources = resources.clone();
                async move {
                    match tokio::time::timeout(
                        attempt_timeout,
                        handler.execute(&params, &resources),
                    )
                    .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(Error::timeout(format!(
                            "Attempt exceeded {}ms deadline",
                            attempt_timeout.as_millis()
                        ))),
                    }
                }
                .boxed()
            })
            .await;

        // Executing → Completed | Failed
        match outcome.result {
            Ok(payload) => {
                if let Some(key) = &cache_key {
                    // Write-through before returning, so an identical
                    // follow-up request observes the hit.
                    self.cache
                        .store(key, payload.clone(), definition.cache.ttl)
                        .await;
                }
                let result = InvocationResult::success(
                    request.request_id.clone(),
                    request.tool.clone(),
                    payload,
                    false,
                    outcome.attempts,
                    elapsed_ms(started),
                );
                self.metrics.record(&result);
                result
            }
            Err(e) => self.finish_failed(&request, e, outcome.attempts, started),
        }
    }

    /// Fingerprint a (tool, parameters) pair the way dispatch would,
    /// including default filling, so invalidation targets the stored key.
    pub fn fingerprint_for(&self, tool: &str, parameters: &Map<String, Value>) -> Result<String> {
        let definition = self.registry.lookup_tool(tool)?;
        let mut params = Value::Object(parameters.clone());
        definition.fill_defaults(&mut params);
        let params = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Ok(fingerprint(tool, &params))
    }

    /// Invalidate one cached invocation result.
    pub async fn invalidate(&self, tool: &str, parameters: &Map<String, Value>) -> Result<()> {
        let key = self.fingerprint_for(tool, parameters)?;
        self.cache.invalidate(&key).await
    }

    /// Drop cached results, engine-wide or for one tool.
    pub async fn clear_cache(&self, scope: ClearScope<'_>) -> Result<()> {
        self.cache.clear(scope).await
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    fn finish_rejected(
        &self,
        request: &InvocationRequest,
        error: Error,
        started: Instant,
    ) -> InvocationResult {
        tracing::warn!(
            request_id = %request.request_id,
            tool = %request.tool,
            caller = %request.caller_id,
            error_kind = error.kind(),
            error = %error,
            "Invocation rejected"
        );
        let result = InvocationResult::rejected(
            request.request_id.clone(),
            request.tool.clone(),
            &error,
            elapsed_ms(started),
        );
        self.metrics.record(&result);
        result
    }

    fn finish_failed(
        &self,
        request: &InvocationRequest,
        error: Error,
        attempts: u32,
        started: Instant,
    ) -> InvocationResult {
        tracing::warn!(
            request_id = %request.request_id,
            tool = %request.tool,
            caller = %request.caller_id,
            error_kind = error.kind(),
            attempts,
            error = %error,
            "Invocation failed"
        );
        let result = InvocationResult::failed(
            request.request_id.clone(),
            request.tool.clone(),
            &error,
            attempts,
            elapsed_ms(started),
        );
        self.metrics.record(&result);
        result
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
