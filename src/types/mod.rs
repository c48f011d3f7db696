//! Core types for the execution engine.
//!
//! This module provides foundational types used throughout the system:
//! - **IDs**: Strongly-typed identifiers (RequestId)
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for engine, workspace, and API clients

mod config;
mod errors;
mod ids;

pub use config::{
    CompletionConfig, Config, EngineDefaults, ObservabilityConfig, RetryConfig, SearchConfig,
    WorkspaceConfig,
};
pub use errors::{Error, Result};
pub use ids::RequestId;
