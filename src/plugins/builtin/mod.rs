//! Built-in tool implementations and their registrations.
//!
//! Installs the workspace filesystem, completion API, and search API tools
//! together with the resource descriptors they declare.

pub mod completion;
pub mod fs;
pub mod search;

pub use completion::CompletionHandler;
pub use fs::{ReadFileHandler, WriteFileHandler};
pub use search::SearchHandler;

use crate::engine::Engine;
use crate::registry::{
    AccessMode, CachePolicy, ParamDef, ParamType, RateQuota, ResourceDescriptor, ResourceKind,
    ToolDefinition,
};
use crate::types::{Config, Error, Result};
use std::sync::Arc;

/// Map an HTTP status to a classified failure, or None for success.
/// 429 and 5xx are worth retrying; other non-success statuses are not.
pub(crate) fn classify_status(api: &str, status: reqwest::StatusCode) -> Option<Error> {
    if status.is_success() {
        None
    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Some(Error::implementation_transient(format!(
            "{} API returned {}",
            api, status
        )))
    } else {
        Some(Error::implementation(format!(
            "{} API returned {}",
            api, status
        )))
    }
}

/// Map a reqwest transport failure: connect/timeout problems are transient,
/// everything else (e.g. malformed response body) is permanent.
pub(crate) fn classify_transport(api: &str, error: &reqwest::Error) -> Error {
    if error.is_timeout() || error.is_connect() {
        Error::implementation_transient(format!("{} API unreachable: {}", api, error))
    } else {
        Error::implementation(format!("{} API error: {}", api, error))
    }
}

/// Register the built-in resources and tools on an engine.
pub fn install_builtins(engine: &Engine, config: &Config) -> Result<()> {
    engine.register_resource(
        ResourceDescriptor::new(
            "workspace_fs",
            ResourceKind::Static,
            [AccessMode::Read, AccessMode::Write],
        )
        .with_operations(["read_file".into(), "write_file".into()]),
    )?;
    engine.register_resource(
        ResourceDescriptor::new("completion_api", ResourceKind::Api, [AccessMode::Execute])
            .with_operations(["complete".into()]),
    )?;
    engine.register_resource(
        ResourceDescriptor::new("search_api", ResourceKind::Api, [AccessMode::Execute])
            .with_operations(["search".into()]),
    )?;
    engine.register_resource(
        ResourceDescriptor::new(
            "result_cache",
            ResourceKind::Cache,
            [AccessMode::Read, AccessMode::Write],
        )
        .with_operations(["get".into(), "set".into(), "invalidate".into()]),
    )?;

    let client = reqwest::Client::new();

    engine.install_tool(
        read_file_definition(config),
        Arc::new(ReadFileHandler::new(config.workspace.clone())),
    )?;
    engine.install_tool(
        write_file_definition(config),
        Arc::new(WriteFileHandler::new(config.workspace.clone())),
    )?;
    engine.install_tool(
        complete_definition(config),
        Arc::new(CompletionHandler::new(
            client.clone(),
            config.completion.clone(),
        )),
    )?;
    engine.install_tool(
        search_definition(config),
        Arc::new(SearchHandler::new(client, config.search.clone())),
    )?;

    Ok(())
}

fn read_file_definition(config: &Config) -> ToolDefinition {
    ToolDefinition {
        name: "read_file".into(),
        description: "Read a UTF-8 file from the workspace".into(),
        parameters: vec![
            ParamDef::required("path", ParamType::String).describe("Workspace-relative path")
        ],
        required_resources: vec!["workspace_fs".into()],
        cache: CachePolicy::disabled(),
        quota: config.engine.default_quota.clone(),
        timeout: None,
    }
}

fn write_file_definition(config: &Config) -> ToolDefinition {
    ToolDefinition {
        name: "write_file".into(),
        description: "Write a UTF-8 file into the workspace".into(),
        parameters: vec![
            ParamDef::required("path", ParamType::String).describe("Workspace-relative path"),
            ParamDef::required("content", ParamType::String).describe("File content"),
        ],
        required_resources: vec!["workspace_fs".into()],
        cache: CachePolicy::disabled(),
        quota: config.engine.default_quota.clone(),
        timeout: None,
    }
}

fn complete_definition(config: &Config) -> ToolDefinition {
    ToolDefinition {
        name: "complete".into(),
        description: "Generate a completion for a prompt".into(),
        parameters: vec![
            ParamDef::required("prompt", ParamType::String).describe("Prompt text"),
            ParamDef::optional(
                "model",
                ParamType::String,
                serde_json::json!(config.completion.model),
            )
            .describe("Model identifier"),
            ParamDef::optional(
                "max_tokens",
                ParamType::Int,
                serde_json::json!(config.completion.max_tokens),
            )
            .describe("Completion token budget"),
            ParamDef::optional(
                "temperature",
                ParamType::Float,
                serde_json::json!(config.completion.temperature),
            )
            .describe("Sampling temperature"),
        ],
        required_resources: vec!["completion_api".into(), "result_cache".into()],
        cache: config.engine.default_cache.clone(),
        quota: config.engine.default_quota.clone(),
        timeout: None,
    }
}

fn search_definition(config: &Config) -> ToolDefinition {
    ToolDefinition {
        name: "search".into(),
        description: "Search the web".into(),
        parameters: vec![
            ParamDef::required("query", ParamType::String).describe("Search query"),
            ParamDef::optional(
                "count",
                ParamType::Int,
                serde_json::json!(config.search.default_results),
            )
            .describe("Number of results"),
        ],
        required_resources: vec!["search_api".into(), "result_cache".into()],
        cache: config.engine.default_cache.clone(),
        quota: config.engine.default_quota.clone(),
        timeout: None,
    }
}
