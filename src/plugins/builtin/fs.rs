//! Workspace filesystem tools — rooted read/write with policy limits.
//!
//! Paths resolve strictly under the configured workspace root; absolute
//! paths and parent traversal are rejected. Extension and size limits come
//! from [`WorkspaceConfig`].

use crate::plugins::ToolHandler;
use crate::registry::ResourceSet;
use crate::types::{Error, Result, WorkspaceConfig};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Component, Path, PathBuf};

/// Resolve a caller-supplied relative path under the workspace root.
fn resolve_path(config: &WorkspaceConfig, raw: &str) -> Result<PathBuf> {
    let candidate = Path::new(raw);
    if candidate.is_absolute() {
        return Err(Error::implementation(format!(
            "Absolute paths are not allowed: {}",
            raw
        )));
    }
    for component in candidate.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => {
                return Err(Error::implementation(format!(
                    "Path escapes the workspace root: {}",
                    raw
                )))
            }
        }
    }

    let extension = candidate
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    if !config
        .allowed_extensions
        .iter()
        .any(|allowed| allowed == extension)
    {
        return Err(Error::implementation(format!(
            "Extension '{}' is not allowed (allowed: {})",
            extension,
            config.allowed_extensions.join(", ")
        )));
    }

    Ok(config.root.join(candidate))
}

fn str_param<'a>(params: &'a Map<String, Value>, name: &str) -> Result<&'a str> {
    params
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::schema(format!("Missing required parameter: {}", name)))
}

// =============================================================================
// read_file
// =============================================================================

/// Reads a UTF-8 file under the workspace root.
#[derive(Debug)]
pub struct ReadFileHandler {
    config: WorkspaceConfig,
}

impl ReadFileHandler {
    pub fn new(config: WorkspaceConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ToolHandler for ReadFileHandler {
    async fn execute(
        &self,
        params: &Map<String, Value>,
        _resources: &ResourceSet,
    ) -> Result<Value> {
        let raw = str_param(params, "path")?;
        let path = resolve_path(&self.config, raw)?;

        let metadata = tokio::fs::metadata(&path).await?;
        if metadata.len() > self.config.max_file_bytes {
            return Err(Error::implementation(format!(
                "File exceeds size limit: {} > {} bytes",
                metadata.len(),
                self.config.max_file_bytes
            )));
        }

        let content = tokio::fs::read_to_string(&path).await?;
        Ok(serde_json::json!({
            "path": raw,
            "size_bytes": metadata.len(),
            "content": content,
        }))
    }
}

// =============================================================================
// write_file
// =============================================================================

/// Writes a UTF-8 file under the workspace root, creating parent
/// directories as needed.
#[derive(Debug)]
pub struct WriteFileHandler {
    config: WorkspaceConfig,
}

impl WriteFileHandler {
    pub fn new(config: WorkspaceConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ToolHandler for WriteFileHandler {
    async fn execute(
        &self,
        params: &Map<String, Value>,
        _resources: &ResourceSet,
    ) -> Result<Value> {
        let raw = str_param(params, "path")?;
        let content = str_param(params, "content")?;
        let path = resolve_path(&self.config, raw)?;

        if content.len() as u64 > self.config.max_file_bytes {
            return Err(Error::implementation(format!(
                "Content exceeds size limit: {} > {} bytes",
                content.len(),
                self.config.max_file_bytes
            )));
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;

        Ok(serde_json::json!({
            "path": raw,
            "bytes_written": content.len(),
        }))
    }
}

// =============================================================================
// Tests
// =============================================================================
