//! Resource descriptors — declared dependencies tools may require.
//!
//! A resource is a named capability (filesystem root, external API, cache)
//! with declared access modes and operations. Descriptors are read-only
//! after registration; the dispatcher hands a [`ResourceSet`] of resolved
//! descriptors to the tool implementation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Static,
    Api,
    Cache,
}

/// Access mode a resource permits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    Read,
    Write,
    Execute,
}

/// A registered resource. Read-only after registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub name: String,
    pub kind: ResourceKind,
    pub access_modes: BTreeSet<AccessMode>,
    #[serde(default)]
    pub operations: Vec<String>,
}

impl ResourceDescriptor {
    pub fn new(
        name: impl Into<String>,
        kind: ResourceKind,
        access_modes: impl IntoIterator<Item = AccessMode>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            access_modes: access_modes.into_iter().collect(),
            operations: Vec::new(),
        }
    }

    pub fn with_operations(mut self, operations: impl IntoIterator<Item = String>) -> Self {
        self.operations = operations.into_iter().collect();
        self
    }

    pub fn allows(&self, mode: AccessMode) -> bool {
        self.access_modes.contains(&mode)
    }
}

/// Resolved resources for one invocation, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ResourceSet {
    inner: HashMap<String, Arc<ResourceDescriptor>>,
}

impl ResourceSet {
    pub fn new(resources: impl IntoIterator<Item = Arc<ResourceDescriptor>>) -> Self {
        Self {
            inner: resources
                .into_iter()
                .map(|r| (r.name.clone(), r))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ResourceDescriptor> {
        self.inner.get(name).map(Arc::as_ref)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.inner.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_checks_modes() {
        let desc = ResourceDescriptor::new(
            "workspace_fs",
            ResourceKind::Static,
            [AccessMode::Read, AccessMode::Write],
        );
        assert!(desc.allows(AccessMode::Read));
        assert!(!desc.allows(AccessMode::Execute));
    }

    #[test]
    fn test_resource_set_lookup() {
        let set = ResourceSet::new([
            Arc::new(ResourceDescriptor::new(
                "search_api",
                ResourceKind::Api,
                [AccessMode::Execute],
            )),
            Arc::new(ResourceDescriptor::new(
                "workspace_fs",
                ResourceKind::Static,
                [AccessMode::Read],
            )),
        ]);

        assert_eq!(set.len(), 2);
        assert!(set.get("search_api").is_some());
        assert!(set.get("missing").is_none());
        assert_eq!(set.names(), vec!["search_api", "workspace_fs"]);
    }

    #[test]
    fn test_descriptor_serde_round_trip() {
        let desc = ResourceDescriptor::new("cache", ResourceKind::Cache, [AccessMode::Read])
            .with_operations(["get".to_string(), "set".to_string()]);
        let json = serde_json::to_string(&desc).unwrap();
        let back: ResourceDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "cache");
        assert_eq!(back.kind, ResourceKind::Cache);
        assert_eq!(back.operations, vec!["get", "set"]);
    }
}
