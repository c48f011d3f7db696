//! Tool and resource registry.
//!
//! Append-only catalog of [`ToolDefinition`]s and [`ResourceDescriptor`]s.
//! Entries are `Arc`-shared: replacing one swaps the `Arc` atomically, so a
//! concurrent reader holds either the old or the new definition, never a
//! torn one. Name comparison is case-sensitive exact match.

pub mod resources;
pub mod tools;

pub use resources::{AccessMode, ResourceDescriptor, ResourceKind, ResourceSet};
pub use tools::{CachePolicy, ParamDef, ParamType, RateQuota, ToolDefinition};

use crate::types::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// In-memory registry. Read-mostly; locks are never held across awaits.
#[derive(Debug, Default)]
pub struct Registry {
    tools: RwLock<HashMap<String, Arc<ToolDefinition>>>,
    resources: RwLock<HashMap<String, Arc<ResourceDescriptor>>>,
    disabled: RwLock<HashSet<String>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool definition. Fails with `Duplicate` if the name is
    /// already taken; the existing registration is unaffected.
    pub fn register_tool(&self, definition: ToolDefinition) -> Result<()> {
        if definition.name.is_empty() {
            return Err(Error::schema("Tool name cannot be empty"));
        }
        let mut tools = write_lock(&self.tools)?;
        if tools.contains_key(&definition.name) {
            return Err(Error::duplicate(format!(
                "Tool already registered: {}",
                definition.name
            )));
        }
        tools.insert(definition.name.clone(), Arc::new(definition));
        Ok(())
    }

    /// Register a resource descriptor. Fails with `Duplicate` on collision.
    pub fn register_resource(&self, descriptor: ResourceDescriptor) -> Result<()> {
        if descriptor.name.is_empty() {
            return Err(Error::schema("Resource name cannot be empty"));
        }
        let mut resources = write_lock(&self.resources)?;
        if resources.contains_key(&descriptor.name) {
            return Err(Error::duplicate(format!(
                "Resource already registered: {}",
                descriptor.name
            )));
        }
        resources.insert(descriptor.name.clone(), Arc::new(descriptor));
        Ok(())
    }

    /// Look up a tool by name, ignoring the enabled flag.
    pub fn lookup_tool(&self, name: &str) -> Result<Arc<ToolDefinition>> {
        read_lock(&self.tools)?
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("Unknown tool: {}", name)))
    }

    /// Look up a tool for dispatch. Disabled tools are indistinguishable
    /// from absent ones.
    pub fn lookup_tool_for_dispatch(&self, name: &str) -> Result<Arc<ToolDefinition>> {
        let definition = self.lookup_tool(name)?;
        if read_lock(&self.disabled)?.contains(name) {
            return Err(Error::not_found(format!("Unknown tool: {}", name)));
        }
        Ok(definition)
    }

    pub fn lookup_resource(&self, name: &str) -> Result<Arc<ResourceDescriptor>> {
        read_lock(&self.resources)?
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("Unknown resource: {}", name)))
    }

    /// Resolve every resource a tool requires into a [`ResourceSet`].
    /// Fails with `NotFound` on the first unresolvable name.
    pub fn resolve_resources(&self, definition: &ToolDefinition) -> Result<ResourceSet> {
        let mut resolved = Vec::with_capacity(definition.required_resources.len());
        for name in &definition.required_resources {
            resolved.push(self.lookup_resource(name)?);
        }
        Ok(ResourceSet::new(resolved))
    }

    /// Enable or disable a tool. Takes effect for the next dispatch lookup;
    /// in-flight invocations are unaffected.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<()> {
        // Validate existence first so callers get NotFound, not a silent no-op.
        self.lookup_tool(name)?;
        let mut disabled = write_lock(&self.disabled)?;
        if enabled {
            disabled.remove(name);
        } else {
            disabled.insert(name.to_string());
        }
        Ok(())
    }

    pub fn is_enabled(&self, name: &str) -> Result<bool> {
        self.lookup_tool(name)?;
        Ok(!read_lock(&self.disabled)?.contains(name))
    }

    /// Remove a tool definition entirely.
    pub fn unregister_tool(&self, name: &str) -> Result<()> {
        let mut tools = write_lock(&self.tools)?;
        if tools.remove(name).is_none() {
            return Err(Error::not_found(format!("Unknown tool: {}", name)));
        }
        write_lock(&self.disabled)?.remove(name);
        Ok(())
    }

    /// Sorted snapshot of all tool definitions.
    pub fn list_tools(&self) -> Result<Vec<Arc<ToolDefinition>>> {
        let tools = read_lock(&self.tools)?;
        let mut entries: Vec<Arc<ToolDefinition>> = tools.values().cloned().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Sorted snapshot of all resource descriptors.
    pub fn list_resources(&self) -> Result<Vec<Arc<ResourceDescriptor>>> {
        let resources = read_lock(&self.resources)?;
        let mut entries: Vec<Arc<ResourceDescriptor>> = resources.values().cloned().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    pub fn tool_count(&self) -> usize {
        self.tools.read().map(|t| t.len()).unwrap_or(0)
    }
}

fn read_lock<'a, T>(lock: &'a RwLock<T>) -> Result<std::sync::RwLockReadGuard<'a, T>> {
    lock.read()
        .map_err(|_| Error::backend("Registry lock poisoned"))
}

fn write_lock<'a, T>(lock: &'a RwLock<T>) -> Result<std::sync::RwLockWriteGuard<'a, T>> {
    lock.write()
        .map_err(|_| Error::backend("Registry lock poisoned"))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(name: &str) -> ToolDefinition {
        ToolDefinition {
            name: name.to_string(),
            description: format!("{} tool", name),
            parameters: vec![],
            required_resources: vec![],
            cache: CachePolicy::disabled(),
            quota: RateQuota::default(),
            timeout: None,
        }
    }

    fn resource(name: &str) -> ResourceDescriptor {
        ResourceDescriptor::new(name, ResourceKind::Api, [AccessMode::Execute])
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = Registry::new();
        registry.register_tool(tool("search")).unwrap();

        assert_eq!(registry.lookup_tool("search").unwrap().name, "search");
        assert!(matches!(
            registry.lookup_tool("missing"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_tool_rejected_first_unaffected() {
        let registry = Registry::new();
        registry.register_tool(tool("search")).unwrap();

        let mut second = tool("search");
        second.description = "replacement".to_string();
        assert!(matches!(
            registry.register_tool(second),
            Err(Error::Duplicate(_))
        ));

        // First registration unaffected
        assert_eq!(
            registry.lookup_tool("search").unwrap().description,
            "search tool"
        );
    }

    #[test]
    fn test_duplicate_resource_rejected() {
        let registry = Registry::new();
        registry.register_resource(resource("search_api")).unwrap();
        assert!(matches!(
            registry.register_resource(resource("search_api")),
            Err(Error::Duplicate(_))
        ));
    }

    #[test]
    fn test_name_comparison_is_case_sensitive() {
        let registry = Registry::new();
        registry.register_tool(tool("search")).unwrap();
        registry.register_tool(tool("Search")).unwrap();
        assert!(registry.lookup_tool("SEARCH").is_err());
    }

    #[test]
    fn test_resolve_resources_all_or_nothing() {
        let registry = Registry::new();
        registry.register_resource(resource("search_api")).unwrap();

        let mut def = tool("search");
        def.required_resources = vec!["search_api".into(), "missing_api".into()];

        assert!(matches!(
            registry.resolve_resources(&def),
            Err(Error::NotFound(_))
        ));

        def.required_resources = vec!["search_api".into()];
        let set = registry.resolve_resources(&def).unwrap();
        assert_eq!(set.names(), vec!["search_api"]);
    }

    #[test]
    fn test_disable_hides_from_dispatch_lookup() {
        let registry = Registry::new();
        registry.register_tool(tool("search")).unwrap();

        registry.set_enabled("search", false).unwrap();
        assert!(registry.lookup_tool_for_dispatch("search").is_err());
        // Plain lookup still sees it (for listings / re-enable)
        assert!(registry.lookup_tool("search").is_ok());
        assert!(!registry.is_enabled("search").unwrap());

        registry.set_enabled("search", true).unwrap();
        assert!(registry.lookup_tool_for_dispatch("search").is_ok());
    }

    #[test]
    fn test_set_enabled_unknown_tool_fails() {
        let registry = Registry::new();
        assert!(matches!(
            registry.set_enabled("ghost", false),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_unregister_tool() {
        let registry = Registry::new();
        registry.register_tool(tool("search")).unwrap();
        registry.unregister_tool("search").unwrap();
        assert!(registry.lookup_tool("search").is_err());
        assert!(registry.unregister_tool("search").is_err());
    }

    #[test]
    fn test_list_tools_sorted() {
        let registry = Registry::new();
        registry.register_tool(tool("write_file")).unwrap();
        registry.register_tool(tool("complete")).unwrap();
        registry.register_tool(tool("search")).unwrap();

        let names: Vec<String> = registry
            .list_tools()
            .unwrap()
            .iter()
            .map(|t| t.name.clone())
            .collect();
        assert_eq!(names, vec!["complete", "search", "write_file"]);
    }
}
