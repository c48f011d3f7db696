//! Tool definitions — typed metadata, parameter validation, default filling.
//!
//! A [`ToolDefinition`] owns a tool's *metadata* (not its implementation —
//! implementations live in the handler registry). Definitions are immutable
//! after registration and shared behind `Arc`.

use crate::types::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

// =============================================================================
// Parameter types
// =============================================================================

/// Parameter type for tool inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Int,
    Float,
    Bool,
    StringList,
    Enum(Vec<String>),
    Optional(Box<ParamType>),
}

impl ParamType {
    /// Validate a JSON value against this parameter type.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        match self {
            ParamType::String => {
                if value.is_string() {
                    Ok(())
                } else {
                    Err(format!("expected string, got {}", value_type_name(value)))
                }
            }
            ParamType::Int => {
                if value.is_i64() || value.is_u64() {
                    Ok(())
                } else {
                    Err(format!("expected integer, got {}", value_type_name(value)))
                }
            }
            ParamType::Float => {
                if value.is_number() {
                    Ok(())
                } else {
                    Err(format!("expected number, got {}", value_type_name(value)))
                }
            }
            ParamType::Bool => {
                if value.is_boolean() {
                    Ok(())
                } else {
                    Err(format!("expected boolean, got {}", value_type_name(value)))
                }
            }
            ParamType::StringList => {
                if let Some(arr) = value.as_array() {
                    for (i, item) in arr.iter().enumerate() {
                        if !item.is_string() {
                            return Err(format!(
                                "expected string at index {}, got {}",
                                i,
                                value_type_name(item)
                            ));
                        }
                    }
                    Ok(())
                } else {
                    Err(format!("expected array, got {}", value_type_name(value)))
                }
            }
            ParamType::Enum(variants) => {
                if let Some(s) = value.as_str() {
                    if variants.iter().any(|v| v == s) {
                        Ok(())
                    } else {
                        Err(format!(
                            "invalid enum value '{}', expected one of: {}",
                            s,
                            variants.join(", ")
                        ))
                    }
                } else {
                    Err(format!(
                        "expected string for enum, got {}",
                        value_type_name(value)
                    ))
                }
            }
            ParamType::Optional(inner) => {
                if value.is_null() {
                    Ok(())
                } else {
                    inner.validate(value)
                }
            }
        }
    }
}

fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Parameter definition
// =============================================================================

/// A single parameter definition for a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    pub param_type: ParamType,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamDef {
    pub fn required(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: String::new(),
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, param_type: ParamType, default: Value) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: String::new(),
            default: Some(default),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none() && !matches!(self.param_type, ParamType::Optional(_))
    }
}

// =============================================================================
// Policies
// =============================================================================

/// Cache policy for a tool's results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachePolicy {
    pub enabled: bool,

    /// Absolute entry lifetime; reads never extend it.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

impl CachePolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ttl: Duration::ZERO,
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(3600),
        }
    }
}

/// Rate quota: at most `max_calls` per caller per `window`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateQuota {
    pub max_calls: u32,

    #[serde(with = "humantime_serde")]
    pub window: Duration,
}

impl Default for RateQuota {
    fn default() -> Self {
        Self {
            max_calls: 60,
            window: Duration::from_secs(60),
        }
    }
}

// =============================================================================
// Tool definition
// =============================================================================

/// Complete tool metadata entry. Immutable after registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamDef>,

    /// Resource names this tool needs; each must resolve in the registry
    /// before the tool can be dispatched.
    #[serde(default)]
    pub required_resources: Vec<String>,

    #[serde(default)]
    pub cache: CachePolicy,

    #[serde(default)]
    pub quota: RateQuota,

    /// Per-attempt deadline override; engine default applies when absent.
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl ToolDefinition {
    /// Validate parameters against this tool's definitions.
    ///
    /// Returns a list of validation errors (empty = valid).
    pub fn validate_params(&self, params: &Value) -> crate::types::Result<Vec<String>> {
        let param_map = params
            .as_object()
            .ok_or_else(|| Error::schema("Parameters must be a JSON object"))?;

        let mut errors = Vec::new();

        // Check required parameters are present
        for param_def in &self.parameters {
            if param_def.is_required() && !param_map.contains_key(&param_def.name) {
                errors.push(format!("Missing required parameter: {}", param_def.name));
            }
        }

        // Build param name lookup for checking unknown params
        let known_names: HashMap<&str, &ParamDef> = self
            .parameters
            .iter()
            .map(|p| (p.name.as_str(), p))
            .collect();

        // Validate types of provided parameters
        for (key, value) in param_map {
            if let Some(param_def) = known_names.get(key.as_str()) {
                if let Err(e) = param_def.param_type.validate(value) {
                    errors.push(format!("Parameter '{}': {}", key, e));
                }
            } else {
                errors.push(format!("Unknown parameter: {}", key));
            }
        }

        Ok(errors)
    }

    /// Fill in default values for missing optional parameters.
    pub fn fill_defaults(&self, params: &mut Value) {
        if let Some(map) = params.as_object_mut() {
            for param_def in &self.parameters {
                if !map.contains_key(&param_def.name) {
                    if let Some(default) = &param_def.default {
                        map.insert(param_def.name.clone(), default.clone());
                    }
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
