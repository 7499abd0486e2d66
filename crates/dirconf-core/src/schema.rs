//! Resource schemas
//!
//! A schema lists the attributes a resource type accepts in the desired
//! configuration and how each behaves: whether it is required, whether a
//! change forces the object to be recreated, whether it is sensitive.

use crate::error::{Error, Result};
use serde_json::Value;

/// Placeholder shown instead of sensitive values
pub const REDACTED: &str = "(sensitive)";

/// Value type of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// Single string
    String,
    /// Boolean
    Bool,
    /// 64-bit integer
    Int64,
    /// Unordered set of strings
    StringSet,
}

impl AttributeKind {
    fn matches(&self, value: &Value) -> bool {
        match self {
            AttributeKind::String => value.is_string(),
            AttributeKind::Bool => value.is_boolean(),
            AttributeKind::Int64 => value.is_i64(),
            AttributeKind::StringSet => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            AttributeKind::String => "string",
            AttributeKind::Bool => "bool",
            AttributeKind::Int64 => "integer",
            AttributeKind::StringSet => "set of strings",
        }
    }
}

/// One attribute of a resource schema
#[derive(Debug, Clone)]
pub struct Attribute {
    /// Attribute name in the desired configuration (snake_case)
    pub name: &'static str,
    /// Value type
    pub kind: AttributeKind,
    /// Must be present in the desired configuration
    pub required: bool,
    /// A change to this attribute destroys and recreates the object
    pub requires_replace: bool,
    /// Never shown in plans or logs
    pub sensitive: bool,
    /// Permitted values for string and set attributes (empty = any)
    pub allowed_values: &'static [&'static str],
    /// Human-readable description
    pub description: &'static str,
}

impl Attribute {
    fn new(name: &'static str, kind: AttributeKind, required: bool) -> Self {
        Self {
            name,
            kind,
            required,
            requires_replace: false,
            sensitive: false,
            allowed_values: &[],
            description: "",
        }
    }

    /// Required string attribute
    pub fn required_string(name: &'static str) -> Self {
        Self::new(name, AttributeKind::String, true)
    }

    /// Optional string attribute
    pub fn optional_string(name: &'static str) -> Self {
        Self::new(name, AttributeKind::String, false)
    }

    /// Required boolean attribute
    pub fn required_bool(name: &'static str) -> Self {
        Self::new(name, AttributeKind::Bool, true)
    }

    /// Optional boolean attribute
    pub fn optional_bool(name: &'static str) -> Self {
        Self::new(name, AttributeKind::Bool, false)
    }

    /// Optional integer attribute
    pub fn optional_int64(name: &'static str) -> Self {
        Self::new(name, AttributeKind::Int64, false)
    }

    /// Required set-of-strings attribute
    pub fn required_set(name: &'static str) -> Self {
        Self::new(name, AttributeKind::StringSet, true)
    }

    /// Optional set-of-strings attribute
    pub fn optional_set(name: &'static str) -> Self {
        Self::new(name, AttributeKind::StringSet, false)
    }

    /// Mark the attribute as forcing replacement when changed
    pub fn requires_replace(mut self) -> Self {
        self.requires_replace = true;
        self
    }

    /// Mark the attribute as sensitive
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Restrict the permitted values
    pub fn one_of(mut self, values: &'static [&'static str]) -> Self {
        self.allowed_values = values;
        self
    }

    /// Attach a description
    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    fn check(&self, value: &Value, problems: &mut Vec<String>) {
        if !self.kind.matches(value) {
            problems.push(format!(
                "attribute '{}' must be a {}",
                self.name,
                self.kind.label()
            ));
            return;
        }
        if self.allowed_values.is_empty() {
            return;
        }

        let candidates: Vec<&str> = match value {
            Value::String(s) => vec![s.as_str()],
            Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        };
        // "" clears the attribute
        for candidate in candidates.into_iter().filter(|c| !c.is_empty()) {
            if !self.allowed_values.contains(&candidate) {
                problems.push(format!(
                    "attribute '{}' does not accept '{}' (allowed: {})",
                    self.name,
                    candidate,
                    self.allowed_values.join(", ")
                ));
            }
        }
    }
}

/// Schema of one resource type
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    /// Human-readable description of the resource type
    pub description: &'static str,
    /// Accepted attributes
    pub attributes: Vec<Attribute>,
}

impl ResourceSchema {
    /// Create a schema with no attributes
    pub fn new(description: &'static str) -> Self {
        Self {
            description,
            attributes: Vec::new(),
        }
    }

    /// Add an attribute
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Look up an attribute by name
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Check desired attributes against the schema
    ///
    /// All problems are collected and reported together.
    pub fn validate(&self, resource_type: &str, desired: &Value) -> Result<()> {
        let object = desired.as_object().ok_or_else(|| {
            Error::schema(resource_type, "attributes must be a JSON object")
        })?;

        let mut problems = Vec::new();

        for name in object.keys() {
            if self.attribute(name).is_none() {
                problems.push(format!("unknown attribute '{}'", name));
            }
        }

        for attribute in &self.attributes {
            match object.get(attribute.name) {
                None | Some(Value::Null) => {
                    if attribute.required {
                        problems.push(format!(
                            "missing required attribute '{}'",
                            attribute.name
                        ));
                    }
                }
                Some(value) => attribute.check(value, &mut problems),
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::schema(resource_type, problems.join("; ")))
        }
    }

    /// Names of requires-replace attributes whose desired value differs
    /// from the recorded state
    pub fn replace_triggers(&self, desired: &Value, state: &Value) -> Vec<String> {
        self.attributes
            .iter()
            .filter(|a| a.requires_replace)
            .filter(|a| {
                let wanted = desired.get(a.name).unwrap_or(&Value::Null);
                let current = state.get(a.name).unwrap_or(&Value::Null);
                !wanted.is_null() && wanted != current
            })
            .map(|a| a.name.to_string())
            .collect()
    }

    /// Copy of `attributes` with sensitive values masked
    pub fn redact(&self, attributes: &Value) -> Value {
        let mut redacted = attributes.clone();
        if let Some(object) = redacted.as_object_mut() {
            for attribute in self.attributes.iter().filter(|a| a.sensitive) {
                if let Some(value) = object.get_mut(attribute.name) {
                    if !value.is_null() {
                        *value = Value::from(REDACTED);
                    }
                }
            }
        }
        redacted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> ResourceSchema {
        ResourceSchema::new("test resource")
            .with_attribute(Attribute::required_string("id").requires_replace())
            .with_attribute(Attribute::required_bool("enabled"))
            .with_attribute(Attribute::optional_int64("size_limit"))
            .with_attribute(Attribute::optional_string("pin").sensitive())
            .with_attribute(Attribute::optional_set("days").one_of(&["monday", "friday"]))
    }

    #[test]
    fn test_valid_attributes_pass() {
        let desired = json!({"id": "a", "enabled": true, "size_limit": 10, "days": ["monday"]});
        assert!(schema().validate("test", &desired).is_ok());
    }

    #[test]
    fn test_all_problems_reported_together() {
        let desired = json!({"enabled": "yes", "colour": "red", "days": ["sunday"]});
        let err = schema().validate("test", &desired).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("unknown attribute 'colour'"));
        assert!(message.contains("missing required attribute 'id'"));
        assert!(message.contains("'enabled' must be a bool"));
        assert!(message.contains("does not accept 'sunday'"));
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(schema().validate("test", &json!(["id"])).is_err());
    }

    #[test]
    fn test_replace_triggers() {
        let schema = schema();
        let state = json!({"id": "a", "enabled": true});
        assert!(schema.replace_triggers(&json!({"id": "a", "enabled": false}), &state).is_empty());
        assert_eq!(
            schema.replace_triggers(&json!({"id": "b", "enabled": true}), &state),
            vec!["id".to_string()]
        );
    }

    #[test]
    fn test_redact_masks_sensitive_values() {
        let redacted = schema().redact(&json!({"id": "a", "pin": "secret"}));
        assert_eq!(redacted["pin"], json!(REDACTED));
        assert_eq!(redacted["id"], json!("a"));
    }
}
