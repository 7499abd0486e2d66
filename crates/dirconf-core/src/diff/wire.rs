//! JSON shape of a configuration object type
//!
//! Operations address properties by hyphenated path, while request and
//! response bodies use JSON keys. Most keys are the lowerCamelCase of the
//! path; [`WireFormat`] records the exceptions (`invokeGCTimeUtc`,
//! `baseDN`) and the properties whose values must never be shown.

use super::{Operation, OperationKind};
use crate::error::{Error, Result};
use crate::schema::{REDACTED, ResourceSchema};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Map a hyphenated property path to the JSON key the API usually uses for it
///
/// `invoke-gc-time-utc` becomes `invokeGcTimeUtc`. Irregular keys are
/// declared on a [`WireFormat`].
pub fn json_key_for_path(path: &str) -> String {
    let mut key = String::with_capacity(path.len());
    let mut upper_next = false;
    for c in path.chars() {
        if c == '-' {
            upper_next = true;
        } else if upper_next {
            key.extend(c.to_uppercase());
            upper_next = false;
        } else {
            key.push(c);
        }
    }
    key
}

/// Property names and sensitivity of one object type, as sent on the wire
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireFormat {
    /// Path → JSON key, only where the key is not the camelCase of the path
    keys: BTreeMap<String, String>,
    /// Paths of sensitive properties
    sensitive: BTreeSet<String>,
}

impl WireFormat {
    /// Regular keys, nothing sensitive
    pub fn new() -> Self {
        Self::default()
    }

    /// Sensitive properties taken from a schema
    ///
    /// Attribute `trust_store_pin` is property `trust-store-pin`.
    pub fn for_schema(schema: &ResourceSchema) -> Self {
        schema
            .attributes
            .iter()
            .filter(|a| a.sensitive)
            .fold(Self::new(), |wire, a| wire.with_sensitive(a.name.replace('_', "-")))
    }

    /// Declare the JSON key of a property whose key is irregular
    pub fn with_key(mut self, path: impl Into<String>, key: impl Into<String>) -> Self {
        self.keys.insert(path.into(), key.into());
        self
    }

    /// Mark a property as sensitive
    pub fn with_sensitive(mut self, path: impl Into<String>) -> Self {
        self.sensitive.insert(path.into());
        self
    }

    /// JSON key of the property at `path`
    pub fn json_key(&self, path: &str) -> String {
        self.keys
            .get(path)
            .cloned()
            .unwrap_or_else(|| json_key_for_path(path))
    }

    /// Whether values of the property at `path` must be masked
    pub fn is_sensitive(&self, path: &str) -> bool {
        self.sensitive.contains(path)
    }

    /// Copy of a request or response body with sensitive values masked
    pub fn redact_body(&self, body: &Value) -> Value {
        let mut redacted = body.clone();
        if let Some(map) = redacted.as_object_mut() {
            for path in &self.sensitive {
                if let Some(value) = map.get_mut(&self.json_key(path))
                    && !value.is_null()
                {
                    *value = Value::from(REDACTED);
                }
            }
        }
        redacted
    }

    /// Copy of `operations` with the values of sensitive properties masked
    pub fn redact_operations(&self, operations: &[Operation]) -> Vec<Operation> {
        operations
            .iter()
            .cloned()
            .map(|mut op| {
                if op.value.is_some() && self.is_sensitive(&op.path) {
                    op.value = Some(Value::from(REDACTED));
                }
                op
            })
            .collect()
    }
}

/// Apply operations to a JSON object the way the server would
///
/// Used to preview PATCH results without sending them.
pub fn apply_operations(object: &mut Value, operations: &[Operation], wire: &WireFormat) -> Result<()> {
    let map = object
        .as_object_mut()
        .ok_or_else(|| Error::invalid_input("operations can only be applied to a JSON object"))?;

    for operation in operations {
        let key = wire.json_key(&operation.path);
        match (operation.op, &operation.value) {
            (OperationKind::Replace, Some(value)) => {
                map.insert(key, value.clone());
            }
            (OperationKind::Remove, None) => {
                map.remove(&key);
            }
            (OperationKind::Remove, Some(Value::Array(values))) => {
                if let Some(Value::Array(existing)) = map.get_mut(&key) {
                    existing.retain(|v| !values.contains(v));
                }
            }
            (OperationKind::Remove, Some(value)) => {
                if map.get(&key) == Some(value) {
                    map.remove(&key);
                }
            }
            (OperationKind::Add, Some(Value::Array(values))) => {
                let entry = map
                    .entry(key)
                    .or_insert_with(|| Value::Array(Vec::new()));
                if !entry.is_array() {
                    *entry = Value::Array(Vec::new());
                }
                if let Value::Array(existing) = entry {
                    for value in values {
                        if !existing.contains(value) {
                            existing.push(value.clone());
                        }
                    }
                }
            }
            (OperationKind::Add, Some(value)) => {
                map.insert(key, value.clone());
            }
            (OperationKind::Add | OperationKind::Replace, None) => {
                return Err(Error::invalid_input(format!(
                    "{} operation on '{}' has no value",
                    operation.op, operation.path
                )));
            }
        }
    }

    Ok(())
}
