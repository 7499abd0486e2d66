//! Diff reducer
//!
//! Turns a desired model and an observed model into the PATCH operations
//! the configuration API needs to converge them, one field at a time.
//!
//! ```text
//! desired  ─┐
//!           ├─► OperationsBuilder ─► [Operation] ─► PATCH {"operations": [...]}
//! observed ─┘
//! ```
//!
//! Every resource adapter builds its operation list the same way:
//!
//! ```rust
//! use dirconf_core::diff::{OperationKind, OperationsBuilder};
//!
//! let plan_description = Some("east coast".to_string());
//! let state_description = Some("west coast".to_string());
//! let plan_tags = Some(vec!["a".to_string(), "b".to_string()]);
//! let state_tags = Some(vec!["b".to_string()]);
//!
//! let ops = OperationsBuilder::new()
//!     .scalar("description", &plan_description, &state_description)
//!     .set("tag", &plan_tags, &state_tags)
//!     .build();
//!
//! assert_eq!(ops.len(), 2);
//! assert_eq!(ops[0].op, OperationKind::Replace);
//! assert_eq!(ops[1].op, OperationKind::Add);
//! ```
//!
//! ## Unmanaged attributes
//!
//! A `None` in the desired model means the attribute is not managed: the
//! server keeps whatever value it has and no operation is produced. To clear
//! a value, set it to an empty string (scalars) or an empty list (sets).

mod wire;

pub use wire::{WireFormat, apply_operations, json_key_for_path};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// Kind of a single PATCH operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Add values to a multi-valued property
    Add,
    /// Remove a property, or specific values of a multi-valued property
    Remove,
    /// Replace the value of a property
    Replace,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Add => write!(f, "add"),
            OperationKind::Remove => write!(f, "remove"),
            OperationKind::Replace => write!(f, "replace"),
        }
    }
}

/// One PATCH operation against a configuration object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// What to do
    pub op: OperationKind,
    /// Hyphenated property name (e.g. `invoke-gc-time-utc`)
    pub path: String,
    /// Value for add/replace, or the values to drop for a partial remove
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Operation {
    /// Add `value` to the property at `path`
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: OperationKind::Add,
            path: path.into(),
            value: Some(value),
        }
    }

    /// Remove the property at `path` entirely
    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: OperationKind::Remove,
            path: path.into(),
            value: None,
        }
    }

    /// Remove only `values` from the multi-valued property at `path`
    pub fn remove_values(path: impl Into<String>, values: Value) -> Self {
        Self {
            op: OperationKind::Remove,
            path: path.into(),
            value: Some(values),
        }
    }

    /// Replace the property at `path` with `value`
    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: OperationKind::Replace,
            path: path.into(),
            value: Some(value),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{} {} {}", self.op, self.path, value),
            None => write!(f, "{} {}", self.op, self.path),
        }
    }
}

/// Body of a PATCH request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchRequest {
    /// Operations, applied by the server in order
    pub operations: Vec<Operation>,
}

impl PatchRequest {
    /// Wrap a list of operations
    pub fn new(operations: Vec<Operation>) -> Self {
        Self { operations }
    }
}

/// Accumulates operations field by field
///
/// Each method compares one attribute of the desired model against the
/// observed one and appends the operations needed, if any.
#[derive(Debug, Default)]
pub struct OperationsBuilder {
    ops: Vec<Operation>,
}

impl OperationsBuilder {
    /// Start an empty operation list
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare a single-valued attribute
    ///
    /// - `plan` is `None`: unmanaged, nothing to do
    /// - equal values: nothing to do
    /// - `plan` is an empty string: `remove`
    /// - otherwise: `replace` with the desired value
    pub fn scalar<T>(mut self, path: &str, plan: &Option<T>, state: &Option<T>) -> Self
    where
        T: Clone + PartialEq + Into<Value>,
    {
        let Some(desired) = plan else {
            return self;
        };
        if state.as_ref() == Some(desired) {
            return self;
        }

        let value: Value = desired.clone().into();
        if matches!(&value, Value::String(s) if s.is_empty()) {
            if state.is_some() {
                self.ops.push(Operation::remove(path));
            }
        } else {
            self.ops.push(Operation::replace(path, value));
        }
        self
    }

    /// Compare a multi-valued attribute as a set
    ///
    /// Order and duplicates are ignored. An empty desired set removes the
    /// whole property; otherwise the values that disappeared are removed
    /// first, then the new ones are added.
    pub fn set(mut self, path: &str, plan: &Option<Vec<String>>, state: &Option<Vec<String>>) -> Self {
        let Some(plan) = plan else {
            return self;
        };

        let desired: BTreeSet<&str> = plan.iter().map(String::as_str).collect();
        let observed: BTreeSet<&str> = state.iter().flatten().map(String::as_str).collect();
        if desired == observed {
            return self;
        }

        if desired.is_empty() {
            self.ops.push(Operation::remove(path));
            return self;
        }

        let removed: Vec<Value> = observed
            .difference(&desired)
            .map(|v| Value::from(*v))
            .collect();
        let added: Vec<Value> = desired
            .difference(&observed)
            .map(|v| Value::from(*v))
            .collect();

        if !removed.is_empty() {
            self.ops
                .push(Operation::remove_values(path, Value::Array(removed)));
        }
        if !added.is_empty() {
            self.ops.push(Operation::add(path, Value::Array(added)));
        }
        self
    }

    /// Finish and return the operations; empty means no changes
    pub fn build(self) -> Vec<Operation> {
        self.ops
    }
}
