//! Plans and summaries produced by the reconciler

use crate::config::ResourceAddress;
use crate::diff::Operation;
use crate::traits::StateRecord;
use serde_json::Value;
use std::fmt;

/// What applying a planned change does
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeAction {
    /// POST a new object
    Create,
    /// Take over an object that always exists and patch it
    Adopt,
    /// PATCH the object
    Update {
        /// Operations the patch is expected to send (sensitive values masked)
        operations: Vec<Operation>,
    },
    /// Delete the object and create it again
    Replace {
        /// Attributes whose change forces the replacement
        reasons: Vec<String>,
    },
    /// Delete the object (or forget it, when it cannot be deleted)
    Delete,
    /// Already converged
    NoOp,
}

impl ChangeAction {
    /// Short name used in logs and events
    pub fn name(&self) -> &'static str {
        match self {
            ChangeAction::Create => "create",
            ChangeAction::Adopt => "adopt",
            ChangeAction::Update { .. } => "update",
            ChangeAction::Replace { .. } => "replace",
            ChangeAction::Delete => "delete",
            ChangeAction::NoOp => "no-op",
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            ChangeAction::Create | ChangeAction::Adopt => "+",
            ChangeAction::Update { .. } => "~",
            ChangeAction::Replace { .. } => "-/+",
            ChangeAction::Delete => "-",
            ChangeAction::NoOp => " ",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry of a plan
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedChange {
    /// Address of the resource
    pub address: ResourceAddress,
    /// What will happen
    pub action: ChangeAction,
    /// Desired attributes (absent for deletes)
    pub desired: Option<Value>,
    /// Recorded state (absent for creates)
    pub state: Option<StateRecord>,
}

impl PlannedChange {
    /// True unless the change is a no-op
    pub fn is_change(&self) -> bool {
        self.action != ChangeAction::NoOp
    }
}

impl fmt::Display for PlannedChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>3} {} ({})", self.action.symbol(), self.address, self.action)?;
        match &self.action {
            ChangeAction::Update { operations } => {
                for op in operations {
                    write!(f, "\n      {}", op)?;
                }
            }
            ChangeAction::Replace { reasons } => {
                write!(f, "\n      forced by: {}", reasons.join(", "))?;
            }
            _ => {}
        }
        Ok(())
    }
}

/// Ordered list of changes; desired resources first, then deletes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    /// Changes in execution order
    pub changes: Vec<PlannedChange>,
}

impl Plan {
    /// True if applying the plan would call the API
    pub fn has_changes(&self) -> bool {
        self.changes.iter().any(PlannedChange::is_change)
    }

    /// Changes that are not no-ops
    pub fn pending(&self) -> impl Iterator<Item = &PlannedChange> {
        self.changes.iter().filter(|c| c.is_change())
    }

    /// Change planned for an address
    pub fn change_for(&self, address: &str) -> Option<&PlannedChange> {
        self.changes.iter().find(|c| c.address.to_string() == address)
    }

    /// Counts per action: (add, change, replace, destroy, unchanged)
    pub fn counts(&self) -> PlanCounts {
        let mut counts = PlanCounts::default();
        for change in &self.changes {
            match change.action {
                ChangeAction::Create | ChangeAction::Adopt => counts.add += 1,
                ChangeAction::Update { .. } => counts.change += 1,
                ChangeAction::Replace { .. } => counts.replace += 1,
                ChangeAction::Delete => counts.destroy += 1,
                ChangeAction::NoOp => counts.unchanged += 1,
            }
        }
        counts
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for change in self.pending() {
            writeln!(f, "{}", change)?;
        }
        write!(f, "{}", self.counts())
    }
}

/// Number of planned changes per kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanCounts {
    pub add: usize,
    pub change: usize,
    pub replace: usize,
    pub destroy: usize,
    pub unchanged: usize,
}

impl fmt::Display for PlanCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Plan: {} to add, {} to change, {} to replace, {} to destroy.",
            self.add, self.change, self.replace, self.destroy
        )
    }
}

/// A change that could not be applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedChange {
    /// Address of the resource
    pub address: String,
    /// Action that failed
    pub action: String,
    /// Last error
    pub error: String,
}

/// Outcome of applying a plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub created: usize,
    pub updated: usize,
    pub replaced: usize,
    pub deleted: usize,
    pub unchanged: usize,
    /// Warnings the server attached to successful responses
    pub warnings: Vec<String>,
    pub failed: Vec<FailedChange>,
}

impl ApplySummary {
    /// True when every change was applied
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for ApplySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Apply complete: {} added, {} changed, {} replaced, {} destroyed, {} failed.",
            self.created,
            self.updated,
            self.replaced,
            self.deleted,
            self.failed.len()
        )
    }
}

/// Outcome of refreshing recorded state from the server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Records read
    pub checked: usize,
    /// Records whose attributes changed on the server
    pub changed: Vec<String>,
    /// Records whose object no longer exists
    pub removed: Vec<String>,
    /// Records that could not be read
    pub failed: Vec<FailedChange>,
}

impl fmt::Display for RefreshSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Refresh complete: {} checked, {} changed, {} removed, {} failed.",
            self.checked,
            self.changed.len(),
            self.removed.len(),
            self.failed.len()
        )
    }
}
