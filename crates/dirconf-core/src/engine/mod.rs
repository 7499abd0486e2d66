//! Reconciler
//!
//! The Reconciler is responsible for:
//! - Validating the desired configuration against the registered resources
//! - Planning the changes that converge the server to it
//! - Applying a plan with retry, persisting state after every success
//! - Refreshing recorded state from the server and importing objects
//!
//! ## Architecture
//!
//! ```text
//!   desired config
//!         │
//!         ▼
//! ┌──────────────┐        ┌──────────────────┐
//! │  Reconciler  │───────►│ ResourceRegistry │  type name → Resource
//! └──────────────┘        └──────────────────┘
//!         │
//!         ├──────────────────────────┬───────────────────────────┐
//!         ▼                          ▼                           ▼
//! ┌─────────────┐           ┌──────────────┐           ┌─────────────┐
//! │ StateStore  │           │  ConfigApi   │           │   Events    │
//! │ (recorded)  │           │ (REST calls) │           │  (notify)   │
//! └─────────────┘           └──────────────┘           └─────────────┘
//! ```
//!
//! ## Apply Flow
//!
//! 1. Each pending change is executed in plan order
//! 2. Retryable failures are retried up to `max_retries` times
//! 3. On success the new state is written to the StateStore
//! 4. A failed change is reported and the remaining changes still run

mod plan;

pub use plan::{
    ApplySummary, ChangeAction, FailedChange, Plan, PlanCounts, PlannedChange, RefreshSummary,
};

use crate::config::{DesiredConfig, DirconfConfig, ResourceAddress};
use crate::error::{Error, Result};
use crate::registry::ResourceRegistry;
use crate::traits::{Applied, ConfigApi, Lifecycle, Resource, StateRecord, StateStore};
use crate::version::ProductVersion;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Apply started
    Started { changes: usize },

    /// Plan computed
    PlanComputed {
        add: usize,
        change: usize,
        replace: usize,
        destroy: usize,
    },

    /// A change is about to be executed
    ChangeStarted { address: String, action: String },

    /// A change was applied
    ChangeSucceeded {
        address: String,
        action: String,
        /// Notifications and required actions returned by the server
        warnings: Vec<String>,
    },

    /// A change failed after all attempts
    ChangeFailed {
        address: String,
        error: String,
        attempts: usize,
    },

    /// The server no longer matches the recorded state
    DriftDetected { address: String, detail: String },

    /// An existing object was brought under management
    ResourceImported { address: String, id: String },

    /// Apply finished
    Stopped { reason: String },
}

/// Converges a directory server's configuration to a desired configuration
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`]
/// 2. Optionally [`Reconciler::refresh()`] to pick up changes made outside
/// 3. [`Reconciler::plan()`] against a [`DesiredConfig`]
/// 4. [`Reconciler::apply()`] the plan
///
/// ## Load Resistance
///
/// Events go through a bounded channel. When the receiver falls behind,
/// events are dropped with a warning rather than buffered without limit.
pub struct Reconciler {
    /// Configuration API client
    api: Box<dyn ConfigApi>,

    /// Recorded state of managed objects
    state_store: Box<dyn StateStore>,

    /// Resource types
    registry: Arc<ResourceRegistry>,

    /// Release of the server being configured
    product_version: ProductVersion,

    /// Maximum retry attempts
    max_retries: usize,

    /// Delay between retries (in seconds)
    retry_delay_secs: u64,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver) where event_receiver yields engine events
    pub fn new(
        api: Box<dyn ConfigApi>,
        state_store: Box<dyn StateStore>,
        registry: Arc<ResourceRegistry>,
        config: DirconfConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let reconciler = Self {
            api,
            state_store,
            registry,
            product_version: config.connection.product_version,
            max_retries: config.engine.max_retries,
            retry_delay_secs: config.engine.retry_delay_secs,
            event_tx: tx,
        };

        Ok((reconciler, rx))
    }

    /// Check a desired configuration without calling the server
    ///
    /// Rejects addresses that would not read back from state, duplicate
    /// addresses, unknown resource types, types the configured product
    /// version does not have, attributes the schema does not accept, empty
    /// object names, and two resources naming the same server object.
    pub fn validate(&self, desired: &DesiredConfig) -> Result<()> {
        let mut addresses = HashSet::new();
        let mut objects = HashSet::new();

        for entry in &desired.resources {
            let address = entry.address();
            check_address(&address)?;
            if !addresses.insert(address.clone()) {
                return Err(Error::config(format!("Duplicate resource address: {}", address)));
            }

            let resource = self.resource_for(&address)?;
            resource.validate(&entry.attributes)?;

            let id = resource.resource_id(&entry.attributes)?;
            check_object_name(resource.as_ref(), &id)?;
            if !objects.insert((entry.resource_type.clone(), id.clone())) {
                return Err(Error::config(format!(
                    "{} manages {} '{}', which another resource already manages",
                    address, entry.resource_type, id
                )));
            }
        }

        Ok(())
    }

    /// Compute the changes that converge the server to `desired`
    ///
    /// Desired resources are planned in order; recorded resources that are
    /// no longer desired are deleted after them.
    pub async fn plan(&self, desired: &DesiredConfig) -> Result<Plan> {
        self.validate(desired)?;

        let mut changes = Vec::with_capacity(desired.resources.len());
        let mut wanted = HashSet::new();

        for entry in &desired.resources {
            let address = entry.address();
            let key = address.to_string();
            wanted.insert(key.clone());

            let resource = self.resource_for(&address)?;
            let state = self.state_store.get(&key).await?;
            let action = match &state {
                None => match resource.lifecycle() {
                    Lifecycle::Standard => ChangeAction::Create,
                    Lifecycle::Existing => ChangeAction::Adopt,
                },
                Some(record) => {
                    let reasons = resource.replace_triggers(&entry.attributes, &record.attributes);
                    if !reasons.is_empty() {
                        ChangeAction::Replace { reasons }
                    } else {
                        let operations =
                            resource.plan_operations(&entry.attributes, &record.attributes)?;
                        if operations.is_empty() {
                            ChangeAction::NoOp
                        } else {
                            ChangeAction::Update {
                                operations: resource.wire_format().redact_operations(&operations),
                            }
                        }
                    }
                }
            };

            debug!("Planned {} for {}", action, key);
            changes.push(PlannedChange {
                address,
                action,
                desired: Some(entry.attributes.clone()),
                state,
            });
        }

        for key in self.state_store.list().await? {
            if wanted.contains(&key) {
                continue;
            }
            if let Some(change) = self.planned_delete(&key).await? {
                changes.push(change);
            }
        }

        let plan = Plan { changes };
        self.emit_plan_computed(&plan);
        Ok(plan)
    }

    /// Plan the deletion of every recorded resource
    pub async fn plan_destroy(&self) -> Result<Plan> {
        let mut changes = Vec::new();
        for key in self.state_store.list().await? {
            if let Some(change) = self.planned_delete(&key).await? {
                changes.push(change);
            }
        }

        let plan = Plan { changes };
        self.emit_plan_computed(&plan);
        Ok(plan)
    }

    /// Execute a plan
    ///
    /// Failed changes do not stop the run; they are listed in the summary.
    pub async fn apply(&self, plan: &Plan) -> Result<ApplySummary> {
        let pending = plan.pending().count();
        self.emit_event(EngineEvent::Started { changes: pending });
        info!("Applying {} change(s)", pending);

        let mut summary = ApplySummary::default();
        summary.unchanged = plan.changes.len() - pending;

        for change in plan.pending() {
            let key = change.address.to_string();
            self.emit_event(EngineEvent::ChangeStarted {
                address: key.clone(),
                action: change.action.name().to_string(),
            });

            match self.apply_change(change).await {
                Ok(warnings) => {
                    info!("{}: {} complete", key, change.action);
                    match change.action {
                        ChangeAction::Create | ChangeAction::Adopt => summary.created += 1,
                        ChangeAction::Update { .. } => summary.updated += 1,
                        ChangeAction::Replace { .. } => summary.replaced += 1,
                        ChangeAction::Delete => summary.deleted += 1,
                        ChangeAction::NoOp => {}
                    }
                    summary
                        .warnings
                        .extend(warnings.iter().map(|w| format!("{}: {}", key, w)));
                    self.emit_event(EngineEvent::ChangeSucceeded {
                        address: key,
                        action: change.action.name().to_string(),
                        warnings,
                    });
                }
                Err((e, attempts)) => {
                    error!("{}: {} failed: {}", key, change.action, e);
                    self.emit_event(EngineEvent::ChangeFailed {
                        address: key.clone(),
                        error: e.to_string(),
                        attempts,
                    });
                    summary.failed.push(FailedChange {
                        address: key,
                        action: change.action.name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        self.state_store.flush().await?;
        info!("{}", summary);
        self.emit_event(EngineEvent::Stopped {
            reason: if summary.is_success() {
                "Apply complete".to_string()
            } else {
                format!("{} change(s) failed", summary.failed.len())
            },
        });

        Ok(summary)
    }

    /// Re-read every recorded object and update the state to match
    ///
    /// Objects deleted outside dirconf are dropped from the state, so the
    /// next plan creates them again.
    pub async fn refresh(&self) -> Result<RefreshSummary> {
        let mut summary = RefreshSummary::default();

        for key in self.state_store.list().await? {
            let Some(record) = self.state_store.get(&key).await? else {
                continue;
            };
            let resource = match self.registry.resource(&record.resource_type) {
                Some(resource) => resource,
                None => {
                    warn!("Skipping {}: resource type {} is not registered", key, record.resource_type);
                    continue;
                }
            };
            summary.checked += 1;

            let attributes = &record.attributes;
            let api = self.api.as_ref();
            let resource_ref = resource.as_ref();
            let observed = self
                .with_retry(&key, move || resource_ref.read(api, attributes))
                .await;

            match observed {
                Ok(None) => {
                    self.state_store.delete(&key).await?;
                    self.emit_event(EngineEvent::DriftDetected {
                        address: key.clone(),
                        detail: "deleted outside dirconf".to_string(),
                    });
                    summary.removed.push(key);
                }
                Ok(Some(attributes)) if attributes != record.attributes => {
                    let updated = StateRecord::new(&record.resource_type, &record.id, attributes);
                    self.state_store.set(&key, &updated).await?;
                    self.emit_event(EngineEvent::DriftDetected {
                        address: key.clone(),
                        detail: "changed outside dirconf".to_string(),
                    });
                    summary.changed.push(key);
                }
                Ok(Some(_)) => debug!("{} is unchanged", key),
                Err((e, _)) => {
                    error!("Failed to refresh {}: {}", key, e);
                    summary.failed.push(FailedChange {
                        address: key,
                        action: "refresh".to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        self.state_store.flush().await?;
        info!("{}", summary);
        Ok(summary)
    }

    /// Bring an existing server object under management at `address`
    pub async fn import(&self, address: &ResourceAddress, id: &str) -> Result<StateRecord> {
        check_address(address)?;
        let key = address.to_string();
        let resource = self.resource_for(address)?;
        check_object_name(resource.as_ref(), id)?;

        if self.state_store.get(&key).await?.is_some() {
            return Err(Error::conflict(format!("{} is already managed", key)));
        }

        let api = self.api.as_ref();
        let resource_ref = resource.as_ref();
        let applied = self
            .with_retry(&key, move || resource_ref.import(api, id))
            .await
            .map_err(|(e, _)| e)?;

        let record = StateRecord::new(
            resource.type_name(),
            resource.resource_id(&applied.state)?,
            applied.state,
        );
        self.state_store.set(&key, &record).await?;
        self.state_store.flush().await?;

        info!("Imported {} as {}", record.id, key);
        self.emit_event(EngineEvent::ResourceImported {
            address: key,
            id: record.id.clone(),
        });
        Ok(record)
    }

    /// Recorded state, sorted by address, with sensitive values masked
    pub async fn show(&self) -> Result<Vec<(String, StateRecord)>> {
        let mut records = Vec::new();
        for key in self.state_store.list().await? {
            if let Some(mut record) = self.state_store.get(&key).await? {
                if let Some(resource) = self.registry.resource(&record.resource_type) {
                    record.attributes = resource.schema().redact(&record.attributes);
                }
                records.push((key, record));
            }
        }
        Ok(records)
    }

    /// Persist any pending state
    pub async fn flush(&self) -> Result<()> {
        self.state_store.flush().await
    }

    fn resource_for(&self, address: &ResourceAddress) -> Result<Arc<dyn Resource>> {
        let resource = self.registry.require_resource(&address.resource_type)?;

        let required = resource.min_product_version();
        if self.product_version < required {
            return Err(Error::UnsupportedVersion {
                resource_type: address.resource_type.clone(),
                required: required.to_string(),
                configured: self.product_version.to_string(),
            });
        }

        Ok(resource)
    }

    async fn planned_delete(&self, key: &str) -> Result<Option<PlannedChange>> {
        let Some(record) = self.state_store.get(key).await? else {
            return Ok(None);
        };
        // Keys written before addresses were checked may not parse; the
        // record still says which type they are
        let address = key.parse::<ResourceAddress>().unwrap_or_else(|e| {
            warn!("{}; planning its deletion anyway", e);
            let name = key
                .strip_prefix(record.resource_type.as_str())
                .and_then(|rest| rest.strip_prefix('.'))
                .unwrap_or(key);
            ResourceAddress::new(&record.resource_type, name)
        });

        Ok(Some(PlannedChange {
            address,
            action: ChangeAction::Delete,
            desired: None,
            state: Some(record),
        }))
    }

    /// Execute one change; returns the server's warnings or the last error
    /// with the number of attempts made
    async fn apply_change(
        &self,
        change: &PlannedChange,
    ) -> std::result::Result<Vec<String>, (Error, usize)> {
        let key = change.address.to_string();
        let resource = self
            .registry
            .require_resource(&change.address.resource_type)
            .map_err(|e| (e, 0))?;
        let resource = resource.as_ref();
        let api = self.api.as_ref();

        let missing = |what: &str| {
            (
                Error::Other(format!("{} has no {} to {}", key, what, change.action)),
                0,
            )
        };

        match &change.action {
            ChangeAction::Create | ChangeAction::Adopt => {
                let desired = change.desired.as_ref().ok_or_else(|| missing("desired attributes"))?;
                let applied = self
                    .with_retry(&key, move || resource.create(api, desired))
                    .await?;
                self.record(&key, resource, applied).await
            }
            ChangeAction::Update { .. } => {
                let desired = change.desired.as_ref().ok_or_else(|| missing("desired attributes"))?;
                let state = change.state.as_ref().ok_or_else(|| missing("state"))?;
                let prior = &state.attributes;
                let applied = self
                    .with_retry(&key, move || resource.update(api, desired, prior))
                    .await?;
                self.record(&key, resource, applied).await
            }
            ChangeAction::Replace { reasons } => {
                let desired = change.desired.as_ref().ok_or_else(|| missing("desired attributes"))?;
                let state = change.state.as_ref().ok_or_else(|| missing("state"))?;
                let prior = &state.attributes;
                info!("Replacing {} ({})", key, reasons.join(", "));

                self.with_retry(&key, move || resource.delete(api, prior))
                    .await?;
                self.state_store.delete(&key).await.map_err(|e| (e, 1))?;

                let applied = self
                    .with_retry(&key, move || resource.create(api, desired))
                    .await?;
                self.record(&key, resource, applied).await
            }
            ChangeAction::Delete => {
                let state = change.state.as_ref().ok_or_else(|| missing("state"))?;
                let prior = &state.attributes;
                self.with_retry(&key, move || resource.delete(api, prior))
                    .await?;
                self.state_store.delete(&key).await.map_err(|e| (e, 1))?;
                Ok(Vec::new())
            }
            ChangeAction::NoOp => Ok(Vec::new()),
        }
    }

    async fn record(
        &self,
        key: &str,
        resource: &dyn Resource,
        applied: Applied,
    ) -> std::result::Result<Vec<String>, (Error, usize)> {
        let Applied { state, messages } = applied;
        let id = resource.resource_id(&state).map_err(|e| (e, 1))?;
        let record = StateRecord::new(resource.type_name(), id, state);
        self.state_store.set(key, &record).await.map_err(|e| (e, 1))?;
        Ok(messages.warnings())
    }

    /// Run `call` until it succeeds, fails with a non-retryable error, or
    /// `max_retries` retries are used up
    async fn with_retry<T, F, Fut>(
        &self,
        address: &str,
        mut call: F,
    ) -> std::result::Result<T, (Error, usize)>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt <= self.max_retries => {
                    warn!("Attempt {} failed for {}: {}", attempt, address, e);
                    tokio::time::sleep(Duration::from_secs(self.retry_delay_secs)).await;
                }
                Err(e) => return Err((e, attempt)),
            }
        }
    }

    fn emit_plan_computed(&self, plan: &Plan) {
        let counts = plan.counts();
        info!("{}", counts);
        self.emit_event(EngineEvent::PlanComputed {
            add: counts.add,
            change: counts.change,
            replace: counts.replace,
            destroy: counts.destroy,
        });
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        // Dropped when the receiver is gone or behind
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

/// Reject addresses that would not read back from their state key
fn check_address(address: &ResourceAddress) -> Result<()> {
    match address.to_string().parse::<ResourceAddress>() {
        Ok(parsed) if parsed == *address => Ok(()),
        _ => Err(Error::config(format!(
            "Invalid resource address '{}': type and name must be non-empty and the type cannot contain '.'",
            address
        ))),
    }
}

/// Collection objects need a name, or requests would target the collection
fn check_object_name(resource: &dyn Resource, id: &str) -> Result<()> {
    if resource.lifecycle() == Lifecycle::Standard && id.trim().is_empty() {
        return Err(Error::schema(
            resource.type_name(),
            "the object name (id) cannot be empty",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_event_equality() {
        let event = EngineEvent::ChangeStarted {
            address: "location.east".to_string(),
            action: "create".to_string(),
        };
        assert_eq!(event.clone(), event);
    }

    #[test]
    fn test_check_address() {
        assert!(check_address(&ResourceAddress::new("location", "east.coast")).is_ok());
        assert!(check_address(&ResourceAddress::new("location", "")).is_err());
        assert!(check_address(&ResourceAddress::new("", "east")).is_err());
        assert!(check_address(&ResourceAddress::new("my.location", "east")).is_err());
    }
}
