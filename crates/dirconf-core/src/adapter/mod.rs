//! Generic resource lifecycle
//!
//! [`TypedResource`] wraps a [`ResourceAdapter`] and implements the
//! Create/Read/Update/Delete/Import flow against a [`ConfigApi`]:
//!
//! | call   | standard object                      | existing (singleton) object        |
//! |--------|--------------------------------------|------------------------------------|
//! | create | POST add request                     | GET, then PATCH what differs       |
//! | read   | GET; 404 means gone                  | GET                                |
//! | update | PATCH what differs (nothing if none) | same                               |
//! | delete | DELETE; 404 tolerated                | nothing on the server              |
//! | import | GET by id                            | GET                                |

use crate::diff::{Operation, WireFormat};
use crate::error::{Error, Result};
use crate::schema::ResourceSchema;
use crate::traits::config_api::{ApiResponse, ConfigApi, ObjectPath};
use crate::traits::resource_adapter::{Applied, Endpoint, Lifecycle, Resource, ResourceAdapter};
use crate::version::ProductVersion;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

/// [`Resource`] implementation for any [`ResourceAdapter`]
pub struct TypedResource<A: ResourceAdapter> {
    adapter: A,
    schema: ResourceSchema,
    wire: WireFormat,
}

impl<A: ResourceAdapter> TypedResource<A> {
    /// Wrap an adapter
    pub fn new(adapter: A) -> Self {
        let schema = adapter.schema();
        let wire = adapter
            .irregular_keys()
            .iter()
            .fold(WireFormat::for_schema(&schema), |wire, (path, key)| {
                wire.with_key(*path, *key)
            });
        Self {
            adapter,
            schema,
            wire,
        }
    }

    /// The wrapped adapter
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    fn decode(&self, attributes: &Value) -> Result<A::Model> {
        serde_json::from_value(attributes.clone())
            .map_err(|e| Error::schema(self.adapter.type_name(), e.to_string()))
    }

    fn encode(&self, model: &A::Model) -> Result<Value> {
        Ok(serde_json::to_value(model)?)
    }

    fn path(&self, model: &A::Model) -> ObjectPath {
        self.adapter.endpoint().path(&self.adapter.id(model))
    }

    /// Map a response onto `model` and produce the state to record
    fn absorb(&self, response: ApiResponse, mut model: A::Model) -> Result<Applied> {
        let ApiResponse { object, messages } = response;
        let typed: A::Response = serde_json::from_value(object).map_err(|e| {
            Error::config_api(format!(
                "Unexpected {} response: {}",
                self.adapter.type_name(),
                e
            ))
        })?;
        self.adapter.read_response(typed, &mut model);

        for warning in messages.warnings() {
            warn!("{}: {}", self.adapter.type_name(), warning);
        }

        Ok(Applied {
            state: self.encode(&model)?,
            messages,
        })
    }

    async fn adopt(&self, api: &dyn ConfigApi, plan: A::Model) -> Result<Applied> {
        let path = self.path(&plan);
        let current = api.get(&path).await?;

        let observed = self.absorb(current, plan.clone())?;
        let observed_model = self.decode(&observed.state)?;
        let operations = self.adapter.operations(&plan, &observed_model);
        if operations.is_empty() {
            debug!("Adopted {} without changes", path);
            return Ok(observed);
        }

        info!("Adopting {} with {} operation(s)", path, operations.len());
        let response = api.patch(&path, &operations, &self.wire).await?;
        self.absorb(response, plan)
    }
}

#[async_trait]
impl<A: ResourceAdapter> Resource for TypedResource<A> {
    fn type_name(&self) -> &'static str {
        self.adapter.type_name()
    }

    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    fn wire_format(&self) -> &WireFormat {
        &self.wire
    }

    fn lifecycle(&self) -> Lifecycle {
        self.adapter.endpoint().lifecycle()
    }

    fn min_product_version(&self) -> ProductVersion {
        self.adapter.min_product_version()
    }

    fn validate(&self, desired: &Value) -> Result<()> {
        self.schema.validate(self.adapter.type_name(), desired)?;
        self.decode(desired)?;
        Ok(())
    }

    fn resource_id(&self, attributes: &Value) -> Result<String> {
        let model = self.decode(attributes)?;
        Ok(self.adapter.id(&model))
    }

    fn plan_operations(&self, desired: &Value, state: &Value) -> Result<Vec<Operation>> {
        let plan = self.decode(desired)?;
        let prior = self.decode(state)?;
        Ok(self.adapter.operations(&plan, &prior))
    }

    async fn create(&self, api: &dyn ConfigApi, desired: &Value) -> Result<Applied> {
        let plan = self.decode(desired)?;

        match self.adapter.endpoint() {
            Endpoint::Collection(collection) => {
                let body = serde_json::to_value(self.adapter.add_request(&plan))?;
                debug!(
                    "Add request for {} {}",
                    self.adapter.type_name(),
                    self.adapter.id(&plan)
                );
                let response = api.create(collection, body, &self.wire).await?;
                self.absorb(response, plan)
            }
            Endpoint::Singleton(_) => self.adopt(api, plan).await,
        }
    }

    async fn read(&self, api: &dyn ConfigApi, state: &Value) -> Result<Option<Value>> {
        let prior = self.decode(state)?;
        let path = self.path(&prior);

        match api.get(&path).await {
            Ok(response) => Ok(Some(self.absorb(response, prior)?.state)),
            Err(e) if e.is_not_found() => {
                warn!("{} no longer exists on the server", path);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn update(&self, api: &dyn ConfigApi, desired: &Value, state: &Value) -> Result<Applied> {
        let plan = self.decode(desired)?;
        let prior = self.decode(state)?;
        let path = self.path(&prior);

        let operations = self.adapter.operations(&plan, &prior);
        if operations.is_empty() {
            debug!("No changes for {}", path);
            return Ok(Applied {
                state: state.clone(),
                messages: Default::default(),
            });
        }

        debug!("Patching {} with {} operation(s)", path, operations.len());
        let response = api.patch(&path, &operations, &self.wire).await?;
        self.absorb(response, plan)
    }

    async fn delete(&self, api: &dyn ConfigApi, state: &Value) -> Result<()> {
        let prior = self.decode(state)?;
        let path = self.path(&prior);

        if self.lifecycle() == Lifecycle::Existing {
            debug!("{} cannot be deleted, removing it from state only", path);
            return Ok(());
        }

        match api.delete(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                debug!("{} was already deleted", path);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn import(&self, api: &dyn ConfigApi, id: &str) -> Result<Applied> {
        let model = self.adapter.model_for_import(id);
        let response = api.get(&self.path(&model)).await?;
        self.absorb(response, model)
    }
}
