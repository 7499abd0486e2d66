// # Resource Adapter Traits
//
// Two layers describe a configuration object type:
//
// - [`ResourceAdapter`]: typed, written once per object type. It owns the
//   model, the API request/response shapes, the schema and the field-level
//   diff. It performs no I/O.
// - [`Resource`]: object-safe, driven by the `Reconciler` with JSON values.
//   `TypedResource` implements it for every adapter, so the
//   Create/Read/Update/Delete/Import flow is written exactly once.

use crate::diff::{Operation, WireFormat};
use crate::schema::ResourceSchema;
use crate::traits::config_api::{ConfigApi, ConfigMessages, ObjectPath};
use crate::version::ProductVersion;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Debug;

/// Where objects of a resource type live in the configuration API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Named objects inside a collection (`plugins/<name>`)
    Collection(&'static str),
    /// A single object that always exists (`global-configuration`)
    Singleton(&'static str),
}

impl Endpoint {
    /// Path of the object with the given id
    pub fn path(&self, id: &str) -> ObjectPath {
        match self {
            Endpoint::Collection(collection) => ObjectPath::object(*collection, id),
            Endpoint::Singleton(path) => ObjectPath::singleton(*path),
        }
    }

    /// Lifecycle implied by the endpoint
    pub fn lifecycle(&self) -> Lifecycle {
        match self {
            Endpoint::Collection(_) => Lifecycle::Standard,
            Endpoint::Singleton(_) => Lifecycle::Existing,
        }
    }
}

/// How objects of a resource type come into and go out of existence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Created with POST, removed with DELETE
    Standard,
    /// Always present on the server: "create" adopts the object and patches
    /// it, "delete" only forgets it
    Existing,
}

/// Outcome of a lifecycle call that produced new state
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    /// State to record for the resource
    pub state: Value,
    /// Messages the server attached to the response
    pub messages: ConfigMessages,
}

/// Typed mapping between one configuration object type and its API
pub trait ResourceAdapter: Send + Sync + 'static {
    /// State model, serialized with snake_case attribute names
    type Model: Serialize + DeserializeOwned + Clone + Debug + Send + Sync;

    /// Body of the API's add request
    type AddRequest: Serialize;

    /// Body returned by the API when reading the object
    type Response: DeserializeOwned;

    /// Resource type name (e.g. `periodic_gc_plugin`)
    fn type_name(&self) -> &'static str;

    /// Attributes accepted in the desired configuration
    fn schema(&self) -> ResourceSchema;

    /// Where the objects live
    fn endpoint(&self) -> Endpoint;

    /// Properties whose JSON key is not the camelCase of their path, as
    /// `(path, key)` pairs
    fn irregular_keys(&self) -> &'static [(&'static str, &'static str)] {
        &[]
    }

    /// Oldest product version that has this object type
    fn min_product_version(&self) -> ProductVersion {
        ProductVersion::BASELINE
    }

    /// Object name used in the API path
    fn id(&self, model: &Self::Model) -> String;

    /// Model holding only the id, used to import an existing object
    fn model_for_import(&self, id: &str) -> Self::Model;

    /// Build the add request from the desired model
    fn add_request(&self, plan: &Self::Model) -> Self::AddRequest;

    /// Copy what the server returned into `model`
    ///
    /// Attributes the server never returns (sensitive ones) must be left
    /// untouched.
    fn read_response(&self, response: Self::Response, model: &mut Self::Model);

    /// Operations that move `state` to `plan`
    fn operations(&self, plan: &Self::Model, state: &Self::Model) -> Vec<Operation>;
}

/// Object-safe resource driven by the reconciler
///
/// Every method takes and returns attributes as JSON so resources of
/// different types can live in one registry.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Resource type name
    fn type_name(&self) -> &'static str;

    /// Attribute schema
    fn schema(&self) -> &ResourceSchema;

    /// JSON keys and sensitive properties of the objects
    fn wire_format(&self) -> &WireFormat;

    /// Lifecycle of the objects
    fn lifecycle(&self) -> Lifecycle;

    /// Oldest product version that has this object type
    fn min_product_version(&self) -> ProductVersion;

    /// Check desired attributes (schema and typed decoding)
    fn validate(&self, desired: &Value) -> Result<(), crate::Error>;

    /// Object name for the given attributes
    fn resource_id(&self, attributes: &Value) -> Result<String, crate::Error>;

    /// Operations needed to move `state` to `desired`
    fn plan_operations(&self, desired: &Value, state: &Value)
    -> Result<Vec<Operation>, crate::Error>;

    /// Requires-replace attributes that differ between desired and state
    fn replace_triggers(&self, desired: &Value, state: &Value) -> Vec<String> {
        self.schema().replace_triggers(desired, state)
    }

    /// Create the object (or adopt it, for `Lifecycle::Existing`)
    async fn create(&self, api: &dyn ConfigApi, desired: &Value)
    -> Result<Applied, crate::Error>;

    /// Read the object; `None` when it no longer exists on the server
    async fn read(&self, api: &dyn ConfigApi, state: &Value)
    -> Result<Option<Value>, crate::Error>;

    /// Converge the object to `desired`, patching only what differs
    async fn update(
        &self,
        api: &dyn ConfigApi,
        desired: &Value,
        state: &Value,
    ) -> Result<Applied, crate::Error>;

    /// Delete the object (or forget it, for `Lifecycle::Existing`)
    async fn delete(&self, api: &dyn ConfigApi, state: &Value) -> Result<(), crate::Error>;

    /// Read an existing object by id and produce its state
    async fn import(&self, api: &dyn ConfigApi, id: &str) -> Result<Applied, crate::Error>;
}
