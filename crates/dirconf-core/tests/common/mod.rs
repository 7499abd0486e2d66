//! Test doubles and common utilities for reconciler contract tests
//!
//! `MockConfigApi` keeps configuration objects in memory and applies PATCH
//! operations with the same reducer the real server contract uses. Two small
//! adapters exercise both lifecycles: `widget` (a collection object) and
//! `settings` (a singleton).

#![allow(dead_code)]

use async_trait::async_trait;
use dirconf_core::config::{ConnectionConfig, DirconfConfig, EngineConfig, StateStoreConfig};
use dirconf_core::diff::{Operation, OperationsBuilder, WireFormat, apply_operations};
use dirconf_core::error::{Error, Result};
use dirconf_core::schema::{Attribute, ResourceSchema};
use dirconf_core::traits::{
    ApiResponse, ConfigApi, ConfigMessages, Endpoint, ObjectPath, ResourceAdapter,
};
use dirconf_core::{DesiredConfig, DesiredResource, ResourceRegistry};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Kind of failure injected into the next calls
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    /// HTTP 503
    Unavailable,
    /// Connection refused
    Transport,
    /// HTTP 400
    Rejected,
}

impl Failure {
    fn to_error(self) -> Error {
        match self {
            Failure::Unavailable => Error::http(503, "Service unavailable"),
            Failure::Transport => Error::transport("connection refused"),
            Failure::Rejected => Error::http(400, "Invalid attribute value"),
        }
    }
}

/// In-memory configuration API that counts calls
pub struct MockConfigApi {
    objects: Arc<Mutex<HashMap<String, Value>>>,
    get_calls: Arc<AtomicUsize>,
    create_calls: Arc<AtomicUsize>,
    patch_calls: Arc<AtomicUsize>,
    delete_calls: Arc<AtomicUsize>,
    patches: Arc<Mutex<Vec<(String, Vec<Operation>)>>>,
    failures: Arc<Mutex<Option<(Failure, usize)>>>,
    notifications: Arc<Mutex<Vec<String>>>,
}

impl MockConfigApi {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(Mutex::new(HashMap::new())),
            get_calls: Arc::new(AtomicUsize::new(0)),
            create_calls: Arc::new(AtomicUsize::new(0)),
            patch_calls: Arc::new(AtomicUsize::new(0)),
            delete_calls: Arc::new(AtomicUsize::new(0)),
            patches: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(None)),
            notifications: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a new MockConfigApi that shares objects and counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            objects: Arc::clone(&other.objects),
            get_calls: Arc::clone(&other.get_calls),
            create_calls: Arc::clone(&other.create_calls),
            patch_calls: Arc::clone(&other.patch_calls),
            delete_calls: Arc::clone(&other.delete_calls),
            patches: Arc::clone(&other.patches),
            failures: Arc::clone(&other.failures),
            notifications: Arc::clone(&other.notifications),
        }
    }

    /// Make the next `count` calls fail
    pub fn fail_next(&self, count: usize, failure: Failure) {
        *self.failures.lock().unwrap() = Some((failure, count));
    }

    /// Attach a notification to the next successful response
    pub fn notify_next(&self, notification: &str) {
        self.notifications
            .lock()
            .unwrap()
            .push(notification.to_string());
    }

    /// Put an object on the server as if created outside dirconf
    pub fn insert(&self, path: &str, object: Value) {
        self.objects.lock().unwrap().insert(path.to_string(), object);
    }

    /// Remove an object as if deleted outside dirconf
    pub fn remove(&self, path: &str) {
        self.objects.lock().unwrap().remove(path);
    }

    /// Current server object at `path`
    pub fn object(&self, path: &str) -> Option<Value> {
        self.objects.lock().unwrap().get(path).cloned()
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn patch_calls(&self) -> usize {
        self.patch_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Calls that would change the server
    pub fn mutating_calls(&self) -> usize {
        self.create_calls() + self.patch_calls() + self.delete_calls()
    }

    /// Every PATCH received, in order
    pub fn patches(&self) -> Vec<(String, Vec<Operation>)> {
        self.patches.lock().unwrap().clone()
    }

    fn injected_failure(&self) -> Option<Error> {
        let mut failures = self.failures.lock().unwrap();
        match failures.as_mut() {
            Some((failure, remaining)) if *remaining > 0 => {
                *remaining -= 1;
                Some(failure.to_error())
            }
            _ => None,
        }
    }

    fn respond(&self, object: Value) -> ApiResponse {
        let notifications: Vec<String> = self.notifications.lock().unwrap().drain(..).collect();
        ApiResponse {
            object,
            messages: ConfigMessages {
                notifications,
                required_actions: Vec::new(),
            },
        }
    }
}

#[async_trait]
impl ConfigApi for MockConfigApi {
    async fn get(&self, path: &ObjectPath) -> Result<ApiResponse> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.injected_failure() {
            return Err(e);
        }

        let object = self
            .object(&path.to_string())
            .ok_or_else(|| Error::not_found(path.to_string()))?;
        Ok(self.respond(object))
    }

    async fn create(
        &self,
        collection: &str,
        body: Value,
        _wire: &WireFormat,
    ) -> Result<ApiResponse> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.injected_failure() {
            return Err(e);
        }

        // Add requests carry the object name as `<thing>Name`
        let mut object = body
            .as_object()
            .cloned()
            .ok_or_else(|| Error::http(400, "body must be an object"))?;
        let name_key = object
            .keys()
            .find(|k| k.ends_with("Name"))
            .cloned()
            .ok_or_else(|| Error::http(400, "missing object name"))?;
        let name = object.remove(&name_key).unwrap_or(Value::Null);
        let name = name
            .as_str()
            .ok_or_else(|| Error::http(400, "object name must be a string"))?
            .to_string();
        object.remove("schemas");
        object.insert("id".to_string(), Value::from(name.clone()));

        let key = format!("{}/{}", collection, name);
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(&key) {
            return Err(Error::conflict(format!("{} already exists", key)));
        }
        let object = Value::Object(object);
        objects.insert(key, object.clone());
        drop(objects);

        Ok(self.respond(object))
    }

    async fn patch(
        &self,
        path: &ObjectPath,
        operations: &[Operation],
        wire: &WireFormat,
    ) -> Result<ApiResponse> {
        self.patch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.injected_failure() {
            return Err(e);
        }

        let key = path.to_string();
        self.patches
            .lock()
            .unwrap()
            .push((key.clone(), operations.to_vec()));

        let mut objects = self.objects.lock().unwrap();
        let object = objects
            .get_mut(&key)
            .ok_or_else(|| Error::not_found(key.clone()))?;
        apply_operations(object, operations, wire)?;
        let object = object.clone();
        drop(objects);

        Ok(self.respond(object))
    }

    async fn delete(&self, path: &ObjectPath) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.injected_failure() {
            return Err(e);
        }

        self.objects
            .lock()
            .unwrap()
            .remove(&path.to_string())
            .map(|_| ())
            .ok_or_else(|| Error::not_found(path.to_string()))
    }

    fn api_name(&self) -> &'static str {
        "mock"
    }
}

/// Collection object used by the contract tests
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WidgetModel {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub tag: Option<Vec<String>>,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub flavor: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddWidgetRequest {
    schemas: Vec<&'static str>,
    widget_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    flavor: Option<String>,
}

/// The server never returns `secret`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetResponse {
    id: String,
    description: Option<String>,
    enabled: Option<bool>,
    tag: Option<Vec<String>>,
    flavor: Option<String>,
}

pub struct WidgetAdapter;

impl ResourceAdapter for WidgetAdapter {
    type Model = WidgetModel;
    type AddRequest = AddWidgetRequest;
    type Response = WidgetResponse;

    fn type_name(&self) -> &'static str {
        "widget"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("Widget used by tests")
            .with_attribute(Attribute::required_string("id").requires_replace())
            .with_attribute(Attribute::optional_string("description"))
            .with_attribute(Attribute::optional_bool("enabled"))
            .with_attribute(Attribute::optional_set("tag"))
            .with_attribute(Attribute::optional_string("secret").sensitive())
            .with_attribute(
                Attribute::optional_string("flavor")
                    .requires_replace()
                    .one_of(&["plain", "fancy"]),
            )
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::Collection("widgets")
    }

    fn id(&self, model: &WidgetModel) -> String {
        model.id.clone()
    }

    fn model_for_import(&self, id: &str) -> WidgetModel {
        WidgetModel {
            id: id.to_string(),
            ..Default::default()
        }
    }

    fn add_request(&self, plan: &WidgetModel) -> AddWidgetRequest {
        AddWidgetRequest {
            schemas: vec!["urn:test:widget"],
            widget_name: plan.id.clone(),
            description: plan.description.clone(),
            enabled: plan.enabled,
            tag: plan.tag.clone(),
            secret: plan.secret.clone(),
            flavor: plan.flavor.clone(),
        }
    }

    fn read_response(&self, response: WidgetResponse, model: &mut WidgetModel) {
        model.id = response.id;
        model.description = response.description;
        model.enabled = response.enabled;
        model.tag = response.tag;
        model.flavor = response.flavor;
    }

    fn operations(&self, plan: &WidgetModel, state: &WidgetModel) -> Vec<Operation> {
        OperationsBuilder::new()
            .scalar("description", &plan.description, &state.description)
            .scalar("enabled", &plan.enabled, &state.enabled)
            .set("tag", &plan.tag, &state.tag)
            .scalar("secret", &plan.secret, &state.secret)
            .build()
    }
}

/// Singleton used by the contract tests
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsModel {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub max_connections: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    description: Option<String>,
    max_connections: Option<i64>,
}

pub struct SettingsAdapter;

impl ResourceAdapter for SettingsAdapter {
    type Model = SettingsModel;
    type AddRequest = ();
    type Response = SettingsResponse;

    fn type_name(&self) -> &'static str {
        "settings"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("Server-wide settings used by tests")
            .with_attribute(Attribute::optional_string("description"))
            .with_attribute(Attribute::optional_int64("max_connections"))
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::Singleton("settings")
    }

    fn id(&self, _model: &SettingsModel) -> String {
        "settings".to_string()
    }

    fn model_for_import(&self, _id: &str) -> SettingsModel {
        SettingsModel::default()
    }

    fn add_request(&self, _plan: &SettingsModel) {}

    fn read_response(&self, response: SettingsResponse, model: &mut SettingsModel) {
        model.description = response.description;
        model.max_connections = response.max_connections;
    }

    fn operations(&self, plan: &SettingsModel, state: &SettingsModel) -> Vec<Operation> {
        OperationsBuilder::new()
            .scalar("description", &plan.description, &state.description)
            .scalar("max-connections", &plan.max_connections, &state.max_connections)
            .build()
    }
}

/// Registry with the test adapters and builtin state stores
pub fn test_registry() -> Arc<ResourceRegistry> {
    let registry = ResourceRegistry::with_builtin_state_stores();
    registry.register_adapter(WidgetAdapter);
    registry.register_adapter(SettingsAdapter);
    Arc::new(registry)
}

/// Helper to create a minimal DirconfConfig for testing (no retry delay)
pub fn minimal_config(max_retries: usize) -> DirconfConfig {
    DirconfConfig {
        connection: ConnectionConfig::new("ds.test:1443", "cn=admin", "password"),
        state_store: StateStoreConfig::Memory,
        engine: EngineConfig {
            max_retries,
            retry_delay_secs: 0,
            event_channel_capacity: 100,
        },
    }
}

/// Desired configuration from `(type, name, attributes)` triples
pub fn desired(resources: Vec<(&str, &str, Value)>) -> DesiredConfig {
    DesiredConfig::new(
        resources
            .into_iter()
            .map(|(resource_type, name, attributes)| {
                DesiredResource::new(resource_type, name, attributes)
            })
            .collect(),
    )
}

/// A widget with a description
pub fn widget(id: &str, description: &str) -> Value {
    json!({ "id": id, "description": description })
}
