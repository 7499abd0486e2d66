// # Config API Trait
//
// Defines the interface to the directory server's REST configuration API.
//
// ## Implementations
//
// - HTTP/JSON: `dirconf-client` crate
// - Test doubles: `tests/common` in this crate
//
// ## Usage
//
// ```rust,ignore
// use dirconf_core::traits::{ConfigApi, ObjectPath};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let api = /* ConfigApi implementation */;
//
//     let response = api.get(&ObjectPath::object("locations", "east")).await?;
//     println!("{}", response.object);
//
//     Ok(())
// }
// ```

use crate::diff::{Operation, WireFormat};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// Extension key under which the server reports configuration messages
pub const MESSAGES_SCHEMA_URN: &str = "urn:pingidentity:schemas:configuration:messages:2.0";

/// Location of a configuration object relative to the API root
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectPath {
    /// Collection (`plugins`) or singleton object (`global-configuration`)
    pub collection: String,
    /// Object name inside the collection; `None` for singletons
    pub name: Option<String>,
}

impl ObjectPath {
    /// Named object inside a collection
    pub fn object(collection: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            name: Some(name.into()),
        }
    }

    /// Singleton object
    pub fn singleton(path: impl Into<String>) -> Self {
        Self {
            collection: path.into(),
            name: None,
        }
    }

    /// Path segments, unescaped
    pub fn segments(&self) -> Vec<&str> {
        let mut segments: Vec<&str> = self.collection.split('/').collect();
        if let Some(name) = &self.name {
            segments.push(name);
        }
        segments
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}/{}", self.collection, name),
            None => write!(f, "{}", self.collection),
        }
    }
}

/// An action the server says an administrator must take
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredAction {
    /// Property that triggered the action
    #[serde(default)]
    pub property: Option<String>,
    /// Action kind (e.g. `component-restart`)
    #[serde(default, rename = "type")]
    pub action_type: Option<String>,
    /// Explanation
    #[serde(default)]
    pub synopsis: Option<String>,
}

/// Notifications and required actions attached to a response
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMessages {
    /// Free-form notifications
    #[serde(default)]
    pub notifications: Vec<String>,
    /// Actions to take for the change to become effective
    #[serde(default)]
    pub required_actions: Vec<RequiredAction>,
}

impl ConfigMessages {
    /// Extract the messages extension from a response body
    ///
    /// Bodies without the extension (or with a malformed one) yield no
    /// messages.
    pub fn from_response(body: &Value) -> Self {
        body.get(MESSAGES_SCHEMA_URN)
            .cloned()
            .and_then(|messages| serde_json::from_value(messages).ok())
            .unwrap_or_default()
    }

    /// Whether there is nothing to report
    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty() && self.required_actions.is_empty()
    }

    /// Flatten into human-readable warnings
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings: Vec<String> = self
            .notifications
            .iter()
            .map(|n| format!("Configuration API notification: {}", n))
            .collect();
        for action in &self.required_actions {
            warnings.push(format!(
                "Configuration API required action ({}) on {}: {}",
                action.action_type.as_deref().unwrap_or("unspecified"),
                action.property.as_deref().unwrap_or("object"),
                action.synopsis.as_deref().unwrap_or("no synopsis"),
            ));
        }
        warnings
    }
}

/// A configuration object returned by the API
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// Full response body
    pub object: Value,
    /// Messages carried by the response
    pub messages: ConfigMessages,
}

impl ApiResponse {
    /// Wrap a response body, extracting its messages
    pub fn new(object: Value) -> Self {
        let messages = ConfigMessages::from_response(&object);
        Self { object, messages }
    }
}

/// Trait for configuration API implementations
///
/// Implementations are single-shot: one HTTP exchange per call, no retry
/// and no caching. Retry policy belongs to the `Reconciler`; observed state
/// belongs to the `StateStore`.
///
/// Errors must be classified so the reconciler can act on them:
/// - a missing object is [`Error::NotFound`](crate::Error::NotFound)
/// - transient failures are [`Error::Transport`](crate::Error::Transport),
///   [`Error::RateLimited`](crate::Error::RateLimited) or a 5xx
///   [`Error::Http`](crate::Error::Http)
#[async_trait]
pub trait ConfigApi: Send + Sync {
    /// Read an object
    async fn get(&self, path: &ObjectPath) -> Result<ApiResponse, crate::Error>;

    /// Create an object in `collection` from a full add request body
    ///
    /// `wire` describes the body's keys; values it marks sensitive must not
    /// be logged.
    async fn create(
        &self,
        collection: &str,
        body: Value,
        wire: &WireFormat,
    ) -> Result<ApiResponse, crate::Error>;

    /// Apply operations to an object and return the updated object
    async fn patch(
        &self,
        path: &ObjectPath,
        operations: &[Operation],
        wire: &WireFormat,
    ) -> Result<ApiResponse, crate::Error>;

    /// Delete an object
    async fn delete(&self, path: &ObjectPath) -> Result<(), crate::Error>;

    /// Name of the implementation (for logging/debugging)
    fn api_name(&self) -> &'static str;
}

/// Helper trait for constructing config API clients from configuration
pub trait ConfigApiFactory: Send + Sync {
    /// Create a ConfigApi instance from connection settings
    fn create(
        &self,
        config: &crate::config::ConnectionConfig,
    ) -> Result<Box<dyn ConfigApi>, crate::Error>;
}
