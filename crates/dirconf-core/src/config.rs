//! Configuration types for dirconf
//!
//! This module defines the connection, state store and engine settings, plus
//! the desired configuration the reconciler converges the server to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::version::ProductVersion;

/// Main dirconf configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirconfConfig {
    /// How to reach the configuration API
    pub connection: ConnectionConfig,

    /// State store configuration
    #[serde(default)]
    pub state_store: StateStoreConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl DirconfConfig {
    /// Create a configuration for the given connection with default settings
    pub fn new(connection: ConnectionConfig) -> Self {
        Self {
            connection,
            state_store: StateStoreConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.connection.validate()?;
        self.state_store.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

/// Connection to the directory server's configuration API
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Host (and optional port) serving `https://<host>/config/`
    pub https_host: String,

    /// User for HTTP basic authentication
    pub username: String,

    /// Password for HTTP basic authentication
    pub password: String,

    /// Accept any server certificate
    #[serde(default)]
    pub insecure_trust_all_tls: bool,

    /// Additional trusted CA certificates (PEM files)
    #[serde(default)]
    pub ca_certificate_pem_files: Vec<String>,

    /// Version of the directory server being configured
    #[serde(default)]
    pub product_version: ProductVersion,

    /// Read from the server but log mutations instead of sending them
    #[serde(default)]
    pub dry_run: bool,
}

impl ConnectionConfig {
    /// Create a connection configuration with default TLS settings
    pub fn new(
        https_host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            https_host: https_host.into(),
            username: username.into(),
            password: password.into(),
            insecure_trust_all_tls: false,
            ca_certificate_pem_files: Vec::new(),
            product_version: ProductVersion::default(),
            dry_run: false,
        }
    }

    /// Set the product version
    pub fn with_product_version(mut self, version: ProductVersion) -> Self {
        self.product_version = version;
        self
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Validate the connection configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.https_host.trim().is_empty() {
            return Err(crate::Error::config("HTTPS host cannot be empty"));
        }
        if self.https_host.contains("://") {
            return Err(crate::Error::config(format!(
                "HTTPS host must not include a scheme: {}",
                self.https_host
            )));
        }
        if self.username.is_empty() {
            return Err(crate::Error::config("Username cannot be empty"));
        }
        if self.password.is_empty() {
            return Err(crate::Error::config("Password cannot be empty"));
        }
        if self
            .ca_certificate_pem_files
            .iter()
            .any(|f| f.trim().is_empty())
        {
            return Err(crate::Error::config("CA certificate file path cannot be empty"));
        }
        Ok(())
    }

    /// Base URL of the configuration API
    pub fn base_url(&self) -> String {
        format!("https://{}/config/", self.https_host.trim_end_matches('/'))
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("https_host", &self.https_host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("insecure_trust_all_tls", &self.insecure_trust_all_tls)
            .field("ca_certificate_pem_files", &self.ca_certificate_pem_files)
            .field("product_version", &self.product_version)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new("localhost:1443", "", "")
    }
}

/// State store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateStoreConfig {
    /// File-based state store
    File {
        /// Path to the state file
        path: String,
    },

    /// In-memory state store (not persistent)
    #[default]
    Memory,

    /// Custom state store
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl StateStoreConfig {
    /// Validate the state store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StateStoreConfig::File { path } => {
                if path.is_empty() {
                    return Err(crate::Error::config("State file path cannot be empty"));
                }
                Ok(())
            }
            StateStoreConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom state store factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom state store config cannot be null",
                    ));
                }
                Ok(())
            }
            StateStoreConfig::Memory => Ok(()),
        }
    }

    /// Factory name and JSON configuration handed to it
    pub fn factory_config(&self) -> (&str, serde_json::Value) {
        match self {
            StateStoreConfig::File { path } => ("file", serde_json::json!({ "path": path })),
            StateStoreConfig::Memory => ("memory", serde_json::Value::Null),
            StateStoreConfig::Custom { factory, config } => (factory.as_str(), config.clone()),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Retries after the first attempt for retryable failures
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Delay between retry attempts (in seconds)
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped with a warning log.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_max_retries() -> usize {
    3
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_event_channel_capacity() -> usize {
    1000
}

/// Address of a managed resource: `<type>.<name>`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceAddress {
    /// Resource type name
    pub resource_type: String,
    /// Local name chosen in the desired configuration
    pub name: String,
}

impl ResourceAddress {
    /// Create an address
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

impl FromStr for ResourceAddress {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((resource_type, name)) if !resource_type.is_empty() && !name.is_empty() => {
                Ok(Self::new(resource_type, name))
            }
            _ => Err(crate::Error::invalid_input(format!(
                "Resource address must look like <type>.<name>, got '{}'",
                s
            ))),
        }
    }
}

/// One resource in the desired configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredResource {
    /// Resource type name
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Local name; together with the type it forms the address
    pub name: String,

    /// Attributes in snake_case, checked against the type's schema
    #[serde(default = "empty_object")]
    pub attributes: serde_json::Value,
}

impl DesiredResource {
    /// Create a desired resource
    pub fn new(
        resource_type: impl Into<String>,
        name: impl Into<String>,
        attributes: serde_json::Value,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            attributes,
        }
    }

    /// Address of the resource
    pub fn address(&self) -> ResourceAddress {
        ResourceAddress::new(&self.resource_type, &self.name)
    }
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

/// Desired configuration: the resources that should exist
///
/// ```json
/// {
///   "resources": [
///     { "type": "location", "name": "east", "attributes": { "id": "east" } }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesiredConfig {
    /// Resources in the order they are planned
    #[serde(default)]
    pub resources: Vec<DesiredResource>,
}

impl DesiredConfig {
    /// Create a desired configuration
    pub fn new(resources: Vec<DesiredResource>) -> Self {
        Self { resources }
    }

    /// Load a desired configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, crate::Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::config(format!(
                "Failed to read desired configuration {}: {}",
                path.display(),
                e
            ))
        })?;
        content.parse()
    }
}

impl FromStr for DesiredConfig {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
            .map_err(|e| crate::Error::config(format!("Invalid desired configuration: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn connection() -> ConnectionConfig {
        ConnectionConfig::new("ds.example.com:1443", "cn=admin", "s3cret")
    }

    #[test]
    fn test_connection_debug_hides_password() {
        let rendered = format!("{:?}", connection());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("s3cret"));
    }

    #[test]
    fn test_connection_validation() {
        assert!(connection().validate().is_ok());

        let mut with_scheme = connection();
        with_scheme.https_host = "https://ds.example.com".to_string();
        assert!(with_scheme.validate().is_err());

        let mut no_password = connection();
        no_password.password.clear();
        assert!(no_password.validate().is_err());
    }

    #[test]
    fn test_base_url() {
        assert_eq!(connection().base_url(), "https://ds.example.com:1443/config/");
    }

    #[test]
    fn test_state_store_config_deserializes_tagged() {
        let config: StateStoreConfig =
            serde_json::from_value(json!({"type": "file", "path": "/tmp/state.json"})).unwrap();
        let (factory, value) = config.factory_config();
        assert_eq!(factory, "file");
        assert_eq!(value, json!({"path": "/tmp/state.json"}));

        let memory: StateStoreConfig = serde_json::from_value(json!({"type": "memory"})).unwrap();
        assert!(matches!(memory, StateStoreConfig::Memory));
    }

    #[test]
    fn test_engine_defaults() {
        let engine: EngineConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(engine.max_retries, 3);
        assert_eq!(engine.retry_delay_secs, 5);
        assert_eq!(engine.event_channel_capacity, 1000);
    }

    #[test]
    fn test_resource_address_parse() {
        let address: ResourceAddress = "periodic_gc_plugin.nightly".parse().unwrap();
        assert_eq!(address.resource_type, "periodic_gc_plugin");
        assert_eq!(address.name, "nightly");
        assert_eq!(address.to_string(), "periodic_gc_plugin.nightly");

        assert!("no_dot".parse::<ResourceAddress>().is_err());
        assert!(".name".parse::<ResourceAddress>().is_err());
    }

    #[test]
    fn test_desired_config_parse() {
        let desired: DesiredConfig = r#"{
            "resources": [
                {"type": "location", "name": "east", "attributes": {"id": "east"}},
                {"type": "global_configuration", "name": "main"}
            ]
        }"#
        .parse()
        .unwrap();

        assert_eq!(desired.resources.len(), 2);
        assert_eq!(desired.resources[0].address().to_string(), "location.east");
        assert_eq!(desired.resources[1].attributes, json!({}));
    }

    #[test]
    fn test_desired_config_rejects_garbage() {
        let result = "[1, 2".parse::<DesiredConfig>();
        assert!(matches!(result, Err(crate::Error::Config(_))));
    }
}
