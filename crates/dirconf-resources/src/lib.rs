//! Resource adapters for directory server configuration objects
//!
//! One module per configuration object type. Each adapter declares a
//! schema, maps its model to and from the API's request/response bodies
//! and diffs two models into PATCH operations; the shared lifecycle lives
//! in `dirconf_core::TypedResource`.
//!
//! | type                                | endpoint                        | lifecycle |
//! |-------------------------------------|---------------------------------|-----------|
//! | `location`                          | `locations/<id>`                | standard  |
//! | `periodic_gc_plugin`                | `plugins/<id>`                  | standard  |
//! | `referential_integrity_plugin`      | `plugins/<id>`                  | standard  |
//! | `file_based_trust_manager_provider` | `trust-manager-providers/<id>`  | standard  |
//! | `global_configuration`              | `global-configuration`          | existing  |
//!
//! # Example
//!
//! ```rust
//! use dirconf_core::ResourceRegistry;
//!
//! let registry = ResourceRegistry::new();
//! dirconf_resources::register_all(&registry);
//! assert!(registry.has_resource("periodic_gc_plugin"));
//! ```

pub mod global_configuration;
pub mod location;
pub mod plugin;
pub mod trust_manager_provider;

pub use global_configuration::GlobalConfigurationAdapter;
pub use location::LocationAdapter;
pub use plugin::{PeriodicGcPluginAdapter, ReferentialIntegrityPluginAdapter};
pub use trust_manager_provider::FileBasedTrustManagerProviderAdapter;

use dirconf_core::ResourceRegistry;

/// Register every resource type in this crate
pub fn register_all(registry: &ResourceRegistry) {
    registry.register_adapter(LocationAdapter);
    registry.register_adapter(PeriodicGcPluginAdapter);
    registry.register_adapter(ReferentialIntegrityPluginAdapter);
    registry.register_adapter(FileBasedTrustManagerProviderAdapter);
    registry.register_adapter(GlobalConfigurationAdapter);

    tracing::debug!(
        "Registered resource types: {}",
        registry.list_resources().join(", ")
    );
}

/// Value to send in an add request; empty strings mean "not set"
pub(crate) fn string_for_add(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.is_empty())
}

/// Values to send in an add request; empty sets mean "not set"
pub(crate) fn set_for_add(values: &Option<Vec<String>>) -> Option<Vec<String>> {
    values.clone().filter(|v| !v.is_empty())
}
