//! Plugins
//!
//! All plugin types share the `plugins` collection; the add request's
//! `schemas` entry tells the server which kind to create. Changing the kind
//! of an existing plugin is not possible, so each kind is its own resource
//! type.

mod periodic_gc;
mod referential_integrity;

pub use periodic_gc::{
    AddPeriodicGcPluginRequest, PeriodicGcPluginAdapter, PeriodicGcPluginModel,
    PeriodicGcPluginResponse,
};
pub use referential_integrity::{
    AddReferentialIntegrityPluginRequest, ReferentialIntegrityPluginAdapter,
    ReferentialIntegrityPluginModel, ReferentialIntegrityPluginResponse,
};

/// Collection holding every plugin
pub(crate) const PLUGINS: &str = "plugins";
