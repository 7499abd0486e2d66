//! Core traits for dirconf
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`ConfigApi`]: Talk to the directory server's configuration API
//! - [`ResourceAdapter`]: Typed mapping for one configuration object type
//! - [`Resource`]: Object-safe lifecycle driven by the reconciler
//! - [`StateStore`]: Persistent record of managed objects

pub mod config_api;
pub mod resource_adapter;
pub mod state_store;

pub use config_api::{
    ApiResponse, ConfigApi, ConfigApiFactory, ConfigMessages, MESSAGES_SCHEMA_URN, ObjectPath,
    RequiredAction,
};
pub use resource_adapter::{Applied, Endpoint, Lifecycle, Resource, ResourceAdapter};
pub use state_store::{StateRecord, StateStore, StateStoreFactory};
