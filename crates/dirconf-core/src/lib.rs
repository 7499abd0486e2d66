// # dirconf-core
//
// Core library for declarative directory-server configuration.
//
// ## Architecture Overview
//
// - **ConfigApi**: Trait for the server's REST configuration API
// - **ResourceAdapter**: Typed mapping of one configuration object type
// - **Resource**: Object-safe lifecycle the reconciler drives
// - **StateStore**: Trait for persistent state of managed objects
// - **Reconciler**: Plans and applies desired configuration
// - **ResourceRegistry**: Plugin-based registry of resource types and factories
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **One diff**: every object type converges through `OperationsBuilder`
// 3. **Plugin-Based**: Resource types are registered, never matched by name
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Idempotency**: Recorded state makes a converged plan empty

pub mod adapter;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod registry;
pub mod schema;
pub mod state;
pub mod traits;
pub mod version;

// Re-export core types for convenience
pub use adapter::TypedResource;
pub use config::{
    ConnectionConfig, DesiredConfig, DesiredResource, DirconfConfig, EngineConfig,
    ResourceAddress, StateStoreConfig,
};
pub use diff::{Operation, OperationKind, OperationsBuilder, PatchRequest, WireFormat};
pub use engine::{ApplySummary, ChangeAction, EngineEvent, Plan, PlannedChange, Reconciler};
pub use error::{Error, Result};
pub use registry::ResourceRegistry;
pub use schema::{Attribute, AttributeKind, ResourceSchema};
pub use state::{FileStateStore, MemoryStateStore};
pub use traits::{ConfigApi, Resource, ResourceAdapter, StateStore};
pub use version::ProductVersion;
