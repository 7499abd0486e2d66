//! Minimal embedding example for dirconf-core
//!
//! This example drives the reconciler from a custom application, against an
//! in-process configuration API instead of a real directory server.

use dirconf_core::config::{ConnectionConfig, DirconfConfig, EngineConfig};
use dirconf_core::diff::{Operation, WireFormat, apply_operations};
use dirconf_core::traits::{ApiResponse, ConfigApi, ObjectPath};
use dirconf_core::{DesiredConfig, Error, MemoryStateStore, Reconciler, ResourceRegistry, Result};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

/// Configuration API backed by a map of objects
///
/// Creating an object uses the request's `<type>Name` field as its id, like
/// the real server does.
struct InProcessConfigApi {
    objects: Mutex<HashMap<String, Value>>,
}

impl InProcessConfigApi {
    fn new() -> Self {
        let mut objects = HashMap::new();
        objects.insert(
            "global-configuration".to_string(),
            json!({"location": "east", "sizeLimit": 1000}),
        );
        Self {
            objects: Mutex::new(objects),
        }
    }

    fn objects(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl ConfigApi for InProcessConfigApi {
    async fn get(&self, path: &ObjectPath) -> Result<ApiResponse> {
        self.objects()
            .get(&path.to_string())
            .cloned()
            .map(ApiResponse::new)
            .ok_or_else(|| Error::not_found(path.to_string()))
    }

    async fn create(
        &self,
        collection: &str,
        mut body: Value,
        _wire: &WireFormat,
    ) -> Result<ApiResponse> {
        let name = body
            .as_object()
            .and_then(|map| {
                map.iter()
                    .find(|(key, _)| key.ends_with("Name"))
                    .and_then(|(_, value)| value.as_str())
            })
            .map(str::to_string)
            .ok_or_else(|| Error::invalid_input("add request has no name"))?;

        if let Some(map) = body.as_object_mut() {
            map.retain(|key, _| !key.ends_with("Name"));
            map.insert("id".to_string(), Value::String(name.clone()));
        }

        println!("[Server] POST {}/{}", collection, name);
        self.objects()
            .insert(format!("{}/{}", collection, name), body.clone());
        Ok(ApiResponse::new(body))
    }

    async fn patch(
        &self,
        path: &ObjectPath,
        operations: &[Operation],
        wire: &WireFormat,
    ) -> Result<ApiResponse> {
        let mut objects = self.objects();
        let object = objects
            .get_mut(&path.to_string())
            .ok_or_else(|| Error::not_found(path.to_string()))?;

        println!("[Server] PATCH {} ({} operations)", path, operations.len());
        apply_operations(object, operations, wire)?;
        Ok(ApiResponse::new(object.clone()))
    }

    async fn delete(&self, path: &ObjectPath) -> Result<()> {
        println!("[Server] DELETE {}", path);
        self.objects()
            .remove(&path.to_string())
            .map(|_| ())
            .ok_or_else(|| Error::not_found(path.to_string()))
    }

    fn api_name(&self) -> &'static str {
        "in-process"
    }
}

const DESIRED: &str = r#"{
    "resources": [
        {
            "type": "location",
            "name": "west",
            "attributes": {"id": "west", "description": "West coast"}
        },
        {
            "type": "global_configuration",
            "name": "global",
            "attributes": {"location": "west", "size_limit": 5000}
        }
    ]
}"#;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .init();

    println!("=== Embedded dirconf-core Example ===\n");

    // Register the built-in resource types
    let registry = ResourceRegistry::new();
    dirconf_resources::register_all(&registry);

    let connection = ConnectionConfig::new("localhost", "admin", "unused");
    let mut config = DirconfConfig::new(connection);
    config.engine = EngineConfig {
        max_retries: 0,
        retry_delay_secs: 0,
        event_channel_capacity: 100,
    };

    println!("1. Creating reconciler...");
    let store = MemoryStateStore::new();
    let (reconciler, event_rx) = Reconciler::new(
        Box::new(InProcessConfigApi::new()),
        Box::new(store.clone()),
        Arc::new(registry),
        config,
    )?;

    let event_listener = tokio::spawn(async move {
        let mut events = ReceiverStream::new(event_rx);
        while let Some(event) = events.next().await {
            println!("[Event] {:?}", event);
        }
    });

    let desired: DesiredConfig = DESIRED.parse()?;

    println!("2. Planning...");
    let plan = reconciler.plan(&desired).await?;
    println!("{}", plan);

    println!("3. Applying...");
    let summary = reconciler.apply(&plan).await?;
    println!(
        "   created {}, updated {}, failed {}",
        summary.created,
        summary.updated,
        summary.failed.len()
    );

    println!("4. Planning again...");
    let again = reconciler.plan(&desired).await?;
    println!("   changes pending: {}", again.has_changes());

    println!("5. Destroying...");
    let summary = reconciler.apply(&reconciler.plan_destroy().await?).await?;
    println!("   deleted {}, still recorded: {}", summary.deleted, !store.is_empty().await);

    // Dropping the reconciler closes the event channel
    drop(reconciler);
    let _ = event_listener.await;

    println!("\n=== Embedding Successful ===");
    Ok(())
}
