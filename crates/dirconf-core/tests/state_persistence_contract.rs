//! Contract Test: State Persistence Across Runs
//!
//! Constraints verified:
//! - State written by one run is read back by the next
//! - A restarted run with an unchanged configuration makes no API changes
//! - State stores are built from configuration through the registry

mod common;

use common::*;
use dirconf_core::config::StateStoreConfig;
use dirconf_core::traits::StateStore;
use dirconf_core::{FileStateStore, Reconciler};
use serde_json::json;
use tempfile::tempdir;

#[tokio::test]
async fn restart_does_not_repeat_changes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let api = MockConfigApi::new();

    let config = desired(vec![
        ("widget", "w1", json!({"id": "w1", "tag": ["a", "b"], "secret": "pin"})),
        ("settings", "main", json!({"description": "managed"})),
    ]);
    api.insert("settings", json!({"description": "factory"}));

    // First run
    {
        let store = FileStateStore::new(&path).await.unwrap();
        let (reconciler, _rx) = Reconciler::new(
            Box::new(MockConfigApi::sharing_counters_with(&api)),
            Box::new(store),
            test_registry(),
            minimal_config(0),
        )
        .expect("reconciler construction succeeds");

        let summary = reconciler
            .apply(&reconciler.plan(&config).await.unwrap())
            .await
            .unwrap();
        assert_eq!(summary.created, 2);
    }

    let calls_after_first_run = api.mutating_calls();

    // Second run with a fresh store loaded from disk
    let store = FileStateStore::new(&path).await.unwrap();
    assert_eq!(store.list().await.unwrap(), vec!["settings.main", "widget.w1"]);

    let (reconciler, _rx) = Reconciler::new(
        Box::new(MockConfigApi::sharing_counters_with(&api)),
        Box::new(store),
        test_registry(),
        minimal_config(0),
    )
    .expect("reconciler construction succeeds");

    let plan = reconciler.plan(&config).await.unwrap();
    assert!(!plan.has_changes(), "unexpected changes after restart:\n{}", plan);

    reconciler.apply(&plan).await.unwrap();
    assert_eq!(api.mutating_calls(), calls_after_first_run);
}

#[tokio::test]
async fn registry_builds_file_store_from_config() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("state.json");
    let registry = test_registry();

    let store = registry
        .create_state_store(&StateStoreConfig::File {
            path: path.to_string_lossy().into_owned(),
        })
        .await
        .unwrap();

    let (reconciler, _rx) = Reconciler::new(
        Box::new(MockConfigApi::new()),
        store,
        registry,
        minimal_config(0),
    )
    .unwrap();

    let config = desired(vec![("widget", "w1", widget("w1", "one"))]);
    reconciler
        .apply(&reconciler.plan(&config).await.unwrap())
        .await
        .unwrap();

    assert!(path.exists());
    let on_disk: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk["records"]["widget.w1"]["id"], "w1");
    assert_eq!(on_disk["records"]["widget.w1"]["resource_type"], "widget");
}
