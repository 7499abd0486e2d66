//! Contract Test: Configuration API Client over HTTP
//!
//! Runs the client against a mock HTTP server.
//!
//! Constraints verified:
//! - Every request carries basic authentication and asks for JSON
//! - Object names are percent-encoded into the path
//! - PATCH bodies are `{"operations": [...]}` with hyphenated paths
//! - Status codes are classified (404, 409, 401, 429, 5xx) and the SCIM
//!   `detail` of an error body is kept
//! - Each call is a single request: the client never retries
//! - Dry-run mode reads but never writes, and masks sensitive values in
//!   the requests it logs

use dirconf_core::config::ConnectionConfig;
use dirconf_core::diff::{Operation, WireFormat};
use dirconf_core::traits::{ConfigApi, MESSAGES_SCHEMA_URN, ObjectPath};
use dirconf_core::Error;
use dirconf_client::ConfigApiClient;
use serde_json::json;
use std::io;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// Basic auth header for admin:secret is "YWRtaW46c2VjcmV0"
const AUTHORIZATION: &str = "Basic YWRtaW46c2VjcmV0";

fn connection() -> ConnectionConfig {
    ConnectionConfig::new("unused.example.com", "admin", "secret")
}

fn client(server: &MockServer) -> ConfigApiClient {
    ConfigApiClient::with_base_url(&connection(), &format!("{}/config/", server.uri()))
        .expect("client builds")
}

fn dry_run_client(server: &MockServer) -> ConfigApiClient {
    ConfigApiClient::with_base_url(
        &connection().with_dry_run(true),
        &format!("{}/config/", server.uri()),
    )
    .expect("client builds")
}

fn scim_error(status: u16, detail: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "schemas": ["urn:ietf:params:scim:api:messages:2.0:Error"],
        "status": status.to_string(),
        "detail": detail
    }))
}

// =============================================================================
// Reads
// =============================================================================

#[tokio::test]
async fn get_sends_credentials_and_encodes_names() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/config/plugins/Periodic%20GC"))
        .and(header("Authorization", AUTHORIZATION))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "Periodic GC",
            "enabled": true,
            MESSAGES_SCHEMA_URN: {"notifications": ["read-only server"]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server)
        .get(&ObjectPath::object("plugins", "Periodic GC"))
        .await
        .expect("GET succeeds");

    assert_eq!(response.object["id"], "Periodic GC");
    assert_eq!(response.messages.notifications, vec!["read-only server"]);
}

#[tokio::test]
async fn get_singleton() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/config/global-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "global-configuration"})))
        .mount(&server)
        .await;

    let response = client(&server)
        .get(&ObjectPath::singleton("global-configuration"))
        .await
        .unwrap();
    assert_eq!(response.object["id"], "global-configuration");
}

#[tokio::test]
async fn missing_object_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/config/locations/ghost"))
        .respond_with(scim_error(404, "Location 'ghost' does not exist"))
        .mount(&server)
        .await;

    let error = client(&server)
        .get(&ObjectPath::object("locations", "ghost"))
        .await
        .unwrap_err();

    assert!(error.is_not_found());
    assert!(!error.is_retryable());
    assert!(error.to_string().contains("Location 'ghost' does not exist"));
}

// =============================================================================
// Status classification
// =============================================================================

#[tokio::test]
async fn server_errors_are_retryable_and_single_shot() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/config/locations/east"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let error = client(&server)
        .get(&ObjectPath::object("locations", "east"))
        .await
        .unwrap_err();

    assert!(matches!(error, Error::Http { status: 503, .. }));
    assert!(error.is_retryable());
}

#[tokio::test]
async fn rejected_request_keeps_scim_detail() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/config/locations"))
        .respond_with(scim_error(400, "The value 'x' is not valid for property 'description'"))
        .mount(&server)
        .await;

    let error = client(&server)
        .create("locations", json!({"locationName": "east"}), &WireFormat::new())
        .await
        .unwrap_err();

    match error {
        Error::Http { status, ref message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "The value 'x' is not valid for property 'description'");
        }
        other => panic!("expected HTTP error, got {:?}", other),
    }
    assert!(!error.is_retryable());
}

#[tokio::test]
async fn status_codes_are_classified() {
    let server = MockServer::start().await;

    for (name, status) in [("auth", 401), ("forbidden", 403), ("busy", 429), ("taken", 409)] {
        Mock::given(method("GET"))
            .and(path(format!("/config/locations/{}", name)))
            .respond_with(scim_error(status, "nope"))
            .mount(&server)
            .await;
    }

    let client = client(&server);

    assert!(matches!(get_error(&client, "auth").await, Error::Authentication(_)));
    assert!(matches!(get_error(&client, "forbidden").await, Error::Authentication(_)));

    let busy = get_error(&client, "busy").await;
    assert!(matches!(busy, Error::RateLimited(_)));
    assert!(busy.is_retryable());

    assert!(matches!(get_error(&client, "taken").await, Error::Conflict(_)));
}

async fn get_error(client: &ConfigApiClient, name: &str) -> Error {
    client
        .get(&ObjectPath::object("locations", name))
        .await
        .expect_err("request should fail")
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    let server = MockServer::start().await;
    let client = client(&server);
    drop(server);

    let error = client
        .get(&ObjectPath::object("locations", "east"))
        .await
        .unwrap_err();

    assert!(matches!(error, Error::Transport(_)), "got {:?}", error);
    assert!(error.is_retryable());
}

// =============================================================================
// Writes
// =============================================================================

#[tokio::test]
async fn create_posts_add_request_to_collection() {
    let server = MockServer::start().await;

    let body = json!({
        "schemas": ["urn:pingidentity:schemas:configuration:2.0:plugin:periodic-gc"],
        "pluginName": "gc",
        "enabled": true
    });

    Mock::given(method("POST"))
        .and(path("/config/plugins"))
        .and(header("Authorization", AUTHORIZATION))
        .and(body_json(&body))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "gc", "enabled": true})))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server)
        .create("plugins", body, &WireFormat::new())
        .await
        .unwrap();
    assert_eq!(response.object["id"], "gc");
}

#[tokio::test]
async fn patch_sends_operations() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/config/plugins/gc"))
        .and(body_json(json!({
            "operations": [
                {"op": "replace", "path": "invoke-gc-time-utc", "value": ["04:00"]},
                {"op": "remove", "path": "description"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "gc",
            "invokeGCTimeUtc": ["04:00"],
            MESSAGES_SCHEMA_URN: {
                "requiredActions": [{"property": "enabled", "type": "component-restart", "synopsis": "restart"}]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let operations = vec![
        Operation::replace("invoke-gc-time-utc", json!(["04:00"])),
        Operation::remove("description"),
    ];
    let response = client(&server)
        .patch(&ObjectPath::object("plugins", "gc"), &operations, &WireFormat::new())
        .await
        .unwrap();

    assert_eq!(response.messages.required_actions.len(), 1);
    assert_eq!(response.messages.warnings().len(), 1);
}

#[tokio::test]
async fn delete_accepts_no_content() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/config/locations/east"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .delete(&ObjectPath::object("locations", "east"))
        .await
        .expect("DELETE succeeds");
}

// =============================================================================
// Dry-run
// =============================================================================

#[tokio::test]
async fn dry_run_never_writes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/config/locations/east"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "east",
            "description": "old"
        })))
        .mount(&server)
        .await;

    for verb in ["POST", "PATCH", "DELETE"] {
        Mock::given(method(verb))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
    }

    let client = dry_run_client(&server);
    let path = ObjectPath::object("locations", "east");

    let created = client
        .create(
            "locations",
            json!({"locationName": "west", "description": "new"}),
            &WireFormat::new(),
        )
        .await
        .unwrap();
    assert_eq!(created.object["id"], "west");

    let patched = client
        .patch(
            &path,
            &[Operation::replace("description", json!("new"))],
            &WireFormat::new(),
        )
        .await
        .unwrap();
    assert_eq!(patched.object["id"], "east");
    assert_eq!(patched.object["description"], "new");

    client.delete(&path).await.unwrap();
}

/// Log output collected by a test subscriber
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn dry_run_masks_sensitive_values_in_logs() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/config/trust-manager-providers/JKS"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "JKS",
            "trustStoreFile": "config/truststore"
        })))
        .mount(&server)
        .await;

    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let wire = WireFormat::new().with_sensitive("trust-store-pin");
    let client = dry_run_client(&server);

    client
        .create(
            "trust-manager-providers",
            json!({"providerName": "JKS", "trustStorePin": "changeit"}),
            &wire,
        )
        .await
        .unwrap();
    let patched = client
        .patch(
            &ObjectPath::object("trust-manager-providers", "JKS"),
            &[Operation::replace("trust-store-pin", json!("n3w-pin"))],
            &wire,
        )
        .await
        .unwrap();

    let output = logs.contents();
    assert!(output.contains("[DRY-RUN] Would send POST"), "missing preview:\n{}", output);
    assert!(output.contains("[DRY-RUN] Would send PATCH"), "missing preview:\n{}", output);
    assert!(output.contains("(sensitive)"));
    assert!(!output.contains("changeit"), "PIN logged:\n{}", output);
    assert!(!output.contains("n3w-pin"), "PIN logged:\n{}", output);

    // The simulated object still carries the real value
    assert_eq!(patched.object["trustStorePin"], "n3w-pin");
}

#[tokio::test]
async fn dry_run_patch_uses_declared_json_keys() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/config/plugins/gc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "gc",
            "invokeGCTimeUtc": ["04:00"],
            "delayPostGC": "1 s"
        })))
        .mount(&server)
        .await;

    let wire = WireFormat::new()
        .with_key("invoke-gc-time-utc", "invokeGCTimeUtc")
        .with_key("delay-post-gc", "delayPostGC");
    let patched = dry_run_client(&server)
        .patch(
            &ObjectPath::object("plugins", "gc"),
            &[
                Operation::add("invoke-gc-time-utc", json!(["16:00"])),
                Operation::replace("delay-post-gc", json!("5 s")),
            ],
            &wire,
        )
        .await
        .unwrap();

    assert_eq!(
        patched.object,
        json!({
            "id": "gc",
            "invokeGCTimeUtc": ["04:00", "16:00"],
            "delayPostGC": "5 s"
        })
    );
}
