// # Configuration API Client
//
// HTTP/JSON implementation of `ConfigApi` for the directory server's REST
// configuration API (`https://<host>/config/...`).
//
// ## Properties
//
// - One HTTP exchange per call. Retry and backoff belong to the `Reconciler`
// - Basic authentication on every request
// - 30 second timeout
// - Optional extra trust anchors (PEM files) or trust-all TLS for lab servers
// - Status codes mapped to classified errors (401/403, 404, 409, 429, 5xx)
// - The SCIM `detail` of an error body is surfaced in the error message
// - Dry-run mode: reads are performed, writes are logged and simulated
//
// ## Security
//
// - The password never appears in logs or in `Debug` output
// - Dry-run previews mask the values the `WireFormat` marks sensitive
// - `insecure_trust_all_tls` disables certificate verification and is
//   logged as a warning every time a client is built with it
//
// ## API Reference
//
// - Read: GET `/config/<collection>/<name>` or `/config/<singleton>`
// - Create: POST `/config/<collection>` with the add request
// - Update: PATCH `/config/<path>` with `{"operations": [...]}`
// - Delete: DELETE `/config/<collection>/<name>`

use async_trait::async_trait;
use dirconf_core::config::ConnectionConfig;
use dirconf_core::diff::{Operation, PatchRequest, WireFormat, apply_operations};
use dirconf_core::traits::{ApiResponse, ConfigApi, ConfigApiFactory, ObjectPath};
use dirconf_core::{Error, ResourceRegistry, Result};
use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Name under which the client factory is registered
pub const CLIENT_NAME: &str = "rest";

/// Configuration API client
///
/// Stateless and single-shot: every trait call maps to exactly one request
/// (dry-run PATCH aside, which reads the object to simulate the change).
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the client will:
/// - Perform GET requests
/// - Log the intended POST, PATCH and DELETE requests
/// - Return the object as the server would most likely have returned it
/// - **NOT** modify the server configuration
pub struct ConfigApiClient {
    /// Root of the configuration API, e.g. `https://ds.example.com:1443/config/`
    base_url: Url,

    username: String,

    /// ⚠️ NEVER log this value
    password: String,

    client: reqwest::Client,

    dry_run: bool,
}

impl std::fmt::Debug for ConfigApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl ConfigApiClient {
    /// Create a client for the host in `config`
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a CA certificate file cannot be read
    /// or parsed, or if the HTTP client cannot be built.
    pub fn new(config: &ConnectionConfig) -> Result<Self> {
        Self::with_base_url(config, &config.base_url())
    }

    /// Create a client against an explicit API root
    ///
    /// Credentials, TLS settings and dry-run mode still come from `config`;
    /// only the host part is overridden. Used for proxies and local test
    /// servers.
    pub fn with_base_url(config: &ConnectionConfig, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::config(format!("Invalid configuration API URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::config(format!(
                "Invalid configuration API URL: {}",
                base_url
            )));
        }

        let mut builder = reqwest::Client::builder().timeout(DEFAULT_HTTP_TIMEOUT);

        if config.insecure_trust_all_tls {
            tracing::warn!(
                "TLS certificate verification is DISABLED for {}",
                base_url
            );
            builder = builder.danger_accept_invalid_certs(true);
        }

        for file in &config.ca_certificate_pem_files {
            let pem = std::fs::read(file).map_err(|e| {
                Error::config(format!("Failed to read CA certificate {}: {}", file, e))
            })?;
            let certificate = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                Error::config(format!("Invalid CA certificate {}: {}", file, e))
            })?;
            builder = builder.add_root_certificate(certificate);
        }

        let client = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            username: config.username.clone(),
            password: config.password.clone(),
            client,
            dry_run: config.dry_run,
        })
    }

    /// Whether writes are simulated
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// URL for the given path segments, percent-encoded
    fn url_for<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::config(format!("Invalid configuration API URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
            .header(ACCEPT, "application/json")
    }

    /// Send a request and turn non-success statuses into errors
    async fn send(&self, request: RequestBuilder, target: &str) -> Result<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::transport(format!("Request for {} failed: {}", target, e)))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response, target).await)
        }
    }

    async fn read_object(response: reqwest::Response) -> Result<ApiResponse> {
        let object: Value = response
            .json()
            .await
            .map_err(|e| Error::config_api(format!("Failed to parse response: {}", e)))?;
        Ok(ApiResponse::new(object))
    }
}

#[async_trait]
impl ConfigApi for ConfigApiClient {
    /// Read an object
    ///
    /// ```http
    /// GET /config/plugins/Periodic%20GC
    /// Authorization: Basic <credentials>
    /// Accept: application/json
    /// ```
    async fn get(&self, path: &ObjectPath) -> Result<ApiResponse> {
        let url = self.url_for(path.segments())?;
        tracing::debug!("GET {}", url);

        let response = self
            .send(self.request(Method::GET, url), &path.to_string())
            .await?;
        Self::read_object(response).await
    }

    /// Create an object
    ///
    /// ```http
    /// POST /config/plugins
    /// {"schemas": [...], "pluginName": "Periodic GC", ...}
    /// ```
    async fn create(&self, collection: &str, body: Value, wire: &WireFormat) -> Result<ApiResponse> {
        let url = self.url_for(collection.split('/'))?;

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send POST request to {} with payload: {}",
                url,
                wire.redact_body(&body)
            );
            return Ok(ApiResponse::new(preview_created(body)));
        }

        tracing::debug!("POST {}", url);
        let response = self
            .send(self.request(Method::POST, url).json(&body), collection)
            .await?;
        Self::read_object(response).await
    }

    /// Apply operations to an object
    ///
    /// ```http
    /// PATCH /config/plugins/Periodic%20GC
    /// {"operations": [{"op": "replace", "path": "enabled", "value": true}]}
    /// ```
    async fn patch(
        &self,
        path: &ObjectPath,
        operations: &[Operation],
        wire: &WireFormat,
    ) -> Result<ApiResponse> {
        let url = self.url_for(path.segments())?;

        if self.dry_run {
            let shown = PatchRequest::new(wire.redact_operations(operations));
            tracing::info!(
                "[DRY-RUN] Would send PATCH request to {} with payload: {}",
                url,
                serde_json::to_string(&shown)?
            );
            let mut current = self.get(path).await?.object;
            apply_operations(&mut current, operations, wire)?;
            return Ok(ApiResponse::new(current));
        }

        let request = PatchRequest::new(operations.to_vec());

        tracing::debug!("PATCH {} ({} operation(s))", url, operations.len());
        let response = self
            .send(self.request(Method::PATCH, url).json(&request), &path.to_string())
            .await?;
        Self::read_object(response).await
    }

    /// Delete an object
    ///
    /// ```http
    /// DELETE /config/plugins/Periodic%20GC
    /// ```
    async fn delete(&self, path: &ObjectPath) -> Result<()> {
        let url = self.url_for(path.segments())?;

        if self.dry_run {
            tracing::info!("[DRY-RUN] Would send DELETE request to {}", url);
            return Ok(());
        }

        tracing::debug!("DELETE {}", url);
        self.send(self.request(Method::DELETE, url), &path.to_string())
            .await?;
        Ok(())
    }

    fn api_name(&self) -> &'static str {
        CLIENT_NAME
    }
}

/// Map a non-success response to a classified error
async fn error_from_response(response: reqwest::Response, target: &str) -> Error {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());
    let detail = error_detail(status, &body);

    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "Invalid credentials or insufficient privileges for {} (status {}): {}",
            target,
            status.as_u16(),
            detail
        )),
        404 => Error::not_found(format!("{}: {}", target, detail)),
        409 => Error::conflict(format!("{}: {}", target, detail)),
        429 => Error::rate_limited(format!("{} (status {})", detail, status.as_u16())),
        code => Error::http(code, detail),
    }
}

/// Human-readable reason from an error body
///
/// SCIM error bodies carry it in `detail`; anything else is used as is.
fn error_detail(status: StatusCode, body: &str) -> String {
    let scim_detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| json.get("detail").and_then(Value::as_str).map(str::to_string));
    if let Some(detail) = scim_detail {
        return detail;
    }

    let body = body.trim();
    if body.is_empty() {
        status.canonical_reason().unwrap_or("no detail").to_string()
    } else {
        body.to_string()
    }
}

/// Object the server would return for an add request
///
/// Add requests name the new object in a `<kind>Name` property; the server
/// reports it back as `id`.
fn preview_created(mut body: Value) -> Value {
    if let Value::Object(map) = &mut body {
        let name = map
            .iter()
            .find(|(key, value)| key.ends_with("Name") && value.is_string())
            .map(|(_, value)| value.clone());
        if let Some(name) = name {
            map.entry("id").or_insert(name);
        }
    }
    body
}

/// Factory for creating configuration API clients
pub struct ConfigApiClientFactory;

impl ConfigApiFactory for ConfigApiClientFactory {
    fn create(&self, config: &ConnectionConfig) -> Result<Box<dyn ConfigApi>> {
        config.validate()?;

        if config.dry_run {
            tracing::warn!(
                "Configuration API client running in DRY-RUN mode - no changes will be made"
            );
        }

        Ok(Box::new(ConfigApiClient::new(config)?))
    }
}

/// Register the configuration API client with a registry
///
/// # Example
///
/// ```rust
/// use dirconf_core::ResourceRegistry;
///
/// let registry = ResourceRegistry::new();
/// dirconf_client::register(&registry);
/// assert!(registry.has_config_api("rest"));
/// ```
pub fn register(registry: &ResourceRegistry) {
    registry.register_config_api(CLIENT_NAME, Box::new(ConfigApiClientFactory));
}
