// # dirconf - Directory Server Configuration Tool
//
// Thin integration layer: reads configuration from the environment,
// registers the HTTP client and the resource types, and runs one
// reconciler command. All planning, retry and state logic lives in
// dirconf-core.
//
// ## Configuration
//
// ### Connection
// - `DIRCONF_HTTPS_HOST`: Server host and port, without scheme (e.g. `ds.example.com:1443`)
// - `DIRCONF_USERNAME`: Bind DN or user name
// - `DIRCONF_PASSWORD`: Password
// - `DIRCONF_INSECURE_TRUST_ALL_TLS`: `true` to skip certificate verification
// - `DIRCONF_CA_CERT_PEM_FILES`: Comma-separated extra CA certificates (PEM)
// - `DIRCONF_PRODUCT_VERSION`: Server release (e.g. `9.3.0.0`)
//
// ### State Store
// - `DIRCONF_STATE_STORE_TYPE`: Type of state store (file, memory)
// - `DIRCONF_STATE_STORE_PATH`: Path to state file (for file store)
//
// ### Engine
// - `DIRCONF_MAX_RETRIES`: Retry attempts for transient failures
// - `DIRCONF_RETRY_DELAY_SECS`: Delay between retries
// - `DIRCONF_MODE`: `dry-run` to read from the server but never write to it
// - `DIRCONF_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export DIRCONF_HTTPS_HOST=ds.example.com:1443
// export DIRCONF_USERNAME="cn=Directory Manager"
// export DIRCONF_PASSWORD=...
// export DIRCONF_STATE_STORE_PATH=/var/lib/dirconf/state.json
//
// dirconf plan desired.json
// dirconf apply desired.json
// ```

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use dirconf_core::config::{
    ConnectionConfig, DesiredConfig, DirconfConfig, EngineConfig, StateStoreConfig,
};
use dirconf_core::{
    EngineEvent, MemoryStateStore, ProductVersion, Reconciler, ResourceRegistry, StateStore,
};
use std::env;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: Command completed
/// - 1: Configuration or startup error
/// - 2: Runtime error, or some changes failed
#[derive(Debug, Clone, Copy)]
enum DirconfExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<DirconfExitCode> for ExitCode {
    fn from(code: DirconfExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
///
/// No `Debug`: it holds the password.
struct Config {
    https_host: String,
    username: String,
    password: String,
    insecure_trust_all_tls: bool,
    ca_certificate_pem_files: Vec<String>,
    product_version: Option<ProductVersion>,
    state_store_type: String,
    state_store_path: Option<String>,
    max_retries: Option<usize>,
    retry_delay_secs: Option<u64>,
    dry_run: bool,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            https_host: env::var("DIRCONF_HTTPS_HOST").unwrap_or_default(),
            username: env::var("DIRCONF_USERNAME").unwrap_or_default(),
            password: env::var("DIRCONF_PASSWORD").unwrap_or_default(),
            insecure_trust_all_tls: parse_flag(
                "DIRCONF_INSECURE_TRUST_ALL_TLS",
                env::var("DIRCONF_INSECURE_TRUST_ALL_TLS").ok(),
            )?,
            ca_certificate_pem_files: env::var("DIRCONF_CA_CERT_PEM_FILES")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            product_version: parse_var("DIRCONF_PRODUCT_VERSION")?,
            state_store_type: env::var("DIRCONF_STATE_STORE_TYPE")
                .unwrap_or_else(|_| "file".to_string()),
            state_store_path: env::var("DIRCONF_STATE_STORE_PATH").ok(),
            max_retries: parse_var("DIRCONF_MAX_RETRIES")?,
            retry_delay_secs: parse_var("DIRCONF_RETRY_DELAY_SECS")?,
            dry_run: env::var("DIRCONF_MODE")
                .unwrap_or_default()
                .eq_ignore_ascii_case("dry-run"),
            log_level: env::var("DIRCONF_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.https_host.is_empty() {
            anyhow::bail!(
                "DIRCONF_HTTPS_HOST is required. \
                Set it via: export DIRCONF_HTTPS_HOST=ds.example.com:1443"
            );
        }

        if self.https_host.contains("://") {
            anyhow::bail!(
                "DIRCONF_HTTPS_HOST must not include a scheme (https is implied). Got: {}",
                self.https_host
            );
        }

        if self.username.is_empty() {
            anyhow::bail!("DIRCONF_USERNAME is required");
        }

        if self.password.is_empty() {
            anyhow::bail!(
                "DIRCONF_PASSWORD is required. \
                It is never logged or written to the state file."
            );
        }

        for file in &self.ca_certificate_pem_files {
            if !std::path::Path::new(file).is_file() {
                anyhow::bail!(
                    "DIRCONF_CA_CERT_PEM_FILES entry does not exist or is not a file: {}",
                    file
                );
            }
        }

        match self.state_store_type.as_str() {
            "file" | "memory" => {}
            _ => anyhow::bail!(
                "DIRCONF_STATE_STORE_TYPE '{}' is not supported. \
                Supported types: file, memory",
                self.state_store_type
            ),
        }

        if self.state_store_type == "file" {
            if let Some(ref path) = self.state_store_path {
                if path.is_empty() {
                    anyhow::bail!(
                        "DIRCONF_STATE_STORE_PATH cannot be empty when DIRCONF_STATE_STORE_TYPE=file"
                    );
                }

                if let Some(parent) = std::path::Path::new(path).parent()
                    && !parent.as_os_str().is_empty()
                    && !parent.exists()
                {
                    anyhow::bail!(
                        "DIRCONF_STATE_STORE_PATH parent directory does not exist: {}. \
                            Create it first: mkdir -p {}",
                        parent.display(),
                        parent.display()
                    );
                }
            } else {
                anyhow::bail!(
                    "DIRCONF_STATE_STORE_PATH is required when DIRCONF_STATE_STORE_TYPE=file. \
                    Set it via: export DIRCONF_STATE_STORE_PATH=/var/lib/dirconf/state.json"
                );
            }
        }

        if let Some(max_retries) = self.max_retries
            && max_retries > 10
        {
            anyhow::bail!(
                "DIRCONF_MAX_RETRIES must be between 0 and 10. Got: {}",
                max_retries
            );
        }

        if let Some(retry_delay) = self.retry_delay_secs
            && retry_delay > 300
        {
            anyhow::bail!(
                "DIRCONF_RETRY_DELAY_SECS must be between 0 and 300 seconds. Got: {}",
                retry_delay
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DIRCONF_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        if self.insecure_trust_all_tls {
            eprintln!(
                "WARNING: DIRCONF_INSECURE_TRUST_ALL_TLS is set. \
                      Server certificates will not be verified."
            );
        }

        Ok(())
    }

    /// Build the library configuration
    fn to_dirconf_config(&self) -> DirconfConfig {
        let mut connection =
            ConnectionConfig::new(&self.https_host, &self.username, &self.password)
                .with_dry_run(self.dry_run);
        connection.insecure_trust_all_tls = self.insecure_trust_all_tls;
        connection.ca_certificate_pem_files = self.ca_certificate_pem_files.clone();
        if let Some(version) = self.product_version {
            connection = connection.with_product_version(version);
        }

        let state_store = match (self.state_store_type.as_str(), &self.state_store_path) {
            ("file", Some(path)) => StateStoreConfig::File { path: path.clone() },
            _ => StateStoreConfig::Memory,
        };

        let defaults = EngineConfig::default();
        let engine = EngineConfig {
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_delay_secs: self.retry_delay_secs.unwrap_or(defaults.retry_delay_secs),
            ..defaults
        };

        DirconfConfig {
            connection,
            state_store,
            engine,
        }
    }

    fn log_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

/// Parse an optional environment variable
fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", name, value, e)),
        _ => Ok(None),
    }
}

fn parse_flag(name: &str, value: Option<String>) -> Result<bool> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(false),
        Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => Ok(false),
        Some(v) => anyhow::bail!("{} must be true or false. Got: {}", name, v),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DirconfExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DirconfExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level())
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DirconfExitCode::ConfigError.into();
    }

    info!(
        "Running {} against {}{}",
        cli.command.name(),
        config.https_host,
        if config.dry_run { " [mode: DRY-RUN]" } else { "" }
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DirconfExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run(config, cli.command).await {
            Ok(true) => DirconfExitCode::Success,
            Ok(false) => DirconfExitCode::RuntimeError,
            Err(e) => {
                error!("{:#}", e);
                DirconfExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Run one command; `Ok(false)` means some changes failed
async fn run(config: Config, command: Command) -> Result<bool> {
    let registry = Arc::new(ResourceRegistry::with_builtin_state_stores());
    dirconf_client::register(&registry);
    dirconf_resources::register_all(&registry);

    let dirconf_config = config.to_dirconf_config();
    dirconf_config.validate()?;

    let api = registry.create_config_api(dirconf_client::CLIENT_NAME, &dirconf_config.connection)?;
    let mut store = registry
        .create_state_store(&dirconf_config.state_store)
        .await?;

    if config.dry_run {
        // Simulated changes must not reach the persistent state
        store = Box::new(snapshot(store.as_ref()).await?);
        warn!("DRY-RUN: state changes are discarded at exit");
    }

    let (reconciler, events) = Reconciler::new(api, store, registry, dirconf_config)?;
    let event_log = tokio::spawn(log_events(events));

    let result = execute(&reconciler, command).await;

    // Closing the channel ends the event log
    drop(reconciler);
    if let Err(e) = event_log.await {
        warn!("Event log task failed: {}", e);
    }

    result
}

async fn execute(reconciler: &Reconciler, command: Command) -> Result<bool> {
    match command {
        Command::Plan { file } => {
            let desired = load_desired(&file)?;
            let plan = reconciler.plan(&desired).await?;
            print_plan(&plan);
            Ok(true)
        }

        Command::Apply { file } => {
            let desired = load_desired(&file)?;
            let plan = reconciler.plan(&desired).await?;
            print_plan(&plan);
            if !plan.has_changes() {
                return Ok(true);
            }

            let summary = reconciler.apply(&plan).await?;
            for warning in &summary.warnings {
                println!("Warning: {}", warning);
            }
            for failed in &summary.failed {
                println!("Error: {} ({}): {}", failed.address, failed.action, failed.error);
            }
            println!("{}", summary);
            Ok(summary.is_success())
        }

        Command::Refresh => {
            let summary = reconciler.refresh().await?;
            for address in &summary.changed {
                println!("  ~ {} changed outside dirconf", address);
            }
            for address in &summary.removed {
                println!("  - {} deleted outside dirconf", address);
            }
            for failed in &summary.failed {
                println!("Error: {}: {}", failed.address, failed.error);
            }
            println!("{}", summary);
            Ok(summary.failed.is_empty())
        }

        Command::Import { address, id } => {
            let record = reconciler.import(&address, &id).await?;
            println!("Imported {} (id: {})", address, record.id);
            Ok(true)
        }

        Command::Destroy => {
            let plan = reconciler.plan_destroy().await?;
            print_plan(&plan);
            if !plan.has_changes() {
                return Ok(true);
            }

            let summary = reconciler.apply(&plan).await?;
            println!("{}", summary);
            Ok(summary.is_success())
        }

        Command::Show => {
            let records = reconciler.show().await?;
            if records.is_empty() {
                println!("No resources are managed.");
            }
            for (address, record) in records {
                println!("{} (id: {})", address, record.id);
                println!("{}", serde_json::to_string_pretty(&record.attributes)?);
            }
            Ok(true)
        }
    }
}

fn load_desired(file: &std::path::Path) -> Result<DesiredConfig> {
    DesiredConfig::from_file(file)
        .with_context(|| format!("Failed to load desired configuration from {}", file.display()))
}

fn print_plan(plan: &dirconf_core::Plan) {
    if plan.has_changes() {
        println!("{}", plan);
    } else {
        println!("No changes. The server matches the desired configuration.");
    }
}

/// Copy every record into a memory store
async fn snapshot(store: &dyn StateStore) -> Result<MemoryStateStore> {
    let copy = MemoryStateStore::new();
    for key in store.list().await? {
        if let Some(record) = store.get(&key).await? {
            copy.set(&key, &record).await?;
        }
    }
    Ok(copy)
}

/// Log engine events until the reconciler is dropped
async fn log_events(events: mpsc::Receiver<EngineEvent>) {
    let mut stream = ReceiverStream::new(events);
    while let Some(event) = stream.next().await {
        match event {
            EngineEvent::ChangeFailed {
                address,
                error,
                attempts,
            } => warn!("{} failed after {} attempt(s): {}", address, attempts, error),
            EngineEvent::DriftDetected { address, detail } => {
                info!("Drift on {}: {}", address, detail)
            }
            other => debug!("Engine event: {:?}", other),
        }
    }
}
