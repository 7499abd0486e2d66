// # File State Store
//
// File-based implementation of StateStore with crash recovery.
//
// ## Purpose
//
// Keeps the observed attributes of every managed object across runs, so the
// next plan only contains what actually changed.
//
// ## Crash Recovery
//
// - Atomic writes: write-then-rename
// - Corruption detection: JSON is validated on load
// - Backup: `<file>.backup` holds the previous good state
// - Recovery: the backup is used when the main file is corrupted
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "records": {
//     "location.east": {
//       "resource_type": "location",
//       "id": "east",
//       "attributes": { "id": "east", "description": "East DC" },
//       "last_updated": "2026-01-09T12:00:00Z"
//     }
//   }
// }
// ```

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::state_store::{StateRecord, StateStore, StateStoreFactory};

/// State file format version
const STATE_FILE_VERSION: &str = "1.0";

/// File-based state store with crash recovery
///
/// Every mutation is written through immediately. Sensitive attributes are
/// stored as they were sent, so the file should be readable by the operator
/// only.
///
/// # Example
///
/// ```rust,no_run
/// use dirconf_core::state::FileStateStore;
/// use dirconf_core::traits::{StateRecord, StateStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::new("/var/lib/dirconf/state.json").await?;
///
///     let record = StateRecord::new("location", "east", serde_json::json!({"id": "east"}));
///     store.set("location.east", &record).await?;
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    state: Arc<RwLock<FileState>>,
}

#[derive(Debug)]
struct FileState {
    records: BTreeMap<String, StateRecord>,
    dirty: bool,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct StateFileFormat {
    version: String,
    records: BTreeMap<String, StateRecord>,
}

impl FileStateStore {
    /// Create or load a file state store
    ///
    /// Loads the existing file, falling back to the backup when the file is
    /// corrupted and to an empty state when both are. Parent directories are
    /// created as needed.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
            && !dir.exists()
        {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| Error::config(format!("cannot create {}: {}", dir.display(), e)))?;
        }

        let records = load_records(&path).await?;

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(FileState {
                records,
                dirty: false,
            })),
        })
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist every record: write `<file>.tmp`, keep the current file as
    /// `<file>.backup`, then rename the temporary file over it
    async fn write_state(&self) -> Result<(), Error> {
        let mut guard = self.state.write().await;

        let contents = serde_json::to_vec_pretty(&StateFileFormat {
            version: STATE_FILE_VERSION.to_string(),
            records: guard.records.clone(),
        })
        .map_err(|e| Error::state_store(format!("cannot serialize state: {}", e)))?;

        let staged = sibling(&self.path, "tmp");
        let mut file = fs::File::create(&staged)
            .await
            .map_err(|e| io_error("create", &staged, e))?;
        file.write_all(&contents)
            .await
            .map_err(|e| io_error("write", &staged, e))?;
        file.sync_all()
            .await
            .map_err(|e| io_error("sync", &staged, e))?;
        drop(file);

        if self.path.exists()
            && let Err(e) = fs::copy(&self.path, sibling(&self.path, "backup")).await
        {
            tracing::warn!("Could not back up {}: {}", self.path.display(), e);
        }

        fs::rename(&staged, &self.path)
            .await
            .map_err(|e| io_error("replace", &self.path, e))?;

        guard.dirty = false;
        tracing::trace!(records = guard.records.len(), "Saved {}", self.path.display());
        Ok(())
    }
}

/// `<path>.<suffix>`, next to the state file whatever its own extension
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> Error {
    Error::state_store(format!("cannot {} {}: {}", action, path.display(), e))
}

/// Load the records at `path`
///
/// A missing file is an empty state. A file that does not parse is replaced
/// by its backup when the backup parses, and otherwise ignored.
async fn load_records(path: &Path) -> Result<BTreeMap<String, StateRecord>, Error> {
    let Some(contents) = read_if_present(path).await? else {
        tracing::debug!("No state at {}, starting empty", path.display());
        return Ok(BTreeMap::new());
    };

    let problem = match decode(&contents) {
        Ok(records) => {
            tracing::debug!(records = records.len(), "Loaded {}", path.display());
            return Ok(records);
        }
        Err(problem) => problem,
    };
    tracing::warn!("{} is unreadable ({}), trying the backup", path.display(), problem);

    let backup = sibling(path, "backup");
    let Some(contents) = read_if_present(&backup).await? else {
        tracing::warn!("No backup at {}, starting empty", backup.display());
        return Ok(BTreeMap::new());
    };

    match decode(&contents) {
        Ok(records) => {
            tracing::info!(records = records.len(), "Recovered state from {}", backup.display());
            if let Err(e) = fs::copy(&backup, path).await {
                tracing::error!("Could not restore {} from backup: {}", path.display(), e);
            }
            Ok(records)
        }
        Err(problem) => {
            tracing::error!("Backup is unreadable too ({}), starting empty", problem);
            Ok(BTreeMap::new())
        }
    }
}

async fn read_if_present(path: &Path) -> Result<Option<String>, Error> {
    match fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error("read", path, e)),
    }
}

fn decode(contents: &str) -> Result<BTreeMap<String, StateRecord>, serde_json::Error> {
    let file: StateFileFormat = serde_json::from_str(contents)?;
    if file.version != STATE_FILE_VERSION {
        tracing::warn!(
            "State file version {} (expected {}), loading anyway",
            file.version,
            STATE_FILE_VERSION
        );
    }
    Ok(file.records)
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get(&self, address: &str) -> Result<Option<StateRecord>, Error> {
        let state_guard = self.state.read().await;
        Ok(state_guard.records.get(address).cloned())
    }

    async fn set(&self, address: &str, record: &StateRecord) -> Result<(), Error> {
        {
            let mut state_guard = self.state.write().await;
            state_guard
                .records
                .insert(address.to_string(), record.clone());
            state_guard.dirty = true;
        }

        self.write_state().await
    }

    async fn delete(&self, address: &str) -> Result<(), Error> {
        {
            let mut state_guard = self.state.write().await;
            if state_guard.records.remove(address).is_none() {
                return Ok(());
            }
            state_guard.dirty = true;
        }

        self.write_state().await
    }

    async fn list(&self) -> Result<Vec<String>, Error> {
        let state_guard = self.state.read().await;
        Ok(state_guard.records.keys().cloned().collect())
    }

    async fn flush(&self) -> Result<(), Error> {
        let dirty = self.state.read().await.dirty;
        if dirty {
            self.write_state().await
        } else {
            Ok(())
        }
    }
}

/// Factory for the `file` state store type
///
/// Expects `{"path": "<file>"}`.
pub struct FileStateStoreFactory;

#[async_trait]
impl StateStoreFactory for FileStateStoreFactory {
    async fn create(&self, config: &serde_json::Value) -> Result<Box<dyn StateStore>, Error> {
        let path = config
            .get("path")
            .and_then(|p| p.as_str())
            .ok_or_else(|| Error::config("File state store requires a 'path' string"))?;

        Ok(Box::new(FileStateStore::new(path).await?))
    }
}
