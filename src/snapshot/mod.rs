use crate::error::{Result, WatchError};
use crate::model::{Snapshot, StoredState};
use chrono::Utc;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};


/// Durable single-slot storage of the last observed snapshot.
///
/// The state file holds one `StoredState` record serialized as JSON.
/// Paths ending in `.gz` are gzip-compressed; any other extension is read
/// and written as plain JSON.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create an empty state file unless one already exists.
    ///
    /// Returns true when a new file was written.
    pub fn initialize_if_absent(&self) -> Result<bool> {
        if self.path.exists() {
            debug!(path = %self.path.display(), "State file already present");
            return Ok(false);
        }

        self.save_state(&StoredState::empty())?;
        info!(path = %self.path.display(), "Initialized empty state file");
        Ok(true)
    }

    /// Read the stored state.
    ///
    /// Fails with `StorageUnavailable` if the file is missing or corrupt.
    pub fn load(&self) -> Result<StoredState> {
        let file = File::open(&self.path).map_err(|e| {
            storage_error(&self.path, "Failed to open state file", e)
        })?;

        let mut json = String::new();
        if self.is_compressed() {
            GzDecoder::new(file)
                .read_to_string(&mut json)
                .map_err(|e| storage_error(&self.path, "Failed to decompress state file", e))?;
        } else {
            let mut file = file;
            file.read_to_string(&mut json)
                .map_err(|e| storage_error(&self.path, "Failed to read state file", e))?;
        }

        serde_json::from_str(&json)
            .map_err(|e| storage_error(&self.path, "Failed to deserialize state JSON", e))
    }

    /// Store `snapshot` stamped with the current time, replacing prior content.
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        self.save_state(&StoredState {
            last_updated: Utc::now(),
            snapshot: Some(snapshot.clone()),
        })
    }

    /// Write a state record atomically.
    ///
    /// Writes to a .tmp sibling, fsyncs, then renames over the target so a
    /// crash mid-write never leaves a partial state file behind. On failure
    /// the temporary file is removed.
    pub fn save_state(&self, state: &StoredState) -> Result<()> {
        let json = serde_json::to_string(state)
            .map_err(|e| storage_error(&self.path, "Failed to serialize state", e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| storage_error(parent, "Failed to create state directory", e))?;
        }

        let tmp_path = self.tmp_path();
        let written = self
            .write_tmp(&tmp_path, json.as_bytes())
            .and_then(|()| {
                fs::rename(&tmp_path, &self.path).map_err(|e| {
                    storage_error(&self.path, "Failed to rename temporary state file", e)
                })
            });

        if let Err(e) = written {
            if let Err(remove_error) = fs::remove_file(&tmp_path) {
                if remove_error.kind() != std::io::ErrorKind::NotFound {
                    warn!(
                        path = %tmp_path.display(),
                        error = %remove_error,
                        "Failed to remove temporary state file"
                    );
                }
            }
            return Err(e);
        }

        debug!(
            path = %self.path.display(),
            entities = state.snapshot.as_ref().map(|s| s.entity_count()).unwrap_or(0),
            "State saved"
        );

        Ok(())
    }

    /// Write `json` to `tmp_path` and fsync it.
    fn write_tmp(&self, tmp_path: &Path, json: &[u8]) -> Result<()> {
        let tmp_file = File::create(tmp_path)
            .map_err(|e| storage_error(tmp_path, "Failed to create temporary state file", e))?;

        let file = if self.is_compressed() {
            let mut encoder = GzEncoder::new(tmp_file, Compression::default());
            encoder
                .write_all(json)
                .map_err(|e| storage_error(tmp_path, "Failed to write compressed state", e))?;
            encoder
                .finish()
                .map_err(|e| storage_error(tmp_path, "Failed to finish compression", e))?
        } else {
            let mut file = tmp_file;
            file.write_all(json)
                .map_err(|e| storage_error(tmp_path, "Failed to write state", e))?;
            file
        };

        file.sync_all()
            .map_err(|e| storage_error(tmp_path, "Failed to sync state file to disk", e))
    }

    fn is_compressed(&self) -> bool {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext == "gz")
            .unwrap_or(false)
    }

    /// `state.json.gz` -> `state.json.gz.tmp`
    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

fn storage_error(path: &Path, what: &str, e: impl std::fmt::Display) -> WatchError {
    WatchError::StorageUnavailable(format!("{} ({}): {}", what, path.display(), e))
}
