//! Snapshot history and its JSON file persistence.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::model::Snapshot;
use crate::errors::{Error, Result};

/// Number of snapshots kept in history.
pub const HISTORY_LIMIT: usize = 200;

/// `{latest, history}` document. `latest` is always the last history entry
/// when history is non-empty.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotStore {
    #[serde(default)]
    pub latest: Option<Snapshot>,
    #[serde(default)]
    pub history: Vec<Snapshot>,
}

impl SnapshotStore {
    /// Append a snapshot, dropping the oldest entries beyond [`HISTORY_LIMIT`].
    pub fn push(&mut self, snapshot: Snapshot) {
        self.history.push(snapshot.clone());
        if self.history.len() > HISTORY_LIMIT {
            let excess = self.history.len() - HISTORY_LIMIT;
            self.history.drain(..excess);
        }
        self.latest = Some(snapshot);
    }

    /// The most recent `limit` snapshots, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<Snapshot> {
        let start = self.history.len().saturating_sub(limit);
        self.history[start..].to_vec()
    }
}

/// Reads and replaces the store document on disk.
///
/// Writes go to a sibling temporary file that is renamed over the target,
/// so an interrupted write never leaves a truncated document behind.
#[derive(Clone, Debug)]
pub struct SnapshotFileStore {
    path: PathBuf,
}

impl SnapshotFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the store. A missing, empty or unreadable document yields an
    /// empty store.
    pub fn load(&self) -> SnapshotStore {
        if !self.path.exists() {
            debug!("No market overview file at {}", self.path.display());
            return SnapshotStore::default();
        }
        let raw = match fs::read(&self.path) {
            Ok(raw) if !raw.is_empty() => raw,
            Ok(_) => return SnapshotStore::default(),
            Err(e) => {
                warn!("Failed to read {}: {}", self.path.display(), e);
                return SnapshotStore::default();
            }
        };
        match serde_json::from_slice::<SnapshotStore>(&raw) {
            Ok(mut store) => {
                if store.latest.is_none() {
                    store.latest = store.history.last().cloned();
                }
                store
            }
            Err(e) => {
                warn!(
                    "Ignoring unreadable market overview file {}: {}",
                    self.path.display(),
                    e
                );
                SnapshotStore::default()
            }
        }
    }

    /// Replace the document with `store`.
    ///
    /// The blocking write and rename keep going if the awaiting future is
    /// dropped, so callers that may be aborted run this on a task of its own.
    pub async fn save(&self, store: &SnapshotStore) -> Result<()> {
        let json = serde_json::to_vec_pretty(store)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| persistence(&self.path, e))?;
            }
        }

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| persistence(&tmp, e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(persistence(&self.path, e));
        }
        debug!(
            "Persisted {} snapshots to {}",
            store.history.len(),
            self.path.display()
        );
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn persistence(path: &Path, e: std::io::Error) -> Error {
    Error::Persistence(format!("{}: {}", path.display(), e))
}
