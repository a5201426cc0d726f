//! JSON-file persistence for the session store.
//!
//! Each persistence key becomes one file in the data directory:
//! `sessions.json` holds the session map, `current_session.json` the current id.
//!
//! The two keys load independently. An unparseable pointer is dropped. An
//! unparseable session map is renamed to `sessions.json.corrupt` so the next
//! save cannot overwrite the only copy of the history.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, warn};

use crate::error::StorageError;
use crate::traits::{
    SessionPersistence, SnapshotRef, StoreSnapshot, CURRENT_SESSION_KEY, SESSIONS_KEY,
};

/// Stores each key as `<data_dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FilePersistence {
    data_dir: PathBuf,
}

impl FilePersistence {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", key))
    }

    fn read_key<T: DeserializeOwned>(&self, key: &'static str) -> Result<Option<T>, StorageError> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path).map_err(|source| StorageError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|source| StorageError::Corrupt { key, source })
    }

    /// Move an unparseable key file out of the way, keeping its bytes.
    fn quarantine(&self, key: &'static str) -> Result<PathBuf, StorageError> {
        let path = self.key_path(key);
        let aside = path.with_extension("json.corrupt");
        fs::rename(&path, &aside).map_err(|source| StorageError::Write {
            path: aside.clone(),
            source,
        })?;
        Ok(aside)
    }

    fn write_key<T: Serialize>(&self, key: &'static str, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|source| StorageError::Serialize { key, source })?;
        let path = self.key_path(key);
        // Write to a sibling then rename so a crash never leaves half a file.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| StorageError::Write {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StorageError::Write { path, source })
    }
}

impl SessionPersistence for FilePersistence {
    fn load(&self) -> Result<Option<StoreSnapshot>, StorageError> {
        let sessions = match self.read_key(SESSIONS_KEY) {
            Err(e @ StorageError::Corrupt { .. }) => {
                match self.quarantine(SESSIONS_KEY) {
                    Ok(aside) => warn!("{}; moved to {:?}", e, aside),
                    Err(move_err) => {
                        error!("{}; could not set it aside: {}", e, move_err);
                        return Err(e);
                    }
                }
                None
            }
            other => other?,
        };
        let current_session_id: Option<String> = match self.read_key(CURRENT_SESSION_KEY) {
            Ok(id) => id,
            Err(e) => {
                warn!("Ignoring saved current session: {}", e);
                None
            }
        };

        match (sessions, current_session_id) {
            (None, None) => Ok(None),
            (sessions, current_session_id) => Ok(Some(StoreSnapshot {
                sessions: sessions.unwrap_or_default(),
                current_session_id,
            })),
        }
    }

    fn save(&self, snapshot: SnapshotRef<'_>) -> Result<(), StorageError> {
        fs::create_dir_all(&self.data_dir).map_err(|source| StorageError::Write {
            path: self.data_dir.clone(),
            source,
        })?;
        self.write_key(SESSIONS_KEY, snapshot.sessions)?;
        self.write_key(CURRENT_SESSION_KEY, &snapshot.current_session_id)
    }
}
