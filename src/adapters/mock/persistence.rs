//! In-memory persistence for tests.
//!
//! Clones share the same backing slot, so a test can keep one handle,
//! give another to a [`crate::store::SessionStore`], and inspect what was saved.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::StorageError;
use crate::traits::{SessionPersistence, SnapshotRef, StoreSnapshot};

#[derive(Debug, Clone, Default)]
pub struct InMemoryPersistence {
    slot: Arc<Mutex<Option<StoreSnapshot>>>,
    fail_saves: Arc<AtomicBool>,
    saves: Arc<AtomicUsize>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing snapshot, as if written by a previous run.
    pub fn with_snapshot(snapshot: StoreSnapshot) -> Self {
        let persistence = Self::new();
        *persistence.slot.lock().unwrap() = Some(snapshot);
        persistence
    }

    /// Make every subsequent `save` fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Last successfully saved snapshot.
    pub fn snapshot(&self) -> Option<StoreSnapshot> {
        self.slot.lock().unwrap().clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl SessionPersistence for InMemoryPersistence {
    fn load(&self) -> Result<Option<StoreSnapshot>, StorageError> {
        Ok(self.snapshot())
    }

    fn save(&self, snapshot: SnapshotRef<'_>) -> Result<(), StorageError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("saves disabled".to_string()));
        }
        *self.slot.lock().unwrap() = Some(snapshot.to_owned_snapshot());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
