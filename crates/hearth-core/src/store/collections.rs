//! Typed access to the collection and sync keys of the local store

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::KeyValueStore;
use crate::error::Result;
use crate::models::{parse_positive_millis, Record};
use crate::util::normalize_text_option;

/// Keys under which Hearth keeps its local state
pub mod keys {
    pub const MEMBERS: &str = "hearth_members";
    pub const TASKS: &str = "hearth_tasks";
    pub const SYNC_ENDPOINT: &str = "hearth_sync_endpoint";
    pub const LAST_SYNC_TIME: &str = "hearth_last_sync_time";
    pub const SETUP_COMPLETE: &str = "hearth_setup_complete";
}

/// Collection-level view of a [`KeyValueStore`].
///
/// Each write replaces one whole key; there are no partial collection writes.
/// Clones share one write lock, which every read-modify-write of the member
/// or task collection must hold from its read through its write.
#[derive(Clone)]
pub struct CollectionStore {
    kv: Arc<dyn KeyValueStore>,
    write_lock: Arc<Mutex<()>>,
}

/// Held while a collection is read, changed and written back.
///
/// Never hold one across an `.await`.
pub type CollectionWriteGuard<'a> = MutexGuard<'a, ()>;

impl std::fmt::Debug for CollectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionStore").finish_non_exhaustive()
    }
}

impl CollectionStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Serialize collection read-modify-write sequences across clones.
    pub fn write_lock(&self) -> CollectionWriteGuard<'_> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn members(&self) -> Result<Vec<Record>> {
        self.read_collection(keys::MEMBERS)
    }

    pub fn set_members(&self, members: &[Record]) -> Result<()> {
        self.write_collection(keys::MEMBERS, members)
    }

    pub fn tasks(&self) -> Result<Vec<Record>> {
        self.read_collection(keys::TASKS)
    }

    pub fn set_tasks(&self, tasks: &[Record]) -> Result<()> {
        self.write_collection(keys::TASKS, tasks)
    }

    /// Persisted sync endpoint, trimmed; blank values read as unset
    pub fn endpoint(&self) -> Result<Option<String>> {
        Ok(normalize_text_option(self.kv.get(keys::SYNC_ENDPOINT)?))
    }

    /// Persist the endpoint, or clear it with `None`.
    ///
    /// Clearing stores a blank value so an explicit clear can be told apart
    /// from a store that never had an endpoint.
    pub fn set_endpoint(&self, endpoint: Option<&str>) -> Result<()> {
        self.kv.set(keys::SYNC_ENDPOINT, endpoint.unwrap_or_default())
    }

    /// Whether the endpoint was explicitly cleared
    pub fn endpoint_cleared(&self) -> Result<bool> {
        Ok(self
            .kv
            .get(keys::SYNC_ENDPOINT)?
            .is_some_and(|value| value.trim().is_empty()))
    }

    /// Completion time of the last successful sync (Unix ms)
    pub fn last_synced_at(&self) -> Result<Option<i64>> {
        Ok(self
            .kv
            .get(keys::LAST_SYNC_TIME)?
            .as_deref()
            .and_then(parse_positive_millis))
    }

    pub fn set_last_synced_at(&self, timestamp_ms: i64) -> Result<()> {
        self.kv
            .set(keys::LAST_SYNC_TIME, &timestamp_ms.to_string())
    }

    pub fn is_setup_complete(&self) -> Result<bool> {
        Ok(self.kv.get(keys::SETUP_COMPLETE)?.as_deref() == Some("true"))
    }

    pub fn complete_setup(&self) -> Result<()> {
        self.kv.set(keys::SETUP_COMPLETE, "true")
    }

    fn read_collection(&self, key: &str) -> Result<Vec<Record>> {
        match self.kv.get(key)? {
            Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
            _ => Ok(Vec::new()),
        }
    }

    fn write_collection(&self, key: &str, records: &[Record]) -> Result<()> {
        let serialized = serde_json::to_string(records)?;
        self.kv.set(key, &serialized)
    }
}
