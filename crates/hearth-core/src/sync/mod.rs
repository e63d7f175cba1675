//! Offline-first reconciliation with a single remote JSON endpoint.
//!
//! A sync fetches the full remote state, merges it with the local
//! collections by id (last modified wins), commits the merge locally and
//! only then pushes it back as the new remote state.

mod merge;
mod orchestrator;
mod status;
mod transport;

pub use merge::{ensure_timestamp, merge_by_id, merge_by_id_at, normalize_collection};
pub use orchestrator::{SyncOrchestrator, SyncReport};
pub use status::{format_last_synced, StatusPublisher, SyncState, SyncStatus, SyncTrigger};
pub use transport::{HttpTransport, RemoteTransport, Snapshot, MAX_SYNCED_PHOTO_CHARS};
