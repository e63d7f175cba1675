//! hearth-core - Core library for Hearth
//!
//! This crate contains the household records, the local store, the
//! reconciliation engine and the sync orchestrator shared by every Hearth
//! interface.

pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod repository;
pub mod services;
pub mod store;
pub mod sync;
pub mod util;

pub use config::SyncOptions;
pub use error::{Error, Result, TransportError};
pub use models::{Member, Record, Recurrence, Task};
pub use repository::{ChangeNotifier, HouseholdRepository};
pub use services::HouseholdService;
pub use store::{CollectionStore, SqliteStore, KeyValueStore, MemoryStore};
pub use sync::{
    HttpTransport, RemoteTransport, Snapshot, SyncOrchestrator, SyncReport, SyncState, SyncStatus,
    SyncTrigger,
};
