//! Household service: the caller-facing surface of hearth-core.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::watch;

use crate::config::SyncOptions;
use crate::export::ExportDocument;
use crate::models::{Member, Record, Task};
use crate::repository::HouseholdRepository;
use crate::store::{CollectionStore, KeyValueStore, MemoryStore, SqliteStore};
use crate::sync::{
    HttpTransport, RemoteTransport, SyncOrchestrator, SyncReport, SyncStatus, SyncTrigger,
};
use crate::Result;

/// Wires a repository to a sync orchestrator.
///
/// The orchestrator is injected into the repository as its change notifier,
/// so every save or delete schedules a debounced background sync.
pub struct HouseholdService<T: RemoteTransport> {
    repository: HouseholdRepository,
    sync: SyncOrchestrator<T>,
}

impl<T: RemoteTransport> Clone for HouseholdService<T> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            sync: self.sync.clone(),
        }
    }
}

impl HouseholdService<HttpTransport> {
    /// Open a SQLite-backed service talking HTTP to the configured endpoint.
    pub fn open_path(store_path: impl Into<PathBuf>, options: SyncOptions) -> Result<Self> {
        let store = SqliteStore::open(store_path)?;
        let transport = HttpTransport::new()?;
        Self::new(Arc::new(store), transport, options)
    }
}

impl<T: RemoteTransport> HouseholdService<T> {
    pub fn new(kv: Arc<dyn KeyValueStore>, transport: T, options: SyncOptions) -> Result<Self> {
        let store = CollectionStore::new(kv);
        let sync = SyncOrchestrator::new(store.clone(), transport, options)?;
        let repository = HouseholdRepository::new(store).with_notifier(Arc::new(sync.clone()));
        Ok(Self { repository, sync })
    }

    /// In-memory service (primarily for tests).
    pub fn open_in_memory(transport: T, options: SyncOptions) -> Result<Self> {
        Self::new(Arc::new(MemoryStore::new()), transport, options)
    }

    pub const fn repository(&self) -> &HouseholdRepository {
        &self.repository
    }

    pub const fn orchestrator(&self) -> &SyncOrchestrator<T> {
        &self.sync
    }

    pub fn members(&self) -> Result<Vec<Member>> {
        self.repository.list_members()
    }

    pub fn tasks(&self, member_id: Option<&str>) -> Result<Vec<Task>> {
        self.repository.list_tasks(member_id)
    }

    pub fn get_member(&self, id: &str) -> Result<Option<Member>> {
        self.repository.get_member(id)
    }

    pub fn get_task(&self, id: &str) -> Result<Option<Task>> {
        self.repository.get_task(id)
    }

    pub fn save_member(&self, member: Member) -> Result<Record> {
        self.repository.save_member(member)
    }

    pub fn save_task(&self, task: Task) -> Result<Record> {
        self.repository.save_task(task)
    }

    pub fn delete_member(&self, id: &str) -> Result<bool> {
        self.repository.delete_member(id)
    }

    pub fn delete_task(&self, id: &str) -> Result<bool> {
        self.repository.delete_task(id)
    }

    pub fn quick_add(
        &self,
        template_id: &str,
        member_ids: &[String],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Record>> {
        self.repository.quick_add(template_id, member_ids, from, to)
    }

    pub fn is_setup_complete(&self) -> Result<bool> {
        self.repository.is_setup_complete()
    }

    pub fn complete_setup(&self) -> Result<()> {
        self.repository.complete_setup()
    }

    pub fn export_document(&self) -> Result<ExportDocument> {
        self.repository.export_document()
    }

    pub fn import_document(&self, document: ExportDocument) -> Result<()> {
        self.repository.import_document(document)
    }

    pub fn configure(&self, endpoint: &str) -> Result<Option<String>> {
        self.sync.configure(endpoint)
    }

    pub fn is_configured(&self) -> bool {
        self.sync.is_configured()
    }

    pub async fn sync(&self, trigger: SyncTrigger) -> Result<SyncReport> {
        self.sync.sync(trigger).await
    }

    pub async fn test_connection(&self) -> Result<()> {
        self.sync.test_connection().await
    }

    /// Wait for a scheduled background sync to finish.
    pub async fn flush(&self) {
        self.sync.flush().await;
    }

    pub fn status(&self) -> SyncStatus {
        self.sync.status()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.sync.subscribe()
    }

    pub fn last_synced_at(&self) -> Option<i64> {
        self.sync.last_synced_at()
    }
}
