//! Sync lifecycle: scheduling, mutual exclusion and the reconciliation
//! transaction.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::merge::{merge_by_id, normalize_collection};
use super::status::{StatusPublisher, SyncState, SyncStatus, SyncTrigger};
use super::transport::{RemoteTransport, Snapshot};
use crate::config::{normalize_endpoint, SyncOptions};
use crate::error::{Error, Result, TransportError};
use crate::repository::ChangeNotifier;
use crate::store::CollectionStore;
use crate::util::unix_millis_now;

/// Outcome of a successful sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub members: usize,
    pub tasks: usize,
    /// Recorded last-synced time (Unix ms)
    pub completed_at: i64,
}

/// Owns the sync state machine for one local store and one remote endpoint.
///
/// Cloning is cheap; clones share state, so one clone can be injected into
/// the repository as its [`ChangeNotifier`] while another drives manual syncs.
pub struct SyncOrchestrator<T: RemoteTransport> {
    inner: Arc<Inner<T>>,
}

impl<T: RemoteTransport> Clone for SyncOrchestrator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<T> {
    store: CollectionStore,
    transport: T,
    options: SyncOptions,
    endpoint: Mutex<Option<String>>,
    in_flight: AtomicBool,
    status: StatusPublisher,
    debounce: Mutex<DebounceTimer>,
}

impl<T: RemoteTransport> SyncOrchestrator<T> {
    /// Load the persisted endpoint and last-synced time and start in
    /// `idle` (configured) or `unconfigured`.
    pub fn new(store: CollectionStore, transport: T, options: SyncOptions) -> Result<Self> {
        let endpoint = store.endpoint()?;
        let last_synced_at = store.last_synced_at()?;
        let state = if endpoint.is_some() {
            SyncState::Idle
        } else {
            SyncState::Unconfigured
        };

        Ok(Self {
            inner: Arc::new(Inner {
                store,
                transport,
                options,
                endpoint: Mutex::new(endpoint),
                in_flight: AtomicBool::new(false),
                status: StatusPublisher::new(state, last_synced_at),
                debounce: Mutex::new(DebounceTimer::default()),
            }),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.inner.endpoint().is_some()
    }

    pub fn endpoint(&self) -> Option<String> {
        self.inner.endpoint()
    }

    pub fn options(&self) -> SyncOptions {
        self.inner.options
    }

    /// Set or clear the sync endpoint.
    ///
    /// A blank endpoint clears the configuration and cancels any pending
    /// background sync. Returns the endpoint now in effect.
    pub fn configure(&self, endpoint: &str) -> Result<Option<String>> {
        let endpoint = normalize_endpoint(endpoint)?;
        self.inner.store.set_endpoint(endpoint.as_deref())?;
        *lock(&self.inner.endpoint) = endpoint.clone();

        if endpoint.is_some() {
            tracing::info!("Sync endpoint configured");
            self.inner.status.publish(SyncState::Idle, None);
        } else {
            if lock(&self.inner.debounce).cancel() {
                tracing::debug!("Cancelled pending background sync");
            }
            tracing::info!("Sync endpoint cleared");
            self.inner.status.publish(SyncState::Unconfigured, None);
        }
        Ok(endpoint)
    }

    /// Schedule a background sync after the quiet window.
    ///
    /// Calls within the window collapse into one sync; each call restarts the
    /// window. Does nothing while unconfigured or outside a tokio runtime.
    pub fn request_sync(&self) {
        if !self.is_configured() {
            return;
        }
        if tokio::runtime::Handle::try_current().is_err() {
            tracing::warn!("No async runtime available; background sync not scheduled");
            return;
        }

        let fired = Arc::new(AtomicBool::new(false));
        let inner = Arc::clone(&self.inner);
        let delay = self.inner.options.debounce;
        let task_fired = Arc::clone(&fired);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task_fired.store(true, Ordering::SeqCst);
            // Failures are already mirrored into the status.
            let _ = inner.sync(SyncTrigger::Background).await;
        });

        lock(&self.inner.debounce).replace(PendingSync { handle, fired });
        tracing::debug!("Background sync scheduled in {:?}", delay);
    }

    /// Whether a background sync is scheduled or running
    pub fn has_pending_sync(&self) -> bool {
        lock(&self.inner.debounce)
            .pending
            .as_ref()
            .is_some_and(|pending| !pending.handle.is_finished())
    }

    /// Wait for the scheduled background sync, if any, to finish.
    pub async fn flush(&self) {
        let pending = lock(&self.inner.debounce).take();
        if let Some(pending) = pending {
            if let Err(error) = pending.handle.await {
                if !error.is_cancelled() {
                    tracing::warn!("Background sync task failed: {}", error);
                }
            }
        }
    }

    /// Run one reconciliation transaction now.
    pub async fn sync(&self, trigger: SyncTrigger) -> Result<SyncReport> {
        self.inner.sync(trigger).await
    }

    /// Check that the endpoint answers a fetch. Local data is not touched.
    pub async fn test_connection(&self) -> Result<()> {
        let Some(endpoint) = self.inner.endpoint() else {
            self.inner.status.publish(SyncState::Unconfigured, None);
            return Err(Error::Unconfigured);
        };

        self.inner
            .status
            .publish(SyncState::Syncing, Some("Testing connection…".to_string()));
        match self.inner.bounded(self.inner.transport.fetch(&endpoint)).await {
            Ok(_) => {
                self.inner
                    .status
                    .publish(SyncState::Idle, Some("Connection successful".to_string()));
                Ok(())
            }
            Err(error) => {
                tracing::warn!("Connection test failed: {}", error);
                self.inner
                    .status
                    .publish(SyncState::Error, Some(format!("Connection failed: {error}")));
                Err(error)
            }
        }
    }

    /// Whether a reconciliation transaction is currently running
    pub fn is_syncing(&self) -> bool {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> SyncStatus {
        self.inner.status.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status.subscribe()
    }

    pub fn last_synced_at(&self) -> Option<i64> {
        self.inner.status.current().last_synced_at
    }
}

impl<T: RemoteTransport> ChangeNotifier for SyncOrchestrator<T> {
    fn notify_change(&self) {
        self.request_sync();
    }
}

impl<T: RemoteTransport> Inner<T> {
    fn endpoint(&self) -> Option<String> {
        lock(&self.endpoint).clone()
    }

    async fn sync(&self, trigger: SyncTrigger) -> Result<SyncReport> {
        let Some(endpoint) = self.endpoint() else {
            self.status.publish(SyncState::Unconfigured, None);
            return Err(Error::Unconfigured);
        };
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::debug!("Sync already in progress; dropping {:?} request", trigger);
            return Err(Error::ConcurrentSyncRejected);
        };

        self.status.publish(
            SyncState::Syncing,
            Some(trigger.syncing_message().to_string()),
        );

        match self.reconcile(&endpoint).await {
            Ok(report) => {
                self.status.publish_success(report.completed_at);
                tracing::info!(
                    "Sync completed: {} members, {} tasks",
                    report.members,
                    report.tasks
                );
                Ok(report)
            }
            Err(error) => {
                tracing::warn!("Sync failed: {}", error);
                self.status
                    .publish(SyncState::Error, Some(format!("Sync failed: {error}")));
                Err(error)
            }
        }
    }

    async fn reconcile(&self, endpoint: &str) -> Result<SyncReport> {
        let remote = self.bounded(self.transport.fetch(endpoint)).await?;
        let remote_members = normalize_collection(remote.members);
        let remote_tasks = normalize_collection(remote.tasks);

        // Local state is read after the fetch resolves and under the write
        // lock, so a save on another thread lands before the read or after
        // the commit, never in between.
        let merged = {
            let _guard = self.store.write_lock();
            let local_members = normalize_collection(self.store.members()?);
            let local_tasks = normalize_collection(self.store.tasks()?);

            let merged = Snapshot {
                members: merge_by_id(&local_members, &remote_members),
                tasks: merge_by_id(&local_tasks, &remote_tasks),
            };

            self.store.set_members(&merged.members)?;
            self.store.set_tasks(&merged.tasks)?;
            merged
        };
        tracing::debug!(
            "Committed merged state locally ({} members, {} tasks)",
            merged.members.len(),
            merged.tasks.len()
        );

        self.bounded(self.transport.push(endpoint, &merged.sanitized()))
            .await?;

        let now = unix_millis_now();
        let completed_at = self
            .status
            .current()
            .last_synced_at
            .map_or(now, |previous| previous.max(now));
        self.store.set_last_synced_at(completed_at)?;

        Ok(SyncReport {
            members: merged.members.len(),
            tasks: merged.tasks.len(),
            completed_at,
        })
    }

    /// Apply the request timeout to one transport call.
    async fn bounded<R>(
        &self,
        call: impl Future<Output = std::result::Result<R, TransportError>>,
    ) -> Result<R> {
        let after = self.options.request_timeout;
        match tokio::time::timeout(after, call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(TransportError::Timeout { after }.into()),
        }
    }
}

/// Releases the in-flight flag when dropped, on every exit path.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

struct PendingSync {
    handle: JoinHandle<()>,
    /// Set once the quiet window has elapsed and the sync has started.
    fired: Arc<AtomicBool>,
}

impl PendingSync {
    fn cancel(self) -> bool {
        if self.fired.load(Ordering::SeqCst) {
            false
        } else {
            self.handle.abort();
            true
        }
    }
}

/// Trailing-edge debounce slot.
///
/// Replacing or cancelling only aborts a timer that is still waiting; a sync
/// that has already started runs to completion.
#[derive(Default)]
struct DebounceTimer {
    pending: Option<PendingSync>,
}

impl DebounceTimer {
    fn replace(&mut self, next: PendingSync) {
        if let Some(previous) = self.pending.replace(next) {
            previous.cancel();
        }
    }

    fn cancel(&mut self) -> bool {
        self.pending.take().is_some_and(PendingSync::cancel)
    }

    fn take(&mut self) -> Option<PendingSync> {
        self.pending.take()
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;
    use crate::store::{keys, KeyValueStore, MemoryStore};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::Notify;

    const ENDPOINT: &str = "https://sync.example.com/exec";

    #[derive(Default)]
    struct FakeTransport {
        remote: Mutex<Snapshot>,
        pushed: Mutex<Vec<Snapshot>>,
        fetches: AtomicUsize,
        fetch_status: Mutex<Option<u16>>,
        push_status: Mutex<Option<u16>>,
        hang_fetch: AtomicBool,
        gate: Option<Arc<Notify>>,
    }

    impl FakeTransport {
        fn with_remote(remote: Snapshot) -> Self {
            Self {
                remote: Mutex::new(remote),
                ..Self::default()
            }
        }

        fn gated(gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::default()
            }
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }

        fn pushed(&self) -> Vec<Snapshot> {
            lock(&self.pushed).clone()
        }
    }

    impl RemoteTransport for FakeTransport {
        async fn fetch(&self, endpoint: &str) -> std::result::Result<Snapshot, TransportError> {
            assert_eq!(endpoint, ENDPOINT);
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.hang_fetch.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if let Some(status) = *lock(&self.fetch_status) {
                return Err(TransportError::Status {
                    method: "GET",
                    status,
                });
            }
            Ok(lock(&self.remote).clone())
        }

        async fn push(
            &self,
            _endpoint: &str,
            snapshot: &Snapshot,
        ) -> std::result::Result<(), TransportError> {
            if let Some(status) = *lock(&self.push_status) {
                return Err(TransportError::Status {
                    method: "POST",
                    status,
                });
            }
            lock(&self.pushed).push(snapshot.clone());
            *lock(&self.remote) = snapshot.clone();
            Ok(())
        }
    }

    struct Harness {
        kv: Arc<MemoryStore>,
        store: CollectionStore,
        transport: Arc<FakeTransport>,
        orchestrator: SyncOrchestrator<Arc<FakeTransport>>,
    }

    fn harness(transport: FakeTransport, configured: bool) -> Harness {
        let kv = Arc::new(MemoryStore::new());
        let store = CollectionStore::new(kv.clone());
        if configured {
            store.set_endpoint(Some(ENDPOINT)).unwrap();
        }
        let transport = Arc::new(transport);
        let orchestrator =
            SyncOrchestrator::new(store.clone(), transport.clone(), SyncOptions::default())
                .unwrap();
        Harness {
            kv,
            store,
            transport,
            orchestrator,
        }
    }

    fn record(id: &str, last_modified: i64, name: &str) -> Record {
        Record::new(id)
            .with_last_modified(last_modified)
            .with_field("name", name)
    }

    fn names(records: &[Record]) -> Vec<(String, String)> {
        records
            .iter()
            .map(|record| {
                (
                    record.id().unwrap_or_default().to_string(),
                    record.str_field("name").unwrap_or_default().to_string(),
                )
            })
            .collect()
    }

    fn pair(id: &str, name: &str) -> (String, String) {
        (id.to_string(), name.to_string())
    }

    #[tokio::test]
    async fn test_initial_state_follows_persisted_endpoint() {
        let unconfigured = harness(FakeTransport::default(), false);
        assert_eq!(unconfigured.orchestrator.status().state, SyncState::Unconfigured);

        let configured = harness(FakeTransport::default(), true);
        assert_eq!(configured.orchestrator.status().state, SyncState::Idle);
        assert_eq!(configured.orchestrator.endpoint().as_deref(), Some(ENDPOINT));
    }

    #[tokio::test]
    async fn test_sync_end_to_end_scenario() {
        let remote = Snapshot {
            members: Vec::new(),
            tasks: vec![record("t1", 150, "Dishes-old"), record("t2", 300, "Laundry")],
        };
        let h = harness(FakeTransport::with_remote(remote), true);
        h.store.set_tasks(&[record("t1", 200, "Dishes")]).unwrap();

        let report = h.orchestrator.sync(SyncTrigger::Manual).await.unwrap();

        let expected = vec![pair("t1", "Dishes"), pair("t2", "Laundry")];
        assert_eq!(names(&h.store.tasks().unwrap()), expected);
        assert_eq!(names(&h.transport.pushed()[0].tasks), expected);
        assert_eq!(report.tasks, 2);
        assert_eq!(h.orchestrator.status().state, SyncState::Success);
        assert_eq!(h.orchestrator.last_synced_at(), Some(report.completed_at));
        assert_eq!(h.store.last_synced_at().unwrap(), Some(report.completed_at));
        assert!(!h.orchestrator.is_syncing());
    }

    #[tokio::test]
    async fn test_local_delete_is_restored_while_remote_holds_record() {
        let remote = Snapshot {
            members: vec![record("m1", 10, "Ada")],
            tasks: Vec::new(),
        };
        let h = harness(FakeTransport::with_remote(remote), true);
        h.store.set_members(&[]).unwrap();

        h.orchestrator.sync(SyncTrigger::Manual).await.unwrap();

        assert_eq!(names(&h.store.members().unwrap()), vec![pair("m1", "Ada")]);
    }

    #[tokio::test]
    async fn test_sync_unconfigured_has_no_side_effects() {
        let h = harness(FakeTransport::default(), false);
        h.store.set_tasks(&[record("t1", 1, "a")]).unwrap();

        let result = h.orchestrator.sync(SyncTrigger::Manual).await;

        assert!(matches!(result, Err(Error::Unconfigured)));
        assert_eq!(h.transport.fetches(), 0);
        assert_eq!(h.orchestrator.status().state, SyncState::Unconfigured);
        assert_eq!(h.store.last_synced_at().unwrap(), None);
    }

    #[tokio::test]
    async fn test_concurrent_sync_is_rejected() {
        let gate = Arc::new(Notify::new());
        let h = harness(FakeTransport::gated(gate.clone()), true);

        let first = {
            let orchestrator = h.orchestrator.clone();
            tokio::spawn(async move { orchestrator.sync(SyncTrigger::Manual).await })
        };
        while h.transport.fetches() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(h.orchestrator.is_syncing());

        let second = h.orchestrator.sync(SyncTrigger::Manual).await;
        assert!(matches!(second, Err(Error::ConcurrentSyncRejected)));
        assert_eq!(h.orchestrator.status().state, SyncState::Syncing);

        gate.notify_one();
        first.await.unwrap().unwrap();

        assert_eq!(h.transport.fetches(), 1);
        assert_eq!(h.transport.pushed().len(), 1);
        assert!(!h.orchestrator.is_syncing());
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_local_store_untouched() {
        let h = harness(FakeTransport::default(), true);
        *lock(&h.transport.fetch_status) = Some(503);
        h.kv.set(keys::TASKS, r#"[{"id":"abc","name":"no timestamp"}]"#)
            .unwrap();

        let result = h.orchestrator.sync(SyncTrigger::Manual).await;

        match result {
            Err(Error::Transport(error)) => assert_eq!(error.status(), Some(503)),
            other => panic!("expected transport error, got {other:?}"),
        }
        assert_eq!(
            h.kv.get(keys::TASKS).unwrap().as_deref(),
            Some(r#"[{"id":"abc","name":"no timestamp"}]"#)
        );
        let status = h.orchestrator.status();
        assert_eq!(status.state, SyncState::Error);
        assert_eq!(status.message, "Sync failed: GET failed (503)");
        assert!(!h.orchestrator.is_syncing());
        assert!(h.transport.pushed().is_empty());
    }

    #[tokio::test]
    async fn test_push_failure_keeps_local_merge_committed() {
        let remote = Snapshot {
            members: vec![record("m2", 10, "Remote")],
            tasks: Vec::new(),
        };
        let h = harness(FakeTransport::with_remote(remote), true);
        *lock(&h.transport.push_status) = Some(500);
        h.store.set_members(&[record("m1", 10, "Local")]).unwrap();

        let result = h.orchestrator.sync(SyncTrigger::Background).await;

        assert!(matches!(result, Err(Error::Transport(_))));
        assert_eq!(
            names(&h.store.members().unwrap()),
            vec![pair("m2", "Remote"), pair("m1", "Local")]
        );
        assert_eq!(h.orchestrator.status().state, SyncState::Error);
        assert_eq!(h.orchestrator.last_synced_at(), None);
        assert!(!h.orchestrator.is_syncing());
    }

    #[tokio::test]
    async fn test_oversized_photo_is_blanked_only_on_the_wire() {
        let h = harness(FakeTransport::default(), true);
        let photo = "p".repeat(50_000);
        h.store
            .set_members(&[record("m1", 10, "Ada").with_field("photo", photo.clone())])
            .unwrap();

        h.orchestrator.sync(SyncTrigger::Manual).await.unwrap();

        assert_eq!(h.transport.pushed()[0].members[0].str_field("photo"), Some(""));
        assert_eq!(
            h.store.members().unwrap()[0].str_field("photo"),
            Some(photo.as_str())
        );
    }

    #[tokio::test]
    async fn test_sync_stamps_missing_timestamps() {
        let remote = Snapshot {
            members: vec![Record::new("1700000000000").with_field("name", "Remote")],
            tasks: Vec::new(),
        };
        let h = harness(FakeTransport::with_remote(remote), true);

        h.orchestrator.sync(SyncTrigger::Manual).await.unwrap();

        let members = h.store.members().unwrap();
        assert_eq!(members[0].last_modified, Some(1_700_000_000_000));
    }

    #[tokio::test]
    async fn test_connection_test_only_reads() {
        let h = harness(FakeTransport::default(), true);
        h.store.set_members(&[record("m1", 1, "Local")]).unwrap();

        h.orchestrator.test_connection().await.unwrap();

        assert_eq!(h.transport.fetches(), 1);
        assert!(h.transport.pushed().is_empty());
        let status = h.orchestrator.status();
        assert_eq!(status.state, SyncState::Idle);
        assert_eq!(status.message, "Connection successful");
        assert_eq!(status.last_synced_at, None);

        *lock(&h.transport.fetch_status) = Some(404);
        assert!(h.orchestrator.test_connection().await.is_err());
        let status = h.orchestrator.status();
        assert_eq!(status.state, SyncState::Error);
        assert_eq!(status.message, "Connection failed: GET failed (404)");
    }

    #[tokio::test]
    async fn test_connection_test_unconfigured() {
        let h = harness(FakeTransport::default(), false);
        assert!(matches!(
            h.orchestrator.test_connection().await,
            Err(Error::Unconfigured)
        ));
        assert_eq!(h.transport.fetches(), 0);
    }

    #[tokio::test]
    async fn test_configure_persists_and_clears_endpoint() {
        let h = harness(FakeTransport::default(), false);

        let configured = h.orchestrator.configure(&format!("  {ENDPOINT} ")).unwrap();
        assert_eq!(configured.as_deref(), Some(ENDPOINT));
        assert_eq!(h.store.endpoint().unwrap().as_deref(), Some(ENDPOINT));
        assert_eq!(h.orchestrator.status().state, SyncState::Idle);

        assert!(h.orchestrator.configure("not a url").is_err());
        assert_eq!(h.orchestrator.endpoint().as_deref(), Some(ENDPOINT));

        assert_eq!(h.orchestrator.configure("   ").unwrap(), None);
        assert_eq!(h.store.endpoint().unwrap(), None);
        assert_eq!(h.orchestrator.status().state, SyncState::Unconfigured);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_sync_debounces_bursts() {
        let h = harness(FakeTransport::default(), true);
        let start = tokio::time::Instant::now();

        h.orchestrator.request_sync();
        tokio::time::advance(Duration::from_millis(1_000)).await;
        h.orchestrator.request_sync();
        tokio::time::advance(Duration::from_millis(2_000)).await;
        h.orchestrator.request_sync();
        assert!(h.orchestrator.has_pending_sync());
        assert_eq!(h.transport.fetches(), 0);

        h.orchestrator.flush().await;

        assert_eq!(h.transport.fetches(), 1);
        assert_eq!(h.transport.pushed().len(), 1);
        assert!(start.elapsed() >= Duration::from_millis(6_000));
        assert_eq!(h.orchestrator.status().state, SyncState::Success);
        assert!(!h.orchestrator.has_pending_sync());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clearing_endpoint_cancels_pending_sync() {
        let h = harness(FakeTransport::default(), true);

        h.orchestrator.request_sync();
        h.orchestrator.configure("").unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        h.orchestrator.flush().await;

        assert_eq!(h.transport.fetches(), 0);
        assert_eq!(h.orchestrator.status().state, SyncState::Unconfigured);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_sync_is_noop_when_unconfigured() {
        let h = harness(FakeTransport::default(), false);
        h.orchestrator.notify_change();
        assert!(!h.orchestrator.has_pending_sync());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_fetch_times_out_and_releases_guard() {
        let h = harness(FakeTransport::default(), true);
        h.transport.hang_fetch.store(true, Ordering::SeqCst);
        let start = tokio::time::Instant::now();

        let result = h.orchestrator.sync(SyncTrigger::Manual).await;

        assert!(matches!(
            result,
            Err(Error::Transport(TransportError::Timeout { .. }))
        ));
        assert!(start.elapsed() >= Duration::from_secs(30));
        assert!(!h.orchestrator.is_syncing());
        assert_eq!(h.orchestrator.status().state, SyncState::Error);

        h.transport.hang_fetch.store(false, Ordering::SeqCst);
        h.orchestrator.sync(SyncTrigger::Manual).await.unwrap();
        assert_eq!(h.transport.fetches(), 2);
    }

    /// Memory store whose next member read signals and then stalls, leaving
    /// a window between a sync's local read and its commit.
    struct StallingStore {
        inner: MemoryStore,
        stall_next_members_read: AtomicBool,
        entered: Mutex<Option<std::sync::mpsc::Sender<()>>>,
    }

    impl KeyValueStore for StallingStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            if key == keys::MEMBERS && self.stall_next_members_read.swap(false, Ordering::SeqCst) {
                if let Some(entered) = lock(&self.entered).take() {
                    let _ = entered.send(());
                }
                std::thread::sleep(Duration::from_millis(200));
            }
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_save_during_local_merge_is_not_lost() {
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let kv = Arc::new(StallingStore {
            inner: MemoryStore::new(),
            stall_next_members_read: AtomicBool::new(false),
            entered: Mutex::new(Some(entered_tx)),
        });
        let store = CollectionStore::new(kv.clone());
        store.set_endpoint(Some(ENDPOINT)).unwrap();
        store.set_members(&[record("1", 10, "Ada")]).unwrap();

        let transport = Arc::new(FakeTransport::default());
        let orchestrator =
            SyncOrchestrator::new(store.clone(), transport.clone(), SyncOptions::default())
                .unwrap();
        let repository = crate::repository::HouseholdRepository::new(store.clone());

        kv.stall_next_members_read.store(true, Ordering::SeqCst);
        let running = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.sync(SyncTrigger::Manual).await })
        };

        tokio::task::spawn_blocking(move || {
            entered_rx.recv().unwrap();
            repository
                .save_member(crate::models::Member::new("Grace"))
                .unwrap();
        })
        .await
        .unwrap();
        running.await.unwrap().unwrap();

        let local: Vec<String> = store
            .members()
            .unwrap()
            .iter()
            .filter_map(|member| member.str_field("name").map(str::to_string))
            .collect();
        assert_eq!(local, vec!["Ada".to_string(), "Grace".to_string()]);
        assert_eq!(transport.pushed()[0].members.len(), 1);
    }
}
