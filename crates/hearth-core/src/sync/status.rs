//! Observable sync status for UI collaborators

use chrono::{Local, TimeZone};
use serde::Serialize;
use tokio::sync::watch;

/// Lifecycle state of the sync orchestrator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Unconfigured,
    Idle,
    Syncing,
    Success,
    Error,
}

impl SyncState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::Idle => "idle",
            Self::Syncing => "syncing",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::Unconfigured => "Add a sync endpoint URL to enable sync",
            Self::Idle => "Ready to sync",
            Self::Syncing => "Syncing…",
            Self::Success => "Synced successfully",
            Self::Error => "Sync failed",
        }
    }
}

/// What started a sync. Only affects status messaging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncTrigger {
    #[default]
    Manual,
    Background,
}

impl SyncTrigger {
    pub(crate) const fn syncing_message(self) -> &'static str {
        match self {
            Self::Manual => "Syncing…",
            Self::Background => "Syncing in background…",
        }
    }
}

/// Snapshot of the status shown to users
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub state: SyncState,
    pub message: String,
    /// Completion time of the last successful sync (Unix ms)
    pub last_synced_at: Option<i64>,
}

impl SyncStatus {
    /// Human-readable "last synced" value
    pub fn last_synced_label(&self) -> String {
        format_last_synced(self.last_synced_at)
    }
}

/// Render a last-synced timestamp in local time, or `Never`.
pub fn format_last_synced(timestamp_ms: Option<i64>) -> String {
    timestamp_ms
        .filter(|ts| *ts > 0)
        .and_then(|ts| Local.timestamp_millis_opt(ts).single())
        .map_or_else(
            || "Never".to_string(),
            |time| time.format("%Y-%m-%d %H:%M:%S").to_string(),
        )
}

/// Mirrors orchestrator transitions onto a watch channel.
///
/// Holds no authority over the state machine; the orchestrator is the only
/// writer.
#[derive(Debug)]
pub struct StatusPublisher {
    tx: watch::Sender<SyncStatus>,
}

impl StatusPublisher {
    pub fn new(state: SyncState, last_synced_at: Option<i64>) -> Self {
        let (tx, _rx) = watch::channel(SyncStatus {
            state,
            message: state.default_message().to_string(),
            last_synced_at,
        });
        Self { tx }
    }

    /// Publish a transition; `None` uses the state's default message
    pub fn publish(&self, state: SyncState, message: Option<String>) {
        let message = message.unwrap_or_else(|| state.default_message().to_string());
        tracing::debug!("Sync status -> {}: {}", state.as_str(), message);
        self.tx.send_modify(|status| {
            status.state = state;
            status.message = message;
        });
    }

    /// Record a successful sync; the timestamp never moves backwards
    pub fn publish_success(&self, completed_at: i64) -> i64 {
        let mut recorded = completed_at;
        self.tx.send_modify(|status| {
            recorded = status.last_synced_at.map_or(completed_at, |prev| prev.max(completed_at));
            status.state = SyncState::Success;
            status.message = SyncState::Success.default_message().to_string();
            status.last_synced_at = Some(recorded);
        });
        tracing::debug!("Sync status -> success at {}", recorded);
        recorded
    }

    pub fn current(&self) -> SyncStatus {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_publish_uses_default_message() {
        let publisher = StatusPublisher::new(SyncState::Unconfigured, None);
        assert_eq!(
            publisher.current().message,
            "Add a sync endpoint URL to enable sync"
        );

        publisher.publish(SyncState::Error, Some("Sync failed: boom".to_string()));
        publisher.publish(SyncState::Idle, None);
        assert_eq!(publisher.current().state, SyncState::Idle);
        assert_eq!(publisher.current().message, "Ready to sync");
    }

    #[test]
    fn test_last_synced_never_moves_backwards() {
        let publisher = StatusPublisher::new(SyncState::Idle, Some(500));
        assert_eq!(publisher.publish_success(400), 500);
        assert_eq!(publisher.publish_success(900), 900);
        assert_eq!(publisher.current().last_synced_at, Some(900));
        assert_eq!(publisher.current().state, SyncState::Success);
    }

    #[test]
    fn test_subscribers_see_transitions() {
        let publisher = StatusPublisher::new(SyncState::Idle, None);
        let mut rx = publisher.subscribe();

        publisher.publish(SyncState::Syncing, None);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().state, SyncState::Syncing);
    }

    #[test]
    fn test_format_last_synced() {
        assert_eq!(format_last_synced(None), "Never");
        assert_eq!(format_last_synced(Some(0)), "Never");
        assert_ne!(format_last_synced(Some(1_700_000_000_000)), "Never");
    }
}
