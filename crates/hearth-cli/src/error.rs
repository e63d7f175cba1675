use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] hearth_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Name cannot be empty")]
    EmptyName,
    #[error("Invalid date `{0}` (expected YYYY-MM-DD)")]
    InvalidDate(String),
    #[error("Member not found: {0}")]
    MemberNotFound(String),
    #[error("Task not found: {0}")]
    TaskNotFound(String),
    #[error(
        "Sync is not configured. Run `hearth config set-url <URL>` or set HEARTH_SYNC_URL."
    )]
    SyncNotConfigured,
}
