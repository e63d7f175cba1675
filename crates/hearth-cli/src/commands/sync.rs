use std::path::Path;

use hearth_core::SyncTrigger;

use crate::commands::common::open_service;
use crate::error::CliError;

pub async fn run_sync(test_only: bool, store_path: &Path) -> Result<(), CliError> {
    let service = open_service(store_path)?;
    if !service.is_configured() {
        return Err(CliError::SyncNotConfigured);
    }

    if test_only {
        service.test_connection().await?;
        println!("Connection successful");
        return Ok(());
    }

    let report = service.sync(SyncTrigger::Manual).await?;
    println!(
        "Sync completed: {} members, {} tasks",
        report.members, report.tasks
    );
    Ok(())
}
