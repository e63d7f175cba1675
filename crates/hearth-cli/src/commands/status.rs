use std::path::Path;

use serde::Serialize;

use crate::commands::common::open_service;
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct StatusItem {
    pub state: String,
    pub message: String,
    pub endpoint: Option<String>,
    pub last_synced_at: Option<i64>,
    pub last_synced: String,
}

pub fn run_status(as_json: bool, store_path: &Path) -> Result<(), CliError> {
    let service = open_service(store_path)?;
    let status = service.status();
    let item = StatusItem {
        state: status.state.as_str().to_string(),
        message: status.message.clone(),
        endpoint: service.orchestrator().endpoint(),
        last_synced_at: status.last_synced_at,
        last_synced: status.last_synced_label(),
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&item)?);
        return Ok(());
    }

    println!("Status:      {} ({})", item.state, item.message);
    println!(
        "Endpoint:    {}",
        item.endpoint.as_deref().unwrap_or("(not set)")
    );
    println!("Last synced: {}", item.last_synced);
    Ok(())
}
