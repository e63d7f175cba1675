use std::path::Path;

use serde::Serialize;

use crate::commands::common::open_service;
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct SyncConfigItem {
    pub endpoint: Option<String>,
    pub debounce_ms: u128,
    pub request_timeout_secs: u64,
}

pub fn run_set_url(url: &str, store_path: &Path) -> Result<(), CliError> {
    let service = open_service(store_path)?;
    match service.configure(url)? {
        Some(endpoint) => println!("Sync endpoint set to {endpoint}"),
        None => println!("Sync endpoint cleared"),
    }
    Ok(())
}

pub fn run_clear_url(store_path: &Path) -> Result<(), CliError> {
    let service = open_service(store_path)?;
    service.configure("")?;
    println!("Sync endpoint cleared");
    Ok(())
}

pub fn run_show(as_json: bool, store_path: &Path) -> Result<(), CliError> {
    let service = open_service(store_path)?;
    let options = service.orchestrator().options();
    let item = SyncConfigItem {
        endpoint: service.orchestrator().endpoint(),
        debounce_ms: options.debounce.as_millis(),
        request_timeout_secs: options.request_timeout.as_secs(),
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&item)?);
        return Ok(());
    }

    println!("Store:           {}", store_path.display());
    println!(
        "Endpoint:        {}",
        item.endpoint.as_deref().unwrap_or("(not set)")
    );
    println!("Debounce:        {} ms", item.debounce_ms);
    println!("Request timeout: {} s", item.request_timeout_secs);
    Ok(())
}
