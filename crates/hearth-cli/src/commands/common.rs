use std::env;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use hearth_core::config::SYNC_URL_ENV;
use hearth_core::models::TASK_DATE_FORMAT;
use hearth_core::util::normalize_text_option;
use hearth_core::{HouseholdService, HttpTransport, Member, SyncOptions, SyncState, Task};
use serde::Serialize;

use crate::error::CliError;

pub type Service = HouseholdService<HttpTransport>;

#[derive(Debug, Serialize)]
pub struct MemberListItem {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
    pub has_photo: bool,
}

#[derive(Debug, Serialize)]
pub struct TaskListItem {
    pub id: String,
    pub member_id: String,
    pub member_name: Option<String>,
    pub name: String,
    pub date: String,
    pub time: String,
    pub recurrence: String,
}

pub fn resolve_store_path(cli_store_path: Option<PathBuf>) -> PathBuf {
    cli_store_path
        .or_else(|| env::var_os("HEARTH_STORE_PATH").map(PathBuf::from))
        .unwrap_or_else(default_store_path)
}

pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hearth")
        .join("hearth.db")
}

pub fn open_service(store_path: &Path) -> Result<Service, CliError> {
    open_service_with(store_path, env::var(SYNC_URL_ENV).ok())
}

/// Open the store; `env_endpoint` seeds the endpoint when none was ever
/// persisted. An endpoint cleared with `config clear-url` stays cleared.
pub fn open_service_with(
    store_path: &Path,
    env_endpoint: Option<String>,
) -> Result<Service, CliError> {
    let service = HouseholdService::open_path(store_path, SyncOptions::from_env()?)?;

    if !service.is_configured() && !service.repository().store().endpoint_cleared()? {
        if let Some(endpoint) = normalize_text_option(env_endpoint) {
            service.configure(&endpoint)?;
            tracing::info!("Sync endpoint seeded from {}", SYNC_URL_ENV);
        }
    }

    Ok(service)
}

/// Let the debounced sync of a mutation run before the process exits.
pub async fn finish_mutation(service: &Service) {
    if !service.is_configured() {
        return;
    }

    service.flush().await;
    let status = service.status();
    if status.state == SyncState::Error {
        eprintln!("Warning: saved locally, but {}", status.message);
    }
}

pub fn join_words(parts: &[String]) -> Result<String, CliError> {
    normalize_text_option(Some(parts.join(" "))).ok_or(CliError::EmptyName)
}

pub fn parse_date(value: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(value.trim(), TASK_DATE_FORMAT)
        .map_err(|_| CliError::InvalidDate(value.to_string()))
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn member_to_list_item(member: &Member) -> MemberListItem {
    MemberListItem {
        id: member.id.clone().unwrap_or_default(),
        name: member.name.clone(),
        color: member.color.clone(),
        has_photo: member
            .photo
            .as_deref()
            .is_some_and(|photo| !photo.is_empty()),
    }
}

pub fn task_to_list_item(task: &Task, members: &[Member]) -> TaskListItem {
    TaskListItem {
        id: task.id.clone().unwrap_or_default(),
        member_id: task.member_id.clone(),
        member_name: member_name(members, &task.member_id).map(str::to_string),
        name: task.name.clone(),
        date: task.date.clone(),
        time: task.time.clone(),
        recurrence: task.recurrence.as_str().to_string(),
    }
}

pub fn format_member_lines(members: &[Member]) -> Vec<String> {
    members
        .iter()
        .map(|member| {
            let id = member.id.as_deref().unwrap_or_default();
            match member.color.as_deref() {
                Some(color) => format!("{id}  {}  {color}", member.name),
                None => format!("{id}  {}", member.name),
            }
        })
        .collect()
}

pub fn format_task_lines(tasks: &[Task], members: &[Member]) -> Vec<String> {
    tasks
        .iter()
        .map(|task| {
            let id = task.id.as_deref().unwrap_or_default();
            let when = if task.time.is_empty() {
                task.date.clone()
            } else {
                format!("{} {}", task.date, task.time)
            };
            let owner = member_name(members, &task.member_id).unwrap_or("unassigned");
            let mut line = format!("{id}  {when}  {}  ({owner})", task.name);
            if task.recurrence.is_recurring() {
                line.push_str(&format!("  [{}]", task.recurrence.as_str()));
            }
            line
        })
        .collect()
}

fn member_name<'a>(members: &'a [Member], member_id: &str) -> Option<&'a str> {
    members
        .iter()
        .find(|member| member.id.as_deref() == Some(member_id))
        .map(|member| member.name.as_str())
}
