use std::path::Path;

use hearth_core::util::normalize_text_option;
use hearth_core::{Recurrence, Task};

use crate::commands::common::{
    finish_mutation, format_task_lines, join_words, open_service, parse_date, task_to_list_item,
    today, TaskListItem,
};
use crate::error::CliError;

/// Arguments of `task add`
pub struct TaskDraft {
    pub name: Vec<String>,
    pub member_id: String,
    pub date: Option<String>,
    pub time: Option<String>,
    pub recurrence: Recurrence,
}

pub async fn run_task_add(draft: TaskDraft, store_path: &Path) -> Result<(), CliError> {
    let name = join_words(&draft.name)?;
    let date = match draft.date.as_deref() {
        Some(raw) => parse_date(raw)?,
        None => today(),
    };

    let service = open_service(store_path)?;
    if service.get_member(&draft.member_id)?.is_none() {
        return Err(CliError::MemberNotFound(draft.member_id));
    }

    let mut task = Task::new(draft.member_id, name, date);
    task.time = normalize_text_option(draft.time).unwrap_or_default();
    task.recurrence = draft.recurrence;
    let record = service.save_task(task)?;
    println!("{}", record.id().unwrap_or_default());

    finish_mutation(&service).await;
    Ok(())
}

pub fn run_task_list(
    member_id: Option<&str>,
    as_json: bool,
    store_path: &Path,
) -> Result<(), CliError> {
    let service = open_service(store_path)?;
    let tasks = service.tasks(member_id)?;
    let members = service.members()?;

    if as_json {
        let json_items = tasks
            .iter()
            .map(|task| task_to_list_item(task, &members))
            .collect::<Vec<TaskListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if tasks.is_empty() {
        println!("No tasks.");
    } else {
        for line in format_task_lines(&tasks, &members) {
            println!("{line}");
        }
    }

    Ok(())
}

pub async fn run_task_delete(id: &str, store_path: &Path) -> Result<(), CliError> {
    let service = open_service(store_path)?;
    if !service.delete_task(id)? {
        return Err(CliError::TaskNotFound(id.to_string()));
    }
    println!("{id}");

    finish_mutation(&service).await;
    Ok(())
}

pub async fn run_task_quick_add(
    template_id: &str,
    member_ids: &[String],
    from: &str,
    to: &str,
    store_path: &Path,
) -> Result<(), CliError> {
    let from = parse_date(from)?;
    let to = parse_date(to)?;

    let service = open_service(store_path)?;
    let created = service.quick_add(template_id, member_ids, from, to)?;
    if created.is_empty() {
        println!("No matching dates between {from} and {to}.");
        return Ok(());
    }

    for record in &created {
        println!("{}", record.id().unwrap_or_default());
    }

    finish_mutation(&service).await;
    Ok(())
}
