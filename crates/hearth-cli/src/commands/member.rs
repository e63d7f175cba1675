use std::path::Path;

use hearth_core::util::normalize_text_option;
use hearth_core::Member;

use crate::commands::common::{
    finish_mutation, format_member_lines, join_words, member_to_list_item, open_service,
    MemberListItem,
};
use crate::error::CliError;

pub async fn run_member_add(
    name_parts: &[String],
    color: Option<String>,
    store_path: &Path,
) -> Result<(), CliError> {
    let name = join_words(name_parts)?;
    let service = open_service(store_path)?;

    let mut member = Member::new(name);
    member.color = normalize_text_option(color);
    let record = service.save_member(member)?;
    println!("{}", record.id().unwrap_or_default());

    finish_mutation(&service).await;
    Ok(())
}

pub fn run_member_list(as_json: bool, store_path: &Path) -> Result<(), CliError> {
    let service = open_service(store_path)?;
    let members = service.members()?;

    if as_json {
        let json_items = members
            .iter()
            .map(member_to_list_item)
            .collect::<Vec<MemberListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if members.is_empty() {
        println!("No members yet. Add one with `hearth member add <NAME>`.");
    } else {
        for line in format_member_lines(&members) {
            println!("{line}");
        }
    }

    Ok(())
}

pub async fn run_member_rename(
    id: &str,
    name_parts: &[String],
    store_path: &Path,
) -> Result<(), CliError> {
    let name = join_words(name_parts)?;
    let service = open_service(store_path)?;

    let mut member = service
        .get_member(id)?
        .ok_or_else(|| CliError::MemberNotFound(id.to_string()))?;
    member.name = name;
    service.save_member(member)?;
    println!("{id}");

    finish_mutation(&service).await;
    Ok(())
}

pub async fn run_member_delete(id: &str, store_path: &Path) -> Result<(), CliError> {
    let service = open_service(store_path)?;
    if !service.delete_member(id)? {
        return Err(CliError::MemberNotFound(id.to_string()));
    }
    println!("{id}");

    finish_mutation(&service).await;
    Ok(())
}
