use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use hearth_core::export::{parse_import, render_export, suggested_backup_file_name};

use crate::commands::common::{finish_mutation, open_service, today};
use crate::error::CliError;

/// Output path that means "write to stdout"
pub const STDOUT_PATH: &str = "-";

/// Where an export goes: `None` for stdout, otherwise the file to write.
///
/// Without an explicit path the backup lands in the current directory under
/// its dated default name.
pub fn resolve_export_path(output_path: Option<&Path>, date: NaiveDate) -> Option<PathBuf> {
    match output_path {
        Some(path) if path == Path::new(STDOUT_PATH) => None,
        Some(path) => Some(path.to_path_buf()),
        None => Some(PathBuf::from(suggested_backup_file_name(date))),
    }
}

pub fn run_export(output_path: Option<&Path>, store_path: &Path) -> Result<(), CliError> {
    let service = open_service(store_path)?;
    let rendered = render_export(&service.export_document()?)?;

    if let Some(path) = resolve_export_path(output_path, today()) {
        std::fs::write(&path, rendered)?;
        println!("{}", path.display());
    } else {
        println!("{rendered}");
    }

    Ok(())
}

pub async fn run_import(input_path: &Path, store_path: &Path) -> Result<(), CliError> {
    let raw = std::fs::read_to_string(input_path)?;
    let document = parse_import(&raw)?;
    let members = document.members.as_ref().map(Vec::len);
    let tasks = document.tasks.as_ref().map(Vec::len);

    let service = open_service(store_path)?;
    service.import_document(document)?;
    println!(
        "Imported {} members, {} tasks",
        members.map_or_else(|| "no".to_string(), |count| count.to_string()),
        tasks.map_or_else(|| "no".to_string(), |count| count.to_string())
    );

    finish_mutation(&service).await;
    Ok(())
}
