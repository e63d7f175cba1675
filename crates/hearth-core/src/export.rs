//! Backup export/import of both collections as one JSON document.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::Record;

/// Backup document. On import, a missing collection leaves the stored one
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<Record>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<Record>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_date: Option<String>,
}

impl ExportDocument {
    /// Document stamped with the current time
    #[must_use]
    pub fn new(members: Vec<Record>, tasks: Vec<Record>) -> Self {
        Self {
            members: Some(members),
            tasks: Some(tasks),
            export_date: Some(Utc::now().to_rfc3339()),
        }
    }
}

/// Render a backup document as pretty-printed JSON.
pub fn render_export(document: &ExportDocument) -> serde_json::Result<String> {
    serde_json::to_string_pretty(document)
}

/// Parse a backup document, rejecting anything that is not a JSON object.
pub fn parse_import(raw: &str) -> Result<ExportDocument> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|error| Error::InvalidInput(format!("invalid backup file: {error}")))?;
    if !value.is_object() {
        return Err(Error::InvalidInput(
            "invalid backup file: expected a JSON object".to_string(),
        ));
    }
    Ok(serde_json::from_value(value)?)
}

/// Build a deterministic default file name for backups.
#[must_use]
pub fn suggested_backup_file_name(date: NaiveDate) -> String {
    format!("hearth-backup-{}.json", date.format("%Y-%m-%d"))
}
