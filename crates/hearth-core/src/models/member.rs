//! Member model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Record;

/// Colors assigned to new members in creation order.
pub const MEMBER_PALETTE: [&str; 8] = [
    "#2563EB", "#10B981", "#F59E0B", "#EF4444", "#8B5CF6", "#EC4899", "#06B6D4", "#84CC16",
];

/// Palette color for the member at `index`, wrapping around.
#[must_use]
pub const fn palette_color(index: usize) -> &'static str {
    MEMBER_PALETTE[index % MEMBER_PALETTE.len()]
}

/// A household member
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Record id; `None` for a member that has not been saved yet
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Chart color (hex)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Encoded photo (usually a data URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

impl Member {
    /// Create an unsaved member with the given name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Read the well-known member fields out of a record
    pub fn from_record(record: &Record) -> Option<Self> {
        let mut member: Self =
            serde_json::from_value(Value::Object(record.fields.clone())).ok()?;
        member.id = record.id().map(str::to_string);
        Some(member)
    }

    pub(crate) fn into_fields(self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(fields)) => fields,
            _ => Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_palette_wraps() {
        assert_eq!(palette_color(0), "#2563EB");
        assert_eq!(palette_color(9), "#10B981");
    }

    #[test]
    fn test_member_from_record() {
        let record = Record::new("42")
            .with_field("name", "Ada")
            .with_field("color", "#EF4444")
            .with_field("nickname", "A");

        let member = Member::from_record(&record).unwrap();
        assert_eq!(member.id.as_deref(), Some("42"));
        assert_eq!(member.name, "Ada");
        assert_eq!(member.color.as_deref(), Some("#EF4444"));
        assert_eq!(member.photo, None);
    }

    #[test]
    fn test_member_fields_skip_id_and_empty_options() {
        let mut member = Member::new("Grace");
        member.id = Some("7".to_string());

        let fields = member.into_fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get("name"), Some(&Value::from("Grace")));
    }
}
