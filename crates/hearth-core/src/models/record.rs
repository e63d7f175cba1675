//! Record model shared by the member and task collections

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A uniquely identified, timestamped unit of entity data.
///
/// Only `id` and `lastModified` are interpreted; every other field is carried
/// through unchanged so records written by newer clients survive a round trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Opaque identifier, unique within a collection
    #[serde(
        default,
        deserialize_with = "deserialize_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    /// Last local modification (Unix ms)
    #[serde(
        rename = "lastModified",
        default,
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_modified: Option<i64>,
    /// Entity payload
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Create an empty record with the given id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Builder-style field setter
    #[must_use]
    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Builder-style timestamp setter
    #[must_use]
    pub const fn with_last_modified(mut self, last_modified: i64) -> Self {
        self.last_modified = Some(last_modified);
        self
    }

    /// The record id, treating an empty string as missing
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// Get a string field from the payload
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Timestamp used for conflict resolution.
    ///
    /// Falls back to the id when it looks like an epoch-millisecond value and
    /// to `0` when neither is usable.
    pub fn effective_timestamp(&self) -> i64 {
        self.last_modified
            .filter(|ts| *ts > 0)
            .or_else(|| self.id().and_then(parse_positive_millis))
            .unwrap_or(0)
    }
}

/// Parse text as a finite, positive millisecond value.
pub(crate) fn parse_positive_millis(text: &str) -> Option<i64> {
    let value = text.trim().parse::<f64>().ok()?;
    millis_from_f64(value)
}

#[allow(clippy::cast_possible_truncation)]
fn millis_from_f64(value: f64) -> Option<i64> {
    if value.is_finite() && value >= 1.0 && value < 9.2e18 {
        Some(value.trunc() as i64)
    } else {
        None
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(id)) if !id.is_empty() => Some(id),
        Some(Value::Number(number)) => Some(number_to_id(&number)),
        _ => None,
    })
}

fn number_to_id(number: &serde_json::Number) -> String {
    if let Some(value) = number.as_i64() {
        return value.to_string();
    }
    if let Some(value) = number.as_u64() {
        return value.to_string();
    }
    number.to_string()
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number
            .as_i64()
            .filter(|ts| *ts > 0)
            .or_else(|| number.as_f64().and_then(millis_from_f64)),
        Some(Value::String(text)) => parse_positive_millis(&text),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_record_keeps_unknown_fields() {
        let raw = json!({"id": "1", "lastModified": 5, "name": "Ada", "color": "#2563EB"});
        let record: Record = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(record.id(), Some("1"));
        assert_eq!(record.last_modified, Some(5));
        assert_eq!(record.str_field("name"), Some("Ada"));
        assert_eq!(serde_json::to_value(&record).unwrap(), raw);
    }

    #[test]
    fn test_record_accepts_numeric_id_and_string_timestamp() {
        let record: Record =
            serde_json::from_value(json!({"id": 1_700_000_000_000_i64, "lastModified": "42"}))
                .unwrap();
        assert_eq!(record.id(), Some("1700000000000"));
        assert_eq!(record.last_modified, Some(42));
    }

    #[test]
    fn test_record_treats_blank_values_as_missing() {
        let record: Record =
            serde_json::from_value(json!({"id": "", "lastModified": 0, "name": "x"})).unwrap();
        assert_eq!(record.id(), None);
        assert_eq!(record.last_modified, None);

        let record: Record =
            serde_json::from_value(json!({"id": null, "lastModified": "soon"})).unwrap();
        assert_eq!(record.id, None);
        assert_eq!(record.last_modified, None);
    }

    #[test]
    fn test_effective_timestamp_fallbacks() {
        assert_eq!(
            Record::new("abc").with_last_modified(7).effective_timestamp(),
            7
        );
        assert_eq!(
            Record::new("1700000000000").effective_timestamp(),
            1_700_000_000_000
        );
        assert_eq!(Record::new("abc").effective_timestamp(), 0);
        assert_eq!(Record::new("-5").effective_timestamp(), 0);
    }
}
