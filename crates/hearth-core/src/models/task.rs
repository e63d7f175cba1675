//! Task model and recurrence expansion

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Record;

/// Date format used by the `date` field of a task
pub const TASK_DATE_FORMAT: &str = "%Y-%m-%d";

/// How a template task repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    /// Every day
    Daily,
    /// Same weekday as the anchor date
    Weekly,
    /// Same day of month as the anchor date
    Monthly,
    /// One-off task; also any unrecognized value
    #[default]
    #[serde(other)]
    None,
}

impl Recurrence {
    /// Whether this recurrence repeats at all
    #[must_use]
    pub const fn is_recurring(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Lowercase name as stored in task records
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

/// A chore assigned to one member on one date
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Record id; `None` for a task that has not been saved yet
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    /// Owning member id
    #[serde(default)]
    pub member_id: String,
    /// Task name
    #[serde(default)]
    pub name: String,
    /// Due date, `YYYY-MM-DD`
    #[serde(default)]
    pub date: String,
    /// Optional time of day, empty when unset
    #[serde(default)]
    pub time: String,
    /// Repeat rule
    #[serde(default)]
    pub recurrence: Recurrence,
}

impl Task {
    /// Create an unsaved one-off task
    #[must_use]
    pub fn new(member_id: impl Into<String>, name: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            member_id: member_id.into(),
            name: name.into(),
            date: date.format(TASK_DATE_FORMAT).to_string(),
            ..Self::default()
        }
    }

    /// Parsed due date, if the stored value is well formed
    pub fn due_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.trim(), TASK_DATE_FORMAT).ok()
    }

    /// Read the well-known task fields out of a record
    pub fn from_record(record: &Record) -> Option<Self> {
        let mut task: Self = serde_json::from_value(Value::Object(record.fields.clone())).ok()?;
        task.id = record.id().map(str::to_string);
        Some(task)
    }

    pub(crate) fn into_fields(self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(fields)) => fields,
            _ => Map::new(),
        }
    }
}

/// List every date in `[from, to]` on which a task with `recurrence`
/// anchored at `anchor` falls.
#[must_use]
pub fn recurring_dates(
    from: NaiveDate,
    to: NaiveDate,
    recurrence: Recurrence,
    anchor: NaiveDate,
) -> Vec<NaiveDate> {
    from.iter_days()
        .take_while(|date| *date <= to)
        .filter(|date| match recurrence {
            Recurrence::None => false,
            Recurrence::Daily => true,
            Recurrence::Weekly => date.weekday() == anchor.weekday(),
            Recurrence::Monthly => date.day() == anchor.day(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn day(text: &str) -> NaiveDate {
        NaiveDate::parse_from_str(text, TASK_DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_task_from_record_reads_camel_case() {
        let record: Record = serde_json::from_value(json!({
            "id": "t1",
            "memberId": "m1",
            "name": "Dishes",
            "date": "2024-03-01",
            "recurrence": "weekly"
        }))
        .unwrap();

        let task = Task::from_record(&record).unwrap();
        assert_eq!(task.id.as_deref(), Some("t1"));
        assert_eq!(task.member_id, "m1");
        assert_eq!(task.recurrence, Recurrence::Weekly);
        assert_eq!(task.time, "");
        assert_eq!(task.due_date(), Some(day("2024-03-01")));
    }

    #[test]
    fn test_unknown_recurrence_is_none() {
        let task: Task = serde_json::from_value(json!({"recurrence": "yearly"})).unwrap();
        assert_eq!(task.recurrence, Recurrence::None);
    }

    #[test]
    fn test_recurring_dates_daily_includes_both_ends() {
        let dates = recurring_dates(
            day("2024-03-01"),
            day("2024-03-03"),
            Recurrence::Daily,
            day("2024-01-01"),
        );
        assert_eq!(
            dates,
            vec![day("2024-03-01"), day("2024-03-02"), day("2024-03-03")]
        );
    }

    #[test]
    fn test_recurring_dates_weekly_matches_anchor_weekday() {
        // 2024-03-04 is a Monday
        let dates = recurring_dates(
            day("2024-03-01"),
            day("2024-03-31"),
            Recurrence::Weekly,
            day("2024-02-26"),
        );
        assert_eq!(
            dates,
            vec![
                day("2024-03-04"),
                day("2024-03-11"),
                day("2024-03-18"),
                day("2024-03-25")
            ]
        );
    }

    #[test]
    fn test_recurring_dates_monthly_skips_short_months() {
        let dates = recurring_dates(
            day("2024-01-01"),
            day("2024-04-30"),
            Recurrence::Monthly,
            day("2023-12-31"),
        );
        assert_eq!(dates, vec![day("2024-01-31"), day("2024-03-31")]);
    }

    #[test]
    fn test_recurring_dates_none_and_inverted_range() {
        let anchor = day("2024-03-01");
        assert!(recurring_dates(anchor, day("2024-03-10"), Recurrence::None, anchor).is_empty());
        assert!(recurring_dates(day("2024-03-10"), anchor, Recurrence::Daily, anchor).is_empty());
    }
}
