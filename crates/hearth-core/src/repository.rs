//! Save/delete path for members and tasks
//!
//! Every mutation holds the collection write lock from its read to its write,
//! replaces the affected collection in the local store and then tells the injected [`ChangeNotifier`], which is how the sync
//! orchestrator learns that a background sync is due.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::export::ExportDocument;
use crate::models::{palette_color, recurring_dates, Member, Record, Recurrence, Task};
use crate::store::CollectionStore;
use crate::util::unix_millis_now;

/// Receives a signal after every successful local write
pub trait ChangeNotifier: Send + Sync {
    fn notify_change(&self);
}

/// Member and task storage operations
#[derive(Clone)]
pub struct HouseholdRepository {
    store: CollectionStore,
    notifier: Option<Arc<dyn ChangeNotifier>>,
}

impl std::fmt::Debug for HouseholdRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HouseholdRepository")
            .field("store", &self.store)
            .field("notifier", &self.notifier.is_some())
            .finish()
    }
}

impl HouseholdRepository {
    /// Create a repository without a post-write notifier
    pub const fn new(store: CollectionStore) -> Self {
        Self {
            store,
            notifier: None,
        }
    }

    /// Attach the notifier called after every local write
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn ChangeNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub const fn store(&self) -> &CollectionStore {
        &self.store
    }

    /// Raw member records, in stored order
    pub fn members(&self) -> Result<Vec<Record>> {
        self.store.members()
    }

    /// Raw task records, in stored order
    pub fn tasks(&self) -> Result<Vec<Record>> {
        self.store.tasks()
    }

    /// Members whose well-known fields are readable
    pub fn list_members(&self) -> Result<Vec<Member>> {
        Ok(self.members()?.iter().filter_map(Member::from_record).collect())
    }

    /// Tasks whose well-known fields are readable, optionally for one member
    pub fn list_tasks(&self, member_id: Option<&str>) -> Result<Vec<Task>> {
        Ok(self
            .tasks()?
            .iter()
            .filter_map(Task::from_record)
            .filter(|task| member_id.is_none_or(|id| task.member_id == id))
            .collect())
    }

    pub fn get_member(&self, id: &str) -> Result<Option<Member>> {
        Ok(find_by_id(&self.members()?, id).and_then(Member::from_record))
    }

    pub fn get_task(&self, id: &str) -> Result<Option<Task>> {
        Ok(find_by_id(&self.tasks()?, id).and_then(Task::from_record))
    }

    /// Create a member (no id) or update an existing one (id set).
    ///
    /// Updates overlay the provided fields onto the stored record; a member
    /// without a color keeps its stored color or receives a palette color.
    pub fn save_member(&self, member: Member) -> Result<Record> {
        require_name(&member.name)?;

        let guard = self.store.write_lock();
        let mut members = self.store.members()?;
        let now = unix_millis_now();
        let requested_color = member.color.clone().filter(|color| !color.trim().is_empty());

        let saved = match member.id.clone().filter(|id| !id.is_empty()) {
            Some(id) => {
                let index = position_of(&members, &id)
                    .ok_or_else(|| Error::NotFound(format!("member {id}")))?;
                let existing = &mut members[index];
                let color = requested_color
                    .or_else(|| {
                        existing
                            .str_field("color")
                            .filter(|color| !color.trim().is_empty())
                            .map(str::to_string)
                    })
                    .unwrap_or_else(|| palette_color(index).to_string());

                existing.fields.extend(member.into_fields());
                existing.fields.insert("color".to_string(), color.into());
                existing.last_modified = Some(next_timestamp(now, existing.last_modified));
                existing.clone()
            }
            None => {
                let color =
                    requested_color.unwrap_or_else(|| palette_color(members.len()).to_string());
                let mut record = Record {
                    id: Some(next_record_id(now, &members)),
                    last_modified: Some(now),
                    fields: member.into_fields(),
                };
                record.fields.insert("color".to_string(), color.into());
                members.push(record.clone());
                record
            }
        };

        self.store.set_members(&members)?;
        tracing::debug!("Saved member {}", saved.id().unwrap_or_default());
        drop(guard);
        self.notify();
        Ok(saved)
    }

    /// Delete a member together with all of that member's tasks.
    ///
    /// Returns `false` when no member had this id.
    pub fn delete_member(&self, id: &str) -> Result<bool> {
        let guard = self.store.write_lock();
        let mut members = self.store.members()?;
        let before = members.len();
        members.retain(|member| member.id() != Some(id));
        if members.len() == before {
            return Ok(false);
        }

        let mut tasks = self.store.tasks()?;
        tasks.retain(|task| task.str_field("memberId") != Some(id));

        self.store.set_members(&members)?;
        self.store.set_tasks(&tasks)?;
        tracing::debug!("Deleted member {} and their tasks", id);
        drop(guard);
        self.notify();
        Ok(true)
    }

    /// Create a task (no id) or update an existing one (id set).
    pub fn save_task(&self, task: Task) -> Result<Record> {
        require_name(&task.name)?;

        let guard = self.store.write_lock();
        let mut tasks = self.store.tasks()?;
        let now = unix_millis_now();

        let saved = match task.id.clone().filter(|id| !id.is_empty()) {
            Some(id) => {
                let index = position_of(&tasks, &id)
                    .ok_or_else(|| Error::NotFound(format!("task {id}")))?;
                let existing = &mut tasks[index];
                existing.fields.extend(task.into_fields());
                existing.last_modified = Some(next_timestamp(now, existing.last_modified));
                existing.clone()
            }
            None => {
                let record = Record {
                    id: Some(next_record_id(now, &tasks)),
                    last_modified: Some(now),
                    fields: task.into_fields(),
                };
                tasks.push(record.clone());
                record
            }
        };

        self.store.set_tasks(&tasks)?;
        tracing::debug!("Saved task {}", saved.id().unwrap_or_default());
        drop(guard);
        self.notify();
        Ok(saved)
    }

    /// Returns `false` when no task had this id.
    pub fn delete_task(&self, id: &str) -> Result<bool> {
        let guard = self.store.write_lock();
        let mut tasks = self.store.tasks()?;
        let before = tasks.len();
        tasks.retain(|task| task.id() != Some(id));
        if tasks.len() == before {
            return Ok(false);
        }

        self.store.set_tasks(&tasks)?;
        tracing::debug!("Deleted task {}", id);
        drop(guard);
        self.notify();
        Ok(true)
    }

    /// Materialize a recurring template task as one-off tasks.
    ///
    /// One task is created per matching date in `[from, to]` and per member,
    /// all in a single collection write.
    pub fn quick_add(
        &self,
        template_id: &str,
        member_ids: &[String],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Record>> {
        if member_ids.is_empty() {
            return Err(Error::InvalidInput(
                "select at least one member".to_string(),
            ));
        }
        if to < from {
            return Err(Error::InvalidInput(format!(
                "invalid date range {from} .. {to}"
            )));
        }

        let guard = self.store.write_lock();
        let mut tasks = self.store.tasks()?;
        let template = find_by_id(&tasks, template_id)
            .and_then(Task::from_record)
            .ok_or_else(|| Error::NotFound(format!("task {template_id}")))?;
        let anchor = template.due_date().ok_or_else(|| {
            Error::InvalidInput(format!("task {template_id} has no valid date"))
        })?;

        let now = unix_millis_now();
        let mut created = Vec::new();
        for date in recurring_dates(from, to, template.recurrence, anchor) {
            for member_id in member_ids {
                let instance = Task {
                    id: None,
                    member_id: member_id.clone(),
                    name: template.name.clone(),
                    date: date.format(crate::models::TASK_DATE_FORMAT).to_string(),
                    time: template.time.clone(),
                    recurrence: Recurrence::None,
                };
                let record = Record {
                    id: Some(next_record_id(now, &tasks)),
                    last_modified: Some(now),
                    fields: instance.into_fields(),
                };
                tasks.push(record.clone());
                created.push(record);
            }
        }

        if created.is_empty() {
            return Ok(created);
        }

        self.store.set_tasks(&tasks)?;
        tracing::info!("Quick-added {} tasks from {}", created.len(), template_id);
        drop(guard);
        self.notify();
        Ok(created)
    }

    pub fn is_setup_complete(&self) -> Result<bool> {
        self.store.is_setup_complete()
    }

    pub fn complete_setup(&self) -> Result<()> {
        self.store.complete_setup()
    }

    /// Snapshot both collections for backup
    pub fn export_document(&self) -> Result<ExportDocument> {
        Ok(ExportDocument::new(self.members()?, self.tasks()?))
    }

    /// Overwrite each collection present in `document` (no merge).
    pub fn import_document(&self, document: ExportDocument) -> Result<()> {
        let guard = self.store.write_lock();
        let mut changed = false;
        if let Some(members) = document.members {
            self.store.set_members(&members)?;
            changed = true;
        }
        if let Some(tasks) = document.tasks {
            self.store.set_tasks(&tasks)?;
            changed = true;
        }

        drop(guard);

        if changed {
            tracing::info!("Imported backup document");
            self.notify();
        }
        Ok(())
    }

    fn notify(&self) {
        if let Some(notifier) = &self.notifier {
            notifier.notify_change();
        }
    }
}

fn require_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        Err(Error::InvalidInput("name must not be empty".to_string()))
    } else {
        Ok(())
    }
}

fn position_of(records: &[Record], id: &str) -> Option<usize> {
    records.iter().position(|record| record.id() == Some(id))
}

fn find_by_id<'a>(records: &'a [Record], id: &str) -> Option<&'a Record> {
    records.iter().find(|record| record.id() == Some(id))
}

/// `lastModified` never decreases for a given id.
fn next_timestamp(now: i64, previous: Option<i64>) -> i64 {
    previous.map_or(now, |previous| previous.max(now))
}

/// Ids are creation times in ms; a burst within one millisecond falls back
/// to the next integer above the largest numeric id.
fn next_record_id(now: i64, records: &[Record]) -> String {
    let candidate = now.to_string();
    if position_of(records, &candidate).is_none() {
        return candidate;
    }

    let highest = records
        .iter()
        .filter_map(|record| record.id()?.parse::<i64>().ok())
        .max()
        .unwrap_or(now);
    (highest.max(now) + 1).to_string()
}
