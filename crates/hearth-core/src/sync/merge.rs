//! Last-modified-wins reconciliation of record collections

use std::collections::HashMap;

use crate::models::Record;
use crate::util::unix_millis_now;

/// Fill in a missing `lastModified` so the record can take part in a merge.
///
/// A numeric-looking id is taken as the creation time; otherwise `now` is used.
#[must_use]
pub fn ensure_timestamp(mut record: Record, now: i64) -> Record {
    if record.last_modified.is_none() {
        let derived = record.effective_timestamp();
        record.last_modified = Some(if derived > 0 { derived } else { now });
    }
    record
}

/// Normalize every record of a collection with the current wall-clock time.
#[must_use]
pub fn normalize_collection(records: Vec<Record>) -> Vec<Record> {
    let now = unix_millis_now();
    records
        .into_iter()
        .map(|record| ensure_timestamp(record, now))
        .collect()
}

/// Merge a local and a remote collection into one agreed collection.
///
/// Remote records are processed first and local records second, so on an
/// exact timestamp tie the local record wins. Records without an id are
/// dropped. The result keeps the position at which each id first appeared.
#[must_use]
pub fn merge_by_id(local: &[Record], remote: &[Record]) -> Vec<Record> {
    merge_by_id_at(local, remote, unix_millis_now())
}

/// [`merge_by_id`] with an explicit clock for timestamp synthesis.
#[must_use]
pub fn merge_by_id_at(local: &[Record], remote: &[Record], now: i64) -> Vec<Record> {
    let mut merged: Vec<Record> = Vec::with_capacity(local.len().max(remote.len()));
    let mut positions: HashMap<String, usize> = HashMap::new();

    for record in remote.iter().chain(local) {
        let Some(id) = record.id() else {
            continue;
        };
        let incoming = ensure_timestamp(record.clone(), now);

        match positions.get(id) {
            None => {
                positions.insert(id.to_string(), merged.len());
                merged.push(incoming);
            }
            Some(&index) => {
                if incoming.effective_timestamp() >= merged[index].effective_timestamp() {
                    merged[index] = incoming;
                }
            }
        }
    }

    merged
}
