//! A deterministic in-memory remote store.
//!
//! Plays the server side of the wire contracts for tests and local
//! development: applies requests to its own copy of the data, settles a
//! request batch all-or-nothing, and supports scripted failure injection.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::model::archive::ArchivedItem;
use crate::model::item::{BuiltinStatus, Item};
use crate::model::partition::Partition;
use crate::ops::archive_ops;
use crate::remote::api::{
    ArchivePage, ArchiveQuery, FieldChanges, RemoteError, RemoteOk, RemoteRequest, RemoteResult,
    UpdatedItem,
};

#[derive(Debug, Default)]
pub struct MemoryRemote {
    items: IndexMap<String, Item>,
    archived: IndexMap<String, ArchivedItem>,
    page_size: usize,
    /// When set, the server derives this due date for items entering
    /// In Progress without one — the kind of server-computed field the
    /// client reconciles after a confirm.
    pub due_default: Option<DateTime<Utc>>,
    fail_queue: VecDeque<RemoteError>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        MemoryRemote {
            page_size: 50,
            ..MemoryRemote::default()
        }
    }

    pub fn with_items(items: impl IntoIterator<Item = Item>) -> Self {
        let mut remote = MemoryRemote::new();
        for item in items {
            remote.items.insert(item.id.clone(), item);
        }
        remote
    }

    pub fn seed_archived(&mut self, entry: ArchivedItem) {
        self.archived.insert(entry.item.id.clone(), entry);
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size;
    }

    /// Queue a failure for the next `perform` call. The failed call
    /// leaves server state untouched.
    pub fn fail_next(&mut self, error: RemoteError) {
        self.fail_queue.push_back(error);
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn archived_entry(&self, id: &str) -> Option<&ArchivedItem> {
        self.archived.get(id)
    }

    /// Ordered IDs of one partition, server-side
    pub fn partition_order(&self, partition: &Partition) -> Vec<String> {
        let mut members: Vec<&Item> = self
            .items
            .values()
            .filter(|i| i.partition == *partition)
            .collect();
        members.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then(a.created_at.cmp(&b.created_at))
        });
        members.into_iter().map(|i| i.id.clone()).collect()
    }

    /// Perform a ticket's request batch, all-or-nothing: validation runs
    /// over the whole batch before anything is applied.
    pub fn perform(&mut self, requests: &[RemoteRequest], now: DateTime<Utc>) -> RemoteResult {
        if let Some(error) = self.fail_queue.pop_front() {
            return Err(error);
        }
        for request in requests {
            self.check(request)?;
        }
        let mut ok = RemoteOk::default();
        for request in requests {
            self.apply(request, now, &mut ok);
        }
        Ok(ok)
    }

    fn check(&self, request: &RemoteRequest) -> Result<(), RemoteError> {
        let known_active = |ids: &[String]| {
            ids.iter()
                .find(|id| !self.items.contains_key(*id))
                .map(|id| Err(RemoteError::NotFound(id.clone())))
                .unwrap_or(Ok(()))
        };
        match request {
            RemoteRequest::Reorder { .. } => Ok(()),
            RemoteRequest::SingleUpdate { id, changes } => {
                check_changes(changes)?;
                known_active(std::slice::from_ref(id))
            }
            RemoteRequest::BatchUpdate { ids, changes } => {
                check_changes(changes)?;
                known_active(ids)
            }
            RemoteRequest::Archive { ids, .. } => known_active(ids),
            RemoteRequest::Unarchive { ids } => ids
                .iter()
                .find(|id| !self.archived.contains_key(*id))
                .map(|id| Err(RemoteError::NotFound(id.clone())))
                .unwrap_or(Ok(())),
            RemoteRequest::Delete { ids } => ids
                .iter()
                .find(|id| !self.items.contains_key(*id) && !self.archived.contains_key(*id))
                .map(|id| Err(RemoteError::NotFound(id.clone())))
                .unwrap_or(Ok(())),
        }
    }

    fn apply(&mut self, request: &RemoteRequest, now: DateTime<Utc>, ok: &mut RemoteOk) {
        match request {
            RemoteRequest::Reorder {
                partition,
                ordered_ids,
            } => {
                for (index, id) in ordered_ids.iter().enumerate() {
                    if let Some(item) = self.items.get_mut(id)
                        && item.partition == *partition
                    {
                        item.position = index as i64;
                    }
                }
            }
            RemoteRequest::SingleUpdate { id, changes } => {
                self.apply_update(std::slice::from_ref(id), changes, ok);
            }
            RemoteRequest::BatchUpdate { ids, changes } => {
                self.apply_update(ids, changes, ok);
            }
            RemoteRequest::Archive { ids, reason } => {
                for id in ids {
                    if let Some(item) = self.items.shift_remove(id) {
                        let record = archive_ops::build_archive_record(
                            item,
                            now,
                            reason.clone(),
                            false,
                        );
                        self.archived.insert(id.clone(), record);
                    }
                }
            }
            RemoteRequest::Unarchive { ids } => {
                for id in ids {
                    if let Some(entry) = self.archived.shift_remove(id) {
                        let mut item = entry.item;
                        item.position = self
                            .items
                            .values()
                            .filter(|i| i.partition == item.partition)
                            .map(|i| i.position)
                            .max()
                            .map(|p| p + 1)
                            .unwrap_or(0);
                        self.items.insert(id.clone(), item);
                    }
                }
            }
            RemoteRequest::Delete { ids } => {
                for id in ids {
                    if self.items.shift_remove(id).is_none() {
                        self.archived.shift_remove(id);
                    }
                }
            }
        }
    }

    fn apply_update(&mut self, ids: &[String], changes: &FieldChanges, ok: &mut RemoteOk) {
        for id in ids {
            let due_default = self.due_default;
            let Some(item) = self.items.get_mut(id) else {
                continue;
            };
            let mut confirmed = changes.clone();
            if let Some(title) = &changes.title {
                item.title = title.clone();
            }
            if let Some(partition) = &changes.partition {
                item.partition = partition.clone();
                // Server-computed default: entering In Progress without a
                // due date assigns one
                if *partition == Partition::Builtin(BuiltinStatus::InProgress)
                    && item.due_date.is_none()
                    && changes.due_date.is_none()
                    && let Some(due) = due_default
                {
                    item.due_date = Some(due);
                    confirmed.due_date = Some(Some(due));
                }
            }
            if let Some(priority) = changes.priority {
                item.priority = priority;
            }
            if let Some(due_date) = changes.due_date {
                item.due_date = due_date;
            }
            if let Some(pinned) = changes.today_pinned {
                item.today_pinned = pinned;
            }
            if let Some(tags) = &changes.tags {
                item.tags = tags.clone();
            }
            ok.updated.push(UpdatedItem {
                id: id.clone(),
                changes: confirmed,
            });
        }
    }

    /// The archive listing contract: filter, newest first, paginate.
    pub fn list_archived(&self, query: &ArchiveQuery) -> ArchivePage {
        let mut matching: Vec<&ArchivedItem> = self
            .archived
            .values()
            .filter(|entry| archive_ops::matches_query(entry, query))
            .collect();
        matching.sort_by(|a, b| b.archived_at.cmp(&a.archived_at));

        let total = matching.len();
        let start = query.page * self.page_size;
        let entries = matching
            .into_iter()
            .skip(start)
            .take(self.page_size)
            .cloned()
            .collect();
        ArchivePage {
            entries,
            page: query.page,
            page_size: self.page_size,
            total,
        }
    }
}

/// Server-side validation: the policy rules a client may violate
fn check_changes(changes: &FieldChanges) -> Result<(), RemoteError> {
    if let Some(title) = &changes.title
        && title.trim().is_empty()
    {
        return Err(RemoteError::Validation("title must not be empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn sample_remote() -> MemoryRemote {
        let mut items = Vec::new();
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            let mut item = Item::new(*id, *id, now());
            item.position = i as i64;
            items.push(item);
        }
        MemoryRemote::with_items(items)
    }

    #[test]
    fn test_perform_is_all_or_nothing() {
        let mut remote = sample_remote();
        let requests = vec![
            RemoteRequest::SingleUpdate {
                id: "a".into(),
                changes: FieldChanges {
                    title: Some("renamed".into()),
                    ..Default::default()
                },
            },
            RemoteRequest::SingleUpdate {
                id: "ghost".into(),
                changes: FieldChanges::default(),
            },
        ];
        let err = remote.perform(&requests, now()).unwrap_err();
        assert!(matches!(err, RemoteError::NotFound(id) if id == "ghost"));
        // The first request did not apply either
        assert_eq!(remote.item("a").unwrap().title, "a");
    }

    #[test]
    fn test_fail_next_leaves_state_untouched() {
        let mut remote = sample_remote();
        remote.fail_next(RemoteError::Transient("socket closed".into()));
        let requests = vec![RemoteRequest::Delete {
            ids: vec!["a".into()],
        }];
        assert!(remote.perform(&requests, now()).is_err());
        assert!(remote.item("a").is_some());
        // The queue only covered one call
        assert!(remote.perform(&requests, now()).is_ok());
        assert!(remote.item("a").is_none());
    }

    #[test]
    fn test_empty_title_is_validation_rejected() {
        let mut remote = sample_remote();
        let requests = vec![RemoteRequest::SingleUpdate {
            id: "a".into(),
            changes: FieldChanges {
                title: Some("   ".into()),
                ..Default::default()
            },
        }];
        let err = remote.perform(&requests, now()).unwrap_err();
        assert!(matches!(err, RemoteError::Validation(_)));
    }

    #[test]
    fn test_derived_due_date_is_echoed() {
        let mut remote = sample_remote();
        let derived = Utc.with_ymd_and_hms(2026, 3, 2, 17, 0, 0).unwrap();
        remote.due_default = Some(derived);

        let requests = vec![RemoteRequest::SingleUpdate {
            id: "a".into(),
            changes: FieldChanges {
                partition: Some(Partition::Builtin(BuiltinStatus::InProgress)),
                ..Default::default()
            },
        }];
        let ok = remote.perform(&requests, now()).unwrap();
        assert_eq!(ok.updated.len(), 1);
        assert_eq!(ok.updated[0].changes.due_date, Some(Some(derived)));
        assert_eq!(remote.item("a").unwrap().due_date, Some(derived));
    }

    #[test]
    fn test_archive_and_list_paginated() {
        let mut remote = sample_remote();
        remote.set_page_size(2);
        let requests = vec![RemoteRequest::Archive {
            ids: vec!["a".into(), "b".into(), "c".into()],
            reason: None,
        }];
        remote.perform(&requests, now()).unwrap();

        let first = remote.list_archived(&ArchiveQuery::default());
        assert_eq!(first.total, 3);
        assert_eq!(first.entries.len(), 2);
        assert!(first.has_more());

        let second = remote.list_archived(&ArchiveQuery {
            page: 1,
            ..Default::default()
        });
        assert_eq!(second.entries.len(), 1);
        assert!(!second.has_more());
    }
}
