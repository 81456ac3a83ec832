use chrono::{DateTime, Utc};
use regex::Regex;

use crate::model::archive::{ArchiveBucket, ArchivedItem, ItemSnapshot};
use crate::model::board::Board;
use crate::model::item::{BuiltinStatus, Item};
use crate::model::partition::Partition;
use crate::model::status::CustomStatus;
use crate::remote::api::ArchiveQuery;

/// Bucket classification: Complete items archive as Finished, everything
/// else as Unfinished.
pub fn classify_bucket(item: &Item) -> ArchiveBucket {
    if item.is_complete() {
        ArchiveBucket::Finished
    } else {
        ArchiveBucket::Unfinished
    }
}

/// Build the archive record for an item leaving the active set.
/// The snapshot is captured before anything about the item changes.
pub fn build_archive_record(
    item: Item,
    now: DateTime<Utc>,
    reason: Option<String>,
    by_system: bool,
) -> ArchivedItem {
    ArchivedItem {
        bucket: classify_bucket(&item),
        snapshot: ItemSnapshot::capture(&item),
        archived_at: now,
        reason,
        by_system,
        item,
    }
}

/// Partition a restored item lands in: the snapshot's last known lane,
/// falling back to Wait when a custom lane was deleted in the meantime.
pub fn resolve_restore_partition(
    snapshot_partition: &Partition,
    statuses: &[CustomStatus],
) -> Partition {
    match snapshot_partition {
        Partition::Builtin(_) => snapshot_partition.clone(),
        Partition::Custom(id) => {
            if statuses.iter().any(|s| s.id == *id) {
                snapshot_partition.clone()
            } else {
                Partition::Builtin(BuiltinStatus::Wait)
            }
        }
    }
}

/// IDs from the selection whose items are active but not Complete —
/// the ones that need an explicit confirmation before archiving.
pub fn unfinished_ids(board: &Board, ids: &[String]) -> Vec<String> {
    ids.iter()
        .filter(|id| board.get(id).is_some_and(|item| !item.is_complete()))
        .cloned()
        .collect()
}

/// Whether an archived entry matches a listing query. The pattern is
/// treated as a case-insensitive regex over the snapshot title and tags;
/// an invalid pattern degrades to a literal substring match.
pub fn matches_query(entry: &ArchivedItem, query: &ArchiveQuery) -> bool {
    if let Some(bucket) = query.bucket
        && entry.bucket != bucket
    {
        return false;
    }
    let day = entry.archived_at.date_naive();
    if let Some(from) = query.from
        && day < from
    {
        return false;
    }
    if let Some(to) = query.to
        && day > to
    {
        return false;
    }
    if let Some(pattern) = &query.query {
        let re = Regex::new(&format!("(?i){}", pattern))
            .or_else(|_| Regex::new(&format!("(?i){}", regex::escape(pattern))));
        let re = match re {
            Ok(re) => re,
            Err(_) => return false,
        };
        let hit = re.is_match(&entry.snapshot.title)
            || entry.snapshot.tags.iter().any(|t| re.is_match(t));
        if !hit {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn archived(title: &str, tags: &[&str], bucket: ArchiveBucket) -> ArchivedItem {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 10, 0, 0).unwrap();
        let mut item = Item::new(title, title, now);
        item.tags = tags.iter().map(|t| t.to_string()).collect();
        if bucket == ArchiveBucket::Finished {
            item.partition = Partition::Builtin(BuiltinStatus::Complete);
        }
        build_archive_record(item, now, None, false)
    }

    #[test]
    fn test_bucket_classification() {
        let now = Utc::now();
        let mut item = Item::new("t", "t", now);
        assert_eq!(classify_bucket(&item), ArchiveBucket::Unfinished);
        item.partition = Partition::Builtin(BuiltinStatus::Complete);
        assert_eq!(classify_bucket(&item), ArchiveBucket::Finished);
    }

    #[test]
    fn test_restore_partition_falls_back_to_wait() {
        let statuses = vec![CustomStatus {
            id: "cs-live".into(),
            name: "Live".into(),
            color: "#000".into(),
            position: 0,
        }];
        let live = Partition::Custom("cs-live".into());
        assert_eq!(resolve_restore_partition(&live, &statuses), live);

        let gone = Partition::Custom("cs-gone".into());
        assert_eq!(
            resolve_restore_partition(&gone, &statuses),
            Partition::Builtin(BuiltinStatus::Wait)
        );
    }

    #[test]
    fn test_query_matches_title_and_tags() {
        let entry = archived("Quarterly report", &["work", "finance"], ArchiveBucket::Finished);

        let by_title = ArchiveQuery {
            query: Some("quarterly".into()),
            ..Default::default()
        };
        assert!(matches_query(&entry, &by_title));

        let by_tag = ArchiveQuery {
            query: Some("FINANCE".into()),
            ..Default::default()
        };
        assert!(matches_query(&entry, &by_tag));

        let miss = ArchiveQuery {
            query: Some("groceries".into()),
            ..Default::default()
        };
        assert!(!matches_query(&entry, &miss));
    }

    #[test]
    fn test_query_filters_bucket_and_dates() {
        let entry = archived("Old chore", &[], ArchiveBucket::Unfinished);

        let wrong_bucket = ArchiveQuery {
            bucket: Some(ArchiveBucket::Finished),
            ..Default::default()
        };
        assert!(!matches_query(&entry, &wrong_bucket));

        let in_range = ArchiveQuery {
            from: Some(chrono::NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()),
            to: Some(chrono::NaiveDate::from_ymd_opt(2026, 3, 31).unwrap()),
            ..Default::default()
        };
        assert!(matches_query(&entry, &in_range));

        let before = ArchiveQuery {
            to: Some(chrono::NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()),
            ..Default::default()
        };
        assert!(!matches_query(&entry, &before));
    }
}
