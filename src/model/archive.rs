use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::item::{Item, Priority};
use super::partition::Partition;

/// Which archive bucket an item landed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveBucket {
    Finished,
    Unfinished,
}

impl ArchiveBucket {
    pub fn label(self) -> &'static str {
        match self {
            ArchiveBucket::Finished => "Finished",
            ArchiveBucket::Unfinished => "Unfinished",
        }
    }
}

/// Denormalized copy of an item's display fields, captured at archive time.
/// History views render from this without rehydrating the live item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub title: String,
    pub partition: Partition,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

impl ItemSnapshot {
    pub fn capture(item: &Item) -> Self {
        ItemSnapshot {
            title: item.title.clone(),
            partition: item.partition.clone(),
            priority: item.priority,
            due_date: item.due_date,
            tags: item.tags.clone(),
        }
    }
}

/// An archived item: the full record (for restore) plus archive metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedItem {
    pub item: Item,
    pub bucket: ArchiveBucket,
    pub archived_at: DateTime<Utc>,
    pub reason: Option<String>,
    /// True when the external auto-archival policy filed this, false for
    /// an explicit user action
    pub by_system: bool,
    pub snapshot: ItemSnapshot,
}

/// One calendar day of archived items, split by bucket.
/// Read-side projection only — nothing here is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup<'a> {
    pub day: NaiveDate,
    pub finished: Vec<&'a ArchivedItem>,
    pub unfinished: Vec<&'a ArchivedItem>,
}

/// Group archived entries by the calendar day of `archived_at`, newest day
/// first. Within a day, entries keep the order they were given in.
pub fn archive_day_groups<'a, I>(entries: I) -> Vec<DayGroup<'a>>
where
    I: IntoIterator<Item = &'a ArchivedItem>,
{
    let mut groups: Vec<DayGroup<'a>> = Vec::new();
    for entry in entries {
        let day = entry.archived_at.date_naive();
        let idx = match groups.iter().position(|g| g.day == day) {
            Some(idx) => idx,
            None => {
                groups.push(DayGroup {
                    day,
                    finished: Vec::new(),
                    unfinished: Vec::new(),
                });
                groups.len() - 1
            }
        };
        match entry.bucket {
            ArchiveBucket::Finished => groups[idx].finished.push(entry),
            ArchiveBucket::Unfinished => groups[idx].unfinished.push(entry),
        }
    }
    groups.sort_by(|a, b| b.day.cmp(&a.day));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(id: &str, bucket: ArchiveBucket, archived_at: DateTime<Utc>) -> ArchivedItem {
        let item = Item::new(id, id, archived_at);
        ArchivedItem {
            snapshot: ItemSnapshot::capture(&item),
            item,
            bucket,
            archived_at,
            reason: None,
            by_system: false,
        }
    }

    #[test]
    fn test_day_groups_split_by_bucket_newest_first() {
        let d1 = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let d1_later = Utc.with_ymd_and_hms(2026, 3, 2, 18, 30, 0).unwrap();
        let d2 = Utc.with_ymd_and_hms(2026, 3, 5, 12, 0, 0).unwrap();

        let entries = vec![
            entry("a", ArchiveBucket::Finished, d1),
            entry("b", ArchiveBucket::Unfinished, d1_later),
            entry("c", ArchiveBucket::Finished, d2),
        ];
        let groups = archive_day_groups(&entries);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].day, d2.date_naive());
        assert_eq!(groups[0].finished.len(), 1);
        assert!(groups[0].unfinished.is_empty());
        assert_eq!(groups[1].day, d1.date_naive());
        assert_eq!(groups[1].finished[0].item.id, "a");
        assert_eq!(groups[1].unfinished[0].item.id, "b");
    }
}
