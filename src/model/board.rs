use indexmap::IndexMap;

use super::archive::ArchivedItem;
use super::item::Item;
use super::partition::{self, Partition};
use super::status::CustomStatus;

/// Error type for board operations
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("item not found: {0}")]
    ItemNotFound(String),
    #[error("duplicate item id: {0}")]
    DuplicateId(String),
    #[error("custom status not found: {0}")]
    StatusNotFound(String),
    #[error("custom status still referenced by items: {0}")]
    StatusInUse(String),
    #[error("item is not archived: {0}")]
    NotArchived(String),
}

/// The in-memory collection every other component reads and the
/// coordinator mutates: active items keyed by ID, the custom status lanes,
/// and the archive set.
///
/// Single-owner by design — all mutation goes through `&mut self`, so a
/// reorder is atomic with respect to reads: no caller can observe a
/// partition mid-renumber.
#[derive(Debug, Clone, Default)]
pub struct Board {
    items: IndexMap<String, Item>,
    custom_statuses: Vec<CustomStatus>,
    archived: IndexMap<String, ArchivedItem>,
}

impl Board {
    pub fn new() -> Self {
        Board::default()
    }

    // -----------------------------------------------------------------
    // Active items
    // -----------------------------------------------------------------

    /// Insert a new item at the tail of its partition.
    /// This is the seeding path — remote creation is the host's concern.
    pub fn insert(&mut self, mut item: Item) -> Result<(), BoardError> {
        if self.items.contains_key(&item.id) || self.archived.contains_key(&item.id) {
            return Err(BoardError::DuplicateId(item.id));
        }
        item.position = self.tail_position(&item.partition);
        self.items.insert(item.id.clone(), item);
        Ok(())
    }

    /// Re-insert a previously removed item as-is, keeping its position.
    /// Used by rollback and undo paths.
    pub(crate) fn reinsert(&mut self, item: Item) {
        self.items.insert(item.id.clone(), item);
    }

    /// Remove an item from the active set, returning it.
    /// Other items keep their positions — gaps are fine.
    pub(crate) fn remove(&mut self, id: &str) -> Option<Item> {
        self.items.shift_remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Item> {
        self.items.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// Next free tail position in a partition
    pub fn tail_position(&self, key: &Partition) -> i64 {
        self.items
            .values()
            .filter(|i| i.partition == *key)
            .map(|i| i.position)
            .max()
            .map(|p| p + 1)
            .unwrap_or(0)
    }

    /// All items in one partition, sorted by `(position, created_at)` with
    /// the ID as a final stable tie-break.
    pub fn items_in_partition(&self, key: &Partition) -> Vec<&Item> {
        let mut out: Vec<&Item> = self
            .items
            .values()
            .filter(|i| i.partition == *key)
            .collect();
        out.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        out
    }

    /// Ordered IDs of one partition
    pub fn partition_order(&self, key: &Partition) -> Vec<String> {
        self.items_in_partition(key)
            .into_iter()
            .map(|i| i.id.clone())
            .collect()
    }

    /// Reassign `position = index` for every listed ID that belongs to the
    /// partition. Items outside the partition are untouched; listed IDs
    /// that are missing or sit in another partition are skipped.
    ///
    /// Post-condition: `items_in_partition(key)` yields exactly the order
    /// the caller asked for.
    pub fn replace_partition_order(&mut self, key: &Partition, ordered_ids: &[String]) {
        for (index, id) in ordered_ids.iter().enumerate() {
            if let Some(item) = self.items.get_mut(id)
                && item.partition == *key
            {
                item.position = index as i64;
            }
        }
    }

    /// Move an item into `to` at `index`, re-deriving the target
    /// partition's positions. The source partition keeps its gaps.
    pub fn move_partition(
        &mut self,
        id: &str,
        to: &Partition,
        index: usize,
    ) -> Result<(), BoardError> {
        let item = self
            .items
            .get_mut(id)
            .ok_or_else(|| BoardError::ItemNotFound(id.to_string()))?;
        item.partition = to.clone();

        let mut order: Vec<String> = self
            .items_in_partition(to)
            .into_iter()
            .map(|i| i.id.clone())
            .filter(|other| other != id)
            .collect();
        let idx = index.min(order.len());
        order.insert(idx, id.to_string());
        self.replace_partition_order(to, &order);
        Ok(())
    }

    /// Sort a selection of item IDs into display order: lane rank first
    /// (In Progress, Waiting, Complete, customs), then position.
    pub fn selection_ordered(&self, ids: &[String]) -> Vec<String> {
        let mut found: Vec<&Item> = ids.iter().filter_map(|id| self.items.get(id)).collect();
        found.sort_by(|a, b| {
            partition::partition_rank(&a.partition, &self.custom_statuses)
                .cmp(&partition::partition_rank(&b.partition, &self.custom_statuses))
                .then(a.position.cmp(&b.position))
                .then(a.created_at.cmp(&b.created_at))
        });
        found.into_iter().map(|i| i.id.clone()).collect()
    }

    /// Canonical lane display order for this board
    pub fn canonical_partitions(&self) -> Vec<Partition> {
        partition::canonical_partitions(&self.custom_statuses)
    }

    // -----------------------------------------------------------------
    // Custom statuses
    // -----------------------------------------------------------------

    pub fn custom_statuses(&self) -> &[CustomStatus] {
        &self.custom_statuses
    }

    pub fn custom_status(&self, id: &str) -> Option<&CustomStatus> {
        self.custom_statuses.iter().find(|s| s.id == id)
    }

    pub fn add_custom_status(&mut self, status: CustomStatus) -> Result<(), BoardError> {
        if self.custom_status(&status.id).is_some() {
            return Err(BoardError::DuplicateId(status.id));
        }
        self.custom_statuses.push(status);
        Ok(())
    }

    pub fn rename_custom_status(&mut self, id: &str, name: &str) -> Result<(), BoardError> {
        let status = self
            .custom_statuses
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| BoardError::StatusNotFound(id.to_string()))?;
        status.name = name.to_string();
        Ok(())
    }

    pub fn recolor_custom_status(&mut self, id: &str, color: &str) -> Result<(), BoardError> {
        let status = self
            .custom_statuses
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| BoardError::StatusNotFound(id.to_string()))?;
        status.color = color.to_string();
        Ok(())
    }

    pub fn set_custom_status_position(
        &mut self,
        id: &str,
        position: i64,
    ) -> Result<(), BoardError> {
        let status = self
            .custom_statuses
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| BoardError::StatusNotFound(id.to_string()))?;
        status.position = position;
        Ok(())
    }

    /// Delete a custom status. Fails while any active item references it.
    /// Archived snapshots may keep referencing a deleted lane; restore
    /// falls back to Wait for those.
    pub fn remove_custom_status(&mut self, id: &str) -> Result<CustomStatus, BoardError> {
        let idx = self
            .custom_statuses
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| BoardError::StatusNotFound(id.to_string()))?;

        let referenced = self
            .items
            .values()
            .any(|i| i.partition.as_custom() == Some(id));
        if referenced {
            return Err(BoardError::StatusInUse(id.to_string()));
        }
        Ok(self.custom_statuses.remove(idx))
    }

    // -----------------------------------------------------------------
    // Archive set
    // -----------------------------------------------------------------

    pub fn archived(&self) -> impl Iterator<Item = &ArchivedItem> {
        self.archived.values()
    }

    pub fn archived_get(&self, id: &str) -> Option<&ArchivedItem> {
        self.archived.get(id)
    }

    pub fn archived_len(&self) -> usize {
        self.archived.len()
    }

    pub(crate) fn archive_insert(&mut self, entry: ArchivedItem) {
        self.archived.insert(entry.item.id.clone(), entry);
    }

    pub(crate) fn archive_remove(&mut self, id: &str) -> Option<ArchivedItem> {
        self.archived.shift_remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::BuiltinStatus;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn wait() -> Partition {
        Partition::Builtin(BuiltinStatus::Wait)
    }

    fn sample_board() -> Board {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let mut board = Board::new();
        for id in ["a", "b", "c"] {
            board.insert(Item::new(id, id, now)).unwrap();
        }
        board
    }

    #[test]
    fn test_insert_appends_to_partition_tail() {
        let board = sample_board();
        assert_eq!(board.partition_order(&wait()), vec!["a", "b", "c"]);
        assert_eq!(board.get("c").unwrap().position, 2);
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let mut board = sample_board();
        let err = board
            .insert(Item::new("a", "again", Utc::now()))
            .unwrap_err();
        assert!(matches!(err, BoardError::DuplicateId(_)));
    }

    #[test]
    fn test_replace_partition_order_round_trips() {
        let mut board = sample_board();
        let ids: Vec<String> = ["c", "a", "b"].iter().map(|s| s.to_string()).collect();
        board.replace_partition_order(&wait(), &ids);
        assert_eq!(board.partition_order(&wait()), vec!["c", "a", "b"]);
        let positions: Vec<i64> = board
            .items_in_partition(&wait())
            .iter()
            .map(|i| i.position)
            .collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_replace_order_skips_foreign_ids() {
        let mut board = sample_board();
        let done = Partition::Builtin(BuiltinStatus::Complete);
        board.move_partition("c", &done, 0).unwrap();

        // "c" no longer belongs to Wait, so listing it has no effect there
        let ids: Vec<String> = ["c", "b", "a"].iter().map(|s| s.to_string()).collect();
        board.replace_partition_order(&wait(), &ids);
        assert_eq!(board.partition_order(&wait()), vec!["b", "a"]);
        assert_eq!(board.partition_order(&done), vec!["c"]);
    }

    #[test]
    fn test_move_partition_inserts_at_index() {
        let mut board = sample_board();
        let progress = Partition::Builtin(BuiltinStatus::InProgress);
        board.move_partition("a", &progress, 0).unwrap();
        board.move_partition("c", &progress, 0).unwrap();
        assert_eq!(board.partition_order(&progress), vec!["c", "a"]);
        assert_eq!(board.partition_order(&wait()), vec!["b"]);
    }

    #[test]
    fn test_remove_custom_status_guarded_by_references() {
        let mut board = sample_board();
        board
            .add_custom_status(CustomStatus {
                id: "cs-1".into(),
                name: "Review".into(),
                color: "#333".into(),
                position: 0,
            })
            .unwrap();
        board
            .move_partition("b", &Partition::Custom("cs-1".into()), 0)
            .unwrap();

        let err = board.remove_custom_status("cs-1").unwrap_err();
        assert!(matches!(err, BoardError::StatusInUse(_)));

        board.move_partition("b", &wait(), 0).unwrap();
        board.remove_custom_status("cs-1").unwrap();
        assert!(board.custom_status("cs-1").is_none());
    }

    #[test]
    fn test_position_ties_break_by_creation_time() {
        let mut board = Board::new();
        let early = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let mut first = Item::new("x", "x", late);
        first.position = 5;
        let mut second = Item::new("y", "y", early);
        second.position = 5;
        board.reinsert(first);
        board.reinsert(second);
        assert_eq!(board.partition_order(&wait()), vec!["y", "x"]);
    }
}
