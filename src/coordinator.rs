//! The optimistic mutation coordinator — the single funnel every
//! state-changing operation goes through.
//!
//! Contract for any mutation: capture old values, apply to the board
//! synchronously (UI-visible immediately), register a reversible action,
//! emit the remote request(s) under a ticket. The host transport performs
//! the requests and reports back through [`Coordinator::settle`]; a
//! rejection rolls the board back and discards the registered action.
//!
//! Execution is single-threaded and event-driven: the only suspension
//! points are the remote calls themselves, which live entirely on the
//! host's side of the [`Outbound`] seam. Every entry point takes `now`
//! from the host event loop, keeping the engine deterministic under test.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::model::archive::ArchivedItem;
use crate::model::board::{Board, BoardError};
use crate::model::config::EngineConfig;
use crate::model::item::{Item, Priority};
use crate::model::partition::Partition;
use crate::model::status::CustomStatus;
use crate::ops::archive_ops;
use crate::ops::drag::{self, DragResolution};
use crate::ops::mutation::{
    self, Field, FieldDelta, ItemChange, Mutation, OrderChange, RestoreRecord,
};
use crate::remote::api::{RemoteError, RemoteRequest, RemoteResult, UpdatedItem};
use crate::undo::{UndoError, UndoEvent, UndoManager};

/// Monotonic handle pairing an emitted remote call with its later settle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(pub u64);

/// An emitted mutation: the ticket plus the request(s) the host transport
/// must perform. A ticket settles once, all-or-nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub ticket: Ticket,
    pub requests: Vec<RemoteRequest>,
}

/// Error type for coordinator operations
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Undo(#[from] UndoError),
    #[error("item not found: {0}")]
    ItemNotFound(String),
    #[error("item is not archived: {0}")]
    NotArchived(String),
    #[error("archived item has no due date: {0}")]
    NoDueDate(String),
    #[error("unknown ticket: {0}")]
    UnknownTicket(u64),
}

/// Options for an archive call
#[derive(Debug, Clone, Default)]
pub struct ArchiveOptions {
    pub reason: Option<String>,
    /// True when the external auto-archival policy is the caller
    pub by_system: bool,
    /// The caller confirmed archiving items that are not Complete.
    /// Without it, a selection containing unfinished work cancels.
    pub confirmed_unfinished: bool,
}

/// Outcome of an archive call
#[derive(Debug)]
pub enum ArchiveOutcome {
    Applied(Outbound),
    /// The selection contains unfinished items and the caller has not
    /// confirmed — nothing was changed. A normal early return, not an
    /// error.
    Cancelled { unfinished: Vec<String> },
}

/// Outcome of settling a ticket
#[derive(Debug)]
pub enum SettleOutcome {
    /// Server confirmed; server-computed fields were reconciled
    Confirmed,
    /// Rolled back. The mutation is returned so the host can offer a
    /// manual retry for transient failures.
    RolledBack {
        error: RemoteError,
        mutation: Mutation,
        /// Items evicted locally because the server no longer has them
        evicted: Vec<String>,
    },
}

struct Pending {
    ticket: Ticket,
    mutation: Mutation,
    /// Undo action to discard if the mutation never commits
    action_id: Option<u64>,
}

/// Owns the board, the undo stack, and the in-flight mutations.
pub struct Coordinator {
    board: Board,
    undo: UndoManager,
    pending: Vec<Pending>,
    next_ticket: u64,
}

impl Coordinator {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_board(Board::new(), config)
    }

    pub fn with_board(board: Board, config: EngineConfig) -> Self {
        Coordinator {
            board,
            undo: UndoManager::new(&config.undo),
            pending: Vec::new(),
            next_ticket: 1,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn undo_manager(&self) -> &UndoManager {
        &self.undo
    }

    pub fn has_pending(&self, ticket: Ticket) -> bool {
        self.pending.iter().any(|p| p.ticket == ticket)
    }

    // -----------------------------------------------------------------
    // Seeding and local-only board management
    // -----------------------------------------------------------------

    /// Seed an item the host already created remotely. Lands at the tail
    /// of its partition.
    pub fn seed_item(&mut self, item: Item) -> Result<(), CoordinatorError> {
        Ok(self.board.insert(item)?)
    }

    /// Seed an archive entry loaded from the remote store
    pub fn seed_archived(&mut self, entry: ArchivedItem) {
        self.board.archive_insert(entry);
    }

    pub fn add_custom_status(&mut self, status: CustomStatus) -> Result<(), CoordinatorError> {
        Ok(self.board.add_custom_status(status)?)
    }

    pub fn rename_custom_status(&mut self, id: &str, name: &str) -> Result<(), CoordinatorError> {
        Ok(self.board.rename_custom_status(id, name)?)
    }

    pub fn recolor_custom_status(&mut self, id: &str, color: &str) -> Result<(), CoordinatorError> {
        Ok(self.board.recolor_custom_status(id, color)?)
    }

    pub fn set_custom_status_position(
        &mut self,
        id: &str,
        position: i64,
    ) -> Result<(), CoordinatorError> {
        Ok(self.board.set_custom_status_position(id, position)?)
    }

    /// Delete a custom status lane. Fails while any item references it.
    pub fn remove_custom_status(&mut self, id: &str) -> Result<CustomStatus, CoordinatorError> {
        Ok(self.board.remove_custom_status(id)?)
    }

    // -----------------------------------------------------------------
    // Field mutations
    // -----------------------------------------------------------------

    pub fn set_priority(
        &mut self,
        id: &str,
        priority: Priority,
        now: DateTime<Utc>,
    ) -> Result<Option<Outbound>, CoordinatorError> {
        let item = self.require_item(id)?;
        if item.priority == priority {
            return Ok(None);
        }
        let change = ItemChange {
            id: id.to_string(),
            deltas: vec![FieldDelta::Priority {
                old: item.priority,
                new: priority,
            }],
        };
        Ok(Some(self.commit_update(vec![change], "Priority changed", now)))
    }

    pub fn set_due_date(
        &mut self,
        id: &str,
        due_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Option<Outbound>, CoordinatorError> {
        let item = self.require_item(id)?;
        if item.due_date == due_date {
            return Ok(None);
        }
        let change = ItemChange {
            id: id.to_string(),
            deltas: vec![FieldDelta::DueDate {
                old: item.due_date,
                new: due_date,
            }],
        };
        Ok(Some(self.commit_update(vec![change], "Due date changed", now)))
    }

    /// Pin or unpin an item in the "today" view, independent of due date
    pub fn set_today_pinned(
        &mut self,
        id: &str,
        pinned: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<Option<Outbound>, CoordinatorError> {
        let item = self.require_item(id)?;
        if item.today_pinned == pinned {
            return Ok(None);
        }
        let label = if pinned.is_some() {
            "Added to today"
        } else {
            "Removed from today"
        };
        let change = ItemChange {
            id: id.to_string(),
            deltas: vec![FieldDelta::TodayPinned {
                old: item.today_pinned,
                new: pinned,
            }],
        };
        Ok(Some(self.commit_update(vec![change], label, now)))
    }

    pub fn edit_title(
        &mut self,
        id: &str,
        title: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Outbound>, CoordinatorError> {
        let item = self.require_item(id)?;
        if item.title == title {
            return Ok(None);
        }
        let change = ItemChange {
            id: id.to_string(),
            deltas: vec![FieldDelta::Title {
                old: item.title.clone(),
                new: title.to_string(),
            }],
        };
        Ok(Some(self.commit_update(vec![change], "Title changed", now)))
    }

    pub fn set_tags(
        &mut self,
        id: &str,
        mut tags: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<Option<Outbound>, CoordinatorError> {
        tags.dedup();
        let item = self.require_item(id)?;
        if item.tags == tags {
            return Ok(None);
        }
        let change = ItemChange {
            id: id.to_string(),
            deltas: vec![FieldDelta::Tags {
                old: item.tags.clone(),
                new: tags,
            }],
        };
        Ok(Some(self.commit_update(vec![change], "Tags changed", now)))
    }

    /// Apply one priority to a whole selection. One remote call, settled
    /// all-or-nothing.
    pub fn set_priority_many(
        &mut self,
        ids: &[String],
        priority: Priority,
        now: DateTime<Utc>,
    ) -> Result<Option<Outbound>, CoordinatorError> {
        let mut changes = Vec::new();
        for id in ids {
            let item = self.require_item(id)?;
            if item.priority != priority {
                changes.push(ItemChange {
                    id: id.clone(),
                    deltas: vec![FieldDelta::Priority {
                        old: item.priority,
                        new: priority,
                    }],
                });
            }
        }
        if changes.is_empty() {
            return Ok(None);
        }
        let label = format!("Priority changed on {} items", changes.len());
        Ok(Some(self.commit_update(changes, label, now)))
    }

    // -----------------------------------------------------------------
    // Status changes and reordering
    // -----------------------------------------------------------------

    /// Change an item's lane by click or shortcut. The item lands at the
    /// tail of the target lane.
    pub fn set_status(
        &mut self,
        id: &str,
        partition: Partition,
        now: DateTime<Utc>,
    ) -> Result<Option<Outbound>, CoordinatorError> {
        self.set_status_many(std::slice::from_ref(&id.to_string()), partition, now)
    }

    /// Change a whole selection's lane, appended in display order
    pub fn set_status_many(
        &mut self,
        ids: &[String],
        partition: Partition,
        now: DateTime<Utc>,
    ) -> Result<Option<Outbound>, CoordinatorError> {
        if let Partition::Custom(custom_id) = &partition
            && self.board.custom_status(custom_id).is_none()
        {
            return Err(CoordinatorError::Board(BoardError::StatusNotFound(
                custom_id.clone(),
            )));
        }
        for id in ids {
            self.require_item(id)?;
        }
        let moving: Vec<String> = self
            .board
            .selection_ordered(ids)
            .into_iter()
            .filter(|id| {
                self.board
                    .get(id)
                    .is_some_and(|item| item.partition != partition)
            })
            .collect();
        if moving.is_empty() {
            return Ok(None);
        }
        let resolution = drag::append_to_partition(&self.board, &moving, &partition);
        let label = if moving.len() == 1 {
            "Status changed".to_string()
        } else {
            format!("Status changed on {} items", moving.len())
        };
        Ok(self.commit_resolution(resolution, &label, now))
    }

    /// Apply a resolved drag. Returns None when the resolution changes
    /// nothing (the board moved on under the drag).
    pub fn apply_drag(
        &mut self,
        resolution: DragResolution,
        now: DateTime<Utc>,
    ) -> Result<Option<Outbound>, CoordinatorError> {
        let label = if resolution
            .moved
            .iter()
            .filter_map(|id| self.board.get(id))
            .any(|item| item.partition != resolution.target_partition)
        {
            "Moved"
        } else {
            "Reordered"
        };
        Ok(self.commit_resolution(resolution, label, now))
    }

    /// Build the mutation for a set of new partition orderings, apply and
    /// emit it. Shared by drags and status changes.
    fn commit_resolution(
        &mut self,
        resolution: DragResolution,
        label: &str,
        now: DateTime<Utc>,
    ) -> Option<Outbound> {
        let mut changes = Vec::new();
        for id in &resolution.moved {
            if let Some(item) = self.board.get(id)
                && item.partition != resolution.target_partition
            {
                changes.push(ItemChange {
                    id: id.clone(),
                    deltas: vec![FieldDelta::Partition {
                        old: item.partition.clone(),
                        new: resolution.target_partition.clone(),
                    }],
                });
            }
        }
        let mut orders = Vec::new();
        for (partition, new_order) in resolution.orders {
            let old_order = self.board.partition_order(&partition);
            if old_order != new_order {
                orders.push(OrderChange {
                    partition,
                    old_order,
                    new_order,
                });
            }
        }
        if changes.is_empty() && orders.is_empty() {
            return None;
        }
        let mutation = if changes.is_empty() && orders.len() == 1 {
            let oc = orders.remove(0);
            Mutation::Reorder {
                partition: oc.partition,
                old_order: oc.old_order,
                new_order: oc.new_order,
            }
        } else {
            Mutation::Move { changes, orders }
        };
        Some(self.commit(mutation, label, true, now))
    }

    // -----------------------------------------------------------------
    // Archive lifecycle
    // -----------------------------------------------------------------

    /// Archive a selection. Items that are not Complete require
    /// `confirmed_unfinished`; otherwise the call cancels untouched.
    pub fn archive(
        &mut self,
        ids: &[String],
        opts: ArchiveOptions,
        now: DateTime<Utc>,
    ) -> Result<ArchiveOutcome, CoordinatorError> {
        for id in ids {
            self.require_item(id)?;
        }
        let unfinished = archive_ops::unfinished_ids(&self.board, ids);
        if !unfinished.is_empty() && !opts.confirmed_unfinished {
            return Ok(ArchiveOutcome::Cancelled { unfinished });
        }
        let records: Vec<ArchivedItem> = self
            .board
            .selection_ordered(ids)
            .iter()
            .filter_map(|id| self.board.get(id).cloned())
            .map(|item| {
                archive_ops::build_archive_record(item, now, opts.reason.clone(), opts.by_system)
            })
            .collect();
        let label = if records.len() == 1 {
            "Archived".to_string()
        } else {
            format!("Archived {} items", records.len())
        };
        let outbound = self.commit(Mutation::Archive { records }, &label, true, now);
        Ok(ArchiveOutcome::Applied(outbound))
    }

    /// Restore archived items to the active collection. Each returns to
    /// its snapshot's lane (Wait if that lane is gone), at the tail.
    pub fn restore(
        &mut self,
        ids: &[String],
        now: DateTime<Utc>,
    ) -> Result<Outbound, CoordinatorError> {
        let mut records: Vec<RestoreRecord> = Vec::new();
        for id in ids {
            let entry = self
                .board
                .archived_get(id)
                .ok_or_else(|| CoordinatorError::NotArchived(id.clone()))?
                .clone();
            let partition = archive_ops::resolve_restore_partition(
                &entry.snapshot.partition,
                self.board.custom_statuses(),
            );
            let already_headed = records.iter().filter(|r| r.partition == partition).count();
            let position = self.board.tail_position(&partition) + already_headed as i64;
            records.push(RestoreRecord {
                entry,
                partition,
                position,
                due_override: None,
            });
        }
        let label = if records.len() == 1 {
            "Restored".to_string()
        } else {
            format!("Restored {} items", records.len())
        };
        Ok(self.commit(Mutation::Restore { records }, &label, true, now))
    }

    /// Push an archived item's due date out by `days` and restore it in
    /// the same mutation, so it never transiently appears active with a
    /// stale overdue date.
    pub fn delay(
        &mut self,
        id: &str,
        days: i64,
        now: DateTime<Utc>,
    ) -> Result<Outbound, CoordinatorError> {
        let entry = self
            .board
            .archived_get(id)
            .ok_or_else(|| CoordinatorError::NotArchived(id.to_string()))?
            .clone();
        let due = entry
            .item
            .due_date
            .ok_or_else(|| CoordinatorError::NoDueDate(id.to_string()))?;
        let partition = archive_ops::resolve_restore_partition(
            &entry.snapshot.partition,
            self.board.custom_statuses(),
        );
        let position = self.board.tail_position(&partition);
        let record = RestoreRecord {
            entry,
            partition,
            position,
            due_override: Some(due + Duration::days(days)),
        };
        let label = format!("Delayed {} days", days);
        Ok(self.commit(
            Mutation::Restore {
                records: vec![record],
            },
            &label,
            true,
            now,
        ))
    }

    /// Permanently delete items from whichever set holds them.
    /// Not undoable; a rejected delete still rolls back locally.
    pub fn delete(
        &mut self,
        ids: &[String],
        now: DateTime<Utc>,
    ) -> Result<Outbound, CoordinatorError> {
        let mut active = Vec::new();
        let mut archived = Vec::new();
        for id in ids {
            if let Some(item) = self.board.get(id) {
                active.push(item.clone());
            } else if let Some(entry) = self.board.archived_get(id) {
                archived.push(entry.clone());
            } else {
                return Err(CoordinatorError::ItemNotFound(id.clone()));
            }
        }
        Ok(self.commit(Mutation::Delete { active, archived }, "Deleted", false, now))
    }

    // -----------------------------------------------------------------
    // Undo
    // -----------------------------------------------------------------

    /// Undo a specific action. Fails without side effects if the action
    /// expired, was already undone, or is unknown.
    pub fn undo(
        &mut self,
        action_id: u64,
        now: DateTime<Utc>,
    ) -> Result<Outbound, CoordinatorError> {
        let mutation = self.undo.claim(action_id, now)?;
        self.issue_undo(mutation)
    }

    /// Undo the most recently registered action, across all items
    pub fn undo_latest(&mut self, now: DateTime<Utc>) -> Result<Outbound, CoordinatorError> {
        let (_, mutation) = self.undo.claim_latest(now)?;
        self.issue_undo(mutation)
    }

    /// Advance the undo clock; returns toast/expiry events for display
    pub fn poll_undo(&mut self, now: DateTime<Utc>) -> Vec<UndoEvent> {
        self.undo.poll(now)
    }

    fn issue_undo(&mut self, mutation: Mutation) -> Result<Outbound, CoordinatorError> {
        // Registered actions never wrap a permanent delete
        let inverse = mutation
            .inverted()
            .ok_or(CoordinatorError::Undo(UndoError::NothingToUndo))?;
        mutation::apply_forward(&inverse, &mut self.board);
        // No new undo action: Undone is terminal. The pending entry means
        // a failed replay re-applies the original under the same
        // rollback protocol.
        Ok(self.issue(inverse, None))
    }

    // -----------------------------------------------------------------
    // Retry and settle
    // -----------------------------------------------------------------

    /// Re-issue a mutation that was rolled back after a transient
    /// failure. The rollback left the board at the mutation's old values,
    /// so it applies cleanly as a fresh optimistic mutation.
    pub fn retry(&mut self, mutation: Mutation, now: DateTime<Utc>) -> Outbound {
        let undoable = !matches!(mutation, Mutation::Delete { .. });
        self.commit(mutation, "Retried", undoable, now)
    }

    /// Report a remote outcome for an emitted ticket.
    pub fn settle(
        &mut self,
        ticket: Ticket,
        outcome: RemoteResult,
    ) -> Result<SettleOutcome, CoordinatorError> {
        let idx = self
            .pending
            .iter()
            .position(|p| p.ticket == ticket)
            .ok_or(CoordinatorError::UnknownTicket(ticket.0))?;
        let pending = self.pending.remove(idx);

        match outcome {
            Ok(ok) => {
                self.reconcile(&ok.updated);
                Ok(SettleOutcome::Confirmed)
            }
            Err(error) => {
                log::warn!("remote rejected mutation, rolling back: {}", error);
                if let Some(action_id) = pending.action_id {
                    self.undo.discard(action_id);
                }
                self.rollback(&pending.mutation, idx);
                let evicted = match &error {
                    RemoteError::NotFound(missing) => self.evict(missing),
                    _ => Vec::new(),
                };
                Ok(SettleOutcome::RolledBack {
                    error,
                    mutation: pending.mutation,
                    evicted,
                })
            }
        }
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    fn require_item(&self, id: &str) -> Result<&Item, CoordinatorError> {
        self.board
            .get(id)
            .ok_or_else(|| CoordinatorError::ItemNotFound(id.to_string()))
    }

    fn commit_update(
        &mut self,
        changes: Vec<ItemChange>,
        label: impl AsRef<str>,
        now: DateTime<Utc>,
    ) -> Outbound {
        self.commit(Mutation::Update { changes }, label.as_ref(), true, now)
    }

    /// The coordinator contract, start to finish: apply forward, register
    /// the reversible action, emit under a fresh ticket.
    fn commit(
        &mut self,
        mutation: Mutation,
        label: &str,
        undoable: bool,
        now: DateTime<Utc>,
    ) -> Outbound {
        mutation::apply_forward(&mutation, &mut self.board);
        let action_id = if undoable {
            Some(self.undo.add_action(mutation.clone(), label, now))
        } else {
            None
        };
        self.issue(mutation, action_id)
    }

    fn issue(&mut self, mutation: Mutation, action_id: Option<u64>) -> Outbound {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        let requests = mutation.to_requests();
        log::debug!(
            "issuing ticket {} with {} request(s)",
            ticket.0,
            requests.len()
        );
        self.pending.push(Pending {
            ticket,
            mutation,
            action_id,
        });
        Outbound { ticket, requests }
    }

    /// Roll a failed mutation back. Snapshots are chained, not global: a
    /// field (or ordering) with a newer in-flight mutation keeps its
    /// newest locally-applied value, and that newer mutation's rollback
    /// target is rewritten to this one's old value instead.
    fn rollback(&mut self, failed: &Mutation, newer_from: usize) {
        match failed {
            Mutation::Update { changes } => self.rollback_changes(changes, newer_from),
            Mutation::Reorder {
                partition,
                old_order,
                ..
            } => self.rollback_order(partition, old_order, newer_from),
            Mutation::Move { changes, orders } => {
                self.rollback_changes(changes, newer_from);
                for oc in orders {
                    self.rollback_order(&oc.partition, &oc.old_order, newer_from);
                }
            }
            // Set-membership mutations revert whole — items under archive
            // or delete cannot carry concurrent field edits
            other => mutation::apply_inverse(other, &mut self.board),
        }
    }

    fn rollback_changes(&mut self, changes: &[ItemChange], newer_from: usize) {
        for change in changes {
            for delta in &change.deltas {
                let mut chained = false;
                for p in self.pending[newer_from..].iter_mut() {
                    if p.mutation.chain_old_value(&change.id, delta) {
                        if let Some(action_id) = p.action_id
                            && let Some(m) = self.undo.action_mutation_mut(action_id)
                        {
                            m.chain_old_value(&change.id, delta);
                        }
                        chained = true;
                        break;
                    }
                }
                if !chained
                    && let Some(item) = self.board.get_mut(&change.id)
                {
                    delta.apply(item, false);
                }
            }
        }
    }

    fn rollback_order(&mut self, partition: &Partition, old_order: &[String], newer_from: usize) {
        let mut chained = false;
        for p in self.pending[newer_from..].iter_mut() {
            if p.mutation.chain_old_order(partition, old_order) {
                if let Some(action_id) = p.action_id
                    && let Some(m) = self.undo.action_mutation_mut(action_id)
                {
                    m.chain_old_order(partition, old_order);
                }
                chained = true;
                break;
            }
        }
        if !chained {
            self.board.replace_partition_order(partition, old_order);
        }
    }

    /// Write server-confirmed field values into the board, skipping any
    /// field a newer in-flight mutation has already overwritten locally.
    fn reconcile(&mut self, updated: &[UpdatedItem]) {
        for confirmed in updated {
            let id = &confirmed.id;
            let touched = |field: Field| {
                self.pending
                    .iter()
                    .any(|p| p.mutation.touches_field(id, field))
            };
            let skip_title = touched(Field::Title);
            let skip_partition = touched(Field::Partition);
            let skip_priority = touched(Field::Priority);
            let skip_due = touched(Field::DueDate);
            let skip_pinned = touched(Field::TodayPinned);
            let skip_tags = touched(Field::Tags);

            let Some(item) = self.board.get_mut(id) else {
                continue;
            };
            let changes = &confirmed.changes;
            if let Some(title) = &changes.title
                && !skip_title
            {
                item.title = title.clone();
            }
            if let Some(partition) = &changes.partition
                && !skip_partition
            {
                item.partition = partition.clone();
            }
            if let Some(priority) = changes.priority
                && !skip_priority
            {
                item.priority = priority;
            }
            if let Some(due_date) = changes.due_date
                && !skip_due
            {
                item.due_date = due_date;
            }
            if let Some(pinned) = changes.today_pinned
                && !skip_pinned
            {
                item.today_pinned = pinned;
            }
            if let Some(tags) = &changes.tags
                && !skip_tags
            {
                item.tags = tags.clone();
            }
        }
    }

    /// Drop an item the server no longer has, to match reality
    fn evict(&mut self, id: &str) -> Vec<String> {
        if self.board.remove(id).is_some() || self.board.archive_remove(id).is_some() {
            log::debug!("evicted {} after server reported it missing", id);
            vec![id.to_string()]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::BuiltinStatus;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn sample_coordinator() -> Coordinator {
        let mut coord = Coordinator::new(EngineConfig::default());
        for id in ["a", "b", "c"] {
            coord.seed_item(Item::new(id, id, t0())).unwrap();
        }
        coord
    }

    #[test]
    fn test_noop_field_changes_emit_nothing() {
        let mut coord = sample_coordinator();
        assert!(coord
            .set_priority("a", Priority::Medium, t0())
            .unwrap()
            .is_none());
        assert!(coord.set_due_date("a", None, t0()).unwrap().is_none());
        assert!(coord.edit_title("a", "a", t0()).unwrap().is_none());
        assert!(coord
            .set_status("a", Partition::Builtin(BuiltinStatus::Wait), t0())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_unknown_item_is_rejected() {
        let mut coord = sample_coordinator();
        assert!(matches!(
            coord.set_priority("ghost", Priority::High, t0()),
            Err(CoordinatorError::ItemNotFound(_))
        ));
    }

    #[test]
    fn test_status_change_to_unknown_custom_lane_is_rejected() {
        let mut coord = sample_coordinator();
        let err = coord
            .set_status("a", Partition::Custom("cs-ghost".into()), t0())
            .unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::Board(BoardError::StatusNotFound(_))
        ));
    }

    #[test]
    fn test_settle_unknown_ticket_is_rejected() {
        let mut coord = sample_coordinator();
        let err = coord
            .settle(Ticket(99), Ok(Default::default()))
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::UnknownTicket(99)));
    }

    #[test]
    fn test_tickets_are_monotonic() {
        let mut coord = sample_coordinator();
        let first = coord
            .set_priority("a", Priority::High, t0())
            .unwrap()
            .unwrap();
        let second = coord
            .set_priority("b", Priority::Low, t0())
            .unwrap()
            .unwrap();
        assert!(second.ticket > first.ticket);
        assert!(coord.has_pending(first.ticket));
        assert!(coord.has_pending(second.ticket));
    }

    #[test]
    fn test_batch_with_nothing_to_change_emits_nothing() {
        let mut coord = sample_coordinator();
        let ids: Vec<String> = vec!["a".into(), "b".into()];
        assert!(coord
            .set_priority_many(&ids, Priority::Medium, t0())
            .unwrap()
            .is_none());
    }
}
