use chrono::{DateTime, NaiveDate, Utc};

use crate::model::archive::ArchivedItem;
use crate::model::board::Board;
use crate::model::item::{Item, Priority};
use crate::model::partition::Partition;
use crate::remote::api::{FieldChanges, RemoteRequest};

/// Field identity, used to detect conflicts between in-flight mutations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Partition,
    Priority,
    DueDate,
    TodayPinned,
    Tags,
}

/// One field's old and new value on one item
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDelta {
    Title {
        old: String,
        new: String,
    },
    Partition {
        old: Partition,
        new: Partition,
    },
    Priority {
        old: Priority,
        new: Priority,
    },
    DueDate {
        old: Option<DateTime<Utc>>,
        new: Option<DateTime<Utc>>,
    },
    TodayPinned {
        old: Option<NaiveDate>,
        new: Option<NaiveDate>,
    },
    Tags {
        old: Vec<String>,
        new: Vec<String>,
    },
}

impl FieldDelta {
    pub fn field(&self) -> Field {
        match self {
            FieldDelta::Title { .. } => Field::Title,
            FieldDelta::Partition { .. } => Field::Partition,
            FieldDelta::Priority { .. } => Field::Priority,
            FieldDelta::DueDate { .. } => Field::DueDate,
            FieldDelta::TodayPinned { .. } => Field::TodayPinned,
            FieldDelta::Tags { .. } => Field::Tags,
        }
    }

    /// Swap old and new
    pub fn inverted(&self) -> FieldDelta {
        match self.clone() {
            FieldDelta::Title { old, new } => FieldDelta::Title { old: new, new: old },
            FieldDelta::Partition { old, new } => FieldDelta::Partition { old: new, new: old },
            FieldDelta::Priority { old, new } => FieldDelta::Priority { old: new, new: old },
            FieldDelta::DueDate { old, new } => FieldDelta::DueDate { old: new, new: old },
            FieldDelta::TodayPinned { old, new } => {
                FieldDelta::TodayPinned { old: new, new: old }
            }
            FieldDelta::Tags { old, new } => FieldDelta::Tags { old: new, new: old },
        }
    }

    /// Adopt another delta's old value as this delta's rollback target.
    /// Used when an earlier in-flight mutation on the same field fails:
    /// its old value becomes the chained target for this one.
    pub fn set_old_from(&mut self, other: &FieldDelta) {
        match (self, other) {
            (FieldDelta::Title { old, .. }, FieldDelta::Title { old: o, .. }) => {
                *old = o.clone();
            }
            (FieldDelta::Partition { old, .. }, FieldDelta::Partition { old: o, .. }) => {
                *old = o.clone();
            }
            (FieldDelta::Priority { old, .. }, FieldDelta::Priority { old: o, .. }) => {
                *old = *o;
            }
            (FieldDelta::DueDate { old, .. }, FieldDelta::DueDate { old: o, .. }) => {
                *old = *o;
            }
            (FieldDelta::TodayPinned { old, .. }, FieldDelta::TodayPinned { old: o, .. }) => {
                *old = *o;
            }
            (FieldDelta::Tags { old, .. }, FieldDelta::Tags { old: o, .. }) => {
                *old = o.clone();
            }
            _ => {}
        }
    }

    /// Write one side of the delta into the item
    pub fn apply(&self, item: &mut Item, forward: bool) {
        match self {
            FieldDelta::Title { old, new } => {
                item.title = if forward { new.clone() } else { old.clone() };
            }
            FieldDelta::Partition { old, new } => {
                item.partition = if forward { new.clone() } else { old.clone() };
            }
            FieldDelta::Priority { old, new } => {
                item.priority = if forward { *new } else { *old };
            }
            FieldDelta::DueDate { old, new } => {
                item.due_date = if forward { *new } else { *old };
            }
            FieldDelta::TodayPinned { old, new } => {
                item.today_pinned = if forward { *new } else { *old };
            }
            FieldDelta::Tags { old, new } => {
                item.tags = if forward { new.clone() } else { old.clone() };
            }
        }
    }
}

/// Old and new values for one item within a mutation
#[derive(Debug, Clone, PartialEq)]
pub struct ItemChange {
    pub id: String,
    pub deltas: Vec<FieldDelta>,
}

/// Old and new ordering for one partition
#[derive(Debug, Clone, PartialEq)]
pub struct OrderChange {
    pub partition: Partition,
    pub old_order: Vec<String>,
    pub new_order: Vec<String>,
}

/// Where and how an archived item re-enters the active set
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreRecord {
    /// The archive record being dissolved; kept whole so the inverse
    /// reproduces it verbatim
    pub entry: ArchivedItem,
    /// Lane the item returns to (snapshot lane, Wait fallback)
    pub partition: Partition,
    /// Position assigned in that lane
    pub position: i64,
    /// Due-date rewrite applied in the same mutation (delay), so the item
    /// never transiently appears active with a stale overdue date
    pub due_override: Option<DateTime<Utc>>,
}

/// A reversible state change carrying enough old/new data to apply in
/// either direction. Every mutation path in the engine produces one of
/// these; the coordinator applies it, the undo manager stores it.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Field-level value changes on one or more items
    Update { changes: Vec<ItemChange> },
    /// Full reordering of a single partition
    Reorder {
        partition: Partition,
        old_order: Vec<String>,
        new_order: Vec<String>,
    },
    /// A move between partitions: partition deltas for the moved items
    /// plus the orderings of every touched partition
    Move {
        changes: Vec<ItemChange>,
        orders: Vec<OrderChange>,
    },
    /// Items moved from the active set into the archive
    Archive { records: Vec<ArchivedItem> },
    /// Archived items returned to the active set
    Restore { records: Vec<RestoreRecord> },
    /// Permanent removal from whichever set holds each item.
    /// Never registered with the undo manager; the records exist so a
    /// rejected delete can roll back.
    Delete {
        active: Vec<Item>,
        archived: Vec<ArchivedItem>,
    },
}

impl Mutation {
    /// IDs whose state this mutation touches
    pub fn affected_ids(&self) -> Vec<String> {
        match self {
            Mutation::Update { changes } | Mutation::Move { changes, .. } => {
                changes.iter().map(|c| c.id.clone()).collect()
            }
            Mutation::Reorder { new_order, .. } => new_order.clone(),
            Mutation::Archive { records } => {
                records.iter().map(|r| r.item.id.clone()).collect()
            }
            Mutation::Restore { records } => {
                records.iter().map(|r| r.entry.item.id.clone()).collect()
            }
            Mutation::Delete { active, archived } => active
                .iter()
                .map(|i| i.id.clone())
                .chain(archived.iter().map(|e| e.item.id.clone()))
                .collect(),
        }
    }

    /// The mutation that exactly reverses this one, or None for a
    /// permanent delete.
    pub fn inverted(&self) -> Option<Mutation> {
        match self {
            Mutation::Update { changes } => Some(Mutation::Update {
                changes: invert_changes(changes),
            }),
            Mutation::Reorder {
                partition,
                old_order,
                new_order,
            } => Some(Mutation::Reorder {
                partition: partition.clone(),
                old_order: new_order.clone(),
                new_order: old_order.clone(),
            }),
            Mutation::Move { changes, orders } => Some(Mutation::Move {
                changes: invert_changes(changes),
                orders: orders
                    .iter()
                    .map(|oc| OrderChange {
                        partition: oc.partition.clone(),
                        old_order: oc.new_order.clone(),
                        new_order: oc.old_order.clone(),
                    })
                    .collect(),
            }),
            Mutation::Archive { records } => Some(Mutation::Restore {
                records: records
                    .iter()
                    .map(|r| RestoreRecord {
                        partition: r.item.partition.clone(),
                        position: r.item.position,
                        due_override: None,
                        entry: r.clone(),
                    })
                    .collect(),
            }),
            Mutation::Restore { records } => Some(Mutation::Archive {
                records: records.iter().map(|rr| rr.entry.clone()).collect(),
            }),
            Mutation::Delete { .. } => None,
        }
    }

    /// Rewrite this mutation's rollback target for (id, field) after an
    /// earlier in-flight mutation on the same field was rolled back.
    /// Returns true when a matching delta was chained.
    pub fn chain_old_value(&mut self, id: &str, failed: &FieldDelta) -> bool {
        match self {
            Mutation::Update { changes } | Mutation::Move { changes, .. } => {
                for change in changes {
                    if change.id == id {
                        for delta in &mut change.deltas {
                            if delta.field() == failed.field() {
                                delta.set_old_from(failed);
                                return true;
                            }
                        }
                    }
                }
                false
            }
            _ => false,
        }
    }

    /// Whether this mutation carries a field delta on (id, field)
    pub fn touches_field(&self, id: &str, field: Field) -> bool {
        match self {
            Mutation::Update { changes } | Mutation::Move { changes, .. } => changes
                .iter()
                .any(|c| c.id == id && c.deltas.iter().any(|d| d.field() == field)),
            _ => false,
        }
    }

    /// Same chaining, for a partition ordering
    pub fn chain_old_order(&mut self, partition: &Partition, old_order: &[String]) -> bool {
        match self {
            Mutation::Reorder {
                partition: p,
                old_order: o,
                ..
            } if p == partition => {
                *o = old_order.to_vec();
                true
            }
            Mutation::Move { orders, .. } => {
                for oc in orders {
                    if oc.partition == *partition {
                        oc.old_order = old_order.to_vec();
                        return true;
                    }
                }
                false
            }
            _ => false,
        }
    }

    /// The remote call(s) persisting this mutation, in issue order.
    /// Settled all-or-nothing under a single ticket.
    pub fn to_requests(&self) -> Vec<RemoteRequest> {
        match self {
            Mutation::Update { changes } => update_requests(changes),
            Mutation::Reorder {
                partition,
                new_order,
                ..
            } => vec![RemoteRequest::Reorder {
                partition: partition.clone(),
                ordered_ids: new_order.clone(),
            }],
            Mutation::Move { changes, orders } => {
                let mut requests = update_requests(changes);
                for oc in orders {
                    requests.push(RemoteRequest::Reorder {
                        partition: oc.partition.clone(),
                        ordered_ids: oc.new_order.clone(),
                    });
                }
                requests
            }
            Mutation::Archive { records } => vec![RemoteRequest::Archive {
                ids: records.iter().map(|r| r.item.id.clone()).collect(),
                reason: records.first().and_then(|r| r.reason.clone()),
            }],
            Mutation::Restore { records } => {
                let mut requests = vec![RemoteRequest::Unarchive {
                    ids: records.iter().map(|r| r.entry.item.id.clone()).collect(),
                }];
                for rr in records {
                    if let Some(due) = rr.due_override {
                        requests.push(RemoteRequest::SingleUpdate {
                            id: rr.entry.item.id.clone(),
                            changes: FieldChanges {
                                due_date: Some(Some(due)),
                                ..Default::default()
                            },
                        });
                    }
                }
                requests
            }
            Mutation::Delete { active, archived } => vec![RemoteRequest::Delete {
                ids: active
                    .iter()
                    .map(|i| i.id.clone())
                    .chain(archived.iter().map(|e| e.item.id.clone()))
                    .collect(),
            }],
        }
    }
}

fn invert_changes(changes: &[ItemChange]) -> Vec<ItemChange> {
    changes
        .iter()
        .map(|c| ItemChange {
            id: c.id.clone(),
            deltas: c.deltas.iter().map(|d| d.inverted()).collect(),
        })
        .collect()
}

/// The new-side field changes for one item change
pub fn delta_changes(deltas: &[FieldDelta]) -> FieldChanges {
    let mut changes = FieldChanges::default();
    for delta in deltas {
        match delta {
            FieldDelta::Title { new, .. } => changes.title = Some(new.clone()),
            FieldDelta::Partition { new, .. } => changes.partition = Some(new.clone()),
            FieldDelta::Priority { new, .. } => changes.priority = Some(*new),
            FieldDelta::DueDate { new, .. } => changes.due_date = Some(*new),
            FieldDelta::TodayPinned { new, .. } => changes.today_pinned = Some(*new),
            FieldDelta::Tags { new, .. } => changes.tags = Some(new.clone()),
        }
    }
    changes
}

/// Update calls for a set of item changes: items sharing identical field
/// changes batch into one call, the rest go out as single updates.
fn update_requests(changes: &[ItemChange]) -> Vec<RemoteRequest> {
    let mut groups: Vec<(FieldChanges, Vec<String>)> = Vec::new();
    for change in changes {
        let fc = delta_changes(&change.deltas);
        match groups.iter_mut().find(|(g, _)| *g == fc) {
            Some((_, ids)) => ids.push(change.id.clone()),
            None => groups.push((fc, vec![change.id.clone()])),
        }
    }
    groups
        .into_iter()
        .map(|(changes, mut ids)| {
            if ids.len() == 1 {
                RemoteRequest::SingleUpdate {
                    id: ids.swap_remove(0),
                    changes,
                }
            } else {
                RemoteRequest::BatchUpdate { ids, changes }
            }
        })
        .collect()
}

/// Apply a mutation to the board. Items that vanished in the meantime
/// (e.g. evicted after a NotFound) are skipped.
pub fn apply_forward(mutation: &Mutation, board: &mut Board) {
    apply(mutation, board, true);
}

/// Apply the exact reverse of a mutation to the board
pub fn apply_inverse(mutation: &Mutation, board: &mut Board) {
    apply(mutation, board, false);
}

fn apply(mutation: &Mutation, board: &mut Board, forward: bool) {
    match mutation {
        Mutation::Update { changes } => apply_item_changes(changes, board, forward),
        Mutation::Reorder {
            partition,
            old_order,
            new_order,
        } => {
            let order = if forward { new_order } else { old_order };
            board.replace_partition_order(partition, order);
        }
        Mutation::Move { changes, orders } => {
            apply_item_changes(changes, board, forward);
            for oc in orders {
                let order = if forward { &oc.new_order } else { &oc.old_order };
                board.replace_partition_order(&oc.partition, order);
            }
        }
        Mutation::Archive { records } => {
            for record in records {
                if forward {
                    // Guard: an item deleted in the meantime stays gone
                    if board.remove(&record.item.id).is_some() {
                        board.archive_insert(record.clone());
                    } else {
                        log::warn!("archive target no longer active: {}", record.item.id);
                    }
                } else if board.archive_remove(&record.item.id).is_some() {
                    board.reinsert(record.item.clone());
                } else {
                    log::warn!("archive record already gone: {}", record.item.id);
                }
            }
        }
        Mutation::Restore { records } => {
            for rr in records {
                if forward {
                    if board.archive_remove(&rr.entry.item.id).is_none() {
                        log::warn!("restore target no longer archived: {}", rr.entry.item.id);
                        continue;
                    }
                    let mut item = rr.entry.item.clone();
                    item.partition = rr.partition.clone();
                    item.position = rr.position;
                    if let Some(due) = rr.due_override {
                        item.due_date = Some(due);
                    }
                    board.reinsert(item);
                } else if board.remove(&rr.entry.item.id).is_some() {
                    board.archive_insert(rr.entry.clone());
                }
            }
        }
        Mutation::Delete { active, archived } => {
            if forward {
                for item in active {
                    board.remove(&item.id);
                }
                for entry in archived {
                    board.archive_remove(&entry.item.id);
                }
            } else {
                for item in active {
                    board.reinsert(item.clone());
                }
                for entry in archived {
                    board.archive_insert(entry.clone());
                }
            }
        }
    }
}

fn apply_item_changes(changes: &[ItemChange], board: &mut Board, forward: bool) {
    for change in changes {
        match board.get_mut(&change.id) {
            Some(item) => {
                for delta in &change.deltas {
                    delta.apply(item, forward);
                }
            }
            None => log::warn!("mutation target missing from board: {}", change.id),
        }
    }
}
