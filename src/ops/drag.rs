use crate::model::board::Board;
use crate::model::partition::Partition;

/// Error type for drag resolution
#[derive(Debug, thiserror::Error)]
pub enum DragError {
    #[error("dragged item not found: {0}")]
    UnknownItem(String),
}

/// What the pointer is over when the drag is released
#[derive(Debug, Clone, PartialEq)]
pub enum DropTarget {
    /// A partition header
    Header(Partition),
    /// Another item
    Item(String),
}

/// A candidate the collision pass found overlapping the pointer.
/// Geometry is abstracted down to the pointer-to-center distance.
#[derive(Debug, Clone, PartialEq)]
pub struct DropCandidate {
    pub target: DropTarget,
    pub center_distance: f64,
}

/// The resolved outcome of a drop: the partition the drag lands in and
/// the full ordered ID list for every partition the drag touched.
/// Source and target coincide for an intra-partition move.
#[derive(Debug, Clone, PartialEq)]
pub struct DragResolution {
    pub target_partition: Partition,
    pub orders: Vec<(Partition, Vec<String>)>,
    /// The co-drag set in the order it was applied
    pub moved: Vec<String>,
}

/// Choose the drop target when several candidates overlap the pointer.
///
/// Items in a different partition than the dragged item's take priority
/// over headers; same-partition headers are filtered out entirely during
/// a multi-item drag so a sloppy multi-select reorder cannot flip
/// statuses; otherwise the nearest-center candidate wins.
pub fn pick_drop_target(
    board: &Board,
    dragged_id: &str,
    multi: bool,
    candidates: &[DropCandidate],
) -> Option<DropTarget> {
    let dragged_partition = board.get(dragged_id)?.partition.clone();

    let eligible: Vec<&DropCandidate> = candidates
        .iter()
        .filter(|c| {
            !(multi && matches!(&c.target, DropTarget::Header(p) if *p == dragged_partition))
        })
        .collect();

    let differing_partition = |c: &&DropCandidate| match &c.target {
        DropTarget::Item(id) => board
            .get(id)
            .is_some_and(|item| item.partition != dragged_partition),
        DropTarget::Header(p) => *p != dragged_partition,
    };

    let nearest = |cands: Vec<&DropCandidate>| {
        cands
            .into_iter()
            .min_by(|a, b| a.center_distance.total_cmp(&b.center_distance))
            .map(|c| c.target.clone())
    };

    let items: Vec<&DropCandidate> = eligible
        .iter()
        .copied()
        .filter(|c| matches!(c.target, DropTarget::Item(_)))
        .filter(differing_partition)
        .collect();
    if !items.is_empty() {
        return nearest(items);
    }

    let headers: Vec<&DropCandidate> = eligible
        .iter()
        .copied()
        .filter(|c| matches!(c.target, DropTarget::Header(_)))
        .filter(differing_partition)
        .collect();
    if !headers.is_empty() {
        return nearest(headers);
    }

    nearest(eligible)
}

/// Resolve a drag session against the current board state.
///
/// Returns `Ok(None)` for the no-op gestures: dropping on the current
/// partition's own header, dropping a selection onto one of its own
/// members, or a move that changes nothing.
pub fn resolve_drop(
    board: &Board,
    dragged_id: &str,
    selection: &[String],
    target: &DropTarget,
) -> Result<Option<DragResolution>, DragError> {
    let dragged = board
        .get(dragged_id)
        .ok_or_else(|| DragError::UnknownItem(dragged_id.to_string()))?;
    let source_partition = dragged.partition.clone();

    // The co-drag set: the pre-existing multi-selection when the dragged
    // item belongs to it, otherwise just the dragged item.
    let co_drag: Vec<String> = if selection.iter().any(|id| id == dragged_id) {
        let ordered = board.selection_ordered(selection);
        if ordered.is_empty() {
            vec![dragged_id.to_string()]
        } else {
            ordered
        }
    } else {
        vec![dragged_id.to_string()]
    };

    match target {
        DropTarget::Header(partition) => {
            // Dropping on the current partition's own header carries no
            // ordering signal; for a multi-drag it would only risk an
            // accidental status flip.
            if *partition == source_partition {
                return Ok(None);
            }
            Ok(Some(append_to_partition(board, &co_drag, partition)))
        }
        DropTarget::Item(target_id) => {
            if co_drag.iter().any(|id| id == target_id) {
                // Dropping a selection onto one of its own members,
                // including an item onto itself
                return Ok(None);
            }
            let target_item = board
                .get(target_id)
                .ok_or_else(|| DragError::UnknownItem(target_id.to_string()))?;
            let target_partition = target_item.partition.clone();

            if co_drag.len() == 1 {
                if target_partition == source_partition {
                    Ok(single_move_within(
                        board,
                        dragged_id,
                        target_id,
                        &source_partition,
                    ))
                } else {
                    Ok(Some(single_move_across(
                        board,
                        dragged_id,
                        target_id,
                        &source_partition,
                        &target_partition,
                    )))
                }
            } else {
                let all_in_target = co_drag
                    .iter()
                    .all(|id| board.get(id).is_some_and(|i| i.partition == target_partition));
                if all_in_target {
                    Ok(splice_within(
                        board,
                        dragged_id,
                        &co_drag,
                        target_id,
                        &target_partition,
                    ))
                } else {
                    // A selection spanning partitions, or one entirely in
                    // another partition, is appended to the target
                    Ok(Some(append_to_partition(board, &co_drag, &target_partition)))
                }
            }
        }
    }
}

/// Append the co-drag set to the tail of a partition in its existing
/// relative order, removing each member from the partition it leaves.
/// Also the shape of a plain status change, which lands at the tail.
pub(crate) fn append_to_partition(
    board: &Board,
    co_drag: &[String],
    target: &Partition,
) -> DragResolution {
    let mut target_order: Vec<String> = board
        .partition_order(target)
        .into_iter()
        .filter(|id| !co_drag.contains(id))
        .collect();
    target_order.extend(co_drag.iter().cloned());

    let mut orders: Vec<(Partition, Vec<String>)> = Vec::new();
    for id in co_drag {
        if let Some(item) = board.get(id)
            && item.partition != *target
            && !orders.iter().any(|(p, _)| *p == item.partition)
        {
            let source_order: Vec<String> = board
                .partition_order(&item.partition)
                .into_iter()
                .filter(|other| !co_drag.contains(other))
                .collect();
            orders.push((item.partition.clone(), source_order));
        }
    }
    orders.push((target.clone(), target_order));

    DragResolution {
        target_partition: target.clone(),
        orders,
        moved: co_drag.to_vec(),
    }
}

/// Standard single-item index move: remove the dragged item and insert it
/// at the target item's index, which lands after the target on a forward
/// drag and before it on a backward drag.
fn single_move_within(
    board: &Board,
    dragged_id: &str,
    target_id: &str,
    partition: &Partition,
) -> Option<DragResolution> {
    let mut order = board.partition_order(partition);
    let from = order.iter().position(|id| id == dragged_id)?;
    let to = order.iter().position(|id| id == target_id)?;
    if from == to {
        return None;
    }
    order.remove(from);
    let idx = to.min(order.len());
    order.insert(idx, dragged_id.to_string());

    Some(DragResolution {
        target_partition: partition.clone(),
        orders: vec![(partition.clone(), order)],
        moved: vec![dragged_id.to_string()],
    })
}

/// Single item dropped onto an item in another partition: inserted at the
/// target item's index there.
fn single_move_across(
    board: &Board,
    dragged_id: &str,
    target_id: &str,
    source: &Partition,
    target: &Partition,
) -> DragResolution {
    let source_order: Vec<String> = board
        .partition_order(source)
        .into_iter()
        .filter(|id| id != dragged_id)
        .collect();

    let mut target_order = board.partition_order(target);
    let idx = target_order
        .iter()
        .position(|id| id == target_id)
        .unwrap_or(target_order.len());
    target_order.insert(idx, dragged_id.to_string());

    DragResolution {
        target_partition: target.clone(),
        orders: vec![
            (source.clone(), source_order),
            (target.clone(), target_order),
        ],
        moved: vec![dragged_id.to_string()],
    }
}

/// Multi-item drop within one partition: split the sequence into selected
/// and non-selected sublists preserving relative order, then splice the
/// selected block back in. Forward drags insert after the target's
/// position among non-selected items, backward drags before it.
fn splice_within(
    board: &Board,
    dragged_id: &str,
    co_drag: &[String],
    target_id: &str,
    partition: &Partition,
) -> Option<DragResolution> {
    let seq = board.partition_order(partition);
    let selected: Vec<String> = seq
        .iter()
        .filter(|id| co_drag.contains(id))
        .cloned()
        .collect();
    let non_selected: Vec<String> = seq
        .iter()
        .filter(|id| !co_drag.contains(id))
        .cloned()
        .collect();

    let dragged_pos = seq.iter().position(|id| id == dragged_id)?;
    let target_pos = seq.iter().position(|id| id == target_id)?;
    let target_non_pos = non_selected.iter().position(|id| id == target_id)?;

    let forward = dragged_pos < target_pos;
    let insert_at = if forward {
        target_non_pos + 1
    } else {
        target_non_pos
    };

    let mut new_order = non_selected;
    for (offset, id) in selected.iter().enumerate() {
        new_order.insert(insert_at + offset, id.clone());
    }

    if new_order == seq {
        return None;
    }
    Some(DragResolution {
        target_partition: partition.clone(),
        orders: vec![(partition.clone(), new_order)],
        moved: selected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::{BuiltinStatus, Item};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn wait() -> Partition {
        Partition::Builtin(BuiltinStatus::Wait)
    }

    fn complete() -> Partition {
        Partition::Builtin(BuiltinStatus::Complete)
    }

    fn board_with(wait_ids: &[&str], complete_ids: &[&str]) -> Board {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let mut board = Board::new();
        for id in wait_ids {
            board.insert(Item::new(*id, *id, now)).unwrap();
        }
        for id in complete_ids {
            let mut item = Item::new(*id, *id, now);
            item.partition = complete();
            board.insert(item).unwrap();
        }
        board
    }

    fn owned(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_drop_on_own_header_is_noop() {
        let board = board_with(&["a", "b"], &[]);
        let res = resolve_drop(&board, "a", &[], &DropTarget::Header(wait())).unwrap();
        assert!(res.is_none());
    }

    #[test]
    fn test_single_drop_on_other_header_appends() {
        let board = board_with(&["a", "b"], &["z"]);
        let res = resolve_drop(&board, "a", &[], &DropTarget::Header(complete()))
            .unwrap()
            .unwrap();
        assert_eq!(res.target_partition, complete());
        assert_eq!(
            res.orders,
            vec![
                (wait(), owned(&["b"])),
                (complete(), owned(&["z", "a"])),
            ]
        );
    }

    #[test]
    fn test_single_forward_move_lands_after_target() {
        let board = board_with(&["a", "b", "c", "d"], &[]);
        let res = resolve_drop(&board, "a", &[], &DropTarget::Item("c".into()))
            .unwrap()
            .unwrap();
        assert_eq!(res.orders, vec![(wait(), owned(&["b", "c", "a", "d"]))]);
    }

    #[test]
    fn test_single_backward_move_lands_before_target() {
        let board = board_with(&["a", "b", "c", "d"], &[]);
        let res = resolve_drop(&board, "d", &[], &DropTarget::Item("b".into()))
            .unwrap()
            .unwrap();
        assert_eq!(res.orders, vec![(wait(), owned(&["a", "d", "b", "c"]))]);
    }

    #[test]
    fn test_drop_on_self_is_noop() {
        let board = board_with(&["a", "b"], &[]);
        let res = resolve_drop(&board, "a", &[], &DropTarget::Item("a".into())).unwrap();
        assert!(res.is_none());
    }

    #[test]
    fn test_multi_drop_on_own_header_is_noop() {
        let board = board_with(&["a", "b", "c"], &[]);
        let selection = owned(&["a", "b"]);
        let res = resolve_drop(&board, "a", &selection, &DropTarget::Header(wait())).unwrap();
        assert!(res.is_none());
    }

    #[test]
    fn test_multi_forward_splice_after_target() {
        // [a, x, b, y, c] dragging {x, y} onto c
        let board = board_with(&["a", "x", "b", "y", "c"], &[]);
        let selection = owned(&["x", "y"]);
        let res = resolve_drop(&board, "x", &selection, &DropTarget::Item("c".into()))
            .unwrap()
            .unwrap();
        assert_eq!(res.orders, vec![(wait(), owned(&["a", "b", "c", "x", "y"]))]);
        assert_eq!(res.moved, owned(&["x", "y"]));
    }

    #[test]
    fn test_multi_backward_splice_before_target() {
        let board = board_with(&["a", "x", "b", "y", "c"], &[]);
        let selection = owned(&["x", "y"]);
        let res = resolve_drop(&board, "y", &selection, &DropTarget::Item("a".into()))
            .unwrap()
            .unwrap();
        assert_eq!(res.orders, vec![(wait(), owned(&["x", "y", "a", "b", "c"]))]);
    }

    #[test]
    fn test_multi_drop_on_own_member_is_noop() {
        let board = board_with(&["a", "x", "y", "b"], &[]);
        let selection = owned(&["x", "y"]);
        let res = resolve_drop(&board, "x", &selection, &DropTarget::Item("y".into())).unwrap();
        assert!(res.is_none());
    }

    #[test]
    fn test_selection_not_containing_dragged_collapses_to_single() {
        let board = board_with(&["a", "b", "c", "d"], &[]);
        // b and c are selected, but the drag started on a
        let selection = owned(&["b", "c"]);
        let res = resolve_drop(&board, "a", &selection, &DropTarget::Item("d".into()))
            .unwrap()
            .unwrap();
        assert_eq!(res.moved, owned(&["a"]));
        assert_eq!(res.orders, vec![(wait(), owned(&["b", "c", "d", "a"]))]);
    }

    #[test]
    fn test_pick_prefers_differing_partition_item_over_header() {
        let board = board_with(&["a", "b"], &["z"]);
        let candidates = vec![
            DropCandidate {
                target: DropTarget::Header(complete()),
                center_distance: 1.0,
            },
            DropCandidate {
                target: DropTarget::Item("z".into()),
                center_distance: 9.0,
            },
        ];
        let picked = pick_drop_target(&board, "a", false, &candidates).unwrap();
        assert_eq!(picked, DropTarget::Item("z".into()));
    }

    #[test]
    fn test_pick_filters_same_partition_header_during_multi_drag() {
        let board = board_with(&["a", "b"], &[]);
        let candidates = vec![
            DropCandidate {
                target: DropTarget::Header(wait()),
                center_distance: 0.5,
            },
            DropCandidate {
                target: DropTarget::Item("b".into()),
                center_distance: 4.0,
            },
        ];
        let picked = pick_drop_target(&board, "a", true, &candidates).unwrap();
        assert_eq!(picked, DropTarget::Item("b".into()));

        // The same gesture during a single drag may still hit the header
        let picked = pick_drop_target(&board, "a", false, &candidates).unwrap();
        assert_eq!(picked, DropTarget::Header(wait()));
    }

    #[test]
    fn test_pick_falls_back_to_nearest_center() {
        let board = board_with(&["a", "b", "c"], &[]);
        let candidates = vec![
            DropCandidate {
                target: DropTarget::Item("b".into()),
                center_distance: 3.0,
            },
            DropCandidate {
                target: DropTarget::Item("c".into()),
                center_distance: 2.0,
            },
        ];
        let picked = pick_drop_target(&board, "a", false, &candidates).unwrap();
        assert_eq!(picked, DropTarget::Item("c".into()));
    }
}
