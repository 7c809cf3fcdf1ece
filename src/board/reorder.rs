//! Drag-and-drop reordering over a [`BoardLayout`].
//!
//! A drag is a splice: the card is removed from the source column at the
//! source index and inserted into the destination column at the destination
//! index. Positions are implicit in vector order, so every column stays
//! dense after a move.

use std::collections::HashSet;

use crate::errors::BoardError;

use super::models::{BoardLayout, DragResult};

/// Apply a drag gesture to `layout`.
///
/// Returns `Ok(false)` when nothing changed (dropped outside a column, or
/// dropped back onto its own slot). Fails with [`BoardError::StaleDrag`] when
/// the source slot does not hold the dragged task.
pub fn apply_drag(layout: &mut BoardLayout, drag: &DragResult) -> Result<bool, BoardError> {
    let Some(destination) = drag.destination else {
        return Ok(false);
    };

    let stale = BoardError::StaleDrag {
        task_id: drag.draggable_id,
    };
    let Some(source_items) = layout.columns.get_mut(&drag.source.droppable_id) else {
        return Err(stale);
    };
    if source_items.get(drag.source.index) != Some(&drag.draggable_id) {
        return Err(stale);
    }
    if destination == drag.source {
        return Ok(false);
    }

    let removed = source_items.remove(drag.source.index);
    let dest_items = layout.columns.entry(destination.droppable_id).or_default();
    let at = destination.index.min(dest_items.len());
    dest_items.insert(at, removed);
    Ok(true)
}

/// Check that `proposed` places exactly the tasks of `current`, each once.
pub fn validate_layout(current: &BoardLayout, proposed: &BoardLayout) -> Result<(), BoardError> {
    let known: HashSet<i64> = current.placements().map(|(id, _, _)| id).collect();
    let mut seen = HashSet::with_capacity(known.len());

    for (id, _, _) in proposed.placements() {
        if !known.contains(&id) {
            return Err(BoardError::LayoutMismatch(format!(
                "task {} does not belong to this project",
                id
            )));
        }
        if !seen.insert(id) {
            return Err(BoardError::LayoutMismatch(format!(
                "task {} appears more than once",
                id
            )));
        }
    }

    let mut missing: Vec<i64> = known.difference(&seen).copied().collect();
    missing.sort_unstable();
    if let Some(id) = missing.first() {
        return Err(BoardError::LayoutMismatch(format!(
            "task {} is missing from the layout",
            id
        )));
    }
    Ok(())
}
