//! Pure, stateless rules over a task list: which task to act on next, how
//! to partition for display, and how to apply an explicit reorder. None of
//! these touch storage; callers persist when the canonical order changes.

use crate::errors::{AppError, AppResult};
use crate::models::TaskRecord;

/// The task the user should act on next: the first pinned-and-incomplete
/// task in list order, else the first incomplete one, else none. A pinned
/// incomplete task wins regardless of where it sits in the list.
pub fn current_task_index(tasks: &[TaskRecord]) -> Option<usize> {
    tasks
        .iter()
        .position(|task| task.pinned && !task.done)
        .or_else(|| tasks.iter().position(|task| !task.done))
}

/// Stable partition for presentation: pinned indices first, then the rest,
/// relative order preserved on both sides. The canonical stored order is
/// untouched. Tolerates lists with more than one pinned entry.
pub fn display_order(tasks: &[TaskRecord]) -> Vec<usize> {
    let pinned = (0..tasks.len()).filter(|&index| tasks[index].pinned);
    let others = (0..tasks.len()).filter(|&index| !tasks[index].pinned);
    pinned.chain(others).collect()
}

/// Applies an explicit permutation (e.g. from a drag-and-drop reorder) and
/// returns the physically reordered list. Unlike `display_order` this is the
/// new canonical order and must be persisted by the caller.
pub fn reorder(tasks: &[TaskRecord], order: &[usize]) -> AppResult<Vec<TaskRecord>> {
    if order.len() != tasks.len() {
        return Err(AppError::Validation(format!(
            "reorder expects {} indices, got {}",
            tasks.len(),
            order.len()
        )));
    }

    let mut seen = vec![false; tasks.len()];
    for &index in order {
        if index >= tasks.len() {
            return Err(AppError::Validation(format!("reorder index {} out of range", index)));
        }
        if seen[index] {
            return Err(AppError::Validation(format!("reorder index {} repeated", index)));
        }
        seen[index] = true;
    }

    Ok(order.iter().map(|&index| tasks[index].clone()).collect())
}

/// Single-field flip. Deliberately no cascade: flipping one task's pin does
/// not unpin any other, even though that can leave more than one pinned.
pub fn toggle_done(tasks: &[TaskRecord], index: usize) -> AppResult<Vec<TaskRecord>> {
    let mut next = tasks.to_vec();
    let task = next
        .get_mut(index)
        .ok_or_else(|| AppError::Validation(format!("task index {} out of range", index)))?;
    task.done = !task.done;
    Ok(next)
}

/// Single-field flip, same no-cascade rule as `toggle_done`.
pub fn toggle_pinned(tasks: &[TaskRecord], index: usize) -> AppResult<Vec<TaskRecord>> {
    let mut next = tasks.to_vec();
    let task = next
        .get_mut(index)
        .ok_or_else(|| AppError::Validation(format!("task index {} out of range", index)))?;
    task.pinned = !task.pinned;
    Ok(next)
}
