//! Derived fields: progress and completion propagation.
//!
//! `recompute` is the single pass that brings `progress` and (for tasks with
//! subtasks) `completed` back in line with the rest of the task. The state
//! container runs it after every committed mutation.

use super::item::Task;

/// Progress percentage of a task.
///
/// 100 when the task is done (directly, or via all of its subtasks), the
/// rounded share of finished subtasks otherwise, and 0 for an open task
/// without subtasks.
pub fn progress_of(task: &Task) -> u8 {
    let total = task.subtasks.len();
    if total == 0 {
        return if task.completed { 100 } else { 0 };
    }

    let done = task.completed_subtask_count();
    if done == total {
        return 100;
    }
    // round(100 * done / total), half-up, in integer arithmetic
    ((200 * done + total) / (2 * total)) as u8
}

/// Refresh the derived fields of one task
pub fn recompute_task(task: &mut Task) {
    if task.has_subtasks() {
        task.completed = task.all_subtasks_completed();
    }
    task.progress = progress_of(task);
}

/// Refresh the derived fields of every task. Idempotent.
pub fn recompute(tasks: &mut [Task]) {
    for task in tasks.iter_mut() {
        recompute_task(task);
    }
}
