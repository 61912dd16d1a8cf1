use super::item::Task;
use super::timer::{format_countdown, format_minutes};
use chrono::{DateTime, Utc};

/// Completion summary for the whole list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySummary {
    pub completed: usize,
    pub total: usize,
    /// Rounded share of completed tasks, 0 for an empty list
    pub percent: u8,
}

/// Count completed tasks across the list
pub fn day_summary(tasks: &[Task]) -> DaySummary {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.completed).count();
    let percent = if total == 0 {
        0
    } else {
        ((200 * completed + total) / (2 * total)) as u8
    };

    DaySummary {
        completed,
        total,
        percent,
    }
}

/// Total elapsed and estimated minutes across the list.
/// Tasks without an estimate only contribute elapsed time.
pub fn compute_totals(tasks: &[Task], now: DateTime<Utc>) -> (f64, f64) {
    let mut total_elapsed = 0.0;
    let mut total_estimate = 0.0;

    for task in tasks {
        total_elapsed += task.track.elapsed_at(now);
        total_estimate += task.track.estimated_minutes.unwrap_or(0.0);
    }

    (total_elapsed, total_estimate)
}

/// Status badge for a task
pub fn status_badge(task: &Task) -> &'static str {
    if task.completed {
        "✓"
    } else if task.track.is_running() {
        "⏱"
    } else if task.has_subtasks() {
        "▸"
    } else {
        "○"
    }
}

/// Time column for a task: countdown while running, estimate otherwise
pub fn time_label(task: &Task, now: DateTime<Utc>) -> String {
    match (task.track.is_running(), task.track.remaining_at(now)) {
        (true, Some(remaining)) => format_countdown(remaining),
        (true, None) => format!("+{}", format_minutes(task.track.elapsed_at(now))),
        (false, Some(_)) => {
            let estimate = task.track.estimated_minutes.unwrap_or(0.0);
            if task.track.time_spent > 0.0 {
                format!(
                    "{} / {}",
                    format_minutes(task.track.time_spent),
                    format_minutes(estimate)
                )
            } else {
                format_minutes(estimate)
            }
        }
        (false, None) if task.track.time_spent > 0.0 => format_minutes(task.track.time_spent),
        (false, None) => String::new(),
    }
}

/// Get tree connector for subtasks
pub fn tree_connector(is_last: bool) -> &'static str {
    if is_last {
        "└─"
    } else {
        "├─"
    }
}
