use super::files::{atomic_write, read_file};
use super::records::{RunningTimers, TaskRecord};
use super::transfer::IdRegistry;
use crate::domain::{recompute, Task};
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;

/// Serialize the task list for the session snapshot
pub fn encode_snapshot(tasks: &[Task]) -> Result<String> {
    let records: Vec<TaskRecord> = tasks.iter().map(TaskRecord::from).collect();
    Ok(serde_json::to_string(&records)?)
}

/// Rebuild the task list from a session snapshot.
///
/// Running timers are resumed or dropped according to `running`, ids are made
/// unique again if the file was edited by hand, and derived fields are
/// recomputed.
pub fn decode_snapshot(content: &str, running: RunningTimers) -> Result<Vec<Task>> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let records: Vec<TaskRecord> =
        serde_json::from_str(content).context("Snapshot is not a valid task list")?;

    let mut task_ids = IdRegistry::new(Utc::now().timestamp_millis());
    let mut tasks: Vec<Task> = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let mut task = record.into_task(running);
            task.id = task_ids.claim(&task.id, index);

            let mut subtask_ids = IdRegistry::new(Utc::now().timestamp_millis());
            for (st_index, subtask) in task.subtasks.iter_mut().enumerate() {
                subtask.id = subtask_ids.claim(&subtask.id, st_index);
            }
            task
        })
        .collect();

    recompute(&mut tasks);
    Ok(tasks)
}

/// Load the snapshot file; a missing file is an empty list
pub fn load_snapshot<P: AsRef<Path>>(path: P, running: RunningTimers) -> Result<Vec<Task>> {
    let path = path.as_ref();
    let content = read_file(path)?;
    let tasks = decode_snapshot(&content, running)
        .with_context(|| format!("Failed to load snapshot: {}", path.display()))?;
    tracing::info!(count = tasks.len(), path = %path.display(), "loaded snapshot");
    Ok(tasks)
}

/// Write the snapshot file atomically
pub fn save_snapshot<P: AsRef<Path>>(path: P, tasks: &[Task]) -> Result<()> {
    let path = path.as_ref();
    let content = encode_snapshot(tasks)?;
    atomic_write(path, &content)?;
    tracing::debug!(count = tasks.len(), path = %path.display(), "saved snapshot");
    Ok(())
}
