//! On-disk shapes for tasks. Field names follow the JSON format shared by the
//! snapshot and export files (camelCase, ISO-8601 timestamps).

use crate::domain::{Subtask, Task, TaskIcon, TaskKind, TimeTracking};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Format version written into export files
pub const EXPORT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl From<&Subtask> for SubtaskRecord {
    fn from(subtask: &Subtask) -> Self {
        Self {
            id: subtask.id.clone(),
            title: subtask.title.clone(),
            completed: subtask.completed,
            created_at: subtask.created_at,
        }
    }
}

impl From<SubtaskRecord> for Subtask {
    fn from(record: SubtaskRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            completed: record.completed,
            created_at: record.created_at,
        }
    }
}

/// What to do with a timer session found running in a stored snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunningTimers {
    /// The process that started it is gone: drop it without credit
    #[default]
    Discard,
    /// Hand the session over to the process reading the snapshot
    Resume,
}

/// `progress` is recomputed on load, so any stored value is accepted and
/// clamped rather than failing the whole snapshot
fn lenient_progress<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_f64)
        .map(|p| p.clamp(0.0, 100.0) as u8)
        .unwrap_or(0))
}

/// A task as stored in the session snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: TaskKind,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub subtasks: Vec<SubtaskRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<f64>,
    #[serde(default, deserialize_with = "lenient_progress")]
    pub progress: u8,
    #[serde(default)]
    pub time_spent: f64,
    #[serde(default)]
    pub is_timer_running: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_start_time: Option<DateTime<Utc>>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            icon: Some(task.icon.name().to_string()),
            kind: task.kind,
            completed: task.completed,
            subtasks: task.subtasks.iter().map(SubtaskRecord::from).collect(),
            estimated_minutes: task.track.estimated_minutes,
            progress: task.progress,
            time_spent: task.track.time_spent,
            is_timer_running: task.track.is_running(),
            timer_start_time: task.track.started_at,
            created_at: task.created_at,
        }
    }
}

impl TaskRecord {
    /// Convert back into a task. Derived fields are left for the recompute
    /// pass.
    pub fn into_task(self, running: RunningTimers) -> Task {
        let mut track = TimeTracking::new(self.estimated_minutes);
        track.time_spent = if self.time_spent.is_finite() {
            self.time_spent.max(0.0)
        } else {
            0.0
        };

        let was_running = self.is_timer_running || self.timer_start_time.is_some();
        match (running, self.is_timer_running, self.timer_start_time) {
            (RunningTimers::Resume, true, Some(started)) => track.started_at = Some(started),
            _ if was_running => {
                tracing::info!(task = %self.id, "discarding timer session left running");
            }
            _ => {}
        }

        Task {
            id: self.id,
            title: self.title,
            icon: self
                .icon
                .as_deref()
                .map(TaskIcon::normalize)
                .unwrap_or_default(),
            kind: self.kind,
            completed: self.completed,
            subtasks: self.subtasks.into_iter().map(Subtask::from).collect(),
            progress: 0,
            track,
            created_at: self.created_at,
        }
    }
}

/// A task as written to an export file: no progress, no timer state, and
/// nothing marked complete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportTask {
    pub id: String,
    pub title: String,
    pub icon: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub completed: bool,
    pub subtasks: Vec<SubtaskRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl From<&Task> for ExportTask {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            icon: task.icon.name().to_string(),
            kind: task.kind,
            completed: false,
            subtasks: task
                .subtasks
                .iter()
                .map(|st| SubtaskRecord {
                    completed: false,
                    ..SubtaskRecord::from(st)
                })
                .collect(),
            estimated_minutes: task.track.estimated_minutes,
            created_at: task.created_at,
        }
    }
}

/// Top-level export document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub tasks: Vec<ExportTask>,
    pub export_date: DateTime<Utc>,
    pub version: String,
}
