//! Export and import of portable task files.
//!
//! Exports are a fresh copy of the checklist: nothing is marked complete and
//! no progress or timer state travels. Imports accept the export document or
//! a bare array of tasks, validate every entry before anything is returned,
//! and repair duplicate ids instead of rejecting them.

use super::records::{ExportDocument, ExportTask, EXPORT_VERSION};
use crate::domain::{recompute, sanitize_estimate, Subtask, Task, TaskIcon, TaskKind, TimeTracking};
use crate::error::ImportError;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Build the export document for a task list
pub fn export_document(tasks: &[Task], now: DateTime<Utc>) -> ExportDocument {
    ExportDocument {
        tasks: tasks.iter().map(ExportTask::from).collect(),
        export_date: now,
        version: EXPORT_VERSION.to_string(),
    }
}

/// Serialize a task list into pretty-printed export JSON
pub fn export_snapshot(tasks: &[Task], now: DateTime<Utc>) -> Result<String> {
    let document = export_document(tasks, now);
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Tracks ids handed out during one import pass and rewrites repeats.
///
/// A repeated id becomes `<id>-<stamp>-<index>`, with a numeric suffix
/// appended in the unlikely case that is taken too.
#[derive(Debug)]
pub struct IdRegistry {
    used: HashSet<String>,
    stamp: i64,
}

impl IdRegistry {
    pub fn new(stamp: i64) -> Self {
        Self {
            used: HashSet::new(),
            stamp,
        }
    }

    /// Claim `id` for the entry at `index`, returning the id to use
    pub fn claim(&mut self, id: &str, index: usize) -> String {
        if self.used.insert(id.to_string()) {
            return id.to_string();
        }

        let base = format!("{}-{}-{}", id, self.stamp, index);
        let mut candidate = base.clone();
        let mut suffix = 1;
        while self.used.contains(&candidate) {
            candidate = format!("{}-{}", base, suffix);
            suffix += 1;
        }
        tracing::debug!(original = id, repaired = %candidate, "rewrote duplicate id");
        self.used.insert(candidate.clone());
        candidate
    }
}

/// Parse and validate an external task file.
///
/// All-or-nothing: either every entry is valid and the full list is returned,
/// or the first problem is reported.
pub fn import_snapshot(raw: &str, now: DateTime<Utc>) -> Result<Vec<Task>, ImportError> {
    let payload: Value = serde_json::from_str(raw)?;
    let entries = task_entries(&payload)?;

    let mut task_ids = IdRegistry::new(now.timestamp_millis());
    let mut tasks = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        tasks.push(parse_task(entry, index, &mut task_ids, now)?);
    }

    recompute(&mut tasks);
    tracing::info!(count = tasks.len(), "parsed import file");
    Ok(tasks)
}

/// Accept `{ "tasks": [...] }` or `[...]`
fn task_entries(payload: &Value) -> Result<&Vec<Value>, ImportError> {
    match payload {
        Value::Array(entries) => Ok(entries),
        Value::Object(map) => match map.get("tasks") {
            Some(Value::Array(entries)) => Ok(entries),
            _ => Err(ImportError::UnsupportedShape),
        },
        _ => Err(ImportError::UnsupportedShape),
    }
}

fn parse_task(
    entry: &Value,
    index: usize,
    task_ids: &mut IdRegistry,
    now: DateTime<Utc>,
) -> Result<Task, ImportError> {
    let position = index + 1;
    let fields = entry
        .as_object()
        .ok_or(ImportError::NotAnObject { position })?;

    let id = id_field(fields.get("id")).ok_or(ImportError::MissingField {
        position,
        field: "id",
    })?;
    let title = text_field(fields.get("title")).ok_or(ImportError::MissingField {
        position,
        field: "title",
    })?;

    let id = task_ids.claim(&id, index);

    let icon = fields
        .get("icon")
        .and_then(Value::as_str)
        .map(TaskIcon::normalize)
        .unwrap_or_default();

    let kind = fields
        .get("type")
        .and_then(Value::as_str)
        .and_then(TaskKind::from_tag)
        .unwrap_or_default();

    let estimated_minutes = coerce_minutes(fields.get("estimatedMinutes"), position);

    let subtasks = match fields.get("subtasks") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => parse_subtasks(items, &id, position, now)?,
        Some(_) => {
            return Err(ImportError::InvalidField {
                position,
                field: "subtasks",
            })
        }
    };

    Ok(Task {
        id,
        title,
        icon,
        kind,
        completed: false,
        subtasks,
        progress: 0,
        track: TimeTracking::new(estimated_minutes),
        created_at: timestamp_field(fields.get("createdAt")).unwrap_or(now),
    })
}

fn parse_subtasks(
    items: &[Value],
    task_id: &str,
    position: usize,
    now: DateTime<Utc>,
) -> Result<Vec<Subtask>, ImportError> {
    let mut ids = IdRegistry::new(now.timestamp_millis());
    let mut subtasks = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let fields: &Map<String, Value> =
            item.as_object().ok_or(ImportError::InvalidSubtask {
                position,
                subtask: index + 1,
                reason: "not an object",
            })?;

        let title = text_field(fields.get("title")).ok_or(ImportError::InvalidSubtask {
            position,
            subtask: index + 1,
            reason: "missing title",
        })?;

        let id = id_field(fields.get("id"))
            .unwrap_or_else(|| format!("{}-{}", task_id, index + 1));

        subtasks.push(Subtask {
            id: ids.claim(&id, index),
            title,
            completed: false,
            created_at: timestamp_field(fields.get("createdAt")).unwrap_or(now),
        });
    }

    Ok(subtasks)
}

/// Ids may be strings or numbers; blank strings count as missing
fn id_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Non-empty after trimming, returned trimmed
fn text_field(value: Option<&Value>) -> Option<String> {
    let text = value?.as_str()?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Numbers pass through, numeric strings are parsed, anything else is dropped
fn coerce_minutes(value: Option<&Value>, position: usize) -> Option<f64> {
    let minutes = match value? {
        Value::Null => return None,
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    let sanitized = sanitize_estimate(minutes);
    if sanitized.is_none() {
        tracing::warn!(position, "ignoring unusable estimatedMinutes");
    }
    sanitized
}

fn timestamp_field(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let text = value?.as_str()?;
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
