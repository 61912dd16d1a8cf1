use super::enums::{TaskIcon, TaskKind};
use super::timer::TimeTracking;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a fresh identifier for a task or subtask
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// A checklist item belonging to exactly one task
#[derive(Debug, Clone, PartialEq)]
pub struct Subtask {
    /// Unique among the siblings of the owning task
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Subtask {
    pub fn new(id: String, title: String) -> Self {
        Self {
            id,
            title,
            completed: false,
            created_at: Utc::now(),
        }
    }
}

/// A top-level checklist item
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    /// Unique across the collection
    pub id: String,
    pub title: String,
    pub icon: TaskIcon,
    pub kind: TaskKind,
    /// Set directly only when there are no subtasks, derived otherwise
    pub completed: bool,
    /// Display order is insertion order
    pub subtasks: Vec<Subtask>,
    /// Derived 0..=100, refreshed by the recompute pass
    pub progress: u8,
    /// Estimate and accumulated timer sessions
    pub track: TimeTracking,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(title: String, icon: TaskIcon, estimated_minutes: Option<f64>) -> Self {
        Self {
            id: new_id(),
            title,
            icon,
            kind: TaskKind::Daily,
            completed: false,
            subtasks: Vec::new(),
            progress: 0,
            track: TimeTracking::new(estimated_minutes),
            created_at: Utc::now(),
        }
    }

    pub fn has_subtasks(&self) -> bool {
        !self.subtasks.is_empty()
    }

    pub fn completed_subtask_count(&self) -> usize {
        self.subtasks.iter().filter(|st| st.completed).count()
    }

    /// True when there is at least one subtask and all of them are done
    pub fn all_subtasks_completed(&self) -> bool {
        self.has_subtasks() && self.subtasks.iter().all(|st| st.completed)
    }

    pub fn subtask_mut(&mut self, subtask_id: &str) -> Option<&mut Subtask> {
        self.subtasks.iter_mut().find(|st| st.id == subtask_id)
    }

    /// Append an incomplete subtask with an id unused among its siblings.
    /// Adding unfinished work reopens the task.
    pub fn push_subtask(&mut self, title: String) -> &Subtask {
        let mut id = new_id();
        while self.subtasks.iter().any(|st| st.id == id) {
            id = new_id();
        }
        self.subtasks.push(Subtask::new(id, title));
        self.completed = false;
        &self.subtasks[self.subtasks.len() - 1]
    }

    /// Remove a subtask, returning it if it existed.
    /// An emptied list leaves `completed` as it was.
    pub fn remove_subtask(&mut self, subtask_id: &str) -> Option<Subtask> {
        let index = self.subtasks.iter().position(|st| st.id == subtask_id)?;
        let removed = self.subtasks.remove(index);
        if self.has_subtasks() {
            self.completed = self.all_subtasks_completed();
        }
        Some(removed)
    }

    /// Clear completion on the task and every subtask
    pub fn reset_completion(&mut self) {
        self.completed = false;
        for subtask in &mut self.subtasks {
            subtask.completed = false;
        }
        self.progress = 0;
    }
}
