use crate::domain::{
    progress_of, recompute, recompute_task, NewDayPolicy, ParentToggle, Task, TaskIcon, TaskKind,
};
use crate::error::ImportError;
use crate::notifications;
use crate::persistence::{self, AppConfig, RunningTimers};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::Path;

/// User-editable fields of a task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub icon: TaskIcon,
    pub estimated_minutes: Option<f64>,
    pub kind: TaskKind,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            icon: TaskIcon::default(),
            estimated_minutes: None,
            kind: TaskKind::default(),
        }
    }

    pub fn icon(mut self, icon: TaskIcon) -> Self {
        self.icon = icon;
        self
    }

    pub fn estimate(mut self, minutes: Option<f64>) -> Self {
        self.estimated_minutes = minutes;
        self
    }

    pub fn kind(mut self, kind: TaskKind) -> Self {
        self.kind = kind;
        self
    }

    /// Title trimmed, or `None` when blank
    fn clean_title(&self) -> Option<String> {
        clean_title(&self.title)
    }
}

/// A timer stopped by the periodic check
#[derive(Debug, Clone, PartialEq)]
pub struct AutoStop {
    pub task_id: String,
    pub title: String,
    /// Minutes credited by the final session
    pub credited: f64,
}

/// Session state: owns the task list and is its only write path.
///
/// Every mutation that changes the list ends in `commit`, which recomputes
/// derived fields and marks the snapshot dirty. Unknown ids are ignored and
/// reported as `false`/`None`.
pub struct AppState {
    tasks: Vec<Task>,
    pub config: AppConfig,
    pub needs_save: bool,
}

impl AppState {
    pub fn new(tasks: Vec<Task>, config: AppConfig) -> Self {
        let mut tasks = tasks;
        recompute(&mut tasks);
        Self {
            tasks,
            config,
            needs_save: false,
        }
    }

    /// Restore a session from the snapshot file after the previous one
    /// ended: timers left running are dropped without credit
    pub fn load<P: AsRef<Path>>(path: P, config: AppConfig) -> Result<Self> {
        let tasks = persistence::load_snapshot(path, RunningTimers::Discard)?;
        Ok(Self::new(tasks, config))
    }

    /// Continue the session stored in the snapshot file, running timers
    /// included
    pub fn resume<P: AsRef<Path>>(path: P, config: AppConfig) -> Result<Self> {
        let tasks = persistence::load_snapshot(path, RunningTimers::Resume)?;
        Ok(Self::new(tasks, config))
    }

    /// Open the snapshot for a command. Running timers carry on unless the
    /// session lock shows that the session driving them died, in which case
    /// they are discarded, the result is written back and the lock removed.
    pub fn open<P, L>(
        path: P,
        lock_path: L,
        config: AppConfig,
        now: DateTime<Utc>,
    ) -> Result<Self>
    where
        P: AsRef<Path>,
        L: AsRef<Path>,
    {
        let lock = persistence::read_session_lock(&lock_path)?;
        match persistence::running_timers_policy(lock.as_ref(), now) {
            RunningTimers::Resume => Self::resume(path, config),
            RunningTimers::Discard => {
                tracing::warn!("watch session stopped responding, discarding its timers");
                let mut app = Self::load(&path, config)?;
                app.save(&path)?;
                persistence::clear_session_lock(&lock_path)?;
                Ok(app)
            }
        }
    }

    /// Pick up changes other commands wrote to the snapshot, keeping timers
    /// running. Unsaved local changes are replaced.
    pub fn reload<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.tasks = persistence::load_snapshot(path, RunningTimers::Resume)?;
        self.needs_save = false;
        Ok(())
    }

    /// Mirror the list to the snapshot file. On failure the in-memory list
    /// stays as it is and remains dirty.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        persistence::save_snapshot(path, &self.tasks)?;
        self.needs_save = false;
        Ok(())
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Recompute derived state after a change and mark for saving
    fn commit(&mut self, action: &str) {
        recompute(&mut self.tasks);
        self.needs_save = true;
        tracing::debug!(action, tasks = self.tasks.len(), "committed change");
    }

    /// Flip completion of a task. Tasks with subtasks follow the configured
    /// parent toggle policy.
    pub fn toggle_task(&mut self, id: &str) -> bool {
        let policy = self.config.parent_toggle;
        let Some(task) = self.task_mut(id) else {
            return false;
        };

        if task.has_subtasks() {
            match policy {
                ParentToggle::Blocked => return false,
                ParentToggle::Direct => {
                    let before = task.completed;
                    task.completed = !task.completed;
                    recompute_task(task);
                    if task.completed == before {
                        tracing::debug!(task = id, "completion follows subtasks, toggle ignored");
                        return false;
                    }
                }
                ParentToggle::Cascade => {
                    let completed = !task.completed;
                    task.completed = completed;
                    for subtask in &mut task.subtasks {
                        subtask.completed = completed;
                    }
                }
            }
        } else {
            task.completed = !task.completed;
        }

        self.commit("toggle_task");
        true
    }

    /// Flip completion of a subtask and re-derive its parent
    pub fn toggle_subtask(&mut self, task_id: &str, subtask_id: &str) -> bool {
        let Some(task) = self.task_mut(task_id) else {
            return false;
        };
        let Some(subtask) = task.subtask_mut(subtask_id) else {
            return false;
        };

        subtask.completed = !subtask.completed;
        task.completed = task.all_subtasks_completed();

        self.commit("toggle_subtask");
        true
    }

    /// Append a subtask, returning its id. Blank titles are ignored.
    pub fn add_subtask(&mut self, task_id: &str, title: &str) -> Option<String> {
        let title = clean_title(title)?;
        let task = self.task_mut(task_id)?;
        let id = task.push_subtask(title).id.clone();

        self.commit("add_subtask");
        Some(id)
    }

    pub fn delete_subtask(&mut self, task_id: &str, subtask_id: &str) -> bool {
        let Some(task) = self.task_mut(task_id) else {
            return false;
        };
        if task.remove_subtask(subtask_id).is_none() {
            return false;
        }

        self.commit("delete_subtask");
        true
    }

    /// Rename a subtask. Blank titles are ignored.
    pub fn edit_subtask(&mut self, task_id: &str, subtask_id: &str, title: &str) -> bool {
        let Some(title) = clean_title(title) else {
            return false;
        };
        let Some(subtask) = self
            .task_mut(task_id)
            .and_then(|task| task.subtask_mut(subtask_id))
        else {
            return false;
        };

        subtask.title = title;
        self.commit("edit_subtask");
        true
    }

    /// Append a new task, returning its id. Blank titles are rejected.
    pub fn add_task(&mut self, draft: TaskDraft) -> Option<String> {
        let title = draft.clean_title()?;

        let mut task = Task::new(title, draft.icon, draft.estimated_minutes);
        task.kind = draft.kind;
        // Guard against the (theoretical) case of a generated id already in use
        while self.task(&task.id).is_some() {
            task.id = crate::domain::new_id();
        }
        let id = task.id.clone();
        self.tasks.push(task);

        self.commit("add_task");
        Some(id)
    }

    /// Replace title, icon, estimate and kind. Completion, subtasks and
    /// timer state are untouched.
    pub fn update_task(&mut self, id: &str, draft: TaskDraft) -> bool {
        let Some(title) = draft.clean_title() else {
            return false;
        };
        let Some(task) = self.task_mut(id) else {
            return false;
        };

        task.title = title;
        task.icon = draft.icon;
        task.kind = draft.kind;
        task.track.set_estimate(draft.estimated_minutes);

        self.commit("update_task");
        true
    }

    /// Remove a task together with its subtasks
    pub fn delete_task(&mut self, id: &str) -> bool {
        let Some(index) = self.tasks.iter().position(|t| t.id == id) else {
            return false;
        };
        self.tasks.remove(index);

        self.commit("delete_task");
        true
    }

    /// Move a task so it ends up at `target_index` of the full list; every
    /// other task keeps its relative order.
    pub fn reorder_task(&mut self, id: &str, target_index: usize) -> bool {
        let Some(source_index) = self.tasks.iter().position(|t| t.id == id) else {
            return false;
        };
        if target_index >= self.tasks.len() || target_index == source_index {
            return false;
        }

        let task = self.tasks.remove(source_index);
        self.tasks.insert(target_index, task);

        self.commit("reorder_task");
        true
    }

    /// Move a task one place up
    pub fn move_task_up(&mut self, id: &str) -> bool {
        match self.tasks.iter().position(|t| t.id == id) {
            Some(index) if index > 0 => self.reorder_task(id, index - 1),
            _ => false,
        }
    }

    /// Move a task one place down
    pub fn move_task_down(&mut self, id: &str) -> bool {
        match self.tasks.iter().position(|t| t.id == id) {
            Some(index) => self.reorder_task(id, index + 1),
            None => false,
        }
    }

    pub fn start_timer(&mut self, id: &str) -> bool {
        self.start_timer_at(id, Utc::now())
    }

    /// Start the task's timer. A timer that is already running keeps its
    /// original start time.
    pub fn start_timer_at(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        let Some(task) = self.task_mut(id) else {
            return false;
        };
        if !task.track.start_at(now) {
            return false;
        }

        tracing::info!(task = id, "timer started");
        self.commit("start_timer");
        true
    }

    pub fn stop_timer(&mut self, id: &str) -> Option<f64> {
        self.stop_timer_at(id, Utc::now())
    }

    /// Stop the task's timer, returning the minutes credited
    pub fn stop_timer_at(&mut self, id: &str, now: DateTime<Utc>) -> Option<f64> {
        let credited = self.task_mut(id)?.track.stop_at(now)?;

        tracing::info!(task = id, minutes = credited, "timer stopped");
        self.commit("stop_timer");
        Some(credited)
    }

    /// Minutes left on a task's estimate; negative in overtime
    pub fn remaining(&self, id: &str, now: DateTime<Utc>) -> Option<f64> {
        self.task(id)?.track.remaining_at(now)
    }

    /// Progress of a task by id
    pub fn progress(&self, id: &str) -> Option<u8> {
        self.task(id).map(progress_of)
    }

    pub fn has_running_timers(&self) -> bool {
        self.tasks.iter().any(|t| t.track.is_running())
    }

    /// Stop every running timer whose estimate is used up
    pub fn check_estimate_hits(&mut self, now: DateTime<Utc>) -> Vec<AutoStop> {
        let expired: Vec<String> = self
            .tasks
            .iter()
            .filter(|t| t.track.is_expired_at(now))
            .map(|t| t.id.clone())
            .collect();

        let mut stopped = Vec::with_capacity(expired.len());
        for id in expired {
            if let Some(credited) = self.stop_timer_at(&id, now) {
                let title = self.task(&id).map(|t| t.title.clone()).unwrap_or_default();
                tracing::info!(task = %id, "estimate reached, timer auto-stopped");
                if self.config.notifications {
                    notifications::notify_timer_expired(&title);
                }
                stopped.push(AutoStop {
                    task_id: id,
                    title,
                    credited,
                });
            }
        }

        stopped
    }

    /// Periodic tick: applies auto-stop. Display refresh is the caller's job;
    /// elapsed and remaining are pure functions of `now`.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<AutoStop> {
        self.check_estimate_hits(now)
    }

    /// Start a new day: clear completion everywhere. With
    /// `NewDayPolicy::DropTemporary` temporary tasks are discarded first.
    /// Returns how many tasks were discarded.
    pub fn new_day_session(&mut self) -> usize {
        let before = self.tasks.len();
        if self.config.new_day_policy == NewDayPolicy::DropTemporary {
            self.tasks.retain(|t| t.kind == TaskKind::Daily);
        }
        let dropped = before - self.tasks.len();

        for task in &mut self.tasks {
            task.reset_completion();
        }

        tracing::info!(dropped, kept = self.tasks.len(), "started a new day");
        self.commit("new_day_session");
        dropped
    }

    pub fn export_snapshot(&self) -> Result<String> {
        self.export_snapshot_at(Utc::now())
    }

    /// Portable copy of the list for an export file
    pub fn export_snapshot_at(&self, now: DateTime<Utc>) -> Result<String> {
        persistence::export_snapshot(&self.tasks, now)
    }

    pub fn import_snapshot(&mut self, raw: &str) -> Result<usize, ImportError> {
        self.import_snapshot_at(raw, Utc::now())
    }

    /// Replace the list with the contents of an import file. On error the
    /// current list is left exactly as it was.
    pub fn import_snapshot_at(&mut self, raw: &str, now: DateTime<Utc>) -> Result<usize, ImportError> {
        let tasks = persistence::import_snapshot(raw, now).map_err(|e| {
            tracing::warn!("import rejected: {}", e);
            e
        })?;

        let count = tasks.len();
        self.tasks = tasks;
        tracing::info!(count, "imported tasks");
        self.commit("import_snapshot");
        Ok(count)
    }
}

/// Trimmed title, or `None` when blank
fn clean_title(title: &str) -> Option<String> {
    let title = title.trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn quiet_config() -> AppConfig {
        AppConfig {
            notifications: false,
            ..AppConfig::default()
        }
    }

    fn create_test_app() -> AppState {
        let mut app = AppState::new(Vec::new(), quiet_config());
        app.add_task(TaskDraft::new("Brush teeth").icon(TaskIcon::Toothbrush).estimate(Some(3.0)));
        app.add_task(TaskDraft::new("Exercise").icon(TaskIcon::Activity).estimate(Some(15.0)));
        app.needs_save = false;
        app
    }

    fn id_at(app: &AppState, index: usize) -> String {
        app.tasks()[index].id.clone()
    }

    fn titles(app: &AppState) -> Vec<String> {
        app.tasks().iter().map(|t| t.title.clone()).collect()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_add_task() {
        let mut app = create_test_app();
        let id = app.add_task(TaskDraft::new("  Breakfast  ")).unwrap();

        let task = app.task(&id).unwrap();
        assert_eq!(task.title, "Breakfast");
        assert_eq!(task.icon, TaskIcon::Circle);
        assert_eq!(task.progress, 0);
        assert!(!task.completed);
        assert_eq!(app.tasks().len(), 3);
        assert!(app.needs_save);
    }

    #[test]
    fn test_add_task_rejects_blank_title() {
        let mut app = create_test_app();
        assert!(app.add_task(TaskDraft::new("   ")).is_none());
        assert_eq!(app.tasks().len(), 2);
        assert!(!app.needs_save);
    }

    #[test]
    fn test_toggle_task_without_subtasks() {
        let mut app = create_test_app();
        let id = id_at(&app, 0);

        assert!(app.toggle_task(&id));
        assert!(app.task(&id).unwrap().completed);
        assert_eq!(app.task(&id).unwrap().progress, 100);

        assert!(app.toggle_task(&id));
        assert!(!app.task(&id).unwrap().completed);
        assert_eq!(app.task(&id).unwrap().progress, 0);
    }

    #[test]
    fn test_toggle_unknown_ids_are_noops() {
        let mut app = create_test_app();
        let id = id_at(&app, 0);

        assert!(!app.toggle_task("missing"));
        assert!(!app.toggle_subtask(&id, "missing"));
        assert!(!app.toggle_subtask("missing", "missing"));
        assert!(!app.needs_save);
    }

    #[test]
    fn test_toggle_subtask_propagates_to_parent() {
        let mut app = create_test_app();
        let id = id_at(&app, 1);
        let warm_up = app.add_subtask(&id, "Warm up").unwrap();
        let workout = app.add_subtask(&id, "Workout").unwrap();

        app.toggle_subtask(&id, &warm_up);
        assert!(!app.task(&id).unwrap().completed);
        assert_eq!(app.task(&id).unwrap().progress, 50);

        app.toggle_subtask(&id, &workout);
        assert!(app.task(&id).unwrap().completed);
        assert_eq!(app.task(&id).unwrap().progress, 100);

        app.toggle_subtask(&id, &warm_up);
        assert!(!app.task(&id).unwrap().completed);
        assert_eq!(app.task(&id).unwrap().progress, 50);
    }

    #[test]
    fn test_progress_in_thirds() {
        let mut app = create_test_app();
        let id = id_at(&app, 1);
        let subtasks: Vec<String> = ["a", "b", "c"]
            .iter()
            .map(|t| app.add_subtask(&id, t).unwrap())
            .collect();

        let mut seen = Vec::new();
        for subtask in &subtasks {
            app.toggle_subtask(&id, subtask);
            seen.push(app.progress(&id).unwrap());
        }
        assert_eq!(seen, vec![33, 67, 100]);
    }

    #[test]
    fn test_add_subtask_reopens_parent() {
        let mut app = create_test_app();
        let id = id_at(&app, 1);
        let first = app.add_subtask(&id, "Warm up").unwrap();
        app.toggle_subtask(&id, &first);
        assert!(app.task(&id).unwrap().completed);

        app.add_subtask(&id, "Stretch").unwrap();
        assert!(!app.task(&id).unwrap().completed);
        assert_eq!(app.task(&id).unwrap().progress, 50);
    }

    #[test]
    fn test_add_subtask_ignores_blank_and_unknown() {
        let mut app = create_test_app();
        let id = id_at(&app, 1);
        assert!(app.add_subtask(&id, "  ").is_none());
        assert!(app.add_subtask("missing", "Stretch").is_none());
        assert!(app.task(&id).unwrap().subtasks.is_empty());
    }

    #[test]
    fn test_delete_last_subtask_keeps_parent_completion() {
        let mut app = create_test_app();
        let id = id_at(&app, 1);
        let only = app.add_subtask(&id, "Warm up").unwrap();
        app.toggle_subtask(&id, &only);
        assert!(app.task(&id).unwrap().completed);

        assert!(app.delete_subtask(&id, &only));
        let task = app.task(&id).unwrap();
        assert!(task.subtasks.is_empty());
        assert!(task.completed);
        assert_eq!(task.progress, 100);
    }

    #[test]
    fn test_delete_open_subtask_completes_parent() {
        let mut app = create_test_app();
        let id = id_at(&app, 1);
        let done = app.add_subtask(&id, "Warm up").unwrap();
        let open = app.add_subtask(&id, "Workout").unwrap();
        app.toggle_subtask(&id, &done);

        assert!(app.delete_subtask(&id, &open));
        assert!(app.task(&id).unwrap().completed);
        assert!(!app.delete_subtask(&id, &open));
    }

    #[test]
    fn test_edit_subtask() {
        let mut app = create_test_app();
        let id = id_at(&app, 1);
        let sub = app.add_subtask(&id, "Warm up").unwrap();
        app.toggle_subtask(&id, &sub);

        assert!(app.edit_subtask(&id, &sub, " Warm up 5 min "));
        assert!(!app.edit_subtask(&id, &sub, ""));

        let task = app.task(&id).unwrap();
        assert_eq!(task.subtasks[0].title, "Warm up 5 min");
        assert!(task.subtasks[0].completed);
        assert!(task.completed);
    }

    #[test]
    fn test_update_task_keeps_state() {
        let mut app = create_test_app();
        let id = id_at(&app, 1);
        let sub = app.add_subtask(&id, "Warm up").unwrap();
        app.toggle_subtask(&id, &sub);
        app.start_timer_at(&id, t0());

        let draft = TaskDraft::new("Morning exercise")
            .icon(TaskIcon::Star)
            .estimate(Some(20.0))
            .kind(TaskKind::Temporary);
        assert!(app.update_task(&id, draft));

        let task = app.task(&id).unwrap();
        assert_eq!(task.title, "Morning exercise");
        assert_eq!(task.icon, TaskIcon::Star);
        assert_eq!(task.kind, TaskKind::Temporary);
        assert_eq!(task.track.estimated_minutes, Some(20.0));
        assert!(task.completed);
        assert_eq!(task.subtasks.len(), 1);
        assert_eq!(task.track.started_at, Some(t0()));

        assert!(!app.update_task("missing", TaskDraft::new("x")));
    }

    #[test]
    fn test_delete_task() {
        let mut app = create_test_app();
        let id = id_at(&app, 0);

        assert!(app.delete_task(&id));
        assert_eq!(titles(&app), vec!["Exercise"]);
        assert!(!app.delete_task(&id));
    }

    #[test]
    fn test_reorder_task() {
        let mut app = AppState::new(Vec::new(), quiet_config());
        for title in ["A", "B", "C", "D"] {
            app.add_task(TaskDraft::new(title));
        }
        let d = id_at(&app, 3);

        assert!(app.reorder_task(&d, 1));
        assert_eq!(titles(&app), vec!["A", "D", "B", "C"]);

        let a = id_at(&app, 0);
        assert!(app.reorder_task(&a, 3));
        assert_eq!(titles(&app), vec!["D", "B", "C", "A"]);
    }

    #[test]
    fn test_reorder_noops() {
        let mut app = create_test_app();
        app.needs_save = false;
        let id = id_at(&app, 0);

        assert!(!app.reorder_task("missing", 0));
        assert!(!app.reorder_task(&id, 0));
        assert!(!app.reorder_task(&id, 5));
        assert_eq!(titles(&app), vec!["Brush teeth", "Exercise"]);
        assert!(!app.needs_save);
    }

    #[test]
    fn test_reorder_sees_completed_tasks() {
        let mut app = AppState::new(Vec::new(), quiet_config());
        for title in ["A", "B", "C"] {
            app.add_task(TaskDraft::new(title));
        }
        // A view hiding completed tasks would show only [B, C]
        let a = id_at(&app, 0);
        app.toggle_task(&a);
        let c = id_at(&app, 2);

        assert!(app.reorder_task(&c, 1));
        assert_eq!(titles(&app), vec!["A", "C", "B"]);
        assert!(app.task(&a).unwrap().completed);
    }

    #[test]
    fn test_move_up_down() {
        let mut app = create_test_app();
        let first = id_at(&app, 0);

        assert!(!app.move_task_up(&first));
        assert!(app.move_task_down(&first));
        assert_eq!(titles(&app), vec!["Exercise", "Brush teeth"]);
        assert!(!app.move_task_down(&first));
        assert!(app.move_task_up(&first));
        assert_eq!(titles(&app), vec!["Brush teeth", "Exercise"]);
    }

    #[test]
    fn test_parent_toggle_direct_defers_to_subtasks() {
        let mut app = create_test_app();
        let id = id_at(&app, 1);
        app.add_subtask(&id, "Warm up");
        app.needs_save = false;

        assert!(!app.toggle_task(&id));
        assert!(!app.needs_save);
        let task = app.task(&id).unwrap();
        assert!(!task.completed);
        assert!(!task.subtasks[0].completed);
    }

    #[test]
    fn test_parent_toggle_cascade() {
        let mut app = create_test_app();
        app.config.parent_toggle = ParentToggle::Cascade;
        let id = id_at(&app, 1);
        app.add_subtask(&id, "Warm up");
        app.add_subtask(&id, "Workout");

        assert!(app.toggle_task(&id));
        let task = app.task(&id).unwrap();
        assert!(task.completed);
        assert!(task.subtasks.iter().all(|st| st.completed));
        assert_eq!(task.progress, 100);

        assert!(app.toggle_task(&id));
        let task = app.task(&id).unwrap();
        assert!(!task.completed);
        assert!(task.subtasks.iter().all(|st| !st.completed));
    }

    #[test]
    fn test_parent_toggle_blocked() {
        let mut app = create_test_app();
        app.config.parent_toggle = ParentToggle::Blocked;
        let id = id_at(&app, 1);
        app.add_subtask(&id, "Warm up");

        assert!(!app.toggle_task(&id));
        // Leaf tasks still toggle
        let leaf = id_at(&app, 0);
        assert!(app.toggle_task(&leaf));
    }

    #[test]
    fn test_timer_start_stop() {
        let mut app = create_test_app();
        let id = id_at(&app, 1);

        assert!(app.start_timer_at(&id, t0()));
        assert!(app.task(&id).unwrap().track.is_running());

        let credited = app.stop_timer_at(&id, t0() + Duration::seconds(90)).unwrap();
        assert!((credited - 1.5).abs() < 1e-9);
        let task = app.task(&id).unwrap();
        assert!((task.track.time_spent - 1.5).abs() < 1e-9);
        assert!(!task.track.is_running());
        assert!(task.track.started_at.is_none());
    }

    #[test]
    fn test_timer_guards() {
        let mut app = create_test_app();
        let id = id_at(&app, 1);

        assert!(!app.start_timer_at("missing", t0()));
        assert!(app.stop_timer_at(&id, t0()).is_none());

        app.start_timer_at(&id, t0());
        assert!(!app.start_timer_at(&id, t0() + Duration::minutes(1)));
        let credited = app.stop_timer_at(&id, t0() + Duration::minutes(2)).unwrap();
        assert!((credited - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_remaining() {
        let mut app = create_test_app();
        let id = id_at(&app, 0);
        app.start_timer_at(&id, t0());

        let remaining = app.remaining(&id, t0() + Duration::minutes(4)).unwrap();
        assert!((remaining + 1.0).abs() < 1e-9);
        assert!(app.remaining("missing", t0()).is_none());
    }

    #[test]
    fn test_auto_stop_after_estimate() {
        let mut app = AppState::new(Vec::new(), quiet_config());
        let id = app.add_task(TaskDraft::new("Quick").estimate(Some(1.0))).unwrap();
        app.start_timer_at(&id, t0());

        assert!(app.tick(t0() + Duration::seconds(59)).is_empty());
        assert!(app.task(&id).unwrap().track.is_running());

        let stopped = app.tick(t0() + Duration::seconds(61));
        assert_eq!(stopped.len(), 1);
        assert_eq!(stopped[0].task_id, id);

        let task = app.task(&id).unwrap();
        assert!(!task.track.is_running());
        assert!((task.track.time_spent - 61.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_auto_stop_ignores_tasks_without_estimate() {
        let mut app = AppState::new(Vec::new(), quiet_config());
        let id = app.add_task(TaskDraft::new("Open ended")).unwrap();
        app.start_timer_at(&id, t0());

        assert!(app.tick(t0() + Duration::hours(5)).is_empty());
        assert!(app.has_running_timers());
    }

    #[test]
    fn test_new_day_keeps_all() {
        let mut app = create_test_app();
        let id = id_at(&app, 1);
        app.update_task(&id, TaskDraft::new("Exercise").kind(TaskKind::Temporary));
        let sub = app.add_subtask(&id, "Warm up").unwrap();
        app.toggle_subtask(&id, &sub);
        let leaf = id_at(&app, 0);
        app.toggle_task(&leaf);

        assert_eq!(app.new_day_session(), 0);

        assert_eq!(app.tasks().len(), 2);
        for task in app.tasks() {
            assert!(!task.completed);
            assert_eq!(task.progress, 0);
            assert!(task.subtasks.iter().all(|st| !st.completed));
        }
    }

    #[test]
    fn test_new_day_drop_temporary() {
        let mut app = create_test_app();
        app.config.new_day_policy = NewDayPolicy::DropTemporary;
        let id = id_at(&app, 1);
        app.update_task(&id, TaskDraft::new("Exercise").kind(TaskKind::Temporary));
        let leaf = id_at(&app, 0);
        app.toggle_task(&leaf);

        assert_eq!(app.new_day_session(), 1);
        assert_eq!(titles(&app), vec!["Brush teeth"]);
        assert!(!app.tasks()[0].completed);
    }

    #[test]
    fn test_import_replaces_list() {
        let mut app = create_test_app();
        let raw = r#"{"tasks": [{"id": "x", "title": "One"}, {"id": "x", "title": "Two"}]}"#;

        assert_eq!(app.import_snapshot_at(raw, t0()).unwrap(), 2);
        assert_eq!(titles(&app), vec!["One", "Two"]);
        assert_ne!(app.tasks()[0].id, app.tasks()[1].id);
        assert!(app.needs_save);
    }

    #[test]
    fn test_failed_import_leaves_state() {
        let mut app = create_test_app();
        let before = app.tasks().to_vec();

        assert!(app.import_snapshot_at("{}", t0()).is_err());
        assert!(app
            .import_snapshot_at(r#"[{"id": "1", "title": "ok"}, {"id": "2"}]"#, t0())
            .is_err());

        assert_eq!(app.tasks(), &before[..]);
        assert!(!app.needs_save);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("adhd-tasks.json");

        let mut app = create_test_app();
        let id = id_at(&app, 1);
        app.add_subtask(&id, "Warm up");
        app.start_timer_at(&id, t0());
        app.save(&path).unwrap();
        assert!(!app.needs_save);

        let loaded = AppState::load(&path, quiet_config()).unwrap();
        assert_eq!(loaded.tasks().len(), 2);
        assert_eq!(loaded.task(&id).unwrap().subtasks.len(), 1);
        assert!(!loaded.has_running_timers());
    }

    #[test]
    fn test_open_resumes_timer_without_lock() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("adhd-tasks.json");
        let lock_path = temp_dir.path().join("session.lock");

        let mut app = create_test_app();
        let id = id_at(&app, 1);
        app.start_timer_at(&id, t0());
        app.save(&path).unwrap();

        let mut next = AppState::open(&path, &lock_path, quiet_config(), t0()).unwrap();
        assert_eq!(next.task(&id).unwrap().track.started_at, Some(t0()));
        let credited = next.stop_timer_at(&id, t0() + Duration::seconds(90)).unwrap();
        assert!((credited - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_open_discards_timers_of_dead_session() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("adhd-tasks.json");
        let lock_path = temp_dir.path().join("session.lock");

        let mut app = create_test_app();
        let id = id_at(&app, 1);
        app.start_timer_at(&id, t0());
        app.save(&path).unwrap();
        persistence::write_session_lock(&lock_path, &persistence::SessionLock::new_at(t0(), 1000))
            .unwrap();

        let later = t0() + Duration::hours(1);
        let opened = AppState::open(&path, &lock_path, quiet_config(), later).unwrap();
        assert!(!opened.has_running_timers());
        assert_eq!(opened.task(&id).unwrap().track.time_spent, 0.0);
        assert!(!lock_path.exists());

        // The discard is written back, so it sticks without the lock
        let reopened = AppState::open(&path, &lock_path, quiet_config(), later).unwrap();
        assert!(!reopened.has_running_timers());
    }

    #[test]
    fn test_reload_picks_up_other_writers() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("adhd-tasks.json");

        let mut watcher = create_test_app();
        watcher.save(&path).unwrap();

        let mut other = AppState::resume(&path, quiet_config()).unwrap();
        let id = id_at(&other, 0);
        other.start_timer_at(&id, t0());
        other.save(&path).unwrap();

        watcher.reload(&path).unwrap();
        assert!(watcher.has_running_timers());
        assert!(!watcher.needs_save);
    }

    #[test]
    fn test_failed_save_keeps_state_dirty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("missing-dir").join("adhd-tasks.json");

        let mut app = create_test_app();
        app.add_task(TaskDraft::new("Unsaved"));

        assert!(app.save(&path).is_err());
        assert!(app.needs_save);
        assert_eq!(app.tasks().len(), 3);
    }
}
