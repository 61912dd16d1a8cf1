//! Daily task checklist with subtasks, progress tracking and per-task timers.

pub mod app;
pub mod domain;
pub mod error;
pub mod notifications;
pub mod persistence;
pub mod ticker;

pub use app::{AppState, AutoStop, TaskDraft};
pub use error::ImportError;
