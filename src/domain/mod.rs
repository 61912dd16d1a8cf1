pub mod derive;
pub mod enums;
pub mod item;
pub mod timer;
pub mod views;

pub use derive::{progress_of, recompute, recompute_task};
pub use enums::{NewDayPolicy, ParentToggle, TaskIcon, TaskKind};
pub use item::{new_id, Subtask, Task};
pub use timer::{format_countdown, format_minutes, sanitize_estimate, TimeTracking};
pub use views::{compute_totals, day_summary, status_badge, time_label, tree_connector, DaySummary};
