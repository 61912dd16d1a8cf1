use serde::{Deserialize, Serialize};

/// Icon shown next to a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TaskIcon {
    Sun,
    CloudSun,
    Moon,
    Plus,
    Check,
    #[default]
    Circle,
    Trash2,
    Star,
    Trophy,
    ListTodo,
    X,
    CheckCircle2,
    BookOpen,
    Utensils,
    Shirt,
    Toothbrush,
    Gamepad2,
    Music,
    Palette,
    Home,
    Backpack,
    Activity,
    ChevronUp,
    ChevronDown,
    Clock,
}

impl TaskIcon {
    /// Parse an icon by its exact name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|icon| icon.name() == name)
    }

    /// Parse an icon, falling back to `Circle` for anything unknown
    pub fn normalize(name: &str) -> Self {
        Self::from_name(name.trim()).unwrap_or_default()
    }

    /// Name used in snapshots and export files
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sun => "Sun",
            Self::CloudSun => "CloudSun",
            Self::Moon => "Moon",
            Self::Plus => "Plus",
            Self::Check => "Check",
            Self::Circle => "Circle",
            Self::Trash2 => "Trash2",
            Self::Star => "Star",
            Self::Trophy => "Trophy",
            Self::ListTodo => "ListTodo",
            Self::X => "X",
            Self::CheckCircle2 => "CheckCircle2",
            Self::BookOpen => "BookOpen",
            Self::Utensils => "Utensils",
            Self::Shirt => "Shirt",
            Self::Toothbrush => "Toothbrush",
            Self::Gamepad2 => "Gamepad2",
            Self::Music => "Music",
            Self::Palette => "Palette",
            Self::Home => "Home",
            Self::Backpack => "Backpack",
            Self::Activity => "Activity",
            Self::ChevronUp => "ChevronUp",
            Self::ChevronDown => "ChevronDown",
            Self::Clock => "Clock",
        }
    }

    /// Every known icon
    pub fn all() -> &'static [TaskIcon] {
        &[
            Self::Sun,
            Self::CloudSun,
            Self::Moon,
            Self::Plus,
            Self::Check,
            Self::Circle,
            Self::Trash2,
            Self::Star,
            Self::Trophy,
            Self::ListTodo,
            Self::X,
            Self::CheckCircle2,
            Self::BookOpen,
            Self::Utensils,
            Self::Shirt,
            Self::Toothbrush,
            Self::Gamepad2,
            Self::Music,
            Self::Palette,
            Self::Home,
            Self::Backpack,
            Self::Activity,
            Self::ChevronUp,
            Self::ChevronDown,
            Self::Clock,
        ]
    }

    /// Icons offered when creating or editing a task
    pub fn pickable() -> &'static [TaskIcon] {
        &[
            Self::BookOpen,
            Self::Utensils,
            Self::Shirt,
            Self::Toothbrush,
            Self::Gamepad2,
            Self::Music,
            Self::Palette,
            Self::Home,
            Self::Backpack,
            Self::Moon,
            Self::Activity,
        ]
    }
}

/// Whether a task survives a new day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Repeats every day
    #[default]
    Daily,
    /// One-off work
    Temporary,
}

impl TaskKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_lowercase().as_str() {
            "daily" => Some(Self::Daily),
            "temporary" => Some(Self::Temporary),
            _ => None,
        }
    }

    pub fn to_tag(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Temporary => "temporary",
        }
    }
}

/// What a new day does with the task list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewDayPolicy {
    /// Keep every task and clear completion
    #[default]
    KeepAll,
    /// Clear completion and discard temporary tasks
    DropTemporary,
}

/// How toggling a task that has subtasks behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentToggle {
    /// Flip the flag and let the subtasks decide on recompute
    #[default]
    Direct,
    /// Push the flipped value down to every subtask
    Cascade,
    /// Ignore the toggle
    Blocked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_from_name() {
        assert_eq!(TaskIcon::from_name("BookOpen"), Some(TaskIcon::BookOpen));
        assert_eq!(TaskIcon::from_name("Gamepad2"), Some(TaskIcon::Gamepad2));
        assert_eq!(TaskIcon::from_name("bookopen"), None);
        assert_eq!(TaskIcon::from_name("Rocket"), None);
    }

    #[test]
    fn test_icon_normalize_defaults_to_circle() {
        assert_eq!(TaskIcon::normalize("Rocket"), TaskIcon::Circle);
        assert_eq!(TaskIcon::normalize(""), TaskIcon::Circle);
        assert_eq!(TaskIcon::normalize(" Moon "), TaskIcon::Moon);
    }

    #[test]
    fn test_icon_names_round_trip() {
        for icon in TaskIcon::all() {
            assert_eq!(TaskIcon::from_name(icon.name()), Some(*icon));
        }
        assert_eq!(TaskIcon::all().len(), 25);
    }

    #[test]
    fn test_pickable_icons_are_known() {
        for icon in TaskIcon::pickable() {
            assert!(TaskIcon::all().contains(icon));
        }
    }

    #[test]
    fn test_task_kind_tags() {
        assert_eq!(TaskKind::from_tag("daily"), Some(TaskKind::Daily));
        assert_eq!(TaskKind::from_tag("TEMPORARY"), Some(TaskKind::Temporary));
        assert_eq!(TaskKind::from_tag("weekly"), None);
        assert_eq!(TaskKind::Temporary.to_tag(), "temporary");
    }

    #[test]
    fn test_policy_defaults() {
        assert_eq!(NewDayPolicy::default(), NewDayPolicy::KeepAll);
        assert_eq!(ParentToggle::default(), ParentToggle::Direct);
    }
}
