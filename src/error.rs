//! Errors surfaced when reading an external snapshot.

/// Why an import was rejected. The existing list is never touched when one
/// of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The text is not JSON at all
    #[error("file is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// JSON, but neither `{ "tasks": [...] }` nor a bare array
    #[error("unsupported file format: expected an object with a \"tasks\" array or an array of tasks")]
    UnsupportedShape,

    /// A task entry is not an object
    #[error("task #{position} is not an object")]
    NotAnObject { position: usize },

    /// A required task field is missing or empty
    #[error("task #{position} is missing a required field: {field}")]
    MissingField {
        position: usize,
        field: &'static str,
    },

    /// A field has a type that cannot be used
    #[error("task #{position} has an invalid {field}")]
    InvalidField {
        position: usize,
        field: &'static str,
    },

    /// A subtask entry is malformed
    #[error("task #{position}, subtask #{subtask}: {reason}")]
    InvalidSubtask {
        position: usize,
        subtask: usize,
        reason: &'static str,
    },
}
