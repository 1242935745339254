use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// A form field that can be flagged back to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskField {
    Name,
    Project,
    Deadline,
    TimeRequired,
}

impl TaskField {
    pub fn as_key(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Project => "project",
            Self::Deadline => "deadline",
            Self::TimeRequired => "time required",
        }
    }
}

impl fmt::Display for TaskField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("please fill in all required fields (missing: {})", join_fields(.0))]
    MissingFields(Vec<TaskField>),
    #[error("deadline is not a valid date: {0:?}")]
    InvalidDeadline(String),
}

impl ValidationError {
    /// Fields the form should highlight.
    pub fn offending_fields(&self) -> Vec<TaskField> {
        match self {
            Self::MissingFields(fields) => fields.clone(),
            Self::InvalidDeadline(_) => vec![TaskField::Deadline],
        }
    }
}

fn join_fields(fields: &[TaskField]) -> String {
    fields
        .iter()
        .map(|field| field.as_key())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store rejected task: {0}")]
    Rejected(String),
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed record in {} line {line}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },
    #[error("failed to encode task: {0}")]
    Json(#[from] serde_json::Error),
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("database schema version {found} is newer than supported {supported}")]
    UnsupportedSchema { found: u32, supported: u32 },
    #[error("invalid persisted task data: {0}")]
    InvalidData(String),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to add task: {0}")]
    Store(#[from] StoreError),
}
