use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::anyhow;
use tracing::info;

use crate::datastore::DataStore;
use crate::error::StoreError;
use crate::sqlite::SqliteStore;
use crate::task::{NewTask, Task};

/// The persistence collaborator behind the calendar.
///
/// `list_tasks` order is whatever the backend keeps; callers treat it as the
/// display order. `create_task` returns the stored task with its new id and
/// must not write anything when it fails.
pub trait TaskStore {
    fn list_tasks(&self) -> Result<Vec<Task>, StoreError>;

    fn create_task(&mut self, new: &NewTask) -> Result<Task, StoreError>;
}

/// Rejects tasks with blank required fields before they reach a backend.
pub fn check_required(new: &NewTask) -> Result<(), StoreError> {
    let missing = new.missing_fields();
    if missing.is_empty() {
        return Ok(());
    }

    let names = missing
        .iter()
        .map(|field| field.as_key())
        .collect::<Vec<_>>()
        .join(", ");
    Err(StoreError::Rejected(format!("missing required fields: {names}")))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Backend {
    #[default]
    Sqlite,
    Jsonl,
}

impl Backend {
    pub fn as_key(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Jsonl => "jsonl",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "db" => Ok(Self::Sqlite),
            "jsonl" | "json" | "file" => Ok(Self::Jsonl),
            other => Err(anyhow!("invalid data.backend: {other} (expected sqlite or jsonl)")),
        }
    }
}

#[tracing::instrument(skip(data_dir), fields(data_dir = %data_dir.display()))]
pub fn open_store(backend: Backend, data_dir: &Path) -> Result<Box<dyn TaskStore>, StoreError> {
    info!(%backend, "opening task store");
    let store: Box<dyn TaskStore> = match backend {
        Backend::Sqlite => Box::new(SqliteStore::open(&data_dir.join("tasks.db"))?),
        Backend::Jsonl => Box::new(DataStore::open(data_dir)?),
    };
    Ok(store)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::task::Priority;

    fn new_task(name: &str) -> NewTask {
        NewTask {
            name: name.to_string(),
            description: String::new(),
            priority: Priority::Medium,
            project: "Project C".to_string(),
            deadline: NaiveDate::from_ymd_opt(2025, 3, 10)
                .and_then(|day| day.and_hms_opt(0, 0, 0))
                .expect("valid deadline"),
            time_required: "1h".to_string(),
        }
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = check_required(&new_task(" ")).expect_err("rejected");
        assert!(matches!(err, StoreError::Rejected(message) if message.contains("name")));
        assert!(check_required(&new_task("ok")).is_ok());
    }

    #[test]
    fn backend_keys() {
        assert_eq!("JSONL".parse::<Backend>().expect("parse"), Backend::Jsonl);
        assert_eq!(Backend::default().to_string(), "sqlite");
        assert!("postgres".parse::<Backend>().is_err());
    }
}
