use std::collections::HashSet;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::store::{TaskStore, check_required};
use crate::task::{NewTask, Task};

/// Tasks kept one JSON object per line in `tasks.data`.
#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub tasks_path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)?;

        let tasks_path = data_dir.join("tasks.data");
        if !tasks_path.exists() {
            fs::write(&tasks_path, "")?;
        }

        info!(
            data_dir = %data_dir.display(),
            tasks = %tasks_path.display(),
            "opened datastore"
        );

        Ok(Self { data_dir, tasks_path })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_tasks(&self) -> Result<Vec<Task>, StoreError> {
        load_jsonl(&self.tasks_path)
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn save_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        save_jsonl_atomic(&self.tasks_path, tasks)
    }

    pub fn next_id(&self, tasks: &[Task]) -> Result<u64, StoreError> {
        let highest = tasks.iter().map(|t| t.id).max().unwrap_or(0);
        highest
            .checked_add(1)
            .ok_or_else(|| StoreError::InvalidData(format!("no task id left after {highest}")))
    }
}

impl TaskStore for DataStore {
    fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        self.load_tasks()
    }

    #[tracing::instrument(skip(self, new), fields(name = %new.name))]
    fn create_task(&mut self, new: &NewTask) -> Result<Task, StoreError> {
        check_required(new)?;

        let mut tasks = self.load_tasks()?;
        let task = Task::from_new(self.next_id(&tasks)?, new);
        tasks.push(task.clone());
        self.save_tasks(&tasks)?;

        debug!(id = task.id, count = tasks.len(), "task appended");
        Ok(task)
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl(path: &Path) -> Result<Vec<Task>, StoreError> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let task: Task = serde_json::from_str(trimmed).map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            line: idx + 1,
            source,
        })?;
        if !seen.insert(task.id) {
            return Err(StoreError::InvalidData(format!(
                "{} line {}: duplicate task id {}",
                path.display(),
                idx + 1,
                task.id
            )));
        }
        out.push(task);
    }

    debug!(count = out.len(), "loaded tasks from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, tasks))]
fn save_jsonl_atomic(path: &Path, tasks: &[Task]) -> Result<(), StoreError> {
    debug!(file = %path.display(), count = tasks.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for task in tasks {
        let serialized = serde_json::to_string(task)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path).map_err(|err| StoreError::Io(err.error))?;

    Ok(())
}
