//! Relational task store on SQLite.
//!
//! Schema changes are applied in order on open and tracked through
//! `PRAGMA user_version`. A database written by a newer build is refused.

use std::path::Path;
use std::time::Instant;

use chrono::NaiveDateTime;
use rusqlite::{Connection, params};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::store::{TaskStore, check_required};
use crate::task::{NewTask, Priority, Task};

const DEADLINE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: "CREATE TABLE tasks (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        task_name     TEXT NOT NULL CHECK (length(trim(task_name)) > 0),
        description   TEXT NOT NULL DEFAULT '',
        priority      TEXT NOT NULL CHECK (priority IN ('LOW', 'MEDIUM', 'HIGH')),
        project       TEXT NOT NULL,
        deadline      TEXT NOT NULL,
        time_required TEXT NOT NULL,
        created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
    );
    CREATE INDEX idx_tasks_deadline ON tasks (deadline);",
}];

const TASK_SELECT_SQL: &str = "SELECT
    id,
    task_name,
    description,
    priority,
    project,
    deadline,
    time_required
FROM tasks
ORDER BY id";

pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    #[tracing::instrument(skip(path), fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let started_at = Instant::now();
        let conn = Connection::open(path)?;
        let store = Self::bootstrap(conn)?;
        info!(
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "opened sqlite store"
        );
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(mut conn: Connection) -> Result<Self, StoreError> {
        apply_migrations(&mut conn)?;
        Ok(Self { conn })
    }

    pub fn schema_version(&self) -> Result<u32, StoreError> {
        current_user_version(&self.conn)
    }
}

impl TaskStore for SqliteStore {
    #[tracing::instrument(skip(self))]
    fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let mut stmt = self.conn.prepare(TASK_SELECT_SQL)?;
        let rows = stmt.query_map([], |row| {
            Ok(TaskRow {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                priority: row.get(3)?,
                project: row.get(4)?,
                deadline: row.get(5)?,
                time_required: row.get(6)?,
            })
        })?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?.into_task()?);
        }
        debug!(count = tasks.len(), "loaded tasks from sqlite");
        Ok(tasks)
    }

    #[tracing::instrument(skip(self, new), fields(name = %new.name))]
    fn create_task(&mut self, new: &NewTask) -> Result<Task, StoreError> {
        check_required(new)?;

        self.conn.execute(
            "INSERT INTO tasks (
                task_name,
                description,
                priority,
                project,
                deadline,
                time_required
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                new.name.as_str(),
                new.description.as_str(),
                new.priority.as_str(),
                new.project.as_str(),
                new.deadline.format(DEADLINE_FORMAT).to_string(),
                new.time_required.as_str(),
            ],
        )?;

        let id = u64::try_from(self.conn.last_insert_rowid())
            .map_err(|_| StoreError::InvalidData("negative row id".to_string()))?;
        debug!(id, "task inserted");
        Ok(Task::from_new(id, new))
    }
}

struct TaskRow {
    id: i64,
    name: String,
    description: String,
    priority: String,
    project: String,
    deadline: String,
    time_required: String,
}

impl TaskRow {
    fn into_task(self) -> Result<Task, StoreError> {
        let id = u64::try_from(self.id)
            .map_err(|_| StoreError::InvalidData(format!("negative task id {}", self.id)))?;
        let priority = self
            .priority
            .parse::<Priority>()
            .map_err(|err| StoreError::InvalidData(format!("task {id}: {err}")))?;
        let deadline = NaiveDateTime::parse_from_str(&self.deadline, DEADLINE_FORMAT).map_err(|err| {
            StoreError::InvalidData(format!("task {id}: deadline {:?}: {err}", self.deadline))
        })?;

        Ok(Task {
            id,
            name: self.name,
            description: self.description,
            priority,
            project: self.project,
            deadline,
            time_required: self.time_required,
        })
    }
}

fn current_user_version(conn: &Connection) -> Result<u32, StoreError> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

fn apply_migrations(conn: &mut Connection) -> Result<(), StoreError> {
    let current = current_user_version(conn)?;
    let latest = latest_version();

    if current > latest {
        warn!(current, latest, "database schema is newer than this build");
        return Err(StoreError::UnsupportedSchema {
            found: current,
            supported: latest,
        });
    }

    if current == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS.iter().filter(|migration| migration.version > current) {
        debug!(version = migration.version, "applying migration");
        tx.execute_batch(migration.sql)?;
        tx.pragma_update(None, "user_version", migration.version)?;
    }
    tx.commit()?;

    info!(from = current, to = latest, "schema migrated");
    Ok(())
}
