//! The mutable state behind a calendar screen and the only place that talks
//! to the store. Period math and bucketing stay pure; this module feeds them.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, anyhow};
use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::calendar::{CalendarCell, render_cells};
use crate::error::{StoreError, SubmitError};
use crate::period::{self, Direction, ViewMode};
use crate::store::TaskStore;
use crate::task::{Task, TaskForm};

#[derive(Debug, Clone)]
pub struct ViewState {
    pub reference_date: NaiveDate,
    pub view_mode: ViewMode,
    pub selected_date: Option<NaiveDate>,
    pub week_start: Weekday,
    tasks: Vec<Task>,
    projects: Vec<String>,
    loaded: bool,
}

impl ViewState {
    pub fn new(reference_date: NaiveDate, view_mode: ViewMode, week_start: Weekday, seed_projects: Vec<String>) -> Self {
        let mut state = Self {
            reference_date,
            view_mode,
            selected_date: None,
            week_start,
            tasks: Vec::new(),
            projects: Vec::new(),
            loaded: false,
        };
        for project in seed_projects {
            state.remember_project(&project);
        }
        state
    }

    pub fn from_prefs(prefs: &ViewPrefs, week_start: Weekday, seed_projects: Vec<String>) -> Self {
        let mut state = Self::new(prefs.reference_date, prefs.view_mode, week_start, seed_projects);
        state.selected_date = prefs.selected_date;
        state
    }

    pub fn prefs(&self) -> ViewPrefs {
        ViewPrefs {
            reference_date: self.reference_date,
            view_mode: self.view_mode,
            selected_date: self.selected_date,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Known project labels: seeds first, then in first-seen order.
    pub fn projects(&self) -> &[String] {
        &self.projects
    }

    /// Startup fetch. On success the fetched list replaces local tasks; later
    /// calls are no-ops. On failure nothing changes and the error is returned.
    #[tracing::instrument(skip(self, store))]
    pub fn load_tasks<S: TaskStore + ?Sized>(&mut self, store: &S) -> Result<usize, StoreError> {
        if self.loaded {
            debug!("tasks already loaded; skipping fetch");
            return Ok(self.tasks.len());
        }

        let fetched = store.list_tasks()?;
        for task in &fetched {
            self.remember_project(&task.project);
        }
        self.tasks = fetched;
        self.loaded = true;

        info!(count = self.tasks.len(), "tasks loaded");
        Ok(self.tasks.len())
    }

    /// Validates the form, asks the store to create the task and appends the
    /// stored copy. Local state only changes after the store confirms.
    #[tracing::instrument(skip(self, store, form), fields(name = %form.name))]
    pub fn submit<S: TaskStore + ?Sized>(
        &mut self,
        store: &mut S,
        form: &TaskForm,
        today: NaiveDate,
    ) -> Result<Task, SubmitError> {
        let new = form.validate(today).inspect_err(|err| {
            warn!(error = %err, fields = ?err.offending_fields(), "task form rejected");
        })?;

        let created = store.create_task(&new)?;
        self.remember_project(&created.project);
        self.tasks.push(created.clone());

        info!(id = created.id, total = self.tasks.len(), "task added");
        Ok(created)
    }

    /// Steps one period. A step that would leave the supported years is
    /// ignored.
    pub fn navigate(&mut self, direction: Direction) {
        let next = period::advance(self.reference_date, self.view_mode, direction);
        if !period::is_supported_date(next) {
            warn!(reference = %self.reference_date, %next, "navigation stopped at the calendar edge");
            return;
        }
        self.reference_date = next;
        debug!(reference = %self.reference_date, view = %self.view_mode, ?direction, "navigated");
    }

    pub fn set_view(&mut self, view_mode: ViewMode) {
        self.view_mode = view_mode;
    }

    pub fn go_to(&mut self, date: NaiveDate) {
        self.reference_date = date;
    }

    pub fn select(&mut self, date: Option<NaiveDate>) {
        self.selected_date = date;
    }

    pub fn label(&self) -> String {
        period::label(self.reference_date, self.view_mode, self.week_start)
    }

    pub fn cells(&self, today: NaiveDate) -> Vec<CalendarCell<'_>> {
        render_cells(
            self.reference_date,
            self.view_mode,
            self.week_start,
            today,
            self.selected_date,
            &self.tasks,
        )
    }

    fn remember_project(&mut self, project: &str) {
        let project = project.trim();
        if project.is_empty() || self.projects.iter().any(|known| known == project) {
            return;
        }
        self.projects.push(project.to_string());
    }
}

/// Navigation state carried between invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewPrefs {
    pub reference_date: NaiveDate,
    pub view_mode: ViewMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_date: Option<NaiveDate>,
}

#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn load_prefs(path: &Path) -> anyhow::Result<Option<ViewPrefs>> {
    if !path.exists() {
        debug!("no saved view state");
        return Ok(None);
    }

    let raw = fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))?;
    let prefs = toml::from_str::<ViewPrefs>(&raw).with_context(|| format!("failed parsing {}", path.display()))?;
    let out_of_range = std::iter::once(prefs.reference_date)
        .chain(prefs.selected_date)
        .find(|date| !period::is_supported_date(*date));
    if let Some(date) = out_of_range {
        return Err(anyhow!("{}: date {date} is outside the supported years", path.display()));
    }
    Ok(Some(prefs))
}

#[tracing::instrument(skip(path, prefs), fields(path = %path.display()))]
pub fn save_prefs(path: &Path, prefs: &ViewPrefs) -> anyhow::Result<()> {
    let serialized = toml::to_string(prefs).context("failed to serialize view state")?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(serialized.as_bytes())?;
    temp.flush()?;
    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;
    Ok(())
}
