use std::path::Path;

use anyhow::{Context, anyhow};
use chrono::{Local, NaiveDate};
use tracing::{debug, error, info, instrument, warn};

use crate::cli::Invocation;
use crate::config::Config;
use crate::error::SubmitError;
use crate::period::{Direction, ViewMode};
use crate::render::Renderer;
use crate::store::TaskStore;
use crate::task::{Priority, TaskForm, parse_deadline};
use crate::view::{ViewState, load_prefs, save_prefs};

pub const VIEW_STATE_FILE: &str = "view.toml";

const ADD_KEYS: [&str; 7] = ["project", "due", "deadline", "priority", "time", "desc", "description"];

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "calendar",
        "month",
        "week",
        "day",
        "next",
        "prev",
        "today",
        "goto",
        "select",
        "add",
        "list",
        "projects",
        "_commands",
        "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &str, known: &[&'a str]) -> Option<&'a str> {
    if let Some(exact) = known.iter().copied().find(|name| *name == token) {
        return Some(exact);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(store, cfg, renderer, data_dir, inv), fields(command = %inv.command))]
pub fn dispatch(
    store: &mut dyn TaskStore,
    cfg: &Config,
    renderer: &Renderer,
    data_dir: &Path,
    inv: Invocation,
) -> anyhow::Result<()> {
    let today = Local::now().date_naive();
    run_command(store, cfg, renderer, data_dir, inv, today)
}

fn run_command(
    store: &mut dyn TaskStore,
    cfg: &Config,
    renderer: &Renderer,
    data_dir: &Path,
    inv: Invocation,
    today: NaiveDate,
) -> anyhow::Result<()> {
    let command = inv.command.as_str();
    debug!(command, args = ?inv.command_args, "dispatching command");

    match command {
        "help" => return cmd_help(),
        "_commands" => return cmd_commands(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    let prefs_path = data_dir.join(VIEW_STATE_FILE);
    let mut state = open_view(cfg, &prefs_path, today)?;
    if let Err(err) = state.load_tasks(&*store) {
        warn!(error = %err, "initial task fetch failed; showing an empty calendar");
        eprintln!("warning: could not load tasks: {err}");
    }

    match command {
        "calendar" => {}
        "month" => state.set_view(ViewMode::Month),
        "week" => state.set_view(ViewMode::Week),
        "day" => state.set_view(ViewMode::Day),
        "next" => state.navigate(Direction::Forward),
        "prev" => state.navigate(Direction::Backward),
        "today" => state.go_to(today),
        "goto" => state.go_to(date_argument(command, &inv.command_args, today)?),
        "select" => cmd_select(&mut state, &inv.command_args, today)?,
        "add" => cmd_add(store, &mut state, &inv.command_args, today)?,
        "list" => return renderer.print_task_table(state.tasks()),
        "projects" => return renderer.print_projects(state.projects()),
        other => return Err(anyhow!("unknown command: {other}")),
    }

    save_prefs(&prefs_path, &state.prefs())
        .with_context(|| format!("failed to save view state to {}", prefs_path.display()))?;
    renderer.print_calendar(&state, today)
}

/// Restores the last navigation state, or starts on today with the
/// configured view.
fn open_view(cfg: &Config, prefs_path: &Path, today: NaiveDate) -> anyhow::Result<ViewState> {
    let week_start = cfg.week_start();
    let seeds = cfg.get_list("projects.default");

    match load_prefs(prefs_path) {
        Ok(Some(prefs)) => return Ok(ViewState::from_prefs(&prefs, week_start, seeds)),
        Ok(None) => {}
        Err(err) => {
            let detail = format!("{err:#}");
            warn!(error = %detail, "ignoring unreadable view state");
        }
    }

    Ok(ViewState::new(today, cfg.default_view()?, week_start, seeds))
}

fn date_argument(command: &str, args: &[String], today: NaiveDate) -> anyhow::Result<NaiveDate> {
    let raw = args
        .first()
        .ok_or_else(|| anyhow!("{command} needs a date (YYYY-MM-DD, today, tomorrow or yesterday)"))?;
    let parsed = parse_deadline(raw, today).with_context(|| format!("{command}: cannot read date {raw:?}"))?;
    Ok(parsed.date())
}

#[instrument(skip(state, args, today))]
fn cmd_select(state: &mut ViewState, args: &[String], today: NaiveDate) -> anyhow::Result<()> {
    if args.first().is_some_and(|arg| arg == "none") {
        state.select(None);
        return Ok(());
    }

    let date = date_argument("select", args, today)?;
    state.select(Some(date));
    Ok(())
}

#[instrument(skip(store, state, args, today))]
fn cmd_add(
    store: &mut dyn TaskStore,
    state: &mut ViewState,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command add");
    let form = parse_add_args(args)?;

    match state.submit(store, &form, today) {
        Ok(task) => {
            println!("Created task {}.", task.id);
            state.go_to(task.deadline_day());
        }
        Err(SubmitError::Validation(err)) => {
            eprintln!("error: {err}");
        }
        Err(SubmitError::Store(err)) => {
            error!(error = %err, "task was not saved");
            eprintln!("error: could not save task: {err}");
        }
    }
    Ok(())
}

/// Splits `add` arguments into the form: bare words make up the name and
/// `key:value` words fill the other fields.
pub fn parse_add_args(args: &[String]) -> anyhow::Result<TaskForm> {
    let mut form = TaskForm::default();
    let mut name_words = Vec::new();

    for arg in args {
        let modifier = arg
            .split_once(':')
            .and_then(|(key, value)| expand_command_abbrev(key, &ADD_KEYS).map(|key| (key, value)));

        let Some((key, value)) = modifier else {
            name_words.push(arg.as_str());
            continue;
        };

        match key {
            "project" => form.project = value.to_string(),
            "due" | "deadline" => form.deadline = value.to_string(),
            "priority" => form.priority = value.parse::<Priority>()?,
            "time" => form.time_required = value.to_string(),
            _ => form.description = value.to_string(),
        }
    }

    form.name = name_words.join(" ");
    Ok(form)
}

fn cmd_commands() -> anyhow::Result<()> {
    for command in known_command_names() {
        println!("{command}");
    }
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!(
        "Commands: calendar, month, week, day, next, prev, today, goto DATE, select DATE|none, \
         add NAME... project:P due:DATE time:T [priority:L|M|H] [desc:TEXT], list, projects, version"
    );
    Ok(())
}
