use std::io::{self, IsTerminal, Write};

use chrono::{NaiveDate, NaiveTime, Weekday};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::calendar::CalendarCell;
use crate::colors::ColorMap;
use crate::config::Config;
use crate::period::{ViewMode, weekday_labels};
use crate::task::Task;
use crate::view::ViewState;

const CELL_WIDTH: usize = 14;
const MONTH_CHIP_LIMIT: usize = 3;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    colors: ColorMap,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color = cfg.get_bool("color")?.unwrap_or(true);

        Ok(Self {
            color: color && io::stdout().is_terminal(),
            colors: ColorMap::from_config(cfg),
        })
    }

    #[tracing::instrument(skip(self, state, today), fields(view = %state.view_mode))]
    pub fn print_calendar(&self, state: &ViewState, today: NaiveDate) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_calendar(&mut out, state, today)
    }

    pub fn write_calendar<W: Write>(&self, mut out: W, state: &ViewState, today: NaiveDate) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint(&state.label(), "1"))?;
        writeln!(out)?;

        let cells = state.cells(today);
        match state.view_mode {
            ViewMode::Month => self.write_grid(&mut out, &cells, state.week_start, MONTH_CHIP_LIMIT),
            ViewMode::Week => self.write_grid(&mut out, &cells, state.week_start, usize::MAX),
            ViewMode::Day => self.write_day(&mut out, &cells),
        }
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn print_task_table(&self, tasks: &[Task]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_task_table(&mut out, tasks)
    }

    pub fn write_task_table<W: Write>(&self, out: W, tasks: &[Task]) -> anyhow::Result<()> {
        let headers = ["ID", "Name", "Description", "Priority", "Project", "Deadline", "Time Required"]
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();

        let rows = tasks
            .iter()
            .map(|task| {
                vec![
                    self.paint(&task.id.to_string(), "33"),
                    task.name.clone(),
                    task.description.clone(),
                    task.priority.to_string(),
                    self.paint(&task.project, self.colors.color_for(&task.project).ansi_code()),
                    format_deadline(task),
                    task.time_required.clone(),
                ]
            })
            .collect();

        write_table(out, headers, rows)
    }

    pub fn print_projects(&self, projects: &[String]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        for project in projects {
            let color = self.colors.color_for(project);
            writeln!(out, "{} {}", self.paint(&fit(project, CELL_WIDTH), color.ansi_code()), color)?;
        }
        Ok(())
    }

    fn write_grid<W: Write>(
        &self,
        out: &mut W,
        cells: &[CalendarCell<'_>],
        week_start: Weekday,
        chip_limit: usize,
    ) -> anyhow::Result<()> {
        let header = weekday_labels(week_start)
            .iter()
            .map(|label| fit(label, CELL_WIDTH))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(out, "{}", header.trim_end())?;

        for week in cells.chunks(7) {
            let days = week.iter().map(|cell| self.day_marker(cell)).collect::<Vec<_>>();
            writeln!(out, "{}", days.join(" ").trim_end())?;

            let depth = week.iter().map(|cell| chip_rows(cell, chip_limit)).max().unwrap_or(0);
            for line in 0..depth {
                let row = week
                    .iter()
                    .map(|cell| self.chip(cell, line, chip_limit))
                    .collect::<Vec<_>>();
                writeln!(out, "{}", row.join(" ").trim_end())?;
            }
        }

        Ok(())
    }

    fn write_day<W: Write>(&self, out: &mut W, cells: &[CalendarCell<'_>]) -> anyhow::Result<()> {
        let tasks = cells.first().map(|cell| cell.tasks.as_slice()).unwrap_or_default();
        if tasks.is_empty() {
            writeln!(out, "No tasks scheduled for this day.")?;
            return Ok(());
        }

        for task in tasks {
            let color = self.colors.color_for(&task.project);
            writeln!(out, "- {}", self.paint(&task.name, color.ansi_code()))?;
            writeln!(
                out,
                "  Project: {} | Priority: {} | Time: {}",
                task.project, task.priority, task.time_required
            )?;
            if !task.description.is_empty() {
                writeln!(out, "  {}", task.description)?;
            }
        }
        Ok(())
    }

    fn day_marker(&self, cell: &CalendarCell<'_>) -> String {
        let day = cell.date.format("%-d").to_string();
        let label = match (cell.is_today, cell.is_selected) {
            (true, true) => format!("[*{day}]"),
            (true, false) => format!("[{day}]"),
            (false, true) => format!("*{day}"),
            (false, false) => day,
        };
        let text = fit(&label, CELL_WIDTH);

        if !cell.in_current_period {
            self.paint(&text, "90")
        } else if cell.is_today {
            self.paint(&text, "1;7")
        } else if cell.is_selected {
            self.paint(&text, "4")
        } else {
            text
        }
    }

    fn chip(&self, cell: &CalendarCell<'_>, line: usize, chip_limit: usize) -> String {
        let shown = cell.tasks.len().min(chip_limit);
        if let Some(task) = cell.tasks.get(line).filter(|_| line < shown) {
            let color = self.colors.color_for(&task.project);
            return self.paint(&fit(&task.name, CELL_WIDTH), color.ansi_code());
        }
        if line == shown && cell.tasks.len() > shown {
            return fit(&format!("+{} more", cell.tasks.len() - shown), CELL_WIDTH);
        }
        " ".repeat(CELL_WIDTH)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn chip_rows(cell: &CalendarCell<'_>, chip_limit: usize) -> usize {
    let shown = cell.tasks.len().min(chip_limit);
    shown + usize::from(cell.tasks.len() > shown)
}

fn format_deadline(task: &Task) -> String {
    if task.deadline.time() == NaiveTime::MIN {
        task.deadline.format("%Y-%m-%d").to_string()
    } else {
        task.deadline.format("%Y-%m-%d %H:%M").to_string()
    }
}

/// Pads or truncates `text` to exactly `width` terminal columns.
fn fit(text: &str, width: usize) -> String {
    let total = UnicodeWidthStr::width(text);
    let budget = if total > width { width.saturating_sub(1) } else { width };

    let mut out = String::with_capacity(width);
    let mut used = 0;
    for ch in text.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + ch_width > budget {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    if total > width {
        out.push('\u{2026}');
        used += 1;
    }
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}

fn write_table<W: Write>(mut writer: W, headers: Vec<String>, rows: Vec<Vec<String>>) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (cell, width) in row.iter().zip(&widths) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
