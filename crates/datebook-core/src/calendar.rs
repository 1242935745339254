use chrono::{
  Datelike,
  NaiveDate,
  Weekday
};

use crate::bucket::attach_to_cells;
use crate::period::{
  ViewMode,
  enumerate_days,
  visible_range
};
use crate::task::Task;

/// One rendered day. Rebuilt on every render, never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarCell<'a> {
  pub date:              NaiveDate,
  pub in_current_period: bool,
  pub is_today:          bool,
  pub is_selected:       bool,
  pub tasks:             Vec<&'a Task>
}

pub fn is_in_period(
  date: NaiveDate,
  reference: NaiveDate,
  view: ViewMode,
  week_start: Weekday
) -> bool {
  match view {
    | ViewMode::Month => {
      date.year() == reference.year()
        && date.month()
          == reference.month()
    }
    | ViewMode::Week => {
      let (start, end) = visible_range(
        reference,
        ViewMode::Week,
        week_start
      );
      start <= date && date <= end
    }
    | ViewMode::Day => date == reference
  }
}

pub fn is_today(
  date: NaiveDate,
  today: NaiveDate
) -> bool {
  date == today
}

pub fn is_selected(
  date: NaiveDate,
  selected: Option<NaiveDate>
) -> bool {
  selected == Some(date)
}

/// Empty cells for every visible day of the view.
pub fn build_cells<'a>(
  reference: NaiveDate,
  view: ViewMode,
  week_start: Weekday,
  today: NaiveDate,
  selected: Option<NaiveDate>
) -> Vec<CalendarCell<'a>> {
  let (start, end) = visible_range(
    reference, view, week_start
  );
  enumerate_days(start, end)
    .into_iter()
    .map(|date| {
      CalendarCell {
        date,
        in_current_period:
          is_in_period(
            date, reference, view,
            week_start
          ),
        is_today: is_today(
          date, today
        ),
        is_selected: is_selected(
          date, selected
        ),
        tasks: Vec::new()
      }
    })
    .collect()
}

/// Cells for the view with their tasks attached.
#[tracing::instrument(skip(tasks), fields(tasks = tasks.len()))]
pub fn render_cells<'a>(
  reference: NaiveDate,
  view: ViewMode,
  week_start: Weekday,
  today: NaiveDate,
  selected: Option<NaiveDate>,
  tasks: &'a [Task]
) -> Vec<CalendarCell<'a>> {
  let cells = build_cells(
    reference, view, week_start,
    today, selected
  );
  let cells =
    attach_to_cells(cells, tasks);
  tracing::debug!(
    cells = cells.len(),
    busy_days = cells
      .iter()
      .filter(|cell| {
        !cell.tasks.is_empty()
      })
      .count(),
    "calendar cells built"
  );
  cells
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    Weekday
  };

  use super::*;
  use crate::task::{
    Priority,
    Task
  };

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  fn due_task(
    id: u64,
    due: NaiveDate
  ) -> Task {
    Task {
      id,
      name: format!("task {id}"),
      description: String::new(),
      priority: Priority::Low,
      project: "Project B".to_string(),
      deadline: due
        .and_hms_opt(9, 30, 0)
        .expect("valid time"),
      time_required: "30m".to_string()
    }
  }

  #[test]
  fn month_cells_flag_filler_days() {
    let cells: Vec<CalendarCell<'_>> =
      build_cells(
        date(2025, 3, 15),
        ViewMode::Month,
        Weekday::Sun,
        date(2025, 3, 15),
        Some(date(2025, 3, 10))
      );
    assert_eq!(cells.len(), 42);
    assert!(!cells[0].in_current_period);
    assert_eq!(
      cells
        .iter()
        .filter(|cell| {
          cell.in_current_period
        })
        .count(),
      31
    );
    let today = cells
      .iter()
      .filter(|cell| cell.is_today)
      .collect::<Vec<_>>();
    assert_eq!(today.len(), 1);
    assert_eq!(
      today[0].date,
      date(2025, 3, 15)
    );
    assert!(
      cells
        .iter()
        .any(|cell| {
          cell.is_selected
            && cell.date
              == date(2025, 3, 10)
        })
    );
  }

  #[test]
  fn predicates_are_independent() {
    let day = date(2025, 4, 2);
    let reference = date(2025, 3, 31);
    assert!(!is_in_period(
      day,
      reference,
      ViewMode::Month,
      Weekday::Sun
    ));
    assert!(is_in_period(
      day,
      reference,
      ViewMode::Week,
      Weekday::Sun
    ));
    assert!(is_today(day, day));
    assert!(is_selected(day, Some(day)));
    assert!(!is_selected(day, None));
  }

  #[test]
  fn render_cells_attaches_tasks_per_day() {
    let tasks = vec![
      due_task(1, date(2025, 3, 3)),
      due_task(2, date(2025, 3, 9)),
      due_task(3, date(2025, 3, 10))
    ];
    let cells = render_cells(
      date(2025, 3, 5),
      ViewMode::Week,
      Weekday::Mon,
      date(2025, 1, 1),
      None,
      &tasks
    );
    assert_eq!(cells.len(), 7);
    assert!(
      cells
        .iter()
        .all(|cell| cell.in_current_period)
    );
    let ids = cells
      .iter()
      .flat_map(|cell| {
        cell.tasks.iter().map(|task| task.id)
      })
      .collect::<Vec<_>>();
    assert_eq!(ids, vec![1, 2]);
  }
}
