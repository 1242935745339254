use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::calendar::CalendarCell;
use crate::task::Task;

/// Year, month and day agree; time of day is ignored.
pub fn same_calendar_day(deadline: NaiveDateTime, date: NaiveDate) -> bool {
    deadline.year() == date.year() && deadline.month() == date.month() && deadline.day() == date.day()
}

/// Tasks due on `date`, in the order they appear in `tasks`.
pub fn tasks_on_date(tasks: &[Task], date: NaiveDate) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|task| same_calendar_day(task.deadline, date))
        .collect()
}

#[tracing::instrument(skip_all, fields(cells = cells.len(), tasks = tasks.len()))]
pub fn attach_to_cells<'a>(mut cells: Vec<CalendarCell<'a>>, tasks: &'a [Task]) -> Vec<CalendarCell<'a>> {
    for cell in &mut cells {
        cell.tasks = tasks_on_date(tasks, cell.date);
    }
    cells
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::task::{Priority, parse_deadline};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn task(id: u64, name: &str, deadline: &str) -> Task {
        Task {
            id,
            name: name.to_string(),
            description: String::new(),
            priority: Priority::Medium,
            project: "Project A".to_string(),
            deadline: parse_deadline(deadline, day(2025, 1, 1)).expect("valid deadline"),
            time_required: "1h".to_string(),
        }
    }

    fn cell(date: NaiveDate) -> CalendarCell<'static> {
        CalendarCell {
            date,
            in_current_period: true,
            is_today: false,
            is_selected: false,
            tasks: vec![],
        }
    }

    #[test]
    fn time_of_day_is_ignored() {
        let tasks = vec![
            task(1, "morning", "2025-03-10"),
            task(2, "late", "2025-03-10T23:59"),
            task(3, "next day", "2025-03-11T00:00"),
        ];
        let names: Vec<_> = tasks_on_date(&tasks, day(2025, 3, 10))
            .into_iter()
            .map(|task| task.name.as_str())
            .collect();
        assert_eq!(names, vec!["morning", "late"]);
    }

    #[test]
    fn each_task_lands_on_exactly_one_day() {
        let tasks = vec![
            task(1, "a", "2024-02-28T12:00"),
            task(2, "b", "2024-02-29"),
            task(3, "c", "2024-03-01T08:15"),
        ];
        let days = crate::period::enumerate_days(day(2024, 2, 20), day(2024, 3, 10));
        for task in &tasks {
            let hits: Vec<_> = days
                .iter()
                .filter(|date| tasks_on_date(&tasks, **date).iter().any(|hit| hit.id == task.id))
                .collect();
            assert_eq!(hits, vec![&task.deadline.date()]);
        }
    }

    #[test]
    fn same_day_ties_keep_input_order() {
        let tasks = vec![
            task(7, "zeta", "2025-03-10"),
            task(3, "alpha", "2025-03-10"),
            task(5, "mid", "2025-03-10"),
        ];
        let ids: Vec<u64> = tasks_on_date(&tasks, day(2025, 3, 10)).iter().map(|task| task.id).collect();
        assert_eq!(ids, vec![7, 3, 5]);
    }

    #[test]
    fn attach_fills_cells_and_leaves_tasks_untouched() {
        let tasks = vec![task(1, "a", "2025-03-10"), task(2, "b", "2025-03-12")];
        let before = tasks.clone();
        let cells = vec![cell(day(2025, 3, 10)), cell(day(2025, 3, 11)), cell(day(2025, 3, 12))];

        let cells = attach_to_cells(cells, &tasks);

        let counts: Vec<usize> = cells.iter().map(|cell| cell.tasks.len()).collect();
        assert_eq!(counts, vec![1, 0, 1]);
        assert!(std::ptr::eq(cells[0].tasks[0], &tasks[0]));
        assert_eq!(tasks, before);
    }
}
