use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{TaskField, ValidationError};
use crate::period::is_supported_date;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L" | "LOW" => Ok(Self::Low),
            "M" | "MEDIUM" => Ok(Self::Medium),
            "H" | "HIGH" => Ok(Self::High),
            other => Err(anyhow!("invalid priority: {other} (expected LOW, MEDIUM or HIGH)")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u64,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub priority: Priority,

    pub project: String,

    pub deadline: NaiveDateTime,

    #[serde(default)]
    pub time_required: String,
}

impl Task {
    pub fn from_new(id: u64, new: &NewTask) -> Self {
        Self {
            id,
            name: new.name.clone(),
            description: new.description.clone(),
            priority: new.priority,
            project: new.project.clone(),
            deadline: new.deadline,
            time_required: new.time_required.clone(),
        }
    }

    pub fn deadline_day(&self) -> NaiveDate {
        self.deadline.date()
    }
}

/// A validated task awaiting an id from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub name: String,
    pub description: String,
    pub priority: Priority,
    pub project: String,
    pub deadline: NaiveDateTime,
    pub time_required: String,
}

impl NewTask {
    /// Required text fields that are blank. Stores call this before writing.
    pub fn missing_fields(&self) -> Vec<TaskField> {
        blank_fields([
            (TaskField::Name, self.name.as_str()),
            (TaskField::TimeRequired, self.time_required.as_str()),
            (TaskField::Project, self.project.as_str()),
        ])
    }
}

/// Raw entries of the add-task form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskForm {
    pub name: String,
    pub description: String,
    pub priority: Priority,
    pub project: String,
    pub deadline: String,
    pub time_required: String,
}

impl TaskForm {
    pub fn validate(&self, today: NaiveDate) -> Result<NewTask, ValidationError> {
        let missing = blank_fields([
            (TaskField::Name, self.name.as_str()),
            (TaskField::Deadline, self.deadline.as_str()),
            (TaskField::TimeRequired, self.time_required.as_str()),
            (TaskField::Project, self.project.as_str()),
        ]);
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        let deadline = parse_deadline(&self.deadline, today)?;

        Ok(NewTask {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            priority: self.priority,
            project: self.project.trim().to_string(),
            deadline,
            time_required: self.time_required.trim().to_string(),
        })
    }
}

fn blank_fields<const N: usize>(fields: [(TaskField, &str); N]) -> Vec<TaskField> {
    fields
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parses a deadline entry. Date-only input lands at midnight; offsets in
/// RFC 3339 input are dropped so the written calendar day is kept. Years
/// outside the calendar's supported range are rejected.
#[tracing::instrument(skip(today))]
pub fn parse_deadline(input: &str, today: NaiveDate) -> Result<NaiveDateTime, ValidationError> {
    let token = input.trim();
    parse_deadline_token(token, today)
        .filter(|deadline| is_supported_date(deadline.date()))
        .ok_or_else(|| ValidationError::InvalidDeadline(token.to_string()))
}

fn parse_deadline_token(token: &str, today: NaiveDate) -> Option<NaiveDateTime> {
    let relative = match token.to_ascii_lowercase().as_str() {
        "today" => Some(today),
        "tomorrow" => today.checked_add_days(Days::new(1)),
        "yesterday" => today.checked_sub_days(Days::new(1)),
        _ => None,
    };
    if let Some(day) = relative {
        return Some(day.and_time(NaiveTime::MIN));
    }

    if let Ok(day) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
        return Some(day.and_time(NaiveTime::MIN));
    }

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(token) {
        return Some(with_offset.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(token, format).ok())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Timelike};

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 15).expect("valid date")
    }

    fn filled_form() -> TaskForm {
        TaskForm {
            name: "Write report".to_string(),
            description: "quarterly numbers".to_string(),
            priority: Priority::High,
            project: "Project A".to_string(),
            deadline: "2025-03-10".to_string(),
            time_required: "2h".to_string(),
        }
    }

    #[test]
    fn accepts_complete_form() {
        let new = filled_form().validate(today()).expect("valid form");
        assert_eq!(new.name, "Write report");
        assert_eq!(new.priority, Priority::High);
        assert_eq!(new.deadline.date(), NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid date"));
        assert_eq!(new.deadline.hour(), 0);
    }

    #[test]
    fn reports_every_blank_required_field() {
        let form = TaskForm {
            name: "  ".to_string(),
            time_required: String::new(),
            ..filled_form()
        };
        let err = form.validate(today()).expect_err("blank fields");
        assert_eq!(
            err,
            ValidationError::MissingFields(vec![TaskField::Name, TaskField::TimeRequired])
        );
        assert!(err.to_string().contains("name, time required"));
    }

    #[test]
    fn description_may_be_empty() {
        let form = TaskForm {
            description: String::new(),
            ..filled_form()
        };
        assert!(form.validate(today()).is_ok());
    }

    #[test]
    fn rejects_unparseable_deadline() {
        let form = TaskForm {
            deadline: "2025-02-30".to_string(),
            ..filled_form()
        };
        let err = form.validate(today()).expect_err("bad deadline");
        assert_eq!(err.offending_fields(), vec![TaskField::Deadline]);
    }

    #[test]
    fn parses_deadline_with_time_of_day() {
        let parsed = parse_deadline("2025-03-10T23:59", today()).expect("parse");
        assert_eq!(parsed.format("%Y-%m-%d %H:%M").to_string(), "2025-03-10 23:59");
    }

    #[test]
    fn rfc3339_keeps_written_calendar_day() {
        let parsed = parse_deadline("2025-03-10T23:30:00-08:00", today()).expect("parse");
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid date"));
    }

    #[test]
    fn parses_relative_words() {
        let parsed = parse_deadline("Tomorrow", today()).expect("parse");
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2025, 3, 16).expect("valid date"));
    }

    #[test]
    fn rejects_years_the_calendar_cannot_show() {
        for raw in ["+262142-12-20", "0000-06-01", "+20000-01-01T10:00"] {
            assert_eq!(
                parse_deadline(raw, today()),
                Err(ValidationError::InvalidDeadline(raw.to_string())),
                "{raw}"
            );
        }
        assert!(parse_deadline("9999-12-31T23:59", today()).is_ok());
    }

    #[test]
    fn keeps_fractional_seconds() {
        let parsed = parse_deadline("2025-03-10T23:59:59.500", today()).expect("parse");
        assert_eq!(parsed.nanosecond(), 500_000_000);
    }

    #[test]
    fn priority_accepts_short_and_long_forms() {
        assert_eq!("h".parse::<Priority>().expect("parse"), Priority::High);
        assert_eq!("Low".parse::<Priority>().expect("parse"), Priority::Low);
        assert!("urgent".parse::<Priority>().is_err());
    }
}
