//! Calendar period math: which days a view shows, how navigation moves the
//! reference date, and the header label for each view.
//!
//! Everything here is a pure function of its arguments. Callers keep
//! reference dates inside `SUPPORTED_YEARS`; dates near the edge of
//! chrono's range are a programmer error and panic.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{
  Datelike,
  Days,
  NaiveDate,
  Weekday
};
use serde::{
  Deserialize,
  Serialize
};

/// Weeks start on Sunday unless `calendar.weekstart` says otherwise.
pub const DEFAULT_WEEK_START: Weekday =
  Weekday::Sun;

/// Years a reference date may fall in. Grids and navigation reach at most
/// a few weeks past the reference.
pub const SUPPORTED_YEARS: RangeInclusive<
  i32
> = 1..=9999;

pub fn is_supported_date(
  date: NaiveDate
) -> bool {
  SUPPORTED_YEARS.contains(&date.year())
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
  #[default]
  Month,
  Week,
  Day
}

impl ViewMode {
  pub fn all() -> [Self; 3] {
    [Self::Month, Self::Week, Self::Day]
  }

  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Month => "month",
      | Self::Week => "week",
      | Self::Day => "day"
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      | Self::Month => "Month",
      | Self::Week => "Week",
      | Self::Day => "Day"
    }
  }

  pub fn from_key(
    raw: &str
  ) -> Option<Self> {
    Self::all().into_iter().find(
      |mode| {
        raw
          .trim()
          .eq_ignore_ascii_case(
            mode.as_key()
          )
      }
    )
  }
}

impl fmt::Display for ViewMode {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_key())
  }
}

impl FromStr for ViewMode {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    Self::from_key(s).ok_or_else(|| {
      anyhow!(
        "invalid view mode: {s} \
         (expected month, week or \
         day)"
      )
    })
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Direction {
  Forward,
  Backward
}

impl Direction {
  fn step(self) -> i32 {
    match self {
      | Self::Forward => 1,
      | Self::Backward => -1
    }
  }
}

pub fn parse_week_start(
  raw: &str
) -> Weekday {
  if raw
    .trim()
    .eq_ignore_ascii_case("monday")
  {
    Weekday::Mon
  } else {
    DEFAULT_WEEK_START
  }
}

/// First and last day (inclusive) shown for `view` around `reference`.
///
/// Month view always covers whole weeks, so it includes filler days from
/// the neighbouring months.
pub fn visible_range(
  reference: NaiveDate,
  view: ViewMode,
  week_start: Weekday
) -> (NaiveDate, NaiveDate) {
  match view {
    | ViewMode::Month => {
      let first = first_day_of_month(
        reference.year(),
        reference.month()
      );
      let last = last_day_of_month(
        reference.year(),
        reference.month()
      );
      (
        start_of_week(
          first, week_start
        ),
        end_of_week(last, week_start)
      )
    }
    | ViewMode::Week => {
      (
        start_of_week(
          reference, week_start
        ),
        end_of_week(
          reference, week_start
        )
      )
    }
    | ViewMode::Day => {
      (reference, reference)
    }
  }
}

/// Every day from `start` through `end`, ascending. Empty when
/// `end < start`.
pub fn enumerate_days(
  start: NaiveDate,
  end: NaiveDate
) -> Vec<NaiveDate> {
  start
    .iter_days()
    .take_while(|day| *day <= end)
    .collect()
}

/// Moves `reference` one period forward or back. Month moves keep the
/// day of month, clamped to the target month's last day.
pub fn advance(
  reference: NaiveDate,
  view: ViewMode,
  direction: Direction
) -> NaiveDate {
  let step = direction.step();
  match view {
    | ViewMode::Month => {
      shift_months(reference, step)
    }
    | ViewMode::Week => {
      add_days(
        reference,
        i64::from(step) * 7
      )
    }
    | ViewMode::Day => {
      add_days(
        reference,
        i64::from(step)
      )
    }
  }
}

pub fn label(
  reference: NaiveDate,
  view: ViewMode,
  week_start: Weekday
) -> String {
  match view {
    | ViewMode::Month => {
      reference
        .format("%B %Y")
        .to_string()
    }
    | ViewMode::Week => {
      let (start, end) = visible_range(
        reference,
        ViewMode::Week,
        week_start
      );
      format!(
        "{} \u{2013} {}",
        start.format("%b %-d"),
        end.format("%b %-d, %Y")
      )
    }
    | ViewMode::Day => {
      reference
        .format("%B %-d, %Y")
        .to_string()
    }
  }
}

pub fn weekday_labels(
  week_start: Weekday
) -> [&'static str; 7] {
  let mut labels = [""; 7];
  let mut day = week_start;
  for slot in &mut labels {
    *slot = short_weekday(day);
    day = day.succ();
  }
  labels
}

fn short_weekday(
  day: Weekday
) -> &'static str {
  match day {
    | Weekday::Mon => "Mon",
    | Weekday::Tue => "Tue",
    | Weekday::Wed => "Wed",
    | Weekday::Thu => "Thu",
    | Weekday::Fri => "Fri",
    | Weekday::Sat => "Sat",
    | Weekday::Sun => "Sun"
  }
}

pub fn start_of_week(
  day: NaiveDate,
  week_start: Weekday
) -> NaiveDate {
  let day_idx = day
    .weekday()
    .num_days_from_monday()
    as i64;
  let start_idx = week_start
    .num_days_from_monday()
    as i64;
  let diff =
    (7 + day_idx - start_idx) % 7;
  add_days(day, -diff)
}

pub fn end_of_week(
  day: NaiveDate,
  week_start: Weekday
) -> NaiveDate {
  add_days(
    start_of_week(day, week_start),
    6
  )
}

pub fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  ymd(year, month, 1)
}

pub fn last_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  let (next_year, next_month) =
    if month >= 12 {
      (year + 1, 1_u32)
    } else {
      (year, month + 1)
    };
  add_days(
    first_day_of_month(
      next_year, next_month
    ),
    -1
  )
}

pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  last_day_of_month(year, month).day()
}

pub fn shift_months(
  date: NaiveDate,
  months: i32
) -> NaiveDate {
  let total = date.year() * 12
    + date.month0() as i32
    + months;
  let year = total.div_euclid(12);
  let month =
    total.rem_euclid(12) as u32 + 1;
  let day = date
    .day()
    .min(days_in_month(year, month));
  ymd(year, month, day)
}

fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  let shifted = if days >= 0 {
    date.checked_add_days(Days::new(
      days.unsigned_abs()
    ))
  } else {
    date.checked_sub_days(Days::new(
      days.unsigned_abs()
    ))
  };
  shifted.unwrap_or_else(|| {
    panic!(
      "date arithmetic out of range: \
       {date} {days:+} days"
    )
  })
}

fn ymd(
  year: i32,
  month: u32,
  day: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, day
  )
  .unwrap_or_else(|| {
    panic!(
      "date out of range: \
       {year}-{month:02}-{day:02}"
    )
  })
}

#[cfg(test)]
mod tests {
  use chrono::{
    Datelike,
    NaiveDate,
    Weekday
  };

  use super::*;

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  fn every_day_of(
    years: std::ops::RangeInclusive<
      i32
    >
  ) -> Vec<NaiveDate> {
    enumerate_days(
      date(*years.start(), 1, 1),
      date(*years.end(), 12, 31)
    )
  }

  #[test]
  fn month_range_covers_whole_weeks_around_reference(
  ) {
    for week_start in
      [Weekday::Sun, Weekday::Mon]
    {
      for day in every_day_of(2023..=2025)
      {
        let (start, end) = visible_range(
          day,
          ViewMode::Month,
          week_start
        );
        let len = (end - start)
          .num_days()
          + 1;
        assert_eq!(len % 7, 0, "{day}");
        assert!(
          (28..=42).contains(&len),
          "{day}"
        );
        assert!(
          start <= day && day <= end,
          "{day}"
        );
        assert_eq!(
          start.weekday(),
          week_start
        );
      }
    }
  }

  #[test]
  fn week_range_is_seven_consecutive_days(
  ) {
    for day in every_day_of(2024..=2024)
    {
      let (start, end) = visible_range(
        day,
        ViewMode::Week,
        DEFAULT_WEEK_START
      );
      let days =
        enumerate_days(start, end);
      assert_eq!(days.len(), 7);
      assert!(days.contains(&day));
      assert!(days.windows(2).all(
        |pair| {
          (pair[1] - pair[0])
            .num_days()
            == 1
        }
      ));
    }
  }

  #[test]
  fn day_range_is_the_reference() {
    let day = date(2025, 3, 15);
    assert_eq!(
      visible_range(
        day,
        ViewMode::Day,
        DEFAULT_WEEK_START
      ),
      (day, day)
    );
  }

  #[test]
  fn march_2025_month_grid() {
    let (start, end) = visible_range(
      date(2025, 3, 15),
      ViewMode::Month,
      Weekday::Sun
    );
    assert_eq!(start, date(2025, 2, 23));
    assert_eq!(end, date(2025, 4, 5));
    assert_eq!(
      enumerate_days(start, end).len(),
      42
    );
  }

  #[test]
  fn february_starting_on_week_start_needs_four_weeks(
  ) {
    let (start, end) = visible_range(
      date(2015, 2, 10),
      ViewMode::Month,
      Weekday::Sun
    );
    assert_eq!(start, date(2015, 2, 1));
    assert_eq!(end, date(2015, 2, 28));
  }

  #[test]
  fn enumerate_days_handles_single_and_inverted_ranges(
  ) {
    let day = date(2024, 2, 29);
    assert_eq!(
      enumerate_days(day, day),
      vec![day]
    );
    assert!(
      enumerate_days(
        day,
        date(2024, 2, 28)
      )
      .is_empty()
    );
  }

  #[test]
  fn advancing_month_clamps_to_last_day(
  ) {
    assert_eq!(
      advance(
        date(2025, 3, 31),
        ViewMode::Month,
        Direction::Forward
      ),
      date(2025, 4, 30)
    );
    assert_eq!(
      advance(
        date(2024, 1, 31),
        ViewMode::Month,
        Direction::Forward
      ),
      date(2024, 2, 29)
    );
    assert_eq!(
      advance(
        date(2025, 3, 30),
        ViewMode::Month,
        Direction::Backward
      ),
      date(2025, 2, 28)
    );
    assert_eq!(
      advance(
        date(2025, 1, 15),
        ViewMode::Month,
        Direction::Backward
      ),
      date(2024, 12, 15)
    );
  }

  #[test]
  fn month_round_trip_stays_in_month() {
    for day in every_day_of(2023..=2024)
    {
      let there = advance(
        day,
        ViewMode::Month,
        Direction::Forward
      );
      let back = advance(
        there,
        ViewMode::Month,
        Direction::Backward
      );
      assert_eq!(
        (back.year(), back.month()),
        (day.year(), day.month()),
        "{day}"
      );
    }
  }

  #[test]
  fn week_and_day_steps() {
    let day = date(2024, 12, 30);
    assert_eq!(
      advance(
        day,
        ViewMode::Week,
        Direction::Forward
      ),
      date(2025, 1, 6)
    );
    assert_eq!(
      advance(
        day,
        ViewMode::Day,
        Direction::Backward
      ),
      date(2024, 12, 29)
    );
  }

  #[test]
  fn labels_per_view() {
    let day = date(2025, 3, 5);
    assert_eq!(
      label(
        day,
        ViewMode::Month,
        Weekday::Mon
      ),
      "March 2025"
    );
    assert_eq!(
      label(
        day,
        ViewMode::Week,
        Weekday::Mon
      ),
      "Mar 3 \u{2013} Mar 9, 2025"
    );
    assert_eq!(
      label(
        day,
        ViewMode::Day,
        Weekday::Mon
      ),
      "March 5, 2025"
    );
  }

  #[test]
  fn weekday_labels_follow_week_start() {
    assert_eq!(
      weekday_labels(Weekday::Sun)[0],
      "Sun"
    );
    assert_eq!(
      weekday_labels(Weekday::Mon),
      [
        "Mon", "Tue", "Wed", "Thu",
        "Fri", "Sat", "Sun"
      ]
    );
  }

  #[test]
  fn supported_dates_stop_at_four_digit_years(
  ) {
    assert!(is_supported_date(date(
      1, 1, 1
    )));
    assert!(is_supported_date(date(
      9999, 12, 31
    )));
    assert!(!is_supported_date(
      date(0, 12, 31)
    ));
    assert!(!is_supported_date(
      date(10000, 1, 1)
    ));
    assert!(!is_supported_date(
      NaiveDate::MAX
    ));

    let (_, end) = visible_range(
      date(9999, 12, 31),
      ViewMode::Month,
      Weekday::Sun
    );
    assert_eq!(end.year(), 10000);
  }

  #[test]
  fn view_mode_keys() {
    assert_eq!(
      "Week"
        .parse::<ViewMode>()
        .expect("parse"),
      ViewMode::Week
    );
    assert!(
      "year".parse::<ViewMode>().is_err()
    );
    assert_eq!(
      parse_week_start("Monday"),
      Weekday::Mon
    );
    assert_eq!(
      parse_week_start("bogus"),
      Weekday::Sun
    );
  }
}
