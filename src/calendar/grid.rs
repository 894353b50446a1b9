use chrono::{Datelike, Month, NaiveDate, TimeZone};
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

use super::day::tasks_on_date;
use crate::model::Task;

/// Six weeks of seven days.
pub const GRID_CELLS: usize = 42;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalendarError {
    #[error("year {0} is outside the supported calendar range")]
    OutOfRange(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridLayout {
    /// Leading blanks and the days of the month, nothing after.
    Compact,
    /// Always six rows; the tail is filled with the next month's days.
    Fixed,
}

impl Default for GridLayout {
    fn default() -> Self {
        GridLayout::Fixed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell {
    /// `None` for the blanks before the 1st.
    pub date: Option<NaiveDate>,
    pub in_month: bool,
    pub is_today: bool,
    pub tasks: Vec<Task>,
}

impl DayCell {
    fn blank() -> Self {
        Self {
            date: None,
            in_month: false,
            is_today: false,
            tasks: Vec::new(),
        }
    }

    fn day(date: NaiveDate, in_month: bool) -> Self {
        Self {
            date: Some(date),
            in_month,
            is_today: false,
            tasks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    pub year: i32,
    pub month: Month,
    pub cells: Vec<DayCell>,
}

fn first_of(year: i32, month: Month) -> Result<NaiveDate, CalendarError> {
    NaiveDate::from_ymd_opt(year, month.number_from_month(), 1)
        .ok_or(CalendarError::OutOfRange(year))
}

fn first_of_next(year: i32, month: Month) -> Result<NaiveDate, CalendarError> {
    match month {
        Month::December => first_of(year + 1, Month::January),
        _ => first_of(year, month.succ()),
    }
}

pub fn days_in_month(year: i32, month: Month) -> Result<usize, CalendarError> {
    let first = first_of(year, month)?;
    let next = first_of_next(year, month)?;
    Ok(next.signed_duration_since(first).num_days() as usize)
}

impl MonthGrid {
    pub fn new(year: i32, month: Month, layout: GridLayout) -> Result<Self, CalendarError> {
        let first = first_of(year, month)?;
        let leading = first.weekday().num_days_from_sunday() as usize;
        let days = days_in_month(year, month)?;

        let mut cells = Vec::with_capacity(GRID_CELLS);
        cells.extend((0..leading).map(|_| DayCell::blank()));
        cells.extend(first.iter_days().take(days).map(|d| DayCell::day(d, true)));
        if layout == GridLayout::Fixed {
            let trailing = GRID_CELLS - cells.len();
            let next = first_of_next(year, month)?;
            cells.extend(next.iter_days().take(trailing).map(|d| DayCell::day(d, false)));
        }

        Ok(Self { year, month, cells })
    }

    pub fn days(&self) -> impl Iterator<Item = &DayCell> {
        self.cells.iter().filter(|c| c.in_month)
    }

    /// Flags today's cell and attaches each day's tasks.
    pub fn populate<Tz: TimeZone>(mut self, tasks: &[Task], today: NaiveDate, tz: &Tz) -> Self {
        for cell in self.cells.iter_mut() {
            if let Some(date) = cell.date {
                cell.is_today = date == today;
                cell.tasks = tasks_on_date(tasks, date, tz);
            }
        }
        self
    }
}

/// The fixed six-row grid for `month` of `year`.
pub fn month_grid(year: i32, month: Month) -> Result<MonthGrid, CalendarError> {
    MonthGrid::new(year, month, GridLayout::Fixed)
}

impl fmt::Display for MonthGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.month.name(), self.year)?;
        writeln!(f, " Su   Mo   Tu   We   Th   Fr   Sa")?;
        for week in self.cells.chunks(7) {
            let mut line = String::new();
            for cell in week {
                match cell.date {
                    None => line.push_str("     "),
                    Some(date) => {
                        let (open, close) = if cell.is_today { ('[', ']') } else { (' ', ' ') };
                        let marker = if cell.tasks.is_empty() { ' ' } else { '*' };
                        line.push_str(&format!("{}{:>2}{}{}", open, date.day(), close, marker));
                    }
                }
            }
            writeln!(f, "{}", line.trim_end())?;
        }
        Ok(())
    }
}
