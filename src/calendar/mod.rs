//! Pure views over a task list: per-day buckets, upcoming tasks and month grids.
//!
//! Nothing here performs I/O or mutates its input. Day boundaries are taken
//! in the time zone the caller passes in.

mod day;
mod grid;

pub use day::{local_day, tasks_on_date, upcoming_tasks};
pub use grid::{days_in_month, month_grid, CalendarError, DayCell, GridLayout, MonthGrid, GRID_CELLS};
