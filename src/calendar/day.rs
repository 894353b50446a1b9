use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::model::Task;

/// Calendar day of `task` as seen from `tz`.
pub fn local_day<Tz: TimeZone>(task: &Task, tz: &Tz) -> NaiveDate {
    task.created_at.with_timezone(tz).date_naive()
}

/// Tasks created on `date` in `tz`, in input order.
pub fn tasks_on_date<Tz: TimeZone>(tasks: &[Task], date: NaiveDate, tz: &Tz) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| local_day(task, tz) == date)
        .cloned()
        .collect()
}

/// Tasks created at or after `now`, soonest first.
pub fn upcoming_tasks(tasks: &[Task], now: DateTime<Utc>) -> Vec<Task> {
    let mut upcoming: Vec<Task> = tasks
        .iter()
        .filter(|task| task.created_at >= now)
        .cloned()
        .collect();
    upcoming.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    upcoming
}
