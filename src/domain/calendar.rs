use crate::domain::task::Task;
use chrono::NaiveDate;
use std::ops::RangeInclusive;

/// Hours of the day shown on the day planner
pub const HOUR_SLOTS: RangeInclusive<u32> = 6..=23;

/// Top-level tasks scheduled on [day]. A task without a due date is treated as due [today].
pub fn tasks_for_date(tasks: &[Task], day: NaiveDate, today: NaiveDate) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|task| !task.is_instance() && task.due_date.unwrap_or(today) == day)
        .collect()
}

/// Like [tasks_for_date], narrowed to tasks whose scheduled time falls in [hour]
pub fn tasks_for_date_and_hour(
    tasks: &[Task],
    day: NaiveDate,
    hour: u32,
    today: NaiveDate,
) -> Vec<&Task> {
    tasks_for_date(tasks, day, today)
        .into_iter()
        .filter(|task| scheduled_hour(&task.time) == Some(hour))
        .collect()
}

/// The hour portion of an `HH:MM` time, if there is one
fn scheduled_hour(time: &str) -> Option<u32> {
    let (hour, _minutes) = time.split_once(':')?;
    hour.trim().parse().ok()
}
