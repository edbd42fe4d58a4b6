pub mod analytics;
pub mod calendar;
pub mod clock;
pub mod recurrence;
pub mod stats;
pub mod task;
pub mod todo;
pub mod user;

#[cfg(test)]
pub mod test_util;
