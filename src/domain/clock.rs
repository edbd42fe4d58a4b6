use chrono::{DateTime, NaiveDate, Utc};

/// Source of the current time. Completion timestamps, due dates, and streak day boundaries
/// are all derived from it, so tests can pin "now" to a known instant.
pub trait Clock: Sync {
    fn now(&self) -> DateTime<Utc>;

    /// The current UTC calendar date
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Reads the system clock
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
