use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use std::fmt::{Display, Formatter};

/// How often a task repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecurrenceType {
    #[default]
    Once,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurrenceType {
    /// The lowercase tag used for this recurrence type in storage and on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Once => "once",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    pub fn is_recurring(&self) -> bool {
        !matches!(self, Self::Once)
    }
}

/// Unrecognized tags are treated as non-recurring rather than rejected
impl From<&str> for RecurrenceType {
    fn from(value: &str) -> Self {
        match value {
            "daily" => Self::Daily,
            "weekly" => Self::Weekly,
            "monthly" => Self::Monthly,
            "yearly" => Self::Yearly,
            _ => Self::Once,
        }
    }
}

impl Display for RecurrenceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Once => "Once",
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
            Self::Yearly => "Yearly",
        };

        f.write_str(label)
    }
}

/// Describes when a recurring task should produce its next instance
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecurrenceRule {
    pub kind: RecurrenceType,
    /// Last day an occurrence may fall on. Kept as supplied so a malformed value
    /// stops recurrence instead of failing the request that completes the task.
    pub end_date: Option<String>,
    /// 0-6, Sunday first
    pub days_of_week: Vec<u8>,
    pub day_of_month: Option<u8>,
}

impl RecurrenceRule {
    /// A rule with no constraints beyond the recurrence type
    pub fn of_kind(kind: RecurrenceType) -> Self {
        RecurrenceRule {
            kind,
            ..Default::default()
        }
    }
}

/// Result of evaluating a [RecurrenceRule]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextOccurrence {
    On(NaiveDate),
    /// The rule will not produce any further occurrences
    Never,
}

impl NextOccurrence {
    pub fn date(self) -> Option<NaiveDate> {
        match self {
            Self::On(date) => Some(date),
            Self::Never => None,
        }
    }
}

/// Computes the date of the occurrence following [reference] according to [rule].
///
/// Month and year steps clamp to the last valid day of the target month, so January 31st
/// is followed by the last day of February and February 29th by February 28th of the next
/// year. An occurrence past the rule's end date, an end date that can't be read, or a date
/// outside the representable range all produce [NextOccurrence::Never].
pub fn next_occurrence(reference: NaiveDate, rule: &RecurrenceRule) -> NextOccurrence {
    let next = match rule.kind {
        RecurrenceType::Once => None,
        RecurrenceType::Daily => reference.checked_add_days(Days::new(1)),
        RecurrenceType::Weekly => reference.checked_add_days(Days::new(7)),
        RecurrenceType::Monthly => reference.checked_add_months(Months::new(1)),
        RecurrenceType::Yearly => reference.checked_add_months(Months::new(12)),
    };
    let Some(next) = next else {
        return NextOccurrence::Never;
    };

    if let Some(ref raw_end) = rule.end_date {
        match parse_calendar_date(raw_end) {
            Some(end_date) if next <= end_date => {}
            _ => return NextOccurrence::Never,
        }
    }

    NextOccurrence::On(next)
}

/// Determines whether enough time has passed since [last_completed] for a recurring task to
/// be due again. Tasks that have never been completed are measured from the Unix epoch.
pub fn should_generate_next_instance(
    last_completed: Option<DateTime<Utc>>,
    rule: &RecurrenceRule,
    today: NaiveDate,
) -> bool {
    if !rule.kind.is_recurring() {
        return false;
    }

    let reference = last_completed
        .map(|completed_at| completed_at.date_naive())
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH.date_naive());

    match next_occurrence(reference, rule) {
        NextOccurrence::On(next) => today >= next,
        NextOccurrence::Never => false,
    }
}

/// Reads a calendar date from either a plain `YYYY-MM-DD` string or an RFC 3339 timestamp
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|timestamp| timestamp.with_timezone(&Utc).date_naive())
        })
}
