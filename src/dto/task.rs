use crate::domain;
use crate::dto::todo::Priority;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

/// How often a task repeats. Unrecognized values are read as "once".
#[derive(Serialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceKind {
    #[default]
    Once,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl<'de> Deserialize<'de> for RecurrenceKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(domain::recurrence::RecurrenceType::from(tag.as_str()).into())
    }
}

impl From<domain::recurrence::RecurrenceType> for RecurrenceKind {
    fn from(value: domain::recurrence::RecurrenceType) -> Self {
        use domain::recurrence::RecurrenceType;

        match value {
            RecurrenceType::Once => Self::Once,
            RecurrenceType::Daily => Self::Daily,
            RecurrenceType::Weekly => Self::Weekly,
            RecurrenceType::Monthly => Self::Monthly,
            RecurrenceType::Yearly => Self::Yearly,
        }
    }
}

impl From<RecurrenceKind> for domain::recurrence::RecurrenceType {
    fn from(value: RecurrenceKind) -> Self {
        match value {
            RecurrenceKind::Once => Self::Once,
            RecurrenceKind::Daily => Self::Daily,
            RecurrenceKind::Weekly => Self::Weekly,
            RecurrenceKind::Monthly => Self::Monthly,
            RecurrenceKind::Yearly => Self::Yearly,
        }
    }
}

/// Constraints on when a recurring task produces its next instance
#[derive(Serialize, Deserialize, Validate, ToSchema, Debug, Clone, PartialEq, Eq, Default)]
pub struct RecurrenceRule {
    #[serde(rename = "type", default)]
    pub kind: RecurrenceKind,
    /// Last date an occurrence may fall on, as `YYYY-MM-DD` or an RFC 3339 timestamp
    #[serde(default)]
    #[schema(example = "2024-12-31")]
    pub end_date: Option<String>,
    /// Days of the week, 0-6 with Sunday first
    #[serde(default)]
    #[validate(custom = "validate_days_of_week")]
    pub days_of_week: Vec<u8>,
    #[serde(default)]
    #[validate(range(min = 1, max = 31))]
    pub day_of_month: Option<u8>,
}

fn validate_days_of_week(days: &[u8]) -> Result<(), ValidationError> {
    if days.iter().all(|day| *day <= 6) {
        Ok(())
    } else {
        Err(ValidationError::new("day_of_week"))
    }
}

/// Accepts a 24-hour `HH:MM` time of day
fn validate_time_of_day(time: &str) -> Result<(), ValidationError> {
    NaiveTime::parse_from_str(time, "%H:%M")
        .map(|_| ())
        .map_err(|_| ValidationError::new("time_of_day"))
}

impl From<RecurrenceRule> for domain::recurrence::RecurrenceRule {
    fn from(value: RecurrenceRule) -> Self {
        domain::recurrence::RecurrenceRule {
            kind: value.kind.into(),
            end_date: value.end_date,
            days_of_week: value.days_of_week,
            day_of_month: value.day_of_month,
        }
    }
}

impl From<domain::recurrence::RecurrenceRule> for RecurrenceRule {
    fn from(value: domain::recurrence::RecurrenceRule) -> Self {
        RecurrenceRule {
            kind: value.kind.into(),
            end_date: value.end_date,
            days_of_week: value.days_of_week,
            day_of_month: value.day_of_month,
        }
    }
}

/// DTO for a returned task on the API
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct Task {
    #[schema(example = 10)]
    pub id: i32,
    #[schema(example = 4)]
    pub owner_user_id: i32,
    #[schema(example = "Water the plants")]
    pub title: String,
    pub description: Option<String>,
    #[schema(example = "Home")]
    pub category: String,
    #[schema(example = "09:30")]
    pub time: String,
    pub recurrence: RecurrenceKind,
    pub recurrence_rule: Option<RecurrenceRule>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub due_date: Option<NaiveDate>,
    pub last_completed_at: Option<DateTime<Utc>>,
    /// Set when this task was generated from a recurring template
    pub parent_task_id: Option<i32>,
    pub points: Option<i32>,
    pub priority: Option<Priority>,
}

impl From<domain::task::Task> for Task {
    fn from(value: domain::task::Task) -> Self {
        Task {
            id: value.id,
            owner_user_id: value.owner_user_id,
            title: value.title,
            description: value.description,
            category: value.category,
            time: value.time,
            recurrence: value.recurrence.into(),
            recurrence_rule: value.recurrence_rule.map(RecurrenceRule::from),
            completed: value.completed,
            created_at: value.created_at,
            due_date: value.due_date,
            last_completed_at: value.last_completed_at,
            parent_task_id: value.parent_task_id,
            points: value.points,
            priority: value.priority.map(Priority::from),
        }
    }
}

/// DTO for creating a new task via the API
#[derive(Serialize, Deserialize, Validate, ToSchema, Debug, Clone)]
pub struct NewTask {
    #[validate(length(min = 1, max = 200))]
    #[schema(example = "Water the plants")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50))]
    #[schema(example = "Home")]
    pub category: String,
    #[validate(custom = "validate_time_of_day")]
    #[schema(example = "09:30")]
    pub time: String,
    #[serde(default)]
    pub recurrence: RecurrenceKind,
    #[serde(default)]
    #[validate]
    pub recurrence_rule: Option<RecurrenceRule>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub points: Option<i32>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

impl From<NewTask> for domain::task::CreateTask {
    fn from(value: NewTask) -> Self {
        domain::task::CreateTask {
            title: value.title,
            description: value.description,
            category: value.category,
            time: value.time,
            recurrence: value.recurrence.into(),
            recurrence_rule: value.recurrence_rule.map(domain::recurrence::RecurrenceRule::from),
            due_date: value.due_date,
            points: value.points,
            priority: value.priority.map(domain::todo::Priority::from),
        }
    }
}

/// DTO for changing some of a task's fields via the API. Omitted fields are left alone.
#[derive(Serialize, Deserialize, Validate, ToSchema, Debug, Clone, Default)]
pub struct UpdateTask {
    #[serde(default)]
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,
    #[serde(default)]
    #[validate(custom = "validate_time_of_day")]
    pub time: Option<String>,
    #[serde(default)]
    pub recurrence: Option<RecurrenceKind>,
    #[serde(default)]
    #[validate]
    pub recurrence_rule: Option<RecurrenceRule>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub points: Option<i32>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

impl From<UpdateTask> for domain::task::UpdateTask {
    fn from(value: UpdateTask) -> Self {
        domain::task::UpdateTask {
            title: value.title,
            description: value.description,
            category: value.category,
            time: value.time,
            recurrence: value.recurrence.map(Into::into),
            recurrence_rule: value.recurrence_rule.map(Into::into),
            due_date: value.due_date,
            points: value.points,
            priority: value.priority.map(Into::into),
        }
    }
}

/// DTO for a newly created task
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct InsertedTask {
    #[schema(example = 5)]
    pub id: i32,
}

/// Request body for marking a task complete or incomplete
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy)]
pub struct TaskCompletion {
    pub completed: bool,
}

/// Result of changing a task's completion state
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct TaskCompletionResult {
    pub task: Task,
    /// ID of the next instance generated for a recurring task, if one was created
    #[schema(example = 11)]
    pub spawned_instance_id: Option<i32>,
}

impl From<domain::task::CompletionOutcome> for TaskCompletionResult {
    fn from(value: domain::task::CompletionOutcome) -> Self {
        TaskCompletionResult {
            task: value.task.into(),
            spawned_instance_id: value.spawned_instance_id,
        }
    }
}

/// A recurring template along with bookkeeping on its generated instances
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct RecurringTaskSummary {
    pub template: Task,
    #[schema(example = 3)]
    pub instance_count: usize,
    pub next_instance_due: bool,
}

impl From<domain::task::RecurringTaskSummary> for RecurringTaskSummary {
    fn from(value: domain::task::RecurringTaskSummary) -> Self {
        RecurringTaskSummary {
            template: value.template.into(),
            instance_count: value.instance_count,
            next_instance_due: value.next_instance_due,
        }
    }
}

/// Number of task records removed by a delete, including generated instances
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct DeletedTasks {
    #[schema(example = 4)]
    pub deleted_count: u64,
}

/// Query parameters for narrowing the task list to a calendar slot
#[derive(Deserialize, Validate, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct TaskQuery {
    /// Only return tasks due on this date. Tasks without a due date count as due today.
    pub date: Option<NaiveDate>,
    /// Only return tasks scheduled during this hour of `date`
    #[validate(range(min = 6, max = 23))]
    pub hour: Option<u32>,
}
