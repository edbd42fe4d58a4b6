use crate::domain;
use crate::dto::stats::UserStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Importance tier of a todo, which also fixes how many points it's worth
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl From<domain::todo::Priority> for Priority {
    fn from(value: domain::todo::Priority) -> Self {
        match value {
            domain::todo::Priority::Low => Self::Low,
            domain::todo::Priority::Medium => Self::Medium,
            domain::todo::Priority::High => Self::High,
        }
    }
}

impl From<Priority> for domain::todo::Priority {
    fn from(value: Priority) -> Self {
        match value {
            Priority::Low => Self::Low,
            Priority::Medium => Self::Medium,
            Priority::High => Self::High,
        }
    }
}

/// DTO for a returned todo on the API
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct Todo {
    #[schema(example = 7)]
    pub id: i32,
    #[schema(example = 4)]
    pub owner_user_id: i32,
    #[schema(example = "Call the dentist")]
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    #[schema(example = 3)]
    pub points: i32,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub category: Option<String>,
}

impl From<domain::todo::Todo> for Todo {
    fn from(value: domain::todo::Todo) -> Self {
        Todo {
            id: value.id,
            owner_user_id: value.owner_user_id,
            title: value.title,
            description: value.description,
            completed: value.completed,
            points: value.points,
            priority: value.priority.into(),
            created_at: value.created_at,
            completed_at: value.completed_at,
            category: value.category,
        }
    }
}

/// DTO for creating a todo. Points come from the priority and can't be set directly.
#[derive(Serialize, Deserialize, Validate, ToSchema, Debug, Clone)]
pub struct NewTodo {
    #[validate(length(min = 1, max = 200))]
    #[schema(example = "Call the dentist")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,
}

impl From<NewTodo> for domain::todo::CreateTodo {
    fn from(value: NewTodo) -> Self {
        domain::todo::CreateTodo {
            title: value.title,
            description: value.description,
            priority: value.priority.into(),
            category: value.category,
        }
    }
}

/// DTO for changing some of a todo's fields. Omitted fields are left alone.
#[derive(Serialize, Deserialize, Validate, ToSchema, Debug, Clone, Default)]
pub struct UpdateTodo {
    #[serde(default)]
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,
}

impl From<UpdateTodo> for domain::todo::UpdateTodo {
    fn from(value: UpdateTodo) -> Self {
        domain::todo::UpdateTodo {
            title: value.title,
            description: value.description,
            priority: value.priority.map(Into::into),
            category: value.category,
        }
    }
}

/// DTO for a newly created todo
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct InsertedTodo {
    #[schema(example = 7)]
    pub id: i32,
}

/// Request body for marking a todo complete or incomplete
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy)]
pub struct TodoCompletion {
    pub completed: bool,
}

/// The todo after its completion changed, along with the owner's resulting stats
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct TodoCompletionResult {
    pub todo: Todo,
    pub stats: UserStats,
}

impl From<domain::todo::TodoCompletionOutcome> for TodoCompletionResult {
    fn from(value: domain::todo::TodoCompletionOutcome) -> Self {
        TodoCompletionResult {
            todo: value.todo.into(),
            stats: value.stats.into(),
        }
    }
}
