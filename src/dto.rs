use crate::routing_utils::{BasicErrorResponse, ExtraInfo, ValidationErrorSchema};
use utoipa::OpenApi;

pub mod analytics;
pub mod stats;
pub mod task;
pub mod todo;
pub mod user;

pub use analytics::*;
pub use stats::*;
pub use task::*;
pub use todo::*;
pub use user::*;

/// Collects the schemas of every DTO exchanged over the API so they show up in the generated docs
#[derive(OpenApi)]
#[openapi(
    components(
        schemas(
            User,
            NewUser,
            InsertedUser,
            RecurrenceKind,
            RecurrenceRule,
            Task,
            NewTask,
            UpdateTask,
            InsertedTask,
            TaskCompletion,
            TaskCompletionResult,
            RecurringTaskSummary,
            DeletedTasks,
            Priority,
            Todo,
            NewTodo,
            UpdateTodo,
            InsertedTodo,
            TodoCompletion,
            TodoCompletionResult,
            UserStats,
            UpdateStats,
            TaskStats,
            CategoryStats,
            DailyStats,
            ProductivityTrend,
            TaskAnalytics,
            BasicErrorResponse,
            ExtraInfo,
            ValidationErrorSchema,
        ),
        responses(BasicErrorResponse),
    )
)]
pub struct OpenApiSchemas;
