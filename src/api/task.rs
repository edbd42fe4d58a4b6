use crate::domain::clock::{Clock, SystemClock};
use crate::domain::task::driving_ports::{TaskError, TaskPort};
use crate::external_connections::{ExternalConnectivity, TransactableExternalConnectivity};
use crate::routing_utils::{
    BasicErrorResponse, GenericErrorResponse, Json, NotFoundErrorResponse, Query,
    ValidationErrorResponse,
};
use crate::{AppState, SharedData, domain, dto, persistence};
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{ErrorResponse, IntoResponse, Response};
use axum::routing::{get, put};
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;
use validator::Validate;

#[derive(OpenApi)]
#[openapi(paths(
    get_tasks,
    create_task,
    get_recurring_tasks,
    get_task,
    get_task_instances,
    update_task,
    set_task_completion,
    delete_task
))]
/// Defines the OpenAPI documentation for the task API
pub struct TaskApi;
/// Constant used to group task endpoints in OpenAPI documentation
pub const TASK_API_GROUP: &str = "Tasks";

impl IntoResponse for TaskError {
    fn into_response(self) -> Response {
        match self {
            TaskError::UserDoesNotExist | TaskError::TaskDoesNotExist => {
                NotFoundErrorResponse(self.to_string()).into_response()
            }
            TaskError::PortError(cause) => GenericErrorResponse(cause).into_response(),
        }
    }
}

/// Adds routes for tasks owned by a user under "/users/:user_id/tasks"
pub fn task_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/users/:user_id/tasks",
            get(
                |State(app_state): AppState,
                 Path(user_id): Path<i32>,
                 Query(query): Query<dto::TaskQuery>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::task::TaskService;

                    get_tasks(user_id, query, &mut ext_cxn, &task_service).await
                },
            )
            .post(
                |State(app_state): AppState,
                 Path(user_id): Path<i32>,
                 Json(new_task): Json<dto::NewTask>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::task::TaskService;

                    create_task(user_id, new_task, &mut ext_cxn, &task_service).await
                },
            ),
        )
        .route(
            "/users/:user_id/tasks/recurring",
            get(|State(app_state): AppState, Path(user_id): Path<i32>| async move {
                let mut ext_cxn = app_state.ext_cxn.clone();
                let task_service = domain::task::TaskService;

                get_recurring_tasks(user_id, &mut ext_cxn, &task_service).await
            }),
        )
        .route(
            "/users/:user_id/tasks/:task_id",
            get(
                |State(app_state): AppState, Path((user_id, task_id)): Path<(i32, i32)>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::task::TaskService;

                    get_task(user_id, task_id, &mut ext_cxn, &task_service).await
                },
            )
            .patch(
                |State(app_state): AppState,
                 Path((user_id, task_id)): Path<(i32, i32)>,
                 Json(update): Json<dto::UpdateTask>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::task::TaskService;

                    update_task(user_id, task_id, update, &mut ext_cxn, &task_service).await
                },
            )
            .delete(
                |State(app_state): AppState, Path((user_id, task_id)): Path<(i32, i32)>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::task::TaskService;

                    delete_task(user_id, task_id, &mut ext_cxn, &task_service).await
                },
            ),
        )
        .route(
            "/users/:user_id/tasks/:task_id/instances",
            get(
                |State(app_state): AppState, Path((user_id, task_id)): Path<(i32, i32)>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::task::TaskService;

                    get_task_instances(user_id, task_id, &mut ext_cxn, &task_service).await
                },
            ),
        )
        .route(
            "/users/:user_id/tasks/:task_id/completion",
            put(
                |State(app_state): AppState,
                 Path((user_id, task_id)): Path<(i32, i32)>,
                 Json(completion): Json<dto::TaskCompletion>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::task::TaskService;

                    set_task_completion(user_id, task_id, completion, &mut ext_cxn, &task_service)
                        .await
                },
            ),
        )
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/tasks",
    tag = TASK_API_GROUP,
    params(
        ("user_id" = i32, Path, description = "ID of the user who owns the tasks"),
        dto::TaskQuery,
    ),
    responses(
        (status = 200, description = "Tasks owned by the user, narrowed to a calendar slot if one was given", body = Vec<dto::Task>),
        (status = 400, response = BasicErrorResponse),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
#[tracing::instrument(skip(ext_cxn, task_service))]
/// Retrieves a user's tasks. With a date (and optionally an hour), returns the calendar view for that slot.
async fn get_tasks(
    user_id: i32,
    query: dto::TaskQuery,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Json<Vec<dto::Task>>, ErrorResponse> {
    info!("Requested tasks for user {user_id}");
    query.validate().map_err(ValidationErrorResponse::from)?;

    let u_detect = persistence::db_user_driven_ports::DbDetectUser;
    let task_read = persistence::db_task_driven_ports::DbTaskReader;
    let clock = SystemClock;

    let tasks = if query.date.is_some() || query.hour.is_some() {
        let day = query.date.unwrap_or_else(|| clock.today());
        task_service
            .tasks_for_day(
                user_id,
                day,
                query.hour,
                &mut *ext_cxn,
                &clock,
                &u_detect,
                &task_read,
            )
            .await?
    } else {
        task_service
            .tasks_for_user(user_id, &mut *ext_cxn, &u_detect, &task_read)
            .await?
    };

    Ok(Json(tasks.into_iter().map(dto::Task::from).collect()))
}

#[utoipa::path(
    post,
    path = "/users/{user_id}/tasks",
    tag = TASK_API_GROUP,
    params(("user_id" = i32, Path, description = "ID of the user who will own the task")),
    request_body = dto::NewTask,
    responses(
        (status = 201, description = "Task created", body = dto::InsertedTask),
        (status = 400, response = BasicErrorResponse),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
#[tracing::instrument(skip(ext_cxn, task_service))]
/// Creates a task for a user
async fn create_task(
    user_id: i32,
    new_task: dto::NewTask,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<(StatusCode, Json<dto::InsertedTask>), ErrorResponse> {
    info!("Creating task for user {user_id}");
    new_task.validate().map_err(ValidationErrorResponse::from)?;

    let domain_task = domain::task::CreateTask::from(new_task);
    let u_detect = persistence::db_user_driven_ports::DbDetectUser;
    let task_write = persistence::db_task_driven_ports::DbTaskWriter;

    let new_id = task_service
        .create_task_for_user(
            user_id,
            &domain_task,
            &mut *ext_cxn,
            &SystemClock,
            &u_detect,
            &task_write,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(dto::InsertedTask { id: new_id })))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/tasks/recurring",
    tag = TASK_API_GROUP,
    params(("user_id" = i32, Path, description = "ID of the user who owns the tasks")),
    responses(
        (status = 200, description = "Recurring task templates with instance bookkeeping", body = Vec<dto::RecurringTaskSummary>),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
#[tracing::instrument(skip(ext_cxn, task_service))]
/// Lists a user's recurring task templates
async fn get_recurring_tasks(
    user_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Json<Vec<dto::RecurringTaskSummary>>, ErrorResponse> {
    info!("Requested recurring tasks for user {user_id}");
    let u_detect = persistence::db_user_driven_ports::DbDetectUser;
    let task_read = persistence::db_task_driven_ports::DbTaskReader;

    let summaries = task_service
        .recurring_tasks(user_id, &mut *ext_cxn, &SystemClock, &u_detect, &task_read)
        .await?;

    Ok(Json(
        summaries
            .into_iter()
            .map(dto::RecurringTaskSummary::from)
            .collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/tasks/{task_id}",
    tag = TASK_API_GROUP,
    params(
        ("user_id" = i32, Path, description = "ID of the user who owns the task"),
        ("task_id" = i32, Path, description = "ID of the task to retrieve"),
    ),
    responses(
        (status = 200, description = "The requested task", body = dto::Task),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
#[tracing::instrument(skip(ext_cxn, task_service))]
/// Retrieves a single task owned by a user
async fn get_task(
    user_id: i32,
    task_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Json<dto::Task>, ErrorResponse> {
    info!("Requested task {task_id} for user {user_id}");
    let u_detect = persistence::db_user_driven_ports::DbDetectUser;
    let task_read = persistence::db_task_driven_ports::DbTaskReader;

    let task = task_service
        .user_task_by_id(user_id, task_id, &mut *ext_cxn, &u_detect, &task_read)
        .await?
        .ok_or(TaskError::TaskDoesNotExist)?;

    Ok(Json(task.into()))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/tasks/{task_id}/instances",
    tag = TASK_API_GROUP,
    params(
        ("user_id" = i32, Path, description = "ID of the user who owns the task"),
        ("task_id" = i32, Path, description = "ID of the recurring template"),
    ),
    responses(
        (status = 200, description = "The template followed by every instance generated from it", body = Vec<dto::Task>),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
#[tracing::instrument(skip(ext_cxn, task_service))]
/// Retrieves a recurring template together with its generated instances
async fn get_task_instances(
    user_id: i32,
    task_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Json<Vec<dto::Task>>, ErrorResponse> {
    info!("Requested instances of task {task_id} for user {user_id}");
    let u_detect = persistence::db_user_driven_ports::DbDetectUser;
    let task_read = persistence::db_task_driven_ports::DbTaskReader;

    let tasks = task_service
        .task_instances(user_id, task_id, &mut *ext_cxn, &u_detect, &task_read)
        .await?;

    Ok(Json(tasks.into_iter().map(dto::Task::from).collect()))
}

#[utoipa::path(
    patch,
    path = "/users/{user_id}/tasks/{task_id}",
    tag = TASK_API_GROUP,
    params(
        ("user_id" = i32, Path, description = "ID of the user who owns the task"),
        ("task_id" = i32, Path, description = "ID of the task to update"),
    ),
    request_body = dto::UpdateTask,
    responses(
        (status = 200, description = "The task after the update was applied", body = dto::Task),
        (status = 400, response = BasicErrorResponse),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
#[tracing::instrument(skip(ext_cxn, task_service))]
/// Changes some of a task's fields
async fn update_task(
    user_id: i32,
    task_id: i32,
    update: dto::UpdateTask,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Json<dto::Task>, ErrorResponse> {
    info!("Updating task {task_id} for user {user_id}");
    update.validate().map_err(ValidationErrorResponse::from)?;

    let domain_update = domain::task::UpdateTask::from(update);
    let task_read = persistence::db_task_driven_ports::DbTaskReader;
    let task_write = persistence::db_task_driven_ports::DbTaskWriter;

    let updated = task_service
        .update_task(
            user_id,
            task_id,
            &domain_update,
            &mut *ext_cxn,
            &task_read,
            &task_write,
        )
        .await?;

    Ok(Json(updated.into()))
}

#[utoipa::path(
    put,
    path = "/users/{user_id}/tasks/{task_id}/completion",
    tag = TASK_API_GROUP,
    params(
        ("user_id" = i32, Path, description = "ID of the user who owns the task"),
        ("task_id" = i32, Path, description = "ID of the task to complete or reopen"),
    ),
    request_body = dto::TaskCompletion,
    responses(
        (status = 200, description = "The task's new state and the ID of any generated successor", body = dto::TaskCompletionResult),
        (status = 400, response = BasicErrorResponse),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
#[tracing::instrument(skip(ext_cxn, task_service))]
/// Marks a task complete or incomplete. Completing a recurring task generates its next instance.
async fn set_task_completion(
    user_id: i32,
    task_id: i32,
    completion: dto::TaskCompletion,
    ext_cxn: &mut impl TransactableExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Json<dto::TaskCompletionResult>, ErrorResponse> {
    info!(
        "Setting completion of task {task_id} for user {user_id} to {}",
        completion.completed
    );
    let task_read = persistence::db_task_driven_ports::DbTaskReader;
    let task_write = persistence::db_task_driven_ports::DbTaskWriter;

    let outcome = task_service
        .set_task_completion(
            user_id,
            task_id,
            completion.completed,
            &mut *ext_cxn,
            &SystemClock,
            &task_read,
            &task_write,
        )
        .await?;

    Ok(Json(outcome.into()))
}

#[utoipa::path(
    delete,
    path = "/users/{user_id}/tasks/{task_id}",
    tag = TASK_API_GROUP,
    params(
        ("user_id" = i32, Path, description = "ID of the user who owns the task"),
        ("task_id" = i32, Path, description = "ID of the task to delete"),
    ),
    responses(
        (status = 200, description = "Number of records removed, including generated instances", body = dto::DeletedTasks),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
#[tracing::instrument(skip(ext_cxn, task_service))]
/// Deletes a task. Deleting a recurring template also deletes every instance generated from it.
async fn delete_task(
    user_id: i32,
    task_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Json<dto::DeletedTasks>, ErrorResponse> {
    info!("Deleting task {task_id} for user {user_id}");
    let task_write = persistence::db_task_driven_ports::DbTaskWriter;

    let deleted_count = task_service
        .delete_task(user_id, task_id, &mut *ext_cxn, &task_write)
        .await?;

    Ok(Json(dto::DeletedTasks { deleted_count }))
}
