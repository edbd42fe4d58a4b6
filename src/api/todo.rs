use crate::domain::clock::SystemClock;
use crate::domain::todo::driving_ports::{TodoError, TodoPort};
use crate::external_connections::{ExternalConnectivity, TransactableExternalConnectivity};
use crate::routing_utils::{
    BasicErrorResponse, GenericErrorResponse, Json, NotFoundErrorResponse, ValidationErrorResponse,
};
use crate::{AppState, SharedData, domain, dto, persistence};
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{ErrorResponse, IntoResponse, Response};
use axum::routing::{get, patch, put};
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;
use validator::Validate;

#[derive(OpenApi)]
#[openapi(paths(get_todos, create_todo, update_todo, delete_todo, set_todo_completion))]
/// Defines the OpenAPI documentation for the todo API
pub struct TodoApi;
/// Constant used to group todo endpoints in OpenAPI documentation
pub const TODO_API_GROUP: &str = "Todos";

impl IntoResponse for TodoError {
    fn into_response(self) -> Response {
        match self {
            TodoError::UserDoesNotExist | TodoError::TodoDoesNotExist => {
                NotFoundErrorResponse(self.to_string()).into_response()
            }
            TodoError::PortError(cause) => GenericErrorResponse(cause).into_response(),
        }
    }
}

/// Adds routes for todos owned by a user under "/users/:user_id/todos"
pub fn todo_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/users/:user_id/todos",
            get(|State(app_state): AppState, Path(user_id): Path<i32>| async move {
                let mut ext_cxn = app_state.ext_cxn.clone();
                let todo_service = domain::todo::TodoService;

                get_todos(user_id, &mut ext_cxn, &todo_service).await
            })
            .post(
                |State(app_state): AppState,
                 Path(user_id): Path<i32>,
                 Json(new_todo): Json<dto::NewTodo>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let todo_service = domain::todo::TodoService;

                    create_todo(user_id, new_todo, &mut ext_cxn, &todo_service).await
                },
            ),
        )
        .route(
            "/users/:user_id/todos/:todo_id",
            patch(
                |State(app_state): AppState,
                 Path((user_id, todo_id)): Path<(i32, i32)>,
                 Json(update): Json<dto::UpdateTodo>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let todo_service = domain::todo::TodoService;

                    update_todo(user_id, todo_id, update, &mut ext_cxn, &todo_service).await
                },
            )
            .delete(
                |State(app_state): AppState, Path((user_id, todo_id)): Path<(i32, i32)>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let todo_service = domain::todo::TodoService;

                    delete_todo(user_id, todo_id, &mut ext_cxn, &todo_service).await
                },
            ),
        )
        .route(
            "/users/:user_id/todos/:todo_id/completion",
            put(
                |State(app_state): AppState,
                 Path((user_id, todo_id)): Path<(i32, i32)>,
                 Json(completion): Json<dto::TodoCompletion>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let todo_service = domain::todo::TodoService;

                    set_todo_completion(user_id, todo_id, completion, &mut ext_cxn, &todo_service)
                        .await
                },
            ),
        )
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/todos",
    tag = TODO_API_GROUP,
    params(("user_id" = i32, Path, description = "ID of the user who owns the todos")),
    responses(
        (status = 200, description = "Todos owned by the user", body = Vec<dto::Todo>),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
#[tracing::instrument(skip(ext_cxn, todo_service))]
/// Retrieves a user's todos
async fn get_todos(
    user_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    todo_service: &impl TodoPort,
) -> Result<Json<Vec<dto::Todo>>, ErrorResponse> {
    info!("Requested todos for user {user_id}");
    let u_detect = persistence::db_user_driven_ports::DbDetectUser;
    let todo_read = persistence::db_todo_driven_ports::DbTodoReader;

    let todos = todo_service
        .todos_for_user(user_id, &mut *ext_cxn, &u_detect, &todo_read)
        .await?;

    Ok(Json(todos.into_iter().map(dto::Todo::from).collect()))
}

#[utoipa::path(
    post,
    path = "/users/{user_id}/todos",
    tag = TODO_API_GROUP,
    params(("user_id" = i32, Path, description = "ID of the user who will own the todo")),
    request_body = dto::NewTodo,
    responses(
        (status = 201, description = "Todo created", body = dto::InsertedTodo),
        (status = 400, response = BasicErrorResponse),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
#[tracing::instrument(skip(ext_cxn, todo_service))]
/// Creates a todo for a user. Its points are derived from its priority.
async fn create_todo(
    user_id: i32,
    new_todo: dto::NewTodo,
    ext_cxn: &mut impl ExternalConnectivity,
    todo_service: &impl TodoPort,
) -> Result<(StatusCode, Json<dto::InsertedTodo>), ErrorResponse> {
    info!("Creating todo for user {user_id}");
    new_todo.validate().map_err(ValidationErrorResponse::from)?;

    let domain_todo = domain::todo::CreateTodo::from(new_todo);
    let u_detect = persistence::db_user_driven_ports::DbDetectUser;
    let todo_write = persistence::db_todo_driven_ports::DbTodoWriter;

    let new_id = todo_service
        .create_todo_for_user(
            user_id,
            &domain_todo,
            &mut *ext_cxn,
            &SystemClock,
            &u_detect,
            &todo_write,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(dto::InsertedTodo { id: new_id })))
}

#[utoipa::path(
    patch,
    path = "/users/{user_id}/todos/{todo_id}",
    tag = TODO_API_GROUP,
    params(
        ("user_id" = i32, Path, description = "ID of the user who owns the todo"),
        ("todo_id" = i32, Path, description = "ID of the todo to update"),
    ),
    request_body = dto::UpdateTodo,
    responses(
        (status = 200, description = "The todo after the update was applied", body = dto::Todo),
        (status = 400, response = BasicErrorResponse),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
#[tracing::instrument(skip(ext_cxn, todo_service))]
/// Changes some of a todo's fields
async fn update_todo(
    user_id: i32,
    todo_id: i32,
    update: dto::UpdateTodo,
    ext_cxn: &mut impl ExternalConnectivity,
    todo_service: &impl TodoPort,
) -> Result<Json<dto::Todo>, ErrorResponse> {
    info!("Updating todo {todo_id} for user {user_id}");
    update.validate().map_err(ValidationErrorResponse::from)?;

    let domain_update = domain::todo::UpdateTodo::from(update);
    let todo_read = persistence::db_todo_driven_ports::DbTodoReader;
    let todo_write = persistence::db_todo_driven_ports::DbTodoWriter;

    let updated = todo_service
        .update_todo(
            user_id,
            todo_id,
            &domain_update,
            &mut *ext_cxn,
            &todo_read,
            &todo_write,
        )
        .await?;

    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/users/{user_id}/todos/{todo_id}",
    tag = TODO_API_GROUP,
    params(
        ("user_id" = i32, Path, description = "ID of the user who owns the todo"),
        ("todo_id" = i32, Path, description = "ID of the todo to delete"),
    ),
    responses(
        (status = 204, description = "Todo deleted"),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
#[tracing::instrument(skip(ext_cxn, todo_service))]
/// Deletes a todo
async fn delete_todo(
    user_id: i32,
    todo_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    todo_service: &impl TodoPort,
) -> Result<StatusCode, ErrorResponse> {
    info!("Deleting todo {todo_id} for user {user_id}");
    let todo_write = persistence::db_todo_driven_ports::DbTodoWriter;

    todo_service
        .delete_todo(user_id, todo_id, &mut *ext_cxn, &todo_write)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/users/{user_id}/todos/{todo_id}/completion",
    tag = TODO_API_GROUP,
    params(
        ("user_id" = i32, Path, description = "ID of the user who owns the todo"),
        ("todo_id" = i32, Path, description = "ID of the todo to complete or reopen"),
    ),
    request_body = dto::TodoCompletion,
    responses(
        (status = 200, description = "The todo's new state and the owner's resulting stats", body = dto::TodoCompletionResult),
        (status = 400, response = BasicErrorResponse),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
#[tracing::instrument(skip(ext_cxn, todo_service))]
/// Marks a todo complete or incomplete. Completing a todo awards its points and extends the streak.
async fn set_todo_completion(
    user_id: i32,
    todo_id: i32,
    completion: dto::TodoCompletion,
    ext_cxn: &mut impl TransactableExternalConnectivity,
    todo_service: &impl TodoPort,
) -> Result<Json<dto::TodoCompletionResult>, ErrorResponse> {
    info!(
        "Setting completion of todo {todo_id} for user {user_id} to {}",
        completion.completed
    );
    let todo_read = persistence::db_todo_driven_ports::DbTodoReader;
    let todo_write = persistence::db_todo_driven_ports::DbTodoWriter;
    let stats_read = persistence::db_stats_driven_ports::DbStatsReader;
    let stats_write = persistence::db_stats_driven_ports::DbStatsWriter;

    let outcome = todo_service
        .set_todo_completion(
            user_id,
            todo_id,
            completion.completed,
            &mut *ext_cxn,
            &SystemClock,
            &todo_read,
            &todo_write,
            &stats_read,
            &stats_write,
        )
        .await?;

    Ok(Json(outcome.into()))
}
