use crate::domain::clock::SystemClock;
use crate::domain::stats::driving_ports::{StatsError, StatsPort};
use crate::external_connections::ExternalConnectivity;
use crate::routing_utils::{
    BasicErrorResponse, GenericErrorResponse, Json, NotFoundErrorResponse, ValidationErrorResponse,
};
use crate::{AppState, SharedData, domain, dto, persistence};
use axum::Router;
use axum::extract::{Path, State};
use axum::response::{ErrorResponse, IntoResponse, Response};
use axum::routing::get;
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;
use validator::Validate;

#[derive(OpenApi)]
#[openapi(paths(get_stats, update_stats))]
/// Defines the OpenAPI documentation for the stats API
pub struct StatsApi;
/// Constant used to group stats endpoints in OpenAPI documentation
pub const STATS_API_GROUP: &str = "Stats";

impl IntoResponse for StatsError {
    fn into_response(self) -> Response {
        match self {
            StatsError::UserDoesNotExist => NotFoundErrorResponse(self.to_string()).into_response(),
            StatsError::PortError(cause) => GenericErrorResponse(cause).into_response(),
        }
    }
}

/// Adds routes for a user's points and streaks under "/users/:user_id/stats"
pub fn stats_routes() -> Router<Arc<SharedData>> {
    Router::new().route(
        "/users/:user_id/stats",
        get(|State(app_state): AppState, Path(user_id): Path<i32>| async move {
            let mut ext_cxn = app_state.ext_cxn.clone();
            let stats_service = domain::stats::StatsService;

            get_stats(user_id, &mut ext_cxn, &stats_service).await
        })
        .patch(
            |State(app_state): AppState,
             Path(user_id): Path<i32>,
             Json(update): Json<dto::UpdateStats>| async move {
                let mut ext_cxn = app_state.ext_cxn.clone();
                let stats_service = domain::stats::StatsService;

                update_stats(user_id, update, &mut ext_cxn, &stats_service).await
            },
        ),
    )
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/stats",
    tag = STATS_API_GROUP,
    params(("user_id" = i32, Path, description = "ID of the user whose stats should be read")),
    responses(
        (status = 200, description = "The user's current stats. A streak whose last active day is older than yesterday reads as 0.", body = dto::UserStats),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
#[tracing::instrument(skip(ext_cxn, stats_service))]
/// Retrieves a user's stats, creating an empty record on first access
async fn get_stats(
    user_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    stats_service: &impl StatsPort,
) -> Result<Json<dto::UserStats>, ErrorResponse> {
    info!("Requested stats for user {user_id}");
    let u_detect = persistence::db_user_driven_ports::DbDetectUser;
    let todo_read = persistence::db_todo_driven_ports::DbTodoReader;
    let stats_read = persistence::db_stats_driven_ports::DbStatsReader;
    let stats_write = persistence::db_stats_driven_ports::DbStatsWriter;

    let stats = stats_service
        .stats_for_user(
            user_id,
            &mut *ext_cxn,
            &SystemClock,
            &u_detect,
            &todo_read,
            &stats_read,
            &stats_write,
        )
        .await?;

    Ok(Json(stats.into()))
}

#[utoipa::path(
    patch,
    path = "/users/{user_id}/stats",
    tag = STATS_API_GROUP,
    params(("user_id" = i32, Path, description = "ID of the user whose stats should change")),
    request_body = dto::UpdateStats,
    responses(
        (status = 200, description = "The stats after the update was applied", body = dto::UserStats),
        (status = 400, response = BasicErrorResponse),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
#[tracing::instrument(skip(ext_cxn, stats_service))]
/// Manually adjusts a user's counters. The longest streak is raised to cover the current one.
async fn update_stats(
    user_id: i32,
    update: dto::UpdateStats,
    ext_cxn: &mut impl ExternalConnectivity,
    stats_service: &impl StatsPort,
) -> Result<Json<dto::UserStats>, ErrorResponse> {
    info!("Updating stats for user {user_id}");
    update.validate().map_err(ValidationErrorResponse::from)?;

    let domain_update = domain::stats::UpdateStats::from(update);
    let u_detect = persistence::db_user_driven_ports::DbDetectUser;
    let stats_read = persistence::db_stats_driven_ports::DbStatsReader;
    let stats_write = persistence::db_stats_driven_ports::DbStatsWriter;

    let stats = stats_service
        .update_stats(
            user_id,
            &domain_update,
            &mut *ext_cxn,
            &u_detect,
            &stats_read,
            &stats_write,
        )
        .await?;

    Ok(Json(stats.into()))
}
