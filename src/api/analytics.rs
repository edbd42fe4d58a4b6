use crate::domain::analytics::driving_ports::AnalyticsPort;
use crate::domain::clock::SystemClock;
use crate::external_connections::ExternalConnectivity;
use crate::routing_utils::{BasicErrorResponse, Json, Query, ValidationErrorResponse};
use crate::{AppState, SharedData, domain, dto, persistence};
use axum::Router;
use axum::extract::{Path, State};
use axum::response::ErrorResponse;
use axum::routing::get;
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;
use validator::Validate;

#[derive(OpenApi)]
#[openapi(paths(get_analytics))]
/// Defines the OpenAPI documentation for the analytics API
pub struct AnalyticsApi;
/// Constant used to group analytics endpoints in OpenAPI documentation
pub const ANALYTICS_API_GROUP: &str = "Analytics";

/// Adds the route for task analytics under "/users/:user_id/analytics"
pub fn analytics_routes() -> Router<Arc<SharedData>> {
    Router::new().route(
        "/users/:user_id/analytics",
        get(
            |State(app_state): AppState,
             Path(user_id): Path<i32>,
             Query(query): Query<dto::AnalyticsQuery>| async move {
                let mut ext_cxn = app_state.ext_cxn.clone();
                let analytics_service = domain::analytics::AnalyticsService;

                get_analytics(user_id, query, &mut ext_cxn, &analytics_service).await
            },
        ),
    )
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/analytics",
    tag = ANALYTICS_API_GROUP,
    params(
        ("user_id" = i32, Path, description = "ID of the user whose tasks should be analyzed"),
        dto::AnalyticsQuery,
    ),
    responses(
        (status = 200, description = "Completion statistics over the user's tasks", body = dto::TaskAnalytics),
        (status = 400, response = BasicErrorResponse),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
#[tracing::instrument(skip(ext_cxn, analytics_service))]
/// Summarizes a user's task completion overall, per category, and per day
async fn get_analytics(
    user_id: i32,
    query: dto::AnalyticsQuery,
    ext_cxn: &mut impl ExternalConnectivity,
    analytics_service: &impl AnalyticsPort,
) -> Result<Json<dto::TaskAnalytics>, ErrorResponse> {
    info!("Requested analytics for user {user_id}");
    query.validate().map_err(ValidationErrorResponse::from)?;

    let u_detect = persistence::db_user_driven_ports::DbDetectUser;
    let task_read = persistence::db_task_driven_ports::DbTaskReader;

    let analytics = analytics_service
        .task_analytics(
            user_id,
            query.window_days(),
            &mut *ext_cxn,
            &SystemClock,
            &u_detect,
            &task_read,
        )
        .await?;

    Ok(Json(analytics.into()))
}
