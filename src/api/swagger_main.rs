use crate::dto;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(info(
    title = "Task Streaks API",
    description = "Recurring tasks, todos, and the points and streaks earned by completing them"
))]
struct TaskStreaksApi;

/// Constructs the route on the API that renders the swagger UI and returns the OpenAPI schema.
/// Merges in OpenAPI definitions from other locations in the app, such as the [dto] package
/// and submodules of [api][crate::api]
pub fn build_documentation() -> SwaggerUi {
    let mut api_docs = TaskStreaksApi::openapi();
    api_docs.merge(dto::OpenApiSchemas::openapi());
    api_docs.merge(super::user::UsersApi::openapi());
    api_docs.merge(super::task::TaskApi::openapi());
    api_docs.merge(super::todo::TodoApi::openapi());
    api_docs.merge(super::stats::StatsApi::openapi());
    api_docs.merge(super::analytics::AnalyticsApi::openapi());

    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api_docs)
}
