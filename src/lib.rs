use axum::Router;
use axum::extract::State;
use std::sync::Arc;

pub mod api;
pub mod app_env;
pub mod client;
pub mod db;
pub mod domain;
pub mod dto;
pub mod external_connections;
pub mod logging;
pub mod persistence;
pub mod routing_utils;


/// Data shared by every request handler
pub struct SharedData {
    pub ext_cxn: persistence::ExternalConnectivity,
}

/// Extractor handlers use to reach [SharedData]
pub type AppState = State<Arc<SharedData>>;

/// Assembles every route the service exposes, including the OpenAPI docs, with request tracing attached
pub fn build_router(shared_data: Arc<SharedData>) -> Router {
    let router = Router::new()
        .merge(api::user::user_routes())
        .merge(api::task::task_routes())
        .merge(api::todo::todo_routes())
        .merge(api::stats::stats_routes())
        .merge(api::analytics::analytics_routes())
        .merge(api::swagger_main::build_documentation())
        .with_state(shared_data);

    logging::attach_tracing_http(router)
}
