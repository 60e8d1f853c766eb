//! Application setup and router configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::kernel::AppDeps;
use crate::server::routes::{
    add_task_handler, cancel_task_handler, health_handler, list_tasks_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: Arc<AppDeps>,
}

/// Build the Axum application router
pub fn build_app(deps: Arc<AppDeps>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/tasks", post(add_task_handler).get(list_tasks_handler))
        .route("/api/tasks/:id/cancel", post(cancel_task_handler))
        .layer(Extension(AppState { deps }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
