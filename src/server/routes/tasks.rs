//! Task admission, listing and cancellation handlers.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::kernel::tasks::{NewTask, Task, TaskError, DEFAULT_LIST_LIMIT};
use crate::server::app::AppState;

#[derive(Deserialize)]
pub struct AddTaskRequest {
    pub destination: String,
    #[serde(default)]
    pub destination_hint: Option<String>,
    pub title: String,
    pub content: String,
    /// ISO-8601 UTC timestamp, e.g. "2030-01-01T00:00:00Z"
    pub scheduled_at: String,
}

#[derive(Serialize)]
struct AddTaskResponse {
    ok: bool,
    id: i64,
}

#[derive(Serialize)]
struct ListTasksResponse {
    ok: bool,
    items: Vec<Task>,
}

#[derive(Serialize)]
struct CancelResponse {
    ok: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    ok: bool,
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            ok: false,
            error: message.into(),
        }),
    )
        .into_response()
}

fn store_error(context: &str, e: TaskError) -> Response {
    error!(error = %e, "{context}");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
}

/// `POST /api/tasks` - validate and enqueue a scheduled publish task.
pub async fn add_task_handler(
    Extension(state): Extension<AppState>,
    Json(req): Json<AddTaskRequest>,
) -> Response {
    let new_task = match NewTask::parse(
        &req.destination,
        req.destination_hint,
        &req.title,
        &req.content,
        &req.scheduled_at,
    ) {
        Ok(new_task) => new_task,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match state.deps.store.insert(new_task).await {
        Ok(task) => (
            StatusCode::CREATED,
            Json(AddTaskResponse {
                ok: true,
                id: task.id,
            }),
        )
            .into_response(),
        Err(e @ TaskError::Validation(_)) => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => store_error("failed to insert task", e),
    }
}

/// `GET /api/tasks` - list tasks newest-first, capped at a fixed page size.
pub async fn list_tasks_handler(Extension(state): Extension<AppState>) -> Response {
    match state.deps.store.list(DEFAULT_LIST_LIMIT).await {
        Ok(items) => Json(ListTasksResponse { ok: true, items }).into_response(),
        Err(e) => store_error("failed to list tasks", e),
    }
}

/// `POST /api/tasks/:id/cancel` - best-effort cancellation.
///
/// `ok: false` means the task was missing or no longer pending; the status
/// is 200 either way because a lost cancellation race is an expected signal,
/// not an error.
pub async fn cancel_task_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<i64>,
) -> Response {
    match state.deps.store.cancel(id).await {
        Ok(canceled) => Json(CancelResponse { ok: canceled }).into_response(),
        Err(e) => store_error("failed to cancel task", e),
    }
}
