//! SQLite-backed task store.
//!
//! The store is the sole source of truth for task state. It is shared by the
//! web process (insert/list/cancel) and the worker process (claim/finish);
//! correctness under that concurrency rests entirely on [`TaskStore::claim_due`]
//! selecting and marking tasks in a single atomic statement.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use super::task::{NewTask, Task, TaskError, TaskOutcome, TaskStatus};

/// Cap applied to listing queries so responses stay bounded.
pub const DEFAULT_LIST_LIMIT: i64 = 200;

const TASK_COLUMNS: &str = "id, destination, destination_hint, title, content, scheduled_at, \
                            status, result_url, error, created_at, updated_at";

/// Database-backed storage for scheduled publish tasks.
#[derive(Clone)]
pub struct TaskStore {
    pool: SqlitePool,
}

impl TaskStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert a new task in `pending` state. Validation is enforced here as
    /// well as at admission, so an unpublishable task can never be persisted.
    pub async fn insert(&self, new_task: NewTask) -> Result<Task, TaskError> {
        new_task.validate()?;

        let now = Utc::now();
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (destination, destination_hint, title, content, scheduled_at,
                               status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 'pending', ?, ?)
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(&new_task.destination)
        .bind(&new_task.destination_hint)
        .bind(&new_task.title)
        .bind(&new_task.content)
        .bind(new_task.scheduled_at)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        debug!(task_id = task.id, scheduled_at = %task.scheduled_at, "task created");
        Ok(task)
    }

    pub async fn find(&self, id: i64) -> Result<Option<Task>, TaskError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    /// List tasks most-recent-first. The limit is clamped to
    /// [`DEFAULT_LIST_LIMIT`] to keep responses bounded.
    pub async fn list(&self, limit: i64) -> Result<Vec<Task>, TaskError> {
        let limit = limit.clamp(1, DEFAULT_LIST_LIMIT);

        let tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    /// Cancel a task if and only if it is still `pending`.
    ///
    /// Returns whether the cancellation took effect. A `false` result (task
    /// missing, already running, or terminal) is a signal, not an error. A
    /// cancellation racing with `claim_due` may lose; that is the documented
    /// behavior.
    pub async fn cancel(&self, id: i64) -> Result<bool, TaskError> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'canceled', updated_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Atomically claim up to `limit` due tasks, flipping each from `pending`
    /// to `running` in the same statement that selects it.
    ///
    /// The select-and-mark runs as a single UPDATE, so no task can be handed
    /// to two concurrent callers. The returned batch is ordered by
    /// `(scheduled_at, id)` ascending.
    pub async fn claim_due(&self, limit: i64) -> Result<Vec<Task>, TaskError> {
        let now = Utc::now();
        let mut tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET status = 'running', updated_at = ?
            WHERE id IN (
                SELECT id FROM tasks
                WHERE status = 'pending' AND scheduled_at <= ?
                ORDER BY scheduled_at ASC, id ASC
                LIMIT ?
            )
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(now)
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        // RETURNING does not guarantee row order.
        tasks.sort_by(|a, b| {
            a.scheduled_at
                .cmp(&b.scheduled_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(tasks)
    }

    /// Record the terminal outcome of a claimed task.
    ///
    /// Only valid coming from `running`; a finish against any other state is
    /// a no-op and returns `false`. Exactly one of `result_url`/`error` is
    /// written, exactly once.
    pub async fn finish(&self, id: i64, outcome: TaskOutcome) -> Result<bool, TaskError> {
        let (status, result_url, error) = match outcome {
            TaskOutcome::Succeeded { url } => (TaskStatus::Succeeded, Some(url), None),
            TaskOutcome::Failed { error } => (TaskStatus::Failed, None, Some(error)),
        };

        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = ?, result_url = ?, error = ?, updated_at = ?
            WHERE id = ? AND status = 'running'
            "#,
        )
        .bind(status)
        .bind(result_url)
        .bind(error)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Requeue `running` tasks that have not been touched within the grace
    /// period. Run at scheduler startup so tasks orphaned by a crash between
    /// claim and finish become eligible again.
    pub async fn release_stale(&self, grace: Duration) -> Result<u64, TaskError> {
        let grace = chrono::Duration::from_std(grace)
            .unwrap_or_else(|_| chrono::Duration::seconds(i64::MAX / 1_000));
        let cutoff: DateTime<Utc> = Utc::now() - grace;

        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'pending', updated_at = ?
            WHERE status = 'running' AND updated_at <= ?
            "#,
        )
        .bind(Utc::now())
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
