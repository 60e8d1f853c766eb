//! Task executor: drives one claimed task to a terminal state.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::store::TaskStore;
use super::task::{Task, TaskError, TaskOutcome};
use crate::kernel::publisher::Publisher;

/// Executes claimed tasks against the publisher and records the outcome.
///
/// The executor never lets a publisher failure escape: network errors,
/// timeouts and panics inside the publish call all become a `failed` outcome
/// on the task record. Only store errors propagate, and the scheduler loop
/// absorbs those per iteration.
pub struct TaskExecutor {
    store: TaskStore,
    publisher: Arc<dyn Publisher>,
    publish_timeout: Duration,
}

impl TaskExecutor {
    pub fn new(store: TaskStore, publisher: Arc<dyn Publisher>, publish_timeout: Duration) -> Self {
        Self {
            store,
            publisher,
            publish_timeout,
        }
    }

    /// Run a task that has already been claimed (status `running`).
    pub async fn run(&self, task: Task) -> Result<(), TaskError> {
        // Should already hold from admission-time validation.
        if let Some(field) = task.missing_field() {
            warn!(task_id = task.id, field, "claimed task is missing a required field");
            self.store
                .finish(
                    task.id,
                    TaskOutcome::Failed {
                        error: format!("missing required field: {}", field),
                    },
                )
                .await?;
            return Ok(());
        }

        let outcome = self.attempt_publish(&task).await;
        match &outcome {
            TaskOutcome::Succeeded { url } => {
                info!(task_id = task.id, url = %url, "task published");
            }
            TaskOutcome::Failed { error } => {
                warn!(task_id = task.id, error = %error, "task failed");
            }
        }

        self.store.finish(task.id, outcome).await?;
        Ok(())
    }

    /// Make the single publish attempt, bounded by the configured timeout.
    ///
    /// The call runs on its own spawned task so a panicking publisher
    /// implementation surfaces as a join error instead of unwinding through
    /// the scheduler loop. A timed-out call is abandoned, not canceled: the
    /// spawned task keeps running detached, since the platform call itself
    /// cannot be canceled once in flight.
    async fn attempt_publish(&self, task: &Task) -> TaskOutcome {
        let publisher = Arc::clone(&self.publisher);
        let destination = task.destination.clone();
        let title = task.title.clone();
        let content = task.content.clone();

        let call = tokio::spawn(async move {
            publisher.publish(&destination, &title, &content).await
        });

        match tokio::time::timeout(self.publish_timeout, call).await {
            Err(_) => TaskOutcome::Failed {
                error: format!(
                    "publish timed out after {}s",
                    self.publish_timeout.as_secs()
                ),
            },
            Ok(Err(join_err)) => TaskOutcome::Failed {
                error: format!("publish aborted: {}", join_err),
            },
            Ok(Ok(Err(publish_err))) => TaskOutcome::Failed {
                error: publish_err.to_string(),
            },
            Ok(Ok(Ok(url))) => TaskOutcome::Succeeded { url },
        }
    }
}
