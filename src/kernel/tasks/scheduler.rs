//! Scheduler loop: polls for due tasks and drives their execution.
//!
//! A fixed-interval poll is deliberate for this workload (single-digit tasks
//! per minute); the interval and batch size are configuration, not literals.
//! The loop holds no state of its own beyond that configuration, so it is
//! safe to restart at any time. Deployments run at most one loop; a second
//! concurrent loop is safe (claiming is atomic) but merely contends for the
//! same batch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use super::executor::TaskExecutor;
use super::store::TaskStore;
use super::task::TaskError;

/// Configuration for the scheduler loop.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum number of tasks to claim per tick
    pub batch_size: i64,
    /// How long to wait when no tasks are due
    pub poll_interval: Duration,
    /// How long a `running` task may go untouched before startup recovery
    /// requeues it
    pub stale_grace: Duration,
    /// Worker ID for this instance (log correlation only)
    pub worker_id: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            poll_interval: Duration::from_secs(25),
            stale_grace: Duration::from_secs(15 * 60),
            worker_id: format!("scheduler-{}", std::process::id()),
        }
    }
}

/// Long-running service that repeatedly claims due tasks and executes them.
pub struct SchedulerLoop {
    store: TaskStore,
    executor: TaskExecutor,
    config: SchedulerConfig,
    shutdown: Arc<AtomicBool>,
}

impl SchedulerLoop {
    pub fn new(store: TaskStore, executor: TaskExecutor) -> Self {
        Self::with_config(store, executor, SchedulerConfig::default())
    }

    pub fn with_config(store: TaskStore, executor: TaskExecutor, config: SchedulerConfig) -> Self {
        Self {
            store,
            executor,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a shutdown handle for graceful shutdown.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Request shutdown of the loop.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Claim and execute one batch of due tasks. Returns how many were
    /// claimed. Exposed so tests (and embedders) can drive single ticks.
    pub async fn run_once(&self) -> Result<usize, TaskError> {
        let tasks = self.store.claim_due(self.config.batch_size).await?;
        let count = tasks.len();

        // Batch order is (scheduled_at, id) ascending; execute in that order.
        for task in tasks {
            let task_id = task.id;
            if let Err(e) = self.executor.run(task).await {
                error!(task_id, error = %e, "failed to record task outcome");
            }
        }

        Ok(count)
    }

    /// Run the loop until shutdown is requested.
    pub async fn run(self) -> Result<()> {
        info!(
            worker_id = %self.config.worker_id,
            batch_size = self.config.batch_size,
            poll_interval_secs = self.config.poll_interval.as_secs(),
            "scheduler loop starting"
        );

        // Crash recovery: requeue tasks orphaned in `running` by a previous
        // process that died between claim and finish.
        match self.store.release_stale(self.config.stale_grace).await {
            Ok(0) => {}
            Ok(released) => warn!(count = released, "requeued stale running tasks"),
            Err(e) => error!(error = %e, "failed to release stale tasks"),
        }

        loop {
            if self.is_shutdown_requested() {
                break;
            }

            match self.run_once().await {
                // Claimed nothing; sleep until the next poll.
                Ok(0) => tokio::time::sleep(self.config.poll_interval).await,
                Ok(count) => debug!(count, "executed due tasks"),
                // Store unreachable; log and retry next tick rather than die.
                Err(e) => {
                    error!(error = %e, "failed to claim due tasks");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }

        info!(worker_id = %self.config.worker_id, "scheduler loop stopped");
        Ok(())
    }

    /// Run until Ctrl+C is received.
    pub async fn run_until_shutdown(self) -> Result<()> {
        let shutdown = self.shutdown_handle();

        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("received shutdown signal");
            shutdown.store(true, Ordering::SeqCst);
        });

        self.run().await
    }
}
