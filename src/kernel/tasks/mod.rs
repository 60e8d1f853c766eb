//! Scheduled publish task infrastructure.
//!
//! This module provides the durable task queue and the pieces that drive it:
//! - [`Task`] - the persisted task record and its state machine
//! - [`TaskStore`] - database-backed storage with atomic claiming
//! - [`TaskExecutor`] - drives one claimed task to a terminal state
//! - [`SchedulerLoop`] - long-running service that polls for due tasks
//!
//! # Architecture
//!
//! ```text
//! Admission API ──► TaskStore.insert (status = pending)
//!
//! SchedulerLoop
//!     │
//!     ├─► TaskStore.claim_due (pending + due → running, atomic)
//!     └─► TaskExecutor.run(task)
//!             ├─► Publisher.publish(destination, title, content)
//!             └─► TaskStore.finish (succeeded / failed)
//! ```
//!
//! The store is the only shared mutable state; the web process and the worker
//! process coordinate purely through its atomic operations.

mod executor;
mod scheduler;
mod store;
mod task;

pub use executor::TaskExecutor;
pub use scheduler::{SchedulerConfig, SchedulerLoop};
pub use store::{TaskStore, DEFAULT_LIST_LIMIT};
pub use task::{NewTask, Task, TaskError, TaskOutcome, TaskStatus};
