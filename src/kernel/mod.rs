//! Kernel infrastructure shared by the web process and the worker process.

pub mod deps;
pub mod publisher;
pub mod tasks;

pub use deps::AppDeps;
pub use publisher::{BloggerPublisher, PublishError, Publisher};
pub use tasks::{
    NewTask, SchedulerConfig, SchedulerLoop, Task, TaskError, TaskExecutor, TaskOutcome,
    TaskStatus, TaskStore,
};
