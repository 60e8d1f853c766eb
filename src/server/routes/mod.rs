mod health;
mod tasks;

pub use health::health_handler;
pub use tasks::{add_task_handler, cancel_task_handler, list_tasks_handler};
