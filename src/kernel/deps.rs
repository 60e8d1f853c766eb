//! Shared application dependencies.
//!
//! The pool, store and publisher are constructed once at startup and threaded
//! through explicitly rather than living in process-wide globals.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::kernel::publisher::Publisher;
use crate::kernel::tasks::TaskStore;

/// Dependencies shared by route handlers and the scheduler loop.
#[derive(Clone)]
pub struct AppDeps {
    pub db_pool: SqlitePool,
    pub store: TaskStore,
    pub publisher: Arc<dyn Publisher>,
}

impl AppDeps {
    pub fn new(db_pool: SqlitePool, publisher: Arc<dyn Publisher>) -> Self {
        Self {
            store: TaskStore::new(db_pool.clone()),
            db_pool,
            publisher,
        }
    }
}
