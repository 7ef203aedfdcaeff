//! SQLite-backed persistence

pub mod job_repository;
pub mod log_repository;
pub mod manager;
pub mod task_queue;

pub use job_repository::SqliteJobRepository;
pub use log_repository::SqliteApplicationLog;
pub use manager::{DbManager, PooledConnection};
pub use task_queue::SqliteTaskQueue;
