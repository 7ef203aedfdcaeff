//! Background queue worker.

pub mod sync_worker;

pub use sync_worker::{SyncWorker, SyncWorkerConfig, TaskProcessor};
