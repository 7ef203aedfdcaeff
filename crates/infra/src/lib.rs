//! # Leadsync Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - SQLite implementations of the job store, task queue and application log
//! - HTTP client implementations for the vTiger CRM and Maxio billing APIs
//! - The queue worker that executes sync tasks with bounded concurrency
//! - Configuration loading
//!
//! ## Architecture
//! - Implements traits defined in `leadsync-core`
//! - Contains all "impure" code (I/O, external services)

pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod worker;

// Re-export commonly used items
pub use database::{DbManager, SqliteApplicationLog, SqliteJobRepository, SqliteTaskQueue};
pub use errors::InfraError;
pub use http::HttpClient;
pub use integrations::{MaxioClient, VtigerClient};
pub use worker::{SyncWorker, SyncWorkerConfig, TaskProcessor};
