//! # Leadsync Core
//!
//! Port interfaces and orchestration logic for the sync pipeline.
//!
//! This crate contains:
//! - Port traits implemented by `leadsync-infra` (job store, task queue,
//!   CRM/billing clients, application log)
//! - The `SyncService` state machine that drives one job through
//!   customer creation, subscription creation and CRM write-back
//!
//! ## Architecture
//! - Depends only on `leadsync-domain`
//! - No I/O; all side effects go through ports

pub mod ports;
pub mod sync;

pub use ports::{ApplicationLog, BillingApi, CrmApi, JobStore, TaskQueue};
pub use sync::service::{SyncService, SyncServiceConfig};
