//! # Leadsync Domain
//!
//! Business domain types and models for the lead-to-billing sync service.
//!
//! This crate contains:
//! - Domain data types (SyncJob, SyncTask, lead/customer DTOs)
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other leadsync crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use constants::*;
pub use errors::*;
pub use types::*;
