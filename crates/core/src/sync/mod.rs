//! Sync pipeline orchestration

pub mod service;
