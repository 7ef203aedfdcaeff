//! vTiger CRM REST integration.

pub mod client;

pub use client::VtigerClient;
