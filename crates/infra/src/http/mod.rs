//! Shared HTTP client used by the integration clients.

pub mod client;

pub use client::{HttpClient, HttpClientBuilder};
