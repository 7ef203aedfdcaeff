//! Maxio billing REST integration.

pub mod client;

pub use client::MaxioClient;
