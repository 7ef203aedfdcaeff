//! HTTP route handlers.

pub mod health;
pub mod onboarding;
pub mod webhooks;
