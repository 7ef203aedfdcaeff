//! External service integrations.

pub mod maxio;
pub mod vtiger;

pub use maxio::MaxioClient;
pub use vtiger::VtigerClient;
