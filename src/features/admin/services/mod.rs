mod admin_token;
mod cleanup_service;

pub use admin_token::{AdminGate, AdminTokenStore};
pub use cleanup_service::{CleanupReport, CleanupService};
