//! Modules layer - Infrastructure components for external integrations
//!
//! Contains adapters for blob storage and credential hashing.

pub mod security;
pub mod storage;
