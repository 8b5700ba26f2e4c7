//! # API Shared
//!
//! Shared definitions for the MedLink REST API and CLI.
//!
//! Contains:
//! - Request/response types with OpenAPI schemas (`types` module)
//! - Shared services like `HealthService`
//! - API-key checking
//!
//! Used by `api-rest` and `medlink-cli` for common functionality.

pub mod auth;
pub mod health;
pub mod types;

pub use health::HealthService;
pub use types::*;
