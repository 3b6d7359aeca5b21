// HTTP API routes
//
// This module contains all HTTP route handlers for the public API.
// Each submodule handles one resource and exposes a routes() constructor.

pub mod analytics;
pub mod common;
pub mod error;
pub mod events;
pub mod feed;
pub mod notifications;

// Re-export common types
pub use common::ErrorResponse;
pub use error::ApiError;
