//! Watch With Friends session server library
//!
//! Exposes the router and session coordinator for the binary and for
//! integration tests.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod websocket;

// Re-export commonly used types
pub use config::Config;
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::build_router;
pub use websocket::{spawn_reconciler, SessionCoordinator};
