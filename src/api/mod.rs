//! API Module
//!
//! Read-only diagnostics HTTP surface for the cache manager.
//!
//! # Endpoints
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
