//! Response models for the diagnostics API
//!
//! This module defines the DTOs serialized into HTTP response bodies.

pub mod responses;

pub use responses::{HealthResponse, StatsResponse};
