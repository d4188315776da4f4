//! Small, dependency-free helpers shared across modules.
//!
//! Current helpers:
//! - Epoch-aligned bucket arithmetic used for series block alignment,
//!   retention windows, and coverage reports.
pub mod time_bucket;
