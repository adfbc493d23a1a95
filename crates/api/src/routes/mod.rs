//! Route Handlers

pub mod info;
pub mod predict;
pub mod telemetry;
