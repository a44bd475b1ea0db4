//! Vehicle telemetry normalization
//!
//! Maps the two vendor wire shapes into the canonical models and drives
//! the collaborator interfaces through the vehicle handle.

pub mod client;
pub mod commands;
pub mod payload;
pub mod reports;
pub mod status;
pub mod types;

pub use client::{VehicleCache, VehicleClient};
pub use status::normalize_status;
pub use types::*;
