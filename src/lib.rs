//! Connected-car telemetry normalization core
//!
//! Translates vendor status payloads (legacy flat fields and the nested
//! CCS2 tree) into one canonical vehicle model, tracks the vendor call
//! budget from response headers, and validates charge-target commands.
//! Transport and authentication are collaborator concerns.

pub mod config;
pub mod errors;
pub mod rate;
pub mod units;
pub mod vehicle;

pub use config::Config;
pub use rate::RateState;
pub use vehicle::client::VehicleClient;
