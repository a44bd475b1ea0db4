//! Error types for the telemetry core
//!
//! Uses thiserror for ergonomic error definitions.
//! Hard failures are limited to a vendor contract break while normalizing
//! and a rejected charge target before a command is issued; every other
//! missing-data condition degrades to optional fields instead of failing,
//! because vendor payloads omit fields inconsistently across vehicle
//! models and firmware versions.

use crate::units::UnitError;

/// Status normalization errors
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("Malformed vendor payload: missing required node {0}")]
    MalformedPayload(&'static str),
}

/// Errors raised while building outbound commands
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Invalid charge target {value}%: allowed targets are {allowed:?}")]
    InvalidChargeTarget {
        value: u32,
        allowed: &'static [u32],
    },

    #[error(transparent)]
    Unit(#[from] UnitError),
}

/// Umbrella error for vehicle handle calls
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Vendor endpoint answered HTTP {0}")]
    VendorStatus(u16),

    #[error("Transport failure: {0}")]
    Transport(#[from] anyhow::Error),
}
