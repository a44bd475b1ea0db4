//! Canonical vehicle models handed to the embedding client
//!
//! These are the stable consumer-facing shapes; the two vendor wire
//! formats are folded into them by the status module. Optional fields are
//! skipped during serialization so consumers see exactly what the vendor
//! reported.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::units::TemperatureUnit;

/// Wire protocol variant a vehicle speaks, known from vehicle metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Flat top-level status fields
    Legacy,
    /// Nested state.Vehicle tree
    Ccs2,
}

/// Charge plug reported by the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PlugState {
    #[default]
    Unplugged,
    Fast,
    Portable,
}

impl PlugState {
    /// Decode the vendor plug code; unknown codes read as unplugged.
    pub fn from_code(code: u64) -> Self {
        match code {
            1 => PlugState::Fast,
            2 => PlugState::Portable,
            _ => PlugState::Unplugged,
        }
    }
}

/// Distance unit codes shared by range, odometer and speed payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum DistanceUnit {
    #[default]
    Kilometers,
    Miles,
}

impl DistanceUnit {
    pub fn from_code(code: u64) -> Self {
        match code {
            3 => DistanceUnit::Miles,
            _ => DistanceUnit::Kilometers,
        }
    }
}

/// Per-door open flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DoorStatus {
    pub front_left: bool,
    pub front_right: bool,
    pub back_left: bool,
    pub back_right: bool,
}

impl DoorStatus {
    pub fn any_open(&self) -> bool {
        self.front_left || self.front_right || self.back_left || self.back_right
    }
}

/// Low-pressure warnings, aggregate plus per wheel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TirePressureWarning {
    pub all: bool,
    pub front_left: bool,
    pub front_right: bool,
    pub rear_left: bool,
    pub rear_right: bool,
}

/// Body and door state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChassisStatus {
    pub hood_open: bool,
    pub trunk_open: bool,
    pub locked: bool,
    pub open_doors: DoorStatus,
    pub tire_pressure_warning: TirePressureWarning,
}

/// Cabin climate state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClimateStatus {
    pub active: bool,
    pub steering_wheel_heat: bool,
    pub side_mirror_heat: bool,
    pub rear_window_heat: bool,
    pub defrost: bool,
    /// Setpoint in Celsius after region decode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_setpoint: Option<f64>,
    pub temperature_unit: TemperatureUnit,
}

/// Drivetrain, charging and battery state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngineStatus {
    pub ignition: bool,
    pub accessory: bool,
    /// Total driving range
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_ev: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_gas: Option<f64>,
    pub plugged_to: PlugState,
    pub charging: bool,
    /// minutes, at the currently connected charger
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_current_charge_duration: Option<u32>,
    /// minutes, on a fast charger
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_fast_charge_duration: Option<u32>,
    /// minutes, on the portable charger
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_portable_charge_duration: Option<u32>,
    /// minutes, at a charging station
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_station_charge_duration: Option<u32>,
    /// % 12V auxiliary battery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_12v: Option<f64>,
    /// % high-voltage traction battery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_hv: Option<f64>,
}

/// Canonical vehicle status, one stable shape over both wire protocols
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VehicleStatus {
    pub chassis: ChassisStatus,
    pub climate: ClimateStatus,
    pub engine: EngineStatus,
    /// Vehicle-local time of the vendor snapshot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<NaiveDateTime>,
}

/// Odometer reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Odometer {
    pub value: f64,
    pub unit: DistanceUnit,
}

/// Reported speed, distance unit per hour
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Speed {
    pub value: f64,
    pub unit: DistanceUnit,
}

/// Last reported position
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VehicleLocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    /// degrees from north
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<Speed>,
}
