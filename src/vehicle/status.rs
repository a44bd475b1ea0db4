//! Status normalization for both vendor wire shapes
//!
//! Pure mapping functions: raw JSON in, canonical status out. The legacy
//! flat shape is fully soft. The CCS2 tree has three load-bearing nodes
//! whose absence is a vendor contract break, everything below them is soft
//! again.

use serde_json::Value;
use tracing::debug;

use super::payload::{code_eq, f64_at, flag_at, require, str_at, u32_at, u64_at};
use super::types::{
    ChassisStatus, ClimateStatus, DistanceUnit, DoorStatus, EngineStatus, Odometer, PlugState,
    Protocol, Speed, TirePressureWarning, VehicleLocation, VehicleStatus,
};
use crate::errors::NormalizeError;
use crate::units::{self, Region, TemperatureUnit};

/// Normalize one raw status payload into the canonical model.
pub fn normalize_status(
    raw: &Value,
    protocol: Protocol,
    region: Region,
) -> Result<VehicleStatus, NormalizeError> {
    let mut status = match protocol {
        Protocol::Legacy => from_legacy(raw, region),
        Protocol::Ccs2 => from_ccs2(raw)?,
    };
    derive_total_range(&mut status.engine);
    debug!(
        locked = status.chassis.locked,
        charging = status.engine.charging,
        range = status.engine.range,
        "normalized vehicle status"
    );
    Ok(status)
}

/// Vendors that report only partial ranges leave the total absent or
/// zero; reconcile by summing the partials. An explicit non-zero total
/// always wins.
fn derive_total_range(engine: &mut EngineStatus) {
    let total_missing = engine.range.map_or(true, |range| range == 0.0);
    let ev = engine.range_ev.unwrap_or(0.0);
    let gas = engine.range_gas.unwrap_or(0.0);
    if total_missing && (ev != 0.0 || gas != 0.0) {
        engine.range = Some(ev + gas);
    }
}

fn from_legacy(raw: &Value, region: Region) -> VehicleStatus {
    let temperature_setpoint = str_at(raw, "/airTemp/value")
        .and_then(|code| units::code_to_celsius(region, code).ok());

    VehicleStatus {
        chassis: ChassisStatus {
            hood_open: flag_at(raw, "/hoodOpen"),
            trunk_open: flag_at(raw, "/trunkOpen"),
            locked: flag_at(raw, "/doorLock"),
            open_doors: DoorStatus {
                front_left: flag_at(raw, "/doorOpen/frontLeft"),
                front_right: flag_at(raw, "/doorOpen/frontRight"),
                back_left: flag_at(raw, "/doorOpen/backLeft"),
                back_right: flag_at(raw, "/doorOpen/backRight"),
            },
            tire_pressure_warning: TirePressureWarning {
                all: code_eq(raw, "/tirePressureLamp/tirePressureLampAll", 1),
                front_left: code_eq(raw, "/tirePressureLamp/tirePressureLampFL", 1),
                front_right: code_eq(raw, "/tirePressureLamp/tirePressureLampFR", 1),
                rear_left: code_eq(raw, "/tirePressureLamp/tirePressureLampRL", 1),
                rear_right: code_eq(raw, "/tirePressureLamp/tirePressureLampRR", 1),
            },
        },
        climate: ClimateStatus {
            active: flag_at(raw, "/airCtrlOn"),
            steering_wheel_heat: flag_at(raw, "/steerWheelHeat"),
            // one vendor flag covers mirrors and the rear window
            side_mirror_heat: flag_at(raw, "/sideBackWindowHeat"),
            rear_window_heat: flag_at(raw, "/sideBackWindowHeat"),
            defrost: flag_at(raw, "/defrost"),
            temperature_setpoint,
            temperature_unit: TemperatureUnit::from_code(
                u64_at(raw, "/airTemp/unit").unwrap_or(0),
            ),
        },
        engine: EngineStatus {
            ignition: flag_at(raw, "/engine"),
            accessory: flag_at(raw, "/acc"),
            range: f64_at(raw, "/evStatus/drvDistance/0/rangeByFuel/totalAvailableRange/value"),
            range_ev: f64_at(raw, "/evStatus/drvDistance/0/rangeByFuel/evModeRange/value"),
            range_gas: f64_at(raw, "/evStatus/drvDistance/0/rangeByFuel/gasModeRange/value"),
            plugged_to: PlugState::from_code(u64_at(raw, "/evStatus/batteryPlugin").unwrap_or(0)),
            charging: flag_at(raw, "/evStatus/batteryCharge"),
            estimated_current_charge_duration: u32_at(raw, "/evStatus/remainTime2/atc/value"),
            estimated_fast_charge_duration: u32_at(raw, "/evStatus/remainTime2/etc1/value"),
            estimated_portable_charge_duration: u32_at(raw, "/evStatus/remainTime2/etc2/value"),
            estimated_station_charge_duration: u32_at(raw, "/evStatus/remainTime2/etc3/value"),
            battery_12v: f64_at(raw, "/battery/batSoc"),
            battery_hv: f64_at(raw, "/evStatus/batteryStatus"),
        },
        last_updated: str_at(raw, "/time").and_then(units::parse_vehicle_timestamp),
    }
}

fn from_ccs2(raw: &Value) -> Result<VehicleStatus, NormalizeError> {
    let vehicle = require(raw, "/state/Vehicle")?;
    let axle = require(vehicle, "/Chassis/Axle")?;
    let door = require(vehicle, "/Cabin/Door")?;

    let connector =
        u64_at(vehicle, "/Green/ChargingInformation/ConnectorFastening/State").unwrap_or(0);
    let remain = u32_at(vehicle, "/Green/ChargingInformation/Charging/RemainTime");
    // The CCS2 tree reports a single DTE total; EV and gas splits are not
    // exposed separately, so all three canonical ranges read the same node.
    let dte_total = f64_at(vehicle, "/Drivetrain/FuelSystem/DTE/Total");

    Ok(VehicleStatus {
        chassis: ChassisStatus {
            hood_open: flag_at(vehicle, "/Body/Hood/Open"),
            trunk_open: flag_at(vehicle, "/Body/Trunk/Open"),
            // locked only when all four doors report locked
            locked: flag_at(door, "/Row1/Driver/Lock")
                && flag_at(door, "/Row1/Passenger/Lock")
                && flag_at(door, "/Row2/Left/Lock")
                && flag_at(door, "/Row2/Right/Lock"),
            open_doors: DoorStatus {
                front_left: flag_at(door, "/Row1/Driver/Open"),
                front_right: flag_at(door, "/Row1/Passenger/Open"),
                back_left: flag_at(door, "/Row2/Left/Open"),
                back_right: flag_at(door, "/Row2/Right/Open"),
            },
            tire_pressure_warning: TirePressureWarning {
                all: code_eq(axle, "/Tire/PressureLow", 1),
                front_left: code_eq(axle, "/Row1/Left/Tire/PressureLow", 1),
                front_right: code_eq(axle, "/Row1/Right/Tire/PressureLow", 1),
                rear_left: code_eq(axle, "/Row2/Left/Tire/PressureLow", 1),
                rear_right: code_eq(axle, "/Row2/Right/Tire/PressureLow", 1),
            },
        },
        climate: ClimateStatus {
            active: u64_at(vehicle, "/Cabin/HVAC/Row1/Driver/Blower/SpeedLevel").unwrap_or(0) > 0,
            steering_wheel_heat: code_eq(vehicle, "/Cabin/SteeringWheel/Heat/State", 1),
            side_mirror_heat: code_eq(vehicle, "/Cabin/SideMirror/Heat/State", 1),
            rear_window_heat: code_eq(vehicle, "/Body/Windshield/Rear/Defog/State", 1),
            defrost: code_eq(vehicle, "/Body/Windshield/Front/Defog/State", 1),
            temperature_setpoint: f64_at(vehicle, "/Cabin/HVAC/Row1/Driver/Temperature/Value"),
            temperature_unit: TemperatureUnit::from_code(
                u64_at(vehicle, "/Cabin/HVAC/Row1/Driver/Temperature/Unit").unwrap_or(0),
            ),
        },
        engine: EngineStatus {
            ignition: flag_at(vehicle, "/Electronics/PowerSupply/Ignition1"),
            accessory: flag_at(vehicle, "/Electronics/PowerSupply/Accessory"),
            range: dte_total,
            range_ev: dte_total,
            range_gas: dte_total,
            plugged_to: PlugState::from_code(connector),
            charging: connector != 0 && remain.unwrap_or(0) > 0,
            estimated_current_charge_duration: remain,
            estimated_fast_charge_duration: u32_at(
                vehicle,
                "/Green/ChargingInformation/EstimatedTime/Quick",
            ),
            estimated_portable_charge_duration: u32_at(
                vehicle,
                "/Green/ChargingInformation/EstimatedTime/ICCB",
            ),
            estimated_station_charge_duration: u32_at(
                vehicle,
                "/Green/ChargingInformation/EstimatedTime/Standard",
            ),
            battery_12v: f64_at(vehicle, "/Electronics/Battery/Level"),
            battery_hv: f64_at(vehicle, "/Green/BatteryManagement/BatteryRemain/Ratio"),
        },
        last_updated: str_at(raw, "/lastUpdateTime").and_then(units::parse_vehicle_timestamp),
    })
}

/// Map a raw odometer answer (soft).
pub fn normalize_odometer(raw: &Value) -> Option<Odometer> {
    let value = f64_at(raw, "/odometer/value")?;
    Some(Odometer {
        value,
        unit: DistanceUnit::from_code(u64_at(raw, "/odometer/unit").unwrap_or(1)),
    })
}

/// Map a raw location answer (soft).
pub fn normalize_location(raw: &Value) -> Option<VehicleLocation> {
    let coord = raw.pointer("/coord")?;
    Some(VehicleLocation {
        latitude: f64_at(coord, "/lat"),
        longitude: f64_at(coord, "/lon"),
        altitude: f64_at(coord, "/alt"),
        heading: f64_at(raw, "/head"),
        speed: raw.pointer("/speed").map(|speed| Speed {
            value: f64_at(speed, "/value").unwrap_or(0.0),
            unit: DistanceUnit::from_code(u64_at(speed, "/unit").unwrap_or(1)),
        }),
    })
}
