//! Outbound command validation and body construction
//!
//! Bodies are pure values; the handle sends them through the request
//! issuer. Vendor verdicts come back as values too: an HTTP 200 carrying a
//! failure result code is a `Rejected` outcome, not an error.

use serde::Serialize;
use serde_json::{json, Value};

use super::payload::{str_at, u32_at, u64_at};
use crate::errors::CommandError;
use crate::units::{celsius_to_code, Region};

/// SoC checkpoints the vehicle hardware accepts as charge targets
pub const ALLOWED_CHARGE_TARGETS: [u32; 6] = [50, 60, 70, 80, 90, 100];

/// Result code the vendor uses for "already in the requested state"
const RES_CODE_NO_OP: &str = "1003";

/// Charge plug channel a target applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChargePlug {
    Fast,
    Slow,
}

impl ChargePlug {
    fn wire_code(self) -> u32 {
        match self {
            ChargePlug::Fast => 0,
            ChargePlug::Slow => 1,
        }
    }

    fn from_wire_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(ChargePlug::Fast),
            1 => Some(ChargePlug::Slow),
            _ => None,
        }
    }
}

/// Current per-plug target as reported by the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChargeTargetState {
    pub plug: ChargePlug,
    pub target: u32,
}

/// Check both requested targets against the allowed set.
///
/// Fails before any request is issued; either both targets are sent or
/// neither.
pub fn validate_charge_targets(fast: u32, slow: u32) -> Result<(), CommandError> {
    for value in [fast, slow] {
        if !ALLOWED_CHARGE_TARGETS.contains(&value) {
            return Err(CommandError::InvalidChargeTarget {
                value,
                allowed: &ALLOWED_CHARGE_TARGETS,
            });
        }
    }
    Ok(())
}

/// Body for the charge-target command; call after validation.
pub fn charge_target_body(fast: u32, slow: u32) -> Value {
    json!({
        "targetSOClist": [
            {"plugType": ChargePlug::Fast.wire_code(), "targetSOClevel": fast},
            {"plugType": ChargePlug::Slow.wire_code(), "targetSOClevel": slow},
        ]
    })
}

/// Read the vehicle's current charge targets (soft).
pub fn normalize_charge_targets(raw: &Value) -> Vec<ChargeTargetState> {
    raw.pointer("/targetSOClist")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|entry| {
                    let plug = ChargePlug::from_wire_code(u64_at(entry, "/plugType")?)?;
                    let target = u32_at(entry, "/targetSOClevel")?;
                    Some(ChargeTargetState { plug, target })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Climate command options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateOptions {
    /// Setpoint in Celsius, encoded per region
    pub temperature: f64,
    pub defrost: bool,
    pub windscreen_heating: bool,
}

/// Body for the climate start command.
pub fn climate_start_body(region: Region, options: &ClimateOptions) -> Result<Value, CommandError> {
    let temp_code = celsius_to_code(region, options.temperature)?;
    Ok(json!({
        "action": "start",
        "hvacType": 0,
        "options": {
            "defrost": options.defrost,
            "heating1": i32::from(options.windscreen_heating),
        },
        "tempCode": temp_code,
        "unit": "C",
    }))
}

pub fn climate_stop_body() -> Value {
    json!({"action": "stop", "hvacType": 0})
}

/// Body for the door lock/unlock command.
pub fn door_body(lock: bool, device_id: &str) -> Value {
    json!({
        "action": if lock { "close" } else { "open" },
        "deviceId": device_id,
    })
}

/// Vendor verdict for a control command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Command accepted and executed
    Success,
    /// Vehicle already in the requested state
    NoOp,
    /// Vendor accepted the request but refused the command
    Rejected { code: String, message: String },
}

/// Decode the vendor's command envelope (`retCode` S/F plus a result code).
pub fn interpret_command_response(body: &Value) -> CommandOutcome {
    let res_code = str_at(body, "/resCode").unwrap_or_default();
    if res_code == RES_CODE_NO_OP {
        return CommandOutcome::NoOp;
    }
    match str_at(body, "/retCode") {
        Some("S") | None => CommandOutcome::Success,
        _ => CommandOutcome::Rejected {
            code: res_code.to_string(),
            message: str_at(body, "/resMsg").unwrap_or("").to_string(),
        },
    }
}
