//! Integration tests for carlink-telemetry-rs
//!
//! These tests drive the vehicle handle against an in-memory request
//! issuer with canned vendor payloads; no network is involved.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use carlink_telemetry_rs::config::Config;
use carlink_telemetry_rs::errors::{ClientError, NormalizeError};
use carlink_telemetry_rs::vehicle::client::{
    Method, RequestIssuer, SessionProvider, VehicleCache, VehicleClient, VendorResponse,
};
use carlink_telemetry_rs::units::Region;
use carlink_telemetry_rs::vehicle::commands::{ChargePlug, ClimateOptions, CommandOutcome};
use carlink_telemetry_rs::vehicle::reports::{TripPeriod, Trips};
use carlink_telemetry_rs::vehicle::types::{PlugState, Protocol};

// ============================================================================
// Test doubles
// ============================================================================

struct Session;

impl SessionProvider for Session {
    fn vehicle_id(&self) -> &str {
        "KMHC891ABCD012345"
    }

    fn device_id(&self) -> &str {
        "device-0001"
    }
}

type RequestLog = Rc<RefCell<Vec<(Method, String, Option<Value>)>>>;

/// Replays canned responses in order and records every exchange.
struct CannedIssuer {
    responses: Vec<VendorResponse>,
    log: RequestLog,
}

impl CannedIssuer {
    fn new(responses: Vec<VendorResponse>) -> (Self, RequestLog) {
        let log: RequestLog = Rc::new(RefCell::new(Vec::new()));
        (
            Self {
                responses,
                log: log.clone(),
            },
            log,
        )
    }
}

impl RequestIssuer for CannedIssuer {
    fn request(
        &mut self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> anyhow::Result<VendorResponse> {
        self.log
            .borrow_mut()
            .push((method, path.to_string(), body.cloned()));
        if self.responses.is_empty() {
            anyhow::bail!("no canned response left for {}", path);
        }
        Ok(self.responses.remove(0))
    }
}

fn ok(body: Value) -> VendorResponse {
    VendorResponse {
        status: 200,
        headers: HashMap::new(),
        body,
    }
}

fn ok_with_headers(body: Value, pairs: &[(&str, &str)]) -> VendorResponse {
    VendorResponse {
        status: 200,
        headers: pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
        body,
    }
}

fn config(region: &str, ccs2: bool) -> Config {
    let toml_str = format!(
        "[vehicle]\nregion = \"{}\"\nccs2 = {}\nstatus_max_age = \"1h\"\n",
        region, ccs2
    );
    toml::from_str(&toml_str).unwrap()
}

fn legacy_status_body() -> Value {
    json!({
        "retCode": "S",
        "resCode": "0000",
        "resMsg": {
            "doorLock": true,
            "airCtrlOn": false,
            "airTemp": {"value": "0AH", "unit": 0},
            "evStatus": {
                "batteryCharge": true,
                "batteryStatus": 72,
                "batteryPlugin": 1,
                "drvDistance": [{
                    "rangeByFuel": {
                        "evModeRange": {"value": 120, "unit": 1},
                        "gasModeRange": {"value": 80, "unit": 1},
                        "totalAvailableRange": {"value": 0, "unit": 1}
                    }
                }]
            },
            "time": "20240318153024"
        }
    })
}

fn ccs2_status_body() -> Value {
    json!({
        "resMsg": {
            "lastUpdateTime": "20240318153024",
            "state": {
                "Vehicle": {
                    "Cabin": {
                        "Door": {
                            "Row1": {
                                "Driver": {"Open": 0, "Lock": 1},
                                "Passenger": {"Open": 0, "Lock": 1}
                            },
                            "Row2": {
                                "Left": {"Open": 0, "Lock": 1},
                                "Right": {"Open": 0, "Lock": 1}
                            }
                        }
                    },
                    "Chassis": {
                        "Axle": {
                            "Tire": {"PressureLow": 0},
                            "Row1": {
                                "Left": {"Tire": {"PressureLow": 0}},
                                "Right": {"Tire": {"PressureLow": 0}}
                            },
                            "Row2": {
                                "Left": {"Tire": {"PressureLow": 0}},
                                "Right": {"Tire": {"PressureLow": 0}}
                            }
                        }
                    },
                    "Drivetrain": {"FuelSystem": {"DTE": {"Total": 420}}},
                    "Electronics": {"Battery": {"Level": 87}},
                    "Green": {
                        "BatteryManagement": {"BatteryRemain": {"Ratio": 64.5}},
                        "ChargingInformation": {
                            "ConnectorFastening": {"State": 1},
                            "Charging": {"RemainTime": 45}
                        }
                    }
                }
            }
        }
    })
}

// ============================================================================
// Status normalization through the handle
// ============================================================================

#[test]
fn test_legacy_status_fetch_normalizes_and_caches() {
    let (issuer, log) = CannedIssuer::new(vec![ok(legacy_status_body())]);
    let mut client = VehicleClient::new(issuer, Session, &config("EU", false));
    let mut cache = VehicleCache::default();

    let status = client.status(&mut cache, true).unwrap();

    assert!(status.chassis.locked);
    assert_eq!(status.climate.temperature_setpoint, Some(19.0));
    assert_eq!(status.engine.plugged_to, PlugState::Fast);
    // zero vendor total, partials present: derived as their sum
    assert_eq!(status.engine.range, Some(200.0));
    assert_eq!(cache.status.as_ref(), Some(&status));
    assert!(cache.refreshed_at.is_some());

    let requests = log.borrow();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, Method::Get);
    assert_eq!(requests[0].1, "/vehicles/KMHC891ABCD012345/status");
}

#[test]
fn test_ccs2_status_fetch_uses_ccs2_paths() {
    let (issuer, log) = CannedIssuer::new(vec![ok(ccs2_status_body())]);
    let mut client = VehicleClient::new(issuer, Session, &config("EU", true));
    let mut cache = VehicleCache::default();

    let status = client.status(&mut cache, false).unwrap();

    assert!(status.chassis.locked);
    assert!(status.engine.charging);
    assert_eq!(status.engine.range, Some(420.0));
    assert_eq!(status.engine.battery_hv, Some(64.5));
    assert_eq!(
        log.borrow()[0].1,
        "/ccs2/carstatus/KMHC891ABCD012345/latest"
    );
}

#[test]
fn test_ccs2_contract_break_surfaces_malformed_payload() {
    let (issuer, _log) = CannedIssuer::new(vec![ok(json!({"resMsg": {"state": {}}}))]);
    let mut client = VehicleClient::new(issuer, Session, &config("EU", true));
    let mut cache = VehicleCache::default();

    let err = client.status(&mut cache, true).unwrap_err();
    assert!(matches!(
        err,
        ClientError::Normalize(NormalizeError::MalformedPayload("/state/Vehicle"))
    ));
    // nothing was cached from the failed normalization
    assert!(cache.status.is_none());
}

#[test]
fn test_fresh_cache_short_circuits_the_issuer() {
    let (issuer, log) = CannedIssuer::new(vec![ok(legacy_status_body())]);
    let mut client = VehicleClient::new(issuer, Session, &config("EU", false));
    let mut cache = VehicleCache::default();

    let first = client.status(&mut cache, false).unwrap();
    let second = client.status(&mut cache, false).unwrap();

    assert_eq!(first, second);
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn test_refresh_forces_the_exchange_and_overwrites_the_cache() {
    let mut updated = legacy_status_body();
    updated["resMsg"]["doorLock"] = json!(false);
    let (issuer, log) = CannedIssuer::new(vec![ok(legacy_status_body()), ok(updated)]);
    let mut client = VehicleClient::new(issuer, Session, &config("EU", false));
    let mut cache = VehicleCache::default();

    assert!(client.status(&mut cache, true).unwrap().chassis.locked);
    // second normalization wins, whole snapshot replaced
    assert!(!client.status(&mut cache, true).unwrap().chassis.locked);
    assert!(!cache.status.as_ref().unwrap().chassis.locked);
    assert_eq!(log.borrow().len(), 2);
}

#[test]
fn test_handle_reflects_the_configured_protocol_and_region() {
    let (issuer, _log) = CannedIssuer::new(vec![]);
    let client = VehicleClient::new(issuer, Session, &config("CA", true));
    assert_eq!(client.region(), Region::Ca);
    assert_eq!(client.protocol(), Protocol::Ccs2);
}

#[test]
fn test_full_status_caches_the_raw_vendor_tree() {
    let (issuer, log) = CannedIssuer::new(vec![ok(ccs2_status_body())]);
    let mut client = VehicleClient::new(issuer, Session, &config("EU", true));
    let mut cache = VehicleCache::default();

    let raw = client.full_status(&mut cache).unwrap();
    assert_eq!(raw.pointer("/state/Vehicle/Electronics/Battery/Level"), Some(&json!(87)));
    assert_eq!(cache.full_status.as_ref(), Some(&raw));
    assert_eq!(
        log.borrow()[0].1,
        "/ccs2/carstatus/KMHC891ABCD012345/full"
    );
}

#[test]
fn test_vendor_http_failure_is_a_hard_error() {
    let (issuer, _log) = CannedIssuer::new(vec![VendorResponse {
        status: 502,
        headers: HashMap::new(),
        body: json!({}),
    }]);
    let mut client = VehicleClient::new(issuer, Session, &config("EU", false));
    let mut cache = VehicleCache::default();

    assert!(matches!(
        client.status(&mut cache, true),
        Err(ClientError::VendorStatus(502))
    ));
}

// ============================================================================
// Rate tracking
// ============================================================================

#[test]
fn test_rate_headers_feed_the_tracker_on_every_exchange() {
    let (issuer, _log) = CannedIssuer::new(vec![
        ok_with_headers(
            legacy_status_body(),
            &[
                ("x-ratelimit-limit", "100"),
                ("x-ratelimit-remaining", "42"),
                ("x-ratelimit-reset", "1700000000"),
            ],
        ),
        ok(json!({"resMsg": {"odometer": {"value": 37225.5, "unit": 1}}})),
    ]);
    let mut client = VehicleClient::new(issuer, Session, &config("EU", false));
    let mut cache = VehicleCache::default();

    client.status(&mut cache, true).unwrap();
    assert_eq!(cache.rate.max, 100);
    assert_eq!(cache.rate.current, 42);
    assert_eq!(
        cache.rate.reset,
        Some(Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap())
    );
    let quota_seen_at = cache.rate.updated_at;

    // odometer answer carries no quota headers: snapshot untouched
    client.odometer(&mut cache).unwrap();
    assert_eq!(cache.rate.max, 100);
    assert_eq!(cache.rate.current, 42);
    assert_eq!(cache.rate.updated_at, quota_seen_at);
}

// ============================================================================
// Charge targets
// ============================================================================

#[test]
fn test_invalid_charge_target_fails_before_any_request() {
    let (issuer, log) = CannedIssuer::new(vec![]);
    let mut client = VehicleClient::new(issuer, Session, &config("EU", false));
    let mut cache = VehicleCache::default();

    let err = client.set_charge_targets(&mut cache, 55, 90).unwrap_err();
    assert!(err.to_string().contains("55"));
    assert!(err.to_string().contains("[50, 60, 70, 80, 90, 100]"));
    assert!(log.borrow().is_empty());
}

#[test]
fn test_valid_charge_targets_send_both_plug_channels() {
    let (issuer, log) = CannedIssuer::new(vec![ok(json!({"retCode": "S", "resCode": "0000"}))]);
    let mut client = VehicleClient::new(issuer, Session, &config("EU", false));
    let mut cache = VehicleCache::default();

    let outcome = client.set_charge_targets(&mut cache, 50, 90).unwrap();
    assert_eq!(outcome, CommandOutcome::Success);

    let requests = log.borrow();
    let body = requests[0].2.as_ref().unwrap();
    let list = body["targetSOClist"].as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["targetSOClevel"], 50);
    assert_eq!(list[1]["targetSOClevel"], 90);
}

#[test]
fn test_current_charge_targets_are_read_per_plug() {
    let (issuer, _log) = CannedIssuer::new(vec![ok(json!({
        "resMsg": {
            "targetSOClist": [
                {"plugType": 0, "targetSOClevel": 80},
                {"plugType": 1, "targetSOClevel": 100}
            ]
        }
    }))]);
    let mut client = VehicleClient::new(issuer, Session, &config("EU", false));
    let mut cache = VehicleCache::default();

    let targets = client.charge_targets(&mut cache).unwrap();
    assert_eq!(targets.len(), 2);
    assert_eq!(targets[0].plug, ChargePlug::Fast);
    assert_eq!(targets[0].target, 80);
    assert_eq!(targets[1].plug, ChargePlug::Slow);
    assert_eq!(targets[1].target, 100);
}

#[test]
fn test_climate_start_encodes_the_setpoint_for_the_region() {
    let (issuer, log) = CannedIssuer::new(vec![ok(json!({"retCode": "S"}))]);
    let mut client = VehicleClient::new(issuer, Session, &config("EU", false));
    let mut cache = VehicleCache::default();

    let options = ClimateOptions {
        temperature: 21.5,
        defrost: true,
        windscreen_heating: false,
    };
    client.start_climate(&mut cache, &options).unwrap();

    let requests = log.borrow();
    assert_eq!(requests[0].1, "/vehicles/KMHC891ABCD012345/control/temperature");
    let body = requests[0].2.as_ref().unwrap();
    assert_eq!(body["tempCode"], "0FH");
    assert_eq!(body["options"]["defrost"], true);
}

#[test]
fn test_configured_pin_is_stamped_into_command_bodies() {
    let toml_str = "[vehicle]\nregion = \"EU\"\npin = \"1234\"\n";
    let config: Config = toml::from_str(toml_str).unwrap();
    let (issuer, log) = CannedIssuer::new(vec![ok(json!({"retCode": "S"}))]);
    let mut client = VehicleClient::new(issuer, Session, &config);
    let mut cache = VehicleCache::default();

    client.lock(&mut cache).unwrap();

    let requests = log.borrow();
    let body = requests[0].2.as_ref().unwrap();
    assert_eq!(body["pin"], "1234");
    assert_eq!(body["action"], "close");
    assert_eq!(body["deviceId"], "device-0001");
}

#[test]
fn test_command_no_op_and_rejection_are_values_not_errors() {
    let (issuer, _log) = CannedIssuer::new(vec![
        ok(json!({"retCode": "F", "resCode": "1003"})),
        ok(json!({"retCode": "F", "resCode": "5091", "resMsg": "PIN locked"})),
    ]);
    let mut client = VehicleClient::new(issuer, Session, &config("EU", false));
    let mut cache = VehicleCache::default();

    assert_eq!(client.unlock(&mut cache).unwrap(), CommandOutcome::NoOp);
    let outcome = client.unlock(&mut cache).unwrap();
    assert_eq!(
        outcome,
        CommandOutcome::Rejected {
            code: "5091".to_string(),
            message: "PIN locked".to_string(),
        }
    );
}

// ============================================================================
// Reports and trips
// ============================================================================

#[test]
fn test_monthly_trip_query_returns_the_monthly_shape() {
    let (issuer, log) = CannedIssuer::new(vec![ok(json!({
        "resMsg": {
            "tripDayList": [{"tripDayInMonth": "20240305", "tripCntDay": 3}],
            "tripDist": 321.4,
            "tripDrvTime": 410,
            "tripIdleTime": 35,
            "tripAvgSpeed": 46.5,
            "tripMaxSpeed": 132
        }
    }))]);
    let mut client = VehicleClient::new(issuer, Session, &config("EU", false));
    let mut cache = VehicleCache::default();

    let period = TripPeriod::Month {
        year: 2024,
        month: 3,
    };
    let Some(Trips::Monthly(month)) = client.trips(&mut cache, &period).unwrap() else {
        panic!("expected the monthly shape");
    };
    assert_eq!(month.days.len(), 1);
    assert_eq!(month.speed.max, Some(132.0));

    let requests = log.borrow();
    assert_eq!(requests[0].2.as_ref().unwrap()["setTripMonth"], "202403");
}

#[test]
fn test_daily_trip_query_returns_per_trip_timestamps() {
    let (issuer, log) = CannedIssuer::new(vec![ok(json!({
        "resMsg": {
            "dayTripList": [{
                "tripDay": "20240318",
                "dayTripCnt": 1,
                "tripList": [{"tripTime": "081500", "tripDrvTime": 25, "tripDist": 17.3}]
            }]
        }
    }))]);
    let mut client = VehicleClient::new(issuer, Session, &config("EU", false));
    let mut cache = VehicleCache::default();

    let period = TripPeriod::Day {
        date: chrono::NaiveDate::from_ymd_opt(2024, 3, 18).unwrap(),
    };
    let Some(Trips::Daily(days)) = client.trips(&mut cache, &period).unwrap() else {
        panic!("expected the daily shape");
    };
    let trip = &days[0].trips[0];
    let start = trip.start.unwrap();
    assert_eq!(trip.end.unwrap() - start, chrono::Duration::minutes(25));

    let requests = log.borrow();
    assert_eq!(requests[0].2.as_ref().unwrap()["setTripDay"], "20240318");
}

#[test]
fn test_location_and_drive_history_normalize_through_the_handle() {
    let (issuer, _log) = CannedIssuer::new(vec![
        ok(json!({
            "resMsg": {
                "coord": {"lat": 52.52, "lon": 13.405, "alt": 34.0},
                "head": 270,
                "speed": {"value": 0, "unit": 1}
            }
        })),
        ok(json!({
            "resMsg": {
                "drivingInfo": [{
                    "drivingPeriod": 0,
                    "totalPwrCsp": 1421.0,
                    "regenPwr": 312.0,
                    "calculativeOdo": 7421.0
                }]
            }
        })),
    ]);
    let mut client = VehicleClient::new(issuer, Session, &config("EU", false));
    let mut cache = VehicleCache::default();

    let location = client.location(&mut cache).unwrap().unwrap();
    assert_eq!(location.latitude, Some(52.52));
    assert_eq!(cache.location.as_ref(), Some(&location));

    let history = client.drive_history(&mut cache).unwrap().unwrap();
    assert_eq!(history.cumulated.len(), 1);
    assert_eq!(history.cumulated[0].regenerated_energy, Some(312.0));
}

#[test]
fn test_monthly_report_omits_absent_groups() {
    let (issuer, _log) = CannedIssuer::new(vec![ok(json!({
        "resMsg": {
            "monthlyReport": {
                "ifo": {"mvrMonthStart": "20240301", "mvrMonthEnd": "20240331"}
            }
        }
    }))]);
    let mut client = VehicleClient::new(issuer, Session, &config("EU", false));
    let mut cache = VehicleCache::default();

    let report = client.monthly_report(&mut cache, 2024, 3).unwrap().unwrap();
    assert_eq!(report.start.as_deref(), Some("20240301"));
    assert!(report.driving.is_none());
    assert!(report.vehicle_status.is_none());
    assert!(report.breakdown.is_none());
}

#[test]
fn test_absent_report_yields_none_not_an_error() {
    let (issuer, _log) = CannedIssuer::new(vec![ok(json!({"resMsg": {}}))]);
    let mut client = VehicleClient::new(issuer, Session, &config("EU", false));
    let mut cache = VehicleCache::default();

    assert!(client.monthly_report(&mut cache, 2024, 3).unwrap().is_none());
}

// ============================================================================
// Transport failures
// ============================================================================

#[test]
fn test_issuer_failure_surfaces_as_transport_error() {
    let (issuer, _log) = CannedIssuer::new(vec![]);
    let mut client = VehicleClient::new(issuer, Session, &config("EU", false));
    let mut cache = VehicleCache::default();

    assert!(matches!(
        client.status(&mut cache, true),
        Err(ClientError::Transport(_))
    ));
}
