//! Vehicle handle driving the collaborator interfaces
//!
//! The handle owns no transport: a `RequestIssuer` performs the HTTP
//! exchange for a relative path, a `SessionProvider` supplies the vehicle
//! and device identifiers. Every response's headers feed the rate tracker
//! before the body reaches a normalizer.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::commands::{self, ChargeTargetState, ClimateOptions, CommandOutcome};
use super::reports::{
    normalize_drive_history, normalize_monthly_report, normalize_trips, DriveHistory,
    MonthlyReport, TripPeriod, Trips,
};
use super::status::{normalize_location, normalize_odometer, normalize_status};
use super::types::{Odometer, Protocol, VehicleLocation, VehicleStatus};
use crate::config::Config;
use crate::errors::ClientError;
use crate::rate::RateState;
use crate::units::Region;

/// HTTP method of a vendor exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// One vendor response as delivered by the issuer
#[derive(Debug, Clone)]
pub struct VendorResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Value,
}

/// Collaborator performing the HTTP exchange; owns URLs, auth and retries
pub trait RequestIssuer {
    fn request(
        &mut self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> anyhow::Result<VendorResponse>;
}

/// Collaborator supplying session-scoped identifiers
pub trait SessionProvider {
    /// Vehicle identifier used in request paths
    fn vehicle_id(&self) -> &str;
    /// Registered device identifier stamped into command bodies
    fn device_id(&self) -> &str;
}

/// Last-known-good state for one vehicle, owned by the embedding client
///
/// Overwritten whole on each successful normalization. Concurrent fetches
/// against the same handle are last-write-wins by design; callers needing
/// consistency must serialize at the transport layer.
#[derive(Debug, Clone, Default)]
pub struct VehicleCache {
    pub status: Option<VehicleStatus>,
    /// Raw vendor tree of the last full-status fetch
    pub full_status: Option<Value>,
    pub odometer: Option<Odometer>,
    pub location: Option<VehicleLocation>,
    pub rate: RateState,
    /// When `status` was last refreshed from the vendor
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl VehicleCache {
    fn status_fresh(&self, max_age: Duration) -> bool {
        self.refreshed_at.map_or(false, |at| Utc::now() - at < max_age)
    }
}

/// Vendor bodies arrive wrapped in a result envelope; fetch the payload.
fn payload_of(body: &Value) -> &Value {
    body.pointer("/resMsg").unwrap_or(body)
}

/// Handle for one vehicle
pub struct VehicleClient<R, S> {
    issuer: R,
    session: S,
    region: Region,
    protocol: Protocol,
    pin: Option<String>,
    status_max_age: Duration,
}

impl<R: RequestIssuer, S: SessionProvider> VehicleClient<R, S> {
    pub fn new(issuer: R, session: S, config: &Config) -> Self {
        let protocol = if config.vehicle.ccs2 {
            Protocol::Ccs2
        } else {
            Protocol::Legacy
        };
        info!(region = %config.vehicle.region, ?protocol, "creating vehicle client");
        Self {
            issuer,
            session,
            region: config.vehicle.region,
            protocol,
            pin: config.vehicle.pin.clone(),
            status_max_age: Duration::from_std(config.vehicle.status_max_age)
                .unwrap_or_else(|_| Duration::zero()),
        }
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Issue one exchange and fold its headers into the rate snapshot.
    fn exchange(
        &mut self,
        cache: &mut VehicleCache,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ClientError> {
        debug!(%method, path, "vendor exchange");
        let response = self.issuer.request(method, path, body)?;
        cache.rate = cache.rate.observe(&response.headers);
        if !(200..300).contains(&response.status) {
            warn!(status = response.status, path, "vendor exchange failed");
            return Err(ClientError::VendorStatus(response.status));
        }
        Ok(response.body)
    }

    fn status_path(&self, refresh: bool) -> String {
        let id = self.session.vehicle_id();
        match (self.protocol, refresh) {
            (Protocol::Ccs2, true) => format!("/ccs2/carstatus/{}", id),
            (Protocol::Ccs2, false) => format!("/ccs2/carstatus/{}/latest", id),
            (Protocol::Legacy, true) => format!("/vehicles/{}/status", id),
            (Protocol::Legacy, false) => format!("/vehicles/{}/status/latest", id),
        }
    }

    /// Current status. With `refresh` false, a cache younger than the
    /// configured max age is returned without touching the vendor;
    /// `refresh` true polls the vehicle itself.
    pub fn status(
        &mut self,
        cache: &mut VehicleCache,
        refresh: bool,
    ) -> Result<VehicleStatus, ClientError> {
        if !refresh {
            if let Some(status) = &cache.status {
                if cache.status_fresh(self.status_max_age) {
                    debug!("serving status from cache");
                    return Ok(status.clone());
                }
            }
        }
        let path = self.status_path(refresh);
        let body = self.exchange(cache, Method::Get, &path, None)?;
        let status = normalize_status(payload_of(&body), self.protocol, self.region)?;
        cache.status = Some(status.clone());
        cache.refreshed_at = Some(Utc::now());
        Ok(status)
    }

    /// Raw vendor tree of the full status endpoint, cached as-is.
    pub fn full_status(&mut self, cache: &mut VehicleCache) -> Result<Value, ClientError> {
        let path = match self.protocol {
            Protocol::Ccs2 => format!("/ccs2/carstatus/{}/full", self.session.vehicle_id()),
            Protocol::Legacy => format!("/vehicles/{}/status/full", self.session.vehicle_id()),
        };
        let body = self.exchange(cache, Method::Get, &path, None)?;
        let raw = payload_of(&body).clone();
        cache.full_status = Some(raw.clone());
        Ok(raw)
    }

    pub fn odometer(&mut self, cache: &mut VehicleCache) -> Result<Option<Odometer>, ClientError> {
        let path = format!("/vehicles/{}/odometer", self.session.vehicle_id());
        let body = self.exchange(cache, Method::Get, &path, None)?;
        let odometer = normalize_odometer(payload_of(&body));
        if odometer.is_some() {
            cache.odometer = odometer;
        }
        Ok(odometer)
    }

    pub fn location(
        &mut self,
        cache: &mut VehicleCache,
    ) -> Result<Option<VehicleLocation>, ClientError> {
        let path = format!("/vehicles/{}/location", self.session.vehicle_id());
        let body = self.exchange(cache, Method::Get, &path, None)?;
        let location = normalize_location(payload_of(&body));
        if let Some(location) = &location {
            cache.location = Some(location.clone());
        }
        Ok(location)
    }

    /// Usage report for one month.
    pub fn monthly_report(
        &mut self,
        cache: &mut VehicleCache,
        year: i32,
        month: u32,
    ) -> Result<Option<MonthlyReport>, ClientError> {
        let path = format!("/vehicles/{}/monthlyreport", self.session.vehicle_id());
        let query = json!({"setRptMonth": format!("{:04}{:02}", year, month)});
        let body = self.exchange(cache, Method::Post, &path, Some(&query))?;
        Ok(normalize_monthly_report(payload_of(&body)))
    }

    /// Trip summaries; the answer shape follows the query period.
    pub fn trips(
        &mut self,
        cache: &mut VehicleCache,
        period: &TripPeriod,
    ) -> Result<Option<Trips>, ClientError> {
        let path = format!("/vehicles/{}/tripinfo", self.session.vehicle_id());
        // the vendor switches answer shape on which key is present
        let query = match period {
            TripPeriod::Month { .. } => json!({"setTripMonth": period.query_key()}),
            TripPeriod::Day { .. } => json!({"setTripDay": period.query_key()}),
        };
        let body = self.exchange(cache, Method::Post, &path, Some(&query))?;
        Ok(normalize_trips(payload_of(&body), period))
    }

    pub fn drive_history(
        &mut self,
        cache: &mut VehicleCache,
    ) -> Result<Option<DriveHistory>, ClientError> {
        let path = format!("/vehicles/{}/drvhistory", self.session.vehicle_id());
        let body = self.exchange(cache, Method::Post, &path, None)?;
        Ok(normalize_drive_history(payload_of(&body)))
    }

    /// Current per-plug charge targets.
    pub fn charge_targets(
        &mut self,
        cache: &mut VehicleCache,
    ) -> Result<Vec<ChargeTargetState>, ClientError> {
        let path = format!("/vehicles/{}/charge/target", self.session.vehicle_id());
        let body = self.exchange(cache, Method::Get, &path, None)?;
        Ok(commands::normalize_charge_targets(payload_of(&body)))
    }

    /// Set both plug-channel charge targets. Validation happens before the
    /// issuer sees anything; either both targets are sent or neither.
    pub fn set_charge_targets(
        &mut self,
        cache: &mut VehicleCache,
        fast: u32,
        slow: u32,
    ) -> Result<CommandOutcome, ClientError> {
        commands::validate_charge_targets(fast, slow)?;
        let path = format!("/vehicles/{}/charge/target", self.session.vehicle_id());
        self.command(cache, &path, commands::charge_target_body(fast, slow))
    }

    pub fn start_climate(
        &mut self,
        cache: &mut VehicleCache,
        options: &ClimateOptions,
    ) -> Result<CommandOutcome, ClientError> {
        let body = commands::climate_start_body(self.region, options)?;
        let path = format!("/vehicles/{}/control/temperature", self.session.vehicle_id());
        self.command(cache, &path, body)
    }

    pub fn stop_climate(&mut self, cache: &mut VehicleCache) -> Result<CommandOutcome, ClientError> {
        let path = format!("/vehicles/{}/control/temperature", self.session.vehicle_id());
        self.command(cache, &path, commands::climate_stop_body())
    }

    pub fn lock(&mut self, cache: &mut VehicleCache) -> Result<CommandOutcome, ClientError> {
        self.door_command(cache, true)
    }

    pub fn unlock(&mut self, cache: &mut VehicleCache) -> Result<CommandOutcome, ClientError> {
        self.door_command(cache, false)
    }

    fn door_command(
        &mut self,
        cache: &mut VehicleCache,
        lock_doors: bool,
    ) -> Result<CommandOutcome, ClientError> {
        let path = format!("/vehicles/{}/control/door", self.session.vehicle_id());
        let body = commands::door_body(lock_doors, self.session.device_id());
        self.command(cache, &path, body)
    }

    fn command(
        &mut self,
        cache: &mut VehicleCache,
        path: &str,
        mut body: Value,
    ) -> Result<CommandOutcome, ClientError> {
        if let (Some(pin), Some(map)) = (&self.pin, body.as_object_mut()) {
            map.insert("pin".to_string(), Value::String(pin.clone()));
        }
        let answer = self.exchange(cache, Method::Post, path, Some(&body))?;
        let outcome = commands::interpret_command_response(&answer);
        if let CommandOutcome::Rejected { code, message } = &outcome {
            warn!(%code, %message, path, "vendor rejected command");
        }
        Ok(outcome)
    }
}
