//! Monthly report, trip, and drive-history aggregation
//!
//! Derived read-only views over vendor payload subsets, rebuilt whole on
//! every fetch. Nested groups the vendor omitted stay omitted in the
//! canonical shape; consumers must not assume always-present keys.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;

use super::payload::{array_at, code_eq, f64_at, flag_at, str_at, u32_at};
use crate::units::{add_minutes, parse_vehicle_date, parse_vehicle_timestamp};

/// Month or single day a trip query covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripPeriod {
    Month { year: i32, month: u32 },
    Day { date: NaiveDate },
}

impl TripPeriod {
    /// Vendor query key: "yyyyMM" for months, "yyyyMMdd" for days.
    pub fn query_key(&self) -> String {
        match self {
            TripPeriod::Month { year, month } => format!("{:04}{:02}", year, month),
            TripPeriod::Day { date } => date.format("%Y%m%d").to_string(),
        }
    }
}

/// Trips normalized for one query; monthly and daily answers have
/// different shapes, so the variant mirrors the query mode
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Trips {
    Monthly(TripMonth),
    Daily(Vec<TripDay>),
}

/// Minutes driven vs idling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TripDurations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drive: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TripSpeed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// Per-day roll-up inside a monthly answer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TripDaySummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_count: Option<u32>,
}

/// Monthly aggregate over all trips in the queried month
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TripMonth {
    pub days: Vec<TripDaySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    pub durations: TripDurations,
    pub speed: TripSpeed,
}

/// One trip with reconstructed start/end timestamps
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trip {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    pub durations: TripDurations,
    pub speed: TripSpeed,
}

/// Detailed per-day trip list in a daily answer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TripDay {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    pub durations: TripDurations,
    pub speed: TripSpeed,
    pub trips: Vec<Trip>,
}

/// Map a raw trip answer; `None` when the vendor returned no trip data.
pub fn normalize_trips(raw: &Value, period: &TripPeriod) -> Option<Trips> {
    match period {
        TripPeriod::Month { .. } => normalize_month(raw).map(Trips::Monthly),
        TripPeriod::Day { .. } => normalize_days(raw).map(Trips::Daily),
    }
}

fn normalize_month(raw: &Value) -> Option<TripMonth> {
    let day_list = array_at(raw, "/tripDayList")?;
    Some(TripMonth {
        days: day_list
            .iter()
            .map(|day| TripDaySummary {
                date: str_at(day, "/tripDayInMonth").and_then(parse_vehicle_date),
                trip_count: u32_at(day, "/tripCntDay"),
            })
            .collect(),
        distance: f64_at(raw, "/tripDist"),
        durations: TripDurations {
            drive: u32_at(raw, "/tripDrvTime"),
            idle: u32_at(raw, "/tripIdleTime"),
        },
        speed: TripSpeed {
            avg: f64_at(raw, "/tripAvgSpeed"),
            max: f64_at(raw, "/tripMaxSpeed"),
        },
    })
}

fn normalize_days(raw: &Value) -> Option<Vec<TripDay>> {
    let day_list = array_at(raw, "/dayTripList")?;
    Some(day_list.iter().map(normalize_day).collect())
}

fn normalize_day(day: &Value) -> TripDay {
    let day_key = str_at(day, "/tripDay");
    let trips = array_at(day, "/tripList")
        .map(|list| {
            list.iter()
                .map(|trip| normalize_trip(day_key, trip))
                .collect()
        })
        .unwrap_or_default();
    TripDay {
        date: day_key.and_then(parse_vehicle_date),
        trip_count: u32_at(day, "/dayTripCnt"),
        distance: f64_at(day, "/tripDist"),
        durations: TripDurations {
            drive: u32_at(day, "/tripDrvTime"),
            idle: u32_at(day, "/tripIdleTime"),
        },
        speed: TripSpeed {
            avg: f64_at(day, "/tripAvgSpeed"),
            max: f64_at(day, "/tripMaxSpeed"),
        },
        trips,
    }
}

fn normalize_trip(day_key: Option<&str>, trip: &Value) -> Trip {
    let start = match (day_key, str_at(trip, "/tripTime")) {
        (Some(day), Some(time)) => parse_vehicle_timestamp(&format!("{}{}", day, time)),
        _ => None,
    };
    let drive = u32_at(trip, "/tripDrvTime");
    let end = match (start, drive) {
        (Some(start), Some(minutes)) => Some(add_minutes(start, i64::from(minutes))),
        _ => None,
    };
    Trip {
        start,
        end,
        distance: f64_at(trip, "/tripDist"),
        durations: TripDurations {
            drive,
            idle: u32_at(trip, "/tripIdleTime"),
        },
        speed: TripSpeed {
            avg: f64_at(trip, "/tripAvgSpeed"),
            max: f64_at(trip, "/tripMaxSpeed"),
        },
    }
}

/// Driving roll-up inside a monthly report
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportDriving {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_count: Option<u32>,
    pub durations: TripDurations,
}

/// Vehicle condition roll-up inside a monthly report
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportVehicleStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tpms_support: Option<bool>,
    pub tire_pressure_warning: bool,
}

/// Monthly usage report
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthlyReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driving: Option<ReportDriving>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_status: Option<ReportVehicleStatus>,
    /// Vendor breakdown block, passed through untyped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<Value>,
}

/// Map a raw monthly report; `None` when the report block is absent.
pub fn normalize_monthly_report(raw: &Value) -> Option<MonthlyReport> {
    let report = raw.pointer("/monthlyReport")?;
    Some(MonthlyReport {
        start: str_at(report, "/ifo/mvrMonthStart").map(str::to_owned),
        end: str_at(report, "/ifo/mvrMonthEnd").map(str::to_owned),
        driving: report.pointer("/driving").map(|driving| ReportDriving {
            distance: f64_at(driving, "/runDistance"),
            start_count: u32_at(driving, "/engineStartCount"),
            durations: TripDurations {
                drive: u32_at(driving, "/engineOnTime"),
                idle: u32_at(driving, "/engineIdleTime"),
            },
        }),
        vehicle_status: report
            .pointer("/vehicleStatus")
            .map(|vehicle| ReportVehicleStatus {
                tpms_support: vehicle
                    .pointer("/tpmsSupport")
                    .map(|_| flag_at(vehicle, "/tpmsSupport")),
                tire_pressure_warning: code_eq(vehicle, "/tirePressure/tirePressureLampAll", 1),
            }),
        breakdown: report.pointer("/breakdown").cloned(),
    })
}

/// Energy drawn per consumer over one aggregation bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EnergyConsumption {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub climate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub electronics: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_care: Option<f64>,
}

/// One aggregation bucket of EV driving history
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DriveHistoryEntry {
    /// Vendor aggregation period code (0 = last 30 days, 1 = since reset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<u32>,
    pub consumption: EnergyConsumption,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regenerated_energy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

/// Dated per-day entry of EV driving history
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DriveHistoryDay {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub consumption: EnergyConsumption,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regenerated_energy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

/// EV driving history: cumulated buckets plus dated detail
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DriveHistory {
    pub cumulated: Vec<DriveHistoryEntry>,
    pub history: Vec<DriveHistoryDay>,
}

/// Map a raw driving-history answer; `None` when the block is absent.
pub fn normalize_drive_history(raw: &Value) -> Option<DriveHistory> {
    let cumulated = array_at(raw, "/drivingInfo")?;
    let history = array_at(raw, "/drivingInfoDetail")
        .map(|list| list.as_slice())
        .unwrap_or(&[]);
    Some(DriveHistory {
        cumulated: cumulated
            .iter()
            .map(|info| DriveHistoryEntry {
                period: u32_at(info, "/drivingPeriod"),
                consumption: consumption_of(info),
                regenerated_energy: f64_at(info, "/regenPwr"),
                distance: f64_at(info, "/calculativeOdo"),
            })
            .collect(),
        history: history
            .iter()
            .map(|info| DriveHistoryDay {
                date: str_at(info, "/drivingDate").and_then(parse_vehicle_date),
                consumption: consumption_of(info),
                regenerated_energy: f64_at(info, "/regenPwr"),
                distance: f64_at(info, "/calculativeOdo"),
            })
            .collect(),
    })
}

fn consumption_of(info: &Value) -> EnergyConsumption {
    EnergyConsumption {
        total: f64_at(info, "/totalPwrCsp"),
        engine: f64_at(info, "/motorPwrCsp"),
        climate: f64_at(info, "/climatePwrCsp"),
        electronics: f64_at(info, "/eDPwrCsp"),
        battery_care: f64_at(info, "/batteryMgPwrCsp"),
    }
}
