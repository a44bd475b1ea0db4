//! Region-aware unit conversion
//!
//! The vendor encodes climate setpoints as an index into a fixed per-region
//! temperature table, rendered as a two-digit uppercase hex string with an
//! `H` suffix ("0AH" = index 10). The EU and CA tables are in Celsius, the
//! US table is in Fahrenheit; the public surface is always Celsius.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Vendor region, selects endpoints and the temperature table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    Eu,
    Us,
    Ca,
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Region::Eu => "EU",
            Region::Us => "US",
            Region::Ca => "CA",
        };
        write!(f, "{}", name)
    }
}

/// Temperature unit as reported by the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Decode the vendor 0/1 unit code; unknown codes fall back to Celsius.
    pub fn from_code(code: u64) -> Self {
        match code {
            1 => TemperatureUnit::Fahrenheit,
            _ => TemperatureUnit::Celsius,
        }
    }
}

/// Unit conversion errors
#[derive(Debug, thiserror::Error)]
pub enum UnitError {
    #[error("Temperature {celsius}°C is outside the supported {region} range")]
    TemperatureOutOfRange { celsius: f64, region: Region },

    #[error("Unrecognized temperature code: {0:?}")]
    InvalidTemperatureCode(String),
}

struct TempTable {
    low: f64,
    high: f64,
    step: f64,
    unit: TemperatureUnit,
}

impl TempTable {
    fn len(&self) -> u32 {
        ((self.high - self.low) / self.step).round() as u32 + 1
    }
}

const EU_TABLE: TempTable = TempTable {
    low: 14.0,
    high: 30.0,
    step: 0.5,
    unit: TemperatureUnit::Celsius,
};
const CA_TABLE: TempTable = TempTable {
    low: 16.0,
    high: 32.0,
    step: 0.5,
    unit: TemperatureUnit::Celsius,
};
const US_TABLE: TempTable = TempTable {
    low: 62.0,
    high: 82.0,
    step: 1.0,
    unit: TemperatureUnit::Fahrenheit,
};

fn table(region: Region) -> &'static TempTable {
    match region {
        Region::Eu => &EU_TABLE,
        Region::Ca => &CA_TABLE,
        Region::Us => &US_TABLE,
    }
}

fn fahrenheit_to_celsius(degrees: f64) -> f64 {
    (degrees - 32.0) * 5.0 / 9.0
}

fn celsius_to_fahrenheit(degrees: f64) -> f64 {
    degrees * 9.0 / 5.0 + 32.0
}

/// Encode a Celsius setpoint as the region's temperature code.
///
/// The value is converted into the table's native unit and snapped to the
/// nearest table entry; values outside the table fail.
pub fn celsius_to_code(region: Region, celsius: f64) -> Result<String, UnitError> {
    let table = table(region);
    let degrees = match table.unit {
        TemperatureUnit::Celsius => celsius,
        TemperatureUnit::Fahrenheit => celsius_to_fahrenheit(celsius),
    };
    let index = ((degrees - table.low) / table.step).round();
    if !index.is_finite() || index < 0.0 || index as u32 >= table.len() {
        return Err(UnitError::TemperatureOutOfRange { celsius, region });
    }
    Ok(format!("{:02X}H", index as u32))
}

/// Decode a region temperature code into Celsius.
pub fn code_to_celsius(region: Region, code: &str) -> Result<f64, UnitError> {
    let table = table(region);
    let digits = code.trim_end_matches(|c| c == 'H' || c == 'h');
    let index = u32::from_str_radix(digits, 16)
        .map_err(|_| UnitError::InvalidTemperatureCode(code.to_string()))?;
    if index >= table.len() {
        return Err(UnitError::InvalidTemperatureCode(code.to_string()));
    }
    let degrees = table.low + f64::from(index) * table.step;
    Ok(match table.unit {
        TemperatureUnit::Celsius => degrees,
        TemperatureUnit::Fahrenheit => fahrenheit_to_celsius(degrees),
    })
}

/// Parse a zone-less vendor timestamp ("yyyyMMddHHmmss").
pub fn parse_vehicle_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y%m%d%H%M%S").ok()
}

/// Parse a vendor day key ("yyyyMMdd").
pub fn parse_vehicle_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y%m%d").ok()
}

/// Offset a trip start by the vendor-reported drive duration.
pub fn add_minutes(start: NaiveDateTime, minutes: i64) -> NaiveDateTime {
    start + Duration::minutes(minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eu_codes_decode_in_half_degree_steps() {
        assert_eq!(code_to_celsius(Region::Eu, "00H").unwrap(), 14.0);
        assert_eq!(code_to_celsius(Region::Eu, "01H").unwrap(), 14.5);
        assert_eq!(code_to_celsius(Region::Eu, "0AH").unwrap(), 19.0);
        assert_eq!(code_to_celsius(Region::Eu, "20H").unwrap(), 30.0);
    }

    #[test]
    fn code_round_trip_is_exact_for_every_table_entry() {
        for region in [Region::Eu, Region::Ca, Region::Us] {
            for index in 0..table(region).len() {
                let code = format!("{:02X}H", index);
                let celsius = code_to_celsius(region, &code).unwrap();
                assert_eq!(
                    celsius_to_code(region, celsius).unwrap(),
                    code,
                    "{} code {}",
                    region,
                    code
                );
            }
        }
    }

    #[test]
    fn celsius_round_trip_stays_within_half_step() {
        for tenths in 140..=300 {
            let celsius = f64::from(tenths) / 10.0;
            let code = celsius_to_code(Region::Eu, celsius).unwrap();
            let decoded = code_to_celsius(Region::Eu, &code).unwrap();
            assert!((decoded - celsius).abs() <= 0.25 + 1e-9);
        }
    }

    #[test]
    fn out_of_range_setpoints_are_rejected() {
        assert!(matches!(
            celsius_to_code(Region::Eu, 40.0),
            Err(UnitError::TemperatureOutOfRange { .. })
        ));
        assert!(matches!(
            celsius_to_code(Region::Eu, 5.0),
            Err(UnitError::TemperatureOutOfRange { .. })
        ));
        assert!(celsius_to_code(Region::Us, f64::NAN).is_err());
    }

    #[test]
    fn malformed_codes_are_rejected() {
        assert!(matches!(
            code_to_celsius(Region::Eu, "ZZH"),
            Err(UnitError::InvalidTemperatureCode(_))
        ));
        assert!(code_to_celsius(Region::Eu, "7FH").is_err());
        assert!(code_to_celsius(Region::Eu, "").is_err());
    }

    #[test]
    fn lowercase_codes_are_accepted() {
        assert_eq!(code_to_celsius(Region::Eu, "0ah").unwrap(), 19.0);
    }

    #[test]
    fn vendor_timestamps_parse_without_zone() {
        let parsed = parse_vehicle_timestamp("20240318153024").unwrap();
        assert_eq!(parsed.to_string(), "2024-03-18 15:30:24");
        assert!(parse_vehicle_timestamp("not-a-date").is_none());
    }

    #[test]
    fn trip_end_is_start_plus_drive_minutes() {
        let start = parse_vehicle_timestamp("20240318153000").unwrap();
        assert_eq!(add_minutes(start, 42).to_string(), "2024-03-18 16:12:00");
    }
}
