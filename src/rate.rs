//! Rolling view of the vendor's remaining call budget
//!
//! Vendor responses carry `x-ratelimit-*` headers on quota-metered paths.
//! The tracker folds each response into the last-observed snapshot; paths
//! that do not report quota leave the snapshot untouched.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

const LIMIT_HEADER: &str = "x-ratelimit-limit";
const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";

/// Last-observed call budget for one vehicle handle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RateState {
    /// Total calls allowed in the current window
    pub max: u32,
    /// Calls remaining in the current window
    pub current: u32,
    /// Window reset time, when the vendor reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset: Option<DateTime<Utc>>,
    /// When the vendor last reported quota
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

impl RateState {
    /// Fold one response's headers into the snapshot.
    ///
    /// Previous snapshot in, new snapshot out. Responses without the limit
    /// header come from paths that do not report quota and change nothing,
    /// `updated_at` included. The reset header is Unix seconds.
    pub fn observe(&self, headers: &HashMap<String, String>) -> RateState {
        let Some(limit) = header(headers, LIMIT_HEADER).and_then(|raw| raw.parse::<u32>().ok())
        else {
            return self.clone();
        };

        let current = header(headers, REMAINING_HEADER)
            .and_then(|raw| raw.parse::<u32>().ok())
            .unwrap_or(self.current);
        let reset = header(headers, RESET_HEADER)
            .and_then(|raw| raw.parse::<i64>().ok())
            .and_then(|seconds| Utc.timestamp_opt(seconds, 0).single())
            .or(self.reset);

        RateState {
            max: limit,
            current,
            reset,
            updated_at: Some(Utc::now()),
        }
    }
}
