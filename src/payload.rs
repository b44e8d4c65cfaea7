//! WarBeacon battle report payloads.
//!
//! Deserializes the API response envelope and derives the location and
//! timestamp labels for the two kinds of report source: a single-system
//! "related" report and a combined multi-system report.

use serde::Deserialize;
use serde_json::Value;

use crate::analysis::types::{null_as_default, Killmail, NameTable};
use crate::parsers::{display_date, parse_killmail_time, parse_related_time, related_time_to_iso};

pub const UNKNOWN_SYSTEM: &str = "Unknown System";
pub const MULTIPLE_SYSTEMS: &str = "Multiple Systems";
pub const UNKNOWN_DATE: &str = "Unknown Date";
pub const COMBINED_REPORT: &str = "Combined Report";

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("Malformed battle report payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Battle report API returned an unsuccessful payload")]
    Unsuccessful,
    #[error("Invalid related source {0:?}, expected <system_id>:<YYYYMMDDHHMM>")]
    InvalidSource(String),
}

/// Top-level API response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WarBeaconResponse {
    pub success: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub data: BattleData,
}

/// Killmails, names and locations of one battle report
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BattleData {
    #[serde(deserialize_with = "null_as_default")]
    pub killmails: Vec<Killmail>,
    #[serde(deserialize_with = "null_as_default")]
    pub names: NameTable,
    #[serde(deserialize_with = "null_as_default")]
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Location {
    pub id: Option<i64>,
    pub name: Option<String>,
}

/// Parse a raw API response, rejecting envelopes not flagged as successful
pub fn parse_response(raw: &str) -> Result<BattleData, PayloadError> {
    let response: WarBeaconResponse = serde_json::from_str(raw)?;
    if !response.success {
        return Err(PayloadError::Unsuccessful);
    }
    Ok(response.data)
}

/// Where a battle report came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportSource {
    /// `/br/related/<system_id>/<YYYYMMDDHHMM>/`
    Related { system_id: i64, related_time: String },
    /// `/br/report/<uuid>/`
    Combined { report_id: String },
}

impl ReportSource {
    /// Parse `<system_id>:<YYYYMMDDHHMM>`
    pub fn parse_related(value: &str) -> Result<Self, PayloadError> {
        let invalid = || PayloadError::InvalidSource(value.to_string());

        let (system, time) = value.split_once(':').ok_or_else(invalid)?;
        let system_id: i64 = system.trim().parse().map_err(|_| invalid())?;
        let related_time = time.trim().to_string();
        parse_related_time(&related_time).map_err(|_| invalid())?;

        Ok(ReportSource::Related {
            system_id,
            related_time,
        })
    }

    pub fn location_label(&self, data: &BattleData) -> String {
        match self {
            ReportSource::Related { .. } => first_location_name(data),
            ReportSource::Combined { .. } => match data.locations.len() {
                0 | 1 => first_location_name(data),
                _ => MULTIPLE_SYSTEMS.to_string(),
            },
        }
    }

    /// Middle of the battle window as ISO-8601, for related reports only
    pub fn middle_time(&self) -> Option<String> {
        match self {
            ReportSource::Related { related_time, .. } => related_time_to_iso(related_time).ok(),
            ReportSource::Combined { .. } => None,
        }
    }

    pub fn timestamp_label(&self) -> String {
        match self {
            ReportSource::Related { .. } => self
                .middle_time()
                .and_then(|iso| parse_killmail_time(&Value::String(iso)))
                .map(|dt| display_date(&dt))
                .unwrap_or_else(|| UNKNOWN_DATE.to_string()),
            ReportSource::Combined { .. } => COMBINED_REPORT.to_string(),
        }
    }
}

fn first_location_name(data: &BattleData) -> String {
    data.locations
        .first()
        .and_then(|loc| loc.name.clone())
        .unwrap_or_else(|| UNKNOWN_SYSTEM.to_string())
}
