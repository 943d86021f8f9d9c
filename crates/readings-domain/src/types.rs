use crate::error::{DomainError, DomainResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Kind of quantity a measurement series carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MeasurementType {
    ActiveEnergy,
    ReactiveEnergy,
    MaxPower,
}

/// Origin of a measurement series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MeasurementSource {
    Forecast,
    Reading,
}

/// One measurement series of a wide-format payload.
///
/// `values` holds `None` where the series has no sample. When `dates` is present it runs
/// parallel to `values` (explicit timeline); otherwise the payload-level `date`/`timeStep`
/// address the values by offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementSeries {
    #[serde(rename = "type")]
    pub measurement_type: MeasurementType,
    pub source: MeasurementSource,
    pub unit_of_measurement: String,
    pub values: Vec<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates: Option<Vec<String>>,
}

/// Wide-format payload describing one sensor over an interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorPayload {
    pub sensor_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Milliseconds between consecutive values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_step: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<MeasurementSource>,
    pub measurements: Vec<MeasurementSeries>,
}

/// A single present value of one series at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementPoint {
    #[serde(rename = "type")]
    pub measurement_type: MeasurementType,
    pub source: MeasurementSource,
    pub value: f64,
    pub unit_of_measurement: String,
}

/// Narrow record: every value sampled at one instant for one sensor.
/// `measurements` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub sensor_id: String,
    #[serde(rename = "date", with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    pub measurements: Vec<MeasurementPoint>,
}

/// Parse an ISO-8601 timestamp as accepted on the wire.
///
/// Full RFC 3339 date-times are normalised to UTC; a bare `YYYY-MM-DD` is midnight UTC.
pub fn parse_timestamp(value: &str) -> DomainResult<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| DomainError::InvalidTimestamp {
            value: value.to_string(),
            reason: "expected an ISO-8601 date-time".to_string(),
        })
}

/// ISO-8601 UTC with millisecond precision, e.g. `2015-01-01T00:05:00.000Z`
pub mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
