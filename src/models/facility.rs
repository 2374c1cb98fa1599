//! Derived value types returned by the services.
//!
//! Everything here is recomputed per call and serialized as camelCase JSON
//! for dashboard and agent consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::utils::{SECONDS_PER_DAY, SECONDS_PER_HOUR};

// =====================
// Readings
// =====================

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "raw")]
    Raw,
    #[serde(rename = "1h")]
    Hourly,
    #[serde(rename = "1d")]
    Daily,
}

impl Interval {
    /// Bucket width; `None` for raw samples.
    pub fn bucket_seconds(self) -> Option<i64> {
        match self {
            Interval::Raw => None,
            Interval::Hourly => Some(SECONDS_PER_HOUR),
            Interval::Daily => Some(SECONDS_PER_DAY),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Interval::Raw => "raw",
            Interval::Hourly => "1h",
            Interval::Daily => "1d",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(Interval::Raw),
            "1h" | "hourly" => Ok(Interval::Hourly),
            "1d" | "daily" => Ok(Interval::Daily),
            other => Err(format!("invalid interval '{}': expected raw, 1h or 1d", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    /// Humidity for environmental sensors.
    #[serde(rename = "humidity", skip_serializing_if = "Option::is_none", default)]
    pub secondary: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingSeries {
    pub sensor_id: String,
    pub sensor_type: String,
    pub interval: Interval,
    pub readings: Vec<ReadingPoint>,
}

// =====================
// Events
// =====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoorEvent {
    pub sensor_id: String,
    pub opened_at: DateTime<Utc>,
    /// `None` while the door was still open at the end of the window.
    pub closed_at: Option<DateTime<Utc>>,
    pub duration_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEvent {
    pub sensor_id: String,
    pub zone_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: i64,
    pub is_safety_concern: bool,
}

// =====================
// Baselines
// =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    pub sensor_id: String,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub unit: String,
    pub sample_count: usize,
    pub period_hours: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyBaseline {
    /// Hour of day, 0..=23 (UTC).
    pub hour: u32,
    pub mean: f64,
    pub std_dev: f64,
    pub sample_count: usize,
}

impl HourlyBaseline {
    pub fn empty(hour: u32) -> Self {
        HourlyBaseline {
            hour,
            mean: 0.0,
            std_dev: 0.0,
            sample_count: 0,
        }
    }
}

// =====================
// Sensor summaries
// =====================

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Normal,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    /// Formatted value, e.g. `-14.2°C` or `Open`.
    pub value: String,
    /// Suffix such as `/ 68%` or `ppm`.
    pub unit: Option<String>,
    pub status: Status,
    pub status_text: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub raw_values: Option<BTreeMap<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub unit: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorThresholds {
    pub warning: Option<f64>,
    pub critical: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorSummary {
    pub id: String,
    pub sensor_type: String,
    /// Zone display name.
    pub zone: String,
    pub label: String,
    pub reading: SensorReading,
    /// 24 hourly points, oldest first.
    pub trend: Vec<f64>,
    pub stats: SensorStats,
    pub thresholds: Option<SensorThresholds>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target_range: Option<[f64; 2]>,
}
