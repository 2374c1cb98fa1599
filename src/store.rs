//! Read-side storage contract used by every derivation service.
//!
//! Services are generic over [`ReadingStore`] so the same computation runs
//! against Postgres (see `db::store`) or an in-memory store in tests.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::db::models::{Sensor, Zone};
use crate::registry::ReadingTable;

/// One raw reading, normalised across the per-type tables.
///
/// Boolean readings are coerced to `0.0`/`1.0`; `secondary` carries humidity
/// for environmental readings and is `None` elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub sensor_id: String,
    pub time: DateTime<Utc>,
    pub value: f64,
    pub secondary: Option<f64>,
}

impl Sample {
    pub fn is_active(&self) -> bool {
        self.value != 0.0
    }
}

/// Inclusive time range for one sensor in a batched load.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleWindow {
    pub sensor_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Optional filters for listing sensors. Results keep storage order (by sensor id).
#[derive(Debug, Clone, Copy, Default)]
pub struct SensorQuery<'a> {
    pub zone_id: Option<&'a str>,
    pub sensor_type: Option<&'a str>,
}

#[derive(Debug)]
pub enum StoreError {
    Query(diesel::result::Error),
    Connection(diesel::ConnectionError),
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Query(e) => write!(f, "query failed: {}", e),
            StoreError::Connection(e) => write!(f, "connection failed: {}", e),
            StoreError::Backend(msg) => write!(f, "storage error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Query(e) => Some(e),
            StoreError::Connection(e) => Some(e),
            StoreError::Backend(_) => None,
        }
    }
}

impl From<diesel::result::Error> for StoreError {
    fn from(e: diesel::result::Error) -> Self {
        StoreError::Query(e)
    }
}

impl From<diesel::ConnectionError> for StoreError {
    fn from(e: diesel::ConnectionError) -> Self {
        StoreError::Connection(e)
    }
}

impl From<StoreError> for String {
    fn from(e: StoreError) -> Self {
        e.to_string()
    }
}

pub trait ReadingStore {
    /// Sensor together with its zone, or `None` for an unknown id.
    fn find_sensor(&mut self, sensor_id: &str) -> Result<Option<(Sensor, Zone)>, StoreError>;

    fn list_sensors(&mut self, query: &SensorQuery<'_>) -> Result<Vec<(Sensor, Zone)>, StoreError>;

    /// All samples of `sensor_ids` in `[start, end]` (both inclusive), ordered
    /// by `(sensor_id, time)`. One round trip regardless of the number of ids.
    fn load_samples(
        &mut self,
        table: ReadingTable,
        sensor_ids: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Sample>, StoreError>;

    /// Samples inside each sensor's own window, ordered by `(sensor_id, time)`.
    /// One round trip; rows outside every window are never loaded.
    fn load_windows(&mut self, table: ReadingTable, windows: &[SampleWindow]) -> Result<Vec<Sample>, StoreError>;

    /// Latest sample per sensor, one round trip. Sensors without readings are absent.
    fn latest_samples(&mut self, table: ReadingTable, sensor_ids: &[String]) -> Result<Vec<Sample>, StoreError>;
}
