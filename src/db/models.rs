//! Diesel model structs for the facility reference tables and the four
//! per-type reading tables.
//!
//! Reading rows are append-only and keyed by `(sensor_id, time)`; the
//! derivation layer only ever reads them back through
//! [`crate::store::ReadingStore`].

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema;

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::zones)]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub zone_type: String,
    pub target_temp_min: Option<f64>,
    pub target_temp_max: Option<f64>,
}

impl Zone {
    /// Target temperature band, when both ends are configured.
    pub fn target_range(&self) -> Option<(f64, f64)> {
        self.target_temp_min.zip(self.target_temp_max)
    }
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::zones)]
pub struct NewZone {
    pub id: String,
    pub name: String,
    pub zone_type: String,
    pub target_temp_min: Option<f64>,
    pub target_temp_max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Associations, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::sensors)]
#[diesel(belongs_to(Zone))]
pub struct Sensor {
    pub id: String,
    pub zone_id: String,
    pub sensor_type: String,
    pub label: String,
    pub warning_threshold: Option<f64>,
    pub critical_threshold: Option<f64>,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::sensors)]
pub struct NewSensor {
    pub id: String,
    pub zone_id: String,
    pub sensor_type: String,
    pub label: String,
    pub warning_threshold: Option<f64>,
    pub critical_threshold: Option<f64>,
}

// Reading tables

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::environmental_readings)]
#[diesel(belongs_to(Sensor))]
pub struct EnvironmentalReading {
    pub id: i64,
    pub sensor_id: String,
    pub time: DateTime<Utc>,
    pub temperature_c: f64,
    pub humidity_pct: f64,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::environmental_readings)]
pub struct NewEnvironmentalReading {
    pub sensor_id: String,
    pub time: DateTime<Utc>,
    pub temperature_c: f64,
    pub humidity_pct: f64,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::air_quality_readings)]
#[diesel(belongs_to(Sensor))]
pub struct AirQualityReading {
    pub id: i64,
    pub sensor_id: String,
    pub time: DateTime<Utc>,
    pub co2_ppm: f64,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::air_quality_readings)]
pub struct NewAirQualityReading {
    pub sensor_id: String,
    pub time: DateTime<Utc>,
    pub co2_ppm: f64,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::door_readings)]
#[diesel(belongs_to(Sensor))]
pub struct DoorReading {
    pub id: i64,
    pub sensor_id: String,
    pub time: DateTime<Utc>,
    pub is_open: bool,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::door_readings)]
pub struct NewDoorReading {
    pub sensor_id: String,
    pub time: DateTime<Utc>,
    pub is_open: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::motion_readings)]
#[diesel(belongs_to(Sensor))]
pub struct MotionReading {
    pub id: i64,
    pub sensor_id: String,
    pub time: DateTime<Utc>,
    pub motion_detected: bool,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::motion_readings)]
pub struct NewMotionReading {
    pub sensor_id: String,
    pub time: DateTime<Utc>,
    pub motion_detected: bool,
}
