//! Sensor type registry.
//!
//! Every per-type decision (which table to read, how to format a value,
//! whether numeric statistics make sense) is looked up here instead of being
//! branched on in the services. Supporting a new sensor type means adding one
//! [`SensorTypeDescriptor`] to [`REGISTRY`] and a matching reading table.

use serde::Serialize;

pub const ENVIRONMENTAL: &str = "environmental";
pub const AIR_QUALITY: &str = "air_quality";
pub const DOOR: &str = "door";
pub const MOTION: &str = "motion";

pub const TEMPERATURE_UNIT: &str = "°C";
/// Unit for door and motion stats. Their min/max/avg are taken over 0/1
/// samples, so `avg` is the fraction of samples with the door open or motion seen.
pub const EVENTS_UNIT: &str = "events";

/// Physical reading table backing a sensor type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingTable {
    Environmental,
    AirQuality,
    Door,
    Motion,
}

impl ReadingTable {
    pub fn table_name(self) -> &'static str {
        match self {
            ReadingTable::Environmental => "environmental_readings",
            ReadingTable::AirQuality => "air_quality_readings",
            ReadingTable::Door => "door_readings",
            ReadingTable::Motion => "motion_readings",
        }
    }
}

#[derive(Debug)]
pub struct SensorTypeDescriptor {
    /// Tag stored in `sensors.sensor_type`.
    pub tag: &'static str,
    pub table: ReadingTable,
    /// Primary value is a boolean state stored as 0/1.
    pub is_boolean: bool,
    /// Unit of the primary value.
    pub unit: &'static str,
    /// Unit of the secondary value (humidity), when the table carries one.
    pub secondary_unit: Option<&'static str>,
    /// Suffix shown next to the current value when there is no secondary value.
    pub display_unit: Option<&'static str>,
    pub format_value: Option<fn(f64) -> String>,
    /// Whether mean/min/max/stddev are meaningful. Boolean types only count events.
    pub supports_aggregation: bool,
    pub baseline_decimals: u32,
    pub summary_decimals: u32,
    /// Key under which the boolean state is exposed to dashboards.
    pub state_key: Option<&'static str>,
}

pub static REGISTRY: [SensorTypeDescriptor; 4] = [
    SensorTypeDescriptor {
        tag: ENVIRONMENTAL,
        table: ReadingTable::Environmental,
        is_boolean: false,
        unit: TEMPERATURE_UNIT,
        secondary_unit: Some("%"),
        display_unit: None,
        format_value: Some(format_celsius),
        supports_aggregation: true,
        baseline_decimals: 2,
        summary_decimals: 1,
        state_key: None,
    },
    SensorTypeDescriptor {
        tag: AIR_QUALITY,
        table: ReadingTable::AirQuality,
        is_boolean: false,
        unit: "ppm",
        secondary_unit: None,
        display_unit: Some("ppm"),
        format_value: Some(format_whole),
        supports_aggregation: true,
        baseline_decimals: 1,
        summary_decimals: 0,
        state_key: None,
    },
    SensorTypeDescriptor {
        tag: DOOR,
        table: ReadingTable::Door,
        is_boolean: true,
        unit: EVENTS_UNIT,
        secondary_unit: None,
        display_unit: None,
        format_value: Some(format_door),
        supports_aggregation: false,
        baseline_decimals: 1,
        summary_decimals: 2,
        state_key: Some("isOpen"),
    },
    SensorTypeDescriptor {
        tag: MOTION,
        table: ReadingTable::Motion,
        is_boolean: true,
        unit: EVENTS_UNIT,
        secondary_unit: None,
        display_unit: None,
        format_value: Some(format_motion),
        supports_aggregation: false,
        baseline_decimals: 1,
        summary_decimals: 2,
        state_key: None,
    },
];

/// Look up the descriptor for a sensor-type tag. Unknown tags are `None`.
pub fn lookup(tag: &str) -> Option<&'static SensorTypeDescriptor> {
    REGISTRY.iter().find(|d| d.tag == tag)
}

impl SensorTypeDescriptor {
    pub fn format(&self, value: f64) -> String {
        match self.format_value {
            Some(f) => f(value),
            None => value.to_string(),
        }
    }

    /// Unit text shown after the formatted value, e.g. `/ 68%` or `ppm`.
    pub fn unit_label(&self, secondary: Option<f64>) -> Option<String> {
        match (self.secondary_unit, secondary) {
            (Some(unit), Some(value)) => Some(format!("/ {}{}", value.trunc() as i64, unit)),
            _ => self.display_unit.map(str::to_string),
        }
    }
}

fn format_celsius(value: f64) -> String {
    format!("{:.1}{}", value, TEMPERATURE_UNIT)
}

fn format_whole(value: f64) -> String {
    (value.trunc() as i64).to_string()
}

fn format_door(value: f64) -> String {
    if value != 0.0 { "Open".to_string() } else { "Closed".to_string() }
}

fn format_motion(value: f64) -> String {
    if value != 0.0 {
        "Motion detected".to_string()
    } else {
        "No motion".to_string()
    }
}
