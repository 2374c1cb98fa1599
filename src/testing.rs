//! In-memory `ReadingStore` used by service tests.

use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeMap;

use crate::db::models::{Sensor, Zone};
use crate::registry::{self, ReadingTable};
use crate::store::{ReadingStore, Sample, SampleWindow, SensorQuery, StoreError};

/// Number of round trips per method.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub find_sensor: usize,
    pub list_sensors: usize,
    pub load_samples: usize,
    pub load_windows: usize,
    pub latest_samples: usize,
}

impl CallCounts {
    pub fn sample_queries(&self) -> usize {
        self.load_samples + self.load_windows + self.latest_samples
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    zones: Vec<Zone>,
    sensors: Vec<Sensor>,
    samples: BTreeMap<ReadingTable, Vec<Sample>>,
    pub calls: CallCounts,
    /// Rows handed back by `load_samples` and `load_windows`.
    pub rows_loaded: usize,
    /// When set, every call fails with a backend error.
    pub failing: bool,
}

/// 2026-01-`day` `hour`:`minute`:`second` UTC.
pub fn at(day: u32, hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, day, hour, minute, second).unwrap()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_zone(&mut self, id: &str, name: &str, target: Option<(f64, f64)>) -> &mut Self {
        self.zones.push(Zone {
            id: id.to_string(),
            name: name.to_string(),
            zone_type: "test".to_string(),
            target_temp_min: target.map(|t| t.0),
            target_temp_max: target.map(|t| t.1),
        });
        self
    }

    pub fn add_sensor(
        &mut self,
        id: &str,
        zone_id: &str,
        sensor_type: &str,
        warning: Option<f64>,
        critical: Option<f64>,
    ) -> &mut Self {
        self.sensors.push(Sensor {
            id: id.to_string(),
            zone_id: zone_id.to_string(),
            sensor_type: sensor_type.to_string(),
            label: format!("{} sensor", sensor_type),
            warning_threshold: warning,
            critical_threshold: critical,
        });
        self
    }

    /// Append a reading to the table backing the sensor's type.
    pub fn push(&mut self, sensor_id: &str, time: DateTime<Utc>, value: f64, secondary: Option<f64>) -> &mut Self {
        let sensor = self
            .sensors
            .iter()
            .find(|s| s.id == sensor_id)
            .unwrap_or_else(|| panic!("unknown sensor {}", sensor_id));
        let table = registry::lookup(&sensor.sensor_type)
            .unwrap_or_else(|| panic!("unregistered type {}", sensor.sensor_type))
            .table;
        self.samples.entry(table).or_default().push(Sample {
            sensor_id: sensor_id.to_string(),
            time,
            value,
            secondary,
        });
        self
    }

    pub fn push_state(&mut self, sensor_id: &str, time: DateTime<Utc>, active: bool) -> &mut Self {
        self.push(sensor_id, time, if active { 1.0 } else { 0.0 }, None)
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing {
            Err(StoreError::Backend("injected failure".to_string()))
        } else {
            Ok(())
        }
    }

    fn with_zone(&self, sensor: &Sensor) -> Option<(Sensor, Zone)> {
        self.zones
            .iter()
            .find(|z| z.id == sensor.zone_id)
            .map(|z| (sensor.clone(), z.clone()))
    }
}

impl ReadingStore for MemoryStore {
    fn find_sensor(&mut self, sensor_id: &str) -> Result<Option<(Sensor, Zone)>, StoreError> {
        self.calls.find_sensor += 1;
        self.check()?;
        Ok(self
            .sensors
            .iter()
            .find(|s| s.id == sensor_id)
            .and_then(|s| self.with_zone(s)))
    }

    fn list_sensors(&mut self, query: &SensorQuery<'_>) -> Result<Vec<(Sensor, Zone)>, StoreError> {
        self.calls.list_sensors += 1;
        self.check()?;
        let mut rows: Vec<_> = self
            .sensors
            .iter()
            .filter(|s| query.zone_id.is_none_or(|z| s.zone_id == z))
            .filter(|s| query.sensor_type.is_none_or(|t| s.sensor_type == t))
            .filter_map(|s| self.with_zone(s))
            .collect();
        rows.sort_by(|a, b| a.0.id.cmp(&b.0.id));
        Ok(rows)
    }

    fn load_samples(
        &mut self,
        table: ReadingTable,
        sensor_ids: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Sample>, StoreError> {
        self.calls.load_samples += 1;
        self.check()?;
        let mut rows: Vec<Sample> = self
            .samples
            .get(&table)
            .map(|all| {
                all.iter()
                    .filter(|s| sensor_ids.contains(&s.sensor_id) && s.time >= start && s.time <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        rows.sort_by(|a, b| (&a.sensor_id, a.time).cmp(&(&b.sensor_id, b.time)));
        self.rows_loaded += rows.len();
        Ok(rows)
    }

    fn load_windows(&mut self, table: ReadingTable, windows: &[SampleWindow]) -> Result<Vec<Sample>, StoreError> {
        self.calls.load_windows += 1;
        self.check()?;
        let mut rows: Vec<Sample> = self
            .samples
            .get(&table)
            .map(|all| {
                all.iter()
                    .filter(|s| {
                        windows
                            .iter()
                            .any(|w| w.sensor_id == s.sensor_id && s.time >= w.start && s.time <= w.end)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        rows.sort_by(|a, b| (&a.sensor_id, a.time).cmp(&(&b.sensor_id, b.time)));
        self.rows_loaded += rows.len();
        Ok(rows)
    }

    fn latest_samples(&mut self, table: ReadingTable, sensor_ids: &[String]) -> Result<Vec<Sample>, StoreError> {
        self.calls.latest_samples += 1;
        self.check()?;
        let mut latest: BTreeMap<&str, &Sample> = BTreeMap::new();
        for sample in self.samples.get(&table).into_iter().flatten() {
            if !sensor_ids.contains(&sample.sensor_id) {
                continue;
            }
            let entry = latest.entry(sample.sensor_id.as_str()).or_insert(sample);
            if sample.time > entry.time {
                *entry = sample;
            }
        }
        Ok(latest.into_values().cloned().collect())
    }
}
