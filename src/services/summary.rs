//! Dashboard summaries: current value, 24-hour trend and 24-hour stats.
//!
//! Sensors are grouped by type and each group costs exactly two sample
//! queries (latest per sensor, then one batched load of every sensor's own
//! trend window), no matter how many sensors it contains.

use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, warn};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::db::models::{Sensor, Zone};
use crate::models::facility::{SensorReading, SensorStats, SensorSummary, SensorThresholds, Status};
use crate::registry::{self, SensorTypeDescriptor};
use crate::stats::{Accumulator, Summary, round_to};
use crate::store::{ReadingStore, Sample, SampleWindow, SensorQuery, StoreError};
use crate::utils::{SECONDS_PER_HOUR, truncate_to};

/// Trend and stats share one window: the 24 UTC hours ending with the hour of
/// the latest reading, cut off at the latest reading itself.
pub const TREND_HOURS: i64 = 24;
const TREND_DECIMALS: u32 = 1;

/// Every sensor that has at least one reading.
pub fn all_sensors<S: ReadingStore + ?Sized>(store: &mut S) -> Result<Vec<SensorSummary>, StoreError> {
    let rows = store.list_sensors(&SensorQuery::default())?;
    build_summaries(store, rows)
}

/// `Ok(None)` when the sensor is unknown or has no readings.
pub fn sensor<S: ReadingStore + ?Sized>(store: &mut S, sensor_id: &str) -> Result<Option<SensorSummary>, StoreError> {
    let Some(row) = store.find_sensor(sensor_id)? else {
        return Ok(None);
    };
    Ok(build_summaries(store, vec![row])?.into_iter().next())
}

pub fn sensors_in_zone<S: ReadingStore + ?Sized>(
    store: &mut S,
    zone_id: &str,
    sensor_type: Option<&str>,
) -> Result<Vec<SensorSummary>, StoreError> {
    let rows = store.list_sensors(&SensorQuery {
        zone_id: Some(zone_id),
        sensor_type,
    })?;
    build_summaries(store, rows)
}

/// Status and display text. Comparisons are strictly greater-than, so a
/// cold room at exactly its warning threshold is still normal.
pub fn compute_status(value: f64, warning: Option<f64>, critical: Option<f64>, unit: &str) -> (Status, String) {
    let Some(warning) = warning else {
        return (Status::Normal, "Normal".to_string());
    };
    if critical.is_some_and(|c| value > c) {
        (Status::Critical, "Critical".to_string())
    } else if value > warning {
        if warning < 0.0 {
            (Status::Warning, format!("Warning - above {:.1}{} target", warning, unit))
        } else {
            (Status::Warning, "Warning".to_string())
        }
    } else {
        (Status::Normal, "Normal".to_string())
    }
}

fn build_summaries<S: ReadingStore + ?Sized>(
    store: &mut S,
    rows: Vec<(Sensor, Zone)>,
) -> Result<Vec<SensorSummary>, StoreError> {
    // Group row indices per type, keeping first-seen order of types.
    let mut groups: Vec<(&'static SensorTypeDescriptor, Vec<usize>)> = Vec::new();
    for (index, (sensor, _)) in rows.iter().enumerate() {
        let Some(descriptor) = registry::lookup(&sensor.sensor_type) else {
            warn!("Skipping sensor {} with unknown type '{}'", sensor.id, sensor.sensor_type);
            continue;
        };
        match groups.iter_mut().find(|(d, _)| d.tag == descriptor.tag) {
            Some((_, members)) => members.push(index),
            None => groups.push((descriptor, vec![index])),
        }
    }

    let mut built: Vec<Option<SensorSummary>> = vec![None; rows.len()];
    for (descriptor, members) in groups {
        let ids: Vec<String> = members.iter().map(|&i| rows[i].0.id.clone()).collect();
        let latest: HashMap<String, Sample> = store
            .latest_samples(descriptor.table, &ids)?
            .into_iter()
            .map(|s| (s.sensor_id.clone(), s))
            .collect();
        if latest.is_empty() {
            debug!("No {} readings for {} sensor(s)", descriptor.tag, ids.len());
            continue;
        }

        let mut windows: Vec<SampleWindow> = latest
            .values()
            .map(|s| {
                let (start, end) = summary_window(s.time);
                SampleWindow {
                    sensor_id: s.sensor_id.clone(),
                    start,
                    end,
                }
            })
            .collect();
        windows.sort_by(|a, b| a.sensor_id.cmp(&b.sensor_id));
        let window = store.load_windows(descriptor.table, &windows)?;
        let mut per_sensor: HashMap<&str, Vec<&Sample>> = HashMap::new();
        for sample in &window {
            per_sensor.entry(sample.sensor_id.as_str()).or_default().push(sample);
        }

        for &index in &members {
            let (sensor, zone) = &rows[index];
            let Some(current) = latest.get(&sensor.id) else {
                continue;
            };
            let history = per_sensor.get(sensor.id.as_str()).map(Vec::as_slice).unwrap_or_default();
            built[index] = Some(assemble(descriptor, sensor, zone, current, history));
        }
    }

    Ok(built.into_iter().flatten().collect())
}

fn assemble(
    descriptor: &SensorTypeDescriptor,
    sensor: &Sensor,
    zone: &Zone,
    current: &Sample,
    history: &[&Sample],
) -> SensorSummary {
    let (status, status_text) = compute_status(
        current.value,
        sensor.warning_threshold,
        sensor.critical_threshold,
        descriptor.unit,
    );
    let raw_values = descriptor.state_key.map(|key| {
        let mut values = BTreeMap::new();
        values.insert(key.to_string(), Value::Bool(current.is_active()));
        values
    });
    let thresholds = if sensor.warning_threshold.is_some() || sensor.critical_threshold.is_some() {
        Some(SensorThresholds {
            warning: sensor.warning_threshold,
            critical: sensor.critical_threshold,
        })
    } else {
        None
    };

    SensorSummary {
        id: sensor.id.clone(),
        sensor_type: sensor.sensor_type.clone(),
        zone: zone.name.clone(),
        label: sensor.label.clone(),
        reading: SensorReading {
            value: descriptor.format(current.value),
            unit: descriptor.unit_label(current.secondary),
            status,
            status_text,
            raw_values,
        },
        trend: trend(descriptor, current.time, history),
        stats: stats(descriptor, history),
        thresholds,
        target_range: zone.target_range().map(|(min, max)| [min, max]),
    }
}

/// `[start of the hour 23 hours before latest, latest]`, both inclusive.
fn summary_window(latest: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let first_hour = truncate_to(latest, SECONDS_PER_HOUR) - TimeDelta::hours(TREND_HOURS - 1);
    (first_hour, latest)
}

/// 24 hourly points ending with the hour of `latest`, oldest first.
fn trend(descriptor: &SensorTypeDescriptor, latest: DateTime<Utc>, history: &[&Sample]) -> Vec<f64> {
    let (first_hour, _) = summary_window(latest);
    let mut buckets = [Accumulator::default(); TREND_HOURS as usize];
    for sample in history {
        let offset = (truncate_to(sample.time, SECONDS_PER_HOUR) - first_hour).num_hours();
        if (0..TREND_HOURS).contains(&offset) {
            buckets[offset as usize].push(sample.value);
        }
    }

    buckets
        .iter()
        .map(|bucket| {
            if descriptor.is_boolean {
                bucket.sum
            } else {
                bucket.mean().map(|m| round_to(m, TREND_DECIMALS)).unwrap_or(0.0)
            }
        })
        .collect()
}

/// Min/max/avg over the samples already limited to the summary window.
fn stats(descriptor: &SensorTypeDescriptor, history: &[&Sample]) -> SensorStats {
    let values: Vec<f64> = history.iter().map(|s| s.value).collect();
    let decimals = descriptor.summary_decimals;
    match Summary::from_values(&values) {
        Some(s) => SensorStats {
            min: round_to(s.min, decimals),
            max: round_to(s.max, decimals),
            avg: round_to(s.mean, decimals),
            unit: descriptor.unit.to_string(),
        },
        None => SensorStats {
            min: 0.0,
            max: 0.0,
            avg: 0.0,
            unit: descriptor.unit.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::facility::Interval;
    use crate::registry::{AIR_QUALITY, DOOR, ENVIRONMENTAL, MOTION};
    use crate::services::readings::get_readings;
    use crate::testing::{MemoryStore, at};

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .add_zone("loading", "Loading Bay", Some((15.0, 25.0)))
            .add_zone("cold-b", "Cold Room B", Some((-20.0, -16.0)))
            .add_sensor("cold-b-door", "cold-b", DOOR, None, None)
            .add_sensor("cold-b-motion", "cold-b", MOTION, None, None)
            .add_sensor("cold-b-temp", "cold-b", ENVIRONMENTAL, Some(-18.0), Some(-10.0))
            .add_sensor("loading-aq", "loading", AIR_QUALITY, Some(800.0), Some(1200.0))
            .add_sensor("loading-door", "loading", DOOR, None, None)
            .add_sensor("loading-temp", "loading", ENVIRONMENTAL, Some(25.0), Some(30.0));
        store
    }

    fn store_with_many_doors(n: u32) -> MemoryStore {
        let mut store = MemoryStore::new();
        store.add_zone("dock", "Dock", None);
        for i in 0..n {
            let id = format!("dock-door-{:02}", i);
            store
                .add_sensor(&id, "dock", DOOR, None, None)
                .push_state(&id, at(29, 10, 0, 0), i % 3 == 0);
        }
        store
    }

    #[test]
    fn cold_room_status_classification() {
        let classify = |v| compute_status(v, Some(-18.0), Some(-10.0), "°C");
        assert_eq!(classify(-18.0).0, Status::Normal);
        let (status, text) = classify(-17.9);
        assert_eq!(status, Status::Warning);
        assert_eq!(text, "Warning - above -18.0°C target");
        assert_eq!(classify(-10.0).0, Status::Warning);
        assert_eq!(classify(-9.9), (Status::Critical, "Critical".to_string()));
    }

    #[test]
    fn status_without_warning_threshold_is_normal() {
        assert_eq!(compute_status(5_000.0, None, Some(1.0), "ppm").0, Status::Normal);
        assert_eq!(compute_status(26.0, Some(25.0), None, "°C"), (Status::Warning, "Warning".to_string()));
    }

    #[test]
    fn query_count_is_per_type_not_per_sensor() {
        let mut store = store();
        for hour in 0..6 {
            store
                .push("cold-b-temp", at(29, hour, 0, 0), -17.5, Some(68.0))
                .push("loading-temp", at(29, hour, 0, 0), 19.0, Some(45.0))
                .push_state("cold-b-door", at(29, hour, 0, 0), hour % 2 == 0)
                .push_state("loading-door", at(29, hour, 0, 0), false);
        }

        let summaries = all_sensors(&mut store).unwrap();
        assert_eq!(summaries.len(), 4);
        // Four types listed, one latest query each; only the two types with data need a window query.
        assert_eq!(store.calls.latest_samples, 4);
        assert_eq!(store.calls.load_windows, 2);
        assert_eq!(store.calls.load_samples, 0);

        // Adding more sensors of an existing type does not add queries.
        let mut bigger = store_with_many_doors(20);
        let before = bigger.calls;
        assert_eq!(all_sensors(&mut bigger).unwrap().len(), 20);
        assert_eq!(bigger.calls.sample_queries() - before.sample_queries(), 2);
        // Listing order is preserved across type groups.
        let ids: Vec<_> = summaries.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["cold-b-door", "cold-b-temp", "loading-door", "loading-temp"]);
    }

    #[test]
    fn sensors_without_readings_are_excluded() {
        let mut store = store();
        store.push("loading-temp", at(29, 10, 0, 0), 19.0, Some(45.0));

        let summaries = all_sensors(&mut store).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, "loading-temp");
        assert!(sensor(&mut store, "loading-aq").unwrap().is_none());
        assert!(sensor(&mut store, "ghost").unwrap().is_none());
        assert!(sensors_in_zone(&mut store, "cold-b", None).unwrap().is_empty());
    }

    #[test]
    fn environmental_summary_fields() {
        let mut store = store();
        store
            .push("cold-b-temp", at(28, 9, 0, 0), -30.0, Some(50.0))
            .push("cold-b-temp", at(29, 9, 0, 0), -18.4, Some(66.0))
            .push("cold-b-temp", at(29, 9, 30, 0), -17.6, Some(67.0))
            .push("cold-b-temp", at(29, 10, 15, 0), -17.9, Some(68.6));

        let s = sensor(&mut store, "cold-b-temp").unwrap().unwrap();
        assert_eq!(s.zone, "Cold Room B");
        assert_eq!(s.reading.value, "-17.9°C");
        assert_eq!(s.reading.unit.as_deref(), Some("/ 68%"));
        assert_eq!(s.reading.status, Status::Warning);
        assert!(s.reading.raw_values.is_none());
        assert_eq!(s.trend.len(), 24);
        assert_eq!(s.trend[23], -17.9);
        assert_eq!(s.trend[22], -18.0);
        assert!(s.trend[..22].iter().all(|v| *v == 0.0));
        // 28th 09:00 falls before the first trend hour (28th 11:00).
        assert_eq!(s.stats.min, -18.4);
        assert_eq!(s.stats.max, -17.6);
        assert_eq!(s.stats.avg, -18.0);
        assert_eq!(s.stats.unit, "°C");
        assert_eq!(
            s.thresholds,
            Some(SensorThresholds {
                warning: Some(-18.0),
                critical: Some(-10.0)
            })
        );
        assert_eq!(s.target_range, Some([-20.0, -16.0]));
    }

    #[test]
    fn door_summary_counts_events_and_exposes_state() {
        let mut store = store();
        store
            .push_state("cold-b-door", at(29, 8, 0, 0), false)
            .push_state("cold-b-door", at(29, 8, 15, 0), true)
            .push_state("cold-b-door", at(29, 8, 30, 0), true)
            .push_state("cold-b-door", at(29, 9, 0, 0), true);

        let zone = sensors_in_zone(&mut store, "cold-b", Some(DOOR)).unwrap();
        assert_eq!(zone.len(), 1);
        let s = &zone[0];
        assert_eq!(s.reading.value, "Open");
        assert_eq!(s.reading.unit, None);
        assert_eq!(s.reading.status, Status::Normal);
        assert_eq!(
            s.reading.raw_values.as_ref().and_then(|m| m.get("isOpen")),
            Some(&Value::Bool(true))
        );
        assert_eq!(s.trend[23], 1.0);
        assert_eq!(s.trend[22], 2.0);
        assert_eq!(s.stats.unit, "events");
        assert_eq!(s.stats.min, 0.0);
        assert_eq!(s.stats.max, 1.0);
        assert_eq!(s.stats.avg, 0.75);
        assert_eq!(s.thresholds, None);
    }

    #[test]
    fn trend_zero_fills_where_bucketed_readings_omit() {
        let mut store = store();
        store
            .push("loading-aq", at(29, 2, 10, 0), 450.0, None)
            .push("loading-aq", at(29, 5, 20, 0), 600.0, None);

        let s = sensor(&mut store, "loading-aq").unwrap().unwrap();
        assert_eq!(s.trend.len(), 24);
        assert_eq!(s.trend.iter().filter(|v| **v != 0.0).count(), 2);
        assert_eq!(s.trend[20], 450.0);
        assert_eq!(s.trend[23], 600.0);
        assert_eq!(s.reading.value, "600");
        assert_eq!(s.reading.unit.as_deref(), Some("ppm"));

        let series = get_readings(&mut store, "loading-aq", at(28, 6, 0, 0), at(29, 6, 0, 0), Interval::Hourly)
            .unwrap()
            .unwrap();
        assert_eq!(series.readings.len(), 2);
    }

    #[test]
    fn stale_sensor_does_not_widen_the_window() {
        let mut store = MemoryStore::new();
        store
            .add_zone("cold-a", "Cold Room A", None)
            .add_sensor("cold-a-fresh", "cold-a", ENVIRONMENTAL, None, None)
            .add_sensor("cold-a-stale", "cold-a", ENVIRONMENTAL, None, None)
            .push("cold-a-stale", at(1, 6, 0, 0), 3.0, Some(80.0));
        let mut time = at(1, 0, 0, 0);
        while time <= at(29, 12, 0, 0) {
            store.push("cold-a-fresh", time, 2.0, Some(85.0));
            time += TimeDelta::minutes(15);
        }

        let summaries = all_sensors(&mut store).unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(store.calls.load_windows, 1);
        // 23 hours of 15-minute samples plus the closing one, and the stale sensor's single reading.
        assert_eq!(store.rows_loaded, 23 * 4 + 1 + 1);

        let stale = summaries.iter().find(|s| s.id == "cold-a-stale").unwrap();
        assert_eq!(stale.stats.max, 3.0);
        assert_eq!(stale.trend[23], 3.0);
    }

    #[test]
    fn stats_and_trend_cover_the_same_readings() {
        let mut store = store();
        store
            .push("loading-temp", at(28, 10, 30, 0), 7.0, Some(40.0))
            .push("loading-temp", at(28, 11, 30, 0), 6.0, Some(40.0))
            .push("loading-temp", at(29, 10, 15, 0), 5.0, Some(40.0));

        let s = sensor(&mut store, "loading-temp").unwrap().unwrap();
        assert_eq!(s.trend[0], 6.0);
        assert_eq!(s.trend[23], 5.0);
        assert_eq!(s.stats.max, 6.0);
        assert_eq!(s.stats.min, 5.0);
    }

    #[test]
    fn unknown_types_are_skipped() {
        let mut store = store();
        store.add_sensor("cold-b-probe", "cold-b", "thermal_presence", None, None);
        store.push("cold-b-temp", at(29, 10, 0, 0), -18.5, Some(60.0));

        let zone = sensors_in_zone(&mut store, "cold-b", None).unwrap();
        assert_eq!(zone.len(), 1);
        assert_eq!(zone[0].id, "cold-b-temp");
        assert_eq!(zone[0].reading.status, Status::Normal);
    }

    #[test]
    fn storage_failure_propagates() {
        let mut store = store();
        store.push("cold-b-temp", at(29, 10, 0, 0), -18.5, Some(60.0));
        store.failing = true;
        assert!(all_sensors(&mut store).is_err());
    }
}
