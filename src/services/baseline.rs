use chrono::{DateTime, TimeDelta, Timelike, Utc};
use log::{debug, warn};

use crate::models::facility::{Baseline, HourlyBaseline};
use crate::registry;
use crate::stats::{Summary, round_to};
use crate::store::{ReadingStore, StoreError};

pub const DEFAULT_BASELINE_HOURS: i64 = 24;
pub const DEFAULT_BASELINE_DAYS: i64 = 7;

/// Mean, population standard deviation and range over `[now - hours, now]`.
///
/// `Ok(None)` for a non-positive window, an unknown sensor, a type without
/// numeric aggregation, or a window without samples.
pub fn baseline<S: ReadingStore + ?Sized>(
    store: &mut S,
    sensor_id: &str,
    hours: i64,
    now: DateTime<Utc>,
) -> Result<Option<Baseline>, StoreError> {
    if hours <= 0 {
        return Ok(None);
    }
    let Some((sensor, _)) = store.find_sensor(sensor_id)? else {
        return Ok(None);
    };
    let Some(descriptor) = registry::lookup(&sensor.sensor_type).filter(|d| d.supports_aggregation) else {
        debug!("No numeric baseline for {} ({})", sensor.id, sensor.sensor_type);
        return Ok(None);
    };

    let start = now - TimeDelta::hours(hours);
    let samples = store.load_samples(descriptor.table, std::slice::from_ref(&sensor.id), start, now)?;
    let values: Vec<f64> = samples.iter().map(|s| s.value).collect();
    let Some(summary) = Summary::from_values(&values) else {
        return Ok(None);
    };

    let decimals = descriptor.baseline_decimals;
    Ok(Some(Baseline {
        sensor_id: sensor.id,
        mean: round_to(summary.mean, decimals),
        std_dev: round_to(summary.std_dev, decimals),
        min: round_to(summary.min, decimals),
        max: round_to(summary.max, decimals),
        unit: descriptor.unit.to_string(),
        sample_count: summary.count,
        period_hours: hours,
    }))
}

/// One entry per UTC hour of day over the trailing `days`.
///
/// Empty for an unknown sensor or `days <= 0`. Types without numeric
/// aggregation get 24 zeroed entries without touching the reading tables.
pub fn hourly_baselines<S: ReadingStore + ?Sized>(
    store: &mut S,
    sensor_id: &str,
    days: i64,
    now: DateTime<Utc>,
) -> Result<Vec<HourlyBaseline>, StoreError> {
    if days <= 0 {
        return Ok(Vec::new());
    }
    let Some((sensor, _)) = store.find_sensor(sensor_id)? else {
        return Ok(Vec::new());
    };
    let descriptor = match registry::lookup(&sensor.sensor_type) {
        Some(d) if d.supports_aggregation => d,
        Some(_) => return Ok((0..24).map(HourlyBaseline::empty).collect()),
        None => {
            warn!("Sensor {} has unknown type '{}'", sensor.id, sensor.sensor_type);
            return Ok((0..24).map(HourlyBaseline::empty).collect());
        }
    };

    let start = now - TimeDelta::days(days);
    let samples = store.load_samples(descriptor.table, std::slice::from_ref(&sensor.id), start, now)?;

    let mut by_hour: [Vec<f64>; 24] = std::array::from_fn(|_| Vec::new());
    for sample in &samples {
        by_hour[sample.time.hour() as usize].push(sample.value);
    }

    let decimals = descriptor.baseline_decimals;
    Ok(by_hour
        .iter()
        .zip(0u32..)
        .map(|(values, hour)| match Summary::from_values(values) {
            Some(s) => HourlyBaseline {
                hour,
                mean: round_to(s.mean, decimals),
                std_dev: round_to(s.std_dev, decimals),
                sample_count: s.count,
            },
            None => HourlyBaseline::empty(hour),
        })
        .collect())
}
