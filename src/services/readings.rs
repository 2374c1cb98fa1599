use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::collections::BTreeMap;

use crate::models::facility::{Interval, ReadingPoint, ReadingSeries};
use crate::registry::{self, SensorTypeDescriptor};
use crate::stats::{Accumulator, round_to};
use crate::store::{ReadingStore, Sample, StoreError};
use crate::utils::truncate_to;

const BUCKET_DECIMALS: u32 = 2;

/// Reading series for one sensor over `[start, end]`.
///
/// `Ok(None)` when the sensor or its type is unknown. Bucketed intervals omit
/// buckets without samples.
pub fn get_readings<S: ReadingStore + ?Sized>(
    store: &mut S,
    sensor_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    interval: Interval,
) -> Result<Option<ReadingSeries>, StoreError> {
    let Some((sensor, _zone)) = store.find_sensor(sensor_id)? else {
        return Ok(None);
    };
    let Some(descriptor) = registry::lookup(&sensor.sensor_type) else {
        warn!("Sensor {} has unknown type '{}'; no readings", sensor.id, sensor.sensor_type);
        return Ok(None);
    };

    let samples = store.load_samples(descriptor.table, std::slice::from_ref(&sensor.id), start, end)?;
    let readings = match interval.bucket_seconds() {
        None => samples
            .into_iter()
            .map(|s| ReadingPoint {
                timestamp: s.time,
                value: s.value,
                secondary: s.secondary,
            })
            .collect(),
        Some(step) => bucketize(descriptor, &samples, step),
    };
    debug!("{} readings for {} ({})", readings.len(), sensor.id, interval);

    Ok(Some(ReadingSeries {
        sensor_id: sensor.id,
        sensor_type: sensor.sensor_type,
        interval,
        readings,
    }))
}

#[derive(Default)]
struct Bucket {
    primary: Accumulator,
    secondary: Accumulator,
}

fn bucketize(descriptor: &SensorTypeDescriptor, samples: &[Sample], step_seconds: i64) -> Vec<ReadingPoint> {
    let mut buckets: BTreeMap<DateTime<Utc>, Bucket> = BTreeMap::new();
    for sample in samples {
        let bucket = buckets.entry(truncate_to(sample.time, step_seconds)).or_default();
        bucket.primary.push(sample.value);
        if let Some(secondary) = sample.secondary {
            bucket.secondary.push(secondary);
        }
    }

    buckets
        .into_iter()
        .map(|(timestamp, bucket)| {
            if descriptor.is_boolean {
                // Booleans are stored as 0/1, so the sum is the number of active samples.
                ReadingPoint {
                    timestamp,
                    value: bucket.primary.sum,
                    secondary: None,
                }
            } else {
                ReadingPoint {
                    timestamp,
                    value: round_to(bucket.primary.mean().unwrap_or_default(), BUCKET_DECIMALS),
                    secondary: bucket.secondary.mean().map(|m| round_to(m, BUCKET_DECIMALS)),
                }
            }
        })
        .collect()
}
