//! Door-open events and presence windows reconstructed from boolean samples.
//!
//! Each sensor's samples are walked independently through [`EventState`].
//! Nothing before `start` is consulted: a sensor that is already active at its
//! first sample opens an event there, and one still active at its last sample
//! yields an event without a close time whose duration runs to `end`.

use chrono::{DateTime, Utc};
use log::debug;
use std::collections::HashMap;

use crate::db::models::{Sensor, Zone};
use crate::models::facility::{DoorEvent, PresenceEvent};
use crate::registry::{self, DOOR, MOTION};
use crate::store::{ReadingStore, Sample, SensorQuery, StoreError};

/// Presence windows at least this long (10 minutes in a cold room) are flagged.
pub const SAFETY_CONCERN_THRESHOLD_SECONDS: i64 = 600;

/// Which sensors an event query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventScope<'a> {
    All,
    Sensor(&'a str),
    Zone(&'a str),
}

impl<'a> EventScope<'a> {
    /// A sensor id takes precedence over a zone id.
    pub fn from_filters(sensor_id: Option<&'a str>, zone_id: Option<&'a str>) -> Self {
        match (sensor_id, zone_id) {
            (Some(id), _) => EventScope::Sensor(id),
            (None, Some(zone)) => EventScope::Zone(zone),
            (None, None) => EventScope::All,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventState {
    Idle,
    OpenSince(DateTime<Utc>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Span {
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    duration_seconds: i64,
}

impl EventState {
    fn step(self, active: bool, at: DateTime<Utc>) -> (EventState, Option<Span>) {
        match (self, active) {
            (EventState::Idle, true) => (EventState::OpenSince(at), None),
            (EventState::Idle, false) => (EventState::Idle, None),
            (EventState::OpenSince(since), true) => (EventState::OpenSince(since), None),
            (EventState::OpenSince(since), false) => (
                EventState::Idle,
                Some(Span {
                    start: since,
                    end: Some(at),
                    duration_seconds: (at - since).num_seconds(),
                }),
            ),
        }
    }

    fn finish(self, window_end: DateTime<Utc>) -> Option<Span> {
        match self {
            EventState::Idle => None,
            EventState::OpenSince(since) => Some(Span {
                start: since,
                end: None,
                duration_seconds: (window_end - since).num_seconds(),
            }),
        }
    }
}

/// Runs the state machine over every sensor's samples. Output is grouped by
/// sensor id, chronological within a sensor.
fn reconstruct(mut samples: Vec<Sample>, window_end: DateTime<Utc>) -> Vec<(String, Span)> {
    samples.sort_by(|a, b| (&a.sensor_id, a.time).cmp(&(&b.sensor_id, b.time)));

    let mut spans = Vec::new();
    for run in samples.chunk_by(|a, b| a.sensor_id == b.sensor_id) {
        let mut state = EventState::Idle;
        for sample in run {
            let (next, closed) = state.step(sample.is_active(), sample.time);
            if let Some(span) = closed {
                spans.push((sample.sensor_id.clone(), span));
            }
            state = next;
        }
        if let Some(span) = state.finish(window_end) {
            spans.push((run[0].sensor_id.clone(), span));
        }
    }
    spans
}

fn scoped_sensors<S: ReadingStore + ?Sized>(
    store: &mut S,
    sensor_type: &str,
    scope: EventScope<'_>,
) -> Result<Vec<(Sensor, Zone)>, StoreError> {
    match scope {
        EventScope::Sensor(id) => Ok(store
            .find_sensor(id)?
            .filter(|(sensor, _)| sensor.sensor_type == sensor_type)
            .into_iter()
            .collect()),
        EventScope::Zone(zone_id) => store.list_sensors(&SensorQuery {
            zone_id: Some(zone_id),
            sensor_type: Some(sensor_type),
        }),
        EventScope::All => store.list_sensors(&SensorQuery {
            zone_id: None,
            sensor_type: Some(sensor_type),
        }),
    }
}

fn load_spans<S: ReadingStore + ?Sized>(
    store: &mut S,
    sensor_type: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    scope: EventScope<'_>,
) -> Result<(Vec<(Sensor, Zone)>, Vec<(String, Span)>), StoreError> {
    let sensors = scoped_sensors(store, sensor_type, scope)?;
    if sensors.is_empty() {
        return Ok((sensors, Vec::new()));
    }
    let Some(descriptor) = registry::lookup(sensor_type) else {
        return Ok((sensors, Vec::new()));
    };

    let ids: Vec<String> = sensors.iter().map(|(s, _)| s.id.clone()).collect();
    let samples = store.load_samples(descriptor.table, &ids, start, end)?;
    debug!(
        "{} event scan: {} sample(s) across {} sensor(s)",
        sensor_type,
        samples.len(),
        ids.len()
    );
    Ok((sensors, reconstruct(samples, end)))
}

/// Door-open events in `[start, end]`.
pub fn door_events<S: ReadingStore + ?Sized>(
    store: &mut S,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    scope: EventScope<'_>,
) -> Result<Vec<DoorEvent>, StoreError> {
    let (_, spans) = load_spans(store, DOOR, start, end, scope)?;
    Ok(spans
        .into_iter()
        .map(|(sensor_id, span)| DoorEvent {
            sensor_id,
            opened_at: span.start,
            closed_at: span.end,
            duration_seconds: span.duration_seconds,
        })
        .collect())
}

/// Continuous motion windows in `[start, end]` lasting at least `min_duration_seconds`.
pub fn presence_events<S: ReadingStore + ?Sized>(
    store: &mut S,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    scope: EventScope<'_>,
    min_duration_seconds: i64,
) -> Result<Vec<PresenceEvent>, StoreError> {
    let (sensors, spans) = load_spans(store, MOTION, start, end, scope)?;
    let zones: HashMap<&str, &str> = sensors
        .iter()
        .map(|(sensor, _)| (sensor.id.as_str(), sensor.zone_id.as_str()))
        .collect();

    Ok(spans
        .into_iter()
        .filter(|(_, span)| span.duration_seconds >= min_duration_seconds)
        .map(|(sensor_id, span)| PresenceEvent {
            zone_id: zones.get(sensor_id.as_str()).copied().unwrap_or_default().to_string(),
            sensor_id,
            started_at: span.start,
            ended_at: span.end,
            duration_seconds: span.duration_seconds,
            is_safety_concern: span.duration_seconds >= SAFETY_CONCERN_THRESHOLD_SECONDS,
        })
        .collect())
}

pub fn safety_concern_count(events: &[PresenceEvent]) -> usize {
    events.iter().filter(|e| e.is_safety_concern).count()
}
