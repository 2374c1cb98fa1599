//! Deterministic demo facility: four zones, eleven sensors and a couple of
//! days of interval-sampled readings, including a slow warm-up of the frozen
//! room over the last six hours.

use crate::config::Config;
use crate::db::models::{
    NewAirQualityReading, NewDoorReading, NewEnvironmentalReading, NewMotionReading, NewSensor, NewZone,
};
use crate::registry::{AIR_QUALITY, DOOR, ENVIRONMENTAL, MOTION};
use crate::schema;
use crate::services::ingest::{
    insert_air_quality_readings, insert_door_readings, insert_environmental_readings, insert_motion_readings,
};
use crate::stats::round_to;
use crate::utils::truncate_to;
use chrono::{DateTime, Duration, Timelike, Utc};
use diesel::PgConnection;
use diesel::prelude::*;
use log::info;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const RNG_SEED: u64 = 42;
const INCIDENT_SENSOR: &str = "cold-b-temp";
const INCIDENT_HOURS: i64 = 6;
const INCIDENT_MAX_DRIFT: f64 = 2.8;
const INCIDENT_DRIFT_PER_HOUR: f64 = 0.47;

// (id, name, zone_type, target min, target max)
const ZONES: [(&str, &str, &str, f64, f64); 4] = [
    ("loading", "Loading Bay", "ambient", 15.0, 25.0),
    ("cold-a", "Cold Room A (Fresh)", "cold_fresh", 2.0, 4.0),
    ("cold-b", "Cold Room B (Frozen)", "cold_frozen", -20.0, -16.0),
    ("dry", "Dry Storage", "dry_storage", 15.0, 20.0),
];

// (id, zone, type, label, warning, critical)
type SensorSpec = (&'static str, &'static str, &'static str, &'static str, Option<f64>, Option<f64>);
const SENSORS: [SensorSpec; 11] = [
    ("loading-temp", "loading", ENVIRONMENTAL, "Temperature & Humidity", Some(25.0), Some(30.0)),
    ("loading-aq", "loading", AIR_QUALITY, "Air Quality (CO₂)", Some(800.0), Some(1200.0)),
    ("loading-door", "loading", DOOR, "Bay Door", None, None),
    ("loading-motion", "loading", MOTION, "Dock Motion", None, None),
    ("cold-a-motion", "cold-a", MOTION, "Entry Motion", None, None),
    ("cold-a-temp", "cold-a", ENVIRONMENTAL, "Temperature & Humidity", Some(5.0), Some(8.0)),
    ("cold-b-door", "cold-b", DOOR, "Freezer Door", None, None),
    // Frozen room: warning above -18°C, critical above -10°C.
    ("cold-b-temp", "cold-b", ENVIRONMENTAL, "Temperature & Humidity", Some(-18.0), Some(-10.0)),
    ("cold-b-motion", "cold-b", MOTION, "Room Motion", None, None),
    ("dry-temp", "dry", ENVIRONMENTAL, "Temp & Humidity", Some(25.0), Some(30.0)),
    ("dry-aq", "dry", AIR_QUALITY, "Air Quality", Some(800.0), Some(1200.0)),
];

/// Readings produced for one seeding run, one batch per table.
#[derive(Debug, Default)]
pub struct GeneratedReadings {
    pub environmental: Vec<NewEnvironmentalReading>,
    pub air_quality: Vec<NewAirQualityReading>,
    pub door: Vec<NewDoorReading>,
    pub motion: Vec<NewMotionReading>,
}

impl GeneratedReadings {
    pub fn len(&self) -> usize {
        self.environmental.len() + self.air_quality.len() + self.door.len() + self.motion.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Upsert the demo zones and sensors, then write `cfg.seed_hours` of history
/// ending at `now`. Existing readings are left alone unless `reset` is set.
pub fn run(conn: &mut PgConnection, cfg: &Config, now: DateTime<Utc>, reset: bool) -> Result<usize, String> {
    ensure_zones(conn)?;
    ensure_sensors(conn)?;
    info!("Seed: {} zone(s) and {} sensor(s) in place", ZONES.len(), SENSORS.len());

    if reset {
        let removed = clear_readings(conn)?;
        info!("Seed: removed {} existing reading(s)", removed);
    } else if has_readings(conn)? {
        info!("Seed: readings already present; use --reset to regenerate");
        return Ok(0);
    }

    let end = truncate_to(now, 60);
    let start = end - Duration::hours(cfg.seed_hours);
    let step = Duration::minutes(cfg.seed_interval_minutes);
    info!(
        "Seed: generating readings from {} to {} every {} minute(s)",
        start, end, cfg.seed_interval_minutes
    );

    let mut rng = SmallRng::seed_from_u64(RNG_SEED);
    let generated = generate(start, end, step, &mut rng);

    let mut inserted = 0;
    inserted += insert_environmental_readings(conn, &generated.environmental)?;
    inserted += insert_air_quality_readings(conn, &generated.air_quality)?;
    inserted += insert_door_readings(conn, &generated.door)?;
    inserted += insert_motion_readings(conn, &generated.motion)?;

    info!(
        "Seed: complete (generated={}, inserted={}, sensors={})",
        generated.len(),
        inserted,
        SENSORS.len()
    );
    Ok(inserted)
}

/// Readings for every demo sensor at each step in `[start, end]`.
pub fn generate(start: DateTime<Utc>, end: DateTime<Utc>, step: Duration, rng: &mut SmallRng) -> GeneratedReadings {
    let mut out = GeneratedReadings::default();
    let incident_start = end - Duration::hours(INCIDENT_HOURS);

    for (sensor_id, _, sensor_type, ..) in SENSORS {
        let mut door_open = false;
        let mut ts = start;
        while ts <= end {
            let business_hours = (6..=18).contains(&ts.hour());
            match sensor_type {
                ENVIRONMENTAL => {
                    let (base_temp, base_humidity) = environmental_baseline(sensor_id);
                    let temp = if sensor_id == INCIDENT_SENSOR && ts >= incident_start {
                        let hours_in = (ts - incident_start).num_seconds() as f64 / 3_600.0;
                        let drift = (hours_in * INCIDENT_DRIFT_PER_HOUR).min(INCIDENT_MAX_DRIFT);
                        base_temp + drift + rng.random_range(-0.2..=0.2)
                    } else {
                        base_temp + rng.random_range(-0.3..=0.3)
                    };
                    let humidity = base_humidity + rng.random_range(-2.0..=2.0);
                    out.environmental.push(NewEnvironmentalReading {
                        sensor_id: sensor_id.to_string(),
                        time: ts,
                        temperature_c: round_to(temp, 1),
                        humidity_pct: round_to(humidity, 1),
                    });
                }
                AIR_QUALITY => {
                    let co2 = co2_baseline(sensor_id) + rng.random_range(-30.0..=30.0);
                    out.air_quality.push(NewAirQualityReading {
                        sensor_id: sensor_id.to_string(),
                        time: ts,
                        co2_ppm: round_to(co2, 0),
                    });
                }
                DOOR => {
                    if business_hours {
                        if rng.random_bool(0.05) {
                            door_open = !door_open;
                        }
                    } else if door_open && rng.random_bool(0.3) {
                        door_open = false;
                    }
                    out.door.push(NewDoorReading {
                        sensor_id: sensor_id.to_string(),
                        time: ts,
                        is_open: door_open,
                    });
                }
                MOTION => {
                    let p = if business_hours { 0.15 } else { 0.02 };
                    out.motion.push(NewMotionReading {
                        sensor_id: sensor_id.to_string(),
                        time: ts,
                        motion_detected: rng.random_bool(p),
                    });
                }
                _ => {}
            }
            ts += step;
        }
    }
    out
}

fn environmental_baseline(sensor_id: &str) -> (f64, f64) {
    match sensor_id {
        "loading-temp" => (18.0, 45.0),
        "cold-a-temp" => (3.0, 82.0),
        "cold-b-temp" => (-17.0, 68.0),
        "dry-temp" => (17.8, 38.0),
        _ => (20.0, 50.0),
    }
}

fn co2_baseline(sensor_id: &str) -> f64 {
    match sensor_id {
        "loading-aq" => 420.0,
        "dry-aq" => 380.0,
        _ => 400.0,
    }
}

fn ensure_zones(conn: &mut PgConnection) -> Result<(), String> {
    use schema::zones::dsl as Z;

    for (id, name, zone_type, min, max) in ZONES {
        let new_zone = NewZone {
            id: id.to_string(),
            name: name.to_string(),
            zone_type: zone_type.to_string(),
            target_temp_min: Some(min),
            target_temp_max: Some(max),
        };

        diesel::insert_into(Z::zones)
            .values(&new_zone)
            .on_conflict(Z::id)
            .do_update()
            .set((
                Z::name.eq(&new_zone.name),
                Z::zone_type.eq(&new_zone.zone_type),
                Z::target_temp_min.eq(new_zone.target_temp_min),
                Z::target_temp_max.eq(new_zone.target_temp_max),
            ))
            .execute(conn)
            .map_err(|e| format!("upsert zone {} failed: {}", id, e))?;
    }
    Ok(())
}

fn ensure_sensors(conn: &mut PgConnection) -> Result<(), String> {
    use schema::sensors::dsl as S;

    for (id, zone_id, sensor_type, label, warning, critical) in SENSORS {
        let new_sensor = NewSensor {
            id: id.to_string(),
            zone_id: zone_id.to_string(),
            sensor_type: sensor_type.to_string(),
            label: label.to_string(),
            warning_threshold: warning,
            critical_threshold: critical,
        };

        diesel::insert_into(S::sensors)
            .values(&new_sensor)
            .on_conflict(S::id)
            .do_update()
            .set((
                S::zone_id.eq(&new_sensor.zone_id),
                S::sensor_type.eq(&new_sensor.sensor_type),
                S::label.eq(&new_sensor.label),
                S::warning_threshold.eq(new_sensor.warning_threshold),
                S::critical_threshold.eq(new_sensor.critical_threshold),
            ))
            .execute(conn)
            .map_err(|e| format!("upsert sensor {} failed: {}", id, e))?;
    }
    Ok(())
}

fn has_readings(conn: &mut PgConnection) -> Result<bool, String> {
    use diesel::dsl::exists;
    use schema::{air_quality_readings as A, door_readings as D, environmental_readings as E, motion_readings as M};

    let check = |r: QueryResult<bool>| r.map_err(|e| format!("check existing readings failed: {}", e));
    Ok(check(diesel::select(exists(E::table.select(E::id))).get_result(conn))?
        || check(diesel::select(exists(A::table.select(A::id))).get_result(conn))?
        || check(diesel::select(exists(D::table.select(D::id))).get_result(conn))?
        || check(diesel::select(exists(M::table.select(M::id))).get_result(conn))?)
}

fn clear_readings(conn: &mut PgConnection) -> Result<usize, String> {
    use schema::{air_quality_readings as A, door_readings as D, environmental_readings as E, motion_readings as M};

    let map = |e: diesel::result::Error| format!("clear readings failed: {}", e);
    let mut removed = diesel::delete(E::table).execute(conn).map_err(map)?;
    removed += diesel::delete(A::table).execute(conn).map_err(map)?;
    removed += diesel::delete(D::table).execute(conn).map_err(map)?;
    removed += diesel::delete(M::table).execute(conn).map_err(map)?;
    Ok(removed)
}
