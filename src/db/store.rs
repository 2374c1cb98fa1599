//! `ReadingStore` over a live Postgres connection.

use chrono::{DateTime, Utc};
use diesel::PgConnection;
use diesel::prelude::*;
use log::debug;

use crate::db::models::{AirQualityReading, DoorReading, EnvironmentalReading, MotionReading, Sensor, Zone};
use crate::registry::ReadingTable;
use crate::schema;
use crate::store::{ReadingStore, Sample, SampleWindow, SensorQuery, StoreError};

impl From<EnvironmentalReading> for Sample {
    fn from(r: EnvironmentalReading) -> Self {
        Sample {
            sensor_id: r.sensor_id,
            time: r.time,
            value: r.temperature_c,
            secondary: Some(r.humidity_pct),
        }
    }
}

impl From<AirQualityReading> for Sample {
    fn from(r: AirQualityReading) -> Self {
        Sample {
            sensor_id: r.sensor_id,
            time: r.time,
            value: r.co2_ppm,
            secondary: None,
        }
    }
}

impl From<DoorReading> for Sample {
    fn from(r: DoorReading) -> Self {
        Sample {
            sensor_id: r.sensor_id,
            time: r.time,
            value: if r.is_open { 1.0 } else { 0.0 },
            secondary: None,
        }
    }
}

impl From<MotionReading> for Sample {
    fn from(r: MotionReading) -> Self {
        Sample {
            sensor_id: r.sensor_id,
            time: r.time,
            value: if r.motion_detected { 1.0 } else { 0.0 },
            secondary: None,
        }
    }
}

fn into_samples<R: Into<Sample>>(rows: Vec<R>) -> Vec<Sample> {
    rows.into_iter().map(Into::into).collect()
}

impl ReadingStore for PgConnection {
    fn find_sensor(&mut self, sensor_id: &str) -> Result<Option<(Sensor, Zone)>, StoreError> {
        use schema::{sensors, zones};

        let row = sensors::table
            .inner_join(zones::table)
            .filter(sensors::id.eq(sensor_id))
            .select((Sensor::as_select(), Zone::as_select()))
            .first::<(Sensor, Zone)>(self)
            .optional()?;
        Ok(row)
    }

    fn list_sensors(&mut self, query: &SensorQuery<'_>) -> Result<Vec<(Sensor, Zone)>, StoreError> {
        use schema::{sensors, zones};

        let mut q = sensors::table
            .inner_join(zones::table)
            .select((Sensor::as_select(), Zone::as_select()))
            .order(sensors::id.asc())
            .into_boxed();
        if let Some(zone_id) = query.zone_id {
            q = q.filter(sensors::zone_id.eq(zone_id));
        }
        if let Some(sensor_type) = query.sensor_type {
            q = q.filter(sensors::sensor_type.eq(sensor_type));
        }
        let rows = q.load::<(Sensor, Zone)>(self)?;
        debug!("list_sensors({:?}) -> {} row(s)", query, rows.len());
        Ok(rows)
    }

    fn load_samples(
        &mut self,
        table: ReadingTable,
        sensor_ids: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Sample>, StoreError> {
        if sensor_ids.is_empty() {
            return Ok(Vec::new());
        }

        let samples = match table {
            ReadingTable::Environmental => {
                use schema::environmental_readings::dsl as E;
                into_samples(
                    E::environmental_readings
                        .filter(E::sensor_id.eq_any(sensor_ids))
                        .filter(E::time.ge(start))
                        .filter(E::time.le(end))
                        .order((E::sensor_id.asc(), E::time.asc()))
                        .select(EnvironmentalReading::as_select())
                        .load::<EnvironmentalReading>(self)?,
                )
            }
            ReadingTable::AirQuality => {
                use schema::air_quality_readings::dsl as A;
                into_samples(
                    A::air_quality_readings
                        .filter(A::sensor_id.eq_any(sensor_ids))
                        .filter(A::time.ge(start))
                        .filter(A::time.le(end))
                        .order((A::sensor_id.asc(), A::time.asc()))
                        .select(AirQualityReading::as_select())
                        .load::<AirQualityReading>(self)?,
                )
            }
            ReadingTable::Door => {
                use schema::door_readings::dsl as D;
                into_samples(
                    D::door_readings
                        .filter(D::sensor_id.eq_any(sensor_ids))
                        .filter(D::time.ge(start))
                        .filter(D::time.le(end))
                        .order((D::sensor_id.asc(), D::time.asc()))
                        .select(DoorReading::as_select())
                        .load::<DoorReading>(self)?,
                )
            }
            ReadingTable::Motion => {
                use schema::motion_readings::dsl as M;
                into_samples(
                    M::motion_readings
                        .filter(M::sensor_id.eq_any(sensor_ids))
                        .filter(M::time.ge(start))
                        .filter(M::time.le(end))
                        .order((M::sensor_id.asc(), M::time.asc()))
                        .select(MotionReading::as_select())
                        .load::<MotionReading>(self)?,
                )
            }
        };

        debug!(
            "{}: loaded {} sample(s) for {} sensor(s) in [{}, {}]",
            table.table_name(),
            samples.len(),
            sensor_ids.len(),
            start,
            end
        );
        Ok(samples)
    }

    fn load_windows(&mut self, table: ReadingTable, windows: &[SampleWindow]) -> Result<Vec<Sample>, StoreError> {
        if windows.is_empty() {
            return Ok(Vec::new());
        }

        // One OR-ed (sensor_id, time range) predicate per window keeps each sensor on its own index range.
        let samples = match table {
            ReadingTable::Environmental => {
                use schema::environmental_readings::dsl as E;
                let mut q = E::environmental_readings.select(EnvironmentalReading::as_select()).into_boxed();
                for w in windows {
                    q = q.or_filter(E::sensor_id.eq(w.sensor_id.as_str()).and(E::time.between(w.start, w.end)));
                }
                into_samples(q.order((E::sensor_id.asc(), E::time.asc())).load::<EnvironmentalReading>(self)?)
            }
            ReadingTable::AirQuality => {
                use schema::air_quality_readings::dsl as A;
                let mut q = A::air_quality_readings.select(AirQualityReading::as_select()).into_boxed();
                for w in windows {
                    q = q.or_filter(A::sensor_id.eq(w.sensor_id.as_str()).and(A::time.between(w.start, w.end)));
                }
                into_samples(q.order((A::sensor_id.asc(), A::time.asc())).load::<AirQualityReading>(self)?)
            }
            ReadingTable::Door => {
                use schema::door_readings::dsl as D;
                let mut q = D::door_readings.select(DoorReading::as_select()).into_boxed();
                for w in windows {
                    q = q.or_filter(D::sensor_id.eq(w.sensor_id.as_str()).and(D::time.between(w.start, w.end)));
                }
                into_samples(q.order((D::sensor_id.asc(), D::time.asc())).load::<DoorReading>(self)?)
            }
            ReadingTable::Motion => {
                use schema::motion_readings::dsl as M;
                let mut q = M::motion_readings.select(MotionReading::as_select()).into_boxed();
                for w in windows {
                    q = q.or_filter(M::sensor_id.eq(w.sensor_id.as_str()).and(M::time.between(w.start, w.end)));
                }
                into_samples(q.order((M::sensor_id.asc(), M::time.asc())).load::<MotionReading>(self)?)
            }
        };

        debug!(
            "{}: loaded {} sample(s) across {} window(s)",
            table.table_name(),
            samples.len(),
            windows.len()
        );
        Ok(samples)
    }

    fn latest_samples(&mut self, table: ReadingTable, sensor_ids: &[String]) -> Result<Vec<Sample>, StoreError> {
        if sensor_ids.is_empty() {
            return Ok(Vec::new());
        }

        // DISTINCT ON keeps the first row per sensor under the (sensor_id, time DESC) ordering.
        let samples = match table {
            ReadingTable::Environmental => {
                use schema::environmental_readings::dsl as E;
                into_samples(
                    E::environmental_readings
                        .filter(E::sensor_id.eq_any(sensor_ids))
                        .distinct_on(E::sensor_id)
                        .order((E::sensor_id.asc(), E::time.desc()))
                        .select(EnvironmentalReading::as_select())
                        .load::<EnvironmentalReading>(self)?,
                )
            }
            ReadingTable::AirQuality => {
                use schema::air_quality_readings::dsl as A;
                into_samples(
                    A::air_quality_readings
                        .filter(A::sensor_id.eq_any(sensor_ids))
                        .distinct_on(A::sensor_id)
                        .order((A::sensor_id.asc(), A::time.desc()))
                        .select(AirQualityReading::as_select())
                        .load::<AirQualityReading>(self)?,
                )
            }
            ReadingTable::Door => {
                use schema::door_readings::dsl as D;
                into_samples(
                    D::door_readings
                        .filter(D::sensor_id.eq_any(sensor_ids))
                        .distinct_on(D::sensor_id)
                        .order((D::sensor_id.asc(), D::time.desc()))
                        .select(DoorReading::as_select())
                        .load::<DoorReading>(self)?,
                )
            }
            ReadingTable::Motion => {
                use schema::motion_readings::dsl as M;
                into_samples(
                    M::motion_readings
                        .filter(M::sensor_id.eq_any(sensor_ids))
                        .distinct_on(M::sensor_id)
                        .order((M::sensor_id.asc(), M::time.desc()))
                        .select(MotionReading::as_select())
                        .load::<MotionReading>(self)?,
                )
            }
        };

        debug!(
            "{}: latest sample for {}/{} sensor(s)",
            table.table_name(),
            samples.len(),
            sensor_ids.len()
        );
        Ok(samples)
    }
}
