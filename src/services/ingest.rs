use crate::db::models::{NewAirQualityReading, NewDoorReading, NewEnvironmentalReading, NewMotionReading};
use crate::schema;
use diesel::PgConnection;
use diesel::prelude::*;

// Keeps each statement well below the Postgres bind parameter limit.
const INSERT_CHUNK_ROWS: usize = 5_000;

pub fn insert_environmental_readings(
    conn: &mut PgConnection,
    rows: &[NewEnvironmentalReading],
) -> Result<usize, String> {
    use schema::environmental_readings::dsl as E;

    let mut inserted = 0;
    for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
        inserted += diesel::insert_into(E::environmental_readings)
            .values(chunk)
            .on_conflict((E::sensor_id, E::time))
            .do_nothing()
            .execute(conn)
            .map_err(|e| format!("insert environmental rows failed: {}", e))?;
    }
    Ok(inserted)
}

pub fn insert_air_quality_readings(conn: &mut PgConnection, rows: &[NewAirQualityReading]) -> Result<usize, String> {
    use schema::air_quality_readings::dsl as A;

    let mut inserted = 0;
    for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
        inserted += diesel::insert_into(A::air_quality_readings)
            .values(chunk)
            .on_conflict((A::sensor_id, A::time))
            .do_nothing()
            .execute(conn)
            .map_err(|e| format!("insert air quality rows failed: {}", e))?;
    }
    Ok(inserted)
}

pub fn insert_door_readings(conn: &mut PgConnection, rows: &[NewDoorReading]) -> Result<usize, String> {
    use schema::door_readings::dsl as D;

    let mut inserted = 0;
    for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
        inserted += diesel::insert_into(D::door_readings)
            .values(chunk)
            .on_conflict((D::sensor_id, D::time))
            .do_nothing()
            .execute(conn)
            .map_err(|e| format!("insert door rows failed: {}", e))?;
    }
    Ok(inserted)
}

pub fn insert_motion_readings(conn: &mut PgConnection, rows: &[NewMotionReading]) -> Result<usize, String> {
    use schema::motion_readings::dsl as M;

    let mut inserted = 0;
    for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
        inserted += diesel::insert_into(M::motion_readings)
            .values(chunk)
            .on_conflict((M::sensor_id, M::time))
            .do_nothing()
            .execute(conn)
            .map_err(|e| format!("insert motion rows failed: {}", e))?;
    }
    Ok(inserted)
}
