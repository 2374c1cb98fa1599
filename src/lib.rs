//! Derivation layer over interval-sampled facility sensor readings.
//!
//! Raw readings live in four per-type time-series tables. Everything in this
//! crate is a read-only recomputation over a time window: bucketed reading
//! series, door-open and presence events, statistical baselines and batched
//! dashboard summaries.

pub mod models {
    pub mod facility;
}

pub mod config;
pub mod db {
    pub mod models;
    pub mod store;
}
pub mod registry;
pub mod schema;
pub mod stats;
pub mod store;
pub mod utils;
pub mod services {
    pub mod baseline;
    pub mod events;
    pub mod ingest;
    pub mod readings;
    pub mod seed;
    pub mod summary;
}

#[cfg(test)]
pub(crate) mod testing;

use diesel::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use log::info;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub fn apply_database_migrations(conn: &mut PgConnection) -> Result<(), String> {
    match conn.run_pending_migrations(MIGRATIONS) {
        Ok(applied) => {
            if applied.is_empty() {
                info!("Database schema is up to date; no migrations were applied");
            } else {
                let names = applied.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
                info!("Applied {} database migration(s): {}", applied.len(), names);
            }
            Ok(())
        }
        Err(e) => Err(format!("Applying database migrations failed: {}", e)),
    }
}
