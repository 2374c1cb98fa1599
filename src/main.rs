use chrono::{DateTime, TimeDelta, Utc};
use clap::{Args, Parser, Subcommand};
use diesel::PgConnection;
use diesel::prelude::*;
use facility_telemetry::apply_database_migrations;
use facility_telemetry::config::Config;
use facility_telemetry::models::facility::{DoorEvent, Interval, PresenceEvent};
use facility_telemetry::services::events::{self, EventScope};
use facility_telemetry::services::{baseline, readings, seed, summary};
use facility_telemetry::utils::{format_duration, parse_timestamp};
use log::{error, info};
use serde::Serialize;
use std::path::PathBuf;

const MAX_EVENT_LIMIT: usize = 1_000;

#[derive(Debug, Parser)]
#[command(name = "facility-telemetry", version)]
#[command(about = "Derived telemetry for facility sensors: events, baselines and dashboard summaries", long_about = None)]
struct Cli {
    /// Load environment from this file instead of ./.env (process environment wins)
    #[arg(long, global = true, value_name = "PATH")]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending database migrations and exit
    Migrate,
    /// Write the demo facility and its reading history
    Seed {
        /// Delete existing readings first
        #[arg(long)]
        reset: bool,
    },
    /// Summaries of every sensor with data
    Sensors,
    /// Summary of one sensor
    Sensor { id: String },
    /// Summaries of the sensors in a zone, optionally of one type
    Zone { zone_id: String, sensor_type: Option<String> },
    /// Raw or bucketed readings of one sensor
    Readings {
        id: String,
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long, default_value = "raw")]
        interval: Interval,
    },
    /// Door-open events
    Doors(EventArgs),
    /// Presence windows from motion sensors
    Presence {
        #[command(flatten)]
        events: EventArgs,
        /// Drop windows shorter than this many seconds
        #[arg(long, default_value_t = 0)]
        min_duration: i64,
    },
    /// Statistics over the trailing hours
    Baseline {
        id: String,
        #[arg(long, default_value_t = baseline::DEFAULT_BASELINE_HOURS)]
        hours: i64,
    },
    /// Per hour-of-day statistics over the trailing days
    HourlyBaseline {
        id: String,
        #[arg(long, default_value_t = baseline::DEFAULT_BASELINE_DAYS)]
        days: i64,
    },
}

#[derive(Debug, Args)]
struct RangeArgs {
    /// Start of the window (ISO-8601; defaults to end minus DEFAULT_WINDOW_HOURS)
    #[arg(long, value_parser = parse_timestamp)]
    start: Option<DateTime<Utc>>,
    /// End of the window (ISO-8601; defaults to now)
    #[arg(long, value_parser = parse_timestamp)]
    end: Option<DateTime<Utc>>,
}

#[derive(Debug, Args)]
struct EventArgs {
    #[arg(long)]
    sensor: Option<String>,
    #[arg(long)]
    zone: Option<String>,
    #[command(flatten)]
    range: RangeArgs,
    /// Maximum events printed (defaults to EVENT_LIMIT)
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DoorEventsResponse {
    events: Vec<DoorEvent>,
    total_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PresenceEventsResponse {
    events: Vec<PresenceEvent>,
    total_count: usize,
    safety_concerns_count: usize,
}

/// Fill in default bounds and validate them.
fn resolve_range(
    range: &RangeArgs,
    now: DateTime<Utc>,
    default_hours: i64,
    max_days: i64,
) -> Result<(DateTime<Utc>, DateTime<Utc>), String> {
    let end = range.end.unwrap_or(now);
    let start = range.start.unwrap_or(end - TimeDelta::hours(default_hours));
    if start >= end {
        return Err("start must be before end".to_string());
    }
    if end - start > TimeDelta::days(max_days) {
        return Err(format!("Time range cannot exceed {} days", max_days));
    }
    Ok((start, end))
}

fn resolve_limit(limit: Option<usize>, default: usize) -> Result<usize, String> {
    match limit.unwrap_or(default) {
        n if (1..=MAX_EVENT_LIMIT).contains(&n) => Ok(n),
        n => Err(format!("limit must be between 1 and {} (got {})", MAX_EVENT_LIMIT, n)),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let out = serde_json::to_string_pretty(value).map_err(|e| format!("serialize output failed: {}", e))?;
    println!("{}", out);
    Ok(())
}

fn run(command: Command) -> Result<(), String> {
    // 1) Load config
    let cfg = Config::from_env()?;
    info!(
        "Config loaded (default_window={}h, max_readings={}d, max_events={}d, max_baseline={}h, event_limit={})",
        cfg.default_window_hours, cfg.max_readings_days, cfg.max_events_days, cfg.max_baseline_hours, cfg.event_limit
    );

    // 2) Connect DB
    let mut conn = PgConnection::establish(&cfg.database_url).map_err(|e| format!("DB connection failed: {}", e))?;
    info!("Connected to database");

    // 3) Apply pending database migrations
    apply_database_migrations(&mut conn)?;

    let now = Utc::now();
    match command {
        Command::Migrate => Ok(()),
        Command::Seed { reset } => {
            let inserted = seed::run(&mut conn, &cfg, now, reset)?;
            info!("Seeded {} reading(s)", inserted);
            Ok(())
        }
        Command::Sensors => print_json(&summary::all_sensors(&mut conn)?),
        Command::Sensor { id } => match summary::sensor(&mut conn, &id)? {
            Some(s) => print_json(&s),
            None => Err(format!("Sensor not found or has no readings: {}", id)),
        },
        Command::Zone { zone_id, sensor_type } => {
            print_json(&summary::sensors_in_zone(&mut conn, &zone_id, sensor_type.as_deref())?)
        }
        Command::Readings { id, range, interval } => {
            let (start, end) = resolve_range(&range, now, cfg.default_window_hours, cfg.max_readings_days)?;
            match readings::get_readings(&mut conn, &id, start, end, interval)? {
                Some(series) => print_json(&series),
                None => Err(format!("Sensor not found: {}", id)),
            }
        }
        Command::Doors(args) => {
            let (start, end) = resolve_range(&args.range, now, cfg.default_window_hours, cfg.max_events_days)?;
            let limit = resolve_limit(args.limit, cfg.event_limit)?;
            let scope = EventScope::from_filters(args.sensor.as_deref(), args.zone.as_deref());
            let mut all = events::door_events(&mut conn, start, end, scope)?;
            let total_count = all.len();
            all.truncate(limit);
            print_json(&DoorEventsResponse {
                events: all,
                total_count,
            })
        }
        Command::Presence { events: args, min_duration } => {
            if min_duration < 0 {
                return Err("min-duration must not be negative".to_string());
            }
            let (start, end) = resolve_range(&args.range, now, cfg.default_window_hours, cfg.max_events_days)?;
            let limit = resolve_limit(args.limit, cfg.event_limit)?;
            let scope = EventScope::from_filters(args.sensor.as_deref(), args.zone.as_deref());
            let mut all = events::presence_events(&mut conn, start, end, scope, min_duration)?;
            let total_count = all.len();
            let safety_concerns_count = events::safety_concern_count(&all);
            if let Some(longest) = all.iter().map(|e| e.duration_seconds).max() {
                info!(
                    "{} presence window(s), {} safety concern(s), longest {}",
                    total_count,
                    safety_concerns_count,
                    format_duration(longest)
                );
            }
            all.truncate(limit);
            print_json(&PresenceEventsResponse {
                events: all,
                total_count,
                safety_concerns_count,
            })
        }
        Command::Baseline { id, hours } => {
            if !(1..=cfg.max_baseline_hours).contains(&hours) {
                return Err(format!("hours must be between 1 and {}", cfg.max_baseline_hours));
            }
            match baseline::baseline(&mut conn, &id, hours, now)? {
                Some(b) => print_json(&b),
                None => Err(format!("Sensor not found or no data: {}", id)),
            }
        }
        Command::HourlyBaseline { id, days } => {
            if !(1..=cfg.max_readings_days).contains(&days) {
                return Err(format!("days must be between 1 and {}", cfg.max_readings_days));
            }
            let hourly = baseline::hourly_baselines(&mut conn, &id, days, now)?;
            if hourly.is_empty() {
                return Err(format!("Sensor not found: {}", id));
            }
            print_json(&hourly)
        }
    }
}

#[derive(Debug)]
struct LoadedEnvFile {
    path: PathBuf,
    explicit: bool,
}

fn load_env(explicit: Option<PathBuf>) -> Result<Option<LoadedEnvFile>, String> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(format!("env file not found: {}", path.display()));
        }
        dotenvy::from_path(&path).map_err(|e| format!("failed to load {}: {}", path.display(), e))?;
        return Ok(Some(LoadedEnvFile { path, explicit: true }));
    }

    let cwd = std::env::current_dir().map_err(|e| format!("unable to read current directory: {}", e))?;
    let default_path = cwd.join(".env");
    if default_path.is_file() {
        dotenvy::from_path(&default_path).map_err(|e| format!("failed to load {}: {}", default_path.display(), e))?;
        Ok(Some(LoadedEnvFile {
            path: default_path,
            explicit: false,
        }))
    } else {
        Ok(None)
    }
}

fn main() {
    let cli = Cli::parse();
    let loaded_env = match load_env(cli.env_file) {
        Ok(info) => info,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    // Init logging after environment so RUST_LOG from .env is respected.
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(info) = loaded_env.as_ref() {
        let origin = if info.explicit { "CLI-specified" } else { "default" };
        info!("Environment loaded from {} .env file: {}", origin, info.path.display());
    }

    info!(
        "facility-telemetry {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    if let Err(e) = run(cli.command) {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 29, 12, 0, 0).unwrap()
    }

    #[test]
    fn range_defaults_to_trailing_window() {
        let range = RangeArgs { start: None, end: None };
        let (start, end) = resolve_range(&range, now(), 24, 7).unwrap();
        assert_eq!(end, now());
        assert_eq!(start, now() - TimeDelta::hours(24));
    }

    #[test]
    fn range_rejects_inverted_and_oversized_windows() {
        let inverted = RangeArgs {
            start: Some(now()),
            end: Some(now() - TimeDelta::hours(1)),
        };
        assert_eq!(resolve_range(&inverted, now(), 24, 7).unwrap_err(), "start must be before end");

        let empty = RangeArgs {
            start: Some(now()),
            end: Some(now()),
        };
        assert!(resolve_range(&empty, now(), 24, 7).is_err());

        let wide = RangeArgs {
            start: Some(now() - TimeDelta::days(8)),
            end: None,
        };
        assert_eq!(
            resolve_range(&wide, now(), 24, 7).unwrap_err(),
            "Time range cannot exceed 7 days"
        );
        let exactly = RangeArgs {
            start: Some(now() - TimeDelta::days(7)),
            end: None,
        };
        assert!(resolve_range(&exactly, now(), 24, 7).is_ok());
    }

    #[test]
    fn limit_bounds() {
        assert_eq!(resolve_limit(None, 100).unwrap(), 100);
        assert_eq!(resolve_limit(Some(1_000), 100).unwrap(), 1_000);
        assert!(resolve_limit(Some(0), 100).is_err());
        assert!(resolve_limit(Some(1_001), 100).is_err());
    }

    #[test]
    fn cli_parses_event_filters_and_timestamps() {
        let cli = Cli::try_parse_from([
            "facility-telemetry",
            "presence",
            "--zone",
            "cold-b",
            "--start",
            "2026-01-29T08:00:00Z",
            "--min-duration",
            "600",
        ])
        .unwrap();
        match cli.command {
            Command::Presence { events, min_duration } => {
                assert_eq!(events.zone.as_deref(), Some("cold-b"));
                assert_eq!(events.sensor, None);
                assert_eq!(events.range.start, Some(Utc.with_ymd_and_hms(2026, 1, 29, 8, 0, 0).unwrap()));
                assert_eq!(min_duration, 600);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn cli_parses_interval_and_rejects_bad_values() {
        let cli = Cli::try_parse_from(["facility-telemetry", "readings", "cold-b-temp", "--interval", "hourly"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Readings {
                interval: Interval::Hourly,
                ..
            }
        ));
        assert!(Cli::try_parse_from(["facility-telemetry", "readings", "x", "--interval", "5m"]).is_err());
        assert!(Cli::try_parse_from(["facility-telemetry", "doors", "--start", "yesterday"]).is_err());
    }
}
