//! Shared utilities for CLI commands.

use std::fs::File;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use dt_core::{CachedTimeStorage, Timer};
use dt_db::{Database, SqliteTimeStorage};
use fs2::FileExt;
use regex::Regex;

use crate::Config;
use crate::cli::SessionArgs;

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s+(second|minute|hour|day|week)s?\s+ago$").unwrap()
});

/// Conservative bounds for relative time parsing (~1000 years in seconds).
const MAX_RELATIVE_SECONDS: i64 = 1000 * 365 * 24 * 60 * 60;

/// Parse a timestamp into seconds since the epoch.
///
/// Supports:
/// - `now`
/// - Seconds: "1736937000.25"
/// - ISO 8601: "2026-01-15T10:30:00Z"
/// - Relative: "90 seconds ago", "2 hours ago", "1 day ago"
pub fn parse_timestamp(s: &str) -> Result<f64> {
    parse_timestamp_at(s, Utc::now())
}

fn parse_timestamp_at(s: &str, now: DateTime<Utc>) -> Result<f64> {
    let s = s.trim();
    if s == "now" {
        return Ok(to_seconds(now));
    }
    if let Ok(seconds) = s.parse::<f64>() {
        if !seconds.is_finite() || seconds < 0.0 {
            anyhow::bail!("Invalid timestamp: {s}. Seconds must be a finite, non-negative number");
        }
        return Ok(seconds);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(to_seconds(dt.with_timezone(&Utc)));
    }

    let Some(caps) = RELATIVE_TIME_RE.captures(s) else {
        anyhow::bail!(
            "Invalid timestamp: {s}. Use seconds, ISO 8601 (e.g., 2026-01-15T10:30:00Z), 'now' or relative (e.g., '90 seconds ago')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;

    let seconds_per_unit = match &caps[2] {
        "second" => 1,
        "minute" => 60,
        "hour" => 60 * 60,
        "day" => 60 * 60 * 24,
        "week" => 60 * 60 * 24 * 7,
        unit => anyhow::bail!("Unknown time unit: {unit}"),
    };

    if n > MAX_RELATIVE_SECONDS / seconds_per_unit {
        anyhow::bail!("Relative time value too large: {n} {}", &caps[2]);
    }

    Ok(to_seconds(now - Duration::seconds(n * seconds_per_unit)))
}

#[expect(
    clippy::cast_precision_loss,
    reason = "microsecond timestamps fit the f64 mantissa for any realistic date"
)]
fn to_seconds(dt: DateTime<Utc>) -> f64 {
    dt.timestamp_micros() as f64 / 1_000_000.0
}

/// Formats epoch seconds as RFC 3339 with millisecond precision.
pub fn format_timestamp(seconds: f64) -> String {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "timestamps are validated finite and non-negative"
    )]
    let micros = (seconds * 1_000_000.0).round() as i64;
    DateTime::from_timestamp_micros(micros).map_or_else(
        || format!("{seconds:.6}"),
        |dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

/// Formats a duration in seconds.
pub fn format_seconds(seconds: f64) -> String {
    format!("{seconds:.3}s")
}

/// Exclusive lock held for the duration of one request.
///
/// Timer requests are load/modify/save sequences; holding this lock keeps
/// concurrent `dt` invocations on the same database from interleaving.
#[derive(Debug)]
pub struct RequestLock {
    _file: File,
}

impl RequestLock {
    pub fn acquire(config: &Config) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create database directory")?;
        }
        let path = config.lock_path();
        let file = File::create(&path)
            .with_context(|| format!("failed to create lock file {}", path.display()))?;
        file.lock_exclusive().context("failed to acquire lock")?;
        tracing::debug!(path = %path.display(), "request lock acquired");
        Ok(Self { _file: file })
    }
}

/// Takes the request lock and loads the session's timer.
pub fn open_timer(config: &Config, session: &SessionArgs) -> Result<(RequestLock, Timer)> {
    let lock = RequestLock::acquire(config)?;
    let key = session.key()?;
    let db = Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;

    let storage = CachedTimeStorage::new(SqliteTimeStorage::new(db, key.clone()));
    let mut timer = Timer::with_storage(Box::new(storage), config.storage_format.build());
    timer
        .load()
        .with_context(|| format!("failed to load timer {key}"))?;
    Ok((lock, timer))
}

/// Saves the timer and writes it through to the database.
pub fn persist(timer: &mut Timer) -> Result<()> {
    timer.save().context("failed to save timer")?;
    timer.flush().context("failed to write timer")?;
    Ok(())
}

#[cfg(test)]
pub mod testing {
    use std::path::Path;

    use crate::Config;
    use crate::cli::{ItemArgs, SessionArgs};

    pub fn config(dir: &Path) -> Config {
        Config {
            database_path: dir.join("dt.db"),
            ..Config::default()
        }
    }

    pub fn session() -> SessionArgs {
        SessionArgs {
            user_id: "candidate-1".to_string(),
            session_id: "delivery-1".to_string(),
        }
    }

    pub fn item(id: &str) -> ItemArgs {
        ItemArgs {
            item: id.to_string(),
            occurrence: 0,
            section: Some("section-1".to_string()),
            test_part: Some("part-1".to_string()),
            test: Some("test-1".to_string()),
            href: None,
        }
    }
}
