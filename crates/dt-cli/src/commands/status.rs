//! Status command for listing stored timers.

use std::io::Write;

use anyhow::{Context, Result};

use dt_db::Database;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let db = Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    let timers = db.list_timers()?;

    writeln!(writer, "Delivery timer status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    writeln!(writer, "Storage format: {}", config.storage_format)?;

    if timers.is_empty() {
        writeln!(writer, "No timers stored.")?;
        return Ok(());
    }

    writeln!(writer, "Timers:")?;
    for timer in timers {
        writeln!(
            writer,
            "- {}/{}: {} bytes, updated {}",
            timer.user_id, timer.session_id, timer.size, timer.updated_at
        )?;
    }

    Ok(())
}
