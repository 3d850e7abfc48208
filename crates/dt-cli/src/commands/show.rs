//! Show command for dumping a stored timer.

use std::io::Write;

use anyhow::Result;
use clap::Args;

use crate::Config;
use crate::cli::SessionArgs;
use crate::commands::util::{format_seconds, open_timer};

#[derive(Debug, Args)]
pub struct ShowArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Output the stored snapshot as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &ShowArgs, config: &Config) -> Result<()> {
    let (_lock, timer) = open_timer(config, &args.session)?;

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&timer.snapshot())?)?;
        return Ok(());
    }

    writeln!(
        writer,
        "Timer {}/{}",
        args.session.user_id, args.session.session_id
    )?;
    writeln!(
        writer,
        "Extra time: {} (extended x{}, {} consumed)",
        format_seconds(timer.extra_time()),
        timer.extended_time(),
        format_seconds(timer.consumed_extra_time())
    )?;

    if timer.time_line().is_empty() {
        writeln!(writer, "No points recorded.")?;
    } else {
        writeln!(writer, "Points:")?;
        for point in timer.time_line() {
            writeln!(writer, "  {point}")?;
        }
    }

    if !timer.adjustments().is_empty() {
        writeln!(writer, "Adjustments:")?;
        for (source, adjustment) in timer.adjustments().iter() {
            writeln!(writer, "  {source}: {:+}s", adjustment.net())?;
        }
    }
    Ok(())
}
