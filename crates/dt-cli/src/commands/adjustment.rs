//! Increase and decrease commands for proctor time adjustments.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use dt_core::{RunnerSession, TestSession, TimerAdjustmentService};

use crate::Config;
use crate::cli::{PositionArgs, SessionArgs};
use crate::commands::util::{RequestLock, open_timer, parse_timestamp};

#[derive(Debug, Args)]
pub struct AdjustmentArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    #[command(flatten)]
    pub position: PositionArgs,

    /// Seconds to add or remove.
    pub seconds: u64,

    /// Only adjust this component instead of every limited scope.
    #[arg(long)]
    pub source: Option<String>,

    /// Reference time for open ranges.
    #[arg(long, default_value = "now")]
    pub at: String,
}

fn open_session(args: &AdjustmentArgs, config: &Config) -> Result<(RequestLock, RunnerSession)> {
    let at = parse_timestamp(&args.at)?;
    let position = args.position.position()?;
    let (lock, timer) = open_timer(config, &args.session)?;
    let session = RunnerSession::new(timer, config.constraint_settings())
        .with_position(position)
        .at(at);
    Ok((lock, session))
}

fn report<W: Write>(writer: &mut W, session: &RunnerSession) -> Result<()> {
    let Some(position) = session.route_position() else {
        return Ok(());
    };
    let adjustments = session.timer().adjustments();
    for component in position.components() {
        if let Some(entry) = adjustments.entry(component.identifier.as_str()) {
            writeln!(
                writer,
                "  {}: {:+}s (+{}s / -{}s)",
                component.identifier,
                entry.net(),
                entry.increase,
                entry.decrease
            )?;
        }
    }
    Ok(())
}

pub fn increase<W: Write>(writer: &mut W, args: &AdjustmentArgs, config: &Config) -> Result<()> {
    let (_lock, mut session) = open_session(args, config)?;
    let applied = TimerAdjustmentService::new()
        .increase(&mut session, args.seconds, args.source.as_deref())
        .context("failed to increase time")?;

    writeln!(writer, "Increased allotted time by {applied}s")?;
    report(writer, &session)
}

pub fn decrease<W: Write>(writer: &mut W, args: &AdjustmentArgs, config: &Config) -> Result<()> {
    let (_lock, mut session) = open_session(args, config)?;
    let applied = TimerAdjustmentService::new()
        .decrease(&mut session, args.seconds, args.source.as_deref())
        .context("failed to decrease time")?;

    if applied < args.seconds {
        writeln!(
            writer,
            "Decreased allotted time by {applied}s (requested {}s)",
            args.seconds
        )?;
    } else {
        writeln!(writer, "Decreased allotted time by {applied}s")?;
    }
    report(writer, &session)
}
