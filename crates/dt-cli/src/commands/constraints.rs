//! Constraints command for reporting remaining time.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use dt_core::{ClientTimeConstraint, RunnerSession, TestSession, TimeConstraint};

use crate::Config;
use crate::cli::{PositionArgs, SessionArgs};
use crate::commands::util::{format_seconds, open_timer, parse_timestamp};

#[derive(Debug, Args)]
pub struct ConstraintsArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    #[command(flatten)]
    pub position: PositionArgs,

    /// Reference time for open ranges.
    #[arg(long, default_value = "now")]
    pub at: String,

    /// Output the client representation as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &ConstraintsArgs, config: &Config) -> Result<()> {
    let at = parse_timestamp(&args.at)?;
    let position = args.position.position()?;

    let (_lock, timer) = open_timer(config, &args.session)?;
    let session = RunnerSession::new(timer, config.constraint_settings())
        .with_position(position)
        .at(at);
    let constraints = session
        .time_constraints()
        .context("failed to compute time constraints")?;

    if args.json {
        let client: Vec<ClientTimeConstraint> = constraints
            .iter()
            .filter_map(TimeConstraint::to_client)
            .collect();
        writeln!(writer, "{}", serde_json::to_string_pretty(&client)?)?;
        return Ok(());
    }

    let mut any = false;
    for constraint in &constraints {
        if let Some(line) = describe(constraint) {
            writeln!(writer, "{line}")?;
            any = true;
        }
    }
    if !any {
        writeln!(writer, "No time limits on the current position.")?;
    }
    Ok(())
}

/// One line per limited component, `None` without limits.
fn describe(constraint: &TimeConstraint<'_>) -> Option<String> {
    let source = constraint.source();
    let limits = source.time_limits()?;
    if !limits.has_min_time() && !limits.has_max_time() {
        return None;
    }

    let mut line = format!("{} {}:", source.qti_class_name(), source.identifier());
    if let (Some(max), Some(remaining)) = (
        source.max_time(),
        constraint.adjusted_maximum_remaining_time(),
    ) {
        let _ = write!(
            line,
            " {} left of {}",
            format_seconds(remaining),
            format_seconds(max)
        );
        let adjustment = constraint.adjustment();
        if adjustment != 0 {
            let _ = write!(line, " (adjusted {adjustment:+}s)");
        }
        let extra = constraint.total_extra_time();
        if extra > 0.0 {
            let _ = write!(
                line,
                " (extra {}, {} used)",
                format_seconds(extra),
                format_seconds(constraint.consumed_extra_time())
            );
        }
        if constraint.timed_out() {
            line.push_str(" TIMED OUT");
        }
    }
    if let (Some(min), Some(remaining)) = (source.min_time(), constraint.minimum_remaining_time()) {
        let _ = write!(
            line,
            " min {} ({} to go)",
            format_seconds(min),
            format_seconds(remaining)
        );
    }
    Some(line)
}
