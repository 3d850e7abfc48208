//! Compute and timeout commands for reading elapsed time.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use dt_core::{Target, Timer};

use crate::Config;
use crate::cli::SessionArgs;
use crate::commands::util::{format_seconds, open_timer, parse_timestamp};

#[derive(Debug, Args)]
pub struct ComputeArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Only count ranges carrying one of these tags (repeatable).
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Clock to read (client or server). Defaults to the configured target.
    #[arg(long)]
    pub target: Option<Target>,

    /// Close open ranges at this time.
    #[arg(long, default_value = "now")]
    pub at: String,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct TimeoutArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Time limit in seconds.
    #[arg(long)]
    pub limit: f64,

    /// Only count ranges carrying one of these tags (repeatable).
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Clock to read (client or server). Defaults to the configured target.
    #[arg(long)]
    pub target: Option<Target>,

    /// Close open ranges at this time.
    #[arg(long, default_value = "now")]
    pub at: String,
}

fn elapsed(timer: &Timer, tags: &[String], target: Target, at: f64) -> Result<f64> {
    let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
    timer
        .compute_until(&tags, Some(target), at)
        .context("failed to compute elapsed time")
}

pub fn run<W: Write>(writer: &mut W, args: &ComputeArgs, config: &Config) -> Result<()> {
    let at = parse_timestamp(&args.at)?;
    let target = args.target.unwrap_or(config.timer_target);

    let (_lock, timer) = open_timer(config, &args.session)?;
    let seconds = elapsed(&timer, &args.tags, target, at)?;

    if args.json {
        let output = serde_json::json!({
            "tags": args.tags,
            "target": target,
            "seconds": seconds,
        });
        writeln!(writer, "{}", serde_json::to_string_pretty(&output)?)?;
    } else {
        writeln!(writer, "{}", format_seconds(seconds))?;
    }
    Ok(())
}

pub fn timeout<W: Write>(writer: &mut W, args: &TimeoutArgs, config: &Config) -> Result<()> {
    let at = parse_timestamp(&args.at)?;
    let target = args.target.unwrap_or(config.timer_target);

    let (_lock, timer) = open_timer(config, &args.session)?;
    let tags: Vec<&str> = args.tags.iter().map(String::as_str).collect();
    let timed_out = timer
        .timeout_at(args.limit, &tags, Some(target), at)
        .context("failed to compute elapsed time")?;
    let seconds = elapsed(&timer, &args.tags, target, at)?;

    let verdict = if timed_out { "timed out" } else { "within limit" };
    writeln!(
        writer,
        "{verdict}: {} of {}",
        format_seconds(seconds),
        format_seconds(args.limit)
    )?;
    Ok(())
}
