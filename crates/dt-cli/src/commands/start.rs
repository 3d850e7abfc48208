//! Start command for recording item entry.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;

use crate::Config;
use crate::cli::{ItemArgs, SessionArgs};
use crate::commands::util::{format_timestamp, open_timer, parse_timestamp, persist};

#[derive(Debug, Args)]
pub struct StartArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    #[command(flatten)]
    pub item: ItemArgs,

    /// When the candidate entered the item.
    #[arg(long, default_value = "now")]
    pub at: String,

    /// Extra time granted to the candidate, in seconds.
    #[arg(long)]
    pub extra_time: Option<f64>,

    /// Time multiplier granted to the candidate (e.g., 1.5).
    #[arg(long)]
    pub extended_time: Option<f64>,
}

pub fn run<W: Write>(writer: &mut W, args: &StartArgs, config: &Config) -> Result<()> {
    let timestamp = parse_timestamp(&args.at)?;
    let item = args.item.item_ref();

    let (_lock, mut timer) = open_timer(config, &args.session)?;
    if let Some(extra_time) = args.extra_time {
        timer
            .set_extra_time(extra_time)
            .context("invalid extra time")?;
    }
    if let Some(extended_time) = args.extended_time {
        timer
            .set_extended_time(extended_time)
            .context("invalid extended time")?;
    }
    timer
        .start(&item, timestamp)
        .with_context(|| format!("failed to start {item}"))?;
    persist(&mut timer)?;

    writeln!(writer, "Started {item} at {}", format_timestamp(timestamp))?;
    Ok(())
}
