//! End command for recording item exit.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use dt_core::Target;

use crate::Config;
use crate::cli::{ItemArgs, SessionArgs};
use crate::commands::util::{
    format_seconds, format_timestamp, open_timer, parse_timestamp, persist,
};

#[derive(Debug, Args)]
pub struct EndArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    #[command(flatten)]
    pub item: ItemArgs,

    /// When the candidate left the item.
    #[arg(long, default_value = "now")]
    pub at: String,

    /// Extra time the client reports as consumed so far, in seconds.
    #[arg(long)]
    pub consumed_extra_time: Option<f64>,
}

pub fn run<W: Write>(writer: &mut W, args: &EndArgs, config: &Config) -> Result<()> {
    let timestamp = parse_timestamp(&args.at)?;
    let item = args.item.item_ref();

    let (_lock, mut timer) = open_timer(config, &args.session)?;
    timer
        .end(&item, timestamp, args.consumed_extra_time)
        .with_context(|| format!("failed to end {item}"))?;
    persist(&mut timer)?;

    let reference = item.reference();
    let spent = timer.compute_until(&[reference.as_str()], Some(Target::Server), timestamp)?;
    writeln!(writer, "Ended {item} at {}", format_timestamp(timestamp))?;
    writeln!(writer, "Time on {item}: {}", format_seconds(spent))?;
    Ok(())
}
