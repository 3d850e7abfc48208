//! Delete command for removing a stored timer.

use std::io::Write;

use anyhow::{Context, Result};

use crate::Config;
use crate::cli::SessionArgs;
use crate::commands::util::open_timer;

pub fn run<W: Write>(writer: &mut W, args: &SessionArgs, config: &Config) -> Result<()> {
    let (_lock, mut timer) = open_timer(config, args)?;
    let key = args.key()?;
    let deleted = timer
        .delete()
        .with_context(|| format!("failed to delete timer {key}"))?;

    if deleted {
        writeln!(writer, "Deleted timer {key}")?;
    } else {
        writeln!(writer, "No timer stored for {key}")?;
    }
    Ok(())
}
