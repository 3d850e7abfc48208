//! Adjust command for reconciling client-measured durations.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use dt_core::Target;

use crate::Config;
use crate::cli::{ItemArgs, SessionArgs};
use crate::commands::util::{format_seconds, open_timer, persist};

#[derive(Debug, Args)]
pub struct AdjustArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    #[command(flatten)]
    pub item: ItemArgs,

    /// Duration of the last visit as measured by the client, in seconds.
    #[arg(long)]
    pub duration: f64,
}

pub fn run<W: Write>(writer: &mut W, args: &AdjustArgs, config: &Config) -> Result<()> {
    let item = args.item.item_ref();

    let (_lock, mut timer) = open_timer(config, &args.session)?;
    timer
        .adjust(&item, args.duration)
        .with_context(|| format!("failed to adjust {item}"))?;
    persist(&mut timer)?;

    let reference = item.reference();
    let tags = [reference.as_str()];
    let last = timer.last_timestamp(&tags, None).unwrap_or_default();
    let client = timer.compute_until(&tags, Some(Target::Client), last)?;
    let server = timer.compute_until(&tags, Some(Target::Server), last)?;
    writeln!(
        writer,
        "Adjusted {item}: client {} of server {}",
        format_seconds(client),
        format_seconds(server)
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    use crate::commands::end::{self, EndArgs};
    use crate::commands::start::{self, StartArgs};
    use crate::commands::util::testing;

    fn visit(config: &Config, from: &str, to: &str) {
        let start = StartArgs {
            session: testing::session(),
            item: testing::item("item-1"),
            at: from.to_string(),
            extra_time: None,
            extended_time: None,
        };
        start::run(&mut Vec::new(), &start, config).unwrap();
        let end = EndArgs {
            session: testing::session(),
            item: testing::item("item-1"),
            at: to.to_string(),
            consumed_extra_time: None,
        };
        end::run(&mut Vec::new(), &end, config).unwrap();
    }

    fn adjust_args(duration: f64) -> AdjustArgs {
        AdjustArgs {
            session: testing::session(),
            item: testing::item("item-1"),
            duration,
        }
    }

    #[test]
    fn adjust_records_client_window() {
        let temp = tempfile::tempdir().unwrap();
        let config = testing::config(temp.path());
        visit(&config, "100", "120");

        let mut output = Vec::new();
        run(&mut output, &adjust_args(10.0), &config).unwrap();
        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @"Adjusted item-1#0: client 10.000s of server 20.000s");
    }

    #[test]
    fn adjust_rejects_longer_client_duration() {
        let temp = tempfile::tempdir().unwrap();
        let config = testing::config(temp.path());
        visit(&config, "100", "120");

        let err = run(&mut Vec::new(), &adjust_args(25.0), &config).unwrap_err();
        assert!(err.to_string().contains("failed to adjust item-1#0"));
    }
}
