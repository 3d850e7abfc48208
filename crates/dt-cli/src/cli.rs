//! Command-line argument definitions.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dt_core::{ItemRef, NavigationMode, RoutePosition, Scope, ScopedComponent, SessionId, UserId};
use dt_db::TimerKey;

use crate::commands::adjust::AdjustArgs;
use crate::commands::adjustment::AdjustmentArgs;
use crate::commands::compute::{ComputeArgs, TimeoutArgs};
use crate::commands::constraints::ConstraintsArgs;
use crate::commands::end::EndArgs;
use crate::commands::show::ShowArgs;
use crate::commands::start::StartArgs;

/// Delivery timer.
///
/// Records the time candidates spend on test items and reports the time
/// left against item, section, test part and test limits.
#[derive(Debug, Parser)]
#[command(name = "dt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Record the candidate entering an item.
    Start(StartArgs),

    /// Record the candidate leaving an item.
    End(EndArgs),

    /// Reconcile the client-measured duration of the last item visit.
    Adjust(AdjustArgs),

    /// Show the time spent on tagged ranges.
    Compute(ComputeArgs),

    /// Check whether the time spent reached a limit.
    Timeout(TimeoutArgs),

    /// Show the time constraints of the current position.
    Constraints(ConstraintsArgs),

    /// Grant the candidate more time.
    Increase(AdjustmentArgs),

    /// Take time back from the candidate.
    Decrease(AdjustmentArgs),

    /// Dump a stored timer.
    Show(ShowArgs),

    /// List stored timers.
    Status,

    /// Delete a stored timer.
    Delete(SessionArgs),
}

/// Identifies the timer to work on.
#[derive(Debug, Clone, Args)]
pub struct SessionArgs {
    /// Test-taker identifier.
    #[arg(long = "user")]
    pub user_id: String,

    /// Test session identifier.
    #[arg(long = "session")]
    pub session_id: String,
}

impl SessionArgs {
    pub fn key(&self) -> Result<TimerKey> {
        Ok(TimerKey::new(
            UserId::new(self.user_id.as_str()).context("invalid user")?,
            SessionId::new(self.session_id.as_str()).context("invalid session")?,
        ))
    }
}

/// Identifies an item occurrence.
#[derive(Debug, Clone, Args)]
pub struct ItemArgs {
    /// Item identifier.
    #[arg(long)]
    pub item: String,

    /// Occurrence of the item within the test.
    #[arg(long, default_value_t = 0)]
    pub occurrence: u32,

    /// Enclosing section identifier.
    #[arg(long)]
    pub section: Option<String>,

    /// Enclosing test part identifier.
    #[arg(long = "part")]
    pub test_part: Option<String>,

    /// Test identifier.
    #[arg(long)]
    pub test: Option<String>,

    /// Item href.
    #[arg(long)]
    pub href: Option<String>,
}

impl ItemArgs {
    pub fn item_ref(&self) -> ItemRef {
        let mut item = ItemRef::new(self.item.as_str(), self.occurrence);
        item.section_id.clone_from(&self.section);
        item.test_part_id.clone_from(&self.test_part);
        item.test_id.clone_from(&self.test);
        item.href.clone_from(&self.href);
        item
    }
}

/// The current position and the time limits declared along it.
#[derive(Debug, Clone, Args)]
pub struct PositionArgs {
    /// Current item identifier.
    #[arg(long)]
    pub item: String,

    /// Occurrence of the item within the test.
    #[arg(long, default_value_t = 0)]
    pub occurrence: u32,

    /// Min time of the item, in seconds.
    #[arg(long)]
    pub item_min: Option<f64>,

    /// Max time of the item, in seconds.
    #[arg(long)]
    pub item_max: Option<f64>,

    /// Current section identifier.
    #[arg(long)]
    pub section: String,

    /// Min time of the section, in seconds.
    #[arg(long)]
    pub section_min: Option<f64>,

    /// Max time of the section, in seconds.
    #[arg(long)]
    pub section_max: Option<f64>,

    /// Current test part identifier.
    #[arg(long = "part")]
    pub test_part: String,

    /// Min time of the test part, in seconds.
    #[arg(long)]
    pub part_min: Option<f64>,

    /// Max time of the test part, in seconds.
    #[arg(long)]
    pub part_max: Option<f64>,

    /// Test identifier.
    #[arg(long)]
    pub test: String,

    /// Min time of the test, in seconds.
    #[arg(long)]
    pub test_min: Option<f64>,

    /// Max time of the test, in seconds.
    #[arg(long)]
    pub test_max: Option<f64>,

    /// Navigation mode of the test part (linear or nonlinear).
    #[arg(long, default_value_t = NavigationMode::Linear)]
    pub navigation: NavigationMode,
}

fn component(
    scope: Scope,
    identifier: &str,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<ScopedComponent> {
    let mut component = ScopedComponent::new(scope, identifier)
        .with_context(|| format!("invalid {scope} identifier"))?;
    if let Some(min) = min {
        component = component
            .with_min_time(min)
            .with_context(|| format!("invalid min time for {identifier}"))?;
    }
    if let Some(max) = max {
        component = component
            .with_max_time(max)
            .with_context(|| format!("invalid max time for {identifier}"))?;
    }
    Ok(component)
}

impl PositionArgs {
    pub fn position(&self) -> Result<RoutePosition> {
        Ok(RoutePosition::new(
            component(Scope::Item, &self.item, self.item_min, self.item_max)?,
            self.occurrence,
            component(
                Scope::Section,
                &self.section,
                self.section_min,
                self.section_max,
            )?,
            component(
                Scope::TestPart,
                &self.test_part,
                self.part_min,
                self.part_max,
            )?,
            component(Scope::Test, &self.test, self.test_min, self.test_max)?,
            self.navigation,
        ))
    }
}
