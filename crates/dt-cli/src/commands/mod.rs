//! CLI subcommand implementations.

pub mod adjust;
pub mod adjustment;
pub mod compute;
pub mod constraints;
pub mod delete;
pub mod end;
pub mod show;
pub mod start;
pub mod status;
pub mod util;
