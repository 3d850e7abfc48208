//! Delivery timer CLI library.
//!
//! Each `dt` invocation stands in for one test runner request: it takes the
//! request lock, loads the session's timer, performs one action and saves.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, ItemArgs, PositionArgs, SessionArgs};
pub use config::Config;
