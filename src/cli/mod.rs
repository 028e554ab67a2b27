//! Command-line interface components
//!
//! This module contains CLI-specific code for the Media Fetcher application,
//! including argument parsing, startup checks and command handlers.

pub mod args;
pub mod commands;
pub mod startup;

pub use args::{Cli, Commands, GlobalArgs, InfoArgs, ServeArgs, SweepArgs};
pub use commands::{handle_config, handle_info, handle_serve, handle_sweep};
pub use startup::{build_engine, StartupStatus};
