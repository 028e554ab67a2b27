//! Command-line argument parsing for Media Fetcher
//!
//! This module defines the CLI structure using clap derive macros: running
//! the HTTP service, probing a single URL and sweeping the download
//! directory by hand.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::AppConfig;

/// Media Fetcher - asynchronous media download service
#[derive(Parser, Debug)]
#[command(
    name = "media_fetcher",
    version,
    about = "Fetch remote media asynchronously with progress polling",
    long_about = "An HTTP service that hands media downloads to an external engine, tracks each
job in its own session, and reclaims produced files after a retention window."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (trace level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - warnings and errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the HTTP service
    Serve(ServeArgs),

    /// Probe a URL and print its metadata
    Info(InfoArgs),

    /// Delete expired artifacts from the download directory
    Sweep(SweepArgs),

    /// Print the effective configuration as TOML
    Config,
}

/// Arguments for the serve command
#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory for produced artifacts
    #[arg(short, long, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// Maximum number of concurrent engine invocations
    #[arg(short = 'j', long)]
    pub max_jobs: Option<usize>,

    /// Skip the metadata probe before accepting a download
    #[arg(long)]
    pub no_probe: bool,

    /// Use the built-in simulated engine instead of yt-dlp
    #[arg(long)]
    pub simulate: bool,
}

impl ServeArgs {
    /// Apply command line overrides on top of loaded configuration
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = &self.download_dir {
            config.artifacts.download_dir = dir.clone();
        }
        if let Some(max_jobs) = self.max_jobs {
            config.jobs.max_concurrent = max_jobs;
        }
        if self.no_probe {
            config.engine.probe_before_download = false;
        }
    }
}

/// Arguments for the info command
#[derive(Args, Debug, Clone)]
pub struct InfoArgs {
    /// Media URL to probe
    pub url: String,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Use the built-in simulated engine instead of yt-dlp
    #[arg(long)]
    pub simulate: bool,
}

/// Arguments for the sweep command
#[derive(Args, Debug, Clone, Default)]
pub struct SweepArgs {
    /// Directory to sweep instead of the configured one
    #[arg(short, long, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Logging level requested by flags, if any
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::WARN)
        } else if self.global.very_verbose {
            Some(tracing::Level::TRACE)
        } else if self.global.verbose {
            Some(tracing::Level::DEBUG)
        } else {
            None
        }
    }
}
