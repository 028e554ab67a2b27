//! Media Fetcher CLI application
//!
//! Runs the media fetch HTTP service and a few maintenance commands.

use std::process;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use media_fetcher::cli::{handle_config, handle_info, handle_serve, handle_sweep, Cli, Commands};
use media_fetcher::config::AppConfig;
use media_fetcher::constants::logging;
use media_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    let config = AppConfig::load(cli.global.config.clone()).await?;

    init_logging(&cli, &config);

    info!("Media Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Serve(args) => {
            info!("Executing serve command");
            handle_serve(args, config).await
        }
        Commands::Info(args) => handle_info(args, config).await,
        Commands::Sweep(args) => handle_sweep(args, config).await,
        Commands::Config => handle_config(&config),
    }
}

/// Initialize logging from CLI verbosity, falling back to the configured level
fn init_logging(cli: &Cli, config: &AppConfig) {
    let level = cli
        .log_level()
        .map(|level| level.to_string().to_lowercase())
        .unwrap_or_else(|| config.logging.level.clone());

    let mut filter = EnvFilter::from_default_env();
    match format!("{}={}", logging::CRATE_TARGET, level).parse() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(e) => eprintln!("Ignoring invalid log level '{}': {}", level, e),
    }

    fmt()
        .with_env_filter(filter)
        .with_target(cli.global.very_verbose)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
