//! jAccount Calendar CLI application
//!
//! Logs in to SJTU jAccount, downloads one term's timetable and writes it as
//! an iCalendar file.

use std::process;

use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt};

use jaccount_calendar::cli::{Cli, CycleOutcome, handle_export, load_config};
use jaccount_calendar::config::AppConfig;
use jaccount_calendar::errors::Result;

#[tokio::main]
async fn main() {
    // Initialize program
    let result = run().await;

    // Handle any errors that occurred
    if let Err(e) = result {
        error!(category = e.category(), "{}", e);
        eprintln!("Error: {}", e);
        if e.is_recoverable() {
            eprintln!("This looks transient; running again may help.");
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok(); // Ignore errors if file doesn't exist

    // Parse command line arguments
    let cli = Cli::parse_args();

    let config = load_config(&cli).await?;

    // Initialize logging based on verbosity
    init_logging(&cli, &config);

    info!("jAccount Calendar v{} starting", env!("CARGO_PKG_VERSION"));

    match handle_export(&config).await? {
        CycleOutcome::NoCourses => info!("Nothing to export"),
        CycleOutcome::Written { events } => info!("Export finished with {} events", events),
    }
    Ok(())
}

/// Initialize logging; verbosity flags win over the configured level
fn init_logging(cli: &Cli, config: &AppConfig) {
    let flags_given = cli.global.quiet || cli.global.verbose || cli.global.very_verbose;
    let level = if flags_given {
        cli.log_level().to_string().to_lowercase()
    } else {
        config.logging.level.to_lowercase()
    };

    // Create environment filter
    let filter = match format!("jaccount_calendar={}", level).parse() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::from_default_env()
            .add_directive(LevelFilter::from_level(cli.log_level()).into()),
    };

    // Initialize subscriber
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose) // Show levels only in very verbose mode
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
