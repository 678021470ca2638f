//! Command implementations for the CLI
//!
//! One run is one cycle: log in, fetch the term's courses, write the calendar.

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::app::courses::fetch_courses_from;
use crate::app::{
    CalendarWriter, Course, CourseListing, LoginOrchestrator, PortalClient, WebSocketChannel,
};
use crate::cli::args::Cli;
use crate::cli::prompt::TerminalPrompter;
use crate::cli::signals::SignalHandler;
use crate::config::AppConfig;
use crate::errors::Result;

/// How a successful cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The service has no courses for the term; nothing was written
    NoCourses,
    /// Calendar written with this many events
    Written { events: usize },
}

/// Load the config file and apply CLI overrides
///
/// # Errors
///
/// Returns `ConfigError` for a missing explicit file, bad TOML or invalid values
pub async fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::load(cli.global.config.clone()).await?;
    cli.export.apply_to(&mut config);
    config.validate()?;
    Ok(config)
}

/// Run one login, retrieval and emission cycle
pub async fn handle_export(config: &AppConfig) -> Result<CycleOutcome> {
    // Resolve everything that can fail locally before touching the network.
    let term_start = config.term_start()?;
    let output = config.output_path();
    let settings = config.login_settings()?;
    let year = config.term.year;
    let term = config.term.term;

    info!(
        "Exporting {}-{} term {} to {}",
        year,
        year + 1,
        term,
        output.display()
    );

    let cancel = CancellationToken::new();
    let signals = SignalHandler::new(cancel.clone()).setup();

    let portal = PortalClient::with_base_url(&config.client_config(), config.base_url()?)?;
    let channel = WebSocketChannel::with_endpoint(config.portal.channel_url.as_str());

    let session = {
        let mut login = LoginOrchestrator::new(
            portal,
            channel,
            TerminalPrompter::new(),
            config.login_stores(),
            settings,
        )
        .with_cancellation(cancel.clone());
        login.login().await?
    };

    // Login is done; stop listening for signals.
    cancel.cancel();
    signals.abort();

    let records = match fetch_courses_from(&session, &config.portal.timetable_url, year, term).await? {
        CourseListing::Empty => {
            println!("No courses found for {}-{} term {}.", year, year + 1, term);
            return Ok(CycleOutcome::NoCourses);
        }
        CourseListing::Courses(records) => records,
    };

    let courses = Course::from_raw_list(&records)?;
    CalendarWriter::new(term_start).write_to(&output, &courses)?;

    println!("Wrote {} events to {}", courses.len(), output.display());
    Ok(CycleOutcome::Written {
        events: courses.len(),
    })
}
