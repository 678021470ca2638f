//! Command-line argument parsing for jAccount Calendar
//!
//! No flag is required: running the binary logs in, fetches the configured
//! term and writes the calendar. Every flag overrides the config file.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser};

use crate::app::LoginStrategy;
use crate::config::AppConfig;

/// jAccount Calendar - export the SJTU course timetable to iCalendar
#[derive(Parser, Debug)]
#[command(
    name = "jaccount_calendar",
    version,
    about = "Export your SJTU course timetable as an iCalendar file",
    long_about = "Logs in to jAccount (cached session, QR code or password with captcha),
fetches the course list for one term and writes it as an .ics file."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// What to export
    #[command(flatten)]
    pub export: ExportArgs,
}

/// Logging and configuration options
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Term and login options
#[derive(Args, Debug, Clone, Default)]
pub struct ExportArgs {
    /// School year, e.g. 2024 for 2024-2025
    #[arg(short, long)]
    pub year: Option<i32>,

    /// Term: 1 autumn, 2 spring, 3 summer
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=3))]
    pub term: Option<u8>,

    /// Login method when no cached session is usable
    #[arg(short, long, value_enum)]
    pub login: Option<LoginStrategy>,

    /// Output file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Stop waiting for a QR scan after this long, e.g. "2m"
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub qr_timeout: Option<Duration>,
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(value).map_err(|e| e.to_string())
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level based on global arguments
    pub fn log_level(&self) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}

impl ExportArgs {
    /// Apply the flags that were given on top of the loaded config
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(year) = self.year {
            config.term.year = year;
        }
        if let Some(term) = self.term {
            config.term.term = term;
        }
        if let Some(strategy) = self.login {
            config.login.strategy = strategy;
        }
        if let Some(output) = &self.output {
            config.term.output = Some(output.clone());
        }
        if let Some(timeout) = self.qr_timeout {
            config.login.qr_timeout = Some(timeout);
        }
    }
}
