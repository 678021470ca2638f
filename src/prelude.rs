//! Prelude module for jAccount Calendar Library
//!
//! This module re-exports the most commonly used items from the library,
//! providing a convenient way to import everything needed for typical usage
//! with a single `use jaccount_calendar::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use jaccount_calendar::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::default();
//!     let portal = PortalClient::new(&config.client_config())?;
//!     let mut login = LoginOrchestrator::new(
//!         portal,
//!         WebSocketChannel::new(),
//!         TerminalPrompter::new(),
//!         config.login_stores(),
//!         config.login_settings()?,
//!     );
//!     let session = login.login().await?;
//!
//!     if let CourseListing::Courses(records) = fetch_courses(&session, 2024, 2).await? {
//!         let courses = Course::from_raw_list(&records)?;
//!         CalendarWriter::new(config.term_start()?).write_to(&config.output_path(), &courses)?;
//!     }
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Login flow
pub use crate::app::{
    ChallengeChannel, ClientConfig, LoginOrchestrator, LoginOutcome, LoginSettings, LoginState,
    LoginStores, LoginStrategy, PortalClient, Prompter, QrPayload, SessionHandle,
    WebSocketChannel,
};

// Courses and calendar output
pub use crate::app::{
    CalendarWriter, Course, CourseListing, RawCourse, WeekRange, default_file_name,
    fetch_courses, term_start,
};

// Credentials
pub use crate::auth::{CredentialStore, Credentials, PersistChoice};

// Configuration and terminal front end
pub use crate::cli::TerminalPrompter;
pub use crate::config::AppConfig;

// Commonly used constants
pub use crate::constants::{DEFAULT_RATE_LIMIT_RPS, SESSION_COOKIE, USER_AGENT};

// Standard library re-exports that are commonly needed
pub use std::path::{Path, PathBuf};

// Common external crate re-exports for convenience
pub use tokio;
