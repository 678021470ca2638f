//! Core application logic for jAccount Calendar
//!
//! This module contains the portal HTTP client, the QR confirmation channel,
//! the login state machine, course retrieval and calendar emission.
//!
//! # Examples
//!
//! ```rust,no_run
//! use jaccount_calendar::app::{
//!     CalendarWriter, Course, CourseListing, SessionHandle, fetch_courses, term_start,
//! };
//!
//! # async fn example(session: SessionHandle) -> Result<(), Box<dyn std::error::Error>> {
//! // `session` comes from a successful `LoginOrchestrator::login`
//! if let CourseListing::Courses(records) = fetch_courses(&session, 2024, 2).await? {
//!     let courses = Course::from_raw_list(&records)?;
//!     let start = term_start(2024, 2).ok_or("unknown term")?;
//!     CalendarWriter::new(start).write_to("2024-2025-2.ics".as_ref(), &courses)?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod calendar;
pub mod channel;
pub mod client;
pub mod courses;
pub mod login;
pub mod models;

// Re-export main public API
pub use calendar::{CalendarWriter, default_file_name};
pub use channel::{ChallengeChannel, QrPayload, WebSocketChannel};
pub use client::{AuthTarget, ClientConfig, Completion, PortalClient, SessionHandle};
pub use courses::{CourseListing, fetch_courses};
pub use login::{
    LoginOrchestrator, LoginOutcome, LoginSettings, LoginState, LoginStores, LoginStrategy,
    Prompter,
};
pub use models::{Course, PeriodRange, RawCourse, WeekRange, term_start};
