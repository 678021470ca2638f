//! jAccount Calendar Library
//!
//! Logs in to the SJTU jAccount single sign-on portal (cached session, QR code
//! or password with captcha), retrieves a term's course list and renders it as
//! an iCalendar file.

pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
