//! Error types for jAccount Calendar
//!
//! This module defines error types for all components of the application.
//! Errors are designed to be actionable and provide clear context for debugging and
//! user feedback.

use std::path::PathBuf;
use thiserror::Error;

/// Login and portal errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// Discovery or probe landed somewhere other than the expected page
    #[error("Unexpected redirect to {url}. The entry URL or the portal behaviour may have changed")]
    UnexpectedRedirect { url: String },

    /// Login page did not contain what we scrape from it
    #[error("Malformed login page: {reason}")]
    MalformedLoginPage { reason: String },

    /// HTTP request failed at the transport layer
    #[error("HTTP request to the portal failed")]
    Http(#[from] reqwest::Error),

    /// Portal answered with a non-success status
    #[error("Portal returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Submission reply was not the JSON shape we expect
    #[error("Unreadable portal reply: {reason}")]
    InvalidReply { reason: String },

    /// Portal rejected the login with a code we do not retry
    #[error("Portal rejected the login: {code}: {message}")]
    Rejected { code: String, message: String },

    /// QR confirmation channel failed
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// Reading or writing stored credentials failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Interactive prompt failed
    #[error("Prompt failed")]
    Prompt(#[source] std::io::Error),

    /// Invalid URL built from portal data
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Rate limit configuration error
    #[error("Invalid rate limit: {reason}")]
    InvalidRateLimit { reason: String },

    /// Username rejected before it reached the portal
    #[error("Invalid username: {reason}")]
    InvalidUsername { reason: String },
}

/// QR confirmation channel errors
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Channel disconnected before the login was confirmed
    #[error("Confirmation channel closed before the login was confirmed")]
    Closed,

    /// Wait was cancelled by a timeout or a signal
    #[error("Waiting for the QR code scan was cancelled")]
    Cancelled,

    /// WebSocket connect or transport failure
    #[error("Confirmation channel transport error")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// Server sent something we cannot interpret
    #[error("Confirmation channel protocol error: {reason}")]
    Protocol { reason: String },
}

/// Credential store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// File I/O error
    #[error("Credential file I/O error: {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File exists but is not a JSON object of strings
    #[error("Credential file is not valid JSON: {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Atomic replace of the file failed
    #[error("Could not replace credential file: {path}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}

/// Course retrieval and parsing errors
#[derive(Error, Debug)]
pub enum CourseError {
    /// HTTP request error
    #[error("Course request failed")]
    Http(#[from] reqwest::Error),

    /// Service answered with a non-success status
    #[error("Course service returned HTTP {status}")]
    Status { status: u16 },

    /// Service answered with something other than JSON (usually a login page)
    #[error("Course service returned {content_type} instead of JSON. The session may have expired")]
    UnexpectedContent { content_type: String },

    /// JSON body did not match the expected shape
    #[error("Malformed course listing")]
    Json(#[from] serde_json::Error),

    /// Term number outside 1..=3
    #[error("Unknown term {term}. Use 1, 2 or 3")]
    UnknownTerm { term: u8 },

    /// A record field failed validation
    #[error("Invalid {field} in course record: {value:?}")]
    InvalidField { field: &'static str, value: String },

    /// Week range could not be parsed
    #[error("Invalid week range {value:?}: {reason}")]
    InvalidWeeks { value: String, reason: String },

    /// Period number outside the timetable
    #[error("Period {period} is not in the timetable")]
    UnknownPeriod { period: u32 },
}

/// Calendar emission errors
#[derive(Error, Debug)]
pub enum CalendarError {
    /// Writing the output file failed
    #[error("Failed to write calendar to {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Date arithmetic left the representable range
    #[error("Course date out of range: {reason}")]
    DateOutOfRange { reason: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Configuration file could not be read
    #[error("Failed to read configuration file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Authentication error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Course retrieval error
    #[error(transparent)]
    Course(#[from] CourseError),

    /// Calendar emission error
    #[error(transparent)]
    Calendar(#[from] CalendarError),

    /// Credential store error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Check if the error is transient. The login core never retries these
    /// itself; this only tells the operator whether running again may help.
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Auth(AuthError::Http(_))
            | AppError::Auth(AuthError::Status { .. })
            | AppError::Auth(AuthError::Channel(ChannelError::Transport(_)))
            | AppError::Course(CourseError::Http(_))
            | AppError::Course(CourseError::Status { .. }) => true,

            AppError::Auth(AuthError::Rejected { .. })
            | AppError::Auth(AuthError::UnexpectedRedirect { .. })
            | AppError::Auth(AuthError::MalformedLoginPage { .. })
            | AppError::Config(_) => false,

            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "authentication",
            AppError::Course(_) => "courses",
            AppError::Calendar(_) => "calendar",
            AppError::Store(_) => "store",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Authentication result type alias
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Channel result type alias
pub type ChannelResult<T> = std::result::Result<T, ChannelError>;

/// Store result type alias
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Course result type alias
pub type CourseResult<T> = std::result::Result<T, CourseError>;

/// Calendar result type alias
pub type CalendarResult<T> = std::result::Result<T, CalendarError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
