//! Outcome of a single credential submission
//!
//! The portal answers every submission with `{"errno": .., "code": .., "error": .., "url": ..}`.
//! [`PortalReply::into_outcome`] maps that onto a closed set of variants so the
//! password loop has to branch on each case explicitly. Subcodes we do not
//! recognise land in [`FatalFailure::UnknownPortalError`] with the raw code and
//! message, never in a retry.

use serde::Deserialize;

use crate::constants::replies;
use crate::errors::{AuthError, AuthResult};

/// Tagged result of one submission attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Credentials accepted; finish the handshake at this portal path
    Success { redirect: String },
    /// Try again with a fresh captcha
    Retryable(RetryableFailure),
    /// Stop this attempt
    Fatal(FatalFailure),
}

/// Failures fixed by simply trying again
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryableFailure {
    /// The captcha text did not match
    WrongCaptcha { message: String },
}

/// Failures that end the current attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalFailure {
    /// Username or password wrong; both must be collected again
    WrongCredentials { message: String },
    /// Anything else the portal says, kept verbatim
    UnknownPortalError { code: String, message: String },
}

impl RetryableFailure {
    /// Portal message to show the user
    pub fn message(&self) -> &str {
        match self {
            Self::WrongCaptcha { message } => message,
        }
    }
}

impl FatalFailure {
    /// Portal message to show the user
    pub fn message(&self) -> &str {
        match self {
            Self::WrongCredentials { message } | Self::UnknownPortalError { message, .. } => {
                message
            }
        }
    }

    /// Whether re-entering username and password can fix it
    pub fn is_credentials_related(&self) -> bool {
        matches!(self, Self::WrongCredentials { .. })
    }
}

impl From<FatalFailure> for AuthError {
    fn from(failure: FatalFailure) -> Self {
        match failure {
            FatalFailure::WrongCredentials { message } => AuthError::Rejected {
                code: replies::WRONG_USER_OR_PASSWORD.to_string(),
                message,
            },
            FatalFailure::UnknownPortalError { code, message } => {
                AuthError::Rejected { code, message }
            }
        }
    }
}

/// Raw JSON reply of the submission endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct PortalReply {
    pub errno: i64,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl PortalReply {
    /// Parse a reply body
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidReply` if the body is not the expected JSON
    pub fn parse(body: &str) -> AuthResult<Self> {
        serde_json::from_str(body).map_err(|e| AuthError::InvalidReply {
            reason: e.to_string(),
        })
    }

    /// Classify the reply
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidReply` for a success reply without a redirect
    pub fn into_outcome(self) -> AuthResult<LoginOutcome> {
        let message = self.error.unwrap_or_default();

        match self.errno {
            replies::ERRNO_SUCCESS => {
                let redirect = self
                    .url
                    .filter(|url| !url.is_empty())
                    .ok_or_else(|| AuthError::InvalidReply {
                        reason: "success reply without a redirect url".to_string(),
                    })?;
                Ok(LoginOutcome::Success { redirect })
            }
            replies::ERRNO_REJECTED => Ok(match self.code.as_deref() {
                Some(replies::WRONG_CAPTCHA) => {
                    LoginOutcome::Retryable(RetryableFailure::WrongCaptcha { message })
                }
                Some(replies::WRONG_USER_OR_PASSWORD) => {
                    LoginOutcome::Fatal(FatalFailure::WrongCredentials { message })
                }
                other => LoginOutcome::Fatal(FatalFailure::UnknownPortalError {
                    code: other.unwrap_or("UNKNOWN").to_string(),
                    message,
                }),
            }),
            errno => Ok(LoginOutcome::Fatal(FatalFailure::UnknownPortalError {
                code: self.code.unwrap_or_else(|| format!("errno {}", errno)),
                message,
            })),
        }
    }
}
