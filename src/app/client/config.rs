//! HTTP client configuration and building logic
//!
//! This module handles the configuration and construction of the single
//! HTTP client a login flow shares between all of its requests.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::constants::http;
use crate::errors::{AuthError, AuthResult};

/// Configuration for the portal HTTP client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Request timeout
    pub request_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
    /// Maximum number of redirects followed per request
    pub max_redirects: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            rate_limit_rps: http::DEFAULT_RATE_LIMIT_RPS,
            max_redirects: http::MAX_REDIRECTS,
        }
    }
}

impl ClientConfig {
    /// Builds the HTTP client around the given cookie jar
    ///
    /// The jar is passed in rather than enabled with `cookie_store(true)` so the
    /// login flow can read and expire the session cookie directly.
    pub fn build_http_client(&self, jar: Arc<Jar>) -> AuthResult<Client> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(http::ACCEPT_LANGUAGE),
        );

        Client::builder()
            .cookie_provider(jar)
            .default_headers(headers)
            .user_agent(http::USER_AGENT)
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .redirect(Policy::limited(self.max_redirects))
            .build()
            .map_err(AuthError::Http)
    }
}
