//! Rate-limited HTTP operations and cookie jar access
//!
//! Every portal request goes through [`HttpHandler::send`], which waits on the
//! rate limiter and turns non-success statuses into errors. Transport failures
//! are returned as-is; the login flow never retries them.

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, RequestBuilder, Response};
use url::Url;

use crate::app::client::config::ClientConfig;
use crate::errors::{AuthError, AuthResult};

/// HTTP operations handler sharing one client and one cookie jar
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    jar: Arc<Jar>,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpHandler {
    /// Creates a handler with a fresh cookie jar
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the client cannot be built or the rate limit is zero
    pub fn new(config: &ClientConfig) -> AuthResult<Self> {
        let jar = Arc::new(Jar::default());
        let client = config.build_http_client(Arc::clone(&jar))?;
        let rate_limiter = Self::build_rate_limiter(config.rate_limit_rps)?;
        Ok(Self {
            client,
            jar,
            rate_limiter,
        })
    }

    /// Builds the rate limiter with the specified rate limit
    fn build_rate_limiter(
        rate_limit_rps: u32,
    ) -> AuthResult<RateLimiter<NotKeyed, InMemoryState, DefaultClock>> {
        let quota = Quota::per_second(NonZeroU32::new(rate_limit_rps).ok_or_else(|| {
            AuthError::InvalidRateLimit {
                reason: "Rate limit must be non-zero".to_string(),
            }
        })?);
        Ok(RateLimiter::direct(quota))
    }

    /// Sends a request after waiting for the rate limiter
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Http` on transport failure and `AuthError::Status`
    /// when the final response is not a success
    pub async fn send(&self, request: RequestBuilder) -> AuthResult<Response> {
        self.rate_limiter.until_ready().await;

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("{} -> {}", response.url(), status);

        if !status.is_success() {
            return Err(AuthError::Status {
                url: response.url().to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    /// GET a URL, following redirects
    pub async fn get(&self, url: &Url) -> AuthResult<Response> {
        self.send(self.client.get(url.clone())).await
    }

    /// Attach a cookie for the given URL's host
    pub fn set_cookie(&self, name: &str, value: &str, url: &Url) {
        self.jar
            .add_cookie_str(&format!("{}={}; Path=/", name, value), url);
    }

    /// Expire a cookie for the given URL's host
    pub fn clear_cookie(&self, name: &str, url: &Url) {
        for path in ["/", "/jaccount"] {
            self.jar
                .add_cookie_str(&format!("{}=; Path={}; Max-Age=0", name, path), url);
        }
    }

    /// Read the value of a cookie that would be sent to the given URL
    pub fn cookie(&self, name: &str, url: &Url) -> Option<String> {
        let header = self.jar.cookies(url)?;
        let header = header.to_str().ok()?;
        cookie_value(header, name)
    }

    /// Get a reference to the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Shared cookie jar
    pub fn jar(&self) -> &Arc<Jar> {
        &self.jar
    }
}

/// Pick one value out of a `Cookie:` header
pub fn cookie_value(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
