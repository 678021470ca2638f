//! HTTP client for the jAccount portal
//!
//! This module performs every HTTP exchange of a login: discovery of the login
//! challenge, cookie resume probes, captcha downloads, credential submission and
//! the trailing authorization fetch.
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `auth`: login page inspection and the challenge context
//! - `http`: rate-limited requests and cookie jar access

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::Client;
use url::Url;

use crate::app::login::outcome::{LoginOutcome, PortalReply};
use crate::constants::portal;
use crate::errors::{AuthError, AuthResult};

// Module declarations
pub mod auth;
pub mod config;
pub mod http;

pub use auth::{AuthTarget, is_login_page};
pub use config::ClientConfig;

use http::HttpHandler;

/// How an authenticated state was reached, which decides what `finalize` fetches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The cached cookie passed the probe; the probe already completed authorization
    Resumed,
    /// Password login succeeded; fetch this portal-relative path
    Redirect { path: String },
    /// QR scan confirmed; re-request the authorization URL
    Confirmed,
}

/// The HTTP surface the login flow needs from the portal
#[async_trait]
pub trait Portal: Send + Sync {
    /// Authenticated handle produced by `finalize`
    type Session: Send;

    /// Follow the entry URL to the login page and read the challenge
    async fn discover(&self, entry: &Url) -> AuthResult<AuthTarget>;

    /// Attach `token` and report whether the authorization URL now lets us through
    async fn probe_resume(&self, target: &AuthTarget, token: &str) -> AuthResult<bool>;

    /// Drop the session cookie from the in-memory jar
    fn clear_session_token(&self);

    /// Download a captcha image bound to the challenge
    async fn fetch_captcha(&self, target: &AuthTarget) -> AuthResult<Vec<u8>>;

    /// Submit credentials and classify the reply
    async fn submit(
        &self,
        target: &AuthTarget,
        username: &str,
        password: &str,
        captcha: &str,
    ) -> AuthResult<LoginOutcome>;

    /// Complete the handshake and hand out the authenticated session
    async fn finalize(&self, target: &AuthTarget, completion: &Completion)
    -> AuthResult<Self::Session>;

    /// Current session cookie, if the jar holds one
    fn session_token(&self) -> Option<String>;
}

/// Authenticated HTTP client carrying the portal session cookie
///
/// Only [`PortalClient::finalize`] creates one.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    client: Client,
    jar: Arc<Jar>,
}

impl SessionHandle {
    /// HTTP client whose cookie jar carries the session
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Cookie jar shared with the client
    pub fn jar(&self) -> &Arc<Jar> {
        &self.jar
    }
}

/// reqwest-backed portal client
#[derive(Debug)]
pub struct PortalClient {
    http: HttpHandler,
    base_url: Url,
    last_captcha_ts: AtomicI64,
}

impl PortalClient {
    /// Creates a client for the default portal
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if HTTP client creation fails
    pub fn new(config: &ClientConfig) -> AuthResult<Self> {
        let base_url = parse_url(portal::BASE_URL)?;
        Self::with_base_url(config, base_url)
    }

    /// Creates a client for a portal at a different base URL
    pub fn with_base_url(config: &ClientConfig, base_url: Url) -> AuthResult<Self> {
        let http = HttpHandler::new(config)?;
        tracing::debug!("Created portal client for {}", base_url);
        Ok(Self {
            http,
            base_url,
            last_captcha_ts: AtomicI64::new(0),
        })
    }

    /// Portal base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> AuthResult<Url> {
        self.base_url.join(path).map_err(|e| AuthError::InvalidUrl {
            url: format!("{}{}", self.base_url, path),
            error: e.to_string(),
        })
    }

    /// Millisecond timestamp, strictly greater than any previously returned
    fn next_captcha_ts(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let previous = self.last_captcha_ts.fetch_max(now, Ordering::SeqCst);
        if previous >= now {
            self.last_captcha_ts.fetch_add(1, Ordering::SeqCst) + 1
        } else {
            now
        }
    }

    /// GET a URL and fail unless the final location is off the login page
    async fn fetch_past_login(&self, url: &Url) -> AuthResult<Url> {
        let response = self.http.get(url).await?;
        let landed = response.url().clone();
        if is_login_page(&landed, &self.base_url) {
            return Err(AuthError::UnexpectedRedirect {
                url: landed.to_string(),
            });
        }
        Ok(landed)
    }
}

#[async_trait]
impl Portal for PortalClient {
    type Session = SessionHandle;

    async fn discover(&self, entry: &Url) -> AuthResult<AuthTarget> {
        tracing::info!("Discovering login page from {}", entry);
        let response = self.http.get(entry).await?;
        let landed = response.url().clone();

        if !is_login_page(&landed, &self.base_url) {
            tracing::warn!("Entry URL landed on {} instead of the login page", landed);
            return Err(AuthError::UnexpectedRedirect {
                url: landed.to_string(),
            });
        }

        let html = response.text().await?;
        let target = AuthTarget::from_landing(&landed, &html)?;
        tracing::debug!("Challenge uuid {}", target.uuid());
        Ok(target)
    }

    async fn probe_resume(&self, target: &AuthTarget, token: &str) -> AuthResult<bool> {
        self.http
            .set_cookie(portal::SESSION_COOKIE, token, &self.base_url);

        let response = self.http.get(target.auth_url()).await?;
        let resumed = !is_login_page(response.url(), &self.base_url);
        tracing::debug!("Resume probe landed on {}", response.url());
        Ok(resumed)
    }

    fn clear_session_token(&self) {
        self.http
            .clear_cookie(portal::SESSION_COOKIE, &self.base_url);
    }

    async fn fetch_captcha(&self, target: &AuthTarget) -> AuthResult<Vec<u8>> {
        let url = self.endpoint(portal::CAPTCHA_PATH)?;
        let ts = self.next_captcha_ts().to_string();
        let request = self
            .http
            .client()
            .get(url)
            .query(&[("uuid", target.uuid()), ("t", ts.as_str())])
            .header(reqwest::header::REFERER, target.auth_url().as_str());

        let response = self.http.send(request).await?;
        let bytes = response.bytes().await?;
        tracing::debug!("Fetched captcha ({} bytes)", bytes.len());
        Ok(bytes.to_vec())
    }

    async fn submit(
        &self,
        target: &AuthTarget,
        username: &str,
        password: &str,
        captcha: &str,
    ) -> AuthResult<LoginOutcome> {
        let url = self.endpoint(portal::SUBMIT_PATH)?;

        let mut form: Vec<(&str, &str)> = vec![
            ("user", username),
            ("pass", password),
            ("uuid", target.uuid()),
            ("captcha", captcha),
            ("lt", portal::PASSWORD_LOGIN_TYPE),
        ];
        form.extend(target.params().iter().map(|(k, v)| (k.as_str(), v.as_str())));

        tracing::info!("Submitting credentials for user: {}", username);
        let response = self
            .http
            .send(self.http.client().post(url).form(&form))
            .await?;
        let body = response.text().await?;

        PortalReply::parse(&body)?.into_outcome()
    }

    async fn finalize(
        &self,
        target: &AuthTarget,
        completion: &Completion,
    ) -> AuthResult<SessionHandle> {
        match completion {
            Completion::Resumed => {}
            Completion::Redirect { path } => {
                let url = self.endpoint(path)?;
                let landed = self.fetch_past_login(&url).await?;
                tracing::debug!("Authorization completed at {}", landed);
            }
            Completion::Confirmed => {
                let landed = self.fetch_past_login(target.auth_url()).await?;
                tracing::debug!("Authorization completed at {}", landed);
            }
        }

        Ok(SessionHandle {
            client: self.http.client().clone(),
            jar: Arc::clone(self.http.jar()),
        })
    }

    fn session_token(&self) -> Option<String> {
        // The login page sees cookies scoped to `/` as well as `/jaccount`
        let login_page = self
            .endpoint(portal::LOGIN_PATH)
            .unwrap_or_else(|_| self.base_url.clone());
        self.http.cookie(portal::SESSION_COOKIE, &login_page)
    }
}

fn parse_url(url: &str) -> AuthResult<Url> {
    Url::parse(url).map_err(|e| AuthError::InvalidUrl {
        url: url.to_string(),
        error: e.to_string(),
    })
}
