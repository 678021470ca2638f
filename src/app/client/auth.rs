//! Login page inspection
//!
//! This module holds the checks the portal client applies to every landing
//! URL and the scraping of the challenge context out of the login page.

use scraper::{Html, Selector};
use url::Url;

use crate::constants::portal;
use crate::errors::{AuthError, AuthResult};

/// Resolved login challenge for one login attempt
///
/// Built once from the page discovery lands on and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthTarget {
    uuid: String,
    params: Vec<(String, String)>,
    auth_url: Url,
}

impl AuthTarget {
    /// Build the target from the login page URL and its HTML
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MalformedLoginPage` if the uuid anchor is missing
    pub fn from_landing(auth_url: &Url, html: &str) -> AuthResult<Self> {
        let uuid = extract_challenge_uuid(html)?;
        let params = auth_url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        Ok(Self {
            uuid,
            params,
            auth_url: auth_url.clone(),
        })
    }

    /// Challenge identifier shared by the captcha, submission and QR channel
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// Query parameters echoed back on submission
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Canonical authorization URL (the login page URL)
    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }
}

/// True when `url` is the portal login page on the portal identified by `base`
pub fn is_login_page(url: &Url, base: &Url) -> bool {
    url.host_str() == base.host_str()
        && url.port_or_known_default() == base.port_or_known_default()
        && url.path() == portal::LOGIN_PATH
}

/// Extract the challenge uuid from the anchor on the login page
fn extract_challenge_uuid(html: &str) -> AuthResult<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(portal::UUID_ANCHOR_SELECTOR).map_err(|_| {
        AuthError::MalformedLoginPage {
            reason: format!("invalid selector {}", portal::UUID_ANCHOR_SELECTOR),
        }
    })?;

    let href = document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("href"))
        .ok_or_else(|| AuthError::MalformedLoginPage {
            reason: "challenge anchor not found".to_string(),
        })?;

    // The href may be relative; only its query string matters.
    let query = href.split_once('?').map(|(_, query)| query).unwrap_or("");
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "uuid")
        .map(|(_, value)| value.into_owned())
        .filter(|uuid| !uuid.is_empty())
        .ok_or_else(|| AuthError::MalformedLoginPage {
            reason: "challenge anchor has no uuid".to_string(),
        })
}
