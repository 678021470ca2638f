//! Configuration management for jAccount Calendar
//!
//! Everything has a default, so running without a config file is the normal
//! case. A TOML file can override any section; CLI flags override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::app::calendar::default_file_name;
use crate::app::models::term_start;
use crate::app::{ClientConfig, LoginSettings, LoginStores, LoginStrategy};
use crate::auth::CredentialStore;
use crate::constants::{self, courses, http, portal, store};
use crate::errors::{ConfigError, ConfigResult};

/// Project-local config file name
pub const LOCAL_CONFIG_FILE: &str = "jaccount-calendar.toml";

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Portal and course service endpoints
    pub portal: PortalConfigToml,
    /// Login behaviour and credential files
    pub login: LoginConfigToml,
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Which term to export
    pub term: TermConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfigToml {
    /// Downstream entry URL that redirects to the login page
    pub entry_url: String,
    /// jAccount portal base URL
    pub base_url: String,
    /// QR push channel endpoint prefix
    pub channel_url: String,
    /// Timetable query endpoint
    pub timetable_url: String,
}

impl Default for PortalConfigToml {
    fn default() -> Self {
        Self {
            entry_url: courses::ENTRY_URL.to_string(),
            base_url: portal::BASE_URL.to_string(),
            channel_url: portal::CHANNEL_URL.to_string(),
            timetable_url: courses::TIMETABLE_URL.to_string(),
        }
    }
}

/// Login configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfigToml {
    /// `qrcode` or `password`
    pub strategy: LoginStrategy,
    /// File holding the cached session cookie
    pub cookie_file: PathBuf,
    /// File holding username and password
    pub userinfo_file: PathBuf,
    /// Give up waiting for a QR scan after this long, e.g. "2m"
    #[serde(with = "humantime_serde")]
    pub qr_timeout: Option<Duration>,
}

impl Default for LoginConfigToml {
    fn default() -> Self {
        Self {
            strategy: LoginStrategy::default(),
            cookie_file: PathBuf::from(store::COOKIES_FILE),
            userinfo_file: PathBuf::from(store::USERINFO_FILE),
            qr_timeout: None,
        }
    }
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// Request timeout, e.g. "30s"
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Connect timeout, e.g. "15s"
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            rate_limit_rps: http::DEFAULT_RATE_LIMIT_RPS,
        }
    }
}

/// Term selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TermConfigToml {
    /// First calendar year of the school year (2024 means 2024-2025)
    pub year: i32,
    /// 1 autumn, 2 spring, 3 summer
    pub term: u8,
    /// Monday of week 1; overrides the built-in table
    pub start_date: Option<NaiveDate>,
    /// Output file; defaults to `{year}-{year+1}-{term}.ics`
    pub output: Option<PathBuf>,
}

impl Default for TermConfigToml {
    fn default() -> Self {
        Self {
            year: constants::DEFAULT_YEAR,
            term: constants::DEFAULT_TERM,
            start_date: None,
            output: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when no verbosity flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (explicit path, then `./jaccount-calendar.toml`, then the user config dir)
    ///
    /// CLI overrides are applied by the caller.
    pub async fn load(config_file_override: Option<PathBuf>) -> ConfigResult<Self> {
        let config_path = match config_file_override {
            Some(path) if path.exists() => Some(path),
            Some(path) => return Err(ConfigError::NotFound { path }),
            None => Self::find_config_file(),
        };

        let config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => {
                debug!("No config file found; using defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(".").join(LOCAL_CONFIG_FILE)];
        if let Some(path) = Self::default_config_path() {
            search_paths.push(path);
        }

        search_paths.into_iter().find(|path| {
            let found = path.exists();
            if found {
                debug!("Found config file: {}", path.display());
            }
            found
        })
    }

    /// Per-user config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("jaccount-calendar").join("config.toml"))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let config: AppConfig = toml::from_str(&content)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> ConfigResult<()> {
        if courses::term_code(self.term.term).is_none() {
            return Err(invalid("term.term", self.term.term, "use 1, 2 or 3"));
        }
        if self.client.rate_limit_rps == 0 {
            return Err(invalid("client.rate_limit_rps", 0, "must be positive"));
        }
        for (field, value) in [
            ("portal.entry_url", &self.portal.entry_url),
            ("portal.base_url", &self.portal.base_url),
            ("portal.channel_url", &self.portal.channel_url),
            ("portal.timetable_url", &self.portal.timetable_url),
        ] {
            Url::parse(value).map_err(|e| invalid(field, value, &e.to_string()))?;
        }
        Ok(())
    }

    /// Runtime HTTP client configuration
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            request_timeout: self.client.request_timeout,
            connect_timeout: self.client.connect_timeout,
            rate_limit_rps: self.client.rate_limit_rps,
            ..ClientConfig::default()
        }
    }

    /// Parsed portal base URL
    pub fn base_url(&self) -> ConfigResult<Url> {
        parse_url("portal.base_url", &self.portal.base_url)
    }

    /// Runtime login settings
    pub fn login_settings(&self) -> ConfigResult<LoginSettings> {
        Ok(LoginSettings {
            entry_url: parse_url("portal.entry_url", &self.portal.entry_url)?,
            strategy: self.login.strategy,
            qr_timeout: self.login.qr_timeout,
        })
    }

    /// Credential files used by the login
    pub fn login_stores(&self) -> LoginStores {
        LoginStores {
            token: CredentialStore::new(&self.login.cookie_file),
            userinfo: CredentialStore::new(&self.login.userinfo_file),
        }
    }

    /// Monday of week 1 for the selected term
    pub fn term_start(&self) -> ConfigResult<NaiveDate> {
        self.term
            .start_date
            .or_else(|| term_start(self.term.year, self.term.term))
            .ok_or_else(|| {
                invalid(
                    "term.start_date",
                    format!("{} term {}", self.term.year, self.term.term),
                    "no built-in start date for this term; set it explicitly",
                )
            })
    }

    /// Where the calendar is written
    pub fn output_path(&self) -> PathBuf {
        self.term
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(default_file_name(self.term.year, self.term.term)))
    }
}

fn parse_url(field: &str, value: &str) -> ConfigResult<Url> {
    Url::parse(value).map_err(|e| invalid(field, value, &e.to_string()))
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
