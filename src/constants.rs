//! Application constants for jAccount Calendar
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain.

use std::time::Duration;

/// Environment variable names for credentials
pub mod env {
    /// Environment variable name for the jAccount username
    pub const USERNAME: &str = "JACCOUNT_USERNAME";

    /// Environment variable name for the jAccount password
    pub const PASSWORD: &str = "JACCOUNT_PASSWORD";
}

/// jAccount portal endpoints and page markers
pub mod portal {
    /// Portal base URL
    pub const BASE_URL: &str = "https://jaccount.sjtu.edu.cn";

    /// Host every login page is served from
    pub const LOGIN_HOST: &str = "jaccount.sjtu.edu.cn";

    /// Path of the login page; landing here means "not authenticated"
    pub const LOGIN_PATH: &str = "/jaccount/jalogin";

    /// Captcha image endpoint, relative to the base URL
    pub const CAPTCHA_PATH: &str = "/jaccount/captcha";

    /// Credential submission endpoint, relative to the base URL
    pub const SUBMIT_PATH: &str = "/jaccount/ulogin";

    /// QR confirmation endpoint encoded into the displayed code
    pub const CONFIRM_SCAN_PATH: &str = "/jaccount/confirmscancode";

    /// Push channel endpoint prefix; the challenge uuid is appended
    pub const CHANNEL_URL: &str = "wss://jaccount.sjtu.edu.cn/jaccount/sub";

    /// Anchor whose href carries the challenge uuid on the login page
    pub const UUID_ANCHOR_SELECTOR: &str = "a#firefox_link";

    /// Session cookie name
    pub const SESSION_COOKIE: &str = "JAAuthCookie";

    /// Login type marker sent with password submissions
    pub const PASSWORD_LOGIN_TYPE: &str = "p";
}

/// Push channel message types
pub mod channel {
    /// Both the initiation request and the refresh event
    pub const UPDATE_QR_CODE: &str = "UPDATE_QR_CODE";

    /// Terminal event sent once the scan is confirmed
    pub const LOGIN: &str = "LOGIN";
}

/// Portal reply codes
pub mod replies {
    /// errno for a successful submission
    pub const ERRNO_SUCCESS: i64 = 0;

    /// errno for a rejected submission; the subcode says why
    pub const ERRNO_REJECTED: i64 = 1;

    /// Subcode for a mistyped captcha
    pub const WRONG_CAPTCHA: &str = "WRONG_CAPTCHA";

    /// Subcode for a bad username/password pair
    pub const WRONG_USER_OR_PASSWORD: &str = "WRONG_USER_OR_PASSWORD";
}

/// Downstream course service
pub mod courses {
    /// Entry URL that redirects into the portal
    pub const ENTRY_URL: &str = "https://i.sjtu.edu.cn/jaccountlogin";

    /// Personal timetable query endpoint
    pub const TIMETABLE_URL: &str = "https://i.sjtu.edu.cn/kbcx/xskbcx_cxXsgrkb.html?gnmkdm=N2151";

    /// Map a term number (1, 2, 3) to the code the service expects
    pub fn term_code(term: u8) -> Option<&'static str> {
        match term {
            1 => Some("3"),
            2 => Some("12"),
            3 => Some("16"),
            _ => None,
        }
    }
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Browser user agent; the portal serves a different page to unknown agents
    pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.3 Safari/605.1.15";

    /// Accept-Language header value
    pub const ACCEPT_LANGUAGE: &str = "zh-CN";

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

    /// Maximum number of redirects to follow
    pub const MAX_REDIRECTS: usize = 10;

    /// Default requests per second against the portal
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 5;
}

/// Credential storage defaults
pub mod store {
    /// Default file holding the session cookie
    pub const COOKIES_FILE: &str = "cookies.json";

    /// Default file holding username/password
    pub const USERINFO_FILE: &str = "config.json";

    /// Username key in the user info file
    pub const USERNAME_KEY: &str = "username";

    /// Password key in the user info file
    pub const PASSWORD_KEY: &str = "password";

    /// File permissions for credential files (Unix only) - owner read/write only
    #[cfg(unix)]
    pub const FILE_PERMISSIONS: u32 = 0o600;
}

/// Calendar output constants
pub mod calendar {
    /// Display name written as `X-WR-CALNAME`
    pub const CALENDAR_NAME: &str = "jAccount course timetable";

    /// Domain suffix for generated event UIDs
    pub const UID_DOMAIN: &str = "jaccount-calendar";
}

/// Default school year when neither config nor CLI picks one
pub const DEFAULT_YEAR: i32 = 2024;

/// Default term when neither config nor CLI picks one
pub const DEFAULT_TERM: u8 = 2;

// Re-export commonly used constants for convenience
pub use http::{DEFAULT_RATE_LIMIT_RPS, USER_AGENT};
pub use portal::{BASE_URL as PORTAL_BASE_URL, SESSION_COOKIE};
