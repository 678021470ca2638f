//! jAccount credentials and the user's choice of what to keep on disk

use std::env;
use std::fmt;
use std::str::FromStr;

use tracing::{debug, info};

use crate::auth::store::{CredentialStore, Entries};
use crate::constants::{env as env_constants, store as store_constants};
use crate::errors::StoreResult;

/// Username and password, either of which may still be missing
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    /// Build from explicit values
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    /// Read whatever the user info file holds
    pub fn load(store: &CredentialStore) -> StoreResult<Self> {
        let mut entries = store.load()?;
        let credentials = Self {
            username: non_empty(entries.remove(store_constants::USERNAME_KEY).flatten()),
            password: non_empty(entries.remove(store_constants::PASSWORD_KEY).flatten()),
        };
        debug!(
            "Stored credentials: username {}, password {}",
            presence(&credentials.username),
            presence(&credentials.password)
        );
        Ok(credentials)
    }

    /// Fill missing fields from JACCOUNT_USERNAME / JACCOUNT_PASSWORD
    pub fn with_env_fallback(mut self) -> Self {
        if self.username.is_none() {
            self.username = non_empty(env::var(env_constants::USERNAME).ok());
        }
        if self.password.is_none() {
            self.password = non_empty(env::var(env_constants::PASSWORD).ok());
        }
        self
    }

    /// Forget both fields so the next prompt asks for everything again
    pub fn clear(&mut self) {
        self.username = None;
        self.password = None;
    }

    /// Both fields present
    pub fn is_complete(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Borrow both fields when complete
    pub fn pair(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some((username, password)),
            _ => None,
        }
    }
}

/// What the user agreed to keep in the user info file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistChoice {
    /// Keep username and password
    Both,
    /// Keep the username, forget the password
    UsernameOnly,
    /// Keep nothing; the file is removed
    Neither,
}

impl FromStr for PersistChoice {
    type Err = String;

    /// Parse the `y/[n]/u` answer; an empty answer means "no"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "y" | "yes" => Ok(Self::Both),
            "u" | "username" => Ok(Self::UsernameOnly),
            "" | "n" | "no" => Ok(Self::Neither),
            other => Err(format!("expected y, n or u, got {:?}", other)),
        }
    }
}

/// Apply the user's persistence choice to the user info file
pub fn persist_credentials(
    store: &CredentialStore,
    credentials: &Credentials,
    choice: PersistChoice,
) -> StoreResult<()> {
    match choice {
        PersistChoice::Neither => {
            store.remove()?;
            info!("Credentials not stored");
        }
        PersistChoice::Both | PersistChoice::UsernameOnly => {
            let password = match choice {
                PersistChoice::Both => credentials.password.clone(),
                _ => None,
            };
            let mut entries = Entries::new();
            entries.insert(
                store_constants::USERNAME_KEY.to_string(),
                credentials.username.clone(),
            );
            entries.insert(store_constants::PASSWORD_KEY.to_string(), password);
            store.save(entries)?;
            info!("Credentials saved to {}", store.path().display());
        }
    }
    Ok(())
}

/// Validate a student/staff account name before sending it to the portal
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.len() <= 64
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn presence(value: &Option<String>) -> &'static str {
    if value.is_some() {
        "present"
    } else {
        "missing"
    }
}
