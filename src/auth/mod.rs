//! Credential and session-token storage
//!
//! This module keeps the small secrets that survive between runs: the portal
//! session cookie and, with the user's consent, the username and password.
//!
//! # Examples
//!
//! ```rust,no_run
//! use jaccount_calendar::auth::{Credentials, CredentialStore};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = CredentialStore::new("config.json");
//! let credentials = Credentials::load(&store)?.with_env_fallback();
//! if !credentials.is_complete() {
//!     println!("Will prompt for the missing fields");
//! }
//! # Ok(())
//! # }
//! ```

pub mod credentials;
pub mod store;

// Re-export main public API
pub use credentials::{Credentials, PersistChoice, is_valid_username, persist_credentials};
pub use store::{CredentialStore, Entries};
