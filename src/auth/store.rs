//! Key-value credential storage backed by small JSON files
//!
//! A store is one JSON object of string (or null) values. Loading a missing
//! file yields an empty mapping; saving merges into whatever is on disk and
//! replaces the file atomically with owner-only permissions.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::errors::{StoreError, StoreResult};

/// Stored entries; a `None` value is written as JSON `null`
pub type Entries = BTreeMap<String, Option<String>>;

/// JSON file holding a handful of secrets
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Create a store for the given file; nothing is touched until load/save
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all entries. A missing file is an empty mapping, not an error.
    pub fn load(&self) -> StoreResult<Entries> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No credential file at {}", self.path.display());
                return Ok(Entries::new());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        serde_json::from_str(&content).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })
    }

    /// Load a single value; absent keys and `null` values both yield `None`
    pub fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.load()?.remove(key).flatten())
    }

    /// Merge `partial` into the stored entries and write the result
    pub fn save(&self, partial: Entries) -> StoreResult<()> {
        let mut entries = self.load()?;
        entries.extend(partial);

        let content = serde_json::to_vec_pretty(&entries).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|source| self.io_error(source))?;

        let mut file = NamedTempFile::new_in(&parent).map_err(|source| self.io_error(source))?;
        file.write_all(&content)
            .and_then(|_| file.write_all(b"\n"))
            .and_then(|_| file.flush())
            .map_err(|source| self.io_error(source))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            use crate::constants::store::FILE_PERMISSIONS;

            fs::set_permissions(file.path(), fs::Permissions::from_mode(FILE_PERMISSIONS))
                .map_err(|source| self.io_error(source))?;
        }

        file.persist(&self.path).map_err(|source| StoreError::Persist {
            path: self.path.clone(),
            source,
        })?;

        debug!("Saved {} entries to {}", entries.len(), self.path.display());
        Ok(())
    }

    /// Delete the backing file; a file that is already gone is fine
    pub fn remove(&self) -> StoreResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
