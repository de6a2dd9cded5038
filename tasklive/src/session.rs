//! Persisted session credentials.
//!
//! The token and profile returned by login are written to a JSON file in
//! the user's config directory so a restart can resume the session
//! without prompting. A missing or unreadable file simply means no
//! session.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tasklive_proto::user::AuthUser;

/// Errors from persisting session state.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("failed to write session file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize session: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The persisted credential: bearer token plus the profile it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    pub user: AuthUser,
}

/// Loads and stores the credential file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store rooted at the platform config directory, e.g.
    /// `~/.config/tasklive/session.json` on Linux.
    ///
    /// # Errors
    /// Fails only when the platform config directory cannot be resolved.
    pub fn new() -> Result<Self, SessionError> {
        let dir = dirs::config_dir().ok_or(SessionError::NoConfigDir)?;
        Ok(Self {
            path: dir.join("tasklive").join("session.json"),
        })
    }

    /// Store backed by an explicit path. Used by tests.
    #[must_use]
    pub fn at_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Reads the persisted credential, if any.
    ///
    /// A missing file means no session. A corrupt file is treated the
    /// same way, with a warning, so a bad write never wedges startup.
    #[must_use]
    pub fn load(&self) -> Option<Credential> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), err = %e, "failed to read session file");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(credential) => Some(credential),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), err = %e, "corrupt session file ignored");
                None
            }
        }
    }

    /// Writes the credential, creating parent directories as needed.
    pub fn save(&self, credential: &Credential) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(credential)?;
        std::fs::write(&self.path, raw)?;
        tracing::debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    /// Removes the credential file. Missing file is not an error.
    pub fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "session cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::Io(e)),
        }
    }
}
