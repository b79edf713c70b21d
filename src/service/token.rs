//! Token file persistence.
//!
//! Tokens are stored as a JSON object whose numeric fields are strings on
//! the wire. Saving uses write-to-temp-then-rename so a reader never sees a
//! partially written file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::{Authorizer, PrepareDecorator, preparer};

/// An OAuth access token as persisted on disk.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Bearer credential
    #[serde(default)]
    pub access_token: String,
    /// Credential used to obtain a new access token
    #[serde(default)]
    pub refresh_token: String,
    /// Lifetime in seconds, as sent by the token endpoint
    #[serde(default)]
    pub expires_in: String,
    /// Expiry as seconds since the Unix epoch
    #[serde(default)]
    pub expires_on: String,
    /// Start of validity as seconds since the Unix epoch
    #[serde(default)]
    pub not_before: String,
    /// Resource the token grants access to
    #[serde(default)]
    pub resource: String,
    /// Usually `Bearer`
    #[serde(default)]
    pub token_type: String,
}

impl Token {
    /// Returns the expiry instant, if `expires_on` holds epoch seconds.
    #[must_use]
    pub fn expires(&self) -> Option<DateTime<Utc>> {
        let seconds = self.expires_on.trim().parse::<i64>().ok()?;
        DateTime::from_timestamp(seconds, 0)
    }

    /// Returns `true` if the token expires within `window` of `now`.
    ///
    /// A token with no readable expiry counts as expired.
    #[must_use]
    pub fn will_expire_in(&self, now: DateTime<Utc>, window: TimeDelta) -> bool {
        self.expires()
            .is_none_or(|expires| expires <= now + window)
    }

    /// Returns `true` if the token has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.will_expire_in(now, TimeDelta::zero())
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("expires_on", &self.expires_on)
            .field("not_before", &self.not_before)
            .field("resource", &self.resource)
            .field("token_type", &self.token_type)
            .finish()
    }
}

impl Authorizer for Token {
    fn with_authorization(&self) -> PrepareDecorator {
        preparer::with_bearer_authorization(&self.access_token)
    }
}

/// Errors from loading or saving a token file.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The file could not be opened or read.
    #[error("failed to open file ({}) while loading token: {source}", .path.display())]
    Open {
        /// Token file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file did not hold a token object.
    #[error("failed to decode contents of file ({}) into a token: {source}", .path.display())]
    Decode {
        /// Token file path
        path: PathBuf,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// The parent directory could not be created.
    #[error("failed to create directory ({}) to persist token: {source}", .path.display())]
    CreateDirectory {
        /// Directory path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The token could not be encoded.
    #[error("failed to encode token: {0}")]
    Encode(#[source] serde_json::Error),

    /// The temporary file could not be written.
    #[error("failed to write token to temp file ({}): {source}", .path.display())]
    WriteTemp {
        /// Temporary file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The temporary file could not be moved into place.
    #[error(
        "failed to move temporary token to desired output location. src={} dst={}: {source}",
        .from.display(),
        .to.display()
    )]
    Rename {
        /// Temporary file path
        from: PathBuf,
        /// Target path
        to: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Reads a token from the JSON file at `path`.
///
/// # Errors
///
/// Returns [`TokenError::Open`] if the file cannot be read and
/// [`TokenError::Decode`] if it is not a token object.
pub fn load_token(path: impl AsRef<Path>) -> Result<Token, TokenError> {
    let path = path.as_ref();
    let content = std::fs::read(path).map_err(|source| TokenError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&content).map_err(|source| TokenError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes `token` to `path`, creating the parent directory if needed.
///
/// The JSON is written to `{path}.tmp` and renamed over `path`.
///
/// # Errors
///
/// Returns the [`TokenError`] variant of the stage that failed.
pub fn save_token(path: impl AsRef<Path>, token: &Token) -> Result<(), TokenError> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| TokenError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    let content = serde_json::to_vec(token).map_err(TokenError::Encode)?;

    // Append .tmp instead of replacing the extension (token.json -> token.json.tmp)
    let temp_path = PathBuf::from(format!("{}.tmp", path.display()));
    std::fs::write(&temp_path, content).map_err(|source| TokenError::WriteTemp {
        path: temp_path.clone(),
        source,
    })?;

    std::fs::rename(&temp_path, path).map_err(|source| {
        // Best effort: the temp file is useless once the rename failed
        let _ = std::fs::remove_file(&temp_path);
        TokenError::Rename {
            from: temp_path.clone(),
            to: path.to_path_buf(),
            source,
        }
    })
}
