//! Configuration errors.
//!
//! Validation failures carry the [`Setting`] they reject, so a message can
//! name the TOML key (or matching flag) the user has to fix.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// A configuration value that can be missing or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    /// `request.url`, or the positional URL
    Url,
    /// `request.method`, or `--method`
    Method,
    /// `request.headers`, or `--header`
    Header,
    /// `request.expect`, or `--expect`
    ExpectedStatus,
    /// `retry.max_attempts`, or `--retry-max`
    RetryAttempts,
    /// `retry.initial_delay`, or `--retry-delay`
    RetryDelay,
    /// `retry.max_delay`
    RetryMaxDelay,
    /// `retry.multiplier`
    RetryMultiplier,
    /// `polling.delay`, or `--polling-delay`
    PollingDelay,
    /// `polling.duration`, or `--polling-duration`
    PollingDuration,
    /// `polling.codes`
    PollingStatus,
}

impl Setting {
    /// The TOML key of the setting.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Url => "request.url",
            Self::Method => "request.method",
            Self::Header => "request.headers",
            Self::ExpectedStatus => "request.expect",
            Self::RetryAttempts => "retry.max_attempts",
            Self::RetryDelay => "retry.initial_delay",
            Self::RetryMaxDelay => "retry.max_delay",
            Self::RetryMultiplier => "retry.multiplier",
            Self::PollingDelay => "polling.delay",
            Self::PollingDuration => "polling.duration",
            Self::PollingStatus => "polling.codes",
        }
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// How a config file was being accessed when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAccess {
    /// Loading `--config`
    Read,
    /// Writing the `init` template
    Write,
}

impl fmt::Display for FileAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Write => "write",
        })
    }
}

/// Error loading, merging, or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read or written.
    #[error("could not {access} config file '{}': {source}", path.display())]
    File {
        /// Read or write
        access: FileAccess,
        /// Path to the config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The config file is not valid TOML or has unknown keys.
    #[error("config file is not valid: {0}")]
    Toml(#[from] toml::de::Error),

    /// No source provided a required setting.
    #[error("{setting} is not set. {hint}")]
    Missing {
        /// The missing setting
        setting: Setting,
        /// How to provide it
        hint: &'static str,
    },

    /// A setting has a value that cannot be used.
    #[error("{setting} = '{value}' rejected: {reason}")]
    Invalid {
        /// The rejected setting
        setting: Setting,
        /// The rejected text
        value: String,
        /// What is wrong with it
        reason: String,
    },

    /// The file sets both `auth.bearer` and `auth.token_file`.
    #[error("auth.bearer and auth.token_file cannot both be set")]
    ConflictingAuth,
}

impl ConfigError {
    /// Creates a [`ConfigError::Missing`].
    #[must_use]
    pub const fn missing(setting: Setting, hint: &'static str) -> Self {
        Self::Missing { setting, hint }
    }

    /// Creates a [`ConfigError::Invalid`].
    pub fn invalid(setting: Setting, value: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Self::Invalid {
            setting,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Creates a [`ConfigError::File`].
    #[must_use]
    pub fn file(access: FileAccess, path: &Path, source: io::Error) -> Self {
        Self::File {
            access,
            path: path.to_path_buf(),
            source,
        }
    }

    /// The setting this error is about, if it is about one.
    #[must_use]
    pub const fn setting(&self) -> Option<Setting> {
        match self {
            Self::Missing { setting, .. } | Self::Invalid { setting, .. } => Some(*setting),
            Self::File { .. } | Self::Toml(_) | Self::ConflictingAuth => None,
        }
    }
}
