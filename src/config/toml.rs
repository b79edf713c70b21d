//! TOML configuration file parsing.
//!
//! Defines the structure of the configuration file with serde.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{ConfigError, FileAccess};

/// Root configuration structure from TOML file.
///
/// All fields are optional to allow partial configuration
/// that can be merged with CLI arguments.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Request configuration section
    #[serde(default)]
    pub request: RequestSection,

    /// Credentials section
    #[serde(default)]
    pub auth: AuthSection,

    /// Retry policy configuration
    #[serde(default)]
    pub retry: RetrySection,

    /// Long-running operation polling configuration
    #[serde(default)]
    pub polling: PollingSection,
}

/// Request configuration section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestSection {
    /// Request URL
    pub url: Option<String>,

    /// HTTP method (default: GET)
    pub method: Option<String>,

    /// HTTP headers as key-value pairs
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Request body
    pub data: Option<String>,

    /// Accepted status codes
    #[serde(default)]
    pub expect: Vec<u16>,

    /// Client request id
    pub client_request_id: Option<String>,
}

/// Credentials section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthSection {
    /// Bearer token for Authorization header
    pub bearer: Option<String>,

    /// JSON token file
    pub token_file: Option<PathBuf>,
}

/// Retry policy configuration section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySection {
    /// Maximum number of attempts
    pub max_attempts: Option<u32>,

    /// Initial retry delay in seconds
    pub initial_delay: Option<u64>,

    /// Maximum retry delay in seconds
    pub max_delay: Option<u64>,

    /// Backoff multiplier
    pub multiplier: Option<f64>,
}

/// Polling configuration section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollingSection {
    /// Poll long-running operations
    #[serde(default)]
    pub enabled: bool,

    /// Seconds between polls without a Retry-After hint
    pub delay: Option<u64>,

    /// Total polling budget in seconds
    pub duration: Option<u64>,

    /// Status codes that mean "still running"
    #[serde(default)]
    pub codes: Vec<u16>,
}

impl TomlConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::file(FileAccess::Read, path, e))?;

        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }
}

/// Generates a default configuration file with comments.
#[must_use]
pub fn default_config_template() -> String {
    r#"# restwire configuration file

[request]
# Request URL (required unless passed on the command line)
# url = "https://management.example.com/subscriptions/sub/jobs?api-version=2024-01-01"

# HTTP method (default: GET, can be overridden by --method CLI flag)
# method = "PUT"

# HTTP headers
# [request.headers]
# Content-Type = "application/json"

# Request body
# data = '{"name": "nightly"}'

# Accepted status codes (default: 200, 201, 202, 204)
# expect = [200, 201]

# Client request id, echoed back by the service
# client_request_id = "00000000-0000-0000-0000-000000000000"

[auth]
# Bearer token for Authorization header
# bearer = "your-token-here"

# JSON token file (access_token, refresh_token, expires_on, ...)
# Use either bearer or token_file, not both
# token_file = "/home/me/.restwire/token.json"

[retry]
# Maximum number of attempts (default: 3)
# max_attempts = 3

# Initial retry delay in seconds (default: 5)
# initial_delay = 5

# Maximum retry delay in seconds (default: 60)
# max_delay = 60

# Backoff multiplier (default: 2.0)
# multiplier = 2.0

[polling]
# Poll long-running operations until they finish
# enabled = false

# Seconds between polls when the service sends no Retry-After (default: 60)
# delay = 60

# Total polling budget in seconds (default: 900)
# duration = 900

# Status codes that mean "still running" (default: 202)
# codes = [202]
"#
    .to_string()
}
