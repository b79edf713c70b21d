//! Validated configuration after merging CLI and TOML sources.
//!
//! This module contains the final, validated configuration that is used
//! by the application. All validation is performed during construction.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, StatusCode};
use url::Url;

use crate::pipeline::RetryPolicy;

use super::cli::Cli;
use super::defaults;
use super::error::{ConfigError, FileAccess, Setting};
use super::toml::TomlConfig;

/// Where the request's credentials come from.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Send no Authorization header
    None,
    /// A literal bearer token
    Bearer(String),
    /// A JSON token file, read at run time
    TokenFile(PathBuf),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Self::TokenFile(path) => f.debug_tuple("TokenFile").field(path).finish(),
        }
    }
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Bearer(_) => f.write_str("bearer"),
            Self::TokenFile(path) => write!(f, "token file {}", path.display()),
        }
    }
}

/// Long-running operation polling settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingConfig {
    /// Whether accepted operations are polled at all
    pub enabled: bool,
    /// Delay between polls without a `Retry-After` hint
    pub delay: Duration,
    /// Total polling budget
    pub duration: Duration,
    /// Status codes that mean "still running"
    pub codes: Vec<StatusCode>,
}

/// Fully validated configuration ready for use by the application.
///
/// This struct represents a complete, validated configuration where all
/// required fields are present and all values have been validated.
///
/// # Construction
///
/// Use [`ValidatedConfig::from_raw`] to create from CLI args and optional TOML config.
/// The function validates all inputs and returns errors for invalid configurations.
#[derive(Debug)]
pub struct ValidatedConfig {
    /// Request URL (required)
    pub url: Url,

    /// HTTP method
    pub method: Method,

    /// HTTP headers
    pub headers: HeaderMap,

    /// Request body
    pub body: Option<String>,

    /// Status codes accepted as success
    pub expect: Vec<StatusCode>,

    /// Client request id to send
    pub client_request_id: Option<String>,

    /// Credentials source
    pub credentials: Credentials,

    /// Retry policy for failed attempts
    pub retry_policy: RetryPolicy,

    /// Polling settings
    pub polling: PollingConfig,

    /// Verbose logging enabled
    pub verbose: bool,
}

impl fmt::Display for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Config {{ {} {}, headers: {}, body: {}B, auth: {}, retry: {}x/{}s, polling: {} }}",
            self.method,
            self.url,
            self.headers.len(),
            self.body.as_ref().map_or(0, String::len),
            self.credentials,
            self.retry_policy.max_attempts,
            self.retry_policy.initial_delay.as_secs(),
            if self.polling.enabled {
                format!(
                    "every {}s for {}s",
                    self.polling.delay.as_secs(),
                    self.polling.duration.as_secs()
                )
            } else {
                "off".to_string()
            },
        )
    }
}

impl ValidatedConfig {
    /// Creates a validated configuration from CLI arguments and optional TOML config.
    ///
    /// CLI arguments take precedence over TOML config values.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The URL is missing or invalid
    /// - The method, a header, or a status code is invalid
    /// - Both a bearer token and a token file are configured in the file
    /// - Retry or polling durations are zero or inconsistent
    pub fn from_raw(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Self, ConfigError> {
        let url = Self::resolve_url(cli, toml)?;
        let method = Self::resolve_method(cli, toml)?;
        let headers = Self::resolve_headers(cli, toml)?;
        let body = cli
            .data
            .clone()
            .or_else(|| toml.and_then(|t| t.request.data.clone()));
        let expect = Self::resolve_expect(cli, toml)?;
        let client_request_id = cli
            .client_request_id
            .clone()
            .or_else(|| toml.and_then(|t| t.request.client_request_id.clone()));
        let credentials = Self::resolve_credentials(cli, toml)?;
        let retry_policy = Self::build_retry_policy(cli, toml)?;
        let polling = Self::resolve_polling(cli, toml)?;

        Ok(Self {
            url,
            method,
            headers,
            body,
            expect,
            client_request_id,
            credentials,
            retry_policy,
            polling,
            verbose: cli.verbose,
        })
    }

    /// Loads and merges configuration from CLI and optional config file.
    ///
    /// If `cli.config` is set, loads the TOML file from that path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file cannot be read or parsed
    /// - The merged configuration is invalid
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let toml = if let Some(ref path) = cli.config {
            Some(TomlConfig::load(path)?)
        } else {
            None
        };

        Self::from_raw(cli, toml.as_ref())
    }

    fn resolve_url(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Url, ConfigError> {
        // CLI takes precedence
        let url_str = cli
            .url
            .as_deref()
            .or_else(|| toml.and_then(|t| t.request.url.as_deref()))
            .ok_or_else(|| {
                ConfigError::missing(
                    Setting::Url,
                    "Pass the URL as an argument or set it in the config file.",
                )
            })?;

        Url::parse(url_str).map_err(|e| ConfigError::invalid(Setting::Url, url_str, e))
    }

    fn resolve_method(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Method, ConfigError> {
        // Priority: CLI explicit > TOML > default
        let method_str = cli
            .method
            .as_deref()
            .or_else(|| toml.and_then(|t| t.request.method.as_deref()))
            .unwrap_or(defaults::METHOD);

        method_str
            .to_ascii_uppercase()
            .parse::<Method>()
            .map_err(|_| ConfigError::invalid(Setting::Method, method_str, "not an HTTP method"))
    }

    fn resolve_headers(cli: &Cli, toml: Option<&TomlConfig>) -> Result<HeaderMap, ConfigError> {
        let mut headers = HeaderMap::new();

        // Add TOML headers first (CLI can override)
        if let Some(toml) = toml {
            for (name, value) in &toml.request.headers {
                let header_name = parse_header_name(name)?;
                let header_value = parse_header_value(name, value)?;
                headers.insert(header_name, header_value);
            }
        }

        for header_str in &cli.headers {
            let (name, value) = parse_header_string(header_str)?;
            let header_name = parse_header_name(&name)?;
            let header_value = parse_header_value(&name, &value)?;
            headers.insert(header_name, header_value);
        }

        Ok(headers)
    }

    fn resolve_expect(
        cli: &Cli,
        toml: Option<&TomlConfig>,
    ) -> Result<Vec<StatusCode>, ConfigError> {
        // CLI codes replace TOML codes entirely
        let codes: &[u16] = if !cli.expect.is_empty() {
            &cli.expect
        } else if let Some(t) = toml.filter(|t| !t.request.expect.is_empty()) {
            &t.request.expect
        } else {
            defaults::EXPECTED_STATUS_CODES
        };

        parse_status_codes(Setting::ExpectedStatus, codes)
    }

    fn resolve_credentials(
        cli: &Cli,
        toml: Option<&TomlConfig>,
    ) -> Result<Credentials, ConfigError> {
        if let Some(token) = &cli.bearer {
            return Ok(Credentials::Bearer(token.clone()));
        }
        if let Some(path) = &cli.token_file {
            return Ok(Credentials::TokenFile(path.clone()));
        }

        let Some(auth) = toml.map(|t| &t.auth) else {
            return Ok(Credentials::None);
        };
        match (&auth.bearer, &auth.token_file) {
            (Some(_), Some(_)) => Err(ConfigError::ConflictingAuth),
            (Some(token), None) => Ok(Credentials::Bearer(token.clone())),
            (None, Some(path)) => Ok(Credentials::TokenFile(path.clone())),
            (None, None) => Ok(Credentials::None),
        }
    }

    fn build_retry_policy(
        cli: &Cli,
        toml: Option<&TomlConfig>,
    ) -> Result<RetryPolicy, ConfigError> {
        let retry = toml.map(|t| &t.retry);

        // Priority: CLI explicit > TOML > default
        let max_attempts = cli
            .retry_max
            .or_else(|| retry.and_then(|r| r.max_attempts))
            .unwrap_or(defaults::RETRY_MAX_ATTEMPTS);

        let initial_delay_secs = cli
            .retry_delay
            .or_else(|| retry.and_then(|r| r.initial_delay))
            .unwrap_or(defaults::RETRY_INITIAL_DELAY_SECS);

        let max_delay_secs = retry
            .and_then(|r| r.max_delay)
            .unwrap_or(defaults::RETRY_MAX_DELAY_SECS);

        let multiplier = retry
            .and_then(|r| r.multiplier)
            .unwrap_or(defaults::RETRY_MULTIPLIER);

        if max_attempts == 0 {
            return Err(ConfigError::invalid(
                Setting::RetryAttempts,
                max_attempts,
                "must be greater than 0",
            ));
        }

        let initial_delay = positive_seconds(Setting::RetryDelay, initial_delay_secs)?;

        if multiplier < 1.0 || !multiplier.is_finite() {
            return Err(ConfigError::invalid(
                Setting::RetryMultiplier,
                multiplier,
                "must be a finite number of at least 1.0",
            ));
        }

        if max_delay_secs < initial_delay_secs {
            return Err(ConfigError::invalid(
                Setting::RetryMaxDelay,
                max_delay_secs,
                format!("must not be below the initial delay of {initial_delay_secs}s"),
            ));
        }

        Ok(RetryPolicy::new()
            .with_max_attempts(max_attempts)
            .with_initial_delay(initial_delay)
            .with_max_delay(Duration::from_secs(max_delay_secs))
            .with_multiplier(multiplier))
    }

    fn resolve_polling(
        cli: &Cli,
        toml: Option<&TomlConfig>,
    ) -> Result<PollingConfig, ConfigError> {
        let polling = toml.map(|t| &t.polling);

        // Flags only enable: true in either source wins
        let enabled = cli.poll || polling.is_some_and(|p| p.enabled);

        let delay = positive_seconds(
            Setting::PollingDelay,
            cli.polling_delay
                .or_else(|| polling.and_then(|p| p.delay))
                .unwrap_or(defaults::POLLING_DELAY_SECS),
        )?;

        let duration = positive_seconds(
            Setting::PollingDuration,
            cli.polling_duration
                .or_else(|| polling.and_then(|p| p.duration))
                .unwrap_or(defaults::POLLING_DURATION_SECS),
        )?;

        let codes = match polling.map(|p| p.codes.as_slice()) {
            Some(codes) if !codes.is_empty() => codes,
            _ => defaults::POLLING_STATUS_CODES,
        };

        Ok(PollingConfig {
            enabled,
            delay,
            duration,
            codes: parse_status_codes(Setting::PollingStatus, codes)?,
        })
    }
}

/// Writes the default configuration template to a file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let template = super::toml::default_config_template();
    std::fs::write(path, template).map_err(|e| ConfigError::file(FileAccess::Write, path, e))
}

// Helper functions

fn positive_seconds(setting: Setting, seconds: u64) -> Result<Duration, ConfigError> {
    if seconds == 0 {
        return Err(ConfigError::invalid(setting, seconds, "must be greater than 0"));
    }
    Ok(Duration::from_secs(seconds))
}

fn parse_status_codes(setting: Setting, codes: &[u16]) -> Result<Vec<StatusCode>, ConfigError> {
    codes
        .iter()
        .map(|&code| {
            StatusCode::from_u16(code)
                .map_err(|_| ConfigError::invalid(setting, code, "not a status code (100-999)"))
        })
        .collect()
}

fn parse_header_string(s: &str) -> Result<(String, String), ConfigError> {
    // Try "Key=Value" format first
    if let Some((name, value)) = s.split_once('=') {
        return Ok((name.trim().to_string(), value.trim().to_string()));
    }

    // Try "Key: Value" format
    if let Some((name, value)) = s.split_once(':') {
        return Ok((name.trim().to_string(), value.trim().to_string()));
    }

    Err(ConfigError::invalid(
        Setting::Header,
        s,
        "expected 'Key=Value' or 'Key: Value'",
    ))
}

fn parse_header_name(name: &str) -> Result<HeaderName, ConfigError> {
    name.parse::<HeaderName>()
        .map_err(|e| ConfigError::invalid(Setting::Header, name, e))
}

fn parse_header_value(name: &str, value: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(value)
        .map_err(|e| ConfigError::invalid(Setting::Header, value, format!("{e} for '{name}'")))
}
