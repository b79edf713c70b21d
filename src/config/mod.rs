//! Configuration layer for the restwire command.
//!
//! This module provides:
//! - CLI argument parsing ([`Cli`], [`Command`])
//! - TOML configuration file parsing ([`TomlConfig`])
//! - Validated configuration ([`ValidatedConfig`])
//! - Configuration file generation ([`write_default_config`])
//! - Default values ([`defaults`])
//!
//! # Priority
//!
//! Configuration values are resolved with the following priority (highest to lowest):
//!
//! 1. **Explicit CLI arguments** - Values explicitly passed via command line
//! 2. **TOML config file** - Values from the configuration file
//! 3. **Built-in defaults** - Hardcoded default values
//!
//! The URL has no default: it comes from the command line or `request.url`.
//!
//! Headers merge: TOML headers are applied first and a CLI header with the
//! same name replaces the TOML value. Expected status codes do not merge:
//! any `--expect` replaces `request.expect` entirely.
//!
//! Credentials come from exactly one source. Any CLI credential wins over
//! the file; a file that sets both `auth.bearer` and `auth.token_file` is
//! rejected.
//!
//! # Boolean Flag Semantics
//!
//! `--poll` uses OR semantics with `polling.enabled`: the flag only enables.
//!
//! # TOML-Only Options
//!
//! - `retry.max_delay` (default: 60s) - Maximum retry delay
//! - `retry.multiplier` (default: 2.0) - Exponential backoff multiplier
//! - `polling.codes` (default: 202) - Status codes that mean "still running"

mod cli;
pub mod defaults;
mod error;
mod toml;
mod validated;

#[cfg(test)]
mod toml_tests;
#[cfg(test)]
mod validated_tests;

pub use cli::{Cli, Command};
pub use error::{ConfigError, FileAccess, Setting};
pub use toml::{TomlConfig, default_config_template};
pub use validated::{Credentials, PollingConfig, ValidatedConfig, write_default_config};
