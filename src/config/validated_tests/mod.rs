//! Tests for validated configuration.

use http::{Method, StatusCode};

use super::{ConfigError, FileAccess, Setting};
use super::cli::Cli;
use super::toml::TomlConfig;
use super::validated::{Credentials, ValidatedConfig};

/// Helper to create CLI args from a slice
fn cli(args: &[&str]) -> Cli {
    let mut full_args = vec!["restwire"];
    full_args.extend(args);
    Cli::parse_from_iter(full_args)
}

/// Helper to parse TOML config
fn toml(content: &str) -> TomlConfig {
    TomlConfig::parse(content).unwrap()
}

mod runtime_tests;
