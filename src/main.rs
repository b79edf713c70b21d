//! restwire: send one REST request through the middleware pipeline.
//!
//! The response body goes to stdout; logs and errors go to stderr.

use std::path::Path;
use std::process::ExitCode;

use restwire::config::{Cli, Command, ConfigError, ValidatedConfig, write_default_config};

mod app;
mod run;

use app::{exit_code, print_config_hint, setup_tracing};

/// Why the command stopped early.
enum Failure {
    /// Bad flags or config file. Nothing was sent.
    Config(ConfigError),
    /// The request was attempted and failed. Already logged.
    Runtime,
}

/// Excluded from coverage: it only wires the testable pieces together.
#[cfg(not(tarpaulin_include))]
fn main() -> ExitCode {
    let cli = Cli::parse_args();

    let outcome = match &cli.command {
        Some(Command::Init { output }) => write_template(output),
        None => ValidatedConfig::load(&cli)
            .map_err(Failure::Config)
            .and_then(send),
    };

    match outcome {
        Ok(()) => exit_code::SUCCESS,
        Err(Failure::Config(error)) => {
            eprintln!("restwire: {error}");
            print_config_hint(&error);
            exit_code::CONFIG_ERROR
        }
        Err(Failure::Runtime) => exit_code::runtime_error(),
    }
}

fn write_template(output: &Path) -> Result<(), Failure> {
    write_default_config(output).map_err(Failure::Config)?;
    println!("Configuration template written to: {}", output.display());
    Ok(())
}

/// Sets up logging, then drives [`run::execute`] on a fresh runtime.
#[cfg(not(tarpaulin_include))]
fn send(config: ValidatedConfig) -> Result<(), Failure> {
    setup_tracing(config.verbose);
    tracing::debug!("{config}");

    let runtime = tokio::runtime::Runtime::new().map_err(|e| {
        tracing::error!("cannot start the async runtime: {e}");
        Failure::Runtime
    })?;

    runtime.block_on(run::execute(config)).map_err(|e| {
        tracing::error!("{e}");
        Failure::Runtime
    })
}
