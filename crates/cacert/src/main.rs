pub(crate) mod cli;
mod commands;
mod format;

use std::process::ExitCode;

use clap::Parser;

use cacert_common::error::ErrorCode;
use cacert_config::ConfigError;
use cacert_reconcile::ReconcileError;
use cacert_truststore::TrustStoreError;

use cli::{Cli, Command};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => cli.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _log_guards = match init_logging(env_filter, cli.log_file.as_deref()) {
        Ok(guards) => guards,
        Err(e) => {
            eprintln!("Error: cannot initialize logging: {e:#}");
            return exit_code(ErrorCode::IoError.exit_code());
        }
    };

    match run(&cli) {
        Ok(code) => exit_code(code),
        Err(e) => {
            let code = error_code(&e);
            tracing::debug!(?code, "Command failed");
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({ "error": code, "message": format!("{e:#}") })
                );
            } else {
                eprintln!("Error: {e:#}");
            }
            exit_code(code.exit_code())
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    match &cli.command {
        Command::Version => {
            commands::version(cli.json);
            Ok(0)
        }
        Command::Init { force } => commands::init(cli, *force),
        Command::Profile(args) => commands::profile(cli, args),
        Command::Apply(args) => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(commands::apply(cli, args))
        }
    }
}

/// Map an error chain to its machine-readable code.
fn error_code(err: &anyhow::Error) -> ErrorCode {
    if let Some(e) = err.downcast_ref::<ConfigError>() {
        return e.into();
    }
    if let Some(e) = err.downcast_ref::<ReconcileError>() {
        return e.into();
    }
    if let Some(e) = err.downcast_ref::<TrustStoreError>() {
        return e.into();
    }
    if err.downcast_ref::<std::io::Error>().is_some() {
        return ErrorCode::IoError;
    }
    ErrorCode::Internal
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

/// Install the subscriber for this run: stderr always, plus an append-only
/// file when `--log-file` is set. The returned guards flush on drop.
fn init_logging(
    env_filter: tracing_subscriber::EnvFilter,
    log_file: Option<&std::path::Path>,
) -> anyhow::Result<Vec<tracing_appender::non_blocking::WorkerGuard>> {
    use tracing_subscriber::prelude::*;

    // stdout is reserved for command output.
    let (stderr_writer, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
    let mut guards = vec![stderr_guard];

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            let (file_writer, file_guard) = tracing_appender::non_blocking(file);
            guards.push(file_guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(file_writer),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(stderr_writer),
        )
        .with(file_layer)
        .init();

    Ok(guards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn config_errors_exit_with_config_code() {
        let err = anyhow::Error::new(ConfigError::Invalid("bad".to_string()))
            .context("loading /etc/cacert/cacert.toml");
        assert_eq!(error_code(&err), ErrorCode::InvalidConfig);
        assert_eq!(error_code(&err).exit_code(), 2);
    }

    #[test]
    fn unsupported_platform_exits_with_its_own_code() {
        let err: anyhow::Error = ReconcileError::Platform(TrustStoreError::UnsupportedPlatform {
            family: "Solaris".to_string(),
            version: "10".to_string(),
        })
        .into();
        assert_eq!(error_code(&err).exit_code(), 3);
    }

    #[test]
    fn io_and_unknown_errors() {
        let io: anyhow::Error = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
        assert_eq!(error_code(&io), ErrorCode::IoError);
        let other = anyhow::anyhow!("something else");
        assert_eq!(error_code(&other), ErrorCode::Internal);

        let reported: Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::Other, "full"));
        let err = reported.context("cannot write report").unwrap_err();
        assert_eq!(error_code(&err), ErrorCode::IoError);
    }
}
