//! Legacy trust store enable step for platforms that ship it disabled.

use std::time::Duration;

use cacert_common::error::ErrorCode;
use cacert_truststore::{CommandRunner, CommandSpec, OsProfile};

use crate::error::{OperationFailure, Resource};

#[derive(Debug, Default)]
pub(crate) struct LegacyOutcome {
    pub ran: bool,
    pub failure: Option<OperationFailure>,
    /// Guard check trouble: logged, never fatal.
    pub warning: Option<OperationFailure>,
}

/// Run the enable command when the profile needs it and the check command
/// reports the store disabled.
///
/// A guard check that cannot run counts as "do not enable".
pub(crate) async fn enable_if_disabled(
    runner: &dyn CommandRunner,
    profile: &OsProfile,
    force: bool,
    timeout: Duration,
) -> LegacyOutcome {
    let Some(legacy) = &profile.legacy_enable else {
        if force {
            tracing::debug!(profile = %profile.name, "force_enable_legacy_trust has no effect on this platform");
        }
        return LegacyOutcome::default();
    };

    let check = CommandSpec::new(
        legacy.check_command.clone(),
        profile.update_command_path.clone(),
    )
    .with_timeout(timeout);
    let check_resource = || Resource::Command(check.to_string());

    let disabled = match runner.run(&check).await {
        Ok(out) if out.success => legacy.reports_disabled(&out.output),
        Ok(out) => {
            tracing::warn!(command = %check, output = %out.output.trim(), "Trust store check failed, skipping enable");
            return LegacyOutcome {
                warning: Some(OperationFailure::new(
                    check_resource(),
                    ErrorCode::GuardCheckFailed,
                    format!("check exited unsuccessfully: {}", out.output.trim()),
                )),
                ..LegacyOutcome::default()
            };
        }
        Err(e) => {
            tracing::warn!(command = %check, error = %e, "Trust store check could not run, skipping enable");
            return LegacyOutcome {
                warning: Some(OperationFailure::new(
                    check_resource(),
                    ErrorCode::GuardCheckFailed,
                    e.to_string(),
                )),
                ..LegacyOutcome::default()
            };
        }
    };

    if !disabled {
        tracing::debug!(command = %check, "Trust store already enabled");
        return LegacyOutcome::default();
    }

    let enable = CommandSpec::new(
        legacy.enable_command(force),
        profile.update_command_path.clone(),
    )
    .with_timeout(timeout);
    let resource = Resource::Command(enable.to_string());
    tracing::info!(command = %enable, "Enabling legacy trust store");

    match runner.run(&enable).await {
        Ok(out) if out.success => LegacyOutcome {
            ran: true,
            ..LegacyOutcome::default()
        },
        Ok(out) => {
            tracing::warn!(command = %enable, output = %out.output.trim(), "Enable failed");
            let message = match out.exit_code {
                Some(code) => format!("exit code {code}: {}", out.output.trim()),
                None => format!("terminated by signal: {}", out.output.trim()),
            };
            LegacyOutcome {
                ran: true,
                failure: Some(OperationFailure::new(
                    resource,
                    ErrorCode::CommandFailed,
                    message,
                )),
                warning: None,
            }
        }
        Err(e) => {
            tracing::warn!(command = %enable, error = %e, "Enable could not run");
            LegacyOutcome {
                failure: Some(OperationFailure::from_error(resource, &e)),
                ..LegacyOutcome::default()
            }
        }
    }
}
