//! Trust store rebuild trigger.
//!
//! Changes to the anchor directory and to certificate files are recorded
//! in a [`ChangeLedger`] while the pass runs. Once every file operation has
//! finished, the ledger is turned into a [`RebuildTrigger`], which runs the
//! platform's update command at most once. Firing consumes the trigger.

use std::collections::BTreeSet;
use std::time::Duration;

use cacert_common::error::ErrorCode;
use cacert_truststore::{CommandRunner, CommandSpec, OsProfile};

use crate::error::{OperationFailure, Resource};

/// Changes observed during a pass that require a rebuild.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChangeLedger {
    directory: bool,
    certificates: BTreeSet<String>,
}

impl ChangeLedger {
    pub fn record_directory(&mut self) {
        self.directory = true;
    }

    pub fn record_certificate(&mut self, name: impl Into<String>) {
        self.certificates.insert(name.into());
    }

    pub fn has_changes(&self) -> bool {
        self.directory || !self.certificates.is_empty()
    }
}

/// Why the trigger is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// `always_update_certs` is set.
    Forced,
    Changed,
}

#[derive(Debug)]
pub struct RebuildTrigger {
    reason: Option<TriggerReason>,
    changes: ChangeLedger,
}

impl RebuildTrigger {
    pub fn arm(changes: ChangeLedger, always_update: bool) -> Self {
        let reason = if always_update {
            Some(TriggerReason::Forced)
        } else if changes.has_changes() {
            Some(TriggerReason::Changed)
        } else {
            None
        };
        Self { reason, changes }
    }

    pub fn reason(&self) -> Option<TriggerReason> {
        self.reason
    }

    /// Run the update command if armed.
    ///
    /// Returns `None` when nothing needed rebuilding. Command output is only
    /// surfaced when the command fails.
    pub async fn fire(
        self,
        runner: &dyn CommandRunner,
        profile: &OsProfile,
        timeout: Duration,
    ) -> Option<Result<(), OperationFailure>> {
        let reason = self.reason?;
        let spec = CommandSpec::new(
            profile.update_command.clone(),
            profile.update_command_path.clone(),
        )
        .with_timeout(timeout);
        let resource = Resource::Command(spec.to_string());

        tracing::info!(
            command = %spec,
            ?reason,
            directory_changed = self.changes.directory,
            certificates = self.changes.certificates.len(),
            "Rebuilding trust store"
        );

        match runner.run(&spec).await {
            Ok(out) if out.success => {
                tracing::debug!(command = %spec, "Trust store rebuilt");
                Some(Ok(()))
            }
            Ok(out) => {
                let message = match out.exit_code {
                    Some(code) => format!("exit code {code}: {}", out.output.trim()),
                    None => format!("terminated by signal: {}", out.output.trim()),
                };
                tracing::warn!(command = %spec, output = %out.output.trim(), "Trust store rebuild failed");
                Some(Err(OperationFailure::new(resource, ErrorCode::CommandFailed, message)))
            }
            Err(e) => {
                tracing::warn!(command = %spec, error = %e, "Trust store rebuild failed");
                Some(Err(OperationFailure::from_error(resource, &e)))
            }
        }
    }
}
