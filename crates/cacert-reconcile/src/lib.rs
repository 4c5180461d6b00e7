//! Trust store reconciliation engine.
//!
//! One pass converges the host toward a [`ReconciliationConfig`] in a fixed
//! order:
//!
//! 1. CA bundle package (fatal on failure)
//! 2. anchor directory, optionally purging unmanaged entries
//! 3. certificate files, concurrently
//! 4. legacy enable step, guarded by a check command
//! 5. one trust store rebuild, only if something above changed
//!
//! The engine touches the host only through the collaborator traits in
//! [`cacert_truststore`], bundled in [`Host`]. A second pass straight after
//! a successful one changes nothing and runs no rebuild.

use std::sync::Arc;

use chrono::Utc;

use cacert_config::ReconciliationConfig;
use cacert_truststore::{
    profile, CommandRunner, Filesystem, OsFacts, OsProfile, PackageManager, SourceResolver,
};

mod certificates;
pub mod directory;
pub mod error;
mod legacy;
mod package;
pub mod result;
pub mod trigger;

pub use certificates::sha256_hex;
pub use error::{OperationFailure, ReconcileError, Resource};
pub use result::ReconciliationResult;
pub use trigger::{ChangeLedger, RebuildTrigger, TriggerReason};

/// The collaborators a pass may use to touch the host.
#[derive(Clone)]
pub struct Host {
    pub filesystem: Arc<dyn Filesystem>,
    pub packages: Arc<dyn PackageManager>,
    pub commands: Arc<dyn CommandRunner>,
    pub sources: Arc<dyn SourceResolver>,
}

impl Host {
    /// Real collaborators for `profile`'s platform.
    #[cfg(unix)]
    pub fn system(
        profile: &OsProfile,
        config: &ReconciliationConfig,
    ) -> Result<Self, cacert_truststore::TrustStoreError> {
        use cacert_truststore::{
            HostCommands, HostFilesystem, HostPackages, HostSources, PackageTool,
        };

        let commands: Arc<dyn CommandRunner> = Arc::new(HostCommands::new());
        let packages = HostPackages::new(PackageTool::for_family(profile.family), commands.clone())
            .with_timeout(config.command_timeout);
        Ok(Self {
            filesystem: Arc::new(HostFilesystem::new()),
            packages: Arc::new(packages),
            commands,
            sources: Arc::new(HostSources::new()?),
        })
    }
}

pub struct Reconciler {
    profile: OsProfile,
    host: Host,
}

impl Reconciler {
    pub fn new(profile: OsProfile, host: Host) -> Self {
        Self { profile, host }
    }

    /// Resolve the profile for `facts`. An unsupported platform fails here,
    /// before any collaborator is used.
    pub fn for_facts(facts: &OsFacts, host: Host) -> Result<Self, ReconcileError> {
        let profile = profile::resolve(facts).map_err(ReconcileError::Platform)?;
        Ok(Self::new(profile, host))
    }

    pub fn profile(&self) -> &OsProfile {
        &self.profile
    }

    /// Run one reconciliation pass.
    ///
    /// Only a package failure is returned as `Err`. Directory, certificate,
    /// enable, and rebuild failures are collected in
    /// [`ReconciliationResult::failures`].
    pub async fn reconcile(
        &self,
        config: &ReconciliationConfig,
    ) -> Result<ReconciliationResult, ReconcileError> {
        let profile = &self.profile;
        let mut result = ReconciliationResult::started(Utc::now());
        tracing::info!(
            platform = %profile.name,
            family = %profile.family,
            dir = %profile.trusted_cert_dir.display(),
            certificates = config.certificates.len(),
            "Reconciling trust store"
        );

        if config.install_package {
            let name = config.package_name(profile);
            result.managed_package = Some(name.to_string());
            result.package_changed =
                package::ensure(&*self.host.packages, name, &config.package_ensure).await?;
        }

        let mut ledger = ChangeLedger::default();
        let directory_ready =
            match directory::ensure(&*self.host.filesystem, profile, config).await {
                Ok(changed) => {
                    if changed {
                        ledger.record_directory();
                    }
                    result.directory_changed = changed;
                    true
                }
                Err(failure) => {
                    result.failures.push(failure);
                    false
                }
            };

        if directory_ready {
            let outcomes = certificates::sync_all(
                &*self.host.filesystem,
                &*self.host.sources,
                profile,
                config,
            )
            .await;
            for (name, outcome) in outcomes {
                match outcome {
                    Ok(true) => {
                        ledger.record_certificate(name.clone());
                        result.certificates_changed.insert(name);
                    }
                    Ok(false) => {}
                    Err(failure) => result.failures.push(failure),
                }
            }
        } else {
            tracing::warn!("Skipping certificates and rebuild: trust directory unavailable");
        }

        let legacy = legacy::enable_if_disabled(
            &*self.host.commands,
            profile,
            config.force_enable_legacy_trust,
            config.command_timeout,
        )
        .await;
        result.legacy_enable_ran = legacy.ran;
        result.failures.extend(legacy.failure);
        result.warnings.extend(legacy.warning);

        if directory_ready {
            let trigger = RebuildTrigger::arm(ledger, config.always_update_certs);
            if let Some(outcome) = trigger
                .fire(&*self.host.commands, profile, config.command_timeout)
                .await
            {
                result.rebuild_triggered = true;
                if let Err(failure) = outcome {
                    result.failures.push(failure);
                }
            }
        }

        result.finished_at = Utc::now();
        tracing::info!(
            changed = result.changed(),
            certificates_changed = result.certificates_changed.len(),
            rebuild = result.rebuild_triggered,
            failures = result.failures.len(),
            "Reconciliation finished"
        );
        Ok(result)
    }
}
