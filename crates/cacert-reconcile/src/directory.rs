use std::collections::BTreeSet;

use cacert_config::{validate_name, CertEnsure, ReconciliationConfig};
use cacert_truststore::profile::mode_string;
use cacert_truststore::{DirectorySpec, Filesystem, OsProfile};

use crate::error::{OperationFailure, Resource};

/// Directory spec for the anchor directory.
///
/// With purging on, every entry that is not the file of a present
/// certificate is unmanaged, subdirectories included.
pub fn directory_spec(profile: &OsProfile, config: &ReconciliationConfig) -> DirectorySpec {
    let keep: BTreeSet<String> = config
        .certificates
        .values()
        .filter(|c| c.ensure == CertEnsure::Present && validate_name(&c.name).is_ok())
        .map(|c| profile.cert_file_name(&c.name))
        .collect();
    DirectorySpec {
        path: profile.trusted_cert_dir.clone(),
        owner: profile.dir_owner.clone(),
        group: profile.dir_group.clone(),
        mode: profile.dir_mode,
        purge: config.purge_unmanaged_cas,
        recurse: config.purge_unmanaged_cas,
        keep,
    }
}

pub(crate) async fn ensure(
    fs: &dyn Filesystem,
    profile: &OsProfile,
    config: &ReconciliationConfig,
) -> Result<bool, OperationFailure> {
    let spec = directory_spec(profile, config);
    match fs.ensure_directory(&spec).await {
        Ok(changed) => {
            if changed {
                tracing::info!(
                    path = %spec.path.display(),
                    mode = %mode_string(spec.mode),
                    purge = spec.purge,
                    "Trust directory updated"
                );
            }
            Ok(changed)
        }
        Err(e) => {
            tracing::error!(path = %spec.path.display(), error = %e, "Trust directory failed");
            Err(OperationFailure::from_error(Resource::Directory(spec.path), &e))
        }
    }
}
