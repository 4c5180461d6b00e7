use cacert_truststore::{PackageEnsure, PackageManager};

use crate::error::ReconcileError;

/// Converge the CA bundle package. Any failure aborts the pass.
pub(crate) async fn ensure(
    packages: &dyn PackageManager,
    name: &str,
    ensure: &PackageEnsure,
) -> Result<bool, ReconcileError> {
    let changed = packages
        .ensure_package(name, ensure)
        .await
        .map_err(|source| {
            tracing::error!(package = name, ensure = %ensure, error = %source, "Package operation failed");
            ReconcileError::Package {
                name: name.to_string(),
                source,
            }
        })?;
    if changed {
        tracing::info!(package = name, ensure = %ensure, "Package converged");
    } else {
        tracing::debug!(package = name, ensure = %ensure, "Package already in desired state");
    }
    Ok(changed)
}
