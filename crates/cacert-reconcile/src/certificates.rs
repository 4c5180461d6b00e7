//! Per-certificate sync.
//!
//! Certificates are independent of each other: they run concurrently and
//! one failing never stops the rest.

use futures_util::future::join_all;
use sha2::{Digest, Sha256};

use cacert_common::error::ErrorCode;
use cacert_config::{validate_name, CertEnsure, DesiredCertificate, ReconciliationConfig};
use cacert_truststore::profile::CERT_FILE_MODE;
use cacert_truststore::{FileSpec, Filesystem, OsProfile, SourceResolver};

use crate::error::{OperationFailure, Resource};

/// Outcome for one certificate: `Ok(true)` when its file changed.
pub(crate) type CertificateOutcome = (String, Result<bool, OperationFailure>);

pub(crate) async fn sync_all(
    fs: &dyn Filesystem,
    sources: &dyn SourceResolver,
    profile: &OsProfile,
    config: &ReconciliationConfig,
) -> Vec<CertificateOutcome> {
    join_all(config.certificates.values().map(|cert| async move {
        let outcome = sync_one(fs, sources, profile, cert).await;
        match &outcome {
            Ok(true) => tracing::info!(certificate = %cert.name, ensure = ?cert.ensure, "Certificate updated"),
            Ok(false) => tracing::debug!(certificate = %cert.name, "Certificate in sync"),
            Err(f) => tracing::error!(certificate = %cert.name, error = %f.message, "Certificate failed"),
        }
        (cert.name.clone(), outcome)
    }))
    .await
}

async fn sync_one(
    fs: &dyn Filesystem,
    sources: &dyn SourceResolver,
    profile: &OsProfile,
    cert: &DesiredCertificate,
) -> Result<bool, OperationFailure> {
    let resource = || Resource::Certificate(cert.name.clone());
    validate_name(&cert.name).map_err(|e| {
        OperationFailure::new(resource(), ErrorCode::CertificateFailed, e.to_string())
    })?;
    let path = profile.cert_path(&cert.name);

    if cert.ensure == CertEnsure::Absent {
        return fs
            .remove_file(&path)
            .await
            .map_err(|e| OperationFailure::from_error(resource(), &e));
    }

    let source = cert.source.as_ref().ok_or_else(|| {
        OperationFailure::new(
            resource(),
            ErrorCode::CertificateFailed,
            "no source configured",
        )
    })?;
    let content = sources
        .fetch(source, cert.verify_https)
        .await
        .map_err(|e| OperationFailure::from_error(resource(), &e))?;

    if let Some(expected) = &cert.checksum {
        let actual = sha256_hex(&content);
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(OperationFailure::new(
                resource(),
                ErrorCode::ChecksumMismatch,
                format!("checksum mismatch for {source}: expected {expected}, got {actual}"),
            ));
        }
    }

    let spec = FileSpec {
        path,
        content,
        owner: profile.dir_owner.clone(),
        group: profile.dir_group.clone(),
        mode: CERT_FILE_MODE,
    };
    fs.ensure_file(&spec)
        .await
        .map_err(|e| OperationFailure::from_error(resource(), &e))
}

pub fn sha256_hex(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}
