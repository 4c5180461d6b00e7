//! Reconciliation error types.
//!
//! Only two things abort a pass: an unsupported platform (before anything
//! is touched) and a package failure. Everything else is recorded as an
//! [`OperationFailure`] against the resource it concerned, and the pass
//! carries on with whatever does not depend on that resource.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use cacert_common::error::ErrorCode;
use cacert_truststore::TrustStoreError;

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Platform(TrustStoreError),

    #[error("package {name}: {source}")]
    Package {
        name: String,
        #[source]
        source: TrustStoreError,
    },
}

impl From<&ReconcileError> for ErrorCode {
    fn from(e: &ReconcileError) -> Self {
        match e {
            ReconcileError::Platform(inner) => ErrorCode::from(inner),
            ReconcileError::Package { .. } => ErrorCode::PackageFailed,
        }
    }
}

/// The resource an operation acted on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Resource {
    Package(String),
    Directory(PathBuf),
    Certificate(String),
    Command(String),
}

impl Resource {
    fn default_code(&self) -> ErrorCode {
        match self {
            Self::Package(_) => ErrorCode::PackageFailed,
            Self::Directory(_) => ErrorCode::DirectoryFailed,
            Self::Certificate(_) => ErrorCode::CertificateFailed,
            Self::Command(_) => ErrorCode::CommandFailed,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Package(name) => write!(f, "package {name}"),
            Self::Directory(path) => write!(f, "directory {}", path.display()),
            Self::Certificate(name) => write!(f, "certificate {name}"),
            Self::Command(cmd) => write!(f, "command `{cmd}`"),
        }
    }
}

/// A non-fatal failure of one operation within a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationFailure {
    pub resource: Resource,
    pub code: ErrorCode,
    pub message: String,
}

impl OperationFailure {
    pub fn new(resource: Resource, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            resource,
            code,
            message: message.into(),
        }
    }

    /// Plain I/O errors take the resource's own code so reports say
    /// which kind of operation failed.
    pub fn from_error(resource: Resource, err: &TrustStoreError) -> Self {
        let code = match ErrorCode::from(err) {
            ErrorCode::IoError => resource.default_code(),
            code => code,
        };
        Self::new(resource, code, err.to_string())
    }
}

impl fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.resource, self.message)
    }
}
