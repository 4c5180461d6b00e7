//! Platform trust store knowledge and host collaborators for cacert.
//!
//! This crate answers two questions for the reconciliation engine:
//!
//! - **Where and how** does this OS keep its trusted CA anchors? See
//!   [`profile::resolve`], which maps OS facts to an [`OsProfile`].
//! - **How do we touch the host?** The engine talks to the machine only
//!   through four traits: [`Filesystem`], [`PackageManager`],
//!   [`CommandRunner`] and [`SourceResolver`]. Each has a host
//!   implementation here; tests substitute in-memory fakes.
//!
//! Host operations typically require root. Every collaborator reports
//! whether it changed anything so the engine can decide whether the trust
//! store needs rebuilding.

use cacert_common::error::ErrorCode;

pub mod command;
pub mod facts;
pub mod filesystem;
pub mod package;
pub mod profile;
pub mod source;

pub use command::{CommandOutput, CommandRunner, CommandSpec, HostCommands};
pub use facts::OsFacts;
#[cfg(unix)]
pub use filesystem::HostFilesystem;
pub use filesystem::{DirectorySpec, FileSpec, Filesystem};
pub use package::{HostPackages, PackageEnsure, PackageManager, PackageTool};
pub use profile::{CertExtension, LegacyEnable, OsFamily, OsProfile};
pub use source::{CertSource, HostSources, SourceResolver};

#[derive(Debug, thiserror::Error)]
pub enum TrustStoreError {
    #[error("Unsupported osfamily ({family}) or unsupported version ({version})")]
    UnsupportedPlatform { family: String, version: String },

    #[error("command not found in search path: {0}")]
    CommandNotFound(String),

    #[error("command `{command}` timed out after {secs}s")]
    CommandTimeout { command: String, secs: u64 },

    #[error("command failed: {0}")]
    CommandFailed(String),

    #[error("unknown {kind}: {name}")]
    UnknownPrincipal { kind: &'static str, name: String },

    #[error("source unavailable: {0}")]
    Source(String),

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<&TrustStoreError> for ErrorCode {
    fn from(e: &TrustStoreError) -> Self {
        match e {
            TrustStoreError::UnsupportedPlatform { .. } => Self::UnsupportedPlatform,
            TrustStoreError::CommandNotFound(_)
            | TrustStoreError::CommandFailed(_)
            | TrustStoreError::NotSupported(_) => Self::CommandFailed,
            TrustStoreError::CommandTimeout { .. } => Self::CommandTimeout,
            TrustStoreError::UnknownPrincipal { .. } => Self::DirectoryFailed,
            TrustStoreError::Source(_) => Self::SourceUnavailable,
            TrustStoreError::Io(_) => Self::IoError,
        }
    }
}
