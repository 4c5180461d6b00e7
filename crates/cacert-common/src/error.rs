use serde::{Deserialize, Serialize};

/// Machine-readable error codes shared by every crate in the workspace.
/// Serialized into JSON output and reports; mapped to process exit codes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidConfig,
    UnsupportedPlatform,
    PackageFailed,
    DirectoryFailed,
    CertificateFailed,
    CommandFailed,
    CommandTimeout,
    GuardCheckFailed,
    SourceUnavailable,
    ChecksumMismatch,
    IoError,
    Internal,
}

impl ErrorCode {
    /// Suggested process exit code for this error.
    ///
    /// Per-resource failures inside an otherwise completed pass all share
    /// the "partial" code so schedulers can tell them apart from aborts.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidConfig => 2,
            Self::UnsupportedPlatform => 3,
            Self::PackageFailed => 4,
            Self::DirectoryFailed
            | Self::CertificateFailed
            | Self::CommandFailed
            | Self::CommandTimeout
            | Self::GuardCheckFailed
            | Self::SourceUnavailable
            | Self::ChecksumMismatch => 5,
            Self::Internal => 70,
            Self::IoError => 74,
        }
    }
}
