//! Desired trust store state.
//!
//! The desired state is a TOML file (default `/etc/cacert/cacert.toml`)
//! naming the CA certificates that must be trusted plus a handful of
//! toggles. See [`init::DEFAULT_CONFIG_TOML`] for an annotated example.

use cacert_common::error::ErrorCode;

pub mod desired;
pub mod init;

pub use desired::{validate_name, CertEnsure, DesiredCertificate, ReconciliationConfig};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<&ConfigError> for ErrorCode {
    fn from(e: &ConfigError) -> Self {
        match e {
            ConfigError::Io { .. } => ErrorCode::IoError,
            ConfigError::Parse(_) | ConfigError::Invalid(_) => ErrorCode::InvalidConfig,
        }
    }
}
