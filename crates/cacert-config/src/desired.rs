use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use cacert_truststore::{CertSource, OsFacts, OsProfile, PackageEnsure};

use crate::ConfigError;

const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 300;

/// Whether a named certificate must be present in or absent from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertEnsure {
    #[default]
    Present,
    Absent,
}

/// One CA certificate the host should (or should no longer) trust.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredCertificate {
    /// Unique key; becomes the on-disk file stem.
    pub name: String,
    pub ensure: CertEnsure,
    /// Required when `ensure` is present.
    pub source: Option<CertSource>,
    /// Lowercase hex SHA-256 the resolved content must match.
    pub checksum: Option<String>,
    pub verify_https: bool,
}

impl DesiredCertificate {
    pub fn present(name: impl Into<String>, source: CertSource) -> Self {
        Self {
            name: name.into(),
            ensure: CertEnsure::Present,
            source: Some(source),
            checksum: None,
            verify_https: true,
        }
    }

    pub fn absent(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ensure: CertEnsure::Absent,
            source: None,
            checksum: None,
            verify_https: true,
        }
    }
}

/// The full desired state for one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationConfig {
    pub certificates: BTreeMap<String, DesiredCertificate>,
    pub install_package: bool,
    /// Overrides the profile's package name.
    pub package_name: Option<String>,
    pub package_ensure: PackageEnsure,
    pub always_update_certs: bool,
    pub purge_unmanaged_cas: bool,
    pub force_enable_legacy_trust: bool,
    /// Facts to use instead of detecting them.
    pub platform: Option<OsFacts>,
    pub command_timeout: Duration,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            certificates: BTreeMap::new(),
            install_package: true,
            package_name: None,
            package_ensure: PackageEnsure::Installed,
            always_update_certs: false,
            purge_unmanaged_cas: false,
            force_enable_legacy_trust: false,
            platform: None,
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
        }
    }
}

impl ReconciliationConfig {
    /// Load a config file. Relative source paths are taken relative to
    /// the file's directory.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_toml_str(&raw)?;

        if let Some(base) = path.parent() {
            for cert in config.certificates.values_mut() {
                if let Some(CertSource::Path(p)) = &mut cert.source {
                    if p.is_relative() {
                        *p = base.join(&*p);
                    }
                }
            }
        }

        tracing::debug!(
            path = %path.display(),
            certificates = config.certificates.len(),
            "Loaded desired state"
        );
        Ok(config)
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        toml.parse()
    }

    /// Insert or replace a certificate, keyed by its name.
    pub fn with_certificate(mut self, cert: DesiredCertificate) -> Self {
        self.certificates.insert(cert.name.clone(), cert);
        self
    }

    /// Package to manage: the configured override or the profile default.
    pub fn package_name<'a>(&'a self, profile: &'a OsProfile) -> &'a str {
        self.package_name.as_deref().unwrap_or(&profile.package_name)
    }
}

impl FromStr for ReconciliationConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: RawConfig = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        raw.validate()
    }
}

// ── On-disk shape ───────────────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_SECS
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    certificates: BTreeMap<String, RawCertificate>,
    #[serde(default = "default_true")]
    install_package: bool,
    #[serde(default)]
    package_name: Option<String>,
    #[serde(default)]
    package_ensure: PackageEnsure,
    #[serde(default)]
    always_update_certs: bool,
    #[serde(default, alias = "purge_unmanaged_CAs")]
    purge_unmanaged_cas: bool,
    #[serde(default, alias = "force_enable")]
    force_enable_legacy_trust: bool,
    #[serde(default)]
    platform: Option<OsFacts>,
    #[serde(default = "default_timeout")]
    command_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCertificate {
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    ensure: CertEnsure,
    #[serde(default)]
    checksum: Option<String>,
    #[serde(default = "default_true")]
    verify_https: bool,
}

impl RawConfig {
    fn validate(self) -> Result<ReconciliationConfig, ConfigError> {
        if let Some(name) = &self.package_name {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("package_name must not be empty".to_string()));
            }
        }
        if self.command_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "command_timeout_secs must be > 0".to_string(),
            ));
        }

        let mut certificates = BTreeMap::new();
        for (name, raw) in self.certificates {
            let cert = raw.validate(&name)?;
            certificates.insert(name, cert);
        }

        Ok(ReconciliationConfig {
            certificates,
            install_package: self.install_package,
            package_name: self.package_name,
            package_ensure: self.package_ensure,
            always_update_certs: self.always_update_certs,
            purge_unmanaged_cas: self.purge_unmanaged_cas,
            force_enable_legacy_trust: self.force_enable_legacy_trust,
            platform: self.platform,
            command_timeout: Duration::from_secs(self.command_timeout_secs),
        })
    }
}

impl RawCertificate {
    fn validate(self, name: &str) -> Result<DesiredCertificate, ConfigError> {
        validate_name(name)?;
        let invalid = |msg: &str| ConfigError::Invalid(format!("certificate {name:?}: {msg}"));

        let source = match (self.source, self.text) {
            (Some(_), Some(_)) => return Err(invalid("set either source or text, not both")),
            (Some(source), None) => Some(CertSource::parse(&source).map_err(|e| invalid(e.as_str()))?),
            (None, Some(text)) => Some(CertSource::Inline(text)),
            (None, None) => None,
        };
        if self.ensure == CertEnsure::Present && source.is_none() {
            return Err(invalid("source or text is required"));
        }

        let checksum = self
            .checksum
            .map(|c| {
                let c = c.trim().to_ascii_lowercase();
                if c.len() == 64 && c.chars().all(|ch| ch.is_ascii_hexdigit()) {
                    Ok(c)
                } else {
                    Err(invalid("checksum must be a hex SHA-256 digest"))
                }
            })
            .transpose()?;

        Ok(DesiredCertificate {
            name: name.to_string(),
            ensure: self.ensure,
            source,
            checksum,
            verify_https: self.verify_https,
        })
    }
}

/// Reject certificate names that cannot serve as a file stem inside the
/// anchor directory: empty, `.`, `..`, or containing a separator or NUL.
pub fn validate_name(name: &str) -> Result<(), ConfigError> {
    let bad = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\0');
    if bad {
        return Err(ConfigError::Invalid(format!(
            "certificate name {name:?} cannot be used as a file name"
        )));
    }
    Ok(())
}
