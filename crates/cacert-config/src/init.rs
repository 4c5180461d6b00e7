//! Default desired-state file.
//!
//! `cacert init` writes [`DEFAULT_CONFIG_TOML`] so operators start from an
//! annotated file instead of an empty one.

use std::path::Path;

use crate::ConfigError;

/// Default content for a freshly created cacert.toml.
pub const DEFAULT_CONFIG_TOML: &str = r#"# cacert desired trust store state

# Manage the CA bundle package (name defaults per platform).
install_package = true
# package_name = "ca-certificates"
# package_ensure = "installed"   # or "absent", or a version string

# Rebuild the trust store on every run, not only after changes.
always_update_certs = false

# Remove anchors from the trust directory that are not listed below.
purge_unmanaged_cas = false

# RedHat < 7 only: use `update-ca-trust force-enable`.
force_enable_legacy_trust = false

# Upper bound for every external command, in seconds.
command_timeout_secs = 300

# Skip detection and use these facts instead.
# [platform]
# family = "RedHat"
# name = "RedHat"
# major = "8"

# [certificates.corp-root]
# source = "/srv/pki/corp-root.pem"       # path, file:// or http(s):// URL
# checksum = "<sha256 hex>"
#
# [certificates.lab-root]
# text = """
# -----BEGIN CERTIFICATE-----
# ...
# -----END CERTIFICATE-----
# """
#
# [certificates.retired-root]
# ensure = "absent"
"#;

/// Write the default config to `path`.
///
/// Returns `Ok(false)` without touching the file when it already exists
/// and `force` is not set.
pub fn write_default_config(path: &Path, force: bool) -> Result<bool, ConfigError> {
    if path.exists() && !force {
        tracing::debug!(path = %path.display(), "Config already present");
        return Ok(false);
    }

    let io_err = |source: std::io::Error| ConfigError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, DEFAULT_CONFIG_TOML).map_err(io_err)?;
    tracing::info!(path = %path.display(), "Created default config");
    Ok(true)
}
