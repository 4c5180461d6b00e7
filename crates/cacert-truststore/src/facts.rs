//! OS identity facts consumed by the profile resolver.
//!
//! Facts are plain strings on purpose: an unrecognized family or an
//! unparseable version must survive until [`crate::profile::resolve`] so
//! the resulting error can name exactly what was rejected.

use std::path::Path;

use serde::{Deserialize, Serialize};

const OS_RELEASE_PATH: &str = "/etc/os-release";

/// OS family, short name and major version of the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsFacts {
    pub family: String,
    #[serde(default)]
    pub name: String,
    pub major: String,
}

impl OsFacts {
    pub fn new(family: impl Into<String>, name: impl Into<String>, major: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            name: name.into(),
            major: major.into(),
        }
    }

    /// Read facts from `/etc/os-release`.
    ///
    /// Only Linux distributions are detected; AIX and Solaris hosts must
    /// supply facts explicitly.
    pub fn detect() -> Result<Self, std::io::Error> {
        Self::detect_from(Path::new(OS_RELEASE_PATH))
    }

    pub fn detect_from(path: &Path) -> Result<Self, std::io::Error> {
        let raw = std::fs::read_to_string(path)?;
        let facts = Self::from_os_release(&raw);
        tracing::debug!(
            family = %facts.family,
            name = %facts.name,
            major = %facts.major,
            "Detected OS facts"
        );
        Ok(facts)
    }

    /// Map the contents of an os-release file to facts.
    pub fn from_os_release(raw: &str) -> Self {
        let mut id = String::new();
        let mut id_like = String::new();
        let mut version_id = String::new();

        for line in raw.lines() {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').trim_matches('\'');
            match key {
                "ID" => id = value.to_ascii_lowercase(),
                "ID_LIKE" => id_like = value.to_ascii_lowercase(),
                "VERSION_ID" => version_id = value.to_string(),
                _ => {}
            }
        }

        let family = std::iter::once(id.as_str())
            .chain(id_like.split_whitespace())
            .find_map(family_for_id)
            .map(str::to_string)
            .unwrap_or_else(|| id.clone());

        let major = version_id
            .split('.')
            .next()
            .unwrap_or_default()
            .to_string();

        Self {
            family,
            name: display_name(&id),
            major,
        }
    }
}

fn family_for_id(id: &str) -> Option<&'static str> {
    match id {
        "debian" | "ubuntu" => Some("Debian"),
        "rhel" | "centos" | "fedora" | "rocky" | "almalinux" | "ol" => Some("RedHat"),
        "arch" | "archlinux" => Some("Archlinux"),
        "suse" | "sles" => Some("Suse"),
        id if id.starts_with("opensuse") => Some("Suse"),
        _ => None,
    }
}

fn display_name(id: &str) -> String {
    match id {
        "rhel" => "RedHat".to_string(),
        "centos" => "CentOS".to_string(),
        "sles" => "SLES".to_string(),
        "ol" => "OracleLinux".to_string(),
        "almalinux" => "AlmaLinux".to_string(),
        id if id.starts_with("opensuse") => "OpenSuSE".to_string(),
        _ => {
            let mut chars = id.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}
