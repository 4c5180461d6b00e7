//! OS profile resolution.
//!
//! Every supported platform is one row in [`PROFILE_RULES`]. Rows are
//! tried in order and the first match wins; falling off the end of the
//! table is an [`TrustStoreError::UnsupportedPlatform`]. Defaults fill only
//! the fields a matched row leaves unset, so adding a platform is a pure
//! data change.

use std::fmt;
use std::path::PathBuf;

use serde::{Serialize, Serializer};

use crate::facts::OsFacts;
use crate::TrustStoreError;

const DEFAULT_OWNER: &str = "root";
const DEFAULT_GROUP: &str = "root";
const DEFAULT_DIR_MODE: u32 = 0o755;
const DEFAULT_UPDATE_COMMAND: &[&str] = &["update-ca-certificates"];
const DEFAULT_PACKAGE_NAME: &str = "ca-certificates";

/// Mode applied to every managed certificate file.
pub const CERT_FILE_MODE: u32 = 0o644;

/// Marker printed by the legacy check command while the store is off.
const LEGACY_DISABLED_MARKER: &str = "DISABLED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OsFamily {
    Debian,
    RedHat,
    Archlinux,
    Suse,
    #[serde(rename = "AIX")]
    Aix,
    Solaris,
}

impl OsFamily {
    /// Parse a family fact, ignoring case. `None` for anything unknown.
    pub fn parse(family: &str) -> Option<Self> {
        match family.trim().to_ascii_lowercase().as_str() {
            "debian" => Some(Self::Debian),
            "redhat" => Some(Self::RedHat),
            "archlinux" => Some(Self::Archlinux),
            "suse" => Some(Self::Suse),
            "aix" => Some(Self::Aix),
            "solaris" => Some(Self::Solaris),
            _ => None,
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Debian => "Debian",
            Self::RedHat => "RedHat",
            Self::Archlinux => "Archlinux",
            Self::Suse => "Suse",
            Self::Aix => "AIX",
            Self::Solaris => "Solaris",
        };
        f.write_str(s)
    }
}

/// File extension the platform's rebuild tooling picks up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CertExtension {
    Crt,
    Pem,
}

impl CertExtension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Crt => "crt",
            Self::Pem => "pem",
        }
    }
}

impl fmt::Display for CertExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit enable step for platforms whose CA package ships disabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegacyEnable {
    pub tool: String,
    pub check_command: Vec<String>,
    pub disabled_marker: String,
}

impl LegacyEnable {
    /// `<tool> enable`, or `<tool> force-enable` when forced.
    pub fn enable_command(&self, force: bool) -> Vec<String> {
        let verb = if force { "force-enable" } else { "enable" };
        vec![self.tool.clone(), verb.to_string()]
    }

    /// Whether check-command output says the store is disabled.
    pub fn reports_disabled(&self, output: &str) -> bool {
        output.contains(&self.disabled_marker)
    }
}

/// Everything the engine needs to know about a platform's trust store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OsProfile {
    pub family: OsFamily,
    pub name: String,
    pub major_version: Option<u32>,
    pub trusted_cert_dir: PathBuf,
    pub dir_owner: String,
    pub dir_group: String,
    #[serde(serialize_with = "serialize_mode")]
    pub dir_mode: u32,
    pub cert_file_extension: CertExtension,
    pub update_command: Vec<String>,
    pub update_command_path: Vec<PathBuf>,
    pub package_name: String,
    pub legacy_enable: Option<LegacyEnable>,
}

impl OsProfile {
    pub fn requires_legacy_enable(&self) -> bool {
        self.legacy_enable.is_some()
    }

    /// On-disk file name for a certificate: `<name>.<ext>`.
    pub fn cert_file_name(&self, name: &str) -> String {
        format!("{name}.{}", self.cert_file_extension)
    }

    pub fn cert_path(&self, name: &str) -> PathBuf {
        self.trusted_cert_dir.join(self.cert_file_name(name))
    }
}

/// Octal rendering used in logs and JSON output, e.g. `0755`.
pub fn mode_string(mode: u32) -> String {
    format!("{mode:04o}")
}

fn serialize_mode<S: Serializer>(mode: &u32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&mode_string(*mode))
}

// ── Rule table ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Versions {
    Any,
    AtMost(u32),
    AtLeast(u32),
}

impl Versions {
    fn matches(&self, major: Option<u32>) -> bool {
        match (self, major) {
            (Self::Any, _) => true,
            (Self::AtMost(max), Some(v)) => v <= *max,
            (Self::AtLeast(min), Some(v)) => v >= *min,
            (_, None) => false,
        }
    }
}

struct ProfileRule {
    family: OsFamily,
    versions: Versions,
    /// Restrict the row to one distribution name within the family.
    name: Option<&'static str>,
    trusted_cert_dir: &'static str,
    dir_group: Option<&'static str>,
    dir_mode: Option<u32>,
    update_command: Option<&'static [&'static str]>,
    package_name: Option<&'static str>,
    extension: CertExtension,
    /// Major versions below this need the legacy enable step.
    legacy_enable_below: Option<u32>,
}

impl ProfileRule {
    fn matches(&self, family: OsFamily, name: &str, major: Option<u32>) -> bool {
        if self.family != family || !self.versions.matches(major) {
            return false;
        }
        if self.legacy_enable_below.is_some() && major.is_none() {
            return false;
        }
        self.name
            .map_or(true, |wanted| wanted.eq_ignore_ascii_case(name.trim()))
    }
}

const PROFILE_RULES: &[ProfileRule] = &[
    ProfileRule {
        family: OsFamily::Debian,
        versions: Versions::Any,
        name: Some("Debian"),
        trusted_cert_dir: "/usr/local/share/ca-certificates",
        dir_group: Some("staff"),
        dir_mode: Some(0o2665),
        update_command: None,
        package_name: None,
        extension: CertExtension::Crt,
        legacy_enable_below: None,
    },
    ProfileRule {
        family: OsFamily::Debian,
        versions: Versions::Any,
        name: None,
        trusted_cert_dir: "/usr/local/share/ca-certificates",
        dir_group: Some("staff"),
        dir_mode: None,
        update_command: None,
        package_name: None,
        extension: CertExtension::Crt,
        legacy_enable_below: None,
    },
    ProfileRule {
        family: OsFamily::RedHat,
        versions: Versions::Any,
        name: None,
        trusted_cert_dir: "/etc/pki/ca-trust/source/anchors",
        dir_group: None,
        dir_mode: None,
        update_command: Some(&["update-ca-trust", "extract"]),
        package_name: None,
        extension: CertExtension::Crt,
        legacy_enable_below: Some(7),
    },
    ProfileRule {
        family: OsFamily::Archlinux,
        versions: Versions::Any,
        name: None,
        trusted_cert_dir: "/etc/ca-certificates/trust-source/anchors/",
        dir_group: None,
        dir_mode: None,
        update_command: Some(&["trust", "extract-compat"]),
        package_name: None,
        extension: CertExtension::Crt,
        legacy_enable_below: None,
    },
    ProfileRule {
        family: OsFamily::Suse,
        versions: Versions::AtMost(11),
        name: None,
        trusted_cert_dir: "/etc/ssl/certs",
        dir_group: None,
        dir_mode: None,
        update_command: Some(&["c_rehash"]),
        package_name: Some("openssl-certs"),
        extension: CertExtension::Pem,
        legacy_enable_below: None,
    },
    ProfileRule {
        family: OsFamily::Suse,
        versions: Versions::AtLeast(12),
        name: None,
        trusted_cert_dir: "/etc/pki/trust/anchors",
        dir_group: None,
        dir_mode: None,
        update_command: None,
        package_name: None,
        extension: CertExtension::Crt,
        legacy_enable_below: None,
    },
    ProfileRule {
        family: OsFamily::Aix,
        versions: Versions::Any,
        name: None,
        trusted_cert_dir: "/var/ssl/certs",
        dir_group: Some("system"),
        dir_mode: None,
        update_command: Some(&["/usr/bin/c_rehash"]),
        package_name: None,
        extension: CertExtension::Crt,
        legacy_enable_below: None,
    },
    ProfileRule {
        family: OsFamily::Solaris,
        versions: Versions::AtLeast(11),
        name: None,
        trusted_cert_dir: "/etc/certs/CA/",
        dir_group: Some("sys"),
        dir_mode: None,
        update_command: Some(&["/usr/sbin/svcadm", "restart", "/system/ca-certificates"]),
        package_name: None,
        extension: CertExtension::Pem,
        legacy_enable_below: None,
    },
];

/// Resolve the trust store profile for `facts`.
///
/// Fails with [`TrustStoreError::UnsupportedPlatform`] carrying the raw
/// family and version strings when no row matches.
pub fn resolve(facts: &OsFacts) -> Result<OsProfile, TrustStoreError> {
    let unsupported = || TrustStoreError::UnsupportedPlatform {
        family: facts.family.clone(),
        version: facts.major.clone(),
    };

    let family = OsFamily::parse(&facts.family).ok_or_else(unsupported)?;
    let major = parse_major(&facts.major);

    let rule = PROFILE_RULES
        .iter()
        .find(|rule| rule.matches(family, &facts.name, major))
        .ok_or_else(unsupported)?;

    let legacy_enable = match (rule.legacy_enable_below, major) {
        (Some(below), Some(v)) if v < below => Some(LegacyEnable {
            tool: "update-ca-trust".to_string(),
            check_command: vec!["update-ca-trust".to_string(), "check".to_string()],
            disabled_marker: LEGACY_DISABLED_MARKER.to_string(),
        }),
        _ => None,
    };

    let profile = OsProfile {
        family,
        name: facts.name.clone(),
        major_version: major,
        trusted_cert_dir: PathBuf::from(rule.trusted_cert_dir),
        dir_owner: DEFAULT_OWNER.to_string(),
        dir_group: rule.dir_group.unwrap_or(DEFAULT_GROUP).to_string(),
        dir_mode: rule.dir_mode.unwrap_or(DEFAULT_DIR_MODE),
        cert_file_extension: rule.extension,
        update_command: rule
            .update_command
            .unwrap_or(DEFAULT_UPDATE_COMMAND)
            .iter()
            .map(|s| s.to_string())
            .collect(),
        update_command_path: cacert_common::paths::command_search_path(),
        package_name: rule.package_name.unwrap_or(DEFAULT_PACKAGE_NAME).to_string(),
        legacy_enable,
    };

    tracing::debug!(
        family = %profile.family,
        dir = %profile.trusted_cert_dir.display(),
        legacy = profile.requires_legacy_enable(),
        "Resolved trust store profile"
    );
    Ok(profile)
}

fn parse_major(raw: &str) -> Option<u32> {
    raw.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn profile(family: &str, name: &str, major: &str) -> OsProfile {
        resolve(&OsFacts::new(family, name, major)).unwrap()
    }

    fn command(p: &OsProfile) -> String {
        p.update_command.join(" ")
    }

    #[test]
    fn debian_uses_staff_group_and_setgid_mode() {
        let p = profile("Debian", "Debian", "12");
        assert_eq!(p.trusted_cert_dir, Path::new("/usr/local/share/ca-certificates"));
        assert_eq!(p.dir_group, "staff");
        assert_eq!(p.dir_mode, 0o2665);
        assert_eq!(command(&p), "update-ca-certificates");
        assert_eq!(p.package_name, "ca-certificates");
        assert_eq!(p.cert_file_extension, CertExtension::Crt);
    }

    #[test]
    fn ubuntu_keeps_default_mode() {
        let p = profile("Debian", "Ubuntu", "22");
        assert_eq!(p.dir_group, "staff");
        assert_eq!(p.dir_mode, 0o755);
    }

    #[test]
    fn redhat_legacy_enable_below_seven() {
        let old = profile("RedHat", "RedHat", "6");
        assert_eq!(old.trusted_cert_dir, Path::new("/etc/pki/ca-trust/source/anchors"));
        assert_eq!(command(&old), "update-ca-trust extract");
        assert_eq!(old.dir_group, "root");
        let legacy = old.legacy_enable.as_ref().unwrap();
        assert_eq!(legacy.enable_command(false), vec!["update-ca-trust", "enable"]);
        assert_eq!(legacy.enable_command(true), vec!["update-ca-trust", "force-enable"]);
        assert_eq!(legacy.check_command, vec!["update-ca-trust", "check"]);

        let current = profile("RedHat", "CentOS", "7");
        assert!(!current.requires_legacy_enable());
    }

    #[test]
    fn legacy_marker_detection() {
        let p = profile("RedHat", "RedHat", "6");
        let legacy = p.legacy_enable.unwrap();
        assert!(legacy.reports_disabled("PEM/JAVA Status: DISABLED."));
        assert!(!legacy.reports_disabled("PEM/JAVA Status: ENABLED."));
    }

    #[test]
    fn archlinux_uses_trust_extract_compat() {
        let p = profile("Archlinux", "Archlinux", "");
        assert_eq!(
            p.trusted_cert_dir,
            Path::new("/etc/ca-certificates/trust-source/anchors/")
        );
        assert_eq!(command(&p), "trust extract-compat");
        assert_eq!(p.major_version, None);
    }

    #[test]
    fn suse_branches_on_major_version() {
        for major in ["10", "11"] {
            let p = profile("Suse", "SLES", major);
            assert_eq!(p.trusted_cert_dir, Path::new("/etc/ssl/certs"));
            assert_eq!(command(&p), "c_rehash");
            assert_eq!(p.package_name, "openssl-certs");
            assert_eq!(p.cert_file_name("ca1"), "ca1.pem");
        }
        for major in ["12", "15"] {
            let p = profile("Suse", "SLES", major);
            assert_eq!(p.trusted_cert_dir, Path::new("/etc/pki/trust/anchors"));
            assert_eq!(command(&p), "update-ca-certificates");
            assert_eq!(p.package_name, "ca-certificates");
            assert_eq!(p.cert_file_name("ca1"), "ca1.crt");
        }
    }

    #[test]
    fn aix_uses_system_group() {
        let p = profile("AIX", "AIX", "7");
        assert_eq!(p.trusted_cert_dir, Path::new("/var/ssl/certs"));
        assert_eq!(p.dir_group, "system");
        assert_eq!(command(&p), "/usr/bin/c_rehash");
    }

    #[test]
    fn solaris_eleven_uses_svcadm_and_pem() {
        let p = profile("Solaris", "Solaris", "11");
        assert_eq!(p.trusted_cert_dir, Path::new("/etc/certs/CA/"));
        assert_eq!(p.dir_group, "sys");
        assert_eq!(command(&p), "/usr/sbin/svcadm restart /system/ca-certificates");
        assert_eq!(p.cert_path("ca2"), Path::new("/etc/certs/CA/ca2.pem"));
    }

    #[test]
    fn unknown_family_is_rejected_with_both_inputs() {
        let err = resolve(&OsFacts::new("WeirdOS", "", "242")).unwrap_err();
        assert!(matches!(
            &err,
            TrustStoreError::UnsupportedPlatform { family, version }
                if family == "WeirdOS" && version == "242"
        ));
        assert!(err.to_string().contains("(WeirdOS)"));
        assert!(err.to_string().contains("(242)"));
    }

    #[test]
    fn solaris_ten_is_rejected() {
        let err = resolve(&OsFacts::new("Solaris", "Solaris", "10")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported osfamily (Solaris) or unsupported version (10)"
        );
    }

    #[test]
    fn versioned_rows_reject_unparseable_major() {
        assert!(resolve(&OsFacts::new("Suse", "SLES", "tumbleweed")).is_err());
        assert!(resolve(&OsFacts::new("RedHat", "RedHat", "")).is_err());
    }

    #[test]
    fn resolution_is_deterministic_for_all_supported_platforms() {
        let supported = [
            ("Debian", "Debian", "11"),
            ("Debian", "Ubuntu", "20"),
            ("RedHat", "RedHat", "6"),
            ("RedHat", "RedHat", "8"),
            ("Archlinux", "Archlinux", "3"),
            ("Suse", "SLES", "11"),
            ("Suse", "SLES", "12"),
            ("AIX", "AIX", "7"),
            ("Solaris", "Solaris", "11"),
        ];
        for (family, name, major) in supported {
            let facts = OsFacts::new(family, name, major);
            let first = resolve(&facts).unwrap();
            let second = resolve(&facts).unwrap();
            assert_eq!(first, second, "{family} {major} should resolve stably");
            assert_eq!(first.dir_owner, "root");
            assert_eq!(
                first.update_command_path,
                vec![
                    PathBuf::from("/usr/sbin"),
                    PathBuf::from("/usr/bin"),
                    PathBuf::from("/bin"),
                ]
            );
        }
    }

    #[test]
    fn family_parse_ignores_case() {
        assert_eq!(OsFamily::parse("redhat"), Some(OsFamily::RedHat));
        assert_eq!(OsFamily::parse("aix"), Some(OsFamily::Aix));
        assert_eq!(OsFamily::parse("Windows"), None);
    }

    #[test]
    fn profile_serializes_mode_as_octal() {
        let p = profile("Debian", "Debian", "12");
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["dir_mode"], "2665");
        assert_eq!(json["cert_file_extension"], "crt");
        assert_eq!(json["family"], "Debian");
    }
}
