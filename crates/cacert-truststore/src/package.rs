//! Package manager capability for the CA bundle package.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::command::{CommandRunner, CommandSpec, DEFAULT_COMMAND_TIMEOUT};
use crate::profile::OsFamily;
use crate::TrustStoreError;

/// Desired package state: `installed`, `absent`, or a specific version.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PackageEnsure {
    #[default]
    Installed,
    Absent,
    Version(String),
}

impl FromStr for PackageEnsure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err("package ensure state must not be empty".to_string()),
            "installed" | "present" => Ok(Self::Installed),
            "absent" => Ok(Self::Absent),
            v if v.chars().any(char::is_whitespace) => {
                Err(format!("invalid package version: {v:?}"))
            }
            v => Ok(Self::Version(v.to_string())),
        }
    }
}

impl TryFrom<String> for PackageEnsure {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PackageEnsure> for String {
    fn from(e: PackageEnsure) -> Self {
        e.to_string()
    }
}

impl fmt::Display for PackageEnsure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installed => f.write_str("installed"),
            Self::Absent => f.write_str("absent"),
            Self::Version(v) => f.write_str(v),
        }
    }
}

/// Capability to converge a package to a desired state. Returns whether
/// the package manager had to act.
#[async_trait]
pub trait PackageManager: Send + Sync {
    async fn ensure_package(
        &self,
        name: &str,
        ensure: &PackageEnsure,
    ) -> Result<bool, TrustStoreError>;
}

/// Native package tool for a platform family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageTool {
    Apt,
    Yum,
    Pacman,
    Zypper,
    Pkg,
}

impl PackageTool {
    pub fn for_family(family: OsFamily) -> Self {
        match family {
            OsFamily::Debian => Self::Apt,
            OsFamily::RedHat | OsFamily::Aix => Self::Yum,
            OsFamily::Archlinux => Self::Pacman,
            OsFamily::Suse => Self::Zypper,
            OsFamily::Solaris => Self::Pkg,
        }
    }

    fn query(&self, name: &str) -> Vec<String> {
        match self {
            Self::Apt => argv(&["dpkg-query", "-W", "--showformat=${Status} ${Version}", name]),
            Self::Yum | Self::Zypper => argv(&["rpm", "-q", "--qf", "%{VERSION}-%{RELEASE}", name]),
            Self::Pacman => argv(&["pacman", "-Q", name]),
            Self::Pkg => argv(&["pkg", "list", "-H", name]),
        }
    }

    /// Extract the installed version from successful query output.
    fn parse_installed(&self, output: &str) -> Option<String> {
        let output = output.trim();
        match self {
            Self::Apt => {
                if !output.contains("ok installed") {
                    return None;
                }
                output.split_whitespace().last().map(str::to_string)
            }
            Self::Yum | Self::Zypper => {
                if output.is_empty() || output.contains("is not installed") {
                    return None;
                }
                Some(output.to_string())
            }
            Self::Pacman | Self::Pkg => output.split_whitespace().nth(1).map(str::to_string),
        }
    }

    fn install(&self, name: &str, version: Option<&str>) -> Result<Vec<String>, TrustStoreError> {
        let target = match (self, version) {
            (_, None) => name.to_string(),
            (Self::Apt | Self::Zypper, Some(v)) => format!("{name}={v}"),
            (Self::Yum, Some(v)) => format!("{name}-{v}"),
            (Self::Pkg, Some(v)) => format!("{name}@{v}"),
            (Self::Pacman, Some(v)) => {
                return Err(TrustStoreError::NotSupported(format!(
                    "pacman cannot pin {name} to version {v}"
                )));
            }
        };
        Ok(match self {
            Self::Apt => argv(&["apt-get", "install", "-y", "-q", &target]),
            Self::Yum => argv(&["yum", "install", "-y", &target]),
            Self::Pacman => argv(&["pacman", "-S", "--noconfirm", "--needed", &target]),
            Self::Zypper => argv(&["zypper", "--non-interactive", "install", &target]),
            Self::Pkg => argv(&["pkg", "install", "--accept", &target]),
        })
    }

    fn remove(&self, name: &str) -> Vec<String> {
        match self {
            Self::Apt => argv(&["apt-get", "remove", "-y", "-q", name]),
            Self::Yum => argv(&["yum", "remove", "-y", name]),
            Self::Pacman => argv(&["pacman", "-R", "--noconfirm", name]),
            Self::Zypper => argv(&["zypper", "--non-interactive", "remove", name]),
            Self::Pkg => argv(&["pkg", "uninstall", name]),
        }
    }
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

/// Drives the platform's native package tool through a [`CommandRunner`].
pub struct HostPackages {
    tool: PackageTool,
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl HostPackages {
    pub fn new(tool: PackageTool, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            tool,
            runner,
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn spec(&self, argv: Vec<String>) -> CommandSpec {
        let mut search_path = cacert_common::paths::command_search_path();
        search_path.push(PathBuf::from("/sbin"));
        let spec = CommandSpec::new(argv, search_path).with_timeout(self.timeout);
        match self.tool {
            PackageTool::Apt => spec.with_env("DEBIAN_FRONTEND", "noninteractive"),
            _ => spec,
        }
    }

    async fn installed_version(&self, name: &str) -> Result<Option<String>, TrustStoreError> {
        let out = self.runner.run(&self.spec(self.tool.query(name))).await?;
        if !out.success {
            return Ok(None);
        }
        Ok(self.tool.parse_installed(&out.output))
    }

    async fn execute(&self, argv: Vec<String>) -> Result<(), TrustStoreError> {
        let spec = self.spec(argv);
        let out = self.runner.run(&spec).await?;
        if out.success {
            return Ok(());
        }
        tracing::warn!(command = %spec, output = %out.output.trim(), "Package command failed");
        Err(TrustStoreError::CommandFailed(format!(
            "{spec} exit code {}: {}",
            out.exit_code.unwrap_or(-1),
            out.output.trim()
        )))
    }
}

#[async_trait]
impl PackageManager for HostPackages {
    async fn ensure_package(
        &self,
        name: &str,
        ensure: &PackageEnsure,
    ) -> Result<bool, TrustStoreError> {
        let installed = self.installed_version(name).await?;
        tracing::debug!(name, installed = ?installed, want = %ensure, "Package state");

        match (ensure, installed) {
            (PackageEnsure::Installed, Some(_)) | (PackageEnsure::Absent, None) => Ok(false),
            (PackageEnsure::Installed, None) => {
                self.execute(self.tool.install(name, None)?).await?;
                tracing::info!(name, "Package installed");
                Ok(true)
            }
            (PackageEnsure::Absent, Some(_)) => {
                self.execute(self.tool.remove(name)).await?;
                tracing::info!(name, "Package removed");
                Ok(true)
            }
            (PackageEnsure::Version(want), current) => {
                if current.as_deref() == Some(want.as_str()) {
                    return Ok(false);
                }
                self.execute(self.tool.install(name, Some(want))?).await?;
                tracing::info!(name, version = %want, "Package pinned");
                Ok(true)
            }
        }
    }
}
