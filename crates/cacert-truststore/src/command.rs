//! External command execution with a restricted search path and a bounded
//! wait.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;

use crate::TrustStoreError;

/// Default upper bound for any single external command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// A command to run: argv, the only directories searched for `argv[0]`,
/// extra environment, and how long to wait before killing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub argv: Vec<String>,
    pub search_path: Vec<PathBuf>,
    pub env: Vec<(String, String)>,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new(argv: Vec<String>, search_path: Vec<PathBuf>) -> Self {
        Self {
            argv,
            search_path,
            env: Vec::new(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv.join(" "))
    }
}

/// Result of a command that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    /// stdout followed by stderr.
    pub output: String,
}

/// Capability to run external commands.
///
/// `Err` means the command could not be run or did not finish in time;
/// a command that ran and exited non-zero is `Ok` with `success == false`.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, TrustStoreError>;
}

/// Runs commands on the local host via `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct HostCommands;

impl HostCommands {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for HostCommands {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, TrustStoreError> {
        if spec.argv.is_empty() {
            return Err(TrustStoreError::CommandFailed("empty command".to_string()));
        }
        let program = locate(spec.program(), &spec.search_path)
            .ok_or_else(|| TrustStoreError::CommandNotFound(spec.program().to_string()))?;
        let path_env = std::env::join_paths(&spec.search_path)
            .map_err(|e| TrustStoreError::CommandFailed(format!("invalid search path: {e}")))?;

        let mut cmd = tokio::process::Command::new(&program);
        cmd.args(&spec.argv[1..])
            .env("PATH", path_env)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        tracing::debug!(command = %spec, program = %program.display(), "Running command");

        let output = match tokio::time::timeout(spec.timeout, cmd.output()).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(command = %spec, timeout = ?spec.timeout, "Command timed out");
                return Err(TrustStoreError::CommandTimeout {
                    command: spec.to_string(),
                    secs: spec.timeout.as_secs(),
                });
            }
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CommandOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            output: combined,
        })
    }
}

/// Find `program` in `search_path`. Names containing `/` are used as given.
fn locate(program: &str, search_path: &[PathBuf]) -> Option<PathBuf> {
    if program.contains('/') {
        let path = PathBuf::from(program);
        return is_executable(&path).then_some(path);
    }
    search_path
        .iter()
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}
