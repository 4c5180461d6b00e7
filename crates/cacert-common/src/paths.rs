use std::path::PathBuf;

/// System configuration directory for cacert.
const CONFIG_DIR: &str = "/etc/cacert";

/// State directory holding the last run report.
const STATE_DIR: &str = "/var/lib/cacert";

/// Directory containing the desired-state file.
pub fn cacert_config_dir() -> PathBuf {
    PathBuf::from(CONFIG_DIR)
}

/// Default desired-state file consulted when `--config` is not given.
pub fn default_config_path() -> PathBuf {
    cacert_config_dir().join("cacert.toml")
}

/// State directory. `CACERT_STATE_DIR` overrides the system location.
pub fn cacert_state_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("CACERT_STATE_DIR") {
        return PathBuf::from(dir);
    }
    PathBuf::from(STATE_DIR)
}

/// Where a bare `cacert apply --report` writes.
pub fn default_report_path() -> PathBuf {
    cacert_state_dir().join("last-run.json")
}

/// Standard executable search path for trust store commands.
pub fn command_search_path() -> Vec<PathBuf> {
    ["/usr/sbin", "/usr/bin", "/bin"]
        .iter()
        .map(PathBuf::from)
        .collect()
}
