use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use cacert_truststore::OsFacts;

#[derive(Parser, Debug)]
#[command(
    name = "cacert",
    version,
    about = "Keep the host's trusted CA certificates in their declared state"
)]
pub struct Cli {
    /// Desired-state file
    #[arg(long, env = "CACERT_CONFIG", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "CACERT_LOG", default_value = "info", global = true)]
    pub log_level: String,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Write logs to file (in addition to stderr)
    #[arg(long, env = "CACERT_LOG_FILE", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Output JSON instead of human-readable text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(cacert_common::paths::default_config_path)
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one reconciliation pass
    Apply(ApplyArgs),
    /// Show the trust store profile for this (or the given) platform
    Profile(PlatformArgs),
    /// Write an annotated default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Show version information
    Version,
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub platform: PlatformArgs,

    /// Also write the pass result as JSON (default: /var/lib/cacert/last-run.json)
    #[arg(long, value_name = "PATH")]
    pub report: Option<Option<PathBuf>>,
}

impl ApplyArgs {
    /// Report destination: the given path, the state dir default for a
    /// bare `--report`, or `None` when no report was asked for.
    pub fn report_path(&self) -> Option<PathBuf> {
        self.report.as_ref().map(|path| {
            path.clone()
                .unwrap_or_else(cacert_common::paths::default_report_path)
        })
    }
}

/// Platform facts that override detection.
#[derive(Args, Debug, Default)]
pub struct PlatformArgs {
    /// OS family, e.g. Debian, RedHat, Suse
    #[arg(long, requires = "major")]
    pub family: Option<String>,

    /// Distribution name (defaults to the family)
    #[arg(long = "os-name", requires = "family")]
    pub os_name: Option<String>,

    /// Major version, e.g. 12
    #[arg(long, requires = "family")]
    pub major: Option<String>,
}

impl PlatformArgs {
    pub fn facts(&self) -> Option<OsFacts> {
        let family = self.family.as_deref()?;
        let major = self.major.as_deref()?;
        let name = self.os_name.as_deref().unwrap_or(family);
        Some(OsFacts::new(family, name, major))
    }
}
