//! Subcommand handlers. Each returns the process exit code on success.

use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use cacert_common::persist;
use cacert_config::init::write_default_config;
use cacert_config::ReconciliationConfig;
use cacert_reconcile::{ReconcileError, ReconciliationResult};
use cacert_truststore::{OsFacts, OsProfile};

use crate::cli::{ApplyArgs, Cli, PlatformArgs};
use crate::format;

/// JSON shape for `cacert apply --json` and `--report`.
#[derive(Serialize)]
pub struct ApplyReport<'a> {
    pub version: &'static str,
    pub platform: &'a OsFacts,
    pub trusted_cert_dir: &'a Path,
    #[serde(flatten)]
    pub result: &'a ReconciliationResult,
}

pub fn version(json: bool) {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "platform": std::env::consts::OS,
            })
        );
    } else {
        println!("cacert {}", env!("CARGO_PKG_VERSION"));
    }
}

pub fn init(cli: &Cli, force: bool) -> anyhow::Result<i32> {
    let path = cli.config_path();
    let created = write_default_config(&path, force)?;
    if cli.json {
        print_json(&serde_json::json!({
            "path": path.display().to_string(),
            "created": created,
        }))?;
    } else if created {
        println!("Wrote {}", path.display());
    } else {
        println!("{} already exists (use --force to overwrite)", path.display());
    }
    Ok(0)
}

pub fn profile(cli: &Cli, args: &PlatformArgs) -> anyhow::Result<i32> {
    let path = cli.config_path();
    let config = if path.exists() {
        Some(ReconciliationConfig::from_path(&path)?)
    } else {
        tracing::debug!(path = %path.display(), "No config file, using detected facts");
        None
    };
    let facts = platform_facts(args, config.as_ref())?;
    let profile = resolve(&facts)?;

    if cli.json {
        print_json(&profile)?;
    } else {
        print!("{}", format::profile_detail(&profile));
    }
    Ok(0)
}

pub async fn apply(cli: &Cli, args: &ApplyArgs) -> anyhow::Result<i32> {
    let path = cli.config_path();
    let config = ReconciliationConfig::from_path(&path)?;
    let facts = platform_facts(&args.platform, Some(&config))?;
    let profile = resolve(&facts)?;
    let result = run_pass(profile.clone(), &config).await?;

    let report = ApplyReport {
        version: env!("CARGO_PKG_VERSION"),
        platform: &facts,
        trusted_cert_dir: &profile.trusted_cert_dir,
        result: &result,
    };
    if let Some(report_path) = args.report_path() {
        persist::write_json_pretty(&report_path, &report)
            .with_context(|| format!("cannot write report to {}", report_path.display()))?;
    }

    if cli.json {
        print_json(&report)?;
    } else {
        print!("{}", format::result_summary(&profile, &result));
    }
    Ok(result.exit_code())
}

#[cfg(unix)]
async fn run_pass(
    profile: OsProfile,
    config: &ReconciliationConfig,
) -> anyhow::Result<ReconciliationResult> {
    use cacert_reconcile::{Host, Reconciler};

    let host = Host::system(&profile, config)?;
    Ok(Reconciler::new(profile, host).reconcile(config).await?)
}

#[cfg(not(unix))]
async fn run_pass(
    _profile: OsProfile,
    _config: &ReconciliationConfig,
) -> anyhow::Result<ReconciliationResult> {
    anyhow::bail!("cacert apply is only supported on Unix hosts")
}

/// Facts from flags, then the config's `[platform]` table, then detection.
fn platform_facts(
    args: &PlatformArgs,
    config: Option<&ReconciliationConfig>,
) -> anyhow::Result<OsFacts> {
    if let Some(facts) = args.facts() {
        return Ok(facts);
    }
    if let Some(facts) = config.and_then(|c| c.platform.clone()) {
        return Ok(facts);
    }
    OsFacts::detect().context("cannot detect OS facts; pass --family and --major")
}

fn resolve(facts: &OsFacts) -> Result<OsProfile, ReconcileError> {
    cacert_truststore::profile::resolve(facts).map_err(ReconcileError::Platform)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
