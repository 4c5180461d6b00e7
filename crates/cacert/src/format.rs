//! Human-readable CLI output.
//!
//! JSON output bypasses this module; it serializes the same values
//! directly.

use std::fmt::Write;

use cacert_reconcile::ReconciliationResult;
use cacert_truststore::profile::mode_string;
use cacert_truststore::OsProfile;

/// Multi-line description of a resolved profile for `cacert profile`.
pub fn profile_detail(profile: &OsProfile) -> String {
    let mut out = String::new();
    let version = profile
        .major_version
        .map(|v| format!(" {v}"))
        .unwrap_or_default();
    let _ = writeln!(out, "{} ({}{version})", profile.family, profile.name);
    let _ = writeln!(out, "  Directory:  {}", profile.trusted_cert_dir.display());
    let _ = writeln!(
        out,
        "  Ownership:  {}:{} {}",
        profile.dir_owner,
        profile.dir_group,
        mode_string(profile.dir_mode)
    );
    let _ = writeln!(out, "  Extension:  .{}", profile.cert_file_extension);
    let _ = writeln!(out, "  Rebuild:    {}", profile.update_command.join(" "));
    let _ = writeln!(out, "  Package:    {}", profile.package_name);
    if let Some(legacy) = &profile.legacy_enable {
        let _ = writeln!(
            out,
            "  Legacy:     {} (guarded by `{}`)",
            legacy.enable_command(false).join(" "),
            legacy.check_command.join(" ")
        );
    }
    out
}

/// Summary of one reconciliation pass for `cacert apply`.
pub fn result_summary(profile: &OsProfile, result: &ReconciliationResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Trust store {}", profile.trusted_cert_dir.display());

    let package = match &result.managed_package {
        Some(name) => format!("{name} ({})", changed_word(result.package_changed)),
        None => "not managed".to_string(),
    };
    let _ = writeln!(out, "  Package:      {package}");
    let _ = writeln!(out, "  Directory:    {}", changed_word(result.directory_changed));

    if result.certificates_changed.is_empty() {
        let _ = writeln!(out, "  Certificates: unchanged");
    } else {
        let names: Vec<&str> = result.certificates_changed.iter().map(String::as_str).collect();
        let _ = writeln!(
            out,
            "  Certificates: {} changed ({})",
            names.len(),
            names.join(", ")
        );
    }

    if profile.requires_legacy_enable() {
        let legacy = if result.legacy_enable_ran { "enabled" } else { "no action" };
        let _ = writeln!(out, "  Legacy trust: {legacy}");
    }
    let rebuild = if result.rebuild_triggered { "ran" } else { "not needed" };
    let _ = writeln!(out, "  Rebuild:      {rebuild}");

    if !result.warnings.is_empty() {
        let _ = writeln!(out, "Warnings:");
        for warning in &result.warnings {
            let _ = writeln!(out, "  {warning}");
        }
    }
    if !result.failures.is_empty() {
        let _ = writeln!(out, "Failures:");
        for failure in &result.failures {
            let _ = writeln!(out, "  {failure}");
        }
    }
    out
}

fn changed_word(changed: bool) -> &'static str {
    if changed {
        "changed"
    } else {
        "unchanged"
    }
}
