use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!("cacert-cli-{name}-{nanos}"))
}

fn cacert(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cacert"))
        .args(args)
        .env_remove("CACERT_CONFIG")
        .env_remove("CACERT_LOG_FILE")
        .env("CACERT_LOG", "warn")
        .output()
        .unwrap()
}

#[test]
fn version_prints_package_version() {
    let out = cacert(&["version"]);
    assert!(out.status.success());
    assert_eq!(
        String::from_utf8_lossy(&out.stdout).trim(),
        format!("cacert {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn profile_json_for_explicit_platform() {
    let missing = temp_path("none").join("cacert.toml");
    let out = cacert(&[
        "profile",
        "--json",
        "--config",
        missing.to_str().unwrap(),
        "--family",
        "Suse",
        "--major",
        "11",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["trusted_cert_dir"], "/etc/ssl/certs");
    assert_eq!(json["cert_file_extension"], "pem");
    assert_eq!(json["package_name"], "openssl-certs");
}

#[test]
fn unsupported_platform_exits_with_code_3() {
    let missing = temp_path("none").join("cacert.toml");
    let out = cacert(&[
        "profile",
        "--config",
        missing.to_str().unwrap(),
        "--family",
        "Solaris",
        "--major",
        "10",
    ]);
    assert_eq!(out.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&out.stderr)
        .contains("Unsupported osfamily (Solaris) or unsupported version (10)"));
}

#[test]
fn invalid_config_exits_with_code_2() {
    let path = temp_path("bad").join("cacert.toml");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "no_such_key = true\n").unwrap();

    let out = cacert(&["apply", "--json", "--config", path.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(2));
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["error"], "invalid_config");

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn init_writes_template_once() {
    let path = temp_path("init").join("cacert.toml");
    let out = cacert(&["init", "--config", path.to_str().unwrap()]);
    assert!(out.status.success());
    assert!(path.exists());

    let again = cacert(&["init", "--config", path.to_str().unwrap()]);
    assert!(again.status.success());
    assert!(String::from_utf8_lossy(&again.stdout).contains("already exists"));

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn log_file_receives_plain_log_lines() {
    let dir = temp_path("log");
    let log = dir.join("logs").join("cacert.log");
    let out = cacert(&[
        "profile",
        "-v",
        "--config",
        dir.join("cacert.toml").to_str().unwrap(),
        "--log-file",
        log.to_str().unwrap(),
        "--family",
        "Debian",
        "--major",
        "12",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let text = std::fs::read_to_string(&log).unwrap();
    assert!(text.contains("No config file"));
    assert!(!text.contains('\u{1b}'), "file log must not carry ANSI escapes");
    assert!(String::from_utf8_lossy(&out.stderr).contains("No config file"));

    let _ = std::fs::remove_dir_all(&dir);
}
