use std::fs;
use std::path::PathBuf;

use flexctl_core::config::{Config, ProfileCredentials};
use tempfile::TempDir;

/// Returns true if running as root (euid == 0). Used to skip permission tests.
#[cfg(unix)]
fn is_root() -> bool {
    std::process::Command::new("id")
        .arg("-u")
        .output()
        .ok()
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim() == "0")
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// 1. Missing config directory / nonexistent path
// ---------------------------------------------------------------------------

#[test]
fn load_from_nonexistent_path_returns_default_config() {
    let path = PathBuf::from("/tmp/flexctl-test-nonexistent/does/not/exist/config.toml");
    assert!(!path.exists());

    let config = Config::load_from_path(&path).expect("should not panic or error on missing path");

    assert!(config.profiles.is_empty());
    assert!(config.default_profile.is_none());
    assert!(config.param_persist);
}

// ---------------------------------------------------------------------------
// 2. Empty config file
// ---------------------------------------------------------------------------

#[test]
fn load_empty_config_file_returns_default_config() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "").unwrap();

    let config = Config::load_from_path(&config_path).expect("empty file should parse as default");

    assert!(config.profiles.is_empty());
    assert!(config.default_profile.is_none());
    assert!(config.param_persist);
}

// ---------------------------------------------------------------------------
// 3. Corrupt / invalid TOML
// ---------------------------------------------------------------------------

#[test]
fn load_corrupt_toml_returns_parse_error() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "[[[broken").unwrap();

    let result = Config::load_from_path(&config_path);
    assert!(result.is_err(), "corrupt TOML should produce an error");

    let msg = result.unwrap_err().to_string();
    assert!(
        msg.contains("parse") || msg.contains("Parse"),
        "error should mention parsing: {msg}"
    );
}

// ---------------------------------------------------------------------------
// 4. Profile without any credential
// ---------------------------------------------------------------------------

#[test]
fn load_profile_without_credentials_returns_error() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");

    let content = r#"
[profiles.broken]
subscription_id = "00000000-0000-0000-0000-000000000000"
"#;
    fs::write(&config_path, content).unwrap();

    let result = Config::load_from_path(&config_path);
    assert!(result.is_err(), "profile with no credential should produce an error");
}

// ---------------------------------------------------------------------------
// 5. Config with unknown / extra fields
// ---------------------------------------------------------------------------

#[test]
fn load_config_with_unknown_fields_ignores_them() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");

    let content = r#"
unknown_top_level_key = "hello"
param_persist = false

[profiles.dev]
subscription_id = "sub-dev"
access_token = "token"
totally_unknown_field = true
"#;
    fs::write(&config_path, content).unwrap();

    let config =
        Config::load_from_path(&config_path).expect("unknown fields should be silently ignored");

    assert!(!config.param_persist);
    let profile = &config.profiles["dev"];
    assert_eq!(profile.subscription_id, "sub-dev");
    assert!(matches!(
        profile.credentials,
        ProfileCredentials::AccessToken { .. }
    ));
}

// ---------------------------------------------------------------------------
// 6. Service principal profiles survive a save/load cycle
// ---------------------------------------------------------------------------

#[test]
fn service_principal_profile_persists() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("nested").join("config.toml");

    let content = r#"
default_profile = "prod"

[profiles.prod]
subscription_id = "sub-prod"
tenant_id = "tenant"
client_id = "client"
client_secret = "keyring:prod-secret"
endpoint = "https://management.usgovcloudapi.net/"
"#;
    let source = dir.path().join("source.toml");
    fs::write(&source, content).unwrap();

    let config = Config::load_from_path(&source).unwrap();
    config.save_to_path(&config_path).unwrap();
    let reloaded = Config::load_from_path(&config_path).unwrap();

    assert_eq!(reloaded.default_profile.as_deref(), Some("prod"));
    let profile = &reloaded.profiles["prod"];
    assert_eq!(profile.auth_kind(), "service-principal");
    assert_eq!(
        profile.service_principal(),
        Some(("tenant", "client", "keyring:prod-secret"))
    );
    assert_eq!(
        profile.endpoint.as_deref(),
        Some("https://management.usgovcloudapi.net/")
    );
}

// ---------------------------------------------------------------------------
// 7. Permission errors (unix only)
// ---------------------------------------------------------------------------

#[cfg(unix)]
#[test]
fn load_unreadable_file_returns_clear_error() {
    use std::os::unix::fs::PermissionsExt;

    // Skip if running as root (permissions won't be enforced)
    if is_root() {
        eprintln!("skipping test: running as root");
        return;
    }

    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "# valid toml").unwrap();

    fs::set_permissions(&config_path, fs::Permissions::from_mode(0o000)).unwrap();

    let result = Config::load_from_path(&config_path);
    assert!(result.is_err(), "unreadable file should produce an error");

    let msg = result.unwrap_err().to_string();
    assert!(
        msg.contains("load") || msg.contains("Load") || msg.contains("Permission"),
        "error should reference loading or permissions: {msg}"
    );

    // Restore permissions so TempDir cleanup can remove the file
    fs::set_permissions(&config_path, fs::Permissions::from_mode(0o644)).unwrap();
}

#[cfg(unix)]
#[test]
fn save_to_readonly_directory_returns_clear_error() {
    use std::os::unix::fs::PermissionsExt;

    if is_root() {
        eprintln!("skipping test: running as root");
        return;
    }

    let dir = TempDir::new().unwrap();
    let readonly_dir = dir.path().join("readonly");
    fs::create_dir(&readonly_dir).unwrap();
    fs::set_permissions(&readonly_dir, fs::Permissions::from_mode(0o444)).unwrap();

    let config_path = readonly_dir.join("config.toml");
    let result = Config::default().save_to_path(&config_path);
    assert!(
        result.is_err(),
        "saving to read-only directory should produce an error"
    );

    let msg = result.unwrap_err().to_string();
    assert!(
        msg.contains("save") || msg.contains("Save") || msg.contains("Permission"),
        "error should reference saving or permissions: {msg}"
    );

    fs::set_permissions(&readonly_dir, fs::Permissions::from_mode(0o755)).unwrap();
}

// ---------------------------------------------------------------------------
// 8. Environment credentials
// ---------------------------------------------------------------------------

const ENV_VARS: &[&str] = &[
    "AZURE_SUBSCRIPTION_ID",
    "AZURE_ACCESS_TOKEN",
    "AZURE_TENANT_ID",
    "AZURE_CLIENT_ID",
    "AZURE_CLIENT_SECRET",
];

fn clear_env() {
    for var in ENV_VARS {
        // SAFETY: serialized with every other env-mutating test
        unsafe { std::env::remove_var(var) };
    }
}

#[test]
#[serial_test::serial]
fn env_credentials_need_subscription() {
    clear_env();
    unsafe { std::env::set_var("AZURE_ACCESS_TOKEN", "token") };

    assert!(flexctl_core::config::EnvCredentials::from_env().is_none());
    clear_env();
}

#[test]
#[serial_test::serial]
fn env_access_token_wins_over_service_principal() {
    clear_env();
    unsafe {
        std::env::set_var("AZURE_SUBSCRIPTION_ID", "sub-env");
        std::env::set_var("AZURE_ACCESS_TOKEN", "token");
        std::env::set_var("AZURE_TENANT_ID", "tenant");
        std::env::set_var("AZURE_CLIENT_ID", "client");
        std::env::set_var("AZURE_CLIENT_SECRET", "secret");
    }

    let env = flexctl_core::config::EnvCredentials::from_env().unwrap();
    assert_eq!(env.subscription_id, "sub-env");
    assert!(matches!(
        env.credential,
        flexctl_core::Credential::AccessToken(ref t) if t == "token"
    ));
    clear_env();
}

#[test]
#[serial_test::serial]
fn env_service_principal_requires_all_three() {
    clear_env();
    unsafe {
        std::env::set_var("AZURE_SUBSCRIPTION_ID", "sub-env");
        std::env::set_var("AZURE_TENANT_ID", "tenant");
        std::env::set_var("AZURE_CLIENT_ID", "client");
    }
    assert!(flexctl_core::config::EnvCredentials::from_env().is_none());

    unsafe { std::env::set_var("AZURE_CLIENT_SECRET", "secret") };
    let env = flexctl_core::config::EnvCredentials::from_env().unwrap();
    assert!(matches!(env.credential, flexctl_core::Credential::ClientSecret { .. }));
    clear_env();
}
