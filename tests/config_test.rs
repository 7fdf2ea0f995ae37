//! Integration tests for configuration files and flag handling

use std::process::Command;

use assert_fs::prelude::*;
use predicates::prelude::*;

fn debforge(dir: &assert_fs::TempDir, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_debforge"))
        .current_dir(dir.path())
        .env("DEBFORGE_CONFIG_DIR", dir.path().join("user-config"))
        .env_remove("GITHUB_TOKEN")
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to execute debforge")
}

fn unit(dir: &assert_fs::TempDir, root: &str, name: &str, control: &str) {
    dir.child(format!("{root}/{name}/debian/control"))
        .write_str(control)
        .unwrap();
}

#[test]
fn test_project_config_sets_source_dir() {
    let dir = assert_fs::TempDir::new().unwrap();
    unit(&dir, "checkouts", "solo", "Source: solo\n\nPackage: solo\n");
    dir.child("debforge.toml")
        .write_str("[paths]\nsrc = \"checkouts\"\n")
        .unwrap();

    let output = debforge(&dir, &[]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(predicate::str::contains("Build order (1 repos): [solo]").eval(&stdout));
}

#[test]
fn test_flag_overrides_config_file() {
    let dir = assert_fs::TempDir::new().unwrap();
    unit(&dir, "from-file", "file-unit", "Source: f\n\nPackage: f\n");
    unit(&dir, "from-flag", "flag-unit", "Source: g\n\nPackage: g\n");
    dir.child("debforge.toml")
        .write_str("[paths]\nsrc = \"from-file\"\n")
        .unwrap();

    let output = debforge(&dir, &["--src", "from-flag"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(predicate::str::contains("[flag-unit]").eval(&stdout));
}

#[test]
fn test_config_base_tiers_are_used() {
    let dir = assert_fs::TempDir::new().unwrap();
    unit(&dir, "src", "aaa", "Source: aaa\n\nPackage: aaa\n");
    unit(&dir, "src", "zzz-foundation", "Source: z\n\nPackage: z\n");
    dir.child("debforge.toml")
        .write_str("[order]\nbase_tiers = [[\"zzz-foundation\"]]\n")
        .unwrap();

    let output = debforge(&dir, &[]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(predicate::str::contains("[zzz-foundation aaa]").eval(&stdout));
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("src").create_dir_all().unwrap();
    dir.child("debforge.toml").write_str("[paths\n").unwrap();

    let output = debforge(&dir, &[]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(predicate::str::contains("debforge.toml").eval(&stderr));
}

#[test]
fn test_explicit_config_must_exist() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("src").create_dir_all().unwrap();

    let output = debforge(&dir, &["--config", "missing.toml"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(predicate::str::contains("missing.toml").eval(&stderr));
}

#[test]
fn test_clone_without_ref_fails_before_network() {
    let dir = assert_fs::TempDir::new().unwrap();

    let output = debforge(&dir, &["--clone"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(predicate::str::contains("Must supply git ref").eval(&stderr));
    dir.child("src").assert(predicate::path::missing());
}

#[test]
fn test_json_error_output() {
    let dir = assert_fs::TempDir::new().unwrap();

    let output = debforge(&dir, &["--json", "--src", "nowhere"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    let doc: serde_json::Value = serde_json::from_str(stderr.trim()).unwrap();
    assert!(doc["error"].as_str().unwrap().contains("nowhere"));
}
