use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn echoread() -> Command {
    Command::cargo_bin("echoread").unwrap()
}

/// A config file with every section at its default.
fn default_config(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{}").unwrap();
    path
}

#[test]
fn config_path_reports_missing_file() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");

    echoread()
        .args(["config", "path", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file:"))
        .stdout(predicate::str::contains("not created"));
}

#[test]
fn config_init_get_and_set() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("nested").join("config.json");

    echoread()
        .args(["config", "init", "--config"])
        .arg(&config)
        .assert()
        .success();
    assert!(config.exists());

    echoread()
        .args(["config", "init", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    echoread()
        .args(["config", "get", "viewer.scan_threshold", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::diff("50\n"));

    echoread()
        .args(["config", "set", "viewer.acquisition", "eager_background", "--config"])
        .arg(&config)
        .assert()
        .success();

    echoread()
        .args(["config", "get", "viewer.acquisition", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("eager_background"));
}

#[test]
fn config_set_rejects_unknown_keys_and_bad_values() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");

    echoread()
        .args(["config", "set", "viewer.no_such_key", "1", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));

    echoread()
        .args(["config", "set", "viewer.scan_threshold", "many", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid value"));
}

#[test]
fn view_without_locator_is_a_startup_error() {
    let dir = TempDir::new().unwrap();
    let config = default_config(&dir);

    echoread()
        .args(["view", "--config"])
        .arg(&config)
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No PDF URL provided"));
}

#[test]
fn convert_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let config = default_config(&dir);
    let missing = dir.path().join("absent.pdf");

    echoread()
        .args(["convert", "--config"])
        .arg(&config)
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot reach"));
}
