// ABOUTME: Integration tests for the devforge CLI commands.
// ABOUTME: Validates --help output, init, and offline deploy rendering.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn devforge_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("devforge"))
}

#[test]
fn help_shows_commands() {
    devforge_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("provision"))
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("apps"))
        .stdout(predicate::str::contains("sync"));
}

#[test]
fn init_creates_config_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("devforge.yml");

    devforge_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--template-repo", "https://github.com/acme/device-template.git"])
        .assert()
        .success();

    assert!(config_path.exists(), "devforge.yml should be created");
    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("https://github.com/acme/device-template.git"));
    assert!(content.contains("bgd-route.yaml"));
}

#[test]
fn init_refuses_to_overwrite_existing_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("devforge.yml"), "# mine\n").unwrap();

    devforge_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(
        fs::read_to_string(temp_dir.path().join("devforge.yml")).unwrap(),
        "# mine\n"
    );
}

#[test]
fn init_force_overwrites() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("devforge.yml"), "# mine\n").unwrap();

    devforge_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--force"])
        .assert()
        .success();

    let content = fs::read_to_string(temp_dir.path().join("devforge.yml")).unwrap();
    assert!(content.contains("source_host:"));
}

#[test]
fn missing_config_is_reported() {
    let temp_dir = tempfile::tempdir().unwrap();

    devforge_cmd()
        .current_dir(temp_dir.path())
        .arg("apps")
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

fn write_minimal_config(dir: &std::path::Path) {
    fs::write(dir.join("devforge.yml"), "controller:\n  sync_after_upsert: false\n").unwrap();
}

fn deploy_args() -> Vec<&'static str> {
    vec![
        "deploy",
        "--repo-url",
        "https://github.com/acme/device-sensor-042.git",
        "--device-id",
        "042",
        "--device-name",
        "sensor",
        "--destination-server",
        "https://kubernetes.default.svc",
        "--destination-namespace",
        "device-apps",
    ]
}

#[test]
fn deploy_without_api_prints_descriptor() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_minimal_config(temp_dir.path());

    devforge_cmd()
        .current_dir(temp_dir.path())
        .args(deploy_args())
        .assert()
        .success()
        .stdout(predicate::str::contains("kind: Application"))
        .stdout(predicate::str::contains("name: device-sensor-042"))
        .stdout(predicate::str::contains("namespace: device-apps"));
}

#[test]
fn deploy_json_is_one_document() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_minimal_config(temp_dir.path());

    let output = devforge_cmd()
        .current_dir(temp_dir.path())
        .arg("--json")
        .args(deploy_args())
        .output()
        .unwrap();
    assert!(output.status.success());

    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(doc["status"], "yaml_only");
    assert_eq!(doc["app_name"], "device-sensor-042");
    assert!(
        doc["descriptor_text"]
            .as_str()
            .unwrap()
            .contains("repoURL: https://github.com/acme/device-sensor-042.git")
    );
}

#[test]
fn deploy_with_blank_destination_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_minimal_config(temp_dir.path());

    let mut args = deploy_args();
    let last = args.len() - 1;
    args[last] = " ";

    devforge_cmd()
        .current_dir(temp_dir.path())
        .args(args)
        .assert()
        .failure()
        .stderr(predicate::str::contains("destination.namespace"));
}

#[test]
fn sync_requires_controller_credentials() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_minimal_config(temp_dir.path());

    devforge_cmd()
        .current_dir(temp_dir.path())
        .args(["sync", "device-sensor-042"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("controller URL and token"));
}
