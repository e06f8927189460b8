//! Integration tests for the `fleetwatch` CLI binary.
//!
//! Argument parsing, help output, completions, offline commands and the
//! persisted-session paths. Nothing here needs a live backend.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

/// Unroutable backend: any test that reaches the network fails loudly.
const DEAD_SERVER: &str = "http://127.0.0.1:9";

/// `fleetwatch` with env isolation rooted at `home`.
///
/// Clears every `FLEETWATCH_*` variable and points the config and data
/// directories inside `home` so tests never see the real configuration.
fn fleetwatch_in(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("fleetwatch");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("FLEETWATCH_PROFILE")
        .env_remove("FLEETWATCH_SERVER")
        .env_remove("FLEETWATCH_OUTPUT")
        .env_remove("FLEETWATCH_INSECURE")
        .env_remove("FLEETWATCH_TIMEOUT");
    cmd
}

fn fleetwatch() -> assert_cmd::Command {
    fleetwatch_in(Path::new("/tmp/fleetwatch-cli-test-nonexistent"))
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn write_config(home: &Path, contents: &str) {
    let dir = home.join("config").join("fleetwatch");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), contents).unwrap();
}

fn write_session(home: &Path, profile: &str) {
    let dir = home.join("data").join("fleetwatch").join("sessions");
    std::fs::create_dir_all(&dir).unwrap();
    let user = serde_json::json!({
        "id": "5d1f7a4e-3c5b-4c1e-9f57-7a8f7b0c2d11",
        "username": "ops",
        "role": "admin"
    });
    let session = serde_json::json!({
        "token": "persisted-token",
        "user": user.to_string(),
    });
    std::fs::write(dir.join(format!("{profile}.json")), session.to_string()).unwrap();
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = fleetwatch().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    fleetwatch().arg("--help").assert().success().stdout(
        predicate::str::contains("Docker")
            .and(predicate::str::contains("agents"))
            .and(predicate::str::contains("containers"))
            .and(predicate::str::contains("actions")),
    );
}

#[test]
fn test_version_flag() {
    fleetwatch()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fleetwatch"));
}

#[test]
fn test_subcommand_help() {
    fleetwatch()
        .args(["actions", "submit", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--field").and(predicate::str::contains("--wait")));

    fleetwatch()
        .args(["domains", "routes", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("add").and(predicate::str::contains("remove")));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    fleetwatch()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    fleetwatch()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Offline commands ────────────────────────────────────────────────

#[test]
fn test_action_types_need_no_backend() {
    fleetwatch()
        .args(["actions", "types"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("start_container")
                .and(predicate::str::contains("write_file"))
                .and(predicate::str::contains("restart_nginx")),
        );
}

#[test]
fn test_action_types_json() {
    let output = fleetwatch()
        .args(["-o", "json", "actions", "types"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let types: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let pull = types
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["type"] == "pull_image")
        .unwrap();
    assert_eq!(pull["fields"][0]["name"], "image");
    assert_eq!(pull["fields"][0]["required"], true);
}

#[test]
fn test_config_show_no_config() {
    // Falls back to the default config when no file exists.
    fleetwatch().args(["config", "show"]).assert().success();
}

#[test]
fn test_config_path() {
    let home = TempDir::new().unwrap();
    fleetwatch_in(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
#[cfg(target_os = "linux")]
fn test_config_show_redacts_passwords() {
    let home = TempDir::new().unwrap();
    write_config(
        home.path(),
        r#"
default_profile = "prod"

[profiles.prod]
server = "https://monitor.example.com"
username = "ops"
password = "hunter2"
"#,
    );

    fleetwatch_in(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("monitor.example.com")
                .and(predicate::str::contains("****"))
                .and(predicate::str::contains("hunter2").not()),
        );
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = fleetwatch().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_invalid_output_format() {
    let output = fleetwatch()
        .args(["--output", "invalid", "agents", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_agents_list_no_backend_configured() {
    fleetwatch()
        .args(["agents", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config").or(predicate::str::contains("--server")));
}

#[test]
fn test_unknown_profile() {
    let home = TempDir::new().unwrap();
    fleetwatch_in(home.path())
        .args(["--profile", "staging", "agents", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("staging"));
}

#[test]
fn test_agents_list_without_session_is_auth_error() {
    let home = TempDir::new().unwrap();
    fleetwatch_in(home.path())
        .args(["--server", DEAD_SERVER, "agents", "list"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Not logged in"));
}

#[test]
fn test_bad_server_url() {
    let home = TempDir::new().unwrap();
    fleetwatch_in(home.path())
        .args(["--server", "ftp://monitor.example.com", "whoami"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ftp"));
}

#[test]
fn test_submit_rejects_unknown_action_type() {
    let home = TempDir::new().unwrap();
    write_session(home.path(), "default");
    fleetwatch_in(home.path())
        .args([
            "--server",
            DEAD_SERVER,
            "actions",
            "submit",
            "edge-1",
            "reboot",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("reboot"));
}

#[test]
fn test_submit_rejects_malformed_field() {
    let home = TempDir::new().unwrap();
    write_session(home.path(), "default");
    fleetwatch_in(home.path())
        .args([
            "--server",
            DEAD_SERVER,
            "actions",
            "submit",
            "5d1f7a4e-3c5b-4c1e-9f57-7a8f7b0c2d11",
            "pull_image",
            "-f",
            "image",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("KEY=VALUE"));
}

// ── Persisted session ───────────────────────────────────────────────

#[test]
#[cfg(target_os = "linux")]
fn test_whoami_reads_persisted_session() {
    let home = TempDir::new().unwrap();
    write_session(home.path(), "default");

    let output = fleetwatch_in(home.path())
        .args(["--server", DEAD_SERVER, "-o", "json", "whoami"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let user: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(user["username"], "ops");
    assert_eq!(user["role"], "admin");
}

#[test]
#[cfg(target_os = "linux")]
fn test_logout_forgets_session() {
    let home = TempDir::new().unwrap();
    write_session(home.path(), "default");

    fleetwatch_in(home.path())
        .args(["--server", DEAD_SERVER, "logout"])
        .assert()
        .success();

    fleetwatch_in(home.path())
        .args(["--server", DEAD_SERVER, "whoami"])
        .assert()
        .code(3);
}

#[test]
#[cfg(target_os = "linux")]
fn test_sessions_are_per_profile() {
    let home = TempDir::new().unwrap();
    write_config(
        home.path(),
        r#"
default_profile = "prod"

[profiles.prod]
server = "http://127.0.0.1:9"

[profiles.lab]
server = "http://127.0.0.1:9"
"#,
    );
    write_session(home.path(), "prod");

    fleetwatch_in(home.path())
        .args(["-o", "plain", "whoami"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ops"));

    fleetwatch_in(home.path())
        .args(["--profile", "lab", "whoami"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("lab"));
}
