use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn logctl(config: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("logctl"));
    cmd.arg("--config").arg(config).env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &TempDir, output: Option<&Path>) -> std::path::PathBuf {
    let socket = dir.path().join("loggerd.sock");
    let mut text = format!("socket: {}\nlevel: debug\n", socket.display());
    if let Some(output) = output {
        text.push_str(&format!("output: {}\n", output.display()));
    }
    let path = dir.path().join("loggerd.yaml");
    fs::write(&path, text).expect("write config");
    path
}

#[test]
fn level_prints_number_and_canonical_name() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("absent.yaml");

    logctl(&config)
        .args(["level", "dbg"])
        .assert()
        .success()
        .stdout("7 DEBUG\n");

    logctl(&config)
        .args(["level", "bogus"])
        .assert()
        .success()
        .stdout("0 EMGCY\n");

    logctl(&config)
        .args(["level", "bogus", "--strict"])
        .assert()
        .failure()
        .stderr(contains("unknown log level 'bogus'"));
}

#[test]
fn send_without_daemon_falls_back_to_console() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, None);

    logctl(&config)
        .args(["send", "--tag", "boot", "hello", "world"])
        .assert()
        .success()
        .stderr(contains("boot: hello world"));
}

#[test]
fn control_requests_fail_without_daemon() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, None);

    logctl(&config)
        .arg("stop")
        .assert()
        .failure()
        .stderr(contains("daemon is not reachable"));
}

#[test]
fn invalid_config_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("loggerd.yaml");
    fs::write(&config, "level: loud\n").unwrap();

    logctl(&config)
        .args(["send", "x"])
        .assert()
        .failure()
        .stderr(contains("failed to load configuration"));
}

#[test]
fn start_send_stop_cycle_writes_output() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("messages");
    let config = write_config(&dir, Some(&output));

    logctl(&config).arg("start").assert().success();
    assert!(dir.path().join("loggerd.sock").exists());

    logctl(&config)
        .args(["send", "--level", "warning", "--tag", "disk", "almost", "full"])
        .assert()
        .success();

    logctl(&config)
        .arg("stop")
        .assert()
        .success()
        .stdout(contains("daemon stop requested"));

    let text = fs::read_to_string(&output).expect("daemon output");
    assert!(text.contains("WARN disk["), "got: {text}");
    assert!(text.contains("almost full"));
}
