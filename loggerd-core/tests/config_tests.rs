//! Config loading: defaults, alias parsing, error context.

use std::fs;
use std::path::PathBuf;

use loggerd_core::{ConfigError, LoggerConfig, Severity};
use tempfile::TempDir;

#[test]
fn missing_file_yields_defaults() {
    let dir = TempDir::new().expect("tempdir");
    let config = LoggerConfig::load_at(&dir.path().join("absent.yaml")).expect("load");
    assert_eq!(config, LoggerConfig::default());
    assert_eq!(config.level, Severity::Info);
    assert_eq!(config.socket, PathBuf::from("/run/loggerd.sock"));
}

#[test]
fn level_accepts_aliases_and_numbers() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("loggerd.yaml");

    fs::write(&path, "level: dbg\nsocket: /tmp/l.sock\n").expect("write");
    let config = LoggerConfig::load_at(&path).expect("load alias");
    assert_eq!(config.level, Severity::Debug);
    assert_eq!(config.socket, PathBuf::from("/tmp/l.sock"));
    assert_eq!(config.buffer_records, 1024, "unset fields keep defaults");

    fs::write(&path, "level: 3\n").expect("write");
    assert_eq!(LoggerConfig::load_at(&path).expect("load number").level, Severity::Error);

    fs::write(&path, "level: \"2\"\n").expect("write");
    assert_eq!(LoggerConfig::load_at(&path).expect("load quoted").level, Severity::Crit);
}

#[test]
fn unknown_level_is_a_parse_error_with_path() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("loggerd.yaml");
    fs::write(&path, "level: loud\n").expect("write");

    let err = LoggerConfig::load_at(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("loggerd.yaml"));
}

#[test]
fn unknown_keys_are_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("loggerd.yaml");
    fs::write(&path, "sokcet: /tmp/typo.sock\n").expect("write");
    assert!(matches!(
        LoggerConfig::load_at(&path),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn output_round_trips_through_yaml() {
    let config = LoggerConfig {
        output: Some(PathBuf::from("/var/log/messages")),
        level: Severity::Warning,
        ..LoggerConfig::default()
    };
    let text = serde_yaml::to_string(&config).expect("serialize");
    assert!(text.contains("level: warning"), "got: {text}");
    let back: LoggerConfig = serde_yaml::from_str(&text).expect("parse");
    assert_eq!(back, config);
}
