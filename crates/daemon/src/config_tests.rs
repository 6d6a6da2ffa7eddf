// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn args() -> Args {
    Args { verbose: 0, timeout: None, home_dir: None, cluster_id: None, host_port: None }
}

fn args_with_home(home: &Path) -> Args {
    Args { home_dir: Some(home.to_path_buf()), ..args() }
}

// ── host:port parsing ────────────────────────────────────────────────────

#[test]
fn bare_host_keeps_default_port() {
    let (host, port) = split_host_port("rover.local").unwrap();
    assert_eq!(host, "rover.local");
    assert_eq!(port, None);
}

#[test]
fn host_and_port_split() {
    let (host, port) = split_host_port("rover.local:1884").unwrap();
    assert_eq!(host, "rover.local");
    assert_eq!(port, Some(1884));
}

#[yare::parameterized(
    not_a_number = { "host:abc" },
    empty_port   = { "host:" },
)]
fn bad_port_is_rejected(input: &str) {
    assert!(matches!(split_host_port(input), Err(ConfigError::BadPort(_))));
}

#[test]
fn too_many_segments_rejected() {
    assert!(matches!(split_host_port("a:1:2"), Err(ConfigError::BadHostPort(_))));
}

// ── Config::load ─────────────────────────────────────────────────────────

#[test]
fn missing_home_dir_is_fatal() {
    let dir = tempdir().unwrap();
    let gone = dir.path().join("nope");
    let result = Config::load(&args_with_home(&gone));
    assert!(matches!(result, Err(ConfigError::HomeDirMissing(_))));
}

#[test]
fn missing_config_file_uses_defaults() {
    let dir = tempdir().unwrap();
    let config = Config::load(&args_with_home(dir.path())).unwrap();
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    assert_eq!(config.max_reconnect_retries, DEFAULT_RECONNECT_RETRIES);
    assert_eq!(config.debug_level, DEFAULT_DEBUG_LEVEL);
    assert_eq!(config.cluster_id, None);
    assert_eq!(config.client_name(), "PyROS");
}

#[test]
fn config_file_values_are_applied() {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("pyros.config"),
        "mqtt.host=broker\nmqtt.port=2883\ncluster_id=rover4\nthread.kill.timeout=0.5\nagents.kill.timeout=60\n",
    )
    .unwrap();
    let config = Config::load(&args_with_home(dir.path())).unwrap();
    assert_eq!(config.host, "broker");
    assert_eq!(config.port, 2883);
    assert_eq!(config.cluster_id, Some(pyros_core::ClusterId::new("rover4")));
    assert_eq!(config.thread_kill_timeout, Duration::from_millis(500));
    assert_eq!(config.agents_kill_timeout, Duration::from_secs(60));
    assert_eq!(config.client_name(), "PyROS:rover4");
}

#[test]
fn unparseable_config_value_falls_back() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("pyros.config"), "mqtt.timeout=soon\n").unwrap();
    let config = Config::load(&args_with_home(dir.path())).unwrap();
    assert_eq!(config.timeout, DEFAULT_TIMEOUT);
}

#[test]
fn positional_host_port_overrides_config_file() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("pyros.config"), "mqtt.host=broker\nmqtt.port=2883\n").unwrap();
    let mut args = args_with_home(dir.path());
    args.host_port = Some("other:1999".to_string());
    let config = Config::load(&args).unwrap();
    assert_eq!(config.host, "other");
    assert_eq!(config.port, 1999);
}

#[test]
fn cluster_flag_overrides_config_file() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("pyros.config"), "cluster_id=rover4\n").unwrap();
    let mut args = args_with_home(dir.path());
    args.cluster_id = Some("rover9".to_string());
    let config = Config::load(&args).unwrap();
    assert_eq!(config.cluster_id, Some(pyros_core::ClusterId::new("rover9")));
}

#[test]
fn verbosity_flag_overrides_debug_level() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("pyros.config"), "debug.level=0\n").unwrap();
    let mut args = args_with_home(dir.path());
    args.verbose = 3;
    let config = Config::load(&args).unwrap();
    assert_eq!(config.debug_level, 3);
}

// ── path layout ──────────────────────────────────────────────────────────

#[test]
fn path_layout_under_code_dir() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path().to_path_buf());
    let id = pyros_core::ProcessId::new("alpha");
    assert_eq!(config.process_dir(&id), dir.path().join("code/alpha"));
    assert_eq!(config.main_file(&id), dir.path().join("code/alpha/alpha_main.py"));
    assert_eq!(config.init_file(&id), dir.path().join("code/alpha/__init__.py"));
    assert_eq!(config.process_file(&id), dir.path().join("code/alpha/.process"));
    assert_eq!(config.legacy_service_file(&id), dir.path().join("code/alpha/.service"));
}
