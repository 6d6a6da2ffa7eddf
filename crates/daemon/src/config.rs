// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: CLI arguments, `pyros.config`, environment.
//!
//! Precedence mirrors the historical daemon: built-in defaults, then the
//! config file, then CLI arguments for the broker address and verbosity,
//! with `PYROS_MQTT` / `PYROS_CLUSTER_ID` overriding everything.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use pyros_core::{ClusterId, ProcessId, Props};
use thiserror::Error;

use crate::env;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 1883;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_RECONNECT_RETRIES: u32 = 20;
pub const DEFAULT_THREAD_KILL_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_AGENTS_CHECK_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_AGENTS_KILL_TIMEOUT: Duration = Duration::from_secs(180);
pub const DEFAULT_DEBUG_LEVEL: u8 = 1;

const CONFIG_FILE: &str = "pyros.config";

/// PyROS core daemon.
#[derive(Debug, Parser)]
#[command(name = "pyrosd", about = "PyROS core daemon.")]
pub struct Args {
    /// Increase debug level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Timeout for MQTT operations (connect, read, etc), in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Working directory
    #[arg(short = 'd', long = "home-dir")]
    pub home_dir: Option<PathBuf>,

    /// Cluster id
    #[arg(short = 'c', long = "cluster-id")]
    pub cluster_id: Option<String>,

    /// Host name and optionally port to connect to, in host[:port] format
    pub host_port: Option<String>,
}

/// Configuration errors. All of them are fatal (exit 1).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Home directory {} does not exist.", .0.display())]
    HomeDirMissing(PathBuf),

    #[error("port must be a number. '{0}' is not a number.")]
    BadPort(String),

    #[error("host and port should be in host:port format, not '{0}'.")]
    BadHostPort(String),

    #[error("cannot read {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
}

/// Resolved daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory holding `code/`, `logs/`, `data/` and the config
    /// file.
    pub home_dir: PathBuf,
    pub host: String,
    pub port: u16,
    /// MQTT keep-alive / operation timeout.
    pub timeout: Duration,
    pub max_reconnect_retries: u32,
    /// `None` means this daemon answers to the implicit `master` cluster.
    pub cluster_id: Option<ClusterId>,
    pub thread_kill_timeout: Duration,
    pub agents_check_timeout: Duration,
    pub agents_kill_timeout: Duration,
    pub debug_level: u8,
}

impl Config {
    /// Resolve configuration from arguments, `pyros.config` and environment.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let home_dir = match &args.home_dir {
            Some(dir) => {
                let dir = absolute(dir);
                if !dir.is_dir() {
                    return Err(ConfigError::HomeDirMissing(dir));
                }
                dir
            }
            None => absolute(Path::new(".")),
        };

        let file = read_config_file(&home_dir)?;

        let mut config = Self {
            home_dir,
            host: file.str_or("mqtt.host", DEFAULT_HOST),
            port: DEFAULT_PORT,
            timeout: Duration::from_secs(
                file.u64_or("mqtt.timeout", args.timeout.unwrap_or(DEFAULT_TIMEOUT.as_secs())),
            ),
            max_reconnect_retries: file
                .u64_or("mqtt.max_reconnect_retries", u64::from(DEFAULT_RECONNECT_RETRIES))
                as u32,
            cluster_id: file.props.get("cluster_id").map(ClusterId::new),
            thread_kill_timeout: file
                .secs_or("thread.kill.timeout", DEFAULT_THREAD_KILL_TIMEOUT),
            agents_check_timeout: file
                .secs_or("agents.check.timeout", DEFAULT_AGENTS_CHECK_TIMEOUT),
            agents_kill_timeout: file.secs_or("agents.kill.timeout", DEFAULT_AGENTS_KILL_TIMEOUT),
            debug_level: file.u64_or("debug.level", u64::from(DEFAULT_DEBUG_LEVEL)) as u8,
        };

        if let Some(port) = file.props.get("mqtt.port") {
            config.port = parse_port(port)?;
        }

        if args.verbose > 0 {
            config.debug_level = args.verbose;
        }

        if let Some(cluster) = &args.cluster_id {
            config.cluster_id = Some(ClusterId::new(cluster.as_str()));
        }

        if let Some(host_port) = &args.host_port {
            let (host, port) = split_host_port(host_port)?;
            config.host = host;
            if let Some(port) = port {
                config.port = port;
            }
        }

        if let Some(host_port) = env::mqtt_override() {
            let (host, port) = split_host_port(&host_port)?;
            config.host = host;
            if let Some(port) = port {
                config.port = port;
            }
        }

        if let Some(cluster) = env::cluster_override() {
            config.cluster_id = Some(ClusterId::new(cluster));
        }

        Ok(config)
    }

    /// MQTT client name: `PyROS` or `PyROS:<cluster_id>`.
    pub fn client_name(&self) -> String {
        match &self.cluster_id {
            Some(cluster) => format!("PyROS:{cluster}"),
            None => "PyROS".to_string(),
        }
    }

    pub fn code_dir(&self) -> PathBuf {
        self.home_dir.join("code")
    }

    pub fn process_dir(&self, id: &ProcessId) -> PathBuf {
        self.code_dir().join(id.as_str())
    }

    pub fn main_file(&self, id: &ProcessId) -> PathBuf {
        self.process_dir(id).join(format!("{id}_main.py"))
    }

    pub fn init_file(&self, id: &ProcessId) -> PathBuf {
        self.process_dir(id).join("__init__.py")
    }

    pub fn process_file(&self, id: &ProcessId) -> PathBuf {
        self.process_dir(id).join(".process")
    }

    pub fn legacy_service_file(&self, id: &ProcessId) -> PathBuf {
        self.process_dir(id).join(".service")
    }
}

/// `pyros.config` contents with typed accessors that warn and fall back on
/// unparseable values.
struct ConfigFile {
    props: Props,
}

impl ConfigFile {
    fn str_or(&self, key: &str, default: &str) -> String {
        self.props.get(key).unwrap_or(default).to_string()
    }

    fn u64_or(&self, key: &str, default: u64) -> u64 {
        match self.props.get(key) {
            Some(value) => value.parse().unwrap_or_else(|_| {
                tracing::warn!(key, value, "cannot convert config value to integer");
                default
            }),
            None => default,
        }
    }

    fn secs_or(&self, key: &str, default: Duration) -> Duration {
        match self.props.get(key) {
            Some(value) => value.parse::<f64>().map(Duration::from_secs_f64).unwrap_or_else(
                |_| {
                    tracing::warn!(key, value, "cannot convert config value to seconds");
                    default
                },
            ),
            None => default,
        }
    }
}

/// A missing config file is an empty one; defaults apply.
fn read_config_file(home_dir: &Path) -> Result<ConfigFile, ConfigError> {
    let path = home_dir.join(CONFIG_FILE);
    let props = match std::fs::read_to_string(&path) {
        Ok(text) => Props::parse(&text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Props::new(),
        Err(e) => return Err(ConfigError::Io(path, e)),
    };
    Ok(ConfigFile { props })
}

fn parse_port(s: &str) -> Result<u16, ConfigError> {
    s.parse().map_err(|_| ConfigError::BadPort(s.to_string()))
}

/// Split `host[:port]`, rejecting more than one `:`.
fn split_host_port(s: &str) -> Result<(String, Option<u16>), ConfigError> {
    let mut parts = s.split(':');
    let host = parts.next().unwrap_or_default().to_string();
    match (parts.next(), parts.next()) {
        (None, _) => Ok((host, None)),
        (Some(port), None) => Ok((host, Some(parse_port(port)?))),
        (Some(_), Some(_)) => Err(ConfigError::BadHostPort(s.to_string())),
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
pub(crate) fn test_config(home_dir: PathBuf) -> Config {
    Config {
        home_dir,
        host: "localhost".to_string(),
        port: 1883,
        timeout: Duration::from_secs(1),
        max_reconnect_retries: 1,
        cluster_id: None,
        thread_kill_timeout: Duration::from_millis(300),
        agents_check_timeout: Duration::from_millis(50),
        agents_kill_timeout: Duration::from_secs(180),
        debug_level: 0,
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
