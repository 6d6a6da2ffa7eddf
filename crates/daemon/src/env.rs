// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

/// Broker address override: `PYROS_MQTT=host[:port]`.
///
/// The same variable is passed down to every child so user programs find
/// the broker the daemon is on.
pub fn mqtt_override() -> Option<String> {
    std::env::var("PYROS_MQTT").ok().filter(|s| !s.is_empty())
}

/// Cluster id override: `PYROS_CLUSTER_ID`.
pub fn cluster_override() -> Option<String> {
    std::env::var("PYROS_CLUSTER_ID").ok().filter(|s| !s.is_empty())
}
