// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory process registry and its on-disk `.process` mirror.
//!
//! The registry is the source of truth for what the daemon knows about each
//! process: kind, launch settings, the running child (if any), the output
//! ring, and watchdog bookkeeping. Mutations happen under one mutex held by
//! the caller; nothing here performs long I/O.

use std::collections::HashMap;

use pyros_core::{LogRing, ProcessId, ProcessMeta, Props};
use tokio_util::sync::CancellationToken;

use crate::config::Config;

/// Child state as tracked per record. `Idle` means never started since the
/// record was created; `ps` reports it as `new`.
#[derive(Debug, Clone, Default)]
pub(crate) enum RunState {
    #[default]
    Idle,
    Running {
        pid: Option<u32>,
        /// Cancelling force-kills the child from the supervisor task.
        kill: CancellationToken,
    },
    Exited {
        code: i32,
    },
}

impl RunState {
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running { .. })
    }
}

/// Everything the daemon knows about one process id.
#[derive(Debug, Default)]
pub(crate) struct ProcessRecord {
    pub meta: ProcessMeta,
    pub run: RunState,
    pub logs: LogRing,
    /// Epoch ms of the last heartbeat. Only consulted for agents.
    pub last_ping_ms: Option<u64>,
    /// Newer code was uploaded while an older child is still running.
    pub stale_code: bool,
    /// One-shot: the child acknowledged a stop request.
    pub stop_acknowledged: bool,
}

impl ProcessRecord {
    pub fn new(meta: ProcessMeta) -> Self {
        Self { meta, ..Default::default() }
    }

    pub fn is_running(&self) -> bool {
        self.run.is_running()
    }

    /// `ps` status column.
    pub fn status_label(&self) -> &'static str {
        match &self.run {
            RunState::Running { .. } if self.stale_code => "running-old",
            RunState::Running { .. } => "running",
            RunState::Exited { .. } => "stopped",
            RunState::Idle => "new",
        }
    }

    /// Record a heartbeat. Never rewinds.
    pub fn ping(&mut self, now_ms: u64) {
        if self.last_ping_ms.is_none_or(|prev| prev < now_ms) {
            self.last_ping_ms = Some(now_ms);
        }
    }
}

/// Registry of known processes, keyed by process id.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    map: HashMap<ProcessId, ProcessRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &ProcessId) -> bool {
        self.map.contains_key(id)
    }

    pub fn get(&self, id: &ProcessId) -> Option<&ProcessRecord> {
        self.map.get(id)
    }

    pub fn get_mut(&mut self, id: &ProcessId) -> Option<&mut ProcessRecord> {
        self.map.get_mut(id)
    }

    pub fn insert(&mut self, id: ProcessId, record: ProcessRecord) {
        self.map.insert(id, record);
    }

    pub fn remove(&mut self, id: &ProcessId) -> Option<ProcessRecord> {
        self.map.remove(id)
    }

    /// Get or create a record with default metadata (plain python process).
    pub fn ensure(&mut self, id: &ProcessId) -> &mut ProcessRecord {
        self.map.entry(id.clone()).or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ProcessId, &ProcessRecord)> {
        self.map.iter()
    }

    /// Ids with a live child, minus the excluded ones.
    pub fn running_ids(&self, excludes: &[ProcessId]) -> Vec<ProcessId> {
        self.map
            .iter()
            .filter(|(id, rec)| rec.is_running() && !excludes.contains(id))
            .map(|(id, _)| id.clone())
            .collect()
    }
}

/// Path of the `.process` file, renaming a legacy `.service` file first.
pub(crate) fn meta_file(config: &Config, id: &ProcessId) -> std::path::PathBuf {
    let legacy = config.legacy_service_file(id);
    let current = config.process_file(id);
    if legacy.exists() {
        if let Err(e) = std::fs::rename(&legacy, &current) {
            tracing::warn!(id = %id, error = %e, "cannot rename legacy .service file");
        }
    }
    current
}

/// Load metadata from disk, falling back to defaults on any problem.
pub(crate) fn load_meta(config: &Config, id: &ProcessId) -> ProcessMeta {
    let path = meta_file(config, id);
    match std::fs::read_to_string(&path) {
        Ok(text) => ProcessMeta::from_props(&Props::parse(&text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => ProcessMeta::default(),
        Err(e) => {
            tracing::warn!(id = %id, error = %e, "cannot read .process file");
            ProcessMeta::default()
        }
    }
}

/// Write metadata back to the `.process` file, preserving keys the daemon
/// does not interpret.
pub(crate) fn persist_meta(
    config: &Config,
    id: &ProcessId,
    meta: &ProcessMeta,
) -> std::io::Result<()> {
    let path = meta_file(config, id);
    let mut props = match std::fs::read_to_string(&path) {
        Ok(text) => Props::parse(&text),
        Err(_) => Props::new(),
    };
    for (key, value) in meta.to_props().iter() {
        props.set(key, value);
    }
    if meta.kind == pyros_core::ProcessKind::Process {
        props.remove("enabled");
    }
    std::fs::write(&path, props.render())
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
