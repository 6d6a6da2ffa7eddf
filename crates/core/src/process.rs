// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process kind and on-disk metadata.
//!
//! Every known process carries a `.process` file in its code directory with
//! `type`, `enabled` and `exec` keys. `ProcessMeta` is the in-memory view;
//! it round-trips through [`Props`] so keys it does not understand are kept.

use crate::props::Props;

/// Command used to launch a process when none was configured.
pub const DEFAULT_EXECUTABLE: &str = "python3";

/// What a registered program is to the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessKind {
    /// Plain uploaded program, started and stopped on request.
    Process,
    /// Auto-started on daemon boot when enabled.
    Service,
    /// Subject to the heartbeat watchdog.
    Agent,
}

impl ProcessKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessKind::Process => "process",
            ProcessKind::Service => "service",
            ProcessKind::Agent => "agent",
        }
    }

    /// Parse the `type` property; anything unrecognized is a plain process.
    pub fn parse(s: &str) -> Self {
        match s {
            "service" => ProcessKind::Service,
            "agent" => ProcessKind::Agent,
            _ => ProcessKind::Process,
        }
    }
}

/// Persistent per-process settings, mirrored in the `.process` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessMeta {
    pub kind: ProcessKind,
    /// Auto-start on boot. Only meaningful for services.
    pub enabled: bool,
    /// Launch command. Python-ish executables get the `<id>_main.py` form.
    pub executable: String,
    /// Properties we do not interpret, preserved across rewrites.
    pub extra: Props,
}

impl Default for ProcessMeta {
    fn default() -> Self {
        Self {
            kind: ProcessKind::Process,
            enabled: false,
            executable: DEFAULT_EXECUTABLE.to_string(),
            extra: Props::new(),
        }
    }
}

impl ProcessMeta {
    /// Build from a parsed `.process` file, applying defaults for missing
    /// keys.
    pub fn from_props(props: &Props) -> Self {
        let kind = props.get("type").map(ProcessKind::parse).unwrap_or(ProcessKind::Process);
        let enabled = props.get("enabled") == Some("True");
        let executable =
            props.get("exec").unwrap_or(DEFAULT_EXECUTABLE).to_string();
        let mut extra = props.clone();
        extra.remove("type");
        extra.remove("enabled");
        extra.remove("exec");
        Self { kind, enabled, executable, extra }
    }

    /// Render to `.process` file form, keeping unknown keys.
    pub fn to_props(&self) -> Props {
        let mut props = Props::new();
        props.set("type", self.kind.as_str());
        if self.kind != ProcessKind::Process {
            props.set("enabled", if self.enabled { "True" } else { "False" });
        }
        props.set("exec", &self.executable);
        for (key, value) in self.extra.iter() {
            props.set(key, value);
        }
        props
    }

    /// Display name used by `ps`: disabled services are called out.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            ProcessKind::Service if self.enabled => "service",
            ProcessKind::Service => "service(disabled)",
            ProcessKind::Agent => "agent",
            ProcessKind::Process => "process",
        }
    }

    /// Whether the executable uses the `<id>_main.py` launch form.
    pub fn is_python(&self) -> bool {
        self.executable.starts_with("python")
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
