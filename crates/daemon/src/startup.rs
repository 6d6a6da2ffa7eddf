// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup scan: rebuild the registry from `code/` and pick the services to
//! auto-start.

use std::sync::Arc;

use pyros_core::{ProcessId, ProcessKind};

use crate::daemon::DaemonCtx;
use crate::registry::{self, ProcessRecord};

/// Enumerate `code/`, register every directory that carries a main file,
/// and return the enabled services in deterministic order. Also provisions
/// the working-directory layout (`code/`, `logs/`, `data/`).
pub(crate) fn scan(ctx: &Arc<DaemonCtx>) -> std::io::Result<Vec<ProcessId>> {
    let config = &ctx.config;
    std::fs::create_dir_all(config.code_dir())?;
    std::fs::create_dir_all(config.home_dir.join("logs"))?;
    std::fs::create_dir_all(config.home_dir.join("data"))?;

    let mut to_start = Vec::new();
    for entry in std::fs::read_dir(config.code_dir())? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let id = ProcessId::new(entry.file_name().to_string_lossy().into_owned());
        if !config.main_file(&id).exists() {
            continue;
        }

        let meta = registry::load_meta(config, &id);
        let autostart = meta.kind == ProcessKind::Service && meta.enabled;
        tracing::debug!(id = %id, kind = meta.kind.as_str(), autostart, "discovered process");
        ctx.registry.lock().insert(id.clone(), ProcessRecord::new(meta));
        if autostart {
            to_start.push(id);
        }
    }
    to_start.sort();
    Ok(to_start)
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
