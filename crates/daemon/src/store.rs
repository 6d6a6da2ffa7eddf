// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Code store: writes uploaded sources into per-process directories.
//!
//! Uploads never crash the daemon; every outcome is a `stored <path>` or
//! `store error` acknowledgement on the process status topic.

use std::path::{Component, Path};

use pyros_core::ProcessId;

use crate::daemon::DaemonCtx;
use crate::output;

/// Store the main source file for a process.
///
/// Ensures the process directory and a registry record (defaulting to a
/// plain python process), writes `<id>_main.py` and the package-init shim
/// that re-exports it, and acknowledges on the status topic. A record that
/// already has a running child is marked stale.
pub(crate) fn store_main(ctx: &DaemonCtx, id: &ProcessId, payload: &[u8]) {
    {
        let mut registry = ctx.registry.lock();
        if let Some(record) = registry.get_mut(id) {
            record.stale_code = record.is_running();
        }
    }

    let main_file = ctx.config.main_file(id);
    let written = write_main(ctx, id, payload);

    {
        let mut registry = ctx.registry.lock();
        registry.ensure(id);
    }

    match written {
        Ok(()) => {
            output::emit_status(ctx, id, &format!("stored {id}_main.py"));
        }
        Err(e) => {
            tracing::error!(id = %id, path = %main_file.display(), error = %e, "cannot save main file");
            output::emit_status(ctx, id, "store error");
        }
    }
}

fn write_main(ctx: &DaemonCtx, id: &ProcessId, payload: &[u8]) -> std::io::Result<()> {
    std::fs::create_dir_all(ctx.config.process_dir(id))?;
    std::fs::write(ctx.config.main_file(id), payload)?;
    std::fs::write(ctx.config.init_file(id), format!("from {id}.{id}_main import *\n"))?;
    Ok(())
}

/// Store an extra file for a process, creating intermediate directories.
/// The relative path from the topic is preserved verbatim.
pub(crate) fn store_extra(ctx: &DaemonCtx, id: &ProcessId, name: &str, payload: &[u8]) {
    if !is_safe_relative(Path::new(name)) {
        tracing::warn!(id = %id, name, "rejecting extra file escaping the process directory");
        output::emit_status(ctx, id, "store error");
        return;
    }

    let file = ctx.config.process_dir(id).join(name);
    let written = (|| -> std::io::Result<()> {
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&file, payload)
    })();

    match written {
        Ok(()) => {
            output::emit_status(ctx, id, &format!("stored {name}"));
        }
        Err(e) => {
            tracing::error!(id = %id, path = %file.display(), error = %e, "cannot save extra file");
            output::emit_status(ctx, id, "store error");
        }
    }
}

/// Only plain relative paths may land under the process directory.
fn is_safe_relative(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
