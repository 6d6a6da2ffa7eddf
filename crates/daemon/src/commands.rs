// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-process broker verbs: lifecycle, promotion, heartbeat.
//!
//! Handlers run on the router loop and must not block it; anything that
//! waits (stop, restart, remove) is spawned. State-changing verbs commit to
//! the registry and the `.process` file before returning, so the two agree
//! once the verb completes.

use std::sync::Arc;

use pyros_core::{ProcessId, ProcessKind};

use crate::daemon::DaemonCtx;
use crate::registry;
use crate::{output, supervisor};

/// Dispatch one verb published on `exec/<cid>`.
pub(crate) fn handle(ctx: &Arc<DaemonCtx>, id: &ProcessId, message: &str) {
    tracing::debug!(id = %id, message, "process command");
    let mut params = message.split(' ');
    let verb = params.next().unwrap_or_default();
    match verb {
        "start" => supervisor::start(ctx, id),
        "stop" => {
            tokio::spawn(supervisor::stop(Arc::clone(ctx), id.clone(), false));
        }
        "restart" => restart(ctx, id),
        "remove" => remove(ctx, id),
        "logs" => replay_logs(ctx, id),
        "make-service" => make_service(ctx, id),
        "unmake-service" => unmake_service(ctx, id),
        "enable-service" => enable_service(ctx, id),
        "disable-service" => disable_service(ctx, id),
        "make-agent" => make_agent(ctx, id),
        "set-executable" => set_executable(ctx, id, params.next()),
        "ping" => ping(ctx, id),
        _ => output::emit(ctx, id, &format!("PyROS ERROR: Unknown command {verb}")),
    }
}

fn restart(ctx: &Arc<DaemonCtx>, id: &ProcessId) {
    if !ctx.registry.lock().contains(id) {
        output::process_out(ctx, id, &format!("PyROS ERROR: process {id} does not exist."));
        return;
    }
    tokio::spawn(supervisor::stop(Arc::clone(ctx), id.clone(), true));
}

fn remove(ctx: &Arc<DaemonCtx>, id: &ProcessId) {
    if !ctx.registry.lock().contains(id) {
        output::process_out(ctx, id, &format!("PyROS ERROR: process {id} does not exist."));
        return;
    }
    tokio::spawn(remove_process(Arc::clone(ctx), id.clone()));
}

/// Stop to completion, delete the code directory, drop the registry entry.
pub(crate) async fn remove_process(ctx: Arc<DaemonCtx>, id: ProcessId) {
    supervisor::stop(Arc::clone(&ctx), id.clone(), false).await;

    let dir = ctx.config.process_dir(&id);
    if !dir.exists() {
        output::emit(&ctx, &id, "PyROS ERROR: cannot find process files");
        return;
    }

    remove_dir_contents(&ctx, &id, &dir);
    if let Err(e) = std::fs::remove_dir(&dir) {
        tracing::warn!(id = %id, error = %e, "cannot remove process directory");
        output::emit(&ctx, &id, &format!("PyROS ERROR: cannot remove dir {}", dir.display()));
    }

    let type_name = match ctx.registry.lock().remove(&id) {
        Some(record) => record.meta.type_name(),
        None => return,
    };
    output::process_out(&ctx, &id, &format!("PyROS: removed {type_name}"));
}

/// Unlink everything under the process directory, reporting failures as
/// `PyROS ERROR:` lines but continuing with the rest.
fn remove_dir_contents(ctx: &DaemonCtx, id: &ProcessId, dir: &std::path::Path) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(id = %id, error = %e, "cannot list process directory");
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let removed = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        if removed.is_err() || path.exists() {
            output::emit(ctx, id, &format!("PyROS ERROR: cannot remove file {}", path.display()));
        }
    }
}

/// Replay the retained ring to the out topic, oldest first.
fn replay_logs(ctx: &DaemonCtx, id: &ProcessId) {
    let lines: Vec<String> = {
        let registry = ctx.registry.lock();
        match registry.get(id) {
            Some(record) => record.logs.iter().map(str::to_string).collect(),
            None => return,
        }
    };
    for line in lines {
        output::process_out(ctx, id, &line);
    }
}

fn make_service(ctx: &DaemonCtx, id: &ProcessId) {
    enum Outcome {
        Missing,
        Already,
        Made,
    }
    let outcome = {
        let mut registry = ctx.registry.lock();
        match registry.get_mut(id) {
            None => Outcome::Missing,
            Some(record) if record.meta.kind == ProcessKind::Service => Outcome::Already,
            Some(record) => {
                record.meta.kind = ProcessKind::Service;
                record.meta.enabled = true;
                Outcome::Made
            }
        }
    };
    match outcome {
        Outcome::Missing => missing(ctx, id),
        Outcome::Already => output::emit(ctx, id, &format!("PyROS: {id} is already service")),
        Outcome::Made => {
            persist(ctx, id);
            output::emit(ctx, id, &format!("PyROS: made {id} service"));
        }
    }
}

fn unmake_service(ctx: &DaemonCtx, id: &ProcessId) {
    let found = {
        let mut registry = ctx.registry.lock();
        match registry.get_mut(id) {
            None => false,
            Some(record) => {
                record.meta.kind = ProcessKind::Process;
                record.meta.enabled = false;
                true
            }
        }
    };
    if !found {
        missing(ctx, id);
        return;
    }
    let meta_file = registry::meta_file(&ctx.config, id);
    if meta_file.exists() {
        if let Err(e) = std::fs::remove_file(&meta_file) {
            tracing::warn!(id = %id, error = %e, "cannot delete .process file");
            output::emit(
                ctx,
                id,
                &format!(
                    "PyROS ERROR: failed to unmake process {id}; failed deleting .process file."
                ),
            );
        }
    }
}

fn enable_service(ctx: &DaemonCtx, id: &ProcessId) {
    enum Outcome {
        Missing,
        Promote,
        Enabled,
    }
    let outcome = {
        let mut registry = ctx.registry.lock();
        match registry.get_mut(id) {
            None => Outcome::Missing,
            Some(record) if record.meta.kind != ProcessKind::Service => Outcome::Promote,
            Some(record) => {
                record.meta.enabled = true;
                Outcome::Enabled
            }
        }
    };
    match outcome {
        Outcome::Missing => {
            missing(ctx, id);
            return;
        }
        Outcome::Promote => make_service(ctx, id),
        Outcome::Enabled => persist(ctx, id),
    }
    output::emit(ctx, id, &format!("PyROS: enabled {id} service"));
}

fn disable_service(ctx: &DaemonCtx, id: &ProcessId) {
    enum Outcome {
        Missing,
        NotService,
        Disabled,
    }
    let outcome = {
        let mut registry = ctx.registry.lock();
        match registry.get_mut(id) {
            None => Outcome::Missing,
            Some(record) if record.meta.kind != ProcessKind::Service => Outcome::NotService,
            Some(record) => {
                record.meta.enabled = false;
                Outcome::Disabled
            }
        }
    };
    match outcome {
        Outcome::Missing => missing(ctx, id),
        Outcome::NotService => output::emit(ctx, id, &format!("PyROS: {id} not a service")),
        Outcome::Disabled => {
            persist(ctx, id);
            output::emit(ctx, id, &format!("PyROS: disabled {id} service"));
        }
    }
}

fn make_agent(ctx: &DaemonCtx, id: &ProcessId) {
    enum Outcome {
        Missing,
        Already,
        Made,
    }
    let now_ms = ctx.clock.epoch_ms();
    let outcome = {
        let mut registry = ctx.registry.lock();
        match registry.get_mut(id) {
            None => Outcome::Missing,
            Some(record) if record.meta.kind == ProcessKind::Agent => {
                record.ping(now_ms);
                Outcome::Already
            }
            Some(record) => {
                record.meta.kind = ProcessKind::Agent;
                record.meta.enabled = true;
                record.ping(now_ms);
                Outcome::Made
            }
        }
    };
    match outcome {
        Outcome::Missing => missing(ctx, id),
        Outcome::Already => output::emit(ctx, id, &format!("PyROS: {id} is already agent")),
        Outcome::Made => {
            persist(ctx, id);
            output::emit(ctx, id, &format!("PyROS: made {id} an agent"));
        }
    }
}

fn set_executable(ctx: &DaemonCtx, id: &ProcessId, exe: Option<&str>) {
    let Some(exe) = exe.filter(|exe| !exe.is_empty()) else {
        output::emit(
            ctx,
            id,
            &format!("PyROS ERROR: set executable for {id} missing argument."),
        );
        return;
    };
    let found = {
        let mut registry = ctx.registry.lock();
        match registry.get_mut(id) {
            None => false,
            Some(record) => {
                record.meta.executable = exe.to_string();
                true
            }
        }
    };
    if !found {
        missing(ctx, id);
        return;
    }
    persist(ctx, id);
}

fn ping(ctx: &DaemonCtx, id: &ProcessId) {
    let now_ms = ctx.clock.epoch_ms();
    let found = {
        let mut registry = ctx.registry.lock();
        match registry.get_mut(id) {
            Some(record) => {
                record.ping(now_ms);
                true
            }
            None => false,
        }
    };
    if !found {
        missing(ctx, id);
    }
}

/// Mirror the in-memory metadata to the `.process` file.
fn persist(ctx: &DaemonCtx, id: &ProcessId) {
    let meta = {
        let registry = ctx.registry.lock();
        match registry.get(id) {
            Some(record) => record.meta.clone(),
            None => return,
        }
    };
    if let Err(e) = registry::persist_meta(&ctx.config, id, &meta) {
        tracing::error!(id = %id, error = %e, "cannot write .process file");
        output::emit_status(ctx, id, "store error");
    }
}

fn missing(ctx: &DaemonCtx, id: &ProcessId) {
    output::process_out(ctx, id, &format!("PyROS ERROR: process {id} does not exist."));
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
