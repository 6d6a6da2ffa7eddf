// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker-visible admin verbs: `ps`, `services`, `stop`.
//!
//! Responses go to `system/<command_id>/out`, one newline-terminated line
//! per record, always closed with an empty payload as end-of-output.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use pyros_core::{ProcessId, ProcessKind};

use crate::daemon::DaemonCtx;
use crate::registry::RunState;
use crate::{output, supervisor};

/// Poll interval while waiting for children to die during shutdown.
const SHUTDOWN_POLL: Duration = Duration::from_millis(20);
/// Grace period for the final `stopped` frame to leave before exiting.
const SHUTDOWN_FLUSH: Duration = Duration::from_secs(2);

/// Dispatch one admin verb published on `system/<command_id>`.
pub(crate) fn handle(ctx: &Arc<DaemonCtx>, command_id: &str, line: &str) {
    tracing::debug!(command_id, line, "system command");
    let mut args = line.split(' ');
    let command = args.next().unwrap_or_default();
    match command {
        "ps" => ps(ctx, command_id),
        "services" => services(ctx, command_id),
        "stop" => {
            let excludes: Vec<ProcessId> =
                args.filter(|arg| !arg.is_empty()).map(ProcessId::new).collect();
            tokio::spawn(stop_daemon(Arc::clone(ctx), command_id.to_string(), excludes));
        }
        _ => output::system_line(ctx, command_id, &format!("Command {line} is not implemented")),
    }
    output::system_eof(ctx, command_id);
}

struct PsRow {
    qualified: String,
    type_name: &'static str,
    status: &'static str,
    return_code: String,
    main_file: PathBuf,
    last_ping: String,
}

/// One line per known process:
/// `<cid> <type> <status> <rc> <size> <mtime> <last_ping>`, `-` for unknown
/// fields.
fn ps(ctx: &DaemonCtx, command_id: &str) {
    let mut rows: Vec<PsRow> = {
        let registry = ctx.registry.lock();
        registry
            .iter()
            .map(|(id, record)| PsRow {
                qualified: ctx.qualified(id),
                type_name: record.meta.type_name(),
                status: record.status_label(),
                return_code: match &record.run {
                    RunState::Running { .. } => "-".to_string(),
                    RunState::Exited { code } => code.to_string(),
                    RunState::Idle => "-".to_string(),
                },
                main_file: ctx.config.main_file(id),
                last_ping: record
                    .last_ping_ms
                    .map(|ms| (ms / 1000).to_string())
                    .unwrap_or_else(|| "-".to_string()),
            })
            .collect()
    };
    rows.sort_by(|a, b| a.qualified.cmp(&b.qualified));

    for row in rows {
        let (size, mtime) = match std::fs::metadata(&row.main_file) {
            Ok(metadata) => (metadata.len().to_string(), mtime_secs(&metadata)),
            Err(_) => ("-".to_string(), "-".to_string()),
        };
        output::system_line(
            ctx,
            command_id,
            &format!(
                "{} {} {} {} {} {} {}",
                row.qualified, row.type_name, row.status, row.return_code, size, mtime,
                row.last_ping
            ),
        );
    }
}

fn mtime_secs(metadata: &std::fs::Metadata) -> String {
    metadata
        .modified()
        .ok()
        .and_then(|mtime| mtime.duration_since(UNIX_EPOCH).ok())
        .map(|age| age.as_secs().to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// One line per service, bare process id.
fn services(ctx: &DaemonCtx, command_id: &str) {
    let mut ids: Vec<String> = {
        let registry = ctx.registry.lock();
        registry
            .iter()
            .filter(|(_, record)| record.meta.kind == ProcessKind::Service)
            .map(|(id, _)| id.to_string())
            .collect()
    };
    ids.sort();
    for id in ids {
        output::system_line(ctx, command_id, &id);
    }
}

/// Graceful daemon shutdown: stop everything (bar the excluded ids),
/// acknowledge, exit.
async fn stop_daemon(ctx: Arc<DaemonCtx>, command_id: String, excludes: Vec<ProcessId>) {
    tracing::info!(excludes = ?excludes, "Stopping PyROS...");
    drain_all(&ctx, &excludes).await;
    output::system_line(&ctx, &command_id, "stopped");
    tokio::time::sleep(SHUTDOWN_FLUSH).await;
    ctx.shutdown.notify_one();
}

/// Best-effort concurrent stop of every running child, bounded by
/// `2 × thread_kill_timeout`. Stop requests go out to all targets before any
/// wait begins.
pub(crate) async fn drain_all(ctx: &Arc<DaemonCtx>, excludes: &[ProcessId]) {
    let targets = ctx.registry.lock().running_ids(excludes);
    if targets.is_empty() {
        return;
    }

    for id in &targets {
        tracing::info!(id = %id, "stopping process");
        tokio::spawn(supervisor::stop(Arc::clone(ctx), id.clone(), false));
    }

    let deadline = std::time::Instant::now() + 2 * ctx.config.thread_kill_timeout;
    loop {
        let not_stopped = ctx.registry.lock().running_ids(excludes);
        if not_stopped.is_empty() {
            return;
        }
        if std::time::Instant::now() >= deadline {
            tracing::warn!(remaining = ?not_stopped, "not all processes stopped");
            return;
        }
        tokio::time::sleep(SHUTDOWN_POLL).await;
    }
}

#[cfg(test)]
#[path = "system_tests.rs"]
mod tests;
