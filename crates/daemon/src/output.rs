// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound message helpers.
//!
//! Every line a process produces (or the daemon says about it) flows through
//! here: ring retention plus the publish on the right topic.

use pyros_core::ProcessId;
use pyros_wire as wire;

use crate::daemon::DaemonCtx;

/// Publish a line on the process out topic without touching the ring.
/// Used for ring replay and for errors about unknown processes.
pub(crate) fn process_out(ctx: &DaemonCtx, id: &ProcessId, line: &str) {
    let topic = wire::out_topic(&ctx.qualified(id));
    tracing::trace!(%topic, line, "out");
    ctx.publisher.publish(&topic, line.as_bytes().to_vec());
}

/// Append a line to the process ring (when the process is known) and publish
/// it on the out topic.
pub(crate) fn emit(ctx: &DaemonCtx, id: &ProcessId, line: &str) {
    {
        let mut registry = ctx.registry.lock();
        if let Some(record) = registry.get_mut(id) {
            record.logs.push(line);
        }
    }
    process_out(ctx, id, line);
}

/// Publish a lifecycle or upload acknowledgement on the status topic.
pub(crate) fn emit_status(ctx: &DaemonCtx, id: &ProcessId, status: &str) {
    let topic = wire::status_topic(&ctx.qualified(id));
    tracing::trace!(%topic, status, "status");
    ctx.publisher.publish(&topic, status.as_bytes().to_vec());
}

/// Publish one newline-terminated response line for an admin verb.
pub(crate) fn system_line(ctx: &DaemonCtx, command_id: &str, line: &str) {
    let topic = wire::system_out_topic(command_id);
    tracing::trace!(%topic, line, "system out");
    ctx.publisher.publish(&topic, format!("{line}\n").into_bytes());
}

/// Empty payload: end of output for an admin verb.
pub(crate) fn system_eof(ctx: &DaemonCtx, command_id: &str) {
    ctx.publisher.publish(&wire::system_out_topic(command_id), Vec::new());
}
