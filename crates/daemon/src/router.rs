// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Topic router: classifies inbound messages and dispatches them.
//!
//! Runs on the daemon loop; messages addressed to other clusters are
//! silently dropped, unknown topics only warn. Handlers that wait spawn
//! their own tasks, so routing itself never blocks.

use std::sync::Arc;

use pyros_wire::{self as wire, InboundTopic};

use crate::daemon::DaemonCtx;
use crate::transport::Inbound;
use crate::{commands, output, store, system};

pub(crate) fn handle(ctx: &Arc<DaemonCtx>, message: Inbound) {
    let Some(topic) = wire::classify(&message.topic) else {
        tracing::warn!(topic = %message.topic, "no such topic");
        return;
    };

    let local = ctx.config.cluster_id.as_ref();
    match topic {
        InboundTopic::System { command_id } => {
            let line = String::from_utf8_lossy(&message.payload);
            system::handle(ctx, &command_id, &line);
        }
        InboundTopic::Command { addr } => {
            if !addr.accepted_by(local) {
                return;
            }
            let known = ctx.registry.lock().contains(&addr.process);
            if known {
                let line = String::from_utf8_lossy(&message.payload);
                commands::handle(ctx, &addr.process, &line);
            } else {
                output::process_out(
                    ctx,
                    &addr.process,
                    &format!("No such process '{}'", addr.process),
                );
            }
        }
        InboundTopic::MainUpload { addr } => {
            if addr.accepted_by(local) {
                store::store_main(ctx, &addr.process, &message.payload);
            }
        }
        InboundTopic::ExtraUpload { addr, path } => {
            if addr.accepted_by(local) {
                store::store_extra(ctx, &addr.process, &path, &message.payload);
            }
        }
        InboundTopic::StopAck { addr } => {
            if !addr.accepted_by(local) {
                return;
            }
            if message.payload != wire::STOP_ACK.as_bytes() {
                return;
            }
            let mut registry = ctx.registry.lock();
            if let Some(record) = registry.get_mut(&addr.process) {
                record.stop_acknowledged = true;
            }
        }
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
