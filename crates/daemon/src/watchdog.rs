// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent liveness watchdog.
//!
//! Agents are expected to `ping` over the broker; one that goes silent for
//! longer than `agents.kill.timeout` is cooperatively stopped. The watchdog
//! never restarts anything.

use std::sync::Arc;
use std::time::Duration;

use pyros_core::{ProcessId, ProcessKind};

use crate::daemon::DaemonCtx;
use crate::registry::Registry;
use crate::supervisor;

/// Run the periodic check until the daemon exits.
pub(crate) fn spawn(ctx: Arc<DaemonCtx>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(ctx.config.agents_check_timeout);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await; // the first tick completes immediately
        loop {
            ticker.tick().await;
            let now_ms = ctx.clock.epoch_ms();
            let stale = {
                let registry = ctx.registry.lock();
                stale_agents(&registry, now_ms, ctx.config.agents_kill_timeout)
            };
            for id in stale {
                tracing::info!(id = %id, "agent missed its ping window, stopping");
                tokio::spawn(supervisor::stop(Arc::clone(&ctx), id, false));
            }
        }
    })
}

/// Running agents whose last ping is missing or older than the kill
/// timeout.
pub(crate) fn stale_agents(
    registry: &Registry,
    now_ms: u64,
    kill_timeout: Duration,
) -> Vec<ProcessId> {
    let cutoff = now_ms.saturating_sub(kill_timeout.as_millis() as u64);
    registry
        .iter()
        .filter(|(_, record)| record.meta.kind == ProcessKind::Agent && record.is_running())
        .filter(|(_, record)| record.last_ping_ms.is_none_or(|ping| ping < cutoff))
        .map(|(id, _)| id.clone())
        .collect()
}

#[cfg(test)]
#[path = "watchdog_tests.rs"]
mod tests;
