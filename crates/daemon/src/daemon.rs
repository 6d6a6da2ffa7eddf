// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon assembly and main loop.
//!
//! Wires the transport, router, supervisor, and watchdog together around the
//! shared [`DaemonCtx`]. Inbound messages are handled sequentially on this
//! loop; handlers spawn tasks for anything that waits.

use std::sync::Arc;

use parking_lot::Mutex;
use pyros_core::{Clock, ProcessId, SystemClock};
use thiserror::Error;
use tokio::sync::Notify;

use crate::config::Config;
use crate::publish::{MqttPublisher, Publisher};
use crate::registry::Registry;
use crate::{router, startup, supervisor, system, transport, watchdog};

/// Shared daemon context passed to every handler.
///
/// Replaces the historical process-wide singletons: the registry, the broker
/// client and the clock travel together, explicitly.
pub(crate) struct DaemonCtx {
    pub config: Config,
    pub registry: Mutex<Registry>,
    pub publisher: Arc<dyn Publisher>,
    pub clock: Arc<dyn Clock>,
    /// Notified once by whatever decides the daemon should exit.
    pub shutdown: Notify,
}

impl DaemonCtx {
    /// Process id as presented on outbound topics: cluster-prefixed when a
    /// cluster id is configured.
    pub fn qualified(&self, id: &ProcessId) -> String {
        pyros_wire::qualify(self.config.cluster_id.as_ref(), id)
    }
}

/// Fatal daemon errors surfaced to `main`.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run the daemon until a graceful shutdown is requested.
pub async fn run(config: Config) -> Result<(), DaemonError> {
    let (client, mut inbound, mut connected) = transport::start(&config);
    let ctx = Arc::new(DaemonCtx {
        registry: Mutex::new(Registry::new()),
        publisher: Arc::new(MqttPublisher::new(client)),
        clock: Arc::new(SystemClock),
        shutdown: Notify::new(),
        config,
    });

    // Connect before touching any process state so auto-started services
    // find a live broker.
    transport::wait_connected(&mut connected).await;
    tracing::info!("Started PyROS.");

    for id in startup::scan(&ctx)? {
        supervisor::start(&ctx, &id);
    }

    watchdog::spawn(Arc::clone(&ctx));

    loop {
        tokio::select! {
            message = inbound.recv() => match message {
                Some(message) => router::handle(&ctx, message),
                None => break,
            },
            _ = ctx.shutdown.notified() => break,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted; stopping children");
                system::drain_all(&ctx, &[]).await;
                break;
            }
        }
    }

    tracing::info!("PyROS stopped.");
    Ok(())
}

#[cfg(test)]
pub(crate) use test_support::{test_ctx, test_ctx_with};
