// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MQTT transport: one broker connection, automatic reconnect with a retry
//! cap, sequential delivery of inbound messages.
//!
//! The event-loop task owns all connection state. Subscriptions are
//! re-established on every ConnAck because the broker drops them for clean
//! sessions. Handlers never run on this task; inbound publishes are
//! forwarded over a channel to the router loop.

use std::time::{Duration, Instant};

use rumqttc::{AsyncClient, ConnectReturnCode, Event, MqttOptions, Packet, QoS};
use tokio::sync::{mpsc, watch};

use crate::config::Config;
use pyros_wire::SUBSCRIPTIONS;

/// Spacing between reconnect attempts when the previous one failed fast.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// An inbound application message.
#[derive(Debug)]
pub(crate) struct Inbound {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Start the transport. Returns the shared client (for publishing), the
/// inbound message stream, and a connectivity signal.
pub(crate) fn start(
    config: &Config,
) -> (AsyncClient, mpsc::UnboundedReceiver<Inbound>, watch::Receiver<bool>) {
    let mut options = MqttOptions::new(config.client_name(), &config.host, config.port);
    options.set_keep_alive(config.timeout);

    let (client, mut event_loop) = AsyncClient::new(options, 64);
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (connected_tx, connected_rx) = watch::channel(false);

    let host = config.host.clone();
    let port = config.port;
    let max_retries = config.max_reconnect_retries;
    let subscriber = client.clone();

    tokio::spawn(async move {
        let mut retries = 0u32;
        loop {
            let attempt_started = Instant::now();
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code != ConnectReturnCode::Success {
                        tracing::error!(code = ?ack.code, "connection returned error result");
                        std::process::exit(refusal_code(ack.code));
                    }
                    retries = 0;
                    for filter in SUBSCRIPTIONS {
                        if let Err(e) = subscriber.try_subscribe(filter, QoS::AtMostOnce) {
                            tracing::warn!(filter, error = %e, "subscribe failed");
                        }
                    }
                    let _ = connected_tx.send(true);
                    tracing::info!(host, port, "connected to broker");
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let _ = inbound_tx.send(Inbound {
                        topic: publish.topic,
                        payload: publish.payload.to_vec(),
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    let _ = connected_tx.send(false);
                    retries += 1;
                    tracing::warn!(host, port, retries, error = %e, "broker connection failed, retrying");
                    if retries > max_retries {
                        tracing::error!("FATAL: leaving after too many retries.");
                        std::process::exit(1);
                    }
                    if attempt_started.elapsed() < RECONNECT_DELAY {
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                }
            }
        }
    });

    (client, inbound_rx, connected_rx)
}

/// Wait until the transport reports a live connection.
pub(crate) async fn wait_connected(connected: &mut watch::Receiver<bool>) {
    while !*connected.borrow() {
        if connected.changed().await.is_err() {
            return;
        }
    }
}

/// Exit code for a broker that refused the connection: the MQTT v3 return
/// code (1–5).
fn refusal_code(code: ConnectReturnCode) -> i32 {
    match code {
        ConnectReturnCode::Success => 0,
        ConnectReturnCode::RefusedProtocolVersion => 1,
        ConnectReturnCode::BadClientId => 2,
        ConnectReturnCode::ServiceUnavailable => 3,
        ConnectReturnCode::BadUserNamePassword => 4,
        ConnectReturnCode::NotAuthorized => 5,
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
