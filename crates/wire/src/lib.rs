// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MQTT topic grammar spoken between the daemon and its clients.
//!
//! This crate owns the mapping between topic strings and the daemon's
//! message model: classification of inbound topics, the cluster-qualified
//! process address, and construction of the outbound topics. It performs no
//! I/O.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod topic;

pub use topic::{
    child_system_topic, classify, out_topic, qualify, status_topic, system_out_topic, Addr,
    InboundTopic, SUBSCRIPTIONS,
};

/// Payload a child publishes on its stop back-channel to acknowledge a stop
/// request. Anything else on that topic is ignored.
pub const STOP_ACK: &str = "stopped";

/// Payload the daemon publishes to ask a child to stop cooperatively.
pub const STOP_REQUEST: &str = "stop";
