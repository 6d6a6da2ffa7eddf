// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound topic classification and outbound topic construction.

use pyros_core::{ClusterId, ProcessId};

/// Topic filters the daemon subscribes to on every (re)connect.
pub const SUBSCRIPTIONS: [&str; 5] =
    ["system/+", "exec/+", "exec/+/process", "exec/+/process/#", "exec/+/system/stop"];

/// Cluster-qualified process address as it appears in topic segments:
/// `process_id` or `cluster_id:process_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Addr {
    pub cluster: ClusterId,
    pub process: ProcessId,
}

impl Addr {
    /// Parse a topic segment. A missing cluster prefix means `master`.
    pub fn parse(segment: &str) -> Self {
        match segment.split_once(':') {
            Some((cluster, process)) => {
                Self { cluster: ClusterId::new(cluster), process: ProcessId::new(process) }
            }
            None => Self { cluster: ClusterId::master(), process: ProcessId::new(segment) },
        }
    }

    /// Whether this daemon should handle the message. A daemon without a
    /// configured cluster id answers only to `master`.
    pub fn accepted_by(&self, local: Option<&ClusterId>) -> bool {
        match local {
            Some(id) => &self.cluster == id,
            None => self.cluster.is_master(),
        }
    }
}

/// A parsed inbound topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundTopic {
    /// `system/<command_id>` — admin verb.
    System { command_id: String },
    /// `exec/<addr>` — per-process verb.
    Command { addr: Addr },
    /// `exec/<addr>/process` — main-file upload.
    MainUpload { addr: Addr },
    /// `exec/<addr>/process/<path…>` — extra-file upload, path preserved.
    ExtraUpload { addr: Addr, path: String },
    /// `exec/<addr>/system/stop` — child's stop acknowledgement.
    StopAck { addr: Addr },
}

/// Classify an inbound topic, or `None` for topics outside the grammar.
pub fn classify(topic: &str) -> Option<InboundTopic> {
    let mut segments = topic.split('/');
    match segments.next()? {
        "system" => {
            let command_id = segments.next()?;
            if command_id.is_empty() || segments.next().is_some() {
                return None;
            }
            Some(InboundTopic::System { command_id: command_id.to_string() })
        }
        "exec" => {
            let addr = Addr::parse(segments.next()?);
            if addr.process.is_empty() {
                return None;
            }
            match segments.next() {
                None => Some(InboundTopic::Command { addr }),
                Some("process") => {
                    let rest: Vec<&str> = segments.collect();
                    if rest.is_empty() {
                        Some(InboundTopic::MainUpload { addr })
                    } else {
                        Some(InboundTopic::ExtraUpload { addr, path: rest.join("/") })
                    }
                }
                Some("system") => match (segments.next(), segments.next()) {
                    (Some("stop"), None) => Some(InboundTopic::StopAck { addr }),
                    _ => None,
                },
                Some(_) => None,
            }
        }
        _ => None,
    }
}

/// Qualify a process id the way this daemon presents it: prefixed with the
/// configured cluster id, bare otherwise.
pub fn qualify(local: Option<&ClusterId>, process: &ProcessId) -> String {
    match local {
        Some(cluster) => format!("{cluster}:{process}"),
        None => process.to_string(),
    }
}

/// `exec/<cid>/out` — line-oriented child output and daemon notices.
pub fn out_topic(qualified: &str) -> String {
    format!("exec/{qualified}/out")
}

/// `exec/<cid>/status` — lifecycle transitions and upload acknowledgements.
pub fn status_topic(qualified: &str) -> String {
    format!("exec/{qualified}/status")
}

/// `exec/<process_id>/system` — outbound stop request to a running child.
/// Deliberately unqualified: the child subscribes with its bare id.
pub fn child_system_topic(process: &ProcessId) -> String {
    format!("exec/{process}/system")
}

/// `system/<command_id>/out` — admin verb responses.
pub fn system_out_topic(command_id: &str) -> String {
    format!("system/{command_id}/out")
}

#[cfg(test)]
#[path = "topic_tests.rs"]
mod tests;
