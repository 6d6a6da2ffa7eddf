// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Publish-side seam over the broker client.
//!
//! Everything the daemon says goes through [`Publisher`], so handlers and
//! the supervisor never touch rumqttc directly and tests can capture frames
//! with [`FakePublisher`].

use rumqttc::{AsyncClient, QoS};

/// Fire-and-forget QoS 0 publishing, usable from any task.
pub(crate) trait Publisher: Send + Sync {
    fn publish(&self, topic: &str, payload: Vec<u8>);
}

/// Production publisher over the shared rumqttc client.
pub(crate) struct MqttPublisher {
    client: AsyncClient,
}

impl MqttPublisher {
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }
}

impl Publisher for MqttPublisher {
    fn publish(&self, topic: &str, payload: Vec<u8>) {
        // QoS 0 everywhere; a full request queue just drops the frame.
        if let Err(e) = self.client.try_publish(topic, QoS::AtMostOnce, false, payload) {
            tracing::debug!(topic, error = %e, "dropping publish");
        }
    }
}

#[cfg(test)]
pub(crate) use fake::FakePublisher;

#[cfg(test)]
mod fake {
    use super::Publisher;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Captures published frames for assertions.
    #[derive(Clone, Default)]
    pub(crate) struct FakePublisher {
        frames: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    }

    impl FakePublisher {
        pub fn new() -> Self {
            Self::default()
        }

        /// All frames published so far, in order.
        pub fn frames(&self) -> Vec<(String, Vec<u8>)> {
            self.frames.lock().clone()
        }

        /// UTF-8 payloads published to one topic, in order.
        pub fn lines(&self, topic: &str) -> Vec<String> {
            self.frames
                .lock()
                .iter()
                .filter(|(t, _)| t == topic)
                .map(|(_, p)| String::from_utf8_lossy(p).into_owned())
                .collect()
        }

        pub fn clear(&self) {
            self.frames.lock().clear();
        }
    }

    impl Publisher for FakePublisher {
        fn publish(&self, topic: &str, payload: Vec<u8>) {
            self.frames.lock().push((topic.to_string(), payload));
        }
    }
}
