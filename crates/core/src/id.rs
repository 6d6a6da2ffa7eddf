// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process and cluster identifiers.
//!
//! A process id doubles as a directory name under `code/` and as an MQTT
//! topic segment, so it is kept as an owned string rather than a fixed-size
//! buffer.

/// The cluster every unqualified message implicitly addresses.
pub const DEFAULT_CLUSTER: &str = "master";

macro_rules! define_str_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_str_id! {
    /// Short name of an uploaded program: directory name, topic segment,
    /// registry key.
    ProcessId
}

define_str_id! {
    /// Identifier sharding broker traffic across co-resident daemons.
    ClusterId
}

impl ClusterId {
    /// The implicit cluster used when no id is configured.
    pub fn master() -> Self {
        Self::new(DEFAULT_CLUSTER)
    }

    pub fn is_master(&self) -> bool {
        self.0 == DEFAULT_CLUSTER
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
