// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

#[test]
fn process_id_hash_map_lookup_by_str() {
    let mut map = HashMap::new();
    map.insert(ProcessId::new("alpha"), 1);
    assert_eq!(map.get("alpha"), Some(&1));
    assert_eq!(map.get("bravo"), None);
}

#[test]
fn cluster_master_round_trip() {
    let master = ClusterId::master();
    assert!(master.is_master());
    assert_eq!(master.as_str(), DEFAULT_CLUSTER);
    assert!(!ClusterId::new("rover4").is_master());
}

#[test]
fn display_matches_inner() {
    assert_eq!(ProcessId::new("alpha").to_string(), "alpha");
    assert_eq!(ClusterId::new("c2").to_string(), "c2");
}
