// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

use crate::daemon::test_ctx;
use crate::registry::ProcessRecord;
use crate::store;
use pyros_core::ProcessMeta;

fn registered(ctx: &DaemonCtx, name: &str) -> ProcessId {
    let id = ProcessId::new(name);
    std::fs::create_dir_all(ctx.config.process_dir(&id)).unwrap();
    ctx.registry.lock().insert(id.clone(), ProcessRecord::new(ProcessMeta::default()));
    id
}

fn meta_text(ctx: &DaemonCtx, id: &ProcessId) -> String {
    std::fs::read_to_string(ctx.config.process_file(id)).unwrap_or_default()
}

// ── promotion verbs ──────────────────────────────────────────────────────

#[tokio::test]
async fn make_service_updates_memory_and_disk() {
    let dir = tempdir().unwrap();
    let (ctx, publisher, _) = test_ctx(dir.path());
    let id = registered(&ctx, "alpha");

    handle(&ctx, &id, "make-service");

    {
        let registry = ctx.registry.lock();
        let meta = &registry.get(&id).unwrap().meta;
        assert_eq!(meta.kind, ProcessKind::Service);
        assert!(meta.enabled);
    }
    let text = meta_text(&ctx, &id);
    assert!(text.contains("type=service"));
    assert!(text.contains("enabled=True"));
    assert!(publisher.lines("exec/alpha/out").contains(&"PyROS: made alpha service".to_string()));
}

#[tokio::test]
async fn make_service_twice_reports_already() {
    let dir = tempdir().unwrap();
    let (ctx, publisher, _) = test_ctx(dir.path());
    let id = registered(&ctx, "alpha");

    handle(&ctx, &id, "make-service");
    handle(&ctx, &id, "make-service");

    assert!(
        publisher.lines("exec/alpha/out").contains(&"PyROS: alpha is already service".to_string())
    );
}

#[tokio::test]
async fn unmake_service_deletes_process_file() {
    let dir = tempdir().unwrap();
    let (ctx, _, _) = test_ctx(dir.path());
    let id = registered(&ctx, "alpha");

    handle(&ctx, &id, "make-service");
    assert!(ctx.config.process_file(&id).exists());

    handle(&ctx, &id, "unmake-service");
    assert!(!ctx.config.process_file(&id).exists());
    let registry = ctx.registry.lock();
    let meta = &registry.get(&id).unwrap().meta;
    assert_eq!(meta.kind, ProcessKind::Process);
    assert!(!meta.enabled);
}

#[tokio::test]
async fn enable_service_promotes_plain_process() {
    let dir = tempdir().unwrap();
    let (ctx, publisher, _) = test_ctx(dir.path());
    let id = registered(&ctx, "alpha");

    handle(&ctx, &id, "enable-service");

    let registry = ctx.registry.lock();
    let meta = &registry.get(&id).unwrap().meta;
    assert_eq!(meta.kind, ProcessKind::Service);
    assert!(meta.enabled);
    assert!(
        publisher.lines("exec/alpha/out").contains(&"PyROS: enabled alpha service".to_string())
    );
}

#[tokio::test]
async fn disable_service_round_trip() {
    let dir = tempdir().unwrap();
    let (ctx, publisher, _) = test_ctx(dir.path());
    let id = registered(&ctx, "alpha");

    handle(&ctx, &id, "make-service");
    handle(&ctx, &id, "disable-service");

    {
        let registry = ctx.registry.lock();
        let meta = &registry.get(&id).unwrap().meta;
        assert_eq!(meta.kind, ProcessKind::Service);
        assert!(!meta.enabled);
        assert_eq!(meta.type_name(), "service(disabled)");
    }
    assert!(meta_text(&ctx, &id).contains("enabled=False"));
    assert!(
        publisher.lines("exec/alpha/out").contains(&"PyROS: disabled alpha service".to_string())
    );
}

#[tokio::test]
async fn disable_service_on_plain_process_complains() {
    let dir = tempdir().unwrap();
    let (ctx, publisher, _) = test_ctx(dir.path());
    let id = registered(&ctx, "alpha");

    handle(&ctx, &id, "disable-service");
    assert!(publisher.lines("exec/alpha/out").contains(&"PyROS: alpha not a service".to_string()));
}

#[tokio::test]
async fn make_agent_seeds_last_ping() {
    let dir = tempdir().unwrap();
    let (ctx, publisher, clock) = test_ctx(dir.path());
    clock.set_epoch_ms(7_000);
    let id = registered(&ctx, "bravo");

    handle(&ctx, &id, "make-agent");

    {
        let registry = ctx.registry.lock();
        let record = registry.get(&id).unwrap();
        assert_eq!(record.meta.kind, ProcessKind::Agent);
        assert_eq!(record.last_ping_ms, Some(7_000));
    }
    assert!(meta_text(&ctx, &id).contains("type=agent"));
    assert!(
        publisher.lines("exec/bravo/out").contains(&"PyROS: made bravo an agent".to_string())
    );
}

#[tokio::test]
async fn ping_refreshes_monotonically() {
    let dir = tempdir().unwrap();
    let (ctx, _, clock) = test_ctx(dir.path());
    let id = registered(&ctx, "bravo");

    clock.set_epoch_ms(5_000);
    handle(&ctx, &id, "make-agent");
    clock.set_epoch_ms(9_000);
    handle(&ctx, &id, "ping");

    assert_eq!(ctx.registry.lock().get(&id).unwrap().last_ping_ms, Some(9_000));

    clock.set_epoch_ms(8_000);
    handle(&ctx, &id, "ping");
    assert_eq!(ctx.registry.lock().get(&id).unwrap().last_ping_ms, Some(9_000));
}

// ── executable ───────────────────────────────────────────────────────────

#[tokio::test]
async fn set_executable_persists() {
    let dir = tempdir().unwrap();
    let (ctx, _, _) = test_ctx(dir.path());
    let id = registered(&ctx, "alpha");

    handle(&ctx, &id, "set-executable ./rover");

    assert_eq!(ctx.registry.lock().get(&id).unwrap().meta.executable, "./rover");
    assert!(meta_text(&ctx, &id).contains("exec=./rover"));
}

#[tokio::test]
async fn set_executable_without_argument_errors() {
    let dir = tempdir().unwrap();
    let (ctx, publisher, _) = test_ctx(dir.path());
    let id = registered(&ctx, "alpha");

    handle(&ctx, &id, "set-executable");
    assert!(publisher.lines("exec/alpha/out").contains(
        &"PyROS ERROR: set executable for alpha missing argument.".to_string()
    ));
}

// ── logs replay ──────────────────────────────────────────────────────────

#[tokio::test]
async fn logs_replays_ring_in_order_without_reappending() {
    let dir = tempdir().unwrap();
    let (ctx, publisher, _) = test_ctx(dir.path());
    let id = registered(&ctx, "alpha");
    {
        let mut registry = ctx.registry.lock();
        let record = registry.get_mut(&id).unwrap();
        record.logs.push("one");
        record.logs.push("two");
    }

    handle(&ctx, &id, "logs");

    assert_eq!(publisher.lines("exec/alpha/out"), vec!["one", "two"]);
    assert_eq!(ctx.registry.lock().get(&id).unwrap().logs.len(), 2);
}

// ── remove ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn remove_deletes_directory_and_registry_entry() {
    let dir = tempdir().unwrap();
    let (ctx, publisher, _) = test_ctx(dir.path());
    let id = ProcessId::new("alpha");
    store::store_main(&ctx, &id, b"print('hi')\n");
    store::store_extra(&ctx, &id, "lib/helper.py", b"pass\n");

    remove_process(Arc::clone(&ctx), id.clone()).await;

    assert!(!ctx.config.process_dir(&id).exists());
    assert!(!ctx.registry.lock().contains(&id));
    assert!(publisher.lines("exec/alpha/out").contains(&"PyROS: removed process".to_string()));
}

// ── misuse ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_verb_reports_error() {
    let dir = tempdir().unwrap();
    let (ctx, publisher, _) = test_ctx(dir.path());
    let id = registered(&ctx, "alpha");

    handle(&ctx, &id, "frobnicate now");
    assert!(
        publisher.lines("exec/alpha/out").contains(&"PyROS ERROR: Unknown command frobnicate".to_string())
    );
}

#[yare::parameterized(
    make_service = { "make-service" },
    enable       = { "enable-service" },
    make_agent   = { "make-agent" },
    ping         = { "ping" },
)]
fn verbs_on_unknown_process_report_error(verb: &str) {
    let dir = tempdir().unwrap();
    let (ctx, publisher, _) = test_ctx(dir.path());
    let id = ProcessId::new("ghost");

    handle(&ctx, &id, verb);
    assert_eq!(
        publisher.lines("exec/ghost/out"),
        vec!["PyROS ERROR: process ghost does not exist."]
    );
}
