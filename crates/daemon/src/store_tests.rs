// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

use crate::daemon::test_ctx;
use crate::registry::RunState;

#[test]
fn main_upload_writes_file_shim_and_ack() {
    let dir = tempdir().unwrap();
    let (ctx, publisher, _) = test_ctx(dir.path());
    let id = ProcessId::new("alpha");

    store_main(&ctx, &id, b"print('hi')\n");

    let main = std::fs::read(ctx.config.main_file(&id)).unwrap();
    assert_eq!(main, b"print('hi')\n");
    let shim = std::fs::read_to_string(ctx.config.init_file(&id)).unwrap();
    assert_eq!(shim, "from alpha.alpha_main import *\n");

    assert_eq!(publisher.lines("exec/alpha/status"), vec!["stored alpha_main.py"]);
    assert!(ctx.registry.lock().contains(&id));
}

#[test]
fn zero_byte_upload_yields_empty_file() {
    let dir = tempdir().unwrap();
    let (ctx, publisher, _) = test_ctx(dir.path());
    let id = ProcessId::new("alpha");

    store_main(&ctx, &id, b"");

    assert_eq!(std::fs::read(ctx.config.main_file(&id)).unwrap(), b"");
    assert_eq!(publisher.lines("exec/alpha/status"), vec!["stored alpha_main.py"]);
}

#[test]
fn upload_marks_running_record_stale() {
    let dir = tempdir().unwrap();
    let (ctx, _, _) = test_ctx(dir.path());
    let id = ProcessId::new("alpha");

    store_main(&ctx, &id, b"print(1)\n");
    {
        let mut registry = ctx.registry.lock();
        let record = registry.get_mut(&id).unwrap();
        record.run = RunState::Running { pid: None, kill: CancellationToken::new() };
    }
    store_main(&ctx, &id, b"print(2)\n");

    let registry = ctx.registry.lock();
    let record = registry.get(&id).unwrap();
    assert!(record.stale_code);
    assert_eq!(record.status_label(), "running-old");
}

#[test]
fn repeated_uploads_ack_in_order() {
    let dir = tempdir().unwrap();
    let (ctx, publisher, _) = test_ctx(dir.path());
    let id = ProcessId::new("alpha");

    store_main(&ctx, &id, b"print(1)\n");
    store_main(&ctx, &id, b"print(2)\n");

    assert_eq!(
        publisher.lines("exec/alpha/status"),
        vec!["stored alpha_main.py", "stored alpha_main.py"]
    );
    assert_eq!(std::fs::read(ctx.config.main_file(&id)).unwrap(), b"print(2)\n");
}

#[test]
fn extra_upload_creates_intermediate_dirs() {
    let dir = tempdir().unwrap();
    let (ctx, publisher, _) = test_ctx(dir.path());
    let id = ProcessId::new("alpha");

    store_extra(&ctx, &id, "lib/vec/matrix.py", b"M = 1\n");

    let path = ctx.config.process_dir(&id).join("lib/vec/matrix.py");
    assert_eq!(std::fs::read(path).unwrap(), b"M = 1\n");
    assert_eq!(publisher.lines("exec/alpha/status"), vec!["stored lib/vec/matrix.py"]);
}

#[test]
fn extra_upload_does_not_register_process() {
    let dir = tempdir().unwrap();
    let (ctx, _, _) = test_ctx(dir.path());
    let id = ProcessId::new("alpha");

    store_extra(&ctx, &id, "helper.py", b"pass\n");
    assert!(!ctx.registry.lock().contains(&id));
}

#[yare::parameterized(
    parent_escape = { "../outside.py" },
    nested_escape = { "lib/../../outside.py" },
    absolute      = { "/etc/passwd" },
)]
fn extra_upload_rejects_escaping_paths(name: &str) {
    let dir = tempdir().unwrap();
    let (ctx, publisher, _) = test_ctx(dir.path());
    let id = ProcessId::new("alpha");

    store_extra(&ctx, &id, name, b"nope");

    assert_eq!(publisher.lines("exec/alpha/status"), vec!["store error"]);
    assert!(!dir.path().join("outside.py").exists());
}

#[test]
fn upload_to_unwritable_dir_reports_store_error() {
    let dir = tempdir().unwrap();
    let (ctx, publisher, _) = test_ctx(dir.path());
    let id = ProcessId::new("alpha");

    // A file where the process directory should be makes create_dir_all fail.
    std::fs::create_dir_all(ctx.config.code_dir()).unwrap();
    std::fs::write(ctx.config.code_dir().join("alpha"), b"not a dir").unwrap();

    store_main(&ctx, &id, b"print('hi')\n");
    assert_eq!(publisher.lines("exec/alpha/status"), vec!["store error"]);
}
