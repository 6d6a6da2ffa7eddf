// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process supervisor: spawning, pipe draining, cooperative stop.
//!
//! Each running child is owned by one supervisor task. Two drainer tasks
//! feed its stdout and stderr lines into unbounded queues; the supervisor
//! interleaves them, retains every line in the process ring and publishes it
//! on the out topic. Stop requests are cooperative first (a `stop` frame on
//! the child's system topic), then a kill signalled through the record's
//! cancellation token, then a pattern kill as the final guarantee.

use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pyros_core::{ProcessId, ProcessKind, DEFAULT_EXECUTABLE};
use pyros_wire as wire;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::daemon::DaemonCtx;
use crate::output;
use crate::registry::RunState;

/// Pre-spawn delay, mitigating races with a just-stopped predecessor.
const SPAWN_DELAY: Duration = Duration::from_millis(250);
/// Idle backoff when both pipes are empty and the child lives.
const DRAIN_IDLE: Duration = Duration::from_millis(250);
/// Poll interval while waiting for an ack or an exit.
const STOP_POLL: Duration = Duration::from_millis(50);
/// Beat between the in-process kill and the pattern kill.
const KILL_SETTLE: Duration = Duration::from_millis(10);
/// How long a force-killed child gets to be reaped.
const KILL_WAIT: Duration = Duration::from_millis(500);

/// Spawn a child for the process unless one is already running.
pub(crate) fn start(ctx: &Arc<DaemonCtx>, id: &ProcessId) {
    enum Decision {
        Missing,
        AlreadyRunning,
        Start,
    }

    let decision = {
        let registry = ctx.registry.lock();
        match registry.get(id) {
            None => Decision::Missing,
            Some(record) if record.is_running() => Decision::AlreadyRunning,
            Some(_) => Decision::Start,
        }
    };

    match decision {
        Decision::Missing => {
            output::process_out(ctx, id, &format!("PyROS ERROR: process {id} does not exist."));
        }
        Decision::AlreadyRunning => {
            output::emit(ctx, id, &format!("PyROS WARNING: process {id} is already running"));
        }
        Decision::Start => {
            tokio::spawn(run_child(Arc::clone(ctx), id.clone()));
        }
    }
}

/// Whether the process currently has a live child.
pub(crate) fn is_running(ctx: &DaemonCtx, id: &ProcessId) -> bool {
    ctx.registry.lock().get(id).is_some_and(|record| record.is_running())
}

/// Cooperatively stop a process, force-killing on timeout, and optionally
/// start it again once the previous child is gone.
pub(crate) async fn stop(ctx: Arc<DaemonCtx>, id: ProcessId, restart: bool) {
    enum Target {
        Missing,
        NotStarted { exe: String },
        AlreadyExited { code: i32, type_name: &'static str, exe: String },
        Running { type_name: &'static str, exe: String },
    }

    let target = {
        let mut registry = ctx.registry.lock();
        match registry.get_mut(&id) {
            None => Target::Missing,
            Some(record) => {
                // One-shot: an ack from a previous stop round must not count.
                record.stop_acknowledged = false;
                let type_name = record.meta.type_name();
                let exe = record.meta.executable.clone();
                match &record.run {
                    RunState::Running { .. } => Target::Running { type_name, exe },
                    RunState::Exited { code } => {
                        Target::AlreadyExited { code: *code, type_name, exe }
                    }
                    RunState::Idle => Target::NotStarted { exe },
                }
            }
        }
    };

    match target {
        Target::Missing => {
            output::process_out(&ctx, &id, &format!("PyROS ERROR: process {id} does not exist."));
            finish_kill(&ctx, &id, DEFAULT_EXECUTABLE, restart).await;
        }
        Target::NotStarted { exe } => {
            output::emit(&ctx, &id, &format!("PyROS: process {id} is not running."));
            finish_kill(&ctx, &id, &exe, restart).await;
        }
        Target::AlreadyExited { code, type_name, exe } => {
            output::emit(
                &ctx,
                &id,
                &format!("PyROS: already finished {type_name} return code {code}"),
            );
            finish_kill(&ctx, &id, &exe, restart).await;
        }
        Target::Running { type_name, exe } => {
            ctx.publisher
                .publish(&wire::child_system_topic(&id), wire::STOP_REQUEST.as_bytes().to_vec());

            let budget = ctx.config.thread_kill_timeout;
            if wait_for(budget, || take_stop_ack(&ctx, &id)).await {
                if wait_for(budget, || !is_running(&ctx, &id)).await {
                    output::emit(&ctx, &id, &format!("PyROS: stopped {type_name}"));
                } else {
                    force_kill(&ctx, &id).await;
                    output::emit(
                        &ctx,
                        &id,
                        &format!(
                            "PyROS: responded with stopping but didn't stop. Killed now {type_name}"
                        ),
                    );
                }
            } else {
                force_kill(&ctx, &id).await;
                output::emit(&ctx, &id, &format!("PyROS: didn't respond so killed {type_name}"));
            }

            finish_kill(&ctx, &id, &exe, restart).await;
        }
    }
}

/// One supervisor task per child: spawn, drain, publish, record the exit.
async fn run_child(ctx: Arc<DaemonCtx>, id: ProcessId) {
    tokio::time::sleep(SPAWN_DELAY).await;

    let meta = {
        let registry = ctx.registry.lock();
        match registry.get(&id) {
            Some(record) => record.meta.clone(),
            None => return,
        }
    };
    tracing::info!(id = %id, kind = meta.kind.as_str(), executable = %meta.executable, "starting");

    let mut command = Command::new(&meta.executable);
    if meta.is_python() {
        command.arg("-u").arg(format!("{id}_main.py")).arg(id.as_str());
    } else {
        command.arg("-u").arg(id.as_str()).arg(id.as_str());
    }
    command
        .current_dir(ctx.config.process_dir(&id))
        .env("PYTHONPATH", python_path(&ctx))
        .env("PYROS_MQTT", format!("{}:{}", ctx.config.host, ctx.config.port))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            tracing::error!(id = %id, executable = %meta.executable, error = %e, "start failed");
            output::emit_status(&ctx, &id, "PyROS: exit.");
            return;
        }
    };
    output::emit_status(&ctx, &id, "PyROS: started process.");

    let kill = CancellationToken::new();
    {
        let mut registry = ctx.registry.lock();
        if let Some(record) = registry.get_mut(&id) {
            record.run = RunState::Running { pid: child.id(), kill: kill.clone() };
            record.stale_code = false;
        }
    }

    let (out_tx, mut out_rx) = mpsc::unbounded_channel();
    let (err_tx, mut err_rx) = mpsc::unbounded_channel();
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(drain_lines(stdout, out_tx));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(drain_lines(stderr, err_tx));
    }

    let status = loop {
        // Interleave whatever both streams have ready, stderr first.
        loop {
            let mut saw = false;
            if let Ok(line) = err_rx.try_recv() {
                output::emit(&ctx, &id, &line);
                saw = true;
            }
            if let Ok(line) = out_rx.try_recv() {
                output::emit(&ctx, &id, &line);
                saw = true;
            }
            if !saw {
                break;
            }
        }

        match child.try_wait() {
            Ok(Some(status)) => break Ok(status),
            Ok(None) => {
                tokio::select! {
                    _ = tokio::time::sleep(DRAIN_IDLE) => {}
                    _ = kill.cancelled() => {
                        let _ = child.start_kill();
                        break child.wait().await;
                    }
                }
            }
            Err(e) => break Err(e),
        }
    };

    // The drainers close their queues at pipe EOF, so these loops drain
    // everything the child wrote before it died.
    while let Some(line) = out_rx.recv().await {
        output::emit(&ctx, &id, &line);
    }
    while let Some(line) = err_rx.recv().await {
        output::emit(&ctx, &id, &line);
    }

    let code = match status {
        Ok(status) => exit_code(&status),
        Err(e) => {
            tracing::error!(id = %id, error = %e, "wait on child failed");
            -1
        }
    };
    output::emit_status(&ctx, &id, &format!("PyROS: exit {code}"));
    {
        let mut registry = ctx.registry.lock();
        if let Some(record) = registry.get_mut(&id) {
            record.run = RunState::Exited { code };
        }
    }
}

/// Read lines off one pipe into the supervisor's queue. Lossy UTF-8,
/// trailing newline stripped.
async fn drain_lines<R>(stream: R, queue: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let mut line = String::from_utf8_lossy(&buf).into_owned();
                while line.ends_with('\n') || line.ends_with('\r') {
                    line.pop();
                }
                if queue.send(line).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "pipe read failed");
                break;
            }
        }
    }
}

/// Poll a condition until it holds or the budget runs out.
async fn wait_for(budget: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + budget;
    loop {
        if cond() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(STOP_POLL).await;
    }
}

/// Consume the one-shot stop acknowledgement if the child has sent one.
fn take_stop_ack(ctx: &DaemonCtx, id: &ProcessId) -> bool {
    let mut registry = ctx.registry.lock();
    match registry.get_mut(id) {
        Some(record) if record.stop_acknowledged => {
            record.stop_acknowledged = false;
            true
        }
        _ => false,
    }
}

/// Signal the supervisor task to SIGKILL its child, then wait for the exit
/// to be recorded so a follow-up start sees a free slot.
async fn force_kill(ctx: &Arc<DaemonCtx>, id: &ProcessId) {
    let token = {
        let registry = ctx.registry.lock();
        match registry.get(id).map(|record| &record.run) {
            Some(RunState::Running { kill, .. }) => Some(kill.clone()),
            _ => None,
        }
    };
    if let Some(token) = token {
        token.cancel();
        let _ = wait_for(KILL_WAIT, || !is_running(ctx, id)).await;
    }
}

/// The belt-and-braces tail of every stop: pattern kill, then the optional
/// restart.
async fn finish_kill(ctx: &Arc<DaemonCtx>, id: &ProcessId, exe: &str, restart: bool) {
    tokio::time::sleep(KILL_SETTLE).await;
    pattern_kill(exe, id).await;
    if restart {
        start_again(ctx, id);
    }
}

/// `pkill -9 -f '<exe> -u <id>.py <id>'` — catches children that outlived
/// their supervisor task (e.g. across a daemon restart).
async fn pattern_kill(exe: &str, id: &ProcessId) {
    let pattern = format!("{exe} -u {id}.py {id}");
    match Command::new("pkill").arg("-9").arg("-f").arg(&pattern).status().await {
        // pkill exits 1 when nothing matched
        Ok(status) if matches!(status.code(), Some(0) | Some(1)) => {}
        Ok(status) => {
            tracing::info!(id = %id, %pattern, code = ?status.code(), "pattern kill returned");
        }
        Err(e) => {
            tracing::debug!(id = %id, error = %e, "pkill unavailable");
        }
    }
}

fn start_again(ctx: &Arc<DaemonCtx>, id: &ProcessId) {
    start(ctx, id);
    let word = {
        let registry = ctx.registry.lock();
        match registry.get(id) {
            Some(record) if record.meta.kind == ProcessKind::Service => "service",
            _ => "process",
        }
    };
    output::emit(ctx, id, &format!("PyROS: Restarted {word} {id}"));
}

/// Child environment: the daemon's, with `code/` on the import path.
fn python_path(ctx: &DaemonCtx) -> String {
    let code_dir = ctx.config.code_dir().display().to_string();
    match std::env::var("PYTHONPATH") {
        Ok(existing) if !existing.is_empty() => format!("{existing}:{code_dir}"),
        _ => code_dir,
    }
}

/// Exit code as published: the process's code, or the negated signal
/// number for signalled exits.
fn exit_code(status: &std::process::ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    status.code().unwrap_or(-1)
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
