//! Process runner: one solver process against one task, producing exactly one outcome.
//!
//! stdout and stderr are drained on their own threads while the runner waits
//! for the child in short slices, so the deadline and the stop signal are
//! honoured even while the solver is silent. The readers are awaited under the
//! same deadline: a background process that inherited the pipes cannot keep
//! the runner alive after the solver itself has exited.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};
use wait_timeout::ChildExt;

use crate::core::outcome::{Failure, FailureKind, Outcome, SolverId};
use crate::core::sentinel::{CompletionPolicy, LineScan, parse_final_line};
use crate::core::task::Task;
use crate::io::config::DispatchConfig;

/// Per-run settings shared by every runner of a dispatch.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub policy: CompletionPolicy,
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub line_limit: usize,
}

impl RunOptions {
    pub fn from_config(cfg: &DispatchConfig) -> Self {
        Self {
            policy: cfg.policy,
            timeout: cfg.solver_timeout(),
            poll_interval: cfg.poll_interval(),
            line_limit: cfg.line_limit_bytes,
        }
    }
}

/// Explicit cancellation shared by all runners of one dispatch.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Successful verdict before it is stamped into an [`Outcome`].
#[derive(Debug, PartialEq)]
struct Verdict {
    moves: Option<Vec<Value>>,
    record: Option<Value>,
}

/// Run `solver` once against `task`.
///
/// Never fails: every problem is reported through the outcome's error.
/// `should_stop` is polled while the solver runs; when it returns true the
/// process is killed and the outcome is `cancelled`.
#[instrument(skip_all, fields(solver = %solver, timeout_secs = opts.timeout.as_secs()))]
pub fn run_solver(
    solver: &SolverId,
    task: &Arc<Task>,
    opts: &RunOptions,
    should_stop: &dyn Fn() -> bool,
) -> Outcome {
    let started_at = Utc::now();
    match execute(solver, task, opts, should_stop) {
        Ok(verdict) => {
            info!(
                moves = verdict.moves.as_ref().map(Vec::len),
                "solver finished"
            );
            Outcome::success(
                solver.clone(),
                Arc::clone(task),
                started_at,
                verdict.moves,
                verdict.record,
            )
        }
        Err(failure) => {
            warn!(kind = ?failure.kind, message = %failure.message, "solver failed");
            Outcome::failure(solver.clone(), Arc::clone(task), started_at, failure)
        }
    }
}

fn execute(
    solver: &SolverId,
    task: &Task,
    opts: &RunOptions,
    should_stop: &dyn Fn() -> bool,
) -> Result<Verdict, Failure> {
    let mut cmd = Command::new(solver.as_str());
    cmd.args(task.cmd_args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning solver process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn solver");
            return Err(Failure::new(
                FailureKind::Spawn,
                format!("spawn {solver}: {e}"),
            ));
        }
    };
    debug!(pid = child.id(), "solver spawned");

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        kill_and_reap(&mut child);
        return Err(Failure::new(FailureKind::Io, "solver output was not piped"));
    };

    let (name, limit) = (solver.to_string(), opts.line_limit);
    let stdout_handle = thread::spawn(move || scan_stdout(stdout, limit, &name));
    let name = solver.to_string();
    let stderr_handle = thread::spawn(move || drain_stderr(stderr, limit, &name));

    let deadline = Instant::now() + opts.timeout;
    let status = loop {
        match child.wait_timeout(next_slice(deadline, opts)) {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => {
                kill_and_reap(&mut child);
                return Err(Failure::new(
                    FailureKind::Exit,
                    format!("wait for {solver}: {e}"),
                ));
            }
        }
        // Reader threads are left to finish on their own once the pipes close.
        if let Some(failure) = interrupted(deadline, opts, should_stop) {
            kill_and_reap(&mut child);
            return Err(failure);
        }
    };

    // The solver is gone, but anything it left behind may still hold the pipes.
    while !(stdout_handle.is_finished() && stderr_handle.is_finished()) {
        if let Some(failure) = interrupted(deadline, opts, should_stop) {
            warn!(exit_code = ?status.code(), "solver exited with its output still open");
            return Err(failure);
        }
        thread::sleep(next_slice(deadline, opts));
    }

    let scan = match join_reader(stdout_handle) {
        Ok(scan) => scan,
        Err(message) => {
            return Err(Failure::new(
                FailureKind::Io,
                format!("read stdout: {message}"),
            ));
        }
    };
    match join_reader(stderr_handle) {
        Ok(lines) => debug!(stderr_lines = lines, "stderr drained"),
        Err(message) => warn!(err = %message, "failed to read stderr"),
    }

    debug!(exit_code = ?status.code(), stdout_lines = scan.lines, "solver exited");
    judge(opts.policy, status.success(), &status.to_string(), scan)
}

fn next_slice(deadline: Instant, opts: &RunOptions) -> Duration {
    deadline
        .saturating_duration_since(Instant::now())
        .min(opts.poll_interval)
}

/// The failure to report if the run must end now.
fn interrupted(
    deadline: Instant,
    opts: &RunOptions,
    should_stop: &dyn Fn() -> bool,
) -> Option<Failure> {
    if should_stop() {
        info!("dispatch cancelled, stopping solver");
        return Some(Failure::new(FailureKind::Cancelled, "dispatch cancelled"));
    }
    if Instant::now() >= deadline {
        warn!("solver timed out, stopping");
        return Some(Failure::new(
            FailureKind::Timeout,
            format!("timed out after {:?}", opts.timeout),
        ));
    }
    None
}

/// Apply the completion policy to a finished process.
fn judge(
    policy: CompletionPolicy,
    exited_ok: bool,
    status: &str,
    scan: LineScan,
) -> Result<Verdict, Failure> {
    if !exited_ok {
        return Err(Failure::new(FailureKind::Exit, format!("solver {status}")));
    }
    match policy {
        CompletionPolicy::Sentinel => {
            if scan.records_seen > 1 {
                warn!(
                    records = scan.records_seen,
                    "several result records, keeping the last"
                );
            }
            match scan.record {
                Some(record) => Ok(Verdict {
                    moves: record.moves,
                    record: Some(record.raw),
                }),
                None => Err(Failure::new(
                    FailureKind::ResultNotFound,
                    "result not found",
                )),
            }
        }
        CompletionPolicy::ExitStatus => Ok(Verdict {
            moves: scan.last_line.as_deref().and_then(parse_final_line),
            record: scan.record.map(|r| r.raw),
        }),
    }
}

fn kill_and_reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        warn!(err = %e, "failed to kill solver");
    }
    if let Err(e) = child.wait() {
        warn!(err = %e, "failed to reap solver");
    }
}

fn join_reader<T>(handle: thread::JoinHandle<std::io::Result<T>>) -> Result<T, String> {
    match handle.join() {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(_) => Err("output reader thread panicked".to_string()),
    }
}

fn scan_stdout<R: Read>(reader: R, limit: usize, solver: &str) -> std::io::Result<LineScan> {
    let mut scan = LineScan::default();
    let truncated = for_each_line(reader, limit, |line| {
        debug!(solver, line, "stdout");
        scan.push(line);
    })?;
    if truncated > 0 {
        warn!(solver, truncated, "stdout lines truncated");
    }
    Ok(scan)
}

fn drain_stderr<R: Read>(reader: R, limit: usize, solver: &str) -> std::io::Result<usize> {
    let mut lines = 0usize;
    let truncated = for_each_line(reader, limit, |line| {
        debug!(solver, line, "stderr");
        lines += 1;
    })?;
    if truncated > 0 {
        debug!(solver, truncated, "stderr lines truncated");
    }
    Ok(lines)
}

/// Call `f` for each line, lossily decoded and without its terminator.
///
/// At most `limit` bytes of a line are kept. Returns the number of bytes dropped.
fn for_each_line<R: Read>(
    mut reader: R,
    limit: usize,
    mut f: impl FnMut(&str),
) -> std::io::Result<usize> {
    let mut line = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    let mut keep = |line: &mut Vec<u8>, bytes: &[u8]| {
        let room = limit.saturating_sub(line.len());
        let take = bytes.len().min(room);
        line.extend_from_slice(&bytes[..take]);
        truncated += bytes.len() - take;
    };
    let emit = |line: &[u8], f: &mut dyn FnMut(&str)| {
        let text = String::from_utf8_lossy(line);
        f(text.trim_end_matches('\r'));
    };

    loop {
        let n = reader.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        let mut rest = &chunk[..n];
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            keep(&mut line, &rest[..pos]);
            emit(&line, &mut f);
            line.clear();
            rest = &rest[pos + 1..];
        }
        keep(&mut line, rest);
    }
    if !line.is_empty() {
        emit(&line, &mut f);
    }

    Ok(truncated)
}
