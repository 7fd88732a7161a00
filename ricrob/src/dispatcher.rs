//! Fan-out of one task to every configured solver, fan-in of their outcomes.
//!
//! Each [`Dispatcher::execute`] call starts a coordinator thread that launches
//! one runner thread per solver and then joins them all. Runners push their
//! outcome into a bounded channel the moment they finish, so the consumer sees
//! outcomes in completion order. The coordinator closes the channel only after
//! every runner has been joined, which makes closure the end-of-dispatch signal.

use std::sync::Arc;
use std::thread;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{Span, debug, error, info, info_span, warn};

use crate::core::outcome::{Failure, FailureKind, Outcome, SolverId};
use crate::core::phase::{DispatchPhase, Progress};
use crate::core::task::Task;
use crate::io::config::DispatchConfig;
use crate::io::process::{CancelToken, RunOptions, run_solver};

/// How a runner thread turns one solver into one outcome.
type RunFn = fn(&SolverId, &Arc<Task>, &RunOptions, &dyn Fn() -> bool) -> Outcome;

/// Runs every configured solver for each task it is given.
///
/// Cheap to clone; concurrent dispatches share nothing but the read-only
/// configuration.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: Arc<DispatchConfig>,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn solvers(&self) -> &[SolverId] {
        &self.config.solvers
    }

    /// Start a dispatch and return its outcome stream immediately.
    pub fn execute(&self, task: Task) -> OutcomeStream {
        self.execute_shared(Arc::new(task))
    }

    /// Like [`Dispatcher::execute`], for a task already shared elsewhere.
    pub fn execute_shared(&self, task: Arc<Task>) -> OutcomeStream {
        self.launch(task, run_solver)
    }

    fn launch(&self, task: Arc<Task>, run: RunFn) -> OutcomeStream {
        let solvers = self.config.solvers.clone();
        let progress = Arc::new(Progress::new(solvers.len()));
        let cancel = CancelToken::new();
        let (tx, rx) = mpsc::channel(self.config.effective_capacity());

        let stream = OutcomeStream {
            rx,
            progress: Arc::clone(&progress),
            cancel: cancel.clone(),
        };

        if solvers.is_empty() {
            warn!("no solvers configured, dispatch closes without outcomes");
            progress.mark_closed();
            return stream;
        }

        let dispatch = Dispatch {
            task,
            opts: RunOptions::from_config(&self.config),
            tx,
            progress,
            cancel,
            run,
        };
        thread::spawn(move || dispatch.coordinate(solvers));
        stream
    }
}

/// State of one in-flight dispatch, owned by its coordinator thread.
struct Dispatch {
    task: Arc<Task>,
    opts: RunOptions,
    tx: mpsc::Sender<Outcome>,
    progress: Arc<Progress>,
    cancel: CancelToken,
    run: RunFn,
}

impl Dispatch {
    fn coordinate(self, solvers: Vec<SolverId>) {
        let span = info_span!("dispatch", solvers = solvers.len(), symbol = %self.task.target);
        let _guard = span.enter();

        let mut runners = Vec::with_capacity(solvers.len());
        for solver in solvers {
            let started_at = Utc::now();
            let runner = Runner {
                span: span.clone(),
                solver: solver.clone(),
                task: Arc::clone(&self.task),
                opts: self.opts,
                tx: self.tx.clone(),
                progress: Arc::clone(&self.progress),
                cancel: self.cancel.clone(),
                run: self.run,
            };
            let spawned = thread::Builder::new()
                .name(format!("solver:{solver}"))
                .spawn(move || runner.run());
            match spawned {
                Ok(handle) => runners.push((solver, started_at, handle)),
                Err(e) => {
                    error!(solver = %solver, err = %e, "failed to start runner thread");
                    let failure =
                        Failure::new(FailureKind::Spawn, format!("start runner thread: {e}"));
                    self.report(solver, started_at, failure);
                }
            }
            self.progress.mark_launched();
        }
        debug!(runners = runners.len(), "all runners launched");

        // Barrier: every runner has reported once its thread has been joined.
        for (solver, started_at, handle) in runners {
            if handle.join().is_err() {
                error!(solver = %solver, "runner panicked before reporting");
                let failure = Failure::new(FailureKind::Panicked, "runner panicked");
                self.report(solver, started_at, failure);
            }
        }

        self.progress.mark_closed();
        info!(outcomes = self.progress.delivered(), "dispatch closed");
        // Dropping `self` drops the last sender, which closes the stream.
    }

    fn report(&self, solver: SolverId, started_at: chrono::DateTime<Utc>, failure: Failure) {
        let outcome = Outcome::failure(solver, Arc::clone(&self.task), started_at, failure);
        deliver(&self.tx, &self.progress, outcome);
    }
}

/// One solver's run within a dispatch.
struct Runner {
    span: Span,
    solver: SolverId,
    task: Arc<Task>,
    opts: RunOptions,
    tx: mpsc::Sender<Outcome>,
    progress: Arc<Progress>,
    cancel: CancelToken,
    run: RunFn,
}

impl Runner {
    fn run(self) {
        let _guard = self.span.enter();
        let should_stop = || self.cancel.is_cancelled() || self.tx.is_closed();
        let outcome = (self.run)(&self.solver, &self.task, &self.opts, &should_stop);
        deliver(&self.tx, &self.progress, outcome);
    }
}

fn deliver(tx: &mpsc::Sender<Outcome>, progress: &Progress, outcome: Outcome) {
    let solver = outcome.solver.clone();
    match tx.blocking_send(outcome) {
        Ok(()) => progress.mark_delivered(),
        Err(_) => debug!(solver = %solver, "consumer gone, outcome dropped"),
    }
}

/// Consumer side of a dispatch.
///
/// Yields exactly one [`Outcome`] per configured solver in completion order,
/// then `None` once every solver has reported. Dropping the stream cancels
/// the solvers that are still running.
#[derive(Debug)]
pub struct OutcomeStream {
    rx: mpsc::Receiver<Outcome>,
    progress: Arc<Progress>,
    cancel: CancelToken,
}

impl OutcomeStream {
    /// Next outcome, or `None` when the dispatch is complete.
    pub async fn recv(&mut self) -> Option<Outcome> {
        self.rx.recv().await
    }

    /// Blocking variant of [`OutcomeStream::recv`]; must not be called from
    /// inside an async runtime.
    pub fn blocking_recv(&mut self) -> Option<Outcome> {
        self.rx.blocking_recv()
    }

    /// Drain every outcome, blocking until the dispatch closes.
    pub fn collect_blocking(mut self) -> Vec<Outcome> {
        let mut outcomes = Vec::with_capacity(self.solver_count());
        while let Some(outcome) = self.blocking_recv() {
            outcomes.push(outcome);
        }
        outcomes
    }

    pub fn phase(&self) -> DispatchPhase {
        self.progress.phase()
    }

    pub fn solver_count(&self) -> usize {
        self.progress.total()
    }

    /// Kill every solver still running; they report `cancelled`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeSolvers, sample_task};

    #[test]
    fn empty_solver_set_closes_immediately() {
        let dispatcher = Dispatcher::new(DispatchConfig::default());
        let mut stream = dispatcher.execute(sample_task());
        assert_eq!(stream.phase(), DispatchPhase::Closed);
        assert_eq!(stream.solver_count(), 0);
        assert!(stream.blocking_recv().is_none());
    }

    fn panics_on_boom(
        solver: &SolverId,
        task: &Arc<Task>,
        _opts: &RunOptions,
        _should_stop: &dyn Fn() -> bool,
    ) -> Outcome {
        if solver.as_str() == "boom" {
            panic!("runner blew up");
        }
        Outcome::success(solver.clone(), Arc::clone(task), Utc::now(), Some(vec![]), None)
    }

    #[test]
    fn panicked_runner_still_reports_once() {
        let dispatcher = Dispatcher::new(DispatchConfig {
            solvers: ["first", "boom", "last"].map(SolverId::new).to_vec(),
            ..DispatchConfig::default()
        });

        let mut stream = dispatcher.launch(Arc::new(sample_task()), panics_on_boom);
        let mut outcomes = Vec::new();
        while let Some(outcome) = stream.blocking_recv() {
            outcomes.push(outcome);
        }

        assert_eq!(outcomes.len(), 3);
        let panicked: Vec<&str> = outcomes
            .iter()
            .filter(|o| o.failure_kind() == Some(FailureKind::Panicked))
            .map(|o| o.solver.as_str())
            .collect();
        assert_eq!(panicked, vec!["boom"]);
        assert_eq!(outcomes.iter().filter(|o| o.is_success()).count(), 2);
        assert_eq!(stream.phase(), DispatchPhase::Closed);
    }

    #[cfg(unix)]
    #[test]
    fn missing_binary_reports_spawn_failure() {
        let fakes = FakeSolvers::new().expect("fakes");
        let missing = fakes.path().join("does-not-exist");
        let dispatcher = Dispatcher::new(DispatchConfig {
            solvers: vec![SolverId::new(missing.display().to_string())],
            ..DispatchConfig::default()
        });

        let outcomes = dispatcher.execute(sample_task()).collect_blocking();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].failure_kind(), Some(FailureKind::Spawn));
    }

    #[cfg(unix)]
    #[test]
    fn phase_is_closed_once_stream_ends() {
        let fakes = FakeSolvers::new().expect("fakes");
        let ok = fakes.sentinel("ok", 0.0, "[1]").expect("script");
        let dispatcher = Dispatcher::new(fakes.config(&[ok]));

        let mut stream = dispatcher.execute(sample_task());
        assert!(stream.blocking_recv().is_some());
        assert!(stream.blocking_recv().is_none());
        assert_eq!(stream.phase(), DispatchPhase::Closed);
    }
}
