//! Run controller - the public entry point
//!
//! [`RunController::run`] debounces requests, discovers suites, drives the
//! [`ExecutionEngine`], hands the report to the reporter, and clears state so
//! the next run starts from scratch.

use crate::discovery::{discover, Candidate};
use crate::engine::{Cursor, ExecutionEngine, RunContext};
use crate::failure::{ErrorRecord, Failure};
use crate::loader::ModuleLoader;
use crate::reporter::Reporter;
use crate::suite::DEFAULT_TIMEOUT;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Minimum time between the starts of two accepted runs.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(2000);

/// Settings for a [`RunController`].
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory scanned for test modules
    pub test_dir: PathBuf,
    /// Timeout for suites that do not declare one
    pub default_timeout: Duration,
    /// Runs starting within this window of the previous start are dropped
    pub debounce: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            test_dir: PathBuf::from("tests"),
            default_timeout: DEFAULT_TIMEOUT,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl RunConfig {
    pub fn new(test_dir: impl Into<PathBuf>) -> Self {
        Self {
            test_dir: test_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

/// Everything that belongs to one accepted run. Dropped when the run ends.
struct RunState<F> {
    suites: Vec<Candidate>,
    cursor: Cursor,
    started_at: Instant,
    on_complete: F,
}

/// Forwards failures from outside the engine's control into the active run.
///
/// Cheap to clone and safe to move into a process-wide panic hook.
#[derive(Debug, Clone)]
pub struct UncaughtHandle {
    context: Arc<RunContext>,
}

impl UncaughtHandle {
    /// Record `failure` as uncaught, attributed to the active suite and test.
    pub fn report(&self, failure: Failure) {
        let attribution = self.context.current();
        tracing::warn!(
            suite = %attribution.suite,
            test = %attribution.test,
            error = %failure,
            "uncaught failure"
        );
        let mut record = ErrorRecord::new(attribution.suite, attribution.test, failure);
        record.uncaught = true;
        self.context.tracker().record_failure(record);
    }
}

/// Owns the run lifecycle.
pub struct RunController<L, R> {
    config: RunConfig,
    loader: L,
    reporter: R,
    context: Arc<RunContext>,
    last_run_started: Option<Instant>,
}

impl<L: ModuleLoader, R: Reporter> RunController<L, R> {
    pub fn new(config: RunConfig, loader: L, reporter: R) -> Self {
        Self {
            config,
            loader,
            reporter,
            context: Arc::new(RunContext::default()),
            last_run_started: None,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Handle for reporting failures that escape the engine.
    pub fn uncaught_handle(&self) -> UncaughtHandle {
        UncaughtHandle {
            context: self.context.clone(),
        }
    }

    /// Record a failure raised outside any hook or test.
    pub fn report_external_failure(&self, failure: Failure) {
        self.uncaught_handle().report(failure);
    }

    fn accepts(&self, now: Instant) -> bool {
        match self.last_run_started {
            None => true,
            Some(previous) => now.duration_since(previous) > self.config.debounce,
        }
    }

    /// Execute one run and call `on_complete` with whether it produced no
    /// failures.
    ///
    /// Requests arriving within the debounce window of the previous start are
    /// dropped: `on_complete` is not called and `false` is returned.
    pub async fn run<F>(&mut self, on_complete: F) -> bool
    where
        F: FnOnce(bool),
    {
        let now = Instant::now();
        if !self.accepts(now) {
            tracing::debug!("run request inside debounce window, dropped");
            return false;
        }
        self.last_run_started = Some(now);
        self.context.reset();

        let test_dir = self.config.test_dir.clone();
        tracing::info!(test_dir = %test_dir.display(), "starting run");
        self.reporter.on_run_start(&test_dir);

        let mut state = RunState {
            suites: discover(&test_dir, &self.loader),
            cursor: Cursor::default(),
            started_at: now,
            on_complete,
        };

        let mut engine =
            ExecutionEngine::new(&self.context, &mut self.reporter, self.config.default_timeout);
        engine.run(&state.suites, &mut state.cursor).await;

        let report = self.context.tracker().render();
        let success = report.is_success();
        self.reporter.on_report(&report);

        self.context.reset();
        self.loader.invalidate();

        tracing::info!(
            success,
            candidates = state.suites.len(),
            elapsed_ms = state.started_at.elapsed().as_millis() as u64,
            "run finished"
        );
        (state.on_complete)(success);
        true
    }
}
