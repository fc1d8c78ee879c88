//! Execution engine - sequence suites, hooks, and tests
//!
//! Suites run one after another. Inside a suite the engine walks the
//! [`SuitePhase`] state machine; every hook and test method goes through a
//! [`CompletionGate`] so callback-style and future-style code is handled the
//! same way. Nothing a suite does can abort the run: failures are recorded and
//! the machine always reaches [`SuitePhase::Done`].

use crate::discovery::Candidate;
use crate::failure::{ErrorRecord, Failure, UNATTRIBUTED};
use crate::gate::CompletionGate;
use crate::reporter::Reporter;
use crate::suite::{test_methods, Hook, Suite, SuiteDefinition};
use crate::tracker::ErrorTracker;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Suite and test (or hook) that is currently executing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribution {
    pub suite: String,
    pub test: String,
}

impl Attribution {
    pub fn new(suite: impl Into<String>, test: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            test: test.into(),
        }
    }

    pub fn unattributed() -> Self {
        Self::new(UNATTRIBUTED, UNATTRIBUTED)
    }
}

/// State shared between the engine and the uncaught-failure channel.
#[derive(Debug, Default)]
pub(crate) struct RunContext {
    tracker: Mutex<ErrorTracker>,
    current: Mutex<Option<Attribution>>,
}

impl RunContext {
    pub(crate) fn tracker(&self) -> MutexGuard<'_, ErrorTracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn attribute(&self, attribution: Attribution) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(attribution);
    }

    pub(crate) fn current(&self) -> Attribution {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_else(Attribution::unattributed)
    }

    /// Empty the tracker and forget the active attribution.
    pub(crate) fn reset(&self) {
        self.tracker().reset();
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Where a suite is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuitePhase {
    Pending,
    BeforeAll,
    Tests,
    AfterAll,
    Done,
}

impl fmt::Display for SuitePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SuitePhase::Pending => "pending",
            SuitePhase::BeforeAll => "before-all",
            SuitePhase::Tests => "tests",
            SuitePhase::AfterAll => "after-all",
            SuitePhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Position of the engine within the discovered candidates.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub suite: usize,
    pub test: usize,
}

/// Drives discovered suites through their lifecycle.
pub struct ExecutionEngine<'a, R: Reporter + ?Sized> {
    context: &'a RunContext,
    reporter: &'a mut R,
    default_timeout: Duration,
}

impl<'a, R: Reporter + ?Sized> ExecutionEngine<'a, R> {
    pub(crate) fn new(
        context: &'a RunContext,
        reporter: &'a mut R,
        default_timeout: Duration,
    ) -> Self {
        Self {
            context,
            reporter,
            default_timeout,
        }
    }

    /// Run every candidate in order, advancing `cursor` as it goes.
    pub async fn run(&mut self, candidates: &[Candidate], cursor: &mut Cursor) {
        while let Some(candidate) = candidates.get(cursor.suite) {
            cursor.test = 0;
            match candidate {
                Candidate::LoadFailure(err) => {
                    self.record(ErrorRecord::load(err.clone()));
                }
                Candidate::Module { path, export } => match export.as_suite() {
                    Some(definition) => self.run_suite(definition, cursor).await,
                    None => {
                        tracing::debug!(path = %path.display(), "skipping export without suite capability");
                    }
                },
            }
            cursor.suite += 1;
        }
    }

    async fn run_suite(&mut self, definition: &dyn SuiteDefinition, cursor: &mut Cursor) {
        let name = definition.name();
        let suite = definition.instantiate();
        let tests = test_methods(suite.as_ref());
        let gate = CompletionGate::new(suite.timeout().unwrap_or(self.default_timeout));

        let mut phase = SuitePhase::Pending;
        loop {
            tracing::trace!(suite = %name, %phase, "suite phase");
            phase = match phase {
                SuitePhase::Pending => {
                    if tests.is_empty() {
                        tracing::debug!(suite = %name, "no test methods, skipping suite");
                        SuitePhase::Done
                    } else {
                        self.context.tracker().begin_suite(&name);
                        self.reporter.on_suite_start(&name);
                        SuitePhase::BeforeAll
                    }
                }
                SuitePhase::BeforeAll => {
                    let label = Hook::BeforeAll.name();
                    if self.hook(&gate, suite.as_ref(), &name, Hook::BeforeAll, label).await {
                        SuitePhase::Tests
                    } else {
                        SuitePhase::AfterAll
                    }
                }
                SuitePhase::Tests => {
                    for (index, test) in tests.iter().enumerate() {
                        cursor.test = index;
                        self.run_test(&gate, suite.as_ref(), &name, test).await;
                    }
                    SuitePhase::AfterAll
                }
                SuitePhase::AfterAll => {
                    let label = Hook::AfterAll.name();
                    self.hook(&gate, suite.as_ref(), &name, Hook::AfterAll, label).await;
                    SuitePhase::Done
                }
                SuitePhase::Done => break,
            };
        }
    }

    async fn run_test(&mut self, gate: &CompletionGate, suite: &dyn Suite, name: &str, test: &str) {
        if !self.hook(gate, suite, name, Hook::BeforeEach, test).await {
            return;
        }

        self.context.attribute(Attribution::new(name, test));
        let body = match gate.run(|done| suite.call(test, done)).await {
            Ok(()) => true,
            Err(failure) => {
                self.fail(name, test, failure);
                false
            }
        };

        let after = self.hook(gate, suite, name, Hook::AfterEach, test).await;

        if body && after {
            self.context.tracker().record_pass();
            self.reporter.on_pass(name, test);
        }
    }

    /// Run `hook`, recording a failure against `label`. Returns whether it passed.
    async fn hook(
        &mut self,
        gate: &CompletionGate,
        suite: &dyn Suite,
        name: &str,
        hook: Hook,
        label: &str,
    ) -> bool {
        self.context.attribute(Attribution::new(name, label));
        match gate.run(|done| hook.invoke(suite, done)).await {
            Ok(()) => true,
            Err(failure) => {
                tracing::debug!(suite = %name, %hook, "hook failed");
                self.fail(name, label, failure);
                false
            }
        }
    }

    fn fail(&mut self, suite: &str, test: &str, failure: Failure) {
        self.record(ErrorRecord::new(suite, test, failure));
    }

    fn record(&mut self, record: ErrorRecord) {
        self.reporter.on_failure(&record);
        self.context.tracker().record_failure(record);
    }
}
