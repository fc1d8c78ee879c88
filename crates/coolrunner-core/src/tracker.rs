//! Error tracker - accumulate one run's outcomes and render the report

use crate::failure::ErrorRecord;
use std::fmt;

/// Passes, failures, and suite names for the current run.
#[derive(Debug, Default)]
pub struct ErrorTracker {
    suites: Vec<String>,
    passed: usize,
    failures: Vec<ErrorRecord>,
}

impl ErrorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_suite(&mut self, name: impl Into<String>) {
        self.suites.push(name.into());
    }

    pub fn record_pass(&mut self) {
        self.passed += 1;
    }

    pub fn record_failure(&mut self, record: ErrorRecord) {
        self.failures.push(record);
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn suites(&self) -> &[String] {
        &self.suites
    }

    pub fn passed(&self) -> usize {
        self.passed
    }

    pub fn failures(&self) -> &[ErrorRecord] {
        &self.failures
    }

    /// Render the report for everything recorded so far.
    pub fn render(&self) -> Report {
        if self.has_failures() {
            Report::Failures(
                self.failures
                    .iter()
                    .map(|record| RenderedFailure {
                        label: record.label(),
                        detail: record.failure.render(),
                        uncaught: record.uncaught,
                    })
                    .collect(),
            )
        } else if self.passed > 0 {
            Report::AllPassed {
                passed: self.passed,
            }
        } else {
            Report::NoTests
        }
    }

    /// Forget everything; called between runs.
    pub fn reset(&mut self) {
        self.suites.clear();
        self.passed = 0;
        self.failures.clear();
    }
}

/// One failure as it appears in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFailure {
    pub label: String,
    pub detail: String,
    pub uncaught: bool,
}

/// Final outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Failures(Vec<RenderedFailure>),
    AllPassed { passed: usize },
    NoTests,
}

impl Report {
    pub fn is_success(&self) -> bool {
        !matches!(self, Report::Failures(_))
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Failures(failures) => {
                writeln!(f, "ERRORS: {}", failures.len())?;
                for failure in failures {
                    writeln!(f)?;
                    writeln!(f, "{}", failure.label)?;
                    writeln!(f, "{}", failure.detail)?;
                }
                Ok(())
            }
            Report::AllPassed { .. } => writeln!(f, "All tests pass!"),
            Report::NoTests => writeln!(f, "No test cases found!"),
        }
    }
}
