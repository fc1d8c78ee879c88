//! Reporter sink
//!
//! The engine emits progress and the final report through this trait;
//! formatting and coloring are up to the implementation.

use crate::failure::ErrorRecord;
use crate::tracker::Report;
use std::path::Path;

/// Receives progress while a run executes.
pub trait Reporter {
    /// Called when an accepted run begins discovery
    fn on_run_start(&mut self, _test_dir: &Path) {}

    /// Called when a suite with at least one test starts
    fn on_suite_start(&mut self, _name: &str) {}

    /// Called when a test and its per-test hooks all succeeded
    fn on_pass(&mut self, suite: &str, test: &str);

    /// Called for every failure the engine records
    fn on_failure(&mut self, record: &ErrorRecord);

    /// Called once with the rendered report at the end of the run
    fn on_report(&mut self, report: &Report);
}

impl<R: Reporter + ?Sized> Reporter for Box<R> {
    fn on_run_start(&mut self, test_dir: &Path) {
        (**self).on_run_start(test_dir)
    }

    fn on_suite_start(&mut self, name: &str) {
        (**self).on_suite_start(name)
    }

    fn on_pass(&mut self, suite: &str, test: &str) {
        (**self).on_pass(suite, test)
    }

    fn on_failure(&mut self, record: &ErrorRecord) {
        (**self).on_failure(record)
    }

    fn on_report(&mut self, report: &Report) {
        (**self).on_report(report)
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn on_pass(&mut self, _suite: &str, _test: &str) {}

    fn on_failure(&mut self, _record: &ErrorRecord) {}

    fn on_report(&mut self, _report: &Report) {}
}
