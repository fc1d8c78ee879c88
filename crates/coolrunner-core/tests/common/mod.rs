//! Shared helpers for run controller tests
//!
//! Suites are assembled from closures so each test can script exactly how
//! every hook and method completes. Every invocation is appended to a shared
//! call log as `Suite.method`.

#![allow(dead_code)]

use coolrunner_core::{
    Done, ErrorRecord, Export, Failure, HookResult, LoadError, ModuleLoader, Pending, Report,
    Reporter, Suite, SuiteDefinition,
};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub use pretty_assertions::{assert_eq, assert_ne};

pub type Step = Arc<dyn Fn(Done) -> HookResult + Send + Sync>;

#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| e.as_str() == entry).count()
    }
}

/// Calls `done` synchronously.
pub fn pass() -> Step {
    Arc::new(|done: Done| {
        done.pass();
        Ok(Pending::Callback)
    })
}

/// Calls `done` with an expectation failure.
pub fn fail(message: &'static str) -> Step {
    Arc::new(move |done: Done| {
        done.fail(Failure::expectation(message));
        Ok(Pending::Callback)
    })
}

/// Returns an error before completing.
pub fn throw(message: &'static str) -> Step {
    Arc::new(move |_done: Done| Err(Failure::error(message)))
}

/// Fails a standard assertion inside the hook body.
pub fn assert_fails() -> Step {
    Arc::new(|_done: Done| {
        let answer = 41;
        assert_eq!(answer, 42);
        Ok(Pending::Callback)
    })
}

/// Never signals completion.
pub fn hang() -> Step {
    Arc::new(|_done: Done| Ok(Pending::Callback))
}

/// Returns a future that resolves after `ms`.
pub fn resolve_after(ms: u64) -> Step {
    Arc::new(move |_done: Done| {
        Ok(Pending::future(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(())
        }))
    })
}

/// Returns a future that rejects after `ms`.
pub fn reject_after(ms: u64, message: &'static str) -> Step {
    Arc::new(move |_done: Done| {
        Ok(Pending::future(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Err(Failure::error(message))
        }))
    })
}

/// A suite whose hooks and methods are closures.
#[derive(Clone)]
pub struct FnSuite {
    name: String,
    log: CallLog,
    timeout: Option<Duration>,
    hooks: HashMap<&'static str, Step>,
    methods: Vec<(String, Step)>,
}

impl FnSuite {
    pub fn new(name: &str, log: &CallLog) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            timeout: None,
            hooks: HashMap::new(),
            methods: Vec::new(),
        }
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout = Some(Duration::from_millis(ms));
        self
    }

    pub fn before_all(mut self, step: Step) -> Self {
        self.hooks.insert("beforeAll", step);
        self
    }

    pub fn before_each(mut self, step: Step) -> Self {
        self.hooks.insert("beforeEach", step);
        self
    }

    pub fn after_each(mut self, step: Step) -> Self {
        self.hooks.insert("afterEach", step);
        self
    }

    pub fn after_all(mut self, step: Step) -> Self {
        self.hooks.insert("afterAll", step);
        self
    }

    pub fn method(mut self, name: &str, step: Step) -> Self {
        self.methods.push((name.to_string(), step));
        self
    }

    fn invoke(&self, label: &str, done: Done) -> HookResult {
        self.log.push(format!("{}.{}", self.name, label));
        match self.hooks.get(label) {
            Some(step) => step(done),
            None => {
                done.pass();
                Ok(Pending::Callback)
            }
        }
    }
}

impl Suite for FnSuite {
    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn methods(&self) -> Vec<String> {
        self.methods.iter().map(|(name, _)| name.clone()).collect()
    }

    fn before_all(&self, done: Done) -> HookResult {
        self.invoke("beforeAll", done)
    }

    fn before_each(&self, done: Done) -> HookResult {
        self.invoke("beforeEach", done)
    }

    fn after_each(&self, done: Done) -> HookResult {
        self.invoke("afterEach", done)
    }

    fn after_all(&self, done: Done) -> HookResult {
        self.invoke("afterAll", done)
    }

    fn call(&self, name: &str, done: Done) -> HookResult {
        self.log.push(format!("{}.{}", self.name, name));
        match self.methods.iter().find(|(method, _)| method == name) {
            Some((_, step)) => step(done),
            None => Err(Failure::error(format!("no method {}", name))),
        }
    }
}

impl SuiteDefinition for FnSuite {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn instantiate(&self) -> Box<dyn Suite> {
        Box::new(self.clone())
    }
}

/// What a `.suite` file in the fixture directory loads as.
#[derive(Clone)]
pub enum Module {
    Suite(FnSuite),
    Other,
    Broken(&'static str),
}

/// Loads `.suite` files by looking their file name up in a table.
#[derive(Clone, Default)]
pub struct MapLoader {
    modules: HashMap<String, Module>,
    invalidations: Arc<AtomicUsize>,
}

impl MapLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, file_name: &str, module: Module) -> Self {
        self.modules.insert(file_name.to_string(), module);
        self
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

impl ModuleLoader for MapLoader {
    fn is_module(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == "suite")
    }

    fn load_fresh(&self, path: &Path) -> Result<Export, LoadError> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        match self.modules.get(&file_name) {
            Some(Module::Suite(suite)) => Ok(Export::Suite(Box::new(suite.clone()))),
            Some(Module::Broken(message)) => Err(LoadError::Invalid {
                path: path.to_path_buf(),
                message: message.to_string(),
            }),
            Some(Module::Other) | None => Ok(Export::Other(file_name)),
        }
    }

    fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}

/// A failure as the reporter saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenFailure {
    pub label: String,
    pub message: String,
    pub expectation: bool,
    pub uncaught: bool,
}

/// Keeps every event so tests can assert on the order.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub events: Vec<String>,
    pub failures: Vec<SeenFailure>,
    pub reports: Vec<Report>,
}

impl Reporter for RecordingReporter {
    fn on_run_start(&mut self, _test_dir: &Path) {
        self.events.push("run".to_string());
    }

    fn on_suite_start(&mut self, name: &str) {
        self.events.push(format!("suite {}", name));
    }

    fn on_pass(&mut self, suite: &str, test: &str) {
        self.events.push(format!("pass {}: {}", suite, test));
    }

    fn on_failure(&mut self, record: &ErrorRecord) {
        self.events.push(format!("fail {}", record.label()));
        self.failures.push(SeenFailure {
            label: record.label(),
            message: record.failure.to_string(),
            expectation: record.failure.is_expectation(),
            uncaught: record.uncaught,
        });
    }

    fn on_report(&mut self, report: &Report) {
        self.events.push("report".to_string());
        self.reports.push(report.clone());
    }
}

/// Create empty `.suite` files so discovery finds them.
pub fn fixture_dir(files: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for file in files {
        let path: PathBuf = dir.path().join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, "").unwrap();
    }
    dir
}
