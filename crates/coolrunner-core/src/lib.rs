//! coolrunner core - test run engine
//!
//! This library provides everything needed to execute a test run:
//! - Discovery of test modules under a directory
//! - Suite lifecycle sequencing (beforeAll, beforeEach, test, afterEach, afterAll)
//! - Completion gating for callback-style and future-style hooks with timeouts
//! - Failure tracking, attribution, and report rendering
//! - TOML command suites via [`ScriptLoader`]
//!
//! # Assertions
//!
//! A panic from `assert!(cond)`, `assert_eq!`, `assert_ne!` or
//! `pretty_assertions` is recorded as an expectation failure. With a custom
//! message, `assert!(cond, "msg")` panics with only that message, so it is
//! recorded as an uncaught panic. Use [`expect!`] when a custom message is
//! needed:
//!
//! ```
//! let total = 2;
//! coolrunner_core::expect!(total == 2, "expected 2 items, found {}", total);
//! ```
//!
//! # Example
//!
//! ```no_run
//! use coolrunner_core::{RunConfig, RunController, ScriptLoader, SilentReporter};
//!
//! # async fn run() {
//! let mut controller = RunController::new(
//!     RunConfig::new("tests"),
//!     ScriptLoader::new(),
//!     SilentReporter,
//! );
//! controller.run(|success| println!("success: {}", success)).await;
//! # }
//! ```

/// coolrunner core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod controller;
pub mod discovery;
pub mod engine;
pub mod failure;
pub mod gate;
pub mod loader;
pub mod reporter;
pub mod script;
pub mod suite;
pub mod tracker;

// Re-export commonly used types
pub use controller::{RunConfig, RunController, UncaughtHandle, DEFAULT_DEBOUNCE};
pub use discovery::{discover, Candidate};
pub use engine::{Attribution, Cursor, ExecutionEngine, SuitePhase};
pub use failure::{ErrorRecord, Failure, UNATTRIBUTED};
pub use gate::{is_guarded, CompletionGate, Done, HookResult, Pending};
pub use loader::{LoadError, ModuleLoader};
pub use reporter::{Reporter, SilentReporter};
pub use script::ScriptLoader;
pub use suite::{is_test_method, Export, Hook, Suite, SuiteDefinition, DEFAULT_TIMEOUT};
pub use tracker::{ErrorTracker, RenderedFailure, Report};
