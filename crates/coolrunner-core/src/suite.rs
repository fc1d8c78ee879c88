//! Suite capabilities
//!
//! A loaded module qualifies as a suite when its export implements
//! [`SuiteDefinition`]: it has a name and can build a [`Suite`] instance that
//! exposes the four lifecycle hooks and its method names.

use crate::gate::{Done, HookResult, Pending};
use std::fmt;
use std::time::Duration;

/// Timeout applied to hooks and tests when a suite does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

/// An instantiated suite.
///
/// Hooks default to completing immediately. Futures returned from hooks must
/// be `'static`, so suites keep shared state behind `Arc`s and clone it into
/// the futures they return.
pub trait Suite: Send + Sync {
    /// Per-suite timeout for every hook and test method.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Method names in declaration order. Test methods are picked out of this
    /// list by [`is_test_method`].
    fn methods(&self) -> Vec<String>;

    fn before_all(&self, done: Done) -> HookResult {
        done.pass();
        Ok(Pending::Callback)
    }

    fn before_each(&self, done: Done) -> HookResult {
        done.pass();
        Ok(Pending::Callback)
    }

    fn after_each(&self, done: Done) -> HookResult {
        done.pass();
        Ok(Pending::Callback)
    }

    fn after_all(&self, done: Done) -> HookResult {
        done.pass();
        Ok(Pending::Callback)
    }

    /// Invoke the method called `name`.
    fn call(&self, name: &str, done: Done) -> HookResult;
}

/// A named, constructible suite.
pub trait SuiteDefinition: Send + Sync {
    fn name(&self) -> String;

    fn instantiate(&self) -> Box<dyn Suite>;
}

/// Whatever a module load produced.
pub enum Export {
    /// The export has the suite capability set.
    Suite(Box<dyn SuiteDefinition>),
    /// Anything else, described for logging.
    Other(String),
}

impl Export {
    pub fn as_suite(&self) -> Option<&dyn SuiteDefinition> {
        match self {
            Export::Suite(definition) => Some(definition.as_ref()),
            Export::Other(_) => None,
        }
    }
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Export::Suite(definition) => f.debug_tuple("Suite").field(&definition.name()).finish(),
            Export::Other(description) => f.debug_tuple("Other").field(description).finish(),
        }
    }
}

/// Test methods start or end with `test`, ignoring case.
pub fn is_test_method(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with("test") || lower.ends_with("test")
}

/// The test methods of `suite`, in declaration order.
pub fn test_methods(suite: &dyn Suite) -> Vec<String> {
    suite
        .methods()
        .into_iter()
        .filter(|name| is_test_method(name))
        .collect()
}

/// The lifecycle hooks, in the order a suite runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    BeforeAll,
    BeforeEach,
    AfterEach,
    AfterAll,
}

impl Hook {
    /// Name used when attributing a hook failure.
    pub fn name(self) -> &'static str {
        match self {
            Hook::BeforeAll => "beforeAll",
            Hook::BeforeEach => "beforeEach",
            Hook::AfterEach => "afterEach",
            Hook::AfterAll => "afterAll",
        }
    }

    pub fn invoke(self, suite: &dyn Suite, done: Done) -> HookResult {
        match self {
            Hook::BeforeAll => suite.before_all(done),
            Hook::BeforeEach => suite.before_each(done),
            Hook::AfterEach => suite.after_each(done),
            Hook::AfterAll => suite.after_all(done),
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
