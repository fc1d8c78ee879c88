//! Failure classification
//!
//! Every way a hook, test method, or module load can go wrong ends up as a
//! [`Failure`]. The tracker stores them inside [`ErrorRecord`]s and renders
//! them for the final report.

use crate::loader::LoadError;
use std::any::Any;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Panic message prefixes written by the standard assertion macros:
/// `assert!(cond)` and `pretty_assertions` use the first, `assert_eq!` and
/// `assert_ne!` the second. `assert!(cond, "msg")` panics with the bare
/// message and cannot be told apart from `panic!`; use [`expect!`](crate::expect)
/// for custom messages.
const ASSERTION_PREFIXES: [&str; 2] = ["assertion failed: ", "assertion `left "];

/// Label used when an uncaught failure arrives while no suite is active.
pub const UNATTRIBUTED: &str = "<unattributed>";

/// Why a hook, test method, or module load did not succeed.
#[derive(Debug, Error)]
pub enum Failure {
    /// An expectation inside a test did not hold.
    #[error("{message}")]
    Expectation { message: String },

    /// Any other error returned by a hook or test.
    #[error(transparent)]
    Error(#[from] anyhow::Error),

    /// A panic payload that is not an assertion.
    #[error("{0}")]
    Thrown(String),

    /// Neither the completion callback nor the future settled in time.
    #[error("timed out after {}ms without completing", .0.as_millis())]
    Timeout(Duration),

    /// The test module could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),
}

impl Failure {
    /// An expectation failure with the given assertion message.
    pub fn expectation(message: impl Into<String>) -> Self {
        Failure::Expectation {
            message: message.into(),
        }
    }

    /// An uncaught error carrying `message`.
    pub fn error(message: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Failure::Error(anyhow::Error::msg(message))
    }

    /// Classify a panic payload caught while running a hook or test.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        match payload.downcast::<Failure>() {
            Ok(failure) => *failure,
            Err(payload) => Self::from_payload(payload.as_ref()),
        }
    }

    /// Classify a borrowed panic payload (as seen by a panic hook).
    pub fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else if let Some(failure) = payload.downcast_ref::<Failure>() {
            return match failure {
                Failure::Expectation { message } => Failure::expectation(message.clone()),
                other => Failure::Thrown(other.to_string()),
            };
        } else {
            return Failure::Thrown("Box<dyn Any>".to_string());
        };

        if ASSERTION_PREFIXES
            .iter()
            .any(|prefix| message.starts_with(prefix))
        {
            Failure::expectation(message)
        } else {
            Failure::Thrown(message)
        }
    }

    /// Whether this failure came from the assertion mechanism.
    pub fn is_expectation(&self) -> bool {
        matches!(self, Failure::Expectation { .. })
    }

    /// Whether this failure counts as uncaught (anything that is neither an
    /// expectation nor a timeout).
    pub fn is_uncaught(&self) -> bool {
        matches!(
            self,
            Failure::Error(_) | Failure::Thrown(_) | Failure::Load(_)
        )
    }

    /// Human readable rendering used by the final report.
    pub fn render(&self) -> String {
        match self {
            Failure::Expectation { message } => format!("\tFailed asserting '{}'", message),
            Failure::Error(err) => format!("Uncaught error: {}\n\n{:?}", err, err),
            Failure::Thrown(value) => value.clone(),
            Failure::Timeout(_) => self.to_string(),
            Failure::Load(err) => format!("Uncaught error: {}", err),
        }
    }
}

/// Fail the current test with an expectation failure unless `cond` holds.
///
/// Unlike `assert!(cond, "msg")`, the failure is always recorded as an
/// expectation, whatever the message says.
///
/// ```should_panic
/// let items: Vec<u32> = Vec::new();
/// coolrunner_core::expect!(!items.is_empty(), "expected at least {} item", 1);
/// ```
#[macro_export]
macro_rules! expect {
    ($cond:expr $(,)?) => {
        $crate::expect!($cond, "{}", stringify!($cond))
    };
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            ::std::panic::panic_any($crate::Failure::expectation(format!($($arg)+)));
        }
    };
}

/// One failing test, hook, module load, or external failure.
#[derive(Debug)]
pub struct ErrorRecord {
    /// Suite the failure is attributed to (the file path for load failures)
    pub suite_name: String,
    /// Test or hook the failure is attributed to
    pub test_name: String,
    /// What went wrong
    pub failure: Failure,
    /// Whether the failure did not come from the assertion mechanism
    pub uncaught: bool,
}

impl ErrorRecord {
    /// Record a failure, deriving `uncaught` from its kind.
    pub fn new(suite_name: impl Into<String>, test_name: impl Into<String>, failure: Failure) -> Self {
        let uncaught = failure.is_uncaught();
        Self {
            suite_name: suite_name.into(),
            test_name: test_name.into(),
            failure,
            uncaught,
        }
    }

    /// Record a module that failed to load.
    pub fn load(err: LoadError) -> Self {
        let suite_name = err.path().display().to_string();
        Self::new(suite_name, "module load", Failure::Load(err))
    }

    /// `Suite: test` label shown in the report.
    pub fn label(&self) -> String {
        format!("{}: {}", self.suite_name, self.test_name)
    }
}
