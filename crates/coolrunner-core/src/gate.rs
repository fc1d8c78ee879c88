//! Completion gate
//!
//! Hooks and test methods may finish in two ways: by calling the [`Done`]
//! handle they are given, or by returning a future ([`Pending::Future`]).
//! [`CompletionGate::run`] accepts whichever happens first, under a single
//! timeout, and ignores every later signal.

use crate::failure::Failure;
use futures_util::future::{self, BoxFuture, FutureExt};
use std::cell::Cell;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;

type Outcome = Result<(), Failure>;

thread_local! {
    static GUARD_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Whether the current thread is inside a gated hook invocation or future poll.
///
/// Panics raised while this is true are caught and recorded by the gate. A
/// process-wide panic hook uses it to forward only the other panics.
pub fn is_guarded() -> bool {
    GUARD_DEPTH.with(|depth| depth.get() > 0)
}

struct GuardScope;

impl GuardScope {
    fn enter() -> Self {
        GUARD_DEPTH.with(|depth| depth.set(depth.get() + 1));
        GuardScope
    }
}

impl Drop for GuardScope {
    fn drop(&mut self) {
        GUARD_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Marks the thread as guarded while the inner future is polled.
struct Guarded<F>(F);

impl<F: Future + Unpin> Future for Guarded<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let _scope = GuardScope::enter();
        Pin::new(&mut self.0).poll(cx)
    }
}

/// Completion callback handed to every hook and test method.
///
/// Cloning is cheap; all clones share one slot, so only the first call across
/// every clone has any effect.
#[derive(Clone)]
pub struct Done {
    slot: Arc<Mutex<Option<oneshot::Sender<Outcome>>>>,
}

impl Done {
    fn channel() -> (Self, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        let done = Done {
            slot: Arc::new(Mutex::new(Some(tx))),
        };
        (done, rx)
    }

    /// Signal completion. Returns `false` if the gate already completed.
    pub fn complete(&self, outcome: Result<(), Failure>) -> bool {
        let sender = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match sender {
            Some(tx) => tx.send(outcome).is_ok(),
            None => false,
        }
    }

    /// Signal success.
    pub fn pass(&self) -> bool {
        self.complete(Ok(()))
    }

    /// Signal failure.
    pub fn fail(&self, failure: impl Into<Failure>) -> bool {
        self.complete(Err(failure.into()))
    }
}

impl std::fmt::Debug for Done {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Done").finish_non_exhaustive()
    }
}

/// What a hook hands back once it has been invoked.
pub enum Pending {
    /// Completion arrives through [`Done`] only.
    Callback,
    /// Completion arrives through [`Done`] or when this future resolves.
    Future(BoxFuture<'static, Result<(), Failure>>),
}

impl Pending {
    /// Wrap a future as a completion source.
    pub fn future<F>(fut: F) -> Self
    where
        F: Future<Output = Result<(), Failure>> + Send + 'static,
    {
        Pending::Future(fut.boxed())
    }
}

impl std::fmt::Debug for Pending {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pending::Callback => f.write_str("Pending::Callback"),
            Pending::Future(_) => f.write_str("Pending::Future(..)"),
        }
    }
}

/// Result of invoking a hook. `Err` means the hook failed synchronously.
pub type HookResult = Result<Pending, Failure>;

/// Runs one hook or test method to a single outcome.
#[derive(Debug, Clone, Copy)]
pub struct CompletionGate {
    timeout: Duration,
}

impl CompletionGate {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Invoke `hook` and wait for its first completion signal.
    ///
    /// Must be called inside a tokio runtime: a future that loses the race is
    /// detached with `tokio::spawn` and left to finish on its own.
    pub async fn run<F>(&self, hook: F) -> Result<(), Failure>
    where
        F: FnOnce(Done) -> HookResult,
    {
        let (done, mut rx) = Done::channel();

        let invoked = {
            let _scope = GuardScope::enter();
            panic::catch_unwind(AssertUnwindSafe(|| hook(done)))
        };

        let pending = match invoked {
            Ok(Ok(pending)) => pending,
            // A hook that called `done` before failing has already completed.
            Ok(Err(failure)) => return rx.try_recv().unwrap_or(Err(failure)),
            Err(payload) => {
                let failure = Failure::from_panic(payload);
                return rx.try_recv().unwrap_or(Err(failure));
            }
        };

        let (mut fut, awaitable) = match pending {
            Pending::Callback => (future::pending().boxed(), false),
            Pending::Future(fut) => (fut, true),
        };

        let mut settled = false;
        let outcome = tokio::select! {
            biased;
            Ok(outcome) = &mut rx => outcome,
            caught = AssertUnwindSafe(Guarded(&mut fut)).catch_unwind() => {
                settled = true;
                caught.unwrap_or_else(|payload| Err(Failure::from_panic(payload)))
            }
            () = tokio::time::sleep(self.timeout) => {
                tracing::debug!(timeout_ms = self.timeout.as_millis() as u64, "completion gate timed out");
                Err(Failure::Timeout(self.timeout))
            }
        };

        if awaitable && !settled {
            tokio::spawn(async move {
                let _ = fut.await;
            });
        }

        outcome
    }
}
