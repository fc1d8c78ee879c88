//! Process-wide panic hook feeding the uncaught-failure channel
//!
//! Panics inside a gated hook or test are caught and recorded by the
//! completion gate, so the hook stays quiet for them. Everything else (a
//! detached future that panics after losing its race, a stray thread) is
//! recorded against whatever suite and test are running in the attached
//! controller.

use coolrunner_core::{is_guarded, Failure, UncaughtHandle};
use std::panic;
use std::sync::{Mutex, PoisonError};

static TARGET: Mutex<Option<UncaughtHandle>> = Mutex::new(None);

/// Install the hook. Call once per process; the previously installed hook
/// still runs for unguarded panics.
pub fn install() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        if is_guarded() {
            return;
        }
        let target = TARGET
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(handle) = target {
            tracing::debug!("forwarding unguarded panic");
            handle.report(Failure::from_payload(info.payload()));
        }
        previous(info);
    }));
}

/// Route unguarded panics to `handle`, replacing any earlier controller.
pub fn attach(handle: UncaughtHandle) {
    *TARGET.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
}
