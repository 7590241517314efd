//! Cleanup actions run on the way out of the process.
//!
//! The run-loop wrapper calls [`run`] on every exit path — normal
//! return, termination signal, or fatal fault — so cleanup like
//! removing the PID file happens even on abnormal shutdown. Explicit
//! rather than relying on destructors: `std::process::exit` does not
//! unwind.

use std::sync::{Mutex, OnceLock};

type Hook = Box<dyn FnOnce() + Send>;

static HOOKS: OnceLock<Mutex<Vec<Hook>>> = OnceLock::new();

fn hooks() -> &'static Mutex<Vec<Hook>> {
    HOOKS.get_or_init(|| Mutex::new(Vec::new()))
}

/// Registers a cleanup action to run at process exit.
pub fn register(hook: impl FnOnce() + Send + 'static) {
    if let Ok(mut hooks) = hooks().lock() {
        hooks.push(Box::new(hook));
    }
}

/// Runs all registered hooks, oldest first. Each hook runs at most
/// once; calling this again is a no-op.
pub fn run() {
    let drained = match hooks().lock() {
        Ok(mut hooks) => std::mem::take(&mut *hooks),
        Err(_) => return,
    };
    for hook in drained {
        hook();
    }
}
