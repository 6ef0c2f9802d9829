//! SIGINT/SIGTERM handling.
//!
//! The handler only raises a flag. Sockets, workers and the log are torn
//! down later by the supervisor on its own thread.

use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Installs the shutdown handler for SIGINT and SIGTERM. A second call is a
/// no-op, the handler from the first call stays in place.
pub fn install() -> Result<(), ctrlc::Error> {
    match ctrlc::set_handler(|| SHUTDOWN.store(true, Ordering::SeqCst)) {
        Err(ctrlc::Error::MultipleHandlers) => Ok(()),
        other => other,
    }
}

pub fn shutdown_requested() -> bool {
    SHUTDOWN.load(Ordering::SeqCst)
}

#[cfg(test)]
fn reset() {
    SHUTDOWN.store(false, Ordering::SeqCst);
}
