//! Interrupt and quit signal flags
//!
//! The handlers only store to atomics; the orchestrator polls the flags and
//! does the reporting outside signal context.

use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static QUIT: AtomicBool = AtomicBool::new(false);
static INSTALLED: AtomicBool = AtomicBool::new(false);

extern "C" fn signal_handler(signum: libc::c_int) {
    if signum == libc::SIGQUIT {
        QUIT.store(true, Ordering::Relaxed);
    } else {
        INTERRUPTED.store(true, Ordering::Relaxed);
    }
}

/// Route SIGINT and SIGQUIT to the flags below
pub fn install() {
    // SAFETY: signal_handler is an extern "C" fn with a stable address that
    // performs a single atomic store, which is async-signal-safe.
    unsafe {
        libc::signal(libc::SIGINT, signal_handler as *const () as libc::sighandler_t);
        libc::signal(libc::SIGQUIT, signal_handler as *const () as libc::sighandler_t);
    }
    INSTALLED.store(true, Ordering::Relaxed);
}

/// Whether `install` has run in this process
pub fn installed() -> bool {
    INSTALLED.load(Ordering::Relaxed)
}

/// Consume a pending interrupt request
pub fn take_interrupt() -> bool {
    INTERRUPTED.swap(false, Ordering::Relaxed)
}

/// Consume a pending quit request
pub fn take_quit() -> bool {
    QUIT.swap(false, Ordering::Relaxed)
}

/// Serializes tests that raise signals or poll the flags
#[cfg(test)]
pub(crate) static TEST_LOCK: parking_lot::Mutex<()> = parking_lot::const_mutex(());
