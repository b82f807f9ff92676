//! Signal handling for clean unmount
//!
//! The CLI mounts in a background session and parks the main thread until
//! SIGINT, SIGTERM or SIGHUP arrives or the session ends on its own (an
//! external `fusermount -u`). On a signal, dropping the session unmounts.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use storefs::signal::{install_signal_handlers, ShutdownSignal};
//!
//! let shutdown = Arc::new(ShutdownSignal::new());
//! install_signal_handlers(shutdown.clone()).expect("signal handlers");
//! let unmounted = || false;
//! if shutdown.wait_until(Duration::from_millis(200), unmounted) {
//!     println!("received {}", shutdown.signal_name());
//! }
//! ```

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};

/// Shutdown request shared between signal handlers and the mount loop
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    signaled: AtomicBool,
    /// Signal that requested shutdown (0 if requested programmatically)
    signal_num: AtomicI32,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_signaled(&self) -> bool {
        self.signaled.load(Ordering::Acquire)
    }

    pub fn signal_number(&self) -> i32 {
        self.signal_num.load(Ordering::Acquire)
    }

    /// Request shutdown. Safe to call from a signal handler: atomics only.
    pub fn trigger(&self, signal_num: i32) {
        self.signal_num.store(signal_num, Ordering::Release);
        self.signaled.store(true, Ordering::Release);
    }

    pub fn signal_name(&self) -> &'static str {
        match self.signal_number() {
            SIGINT => "SIGINT",
            SIGTERM => "SIGTERM",
            SIGHUP => "SIGHUP",
            0 => "none",
            _ => "unknown",
        }
    }

    /// Block until shutdown is requested or `done` returns true, polling
    /// every `poll`. Returns true when a shutdown request ended the wait.
    pub fn wait_until(&self, poll: Duration, done: impl Fn() -> bool) -> bool {
        loop {
            if self.is_signaled() {
                return true;
            }
            if done() {
                return false;
            }
            thread::sleep(poll);
        }
    }
}

/// Route SIGINT, SIGTERM and SIGHUP to `shutdown`.
pub fn install_signal_handlers(shutdown: Arc<ShutdownSignal>) -> std::io::Result<()> {
    for sig in [SIGINT, SIGTERM, SIGHUP] {
        let shutdown = shutdown.clone();
        // SAFETY: the handler only stores to atomics, which is async-signal-safe.
        unsafe {
            signal_hook::low_level::register(sig, move || shutdown.trigger(sig))?;
        }
    }
    Ok(())
}
