//! Signal handling for graceful unmount
//!
//! SIGINT, SIGTERM and SIGHUP flip a [`ShutdownSignal`]; the mount loop polls
//! it, drops the background FUSE session (which unmounts) and removes the
//! mountpoint directory.
//!
//! # Usage
//!
//! ```rust,no_run
//! use appimagelauncherfs::fs::signal::{install_signal_handlers, ShutdownSignal};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let shutdown = Arc::new(ShutdownSignal::new());
//! install_signal_handlers(shutdown.clone()).expect("Failed to install signal handlers");
//!
//! shutdown.wait(Duration::from_millis(200));
//! println!("received {}", shutdown.signal_name());
//! ```

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};

/// Set once by a handler; the mount loop waits on it.
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    requested: AtomicBool,
    // 0 until a signal arrives
    cause: AtomicI32,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_signaled(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Record `signum` as the cause and release any waiter.
    pub fn trigger(&self, signum: i32) {
        self.cause.store(signum, Ordering::Release);
        self.requested.store(true, Ordering::Release);
    }

    /// Block until [`trigger`](Self::trigger) runs, checking every `poll`.
    pub fn wait(&self, poll: Duration) {
        while !self.is_signaled() {
            thread::sleep(poll);
        }
    }

    /// Name of the signal that caused shutdown, for the log line
    pub fn signal_name(&self) -> &'static str {
        match self.cause.load(Ordering::Acquire) {
            0 => "none",
            SIGINT => "SIGINT",
            SIGTERM => "SIGTERM",
            SIGHUP => "SIGHUP",
            _ => "unknown",
        }
    }
}

/// Route SIGINT, SIGTERM and SIGHUP to `shutdown`.
pub fn install_signal_handlers(shutdown: Arc<ShutdownSignal>) -> std::io::Result<()> {
    for signal in [SIGINT, SIGTERM, SIGHUP] {
        let shutdown = shutdown.clone();
        // SAFETY: the handler only stores to atomics
        unsafe {
            signal_hook::low_level::register(signal, move || {
                shutdown.trigger(signal);
            })?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untriggered() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_signaled());
        assert_eq!(signal.signal_name(), "none");
    }

    #[test]
    fn test_trigger_records_cause() {
        let signal = ShutdownSignal::new();
        signal.trigger(SIGTERM);
        assert!(signal.is_signaled());
        assert_eq!(signal.signal_name(), "SIGTERM");

        signal.trigger(99);
        assert_eq!(signal.signal_name(), "unknown");
    }

    #[test]
    fn test_wait_returns_after_trigger() {
        let signal = Arc::new(ShutdownSignal::new());

        let trigger = {
            let signal = signal.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                signal.trigger(SIGHUP);
            })
        };

        signal.wait(Duration::from_millis(5));
        trigger.join().unwrap();
        assert_eq!(signal.signal_name(), "SIGHUP");
    }
}
