//! One-shot signals: the run-wide [`CancelToken`] and the channel's
//! close latches.
//!
//! A [`Latch`] is a zero-capacity crossbeam channel whose only sender is
//! dropped when the latch fires. Every receiver then observes
//! `Disconnected` immediately, so a fired latch can sit inside a
//! `crossbeam_channel::Select` next to a data operation and wake it, and
//! `recv_timeout` on it doubles as an interruptible sleep.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

/// A signal that fires at most once and never resets.
pub(crate) struct Latch {
    fired: AtomicBool,
    trigger: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
}

impl Latch {
    pub(crate) fn new() -> Self {
        let (tx, rx) = crossbeam_channel::bounded(0);
        Self {
            fired: AtomicBool::new(false),
            trigger: Mutex::new(Some(tx)),
            signal: rx,
        }
    }

    /// Fire the latch. Returns `true` only for the call that fired it.
    pub(crate) fn fire(&self) -> bool {
        let sender = self
            .trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.fired.store(true, Ordering::Release);
        // Dropping the only sender disconnects every receiver.
        sender.is_some()
    }

    pub(crate) fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Receiver that becomes ready (disconnected) once the latch fires.
    pub(crate) fn signal(&self) -> &Receiver<()> {
        &self.signal
    }

    /// Block for at most `timeout`. Returns `true` if the latch fired.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> bool {
        match self.signal.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => self.is_fired(),
            // Nothing is ever sent, so any wakeup other than a timeout is the
            // sender being dropped.
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
        }
    }
}

/// Run-wide cooperative cancellation.
///
/// Clones share one underlying signal. Once [`cancel`](CancelToken::cancel)
/// is called, every blocking `put`, `take`, `acquire`, and scheduler sleep
/// observing this token returns promptly, and the token stays cancelled.
#[derive(Clone)]
pub struct CancelToken {
    latch: Arc<Latch>,
}

// Compile-time assertion: CancelToken must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<CancelToken>();
};

impl CancelToken {
    /// A fresh, uncancelled token.
    pub fn new() -> Self {
        Self {
            latch: Arc::new(Latch::new()),
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        if self.latch.fire() {
            log::debug!("cancellation requested");
        }
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.latch.is_fired()
    }

    /// Sleep for `timeout` unless cancelled first.
    ///
    /// Returns `true` if the token was cancelled, in which case the call
    /// returns as soon as cancellation is observed.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        if self.is_cancelled() {
            return true;
        }
        self.latch.wait_timeout(timeout)
    }

    pub(crate) fn signal(&self) -> &Receiver<()> {
        self.latch.signal()
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn latch_fires_once() {
        let latch = Latch::new();
        assert!(!latch.is_fired());
        assert!(latch.fire());
        assert!(!latch.fire());
        assert!(latch.is_fired());
    }

    #[test]
    fn wait_times_out_when_not_cancelled() {
        let token = CancelToken::new();
        let start = Instant::now();
        assert!(!token.wait_for(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn cancel_wakes_sleeper() {
        let token = CancelToken::new();
        let sleeper = {
            let token = token.clone();
            thread::spawn(move || {
                let start = Instant::now();
                let cancelled = token.wait_for(Duration::from_secs(30));
                (cancelled, start.elapsed())
            })
        };
        thread::sleep(Duration::from_millis(20));
        token.cancel();
        let (cancelled, waited) = sleeper.join().unwrap();
        assert!(cancelled);
        assert!(waited < Duration::from_secs(5));
    }

    #[test]
    fn cancelled_token_returns_immediately() {
        let token = CancelToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
        assert!(token.wait_for(Duration::from_secs(30)));
    }
}
