//! Counting permit gate bounding simultaneous consumer actions.
//!
//! Permits are tokens in a bounded crossbeam channel prefilled to its
//! capacity. Acquiring receives a token, releasing sends it back, so the
//! number of outstanding permits is `permits - queued tokens` and can
//! never exceed `permits`. Release happens only through [`Permit`]'s
//! `Drop`, so every exit path of a consumer action returns its token.

use std::fmt;

use crossbeam_channel::{Receiver, Select, Sender, TrySendError};

use foundry_core::AcquireError;

use crate::cancel::CancelToken;

/// At most `permits` holders at any instant.
pub struct ConcurrencyLimiter {
    release_tx: Sender<()>,
    acquire_rx: Receiver<()>,
    permits: usize,
}

impl ConcurrencyLimiter {
    /// Create a limiter with `permits` permits, all available.
    ///
    /// # Panics
    ///
    /// If `permits` is zero. Validated configurations never request it.
    pub fn new(permits: usize) -> Self {
        assert!(permits >= 1, "limiter needs at least one permit");
        let (release_tx, acquire_rx) = crossbeam_channel::bounded(permits);
        for _ in 0..permits {
            // Cannot fail: the channel has room for every token and we hold
            // the receiver.
            let _ = release_tx.try_send(());
        }
        Self {
            release_tx,
            acquire_rx,
            permits,
        }
    }

    /// Block until a permit is available, then take it.
    ///
    /// # Errors
    ///
    /// [`AcquireError::Cancelled`] if `cancel` fires first. No permit is
    /// held in that case.
    pub fn acquire(&self, cancel: &CancelToken) -> Result<Permit<'_>, AcquireError> {
        if cancel.is_cancelled() {
            return Err(AcquireError::Cancelled);
        }
        if let Some(permit) = self.try_acquire() {
            return Ok(permit);
        }

        let mut sel = Select::new();
        let token_op = sel.recv(&self.acquire_rx);
        let cancel_op = sel.recv(cancel.signal());
        let oper = sel.select();
        match oper.index() {
            i if i == token_op => match oper.recv(&self.acquire_rx) {
                Ok(()) => Ok(self.permit()),
                // The limiter owns its sender, so the token channel never
                // disconnects while `self` is alive.
                Err(_) => Err(AcquireError::Cancelled),
            },
            i => {
                debug_assert_eq!(i, cancel_op);
                let _ = oper.recv(cancel.signal());
                Err(AcquireError::Cancelled)
            }
        }
    }

    /// Take a permit if one is free.
    pub fn try_acquire(&self) -> Option<Permit<'_>> {
        self.acquire_rx.try_recv().ok().map(|()| self.permit())
    }

    /// Permits currently held.
    pub fn in_use(&self) -> usize {
        self.permits.saturating_sub(self.acquire_rx.len())
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        self.acquire_rx.len()
    }

    /// Total permits.
    pub fn permits(&self) -> usize {
        self.permits
    }

    fn permit(&self) -> Permit<'_> {
        Permit { limiter: self }
    }

    fn release(&self) {
        match self.release_tx.try_send(()) {
            Ok(()) => {}
            Err(TrySendError::Full(())) => {
                log::error!(
                    "limiter permit invariant violated: release with all {} permits free",
                    self.permits
                );
                debug_assert!(false, "permit released into a full limiter");
            }
            Err(TrySendError::Disconnected(())) => {}
        }
    }
}

impl fmt::Debug for ConcurrencyLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrencyLimiter")
            .field("permits", &self.permits)
            .field("in_use", &self.in_use())
            .finish()
    }
}

/// A held permit. Dropping it releases exactly one permit.
#[must_use = "the permit is released as soon as it is dropped"]
pub struct Permit<'a> {
    limiter: &'a ConcurrencyLimiter,
}

impl fmt::Debug for Permit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Permit").finish_non_exhaustive()
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.limiter.release();
    }
}
