//! Fixed-capacity FIFO handoff between producer and consumer units.
//!
//! Backed by a bounded crossbeam channel. The channel holds both ends
//! for its whole life, so it never disconnects on its own; shutdown is
//! expressed instead by two close latches, one per side:
//!
//! - [`close_producers`](BoundedChannel::close_producers): no producer will
//!   put again. Takes drain what is queued, then report `Closed`.
//! - [`close_consumers`](BoundedChannel::close_consumers): no consumer will
//!   take again. A put that would have to wait reports `Closed`.
//!
//! Blocking calls select over the data operation, the caller's
//! [`CancelToken`], and the relevant close latch. A call that loses to
//! cancellation leaves the queue untouched.

use std::fmt;

use crossbeam_channel::{Receiver, Select, Sender, TrySendError};

use foundry_core::{ChannelError, PutError};

use crate::cancel::{CancelToken, Latch};

/// Bounded multi-producer multi-consumer FIFO queue.
pub struct BoundedChannel<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
    capacity: usize,
    producers_done: Latch,
    consumers_done: Latch,
}

impl<T> BoundedChannel<T> {
    /// Create a channel holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// If `capacity` is zero. Validated configurations never request it.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "channel capacity must be at least 1");
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        Self {
            tx,
            rx,
            capacity,
            producers_done: Latch::new(),
            consumers_done: Latch::new(),
        }
    }

    /// Enqueue `item` at the tail, blocking while the channel is full.
    ///
    /// # Errors
    ///
    /// The item is handed back with [`ChannelError::Cancelled`] if `cancel`
    /// fires first, or with [`ChannelError::Closed`] if the consuming side
    /// is closed while the channel is full.
    pub fn put(&self, item: T, cancel: &CancelToken) -> Result<(), PutError<T>> {
        if cancel.is_cancelled() {
            return Err(PutError {
                item,
                reason: ChannelError::Cancelled,
            });
        }
        let item = match self.tx.try_send(item) {
            Ok(()) => {
                self.check_capacity();
                return Ok(());
            }
            Err(TrySendError::Full(item)) | Err(TrySendError::Disconnected(item)) => item,
        };
        if self.consumers_done.is_fired() {
            return Err(PutError {
                item,
                reason: ChannelError::Closed,
            });
        }

        let mut sel = Select::new();
        let send_op = sel.send(&self.tx);
        let cancel_op = sel.recv(cancel.signal());
        let closed_op = sel.recv(self.consumers_done.signal());
        let oper = sel.select();
        match oper.index() {
            i if i == send_op => {
                let sent = oper.send(&self.tx, item).map_err(|e| PutError {
                    item: e.into_inner(),
                    reason: ChannelError::Closed,
                });
                self.check_capacity();
                sent
            }
            i if i == cancel_op => {
                let _ = oper.recv(cancel.signal());
                Err(PutError {
                    item,
                    reason: ChannelError::Cancelled,
                })
            }
            i => {
                debug_assert_eq!(i, closed_op);
                let _ = oper.recv(self.consumers_done.signal());
                // Space may have opened up between the wakeup and now.
                self.tx.try_send(item).map_err(|e| PutError {
                    item: e.into_inner(),
                    reason: ChannelError::Closed,
                })
            }
        }
    }

    /// Dequeue the head item, blocking while the channel is empty.
    ///
    /// # Errors
    ///
    /// [`ChannelError::Cancelled`] if `cancel` fires first;
    /// [`ChannelError::Closed`] once the producing side is closed and the
    /// queue has drained.
    pub fn take(&self, cancel: &CancelToken) -> Result<T, ChannelError> {
        if cancel.is_cancelled() {
            return Err(ChannelError::Cancelled);
        }
        if let Ok(item) = self.rx.try_recv() {
            return Ok(item);
        }

        let mut sel = Select::new();
        let recv_op = sel.recv(&self.rx);
        let cancel_op = sel.recv(cancel.signal());
        let closed_op = sel.recv(self.producers_done.signal());
        let oper = sel.select();
        match oper.index() {
            i if i == recv_op => oper.recv(&self.rx).map_err(|_| ChannelError::Closed),
            i if i == cancel_op => {
                let _ = oper.recv(cancel.signal());
                Err(ChannelError::Cancelled)
            }
            i => {
                debug_assert_eq!(i, closed_op);
                let _ = oper.recv(self.producers_done.signal());
                // Drain whatever the last producers left behind.
                self.rx.try_recv().map_err(|_| ChannelError::Closed)
            }
        }
    }

    /// Enqueue without blocking. Hands the item back if the channel is full.
    pub fn try_put(&self, item: T) -> Result<(), T> {
        match self.tx.try_send(item) {
            Ok(()) => {
                self.check_capacity();
                Ok(())
            }
            Err(e) => Err(e.into_inner()),
        }
    }

    /// Dequeue without blocking.
    pub fn try_take(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Mark the producing side finished. Idempotent.
    pub fn close_producers(&self) {
        if self.producers_done.fire() {
            log::debug!("channel producers closed with {} item(s) queued", self.len());
        }
    }

    /// Mark the consuming side finished. Idempotent.
    pub fn close_consumers(&self) {
        if self.consumers_done.fire() {
            log::debug!("channel consumers closed with {} item(s) queued", self.len());
        }
    }

    /// Whether [`close_producers`](Self::close_producers) was called.
    pub fn is_producers_closed(&self) -> bool {
        self.producers_done.is_fired()
    }

    /// Whether [`close_consumers`](Self::close_consumers) was called.
    pub fn is_consumers_closed(&self) -> bool {
        self.consumers_done.is_fired()
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Whether the channel holds `capacity` items.
    pub fn is_full(&self) -> bool {
        self.rx.is_full()
    }

    /// Fixed capacity chosen at construction.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn check_capacity(&self) {
        let len = self.len();
        if len > self.capacity {
            log::error!(
                "channel capacity invariant violated: {len} items in a channel of {}",
                self.capacity
            );
            debug_assert!(len <= self.capacity, "channel over capacity");
        }
    }
}

impl<T> fmt::Debug for BoundedChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedChannel")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("producers_closed", &self.is_producers_closed())
            .field("consumers_closed", &self.is_consumers_closed())
            .finish()
    }
}
