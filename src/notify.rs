//! Liveness notification queue.
//!
//! Every published wrapper carries a [`Poster`]. When its last strong
//! reference drops, the wrapper's finalizer moves the raw handle into a
//! [`DeadNotification`] and posts it here. The pool drains the queue, removes
//! the matching slot if it is still the dead one, and releases the handle.
//!
//! The raw handle travels inside the notification, so each wrapper's handle
//! is released exactly once: whoever holds the notification owns the handle.
//! A notification dropped without `release` (e.g. discarded by the channel
//! when the pool goes away) still closes its handle.

use crossbeam_channel::{Receiver, SendError, Sender, TryIter};
use tracing::{debug, warn};

use crate::identity::FileIdentity;
use crate::raw::RawHandle;

/// Unique per published wrapper. Slots compare by entry id, never by
/// identity, so a newer entry for the same file is never mistaken for a
/// dead one.
pub(crate) type EntryId = u64;

pub(crate) struct DeadNotification<H: RawHandle> {
    pub(crate) identity: FileIdentity,
    pub(crate) entry: EntryId,
    // Taken exactly once, by `release` or by `Drop`.
    handle: Option<H>,
}

impl<H: RawHandle> DeadNotification<H> {
    pub(crate) fn new(identity: FileIdentity, entry: EntryId, handle: H) -> Self {
        Self {
            identity,
            entry,
            handle: Some(handle),
        }
    }

    /// Close the underlying handle. Close failures are logged, not returned.
    pub(crate) fn release(mut self) {
        self.close_handle();
    }

    fn close_handle(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        match handle.close() {
            Ok(()) => debug!(identity = %self.identity, entry = self.entry, "released shared handle"),
            Err(e) => warn!(identity = %self.identity, entry = self.entry, error = %e, "failed to close shared handle"),
        }
    }
}

impl<H: RawHandle> Drop for DeadNotification<H> {
    fn drop(&mut self) {
        self.close_handle();
    }
}

/// Sending half, cloned into each wrapper.
pub(crate) struct Poster<H: RawHandle> {
    tx: Sender<DeadNotification<H>>,
}

impl<H: RawHandle> Poster<H> {
    /// Post a notification, or release inline when the pool is gone and
    /// nobody will ever drain it.
    pub(crate) fn post(&self, note: DeadNotification<H>) {
        if let Err(SendError(note)) = self.tx.send(note) {
            debug!(identity = %note.identity, entry = note.entry, "pool dropped, releasing inline");
            note.release();
        }
    }
}

pub(crate) struct NotificationQueue<H: RawHandle> {
    tx: Sender<DeadNotification<H>>,
    rx: Receiver<DeadNotification<H>>,
}

impl<H: RawHandle> NotificationQueue<H> {
    pub(crate) fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    pub(crate) fn poster(&self) -> Poster<H> {
        Poster {
            tx: self.tx.clone(),
        }
    }

    /// Non-blocking; yields what is queued right now. Safe to call from
    /// several threads at once, each notification goes to exactly one.
    pub(crate) fn drain(&self) -> TryIter<'_, DeadNotification<H>> {
        self.rx.try_iter()
    }

    pub(crate) fn pending(&self) -> usize {
        self.rx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counted(Arc<AtomicUsize>);

    impl io::Read for Counted {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
    }

    impl RawHandle for Counted {
        fn close(self) -> io::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(io::Error::new(io::ErrorKind::Other, "close failed"))
        }
    }

    fn id() -> FileIdentity {
        FileIdentity::from_canonical("/dev/zero")
    }

    #[test]
    fn drain_yields_posted_in_order() {
        let q: NotificationQueue<io::Empty> = NotificationQueue::new();
        let p = q.poster();
        p.post(DeadNotification::new(id(), 1, io::empty()));
        p.post(DeadNotification::new(id(), 2, io::empty()));
        assert_eq!(q.pending(), 2);

        let entries: Vec<_> = q.drain().map(|n| n.entry).collect();
        assert_eq!(entries, vec![1, 2]);
        assert_eq!(q.drain().count(), 0);
    }

    #[test]
    fn post_after_queue_dropped_releases_inline() {
        let closes = Arc::new(AtomicUsize::new(0));
        let q: NotificationQueue<Counted> = NotificationQueue::new();
        let p = q.poster();
        drop(q);

        // A failing close is swallowed.
        p.post(DeadNotification::new(id(), 9, Counted(closes.clone())));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn undrained_notification_closes_when_queue_goes_away() {
        let closes = Arc::new(AtomicUsize::new(0));
        let q: NotificationQueue<Counted> = NotificationQueue::new();
        let p = q.poster();

        // Accepted by the channel, then discarded with it, never drained.
        p.post(DeadNotification::new(id(), 3, Counted(closes.clone())));
        assert_eq!(closes.load(Ordering::SeqCst), 0);
        drop(q);
        drop(p);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn release_closes_once() {
        let closes = Arc::new(AtomicUsize::new(0));
        DeadNotification::new(id(), 4, Counted(closes.clone())).release();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}
