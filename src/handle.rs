//! The unclosable wrapper handed to callers.
//!
//! A [`SharedReadHandle`] is a strong reference to one pooled stream. Clones
//! and repeated acquisitions share the stream and its read position.
//! `close` does nothing; the stream is released only after the last strong
//! reference is gone, by the pool, via the notification the finalizer posts.

use core::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::identity::FileIdentity;
use crate::notify::{DeadNotification, EntryId, Poster};
use crate::raw::RawHandle;

struct Inner<H: RawHandle> {
    identity: FileIdentity,
    entry: EntryId,
    // `None` only after `into_raw` or during finalization.
    stream: Mutex<Option<H>>,
    finalizer: Poster<H>,
}

impl<H: RawHandle> Drop for Inner<H> {
    fn drop(&mut self) {
        if let Some(handle) = self.stream.get_mut().take() {
            self.finalizer.post(DeadNotification::new(
                self.identity.clone(),
                self.entry,
                handle,
            ));
        }
    }
}

/// Shared, read-only stream over a pooled file.
pub struct SharedReadHandle<H: RawHandle = File> {
    inner: Arc<Inner<H>>,
}

impl<H: RawHandle> SharedReadHandle<H> {
    pub(crate) fn new(identity: FileIdentity, entry: EntryId, raw: H, finalizer: Poster<H>) -> Self {
        Self {
            inner: Arc::new(Inner {
                identity,
                entry,
                stream: Mutex::new(Some(raw)),
                finalizer,
            }),
        }
    }

    /// Read from the shared stream. Errors are the underlying handle's,
    /// unchanged.
    pub fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut stream = self.inner.stream.lock();
        // The stream is taken only by `into_raw` (sole owner) or by the
        // finalizer (no owners), so it is present for any `&self`.
        match stream.as_mut() {
            Some(stream) => stream.read(buf),
            None => unreachable!("shared stream taken while still referenced"),
        }
    }

    /// Does nothing. The stream stays open for every other holder.
    pub fn close(&self) {}

    pub fn identity(&self) -> &FileIdentity {
        &self.inner.identity
    }

    /// True when both handles share the same underlying stream.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    pub(crate) fn entry(&self) -> EntryId {
        self.inner.entry
    }

    pub(crate) fn downgrade(&self) -> WeakHandle<H> {
        WeakHandle(Arc::downgrade(&self.inner))
    }

    /// Take the raw handle back out of a wrapper that was never shared.
    ///
    /// Returns `None` if another strong reference exists; the stream is then
    /// finalized the ordinary way once that reference drops.
    pub(crate) fn into_raw(self) -> Option<H> {
        Arc::try_unwrap(self.inner)
            .ok()
            .and_then(|mut inner| inner.stream.get_mut().take())
    }
}

impl<H: RawHandle> Clone for SharedReadHandle<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<H: RawHandle> fmt::Debug for SharedReadHandle<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedReadHandle")
            .field("identity", &self.inner.identity)
            .field("entry", &self.inner.entry)
            .finish()
    }
}

impl<H: RawHandle> Read for SharedReadHandle<H> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        SharedReadHandle::read(self, buf)
    }
}

impl<H: RawHandle> Read for &SharedReadHandle<H> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        SharedReadHandle::read(*self, buf)
    }
}

/// Observes a wrapper without keeping it alive.
pub(crate) struct WeakHandle<H: RawHandle>(Weak<Inner<H>>);

impl<H: RawHandle> WeakHandle<H> {
    pub(crate) fn upgrade(&self) -> Option<SharedReadHandle<H>> {
        self.0.upgrade().map(|inner| SharedReadHandle { inner })
    }

    #[cfg(test)]
    pub(crate) fn dangling() -> Self {
        WeakHandle(Weak::new())
    }
}
