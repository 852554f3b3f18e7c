//! HandlePool: identity → weakly held wrapper, with optimistic open and
//! per-key compare-and-set publication.
//!
//! Invariants
//! - At most one slot per identity; slots are only inserted, replaced or
//!   removed through a single-key `entry`/`remove_if` on the map.
//! - The pool never holds a strong reference to a published wrapper.
//! - No open, read or close runs while a map shard is locked.
//! - A slot is removed only if it still carries the entry id of the dead
//!   notification being processed.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::config::PoolConfig;
use crate::error::{PoolError, Result};
use crate::handle::{SharedReadHandle, WeakHandle};
use crate::identity::FileIdentity;
use crate::notify::{EntryId, NotificationQueue};
use crate::raw::{FsOpener, Opener, RawHandle};

struct Slot<H: RawHandle> {
    entry: EntryId,
    wrapper: WeakHandle<H>,
}

enum Lookup<H: RawHandle> {
    Live(SharedReadHandle<H>),
    Dead(EntryId),
    Vacant,
}

/// Pool of shared read handles, one live stream per [`FileIdentity`].
pub struct HandlePool<O: Opener = FsOpener> {
    opener: O,
    slots: DashMap<FileIdentity, Slot<O::Handle>>,
    queue: NotificationQueue<O::Handle>,
    next_entry: AtomicU64,
}

impl<O: Opener> HandlePool<O> {
    pub fn new(opener: O) -> Self {
        Self::from_map(opener, DashMap::new())
    }

    pub fn with_config(opener: O, config: PoolConfig) -> Result<Self> {
        config.validate()?;
        let slots = match config.shard_amount {
            Some(shards) => DashMap::with_capacity_and_shard_amount(config.capacity, shards),
            None => DashMap::with_capacity(config.capacity),
        };
        Ok(Self::from_map(opener, slots))
    }

    fn from_map(opener: O, slots: DashMap<FileIdentity, Slot<O::Handle>>) -> Self {
        Self {
            opener,
            slots,
            queue: NotificationQueue::new(),
            next_entry: AtomicU64::new(0),
        }
    }

    /// Get the shared handle for `identity`, opening it if no caller holds
    /// one.
    ///
    /// Concurrent misses each open optimistically; exactly one publishes and
    /// the rest close their own handle and adopt the winner's. Only an open
    /// failure is reported; losing a race never is.
    pub fn acquire(&self, identity: &FileIdentity) -> Result<SharedReadHandle<O::Handle>> {
        self.purge();
        loop {
            let observed = match self.lookup(identity) {
                Lookup::Live(handle) => return Ok(handle),
                Lookup::Dead(entry) => Some(entry),
                Lookup::Vacant => None,
            };

            let raw = self.opener.open_read(identity).map_err(|source| {
                debug!(identity = %identity, error = %source, "open failed");
                PoolError::Open {
                    identity: identity.clone(),
                    source,
                }
            })?;
            let entry = self.next_entry.fetch_add(1, Ordering::Relaxed);
            let handle = SharedReadHandle::new(identity.clone(), entry, raw, self.queue.poster());

            if self.publish(identity, observed, &handle) {
                debug!(identity = %identity, entry, replaced = ?observed, "published shared handle");
                return Ok(handle);
            }
            debug!(identity = %identity, entry, "lost publish race");
            discard(handle);
        }
    }

    /// Drain pending dead notifications: drop their slots if still current
    /// and release their handles. Returns the number of handles released.
    ///
    /// `acquire` does this on every call; use `purge` to release handles
    /// promptly when no acquisitions are coming.
    pub fn purge(&self) -> usize {
        let mut released = 0;
        for note in self.queue.drain() {
            let removed = self
                .slots
                .remove_if(&note.identity, |_, slot| slot.entry == note.entry)
                .is_some();
            debug!(identity = %note.identity, entry = note.entry, removed, "dead entry drained");
            note.release();
            released += 1;
        }
        released
    }

    /// Number of slots, including dead ones not yet drained.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// True if a slot exists for `identity`, live or not yet drained.
    pub fn contains(&self, identity: &FileIdentity) -> bool {
        self.slots.contains_key(identity)
    }

    fn lookup(&self, identity: &FileIdentity) -> Lookup<O::Handle> {
        match self.slots.get(identity) {
            Some(slot) => match slot.wrapper.upgrade() {
                Some(handle) => Lookup::Live(handle),
                None => Lookup::Dead(slot.entry),
            },
            None => Lookup::Vacant,
        }
    }

    /// Insert if absent when nothing was observed; otherwise replace only if
    /// the slot still holds the dead entry we saw.
    fn publish(
        &self,
        identity: &FileIdentity,
        observed: Option<EntryId>,
        handle: &SharedReadHandle<O::Handle>,
    ) -> bool {
        let slot = Slot {
            entry: handle.entry(),
            wrapper: handle.downgrade(),
        };
        match (self.slots.entry(identity.clone()), observed) {
            (Entry::Vacant(vacant), None) => {
                vacant.insert(slot);
                true
            }
            (Entry::Occupied(mut occupied), Some(dead)) if occupied.get().entry == dead => {
                occupied.insert(slot);
                true
            }
            _ => false,
        }
    }
}

/// Close a handle that lost its publish race. It was never visible to
/// anyone else, so failure is only logged.
fn discard<H: RawHandle>(handle: SharedReadHandle<H>) {
    let identity = handle.identity().clone();
    let entry = handle.entry();
    if let Some(raw) = handle.into_raw() {
        if let Err(e) = raw.close() {
            warn!(identity = %identity, entry, error = %e, "failed to close discarded handle");
        }
    }
}

impl Default for HandlePool<FsOpener> {
    fn default() -> Self {
        Self::new(FsOpener)
    }
}

impl<O: Opener> Drop for HandlePool<O> {
    fn drop(&mut self) {
        self.purge();
    }
}

impl<O: Opener> fmt::Debug for HandlePool<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlePool")
            .field("slots", &self.slots.len())
            .field("pending", &self.queue.pending())
            .finish()
    }
}
