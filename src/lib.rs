//! shared-stream-pool: a process-wide pool of shared read handles for
//! device-like files (`/dev/urandom`, `/dev/zero`, named pipes), keeping at
//! most one native handle open per file no matter how many callers read it.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: hand out a shared, unclosable stream per file identity and free
//!   the native handle once no caller holds it, without callers ever saying
//!   "done" and without a central refcount call.
//! - Layers:
//!   - FileIdentity: canonical pooling key; `canonicalize` produces one.
//!   - SharedReadHandle<H>: `Arc`-backed wrapper owning the raw handle;
//!     `close` is a no-op; its finalizer posts the raw handle on the queue.
//!   - NotificationQueue<H>: MPMC channel of dead notifications, each
//!     carrying identity, entry id and the raw handle itself.
//!   - HandlePool<O>: sharded map from identity to a weak slot, optimistic
//!     open, per-key compare-and-set publish, drain before every acquire.
//!
//! Constraints
//! - One published handle per identity at any time. Duplicate opens may
//!   happen transiently under a race; losers close their own handle and
//!   are never visible to callers.
//! - No global lock. Only publish/replace/remove contend, and only on one
//!   map shard. No I/O runs under a shard lock.
//! - The pool holds no strong reference to published wrappers.
//! - Each raw handle is released exactly once: it is moved out of the
//!   wrapper either by the finalizer (into a notification) or by the
//!   race-loser path (`into_raw`), never both.
//!
//! Liveness
//! - The drop of the last strong `SharedReadHandle` runs the finalizer.
//!   Its notification is drained by the next `acquire` or `purge`; until
//!   then the dead slot stays in the map and the raw handle stays open.
//! - Removal is conditional on the entry id, so redundant or late drains
//!   never delete a newer live slot for the same identity.
//! - If the pool itself is gone when a wrapper dies, the finalizer releases
//!   the raw handle inline.
//!
//! Notes and non-goals
//! - Not an fd cache: no eviction, no LRU, no capacity limit.
//! - The race-resolution loop is unbounded; each retry either finds a live
//!   wrapper or performs a fresh open.
//! - `global()` is a lazily created pool over the filesystem for callers
//!   that want process-wide sharing; everything else takes an explicit
//!   `HandlePool`.

use std::fs::File;
use std::path::Path;
use std::sync::OnceLock;

mod config;
mod error;
mod handle;
mod identity;
mod notify;
mod pool;
mod raw;

// Public surface
pub use config::PoolConfig;
pub use error::{PoolError, Result};
pub use handle::SharedReadHandle;
pub use identity::{canonicalize, FileIdentity};
pub use pool::HandlePool;
pub use raw::{FsOpener, Opener, RawHandle};

static GLOBAL: OnceLock<HandlePool<FsOpener>> = OnceLock::new();

/// The process-wide filesystem pool, created on first use and never torn
/// down.
pub fn global() -> &'static HandlePool<FsOpener> {
    GLOBAL.get_or_init(HandlePool::default)
}

/// Canonicalize `path` and acquire its shared handle from [`global`].
pub fn open_shared(path: impl AsRef<Path>) -> Result<SharedReadHandle<File>> {
    let identity = canonicalize(path)?;
    global().acquire(&identity)
}
