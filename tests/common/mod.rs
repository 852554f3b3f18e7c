#![allow(dead_code)]

// Counting opener shared by the integration suites. Each opened handle
// yields an incrementing byte sequence from its own position, so shared
// position is observable across wrappers.

use shared_stream_pool::{FileIdentity, Opener, RawHandle};
use std::collections::HashSet;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct Counters {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
}

impl Counters {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
    /// Handles opened and not yet released.
    pub fn outstanding(&self) -> usize {
        self.opens() - self.closes()
    }
}

pub struct CountingOpener {
    pub counters: Arc<Counters>,
    pub denied: Mutex<HashSet<FileIdentity>>,
    pub fail_close: bool,
}

impl CountingOpener {
    pub fn new() -> (Self, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let opener = CountingOpener {
            counters: counters.clone(),
            denied: Mutex::new(HashSet::new()),
            fail_close: false,
        };
        (opener, counters)
    }

    pub fn deny(self, identity: FileIdentity) -> Self {
        self.denied.lock().unwrap().insert(identity);
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }
}

pub struct CountingHandle {
    counters: Arc<Counters>,
    pos: u8,
    fail_close: bool,
}

impl io::Read for CountingHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        for b in buf.iter_mut() {
            *b = self.pos;
            self.pos = self.pos.wrapping_add(1);
        }
        Ok(buf.len())
    }
}

impl RawHandle for CountingHandle {
    fn close(self) -> io::Result<()> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            Err(io::Error::new(io::ErrorKind::Other, "injected close failure"))
        } else {
            Ok(())
        }
    }
}

impl Opener for CountingOpener {
    type Handle = CountingHandle;

    fn open_read(&self, identity: &FileIdentity) -> io::Result<CountingHandle> {
        if self.denied.lock().unwrap().contains(identity) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(CountingHandle {
            counters: self.counters.clone(),
            pos: 0,
            fail_close: self.fail_close,
        })
    }
}

pub fn id(name: &str) -> FileIdentity {
    FileIdentity::from_canonical(format!("/dev/{name}"))
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
