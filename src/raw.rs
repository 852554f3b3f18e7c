//! Raw handles and the open primitive the pool consumes.

use std::fs::File;
use std::io::{self, Read};

use crate::identity::FileIdentity;

/// A native read handle the pool can own and eventually release.
///
/// `close` consumes the handle. The default drops it, which is all `File`
/// can do; handles with a fallible close override it so the pool can log
/// the failure.
pub trait RawHandle: Read + Send + 'static {
    fn close(self) -> io::Result<()>
    where
        Self: Sized,
    {
        drop(self);
        Ok(())
    }
}

impl RawHandle for File {}
impl RawHandle for io::Repeat {}
impl RawHandle for io::Empty {}

/// Opens a fresh raw handle for an identity. Called once per cache miss,
/// possibly concurrently for the same identity.
pub trait Opener: Send + Sync + 'static {
    type Handle: RawHandle;

    fn open_read(&self, identity: &FileIdentity) -> io::Result<Self::Handle>;
}

/// Opens identities read-only on the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsOpener;

impl Opener for FsOpener {
    type Handle = File;

    fn open_read(&self, identity: &FileIdentity) -> io::Result<File> {
        File::open(identity.as_path())
    }
}
