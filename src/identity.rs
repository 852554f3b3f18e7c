//! File identity: the pooling key.
//!
//! Pooling correctness depends entirely on two requests for the same file
//! producing equal identities. The pool never canonicalizes; it trusts
//! whatever [`FileIdentity`] it is handed. [`canonicalize`] is the
//! collaborator that turns a user path into one.

use core::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{PoolError, Result};

/// Immutable, canonical token identifying a file. Cheap to clone.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileIdentity(Arc<Path>);

impl FileIdentity {
    /// Wrap a path the caller already knows to be canonical.
    ///
    /// No filesystem access happens here. Passing a non-canonical path is
    /// allowed but defeats sharing: `/dev/./zero` and `/dev/zero` would then
    /// be pooled separately.
    pub fn from_canonical(path: impl Into<PathBuf>) -> Self {
        let path: PathBuf = path.into();
        Self(Arc::from(path))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for FileIdentity {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Debug for FileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FileIdentity").field(&self.0).finish()
    }
}

impl fmt::Display for FileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.display(), f)
    }
}

/// Resolve `path` to a canonical identity, checking that it names a
/// readable, non-directory file.
///
/// Missing files map to [`PoolError::NotFound`], permission failures to
/// [`PoolError::AccessDenied`]; everything else is [`PoolError::Io`].
pub fn canonicalize(path: impl AsRef<Path>) -> Result<FileIdentity> {
    let path = path.as_ref();
    let canonical = fs::canonicalize(path).map_err(|e| classify(path, e))?;
    let meta = fs::metadata(&canonical).map_err(|e| classify(path, e))?;
    if meta.is_dir() {
        return Err(PoolError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is a directory", path.display()),
        )));
    }
    Ok(FileIdentity::from_canonical(canonical))
}

fn classify(path: &Path, e: io::Error) -> PoolError {
    match e.kind() {
        io::ErrorKind::NotFound => PoolError::NotFound {
            path: path.to_path_buf(),
        },
        io::ErrorKind::PermissionDenied => PoolError::AccessDenied {
            path: path.to_path_buf(),
        },
        _ => PoolError::Io(e),
    }
}
