//! Error taxonomy for canonicalization, opening and pool configuration.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::identity::FileIdentity;

/// Errors surfaced by the pool and its collaborators.
///
/// Read errors never pass through this type; they are returned by
/// [`SharedReadHandle::read`](crate::SharedReadHandle::read) as plain
/// [`io::Error`]s, unchanged from the underlying stream.
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("access denied: {}", path.display())]
    AccessDenied { path: PathBuf },

    #[error("failed to open {identity}: {source}")]
    Open {
        identity: FileIdentity,
        #[source]
        source: io::Error,
    },

    #[error("invalid pool configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl PoolError {
    /// The closest [`io::ErrorKind`] for this error.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            PoolError::NotFound { .. } => io::ErrorKind::NotFound,
            PoolError::AccessDenied { .. } => io::ErrorKind::PermissionDenied,
            PoolError::Open { source, .. } => source.kind(),
            PoolError::InvalidConfig(_) => io::ErrorKind::InvalidInput,
            PoolError::Io(e) => e.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_error_keeps_source_kind() {
        let e = PoolError::Open {
            identity: FileIdentity::from_canonical("/dev/random"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert_eq!(e.kind(), io::ErrorKind::PermissionDenied);
        assert!(e.to_string().starts_with("failed to open /dev/random"));
    }

    #[test]
    fn io_converts_via_from() {
        let e: PoolError = io::Error::from(io::ErrorKind::UnexpectedEof).into();
        assert!(matches!(e, PoolError::Io(_)));
        assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof);
    }
}
