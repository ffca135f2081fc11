//! VFS error types.
//!
//! This is the only error taxonomy that crosses the filesystem boundary.
//! Component errors (`RemoteError`, `LocateError`, `PoolError`) convert into
//! it at the `UpFilesystem` layer.

use std::io;
use thiserror::Error;

/// VFS error type.
#[derive(Debug, Error)]
pub enum VfsError {
    /// Path does not match the grammar, or names something that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Filesystem is read-only.
    #[error("filesystem is read-only")]
    ReadOnly,

    /// Operation is not supported (extended attributes, oversized allocations).
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Remote collaborator failed (network, authorisation, decoding).
    #[error("transport error: {0}")]
    Transport(String),

    /// Invariant violation. Fatal to the call, not the process.
    #[error("internal error: {0}")]
    Internal(String),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl VfsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an Unsupported error.
    pub fn unsupported(what: impl Into<String>) -> Self {
        Self::Unsupported(what.into())
    }

    /// Create a Transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an Internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Create an IsADirectory error.
    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }
}

/// Convert VfsError to std::io::Error for compatibility.
impl From<VfsError> for io::Error {
    fn from(e: VfsError) -> Self {
        match e {
            VfsError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            VfsError::ReadOnly => {
                io::Error::new(io::ErrorKind::ReadOnlyFilesystem, "filesystem is read-only")
            }
            VfsError::Unsupported(msg) => io::Error::new(io::ErrorKind::Unsupported, msg),
            VfsError::Transport(msg) => io::Error::other(msg),
            VfsError::Internal(msg) => io::Error::other(msg),
            VfsError::NotADirectory(msg) => io::Error::new(io::ErrorKind::NotADirectory, msg),
            VfsError::IsADirectory(msg) => io::Error::new(io::ErrorKind::IsADirectory, msg),
            VfsError::Io(e) => e,
        }
    }
}

/// VFS result type.
pub type VfsResult<T> = Result<T, VfsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_io_error_kind() {
        let e: io::Error = VfsError::not_found("/x").into();
        assert_eq!(e.kind(), io::ErrorKind::NotFound);

        let e: io::Error = VfsError::ReadOnly.into();
        assert_eq!(e.kind(), io::ErrorKind::ReadOnlyFilesystem);

        let e: io::Error = VfsError::unsupported("xattr").into();
        assert_eq!(e.kind(), io::ErrorKind::Unsupported);

        let e: io::Error = VfsError::transport("timeout").into();
        assert_eq!(e.kind(), io::ErrorKind::Other);
    }
}
