//! VfsError → errno.

use libc::c_int;
use upfs_kernel::VfsError;

/// The errno a FUSE reply carries for `e`.
pub fn errno_for(e: &VfsError) -> c_int {
    match e {
        VfsError::NotFound(_) => libc::ENOENT,
        VfsError::ReadOnly => libc::EROFS,
        VfsError::Unsupported(_) => libc::ENOTSUP,
        VfsError::Transport(_) | VfsError::Internal(_) => libc::EIO,
        VfsError::NotADirectory(_) => libc::ENOTDIR,
        VfsError::IsADirectory(_) => libc::EISDIR,
        VfsError::Io(err) => err.raw_os_error().unwrap_or(libc::EIO),
    }
}
