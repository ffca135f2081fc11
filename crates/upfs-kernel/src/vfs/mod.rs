//! Virtual Filesystem abstraction.
//!
//! - [`VfsOps`] - Core trait for filesystem operations
//! - [`VfsError`] - The error taxonomy that crosses the filesystem boundary
//!
//! ## Design Decisions
//!
//! - **Path-based, no inodes**: Operations use paths, not inode numbers.
//!   The FUSE adapter handles inode ↔ path mapping.
//! - **Explicit offset/size**: Reads take offset and size, so no per-handle
//!   state is needed.

mod error;
mod ops;
mod types;

pub use error::{VfsError, VfsResult};
pub use ops::VfsOps;
pub use types::{DirEntry, FileAttr, FileType, SetAttr, StatFs};
