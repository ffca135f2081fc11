//! FUSE front end for upfs.
//!
//! - [`adapter::FuseAdapter`] turns FUSE callbacks into `VfsOps` calls
//! - [`inode::InodeTable`] maps paths to inode numbers
//! - [`errno::errno_for`] maps `VfsError` to errno
//! - [`config`] holds the command line and mount settings

pub mod adapter;
pub mod config;
pub mod errno;
pub mod inode;

pub use adapter::FuseAdapter;
pub use config::{Cli, ConfigError, MountConfig, SourceConfig};
pub use errno::errno_for;
