//! Path ↔ inode bookkeeping.
//!
//! The kernel side is path-based; FUSE speaks inodes. Numbers are handed out
//! on first sight and never reused for the life of the mount, so a path keeps
//! its inode even after the bank stops reporting it.
//!
//! `forget` is not wired up, so the table grows by one entry per distinct
//! path visited and is only released at unmount.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Inode of the mount root.
pub const ROOT_INO: u64 = fuser::FUSE_ROOT_ID;

#[derive(Debug)]
pub struct InodeTable {
    paths: HashMap<u64, PathBuf>,
    inodes: HashMap<PathBuf, u64>,
    next: u64,
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeTable {
    pub fn new() -> Self {
        let root = PathBuf::from("/");
        Self {
            paths: HashMap::from([(ROOT_INO, root.clone())]),
            inodes: HashMap::from([(root, ROOT_INO)]),
            next: ROOT_INO + 1,
        }
    }

    pub fn path(&self, ino: u64) -> Option<&Path> {
        self.paths.get(&ino).map(PathBuf::as_path)
    }

    /// Inode for `path`, allocating one if the path is new.
    pub fn ino_for(&mut self, path: &Path) -> u64 {
        if let Some(&ino) = self.inodes.get(path) {
            return ino;
        }
        let ino = self.next;
        self.next += 1;
        self.paths.insert(ino, path.to_path_buf());
        self.inodes.insert(path.to_path_buf(), ino);
        ino
    }

    /// Path of `name` inside directory `parent`.
    pub fn child(&self, parent: u64, name: &OsStr) -> Option<PathBuf> {
        self.path(parent).map(|p| p.join(name))
    }

    /// Parent directory path of `ino` (the root is its own parent).
    pub fn parent(&self, ino: u64) -> Option<PathBuf> {
        let path = self.path(ino)?;
        Some(path.parent().unwrap_or(path).to_path_buf())
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_preallocated() {
        let table = InodeTable::new();
        assert_eq!(table.path(ROOT_INO), Some(Path::new("/")));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_inodes_are_stable() {
        let mut table = InodeTable::new();
        let a = table.ino_for(Path::new("/everyday"));
        let b = table.ino_for(Path::new("/everyday/balance"));
        assert_ne!(a, b);
        assert_eq!(table.ino_for(Path::new("/everyday")), a);
        assert_eq!(table.path(b), Some(Path::new("/everyday/balance")));
    }

    #[test]
    fn test_child_and_parent() {
        let mut table = InodeTable::new();
        let child = table.child(ROOT_INO, OsStr::new("everyday")).unwrap();
        assert_eq!(child, PathBuf::from("/everyday"));
        let ino = table.ino_for(&child);
        assert_eq!(table.parent(ino), Some(PathBuf::from("/")));
        assert_eq!(table.parent(ROOT_INO), Some(PathBuf::from("/")));
        assert_eq!(table.child(999, OsStr::new("x")), None);
    }
}
