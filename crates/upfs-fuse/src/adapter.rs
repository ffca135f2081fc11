//! `fuser::Filesystem` over any [`VfsOps`].
//!
//! FUSE callbacks arrive on fuser's session thread. Each one resolves its
//! inode to a path, drives the matching async `VfsOps` call to completion on
//! the tokio runtime, and replies. Every call runs under a timeout; a call
//! that overruns is dropped and answered with `EIO`.

use std::ffi::OsStr;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use fuser::{
    FileType as FuseFileType, Filesystem, KernelConfig, ReplyAttr, ReplyCreate, ReplyData,
    ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, ReplyXattr,
    Request, TimeOrNow,
};
use libc::c_int;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use upfs_kernel::vfs::{FileAttr, FileType, SetAttr, VfsOps, VfsResult};

use crate::errno::errno_for;
use crate::inode::{InodeTable, ROOT_INO};

/// Kernel attribute cache lifetime. Balances are live, so keep it short.
const TTL: Duration = Duration::from_secs(1);

const BLOCK_SIZE: u32 = 512;

/// FUSE front end for a path-based filesystem.
pub struct FuseAdapter<F: VfsOps> {
    vfs: Arc<F>,
    runtime: Handle,
    timeout: Duration,
    inodes: InodeTable,
    uid: u32,
    gid: u32,
}

impl<F: VfsOps> FuseAdapter<F> {
    pub fn new(vfs: Arc<F>, runtime: Handle, timeout: Duration) -> Self {
        Self {
            vfs,
            runtime,
            timeout,
            inodes: InodeTable::new(),
            uid: 0,
            gid: 0,
        }
    }

    /// Drive `fut` to completion, bounded by the call timeout.
    fn run<T>(&self, op: &str, fut: impl Future<Output = VfsResult<T>>) -> Result<T, c_int> {
        match self.runtime.block_on(tokio::time::timeout(self.timeout, fut)) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                debug!(op, "{}", e);
                Err(errno_for(&e))
            }
            Err(_) => {
                warn!(op, timeout = ?self.timeout, "call timed out");
                Err(libc::EIO)
            }
        }
    }

    fn path(&self, ino: u64) -> Result<PathBuf, c_int> {
        self.inodes
            .path(ino)
            .map(Path::to_path_buf)
            .ok_or(libc::ENOENT)
    }

    fn child(&self, parent: u64, name: &OsStr) -> Result<PathBuf, c_int> {
        self.inodes.child(parent, name).ok_or(libc::ENOENT)
    }

    fn to_fuse_attr(&self, ino: u64, attr: &FileAttr) -> fuser::FileAttr {
        fuser::FileAttr {
            ino,
            size: attr.size,
            blocks: attr.size.div_ceil(u64::from(BLOCK_SIZE)),
            atime: attr.atime.unwrap_or(attr.mtime),
            mtime: attr.mtime,
            ctime: attr.ctime.unwrap_or(attr.mtime),
            crtime: attr.mtime,
            kind: fuse_kind(attr.kind),
            perm: (attr.perm & 0o7777) as u16,
            nlink: attr.nlink,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: BLOCK_SIZE,
            flags: 0,
        }
    }

    /// Reply to an entry-producing call with the attributes of `path`.
    fn entry(&mut self, path: &Path, attr: &FileAttr, reply: ReplyEntry) {
        let ino = self.inodes.ino_for(path);
        reply.entry(&TTL, &self.to_fuse_attr(ino, attr), 0);
    }
}

fn fuse_kind(kind: FileType) -> FuseFileType {
    match kind {
        FileType::File => FuseFileType::RegularFile,
        FileType::Directory => FuseFileType::Directory,
    }
}

fn offset(offset: i64) -> u64 {
    u64::try_from(offset).unwrap_or(0)
}

impl<F: VfsOps> Filesystem for FuseAdapter<F> {
    fn init(&mut self, req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), c_int> {
        self.uid = req.uid();
        self.gid = req.gid();
        Ok(())
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let path = match self.child(parent, name) {
            Ok(p) => p,
            Err(e) => return reply.error(e),
        };
        match self.run("lookup", self.vfs.getattr(&path)) {
            Ok(attr) => self.entry(&path, &attr, reply),
            Err(e) => reply.error(e),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        let result = self
            .path(ino)
            .and_then(|path| self.run("getattr", self.vfs.getattr(&path)));
        match result {
            Ok(attr) => reply.attr(&TTL, &self.to_fuse_attr(ino, &attr)),
            Err(e) => reply.error(e),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<std::time::SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<std::time::SystemTime>,
        _chgtime: Option<std::time::SystemTime>,
        _bkuptime: Option<std::time::SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let path = match self.path(ino) {
            Ok(p) => p,
            Err(e) => return reply.error(e),
        };
        // Timestamp-only updates (touch) are accepted and ignored.
        let result = if mode.is_none() && uid.is_none() && gid.is_none() && size.is_none() {
            self.run("setattr", self.vfs.getattr(&path))
        } else {
            let attr = SetAttr {
                size,
                perm: mode,
                ..SetAttr::default()
            };
            self.run("setattr", self.vfs.setattr(&path, attr))
        };
        match result {
            Ok(attr) => reply.attr(&TTL, &self.to_fuse_attr(ino, &attr)),
            Err(e) => reply.error(e),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let result = self
            .child(parent, name)
            .and_then(|path| self.run("mkdir", self.vfs.mkdir(&path, mode)).map(|a| (path, a)));
        match result {
            Ok((path, attr)) => self.entry(&path, &attr, reply),
            Err(e) => reply.error(e),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        match self
            .child(parent, name)
            .and_then(|path| self.run("unlink", self.vfs.unlink(&path)))
        {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        match self
            .child(parent, name)
            .and_then(|path| self.run("rmdir", self.vfs.rmdir(&path)))
        {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e),
        }
    }

    fn symlink(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        link_name: &OsStr,
        target: &Path,
        reply: ReplyEntry,
    ) {
        let result = self.child(parent, link_name).and_then(|path| {
            self.run("symlink", self.vfs.symlink(&path, target))
                .map(|a| (path, a))
        });
        match result {
            Ok((path, attr)) => self.entry(&path, &attr, reply),
            Err(e) => reply.error(e),
        }
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let result = self.child(parent, name).and_then(|from| {
            let to = self.child(newparent, newname)?;
            self.run("rename", self.vfs.rename(&from, &to))
        });
        match result {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e),
        }
    }

    fn link(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        newparent: u64,
        newname: &OsStr,
        reply: ReplyEntry,
    ) {
        let result = self.path(ino).and_then(|old| {
            let new = self.child(newparent, newname)?;
            self.run("link", self.vfs.link(&old, &new)).map(|a| (new, a))
        });
        match result {
            Ok((path, attr)) => self.entry(&path, &attr, reply),
            Err(e) => reply.error(e),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        let result = self
            .path(ino)
            .and_then(|path| self.run("open", self.vfs.getattr(&path)));
        match result {
            Ok(attr) if attr.is_dir() => reply.error(libc::EISDIR),
            Ok(_) => reply.opened(0, 0),
            Err(e) => reply.error(e),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        off: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let result = self
            .path(ino)
            .and_then(|path| self.run("read", self.vfs.read(&path, offset(off), size)));
        match result {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(e),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        off: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let result = self
            .path(ino)
            .and_then(|path| self.run("write", self.vfs.write(&path, offset(off), data)));
        match result {
            Ok(written) => reply.written(written),
            Err(e) => reply.error(e),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        off: i64,
        mut reply: ReplyDirectory,
    ) {
        let path = match self.path(ino) {
            Ok(p) => p,
            Err(e) => return reply.error(e),
        };
        let entries = match self.run("readdir", self.vfs.readdir(&path)) {
            Ok(entries) => entries,
            Err(e) => return reply.error(e),
        };

        let parent_ino = self
            .inodes
            .parent(ino)
            .map(|p| self.inodes.ino_for(&p))
            .unwrap_or(ROOT_INO);
        let mut listing = vec![
            (ino, FuseFileType::Directory, ".".to_string()),
            (parent_ino, FuseFileType::Directory, "..".to_string()),
        ];
        for entry in entries {
            let child_ino = self.inodes.ino_for(&path.join(&entry.name));
            listing.push((child_ino, fuse_kind(entry.kind), entry.name));
        }

        let skip = offset(off) as usize;
        for (i, (child_ino, kind, name)) in listing.into_iter().enumerate().skip(skip) {
            // The offset handed back is where the next readdir resumes.
            if reply.add(child_ino, (i + 1) as i64, kind, name) {
                break;
            }
        }
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        match self.run("statfs", self.vfs.statfs()) {
            Ok(s) => reply.statfs(
                s.blocks, s.bfree, s.bavail, s.files, s.ffree, s.bsize, s.namelen, s.frsize,
            ),
            Err(e) => reply.error(e),
        }
    }

    fn setxattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        name: &OsStr,
        value: &[u8],
        _flags: i32,
        _position: u32,
        reply: ReplyEmpty,
    ) {
        let name = name.to_string_lossy();
        match self
            .path(ino)
            .and_then(|path| self.run("setxattr", self.vfs.setxattr(&path, &name, value)))
        {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e),
        }
    }

    fn getxattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        name: &OsStr,
        _size: u32,
        reply: ReplyXattr,
    ) {
        let name = name.to_string_lossy();
        match self
            .path(ino)
            .and_then(|path| self.run("getxattr", self.vfs.getxattr(&path, &name)))
        {
            Ok(value) => reply.data(&value),
            Err(e) => reply.error(e),
        }
    }

    fn listxattr(&mut self, _req: &Request<'_>, _ino: u64, _size: u32, reply: ReplyXattr) {
        reply.error(libc::ENOTSUP);
    }

    fn removexattr(&mut self, _req: &Request<'_>, _ino: u64, _name: &OsStr, reply: ReplyEmpty) {
        reply.error(libc::ENOTSUP);
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        let result = self
            .child(parent, name)
            .and_then(|path| self.run("create", self.vfs.create(&path, mode)).map(|a| (path, a)));
        match result {
            Ok((path, attr)) => {
                let ino = self.inodes.ino_for(&path);
                reply.created(&TTL, &self.to_fuse_attr(ino, &attr), 0, 0, 0);
            }
            Err(e) => reply.error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use upfs_kernel::{FundPool, MemorySource, UpFilesystem, VfsError};

    fn adapter(runtime: &tokio::runtime::Runtime) -> FuseAdapter<UpFilesystem> {
        let fs = UpFilesystem::new(Arc::new(MemorySource::demo()), Arc::new(FundPool::default()));
        FuseAdapter::new(Arc::new(fs), runtime.handle().clone(), Duration::from_secs(5))
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn test_run_maps_errors() {
        let rt = runtime();
        let adapter = adapter(&rt);
        let missing = adapter.run("getattr", adapter.vfs.getattr(Path::new("/nobody")));
        assert_eq!(missing.unwrap_err(), libc::ENOENT);
        let ro = adapter.run("unlink", adapter.vfs.unlink(Path::new("/everyday/balance")));
        assert_eq!(ro.unwrap_err(), libc::EROFS);
    }

    #[test]
    fn test_run_times_out_with_eio() {
        let rt = runtime();
        let mut adapter = adapter(&rt);
        adapter.timeout = Duration::from_millis(10);
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, VfsError>(())
        };
        assert_eq!(adapter.run("slow", slow).unwrap_err(), libc::EIO);
    }

    #[test]
    fn test_fuse_attr_conversion() {
        let rt = runtime();
        let adapter = adapter(&rt);
        let attr = adapter.to_fuse_attr(7, &FileAttr::file(1025, 0o444));
        assert_eq!(attr.ino, 7);
        assert_eq!(attr.kind, FuseFileType::RegularFile);
        assert_eq!(attr.perm, 0o444);
        assert_eq!(attr.blocks, 3);

        let dir = adapter.to_fuse_attr(ROOT_INO, &FileAttr::directory(0o755));
        assert_eq!(dir.kind, FuseFileType::Directory);
        assert_eq!(dir.nlink, 2);
    }

    #[test]
    fn test_negative_offset_clamps() {
        assert_eq!(offset(-5), 0);
        assert_eq!(offset(12), 12);
    }
}
