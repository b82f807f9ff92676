//! FUSE adapter for the store filesystem
//!
//! This module exposes a [`StoreFs`] to the kernel through the `fuser` crate.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                     User Applications                          │
//! └────────────────────────────────────────────────────────────────┘
//!                                  │ VFS syscalls
//!                                  ▼
//! ┌────────────────────────────────────────────────────────────────┐
//! │              Linux Kernel VFS  /  /dev/fuse                    │
//! └────────────────────────────────────────────────────────────────┘
//!                                  │ fuser crate
//!                                  ▼
//! ┌────────────────────────────────────────────────────────────────┐
//! │                    StoreFuse (this module)                     │
//! │  ┌────────────────────┐        ┌───────────────────────────┐   │
//! │  │    Inode table     │        │   Open handle table       │   │
//! │  │ (parent,name)<->ino│        │   (fh -> FileHandle)      │   │
//! │  └────────────────────┘        └───────────────────────────┘   │
//! └────────────────────────────────────────────────────────────────┘
//!                                  │ virtual paths
//!                                  ▼
//! ┌────────────────────────────────────────────────────────────────┐
//! │          StoreFs: resolver + dispatcher + listing              │
//! └────────────────────────────────────────────────────────────────┘
//!                                  │ physical paths
//!                                  ▼
//!                      store 1, store 2, ... store N
//! ```
//!
//! The virtual namespace is flat: a lookup under any directory is answered by
//! basename, and every directory lists the union of the store roots. Inodes
//! are still keyed by `(parent, name)`, so `/d/d` is a distinct inode from
//! `/d` and no directory ever aliases one of its ancestors. The root
//! directory is the empty basename, which resolves to the first store root.
//!
//! An inode lives while the kernel holds a lookup reference on it. `forget`
//! drops those references, and a successful `unlink`/`rmdir` drops the entry
//! at once when the name has vanished from every store. Directory listings
//! report known inodes and `UNKNOWN_INO` for names never looked up, so a
//! listing allocates nothing.
//!
//! # Usage
//!
//! ```bash
//! storefs mount --store /data/s1 --store /data/s2 /mnt/union
//! ls /mnt/union
//! fusermount -u /mnt/union
//! ```

use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, SystemTime};

use fuser::{
    FileType, Filesystem, KernelConfig, MountOption, ReplyAttr, ReplyCreate, ReplyData,
    ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, Request,
    TimeOrNow,
};
use rustc_hash::FxHashMap;

use super::attr::{FileAttr, Ino, ROOT_INO};
use super::dispatch::{FileHandle, StoreFs, StoreOps};
use super::error::{StoreFsError, StoreResult};
use super::sys::TimeUpdate;

impl From<TimeOrNow> for TimeUpdate {
    fn from(t: TimeOrNow) -> Self {
        match t {
            TimeOrNow::Now => TimeUpdate::Now,
            TimeOrNow::SpecificTime(at) => TimeUpdate::At(at),
        }
    }
}

/// Inode reported in listings for names the kernel has not looked up
pub const UNKNOWN_INO: Ino = 0xffff_ffff;

#[derive(Debug)]
struct Node {
    parent: Ino,
    name: OsString,
    /// Outstanding kernel lookup references
    lookups: u64,
}

/// `(parent, basename)` <-> inode assignments
#[derive(Debug, Default)]
struct InodeTable {
    by_key: FxHashMap<(Ino, OsString), Ino>,
    nodes: FxHashMap<Ino, Node>,
}

impl InodeTable {
    fn with_root() -> Self {
        let mut table = Self::default();
        table.nodes.insert(
            ROOT_INO,
            Node {
                parent: ROOT_INO,
                name: OsString::new(),
                lookups: 0,
            },
        );
        table
    }

    fn get(&self, parent: Ino, name: &OsStr) -> Option<Ino> {
        self.by_key.get(&(parent, name.to_os_string())).copied()
    }

    /// Count one lookup of `name` under `parent`, allocating with `alloc`.
    fn remember(&mut self, parent: Ino, name: &OsStr, alloc: impl FnOnce() -> Ino) -> Ino {
        if let Some(ino) = self.get(parent, name) {
            if let Some(node) = self.nodes.get_mut(&ino) {
                node.lookups += 1;
            }
            return ino;
        }
        let ino = alloc();
        self.by_key.insert((parent, name.to_os_string()), ino);
        self.nodes.insert(
            ino,
            Node {
                parent,
                name: name.to_os_string(),
                lookups: 1,
            },
        );
        ino
    }

    fn remove(&mut self, ino: Ino) {
        if ino == ROOT_INO {
            return;
        }
        if let Some(node) = self.nodes.remove(&ino) {
            self.by_key.remove(&(node.parent, node.name));
        }
    }

    /// Drop `nlookup` references; the entry goes when none are left.
    fn forget(&mut self, ino: Ino, nlookup: u64) {
        let Some(node) = self.nodes.get_mut(&ino) else {
            return;
        };
        node.lookups = node.lookups.saturating_sub(nlookup);
        if node.lookups == 0 {
            self.remove(ino);
        }
    }

    fn remove_name(&mut self, parent: Ino, name: &OsStr) {
        if let Some(ino) = self.get(parent, name) {
            self.remove(ino);
        }
    }

    /// Move the inode at `(parent, name)` to `(newparent, newname)`.
    fn rename(&mut self, parent: Ino, name: &OsStr, newparent: Ino, newname: &OsStr) {
        let Some(ino) = self.by_key.remove(&(parent, name.to_os_string())) else {
            return;
        };
        if let Some(replaced) = self.by_key.insert((newparent, newname.to_os_string()), ino) {
            self.nodes.remove(&replaced);
        }
        if let Some(node) = self.nodes.get_mut(&ino) {
            node.parent = newparent;
            node.name = newname.to_os_string();
        }
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }
}

/// One directory entry as handed to the kernel
#[derive(Clone, Debug, PartialEq)]
pub struct DirSlot {
    pub ino: Ino,
    /// Offset the kernel passes back to resume after this entry
    pub offset: i64,
    pub kind: FileType,
    pub name: OsString,
}

/// Attribute changes carried by one `setattr` call
#[derive(Clone, Debug, Default)]
pub struct AttrChanges {
    pub mode: Option<u32>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub size: Option<u64>,
    pub atime: Option<TimeUpdate>,
    pub mtime: Option<TimeUpdate>,
}

/// The store filesystem as seen by the kernel
///
/// # Concurrency Model
///
/// Inode and handle tables sit behind `RwLock`s with `FxHashMap` storage;
/// counters are atomics. Host primitives run without any lock of our own, so
/// concurrent mutators see exactly the host's guarantees.
pub struct StoreFuse {
    fs: StoreFs,

    inodes: RwLock<InodeTable>,

    /// Open handles by FUSE file handle
    open_files: RwLock<FxHashMap<u64, FileHandle>>,

    next_ino: AtomicU64,
    next_fh: AtomicU64,

    attr_ttl: Duration,
    entry_ttl: Duration,
}

impl StoreFuse {
    pub fn new(fs: StoreFs) -> Self {
        Self {
            fs,
            inodes: RwLock::new(InodeTable::with_root()),
            open_files: RwLock::new(FxHashMap::default()),
            next_ino: AtomicU64::new(ROOT_INO + 1),
            next_fh: AtomicU64::new(1),
            attr_ttl: Duration::from_secs(1),
            entry_ttl: Duration::from_secs(1),
        }
    }

    /// Kernel cache lifetime for attributes and entries.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.attr_ttl = ttl;
        self.entry_ttl = ttl;
        self
    }

    pub fn store_fs(&self) -> &StoreFs {
        &self.fs
    }

    fn table(&self) -> RwLockReadGuard<'_, InodeTable> {
        self.inodes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn table_mut(&self) -> RwLockWriteGuard<'_, InodeTable> {
        self.inodes.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inode for `name` under `parent`, counting one kernel lookup.
    pub fn remember(&self, parent: Ino, name: &OsStr) -> Ino {
        self.table_mut()
            .remember(parent, name, || self.next_ino.fetch_add(1, Ordering::Relaxed))
    }

    /// Inode already assigned to `name` under `parent`, if any.
    pub fn known_ino(&self, parent: Ino, name: &OsStr) -> Option<Ino> {
        self.table().get(parent, name)
    }

    /// Basename currently assigned to `ino`.
    pub fn name_of(&self, ino: Ino) -> Option<OsString> {
        self.table().nodes.get(&ino).map(|node| node.name.clone())
    }

    fn parent_of(&self, ino: Ino) -> Option<Ino> {
        self.table().nodes.get(&ino).map(|node| node.parent)
    }

    /// Live entries in the inode table, root included.
    pub fn inode_count(&self) -> usize {
        self.table().len()
    }

    /// Drop the entry for a removed name once no store holds it any more.
    fn unlinked(&self, parent: Ino, name: &OsStr) {
        if let Err(e) = self.fs.resolver().resolve(Path::new(name)) {
            if e.is_not_found() {
                self.table_mut().remove_name(parent, name);
            }
        }
    }

    fn alloc_fh(&self, handle: FileHandle) -> u64 {
        let fh = self.next_fh.fetch_add(1, Ordering::Relaxed);
        self.open_files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(fh, handle);
        fh
    }

    fn with_handle<T>(&self, fh: u64, op: impl FnOnce(&FileHandle) -> StoreResult<T>) -> Result<T, libc::c_int> {
        let files = self.open_files.read().unwrap_or_else(PoisonError::into_inner);
        let Some(handle) = files.get(&fh) else {
            tracing::warn!(fh, "unknown file handle");
            return Err(libc::EBADF);
        };
        op(handle).map_err(|e| errno("handle op", &e))
    }

    fn entry_attr(&self, parent: Ino, name: &OsStr) -> StoreResult<fuser::FileAttr> {
        let mut attr = self.fs.getattr(Path::new(name))?;
        attr.ino = self.remember(parent, name);
        Ok(attr.into())
    }

    fn ino_attr(&self, ino: Ino) -> Result<fuser::FileAttr, libc::c_int> {
        let Some(name) = self.name_of(ino) else {
            return Err(libc::ENOENT);
        };
        let mut attr = self
            .fs
            .getattr(Path::new(&name))
            .map_err(|e| errno("getattr", &e))?;
        attr.ino = ino;
        Ok(attr.into())
    }

    /// Attributes through an open handle; works after the name is gone.
    fn handle_attr(&self, ino: Ino, fh: u64) -> Result<fuser::FileAttr, libc::c_int> {
        let meta = self.with_handle(fh, |h| Ok(h.file().metadata()?))?;
        let mut attr = FileAttr::from_metadata(&meta);
        attr.ino = ino;
        Ok(attr.into())
    }

    /// Apply `setattr` changes in order: mode, owner, size, times.
    pub fn apply_attr_changes(&self, ino: Ino, changes: &AttrChanges) -> StoreResult<()> {
        let name = self.name_of(ino).ok_or_else(|| StoreFsError::NotFound {
            name: OsString::new(),
        })?;
        let path = Path::new(&name);
        if let Some(mode) = changes.mode {
            self.fs.chmod(path, mode & 0o7777)?;
        }
        if changes.uid.is_some() || changes.gid.is_some() {
            self.fs.chown(path, changes.uid, changes.gid)?;
        }
        if let Some(size) = changes.size {
            self.fs.truncate(path, size)?;
        }
        if changes.atime.is_some() || changes.mtime.is_some() {
            self.fs.utimens(path, changes.atime, changes.mtime)?;
        }
        Ok(())
    }

    /// Entries of directory `ino` from `offset` on.
    ///
    /// `.` and `..` take offsets 0 and 1, store entries follow. Each slot's
    /// `offset` is the position just after it, so resuming from any slot's
    /// offset continues with the next entry. Duplicate names get distinct
    /// offsets.
    pub fn dir_page(&self, ino: Ino, offset: i64) -> Result<Vec<DirSlot>, libc::c_int> {
        if offset < 0 {
            return Err(libc::EINVAL);
        }
        let (Some(name), Some(parent)) = (self.name_of(ino), self.parent_of(ino)) else {
            return Err(libc::ENOENT);
        };

        let mut page = Vec::new();
        for (pos, (dot, dot_ino)) in [(".", ino), ("..", parent)].into_iter().enumerate() {
            let pos = pos as i64;
            if pos >= offset {
                page.push(DirSlot {
                    ino: dot_ino,
                    offset: pos + 1,
                    kind: FileType::Directory,
                    name: OsString::from(dot),
                });
            }
        }

        let skip = (offset - 2).max(0) as usize;
        for (i, entry) in self.fs.readdir(Path::new(&name)).enumerate().skip(skip) {
            let entry = entry.map_err(|e| errno("readdir", &e))?;
            page.push(DirSlot {
                ino: self.known_ino(ino, &entry.name).unwrap_or(UNKNOWN_INO),
                offset: i as i64 + 3,
                kind: entry.kind.into(),
                name: entry.name,
            });
        }
        Ok(page)
    }

    fn reply_entry(&self, verb: &str, parent: Ino, name: &OsStr, reply: ReplyEntry) {
        match self.entry_attr(parent, name) {
            Ok(attr) => reply.entry(&self.entry_ttl, &attr, 0),
            Err(e) => reply.error(errno(verb, &e)),
        }
    }
}

/// Log a failure and return the errno to hand to the kernel.
fn errno(verb: &str, err: &StoreFsError) -> libc::c_int {
    if err.is_not_found() {
        tracing::debug!(verb, error = %err, "operation failed");
    } else {
        tracing::warn!(verb, error = %err, "operation failed");
    }
    err.errno()
}

impl Filesystem for StoreFuse {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), libc::c_int> {
        tracing::info!(stores = self.fs.stores().len(), "storefs initialized");
        Ok(())
    }

    fn destroy(&mut self) {
        let open = self
            .open_files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        tracing::info!(open_handles = open, "storefs unmounted");
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        tracing::trace!(parent, ?name, "lookup");
        self.reply_entry("lookup", parent, name, reply);
    }

    fn forget(&mut self, _req: &Request<'_>, ino: u64, nlookup: u64) {
        self.table_mut().forget(ino, nlookup);
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, fh: Option<u64>, reply: ReplyAttr) {
        let attr = match fh {
            Some(fh) => self.handle_attr(ino, fh),
            None => self.ino_attr(ino),
        };
        match attr {
            Ok(attr) => reply.attr(&self.attr_ttl, &attr),
            Err(code) => reply.error(code),
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
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        if self.name_of(ino).is_none() {
            reply.error(libc::ENOENT);
            return;
        }
        let changes = AttrChanges {
            mode,
            uid,
            gid,
            size,
            atime: atime.map(Into::into),
            mtime: mtime.map(Into::into),
        };
        let result = self.apply_attr_changes(ino, &changes);

        if let Err(e) = result {
            reply.error(errno("setattr", &e));
            return;
        }
        match self.ino_attr(ino) {
            Ok(attr) => reply.attr(&self.attr_ttl, &attr),
            Err(code) => reply.error(code),
        }
    }

    fn readlink(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyData) {
        let Some(name) = self.name_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.fs.readlink(Path::new(&name)) {
            Ok(target) => reply.data(target.as_os_str().as_bytes()),
            Err(e) => reply.error(errno("readlink", &e)),
        }
    }

    fn mknod(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        rdev: u32,
        reply: ReplyEntry,
    ) {
        match self.fs.mknod(Path::new(name), mode & !umask, u64::from(rdev)) {
            Ok(()) => self.reply_entry("mknod", parent, name, reply),
            Err(e) => reply.error(errno("mknod", &e)),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        reply: ReplyEntry,
    ) {
        match self.fs.mkdir(Path::new(name), mode & !umask) {
            Ok(()) => self.reply_entry("mkdir", parent, name, reply),
            Err(e) => reply.error(errno("mkdir", &e)),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        match self.fs.unlink(Path::new(name)) {
            Ok(()) => {
                self.unlinked(parent, name);
                reply.ok();
            }
            Err(e) => reply.error(errno("unlink", &e)),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        match self.fs.rmdir(Path::new(name)) {
            Ok(()) => {
                self.unlinked(parent, name);
                reply.ok();
            }
            Err(e) => reply.error(errno("rmdir", &e)),
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
        match self.fs.symlink(target, Path::new(link_name)) {
            Ok(()) => self.reply_entry("symlink", parent, link_name, reply),
            Err(e) => reply.error(errno("symlink", &e)),
        }
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        flags: u32,
        reply: ReplyEmpty,
    ) {
        if flags != 0 {
            // RENAME_NOREPLACE / RENAME_EXCHANGE are not forwarded
            reply.error(libc::EINVAL);
            return;
        }
        match self.fs.rename(Path::new(name), Path::new(newname)) {
            Ok(()) => {
                self.table_mut().rename(parent, name, newparent, newname);
                reply.ok();
            }
            Err(e) => reply.error(errno("rename", &e)),
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
        let Some(name) = self.name_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.fs.link(Path::new(&name), Path::new(newname)) {
            Ok(()) => self.reply_entry("link", newparent, newname, reply),
            Err(e) => reply.error(errno("link", &e)),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let Some(name) = self.name_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.fs.open(Path::new(&name), flags) {
            Ok(handle) => {
                let fh = self.alloc_fh(handle);
                tracing::debug!(ino, fh, "opened");
                reply.opened(fh, 0);
            }
            Err(e) => reply.error(errno("open", &e)),
        }
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        flags: i32,
        reply: ReplyCreate,
    ) {
        let handle = match self.fs.create(Path::new(name), mode & !umask, flags) {
            Ok(handle) => handle,
            Err(e) => {
                reply.error(errno("create", &e));
                return;
            }
        };
        let meta = match handle.file().metadata() {
            Ok(meta) => meta,
            Err(e) => {
                reply.error(errno("create", &StoreFsError::Io(e)));
                return;
            }
        };
        let mut attr = FileAttr::from_metadata(&meta);
        attr.ino = self.remember(parent, name);
        let fh = self.alloc_fh(handle);
        reply.created(&self.entry_ttl, &attr.into(), 0, fh, 0);
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        if offset < 0 {
            reply.error(libc::EINVAL);
            return;
        }
        let fs = &self.fs;
        match self.with_handle(fh, |h| fs.read(h, offset as u64, size as usize)) {
            Ok(data) => reply.data(&data),
            Err(code) => reply.error(code),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        if offset < 0 {
            reply.error(libc::EINVAL);
            return;
        }
        let fs = &self.fs;
        match self.with_handle(fh, |h| fs.write(h, offset as u64, data)) {
            Ok(n) => reply.written(n as u32),
            Err(code) => reply.error(code),
        }
    }

    fn flush(&mut self, _req: &Request<'_>, _ino: u64, fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        let fs = &self.fs;
        match self.with_handle(fh, |h| fs.flush(h)) {
            Ok(()) => reply.ok(),
            Err(code) => reply.error(code),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        let handle = self
            .open_files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&fh);
        let Some(handle) = handle else {
            reply.error(libc::EBADF);
            return;
        };
        match self.fs.release(handle) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(errno("release", &e)),
        }
    }

    fn fsync(&mut self, _req: &Request<'_>, _ino: u64, fh: u64, datasync: bool, reply: ReplyEmpty) {
        let fs = &self.fs;
        match self.with_handle(fh, |h| fs.fsync(h, datasync)) {
            Ok(()) => reply.ok(),
            Err(code) => reply.error(code),
        }
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        match self.ino_attr(ino) {
            Ok(attr) if attr.kind == FileType::Directory => reply.opened(0, 0),
            Ok(_) => reply.error(libc::ENOTDIR),
            Err(code) => reply.error(code),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let page = match self.dir_page(ino, offset) {
            Ok(page) => page,
            Err(code) => {
                reply.error(code);
                return;
            }
        };
        for slot in page {
            if reply.add(slot.ino, slot.offset, slot.kind, &slot.name) {
                break;
            }
        }
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyStatfs) {
        let name = self.name_of(ino).unwrap_or_default();
        match self.fs.statfs(Path::new(&name)) {
            Ok(st) => reply.statfs(
                st.blocks, st.bfree, st.bavail, st.files, st.ffree, st.bsize, st.namemax,
                st.frsize,
            ),
            Err(e) => reply.error(errno("statfs", &e)),
        }
    }

    fn access(&mut self, _req: &Request<'_>, ino: u64, mask: i32, reply: ReplyEmpty) {
        let Some(name) = self.name_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.fs.access(Path::new(&name), mask) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(errno("access", &e)),
        }
    }
}

// =============================================================================
// MOUNT FUNCTIONS
// =============================================================================

/// Mount options for StoreFuse
#[derive(Clone, Debug)]
pub struct MountOptions {
    /// Read-only mount (default: false)
    pub read_only: bool,
    /// Allow other users to access the mount (default: false)
    pub allow_other: bool,
    /// Allow root to access the mount (default: false)
    pub allow_root: bool,
    /// Let the kernel enforce permission bits (default: true)
    pub default_permissions: bool,
    /// Filesystem name shown in mount output
    pub fsname: String,
}

impl Default for MountOptions {
    fn default() -> Self {
        MountOptions {
            read_only: false,
            allow_other: false,
            allow_root: false,
            default_permissions: true,
            fsname: "storefs".to_string(),
        }
    }
}

impl MountOptions {
    fn to_fuser(&self) -> Vec<MountOption> {
        let mut options = vec![
            MountOption::FSName(self.fsname.clone()),
            MountOption::Subtype("storefs".to_string()),
        ];
        if self.default_permissions {
            options.push(MountOption::DefaultPermissions);
        }
        options.push(if self.read_only {
            MountOption::RO
        } else {
            MountOption::RW
        });
        if self.allow_other {
            options.push(MountOption::AllowOther);
        } else if self.allow_root {
            options.push(MountOption::AllowRoot);
        }
        // fusermount only accepts auto_unmount together with allow_other/allow_root
        if self.allow_other || self.allow_root {
            options.push(MountOption::AutoUnmount);
        }
        options
    }
}

/// Mount at `mountpoint`, blocking until the filesystem is unmounted.
pub fn mount<P: AsRef<Path>>(
    fs: StoreFuse,
    mountpoint: P,
    options: &MountOptions,
) -> Result<(), std::io::Error> {
    fuser::mount2(fs, mountpoint.as_ref(), &options.to_fuser())
}

/// Mount in a background thread; dropping the session unmounts.
pub fn spawn_mount<P: AsRef<Path>>(
    fs: StoreFuse,
    mountpoint: P,
    options: &MountOptions,
) -> Result<fuser::BackgroundSession, std::io::Error> {
    fuser::spawn_mount2(fs, mountpoint.as_ref(), &options.to_fuser())
}
