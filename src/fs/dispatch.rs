//! Filesystem verbs over the store list
//!
//! [`StoreOps`] is the verb set exposed to the filesystem-protocol boundary.
//! [`StoreFs`] implements it by resolving virtual paths to physical ones and
//! forwarding to the host primitive. There is no locking and nothing is
//! cached: every call resolves against the live state of the stores.
//!
//! Placement rules:
//!
//! - Existing names resolve first-match-wins over the store list.
//! - New nodes (`create`, `mknod`, `mkdir`, the name of a `symlink`) always
//!   land in the first store, whatever exists elsewhere.
//! - `rename` and `link` resolve both endpoints independently. A destination
//!   that exists nowhere is placed in the source's store.
//! - Handle verbs (`read`, `write`, `flush`, `fsync`, `release`) never
//!   resolve; the handle identifies the file.

use std::fs::{self, File, OpenOptions, Permissions};
use std::io;
use std::os::unix::fs::{DirBuilderExt, FileExt, OpenOptionsExt, PermissionsExt};
use std::path::{Component, Path, PathBuf};

use super::attr::{FileAttr, StatFs};
use super::error::{StoreFsError, StoreResult};
use super::listing::StoreEntries;
use super::resolver::PathResolver;
use super::stores::StoreList;
use super::sys::{self, TimeUpdate};

/// An open physical file, owned by one open session
///
/// Dropping or releasing the handle closes the descriptor exactly once.
#[derive(Debug)]
pub struct FileHandle {
    file: File,
    path: PathBuf,
    store: usize,
}

impl FileHandle {
    /// Physical path the handle was opened on
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store the file was opened in
    pub fn store(&self) -> usize {
        self.store
    }

    pub fn file(&self) -> &File {
        &self.file
    }
}

/// The filesystem verb set
///
/// Virtual paths are interpreted by basename only. All failures are reported
/// as [`StoreFsError`], whose `errno()` is what the protocol layer returns.
pub trait StoreOps {
    /// `lstat` of the resolved path.
    fn getattr(&self, path: &Path) -> StoreResult<FileAttr>;

    /// Check `mask` against the resolved path; any failure is `PermissionDenied`.
    fn access(&self, path: &Path, mask: i32) -> StoreResult<()>;

    fn chmod(&self, path: &Path, mode: u32) -> StoreResult<()>;

    fn chown(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> StoreResult<()>;

    /// Entries of every store, concatenated in store order.
    fn readdir(&self, path: &Path) -> StoreEntries;

    /// Link value; absolute values are rewritten relative to the link's store.
    fn readlink(&self, path: &Path) -> StoreResult<PathBuf>;

    fn mknod(&self, path: &Path, mode: u32, rdev: u64) -> StoreResult<()>;

    fn mkdir(&self, path: &Path, mode: u32) -> StoreResult<()>;

    fn rmdir(&self, path: &Path) -> StoreResult<()>;

    fn unlink(&self, path: &Path) -> StoreResult<()>;

    /// Create a link named `name` whose value is `target`, verbatim.
    fn symlink(&self, target: &Path, name: &Path) -> StoreResult<()>;

    fn rename(&self, old: &Path, new: &Path) -> StoreResult<()>;

    /// Hard-link the existing `target` under `name`.
    fn link(&self, target: &Path, name: &Path) -> StoreResult<()>;

    fn utimens(
        &self,
        path: &Path,
        atime: Option<TimeUpdate>,
        mtime: Option<TimeUpdate>,
    ) -> StoreResult<()>;

    fn statfs(&self, path: &Path) -> StoreResult<StatFs>;

    /// Open the resolved path with `open(2)` flags.
    fn open(&self, path: &Path, flags: i32) -> StoreResult<FileHandle>;

    /// Create (or open) the basename in the first store.
    fn create(&self, path: &Path, mode: u32, flags: i32) -> StoreResult<FileHandle>;

    /// Up to `size` bytes at `offset`; short or empty at end of file.
    fn read(&self, fh: &FileHandle, offset: u64, size: usize) -> StoreResult<Vec<u8>>;

    fn write(&self, fh: &FileHandle, offset: u64, data: &[u8]) -> StoreResult<usize>;

    /// Resize the resolved path through a freshly opened descriptor.
    fn truncate(&self, path: &Path, length: u64) -> StoreResult<()>;

    fn flush(&self, fh: &FileHandle) -> StoreResult<()>;

    fn fsync(&self, fh: &FileHandle, datasync: bool) -> StoreResult<()>;

    fn release(&self, fh: FileHandle) -> StoreResult<()>;
}

/// Store-backed implementation of [`StoreOps`]
#[derive(Clone, Debug)]
pub struct StoreFs {
    resolver: PathResolver,
}

impl StoreFs {
    pub fn new(stores: StoreList) -> Self {
        Self {
            resolver: PathResolver::new(stores),
        }
    }

    pub fn stores(&self) -> &StoreList {
        self.resolver.stores()
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Entries of every store, concatenated in store order.
    pub fn list_entries(&self) -> StoreEntries {
        StoreEntries::new(self.stores().clone())
    }
}

fn open_options(flags: i32) -> OpenOptions {
    let mut opts = OpenOptions::new();
    match flags & libc::O_ACCMODE {
        libc::O_WRONLY => opts.write(true),
        libc::O_RDWR => opts.read(true).write(true),
        _ => opts.read(true),
    };
    opts.custom_flags(flags & !libc::O_ACCMODE);
    opts
}

/// `target` expressed relative to `base`, walking up with `..` as needed.
fn relative_to(target: &Path, base: &Path) -> PathBuf {
    let target: Vec<Component<'_>> = target.components().collect();
    let base: Vec<Component<'_>> = base.components().collect();
    let common = target
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base.len() {
        rel.push("..");
    }
    for part in &target[common..] {
        rel.push(part.as_os_str());
    }
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    rel
}

impl StoreOps for StoreFs {
    fn getattr(&self, path: &Path) -> StoreResult<FileAttr> {
        let found = self.resolver.resolve(path)?;
        let meta = fs::symlink_metadata(&found.path)?;
        Ok(FileAttr::from_metadata(&meta))
    }

    fn access(&self, path: &Path, mask: i32) -> StoreResult<()> {
        let found = self.resolver.resolve(path)?;
        sys::access(&found.path, mask).map_err(|e| {
            tracing::debug!(path = %found.path.display(), mask, error = %e, "access check failed");
            StoreFsError::PermissionDenied { path: found.path }
        })
    }

    fn chmod(&self, path: &Path, mode: u32) -> StoreResult<()> {
        let found = self.resolver.resolve(path)?;
        tracing::debug!(path = %found.path.display(), mode = format_args!("{:o}", mode), "chmod");
        fs::set_permissions(&found.path, Permissions::from_mode(mode))?;
        Ok(())
    }

    fn chown(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> StoreResult<()> {
        let found = self.resolver.resolve(path)?;
        tracing::debug!(path = %found.path.display(), ?uid, ?gid, "chown");
        std::os::unix::fs::lchown(&found.path, uid, gid)?;
        Ok(())
    }

    fn readdir(&self, path: &Path) -> StoreEntries {
        tracing::debug!(path = %path.display(), "readdir");
        self.list_entries()
    }

    fn readlink(&self, path: &Path) -> StoreResult<PathBuf> {
        let found = self.resolver.resolve(path)?;
        let value = fs::read_link(&found.path)?;
        if !value.is_absolute() {
            return Ok(value);
        }
        let root = self
            .stores()
            .root(found.store)
            .unwrap_or_else(|| self.stores().creation_target());
        Ok(relative_to(&value, root))
    }

    fn mknod(&self, path: &Path, mode: u32, rdev: u64) -> StoreResult<()> {
        let placed = self.resolver.place_new(path);
        tracing::debug!(path = %placed.path.display(), mode = format_args!("{:o}", mode), rdev, "mknod");
        sys::mknod(&placed.path, mode, rdev)?;
        Ok(())
    }

    fn mkdir(&self, path: &Path, mode: u32) -> StoreResult<()> {
        let placed = self.resolver.place_new(path);
        tracing::debug!(path = %placed.path.display(), mode = format_args!("{:o}", mode), "mkdir");
        fs::DirBuilder::new().mode(mode).create(&placed.path)?;
        Ok(())
    }

    fn rmdir(&self, path: &Path) -> StoreResult<()> {
        let found = self.resolver.resolve(path)?;
        tracing::debug!(path = %found.path.display(), "rmdir");
        fs::remove_dir(&found.path)?;
        Ok(())
    }

    fn unlink(&self, path: &Path) -> StoreResult<()> {
        let found = self.resolver.resolve(path)?;
        tracing::debug!(path = %found.path.display(), "unlink");
        fs::remove_file(&found.path)?;
        Ok(())
    }

    fn symlink(&self, target: &Path, name: &Path) -> StoreResult<()> {
        let placed = self.resolver.place_new(name);
        tracing::debug!(link = %placed.path.display(), target = %target.display(), "symlink");
        std::os::unix::fs::symlink(target, &placed.path)?;
        Ok(())
    }

    fn rename(&self, old: &Path, new: &Path) -> StoreResult<()> {
        let from = self.resolver.resolve(old)?;
        let to = self.resolver.resolve_or_place(new, from.store)?;
        if from.store != to.store {
            tracing::debug!(from_store = from.store, to_store = to.store, "rename crosses stores");
        }
        tracing::debug!(from = %from.path.display(), to = %to.path.display(), "rename");
        fs::rename(&from.path, &to.path)?;
        Ok(())
    }

    fn link(&self, target: &Path, name: &Path) -> StoreResult<()> {
        let existing = self.resolver.resolve(target)?;
        let new = self.resolver.resolve_or_place(name, existing.store)?;
        tracing::debug!(target = %existing.path.display(), link = %new.path.display(), "link");
        fs::hard_link(&existing.path, &new.path)?;
        Ok(())
    }

    fn utimens(
        &self,
        path: &Path,
        atime: Option<TimeUpdate>,
        mtime: Option<TimeUpdate>,
    ) -> StoreResult<()> {
        let found = self.resolver.resolve(path)?;
        sys::utimens(&found.path, atime, mtime)?;
        Ok(())
    }

    fn statfs(&self, path: &Path) -> StoreResult<StatFs> {
        let found = self.resolver.resolve(path)?;
        Ok(sys::statvfs(&found.path)?)
    }

    fn open(&self, path: &Path, flags: i32) -> StoreResult<FileHandle> {
        let found = self.resolver.resolve(path)?;
        tracing::debug!(path = %found.path.display(), flags = format_args!("{:#x}", flags), "open");
        let file = open_options(flags).open(&found.path)?;
        Ok(FileHandle {
            file,
            path: found.path,
            store: found.store,
        })
    }

    fn create(&self, path: &Path, mode: u32, flags: i32) -> StoreResult<FileHandle> {
        let placed = self.resolver.place_new(path);
        tracing::debug!(path = %placed.path.display(), mode = format_args!("{:o}", mode), "create");
        let mut opts = open_options(flags);
        if flags & libc::O_ACCMODE == libc::O_RDONLY {
            opts.write(true);
        }
        let file = opts.create(true).mode(mode).open(&placed.path)?;
        Ok(FileHandle {
            file,
            path: placed.path,
            store: placed.store,
        })
    }

    fn read(&self, fh: &FileHandle, offset: u64, size: usize) -> StoreResult<Vec<u8>> {
        let mut buf = vec![0u8; size];
        let mut filled = 0;
        while filled < size {
            match fh.file.read_at(&mut buf[filled..], offset + filled as u64) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        buf.truncate(filled);
        Ok(buf)
    }

    fn write(&self, fh: &FileHandle, offset: u64, data: &[u8]) -> StoreResult<usize> {
        fh.file.write_all_at(data, offset)?;
        Ok(data.len())
    }

    fn truncate(&self, path: &Path, length: u64) -> StoreResult<()> {
        let found = self.resolver.resolve(path)?;
        tracing::debug!(path = %found.path.display(), length, "truncate");
        let file = OpenOptions::new().write(true).open(&found.path)?;
        file.set_len(length)?;
        Ok(())
    }

    fn flush(&self, fh: &FileHandle) -> StoreResult<()> {
        fh.file.sync_all()?;
        Ok(())
    }

    fn fsync(&self, fh: &FileHandle, datasync: bool) -> StoreResult<()> {
        if datasync {
            fh.file.sync_data()?;
        } else {
            fh.file.sync_all()?;
        }
        Ok(())
    }

    fn release(&self, fh: FileHandle) -> StoreResult<()> {
        tracing::debug!(path = %fh.path.display(), "release");
        drop(fh);
        Ok(())
    }
}
