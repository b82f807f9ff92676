//! Attribute and statistics values reported for physical files
//!
//! These mirror the `fuser` reply types but are always available regardless
//! of feature flags, so the dispatcher can be used and tested without the
//! FUSE crate.

use std::fs::{FileType, Metadata};
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Inode number type (matches fuser's u64 inode convention)
pub type Ino = u64;

/// Root inode number (FUSE convention: inode 1 is root)
pub const ROOT_INO: Ino = 1;

/// File attributes of a physical file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileAttr {
    /// Inode number (host inode until the protocol layer assigns its own)
    pub ino: Ino,
    /// File size in bytes
    pub size: u64,
    /// Number of 512-byte blocks allocated
    pub blocks: u64,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
    /// Creation time; the host does not report one, so this is `ctime`
    pub crtime: SystemTime,
    pub kind: FileKind,
    /// Permissions (mode & 0o7777)
    pub perm: u16,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    /// Device ID (for special files)
    pub rdev: u32,
    pub blksize: u32,
    /// Flags (macOS only)
    pub flags: u32,
}

impl FileAttr {
    /// Build from `lstat`-style metadata.
    pub fn from_metadata(meta: &Metadata) -> Self {
        let ctime = unix_time(meta.ctime(), meta.ctime_nsec());
        FileAttr {
            ino: meta.ino(),
            size: meta.size(),
            blocks: meta.blocks(),
            atime: unix_time(meta.atime(), meta.atime_nsec()),
            mtime: unix_time(meta.mtime(), meta.mtime_nsec()),
            ctime,
            crtime: ctime,
            kind: FileKind::from(meta.file_type()),
            perm: (meta.mode() & 0o7777) as u16,
            nlink: meta.nlink() as u32,
            uid: meta.uid(),
            gid: meta.gid(),
            rdev: meta.rdev() as u32,
            blksize: meta.blksize() as u32,
            flags: 0,
        }
    }
}

#[cfg(feature = "fuse")]
impl From<FileAttr> for fuser::FileAttr {
    fn from(attr: FileAttr) -> Self {
        fuser::FileAttr {
            ino: attr.ino,
            size: attr.size,
            blocks: attr.blocks,
            atime: attr.atime,
            mtime: attr.mtime,
            ctime: attr.ctime,
            crtime: attr.crtime,
            kind: attr.kind.into(),
            perm: attr.perm,
            nlink: attr.nlink,
            uid: attr.uid,
            gid: attr.gid,
            rdev: attr.rdev,
            blksize: attr.blksize,
            flags: attr.flags,
        }
    }
}

/// File type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Directory,
    RegularFile,
    Symlink,
    NamedPipe,
    CharDevice,
    BlockDevice,
    Socket,
}

impl From<FileType> for FileKind {
    fn from(ft: FileType) -> Self {
        if ft.is_dir() {
            FileKind::Directory
        } else if ft.is_symlink() {
            FileKind::Symlink
        } else if ft.is_fifo() {
            FileKind::NamedPipe
        } else if ft.is_char_device() {
            FileKind::CharDevice
        } else if ft.is_block_device() {
            FileKind::BlockDevice
        } else if ft.is_socket() {
            FileKind::Socket
        } else {
            FileKind::RegularFile
        }
    }
}

#[cfg(feature = "fuse")]
impl From<FileKind> for fuser::FileType {
    fn from(kind: FileKind) -> Self {
        match kind {
            FileKind::Directory => fuser::FileType::Directory,
            FileKind::RegularFile => fuser::FileType::RegularFile,
            FileKind::Symlink => fuser::FileType::Symlink,
            FileKind::NamedPipe => fuser::FileType::NamedPipe,
            FileKind::CharDevice => fuser::FileType::CharDevice,
            FileKind::BlockDevice => fuser::FileType::BlockDevice,
            FileKind::Socket => fuser::FileType::Socket,
        }
    }
}

/// Filesystem statistics of the filesystem holding a store
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatFs {
    pub blocks: u64,
    pub bfree: u64,
    pub bavail: u64,
    pub files: u64,
    pub ffree: u64,
    pub favail: u64,
    pub bsize: u32,
    pub frsize: u32,
    pub namemax: u32,
    pub flag: u64,
}

fn unix_time(secs: i64, nsecs: i64) -> SystemTime {
    let nanos = Duration::from_nanos(nsecs.clamp(0, 999_999_999) as u64);
    if secs >= 0 {
        UNIX_EPOCH + Duration::from_secs(secs as u64) + nanos
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs()) + nanos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_regular_file_attr() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("f");
        fs::write(&path, b"hello").unwrap();

        let attr = FileAttr::from_metadata(&fs::symlink_metadata(&path).unwrap());
        assert_eq!(attr.kind, FileKind::RegularFile);
        assert_eq!(attr.size, 5);
        assert_eq!(attr.nlink, 1);
        assert_eq!(attr.crtime, attr.ctime);
    }

    #[test]
    fn test_symlink_and_dir_kind() {
        let tmp = TempDir::new().unwrap();
        let link = tmp.path().join("l");
        std::os::unix::fs::symlink("target", &link).unwrap();

        let attr = FileAttr::from_metadata(&fs::symlink_metadata(&link).unwrap());
        assert_eq!(attr.kind, FileKind::Symlink);

        let attr = FileAttr::from_metadata(&fs::symlink_metadata(tmp.path()).unwrap());
        assert_eq!(attr.kind, FileKind::Directory);
    }

    #[test]
    fn test_unix_time() {
        assert_eq!(unix_time(0, 0), UNIX_EPOCH);
        assert_eq!(unix_time(10, 5), UNIX_EPOCH + Duration::new(10, 5));
        assert_eq!(unix_time(-10, 0), UNIX_EPOCH - Duration::from_secs(10));
    }

    #[test]
    fn test_file_kind_conversion() {
        #[cfg(feature = "fuse")]
        {
            let ft: fuser::FileType = FileKind::Directory.into();
            assert_eq!(ft, fuser::FileType::Directory);
            let ft: fuser::FileType = FileKind::NamedPipe.into();
            assert_eq!(ft, fuser::FileType::NamedPipe);
        }
        let _ = FileKind::RegularFile;
    }
}
