//! Host primitives that `std` does not expose
//!
//! Each wrapper takes a physical path and forwards to `rustix`. Failures come
//! back as `io::Error` built from the host errno, so the caller can pass the
//! errno through untouched.

use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rustix::fs::{
    Access, AtFlags, FileType, Mode, RawMode, Timespec, Timestamps, CWD, UTIME_NOW, UTIME_OMIT,
};

use super::attr::StatFs;

/// New value for one timestamp in a `utimens` call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeUpdate {
    Now,
    At(SystemTime),
}

/// `access(2)` with the caller's mode mask (`F_OK`, `R_OK`, ...).
pub fn access(path: &Path, mask: libc::c_int) -> io::Result<()> {
    rustix::fs::access(path, Access::from_bits_retain(mask as _))?;
    Ok(())
}

/// `mknod(2)`; `mode` carries both the file type and the permission bits.
pub fn mknod(path: &Path, mode: u32, rdev: u64) -> io::Result<()> {
    let mode = mode as RawMode;
    rustix::fs::mknodat(
        CWD,
        path,
        FileType::from_raw_mode(mode),
        Mode::from_raw_mode(mode),
        rdev as _,
    )?;
    Ok(())
}

fn timespec(update: Option<TimeUpdate>) -> Timespec {
    match update {
        None => Timespec {
            tv_sec: 0,
            tv_nsec: UTIME_OMIT as _,
        },
        Some(TimeUpdate::Now) => Timespec {
            tv_sec: 0,
            tv_nsec: UTIME_NOW as _,
        },
        Some(TimeUpdate::At(t)) => match t.duration_since(UNIX_EPOCH) {
            Ok(d) => Timespec {
                tv_sec: d.as_secs() as _,
                tv_nsec: d.subsec_nanos() as _,
            },
            Err(before) => {
                let d = before.duration();
                let mut secs = -(d.as_secs() as i64);
                let mut nsec = d.subsec_nanos() as i64;
                if nsec > 0 {
                    secs -= 1;
                    nsec = 1_000_000_000 - nsec;
                }
                Timespec {
                    tv_sec: secs as _,
                    tv_nsec: nsec as _,
                }
            }
        },
    }
}

/// `utimensat(2)` relative to the working directory, not following symlinks.
///
/// `None` leaves the corresponding timestamp untouched.
pub fn utimens(path: &Path, atime: Option<TimeUpdate>, mtime: Option<TimeUpdate>) -> io::Result<()> {
    let times = Timestamps {
        last_access: timespec(atime),
        last_modification: timespec(mtime),
    };
    rustix::fs::utimensat(CWD, path, &times, AtFlags::SYMLINK_NOFOLLOW)?;
    Ok(())
}

/// `statvfs(3)` of the filesystem holding `path`.
pub fn statvfs(path: &Path) -> io::Result<StatFs> {
    let st = rustix::fs::statvfs(path)?;
    Ok(StatFs {
        blocks: st.f_blocks,
        bfree: st.f_bfree,
        bavail: st.f_bavail,
        files: st.f_files,
        ffree: st.f_ffree,
        favail: st.f_favail,
        bsize: st.f_bsize as u32,
        frsize: st.f_frsize as u32,
        namemax: st.f_namemax as u32,
        flag: st.f_flag.bits() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_access_existing_and_missing() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("f");
        fs::write(&path, b"").unwrap();

        assert!(access(&path, libc::F_OK).is_ok());
        let err = access(&tmp.path().join("missing"), libc::F_OK).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
    }

    #[test]
    fn test_interior_nul_is_einval() {
        let err = access(Path::new("bad\0name"), libc::F_OK).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EINVAL));
    }

    #[test]
    fn test_utimens_sets_mtime() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("f");
        fs::write(&path, b"").unwrap();

        let when = UNIX_EPOCH + Duration::from_secs(1_000_000);
        utimens(&path, None, Some(TimeUpdate::At(when))).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), when);
    }

    #[test]
    fn test_statvfs_reports_sizes() {
        let tmp = TempDir::new().unwrap();
        let st = statvfs(tmp.path()).unwrap();
        assert!(st.bsize > 0);
        assert!(st.namemax > 0);
    }

    #[test]
    fn test_access_denied_keeps_errno() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("f");
        fs::write(&path, b"").unwrap();
        // No execute bit for anyone, so X_OK fails even for root.
        let err = access(&path, libc::X_OK).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EACCES));
    }

    #[test]
    fn test_utimens_now_and_subsecond() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("f");
        fs::write(&path, b"").unwrap();

        let at = UNIX_EPOCH + Duration::new(1_234_567_890, 500_000_000);
        utimens(&path, Some(TimeUpdate::At(at)), Some(TimeUpdate::Now)).unwrap();
        let meta = fs::metadata(&path).unwrap();
        assert_eq!(meta.accessed().unwrap(), at);
        assert!(meta.modified().unwrap() > UNIX_EPOCH);
    }

    #[test]
    fn test_mknod_fifo() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pipe");
        mknod(&path, libc::S_IFIFO | 0o644, 0).unwrap();
        assert!(std::os::unix::fs::FileTypeExt::is_fifo(
            &fs::symlink_metadata(&path).unwrap().file_type()
        ));
    }
}
