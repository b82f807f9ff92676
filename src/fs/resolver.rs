//! Virtual path to physical path resolution
//!
//! The virtual namespace is flat: only the final component of a requested
//! path is significant. Resolution checks each store in configured order and
//! the first store holding the basename wins. Same-named files in later
//! stores are shadowed and never reached by name.
//!
//! An empty basename (the mount root, or a path with a trailing slash)
//! designates the store root itself, so the mount root resolves to the first
//! store.

use std::ffi::OsStr;
use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use super::error::{StoreFsError, StoreResult};
use super::stores::StoreList;

/// Final component of a virtual path: everything after the last `/`.
///
/// Unlike [`Path::file_name`], `..` and `.` are returned as-is and a trailing
/// slash yields an empty name.
pub fn basename(path: &Path) -> &OsStr {
    let bytes = path.as_os_str().as_bytes();
    match bytes.iter().rposition(|&b| b == b'/') {
        Some(pos) => OsStr::from_bytes(&bytes[pos + 1..]),
        None => path.as_os_str(),
    }
}

/// A physical location chosen for a virtual path
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    /// Index of the store in the store list
    pub store: usize,
    /// Store root joined with the basename
    pub path: PathBuf,
}

/// First-match-wins search over a [`StoreList`]
#[derive(Clone, Debug)]
pub struct PathResolver {
    stores: StoreList,
}

impl PathResolver {
    pub fn new(stores: StoreList) -> Self {
        Self { stores }
    }

    pub fn stores(&self) -> &StoreList {
        &self.stores
    }

    /// Find the earliest store holding the basename of `path`.
    ///
    /// The existence check does not follow symlinks, so a dangling link still resolves.
    /// Fails with `NotFound` when no store holds the name.
    pub fn resolve(&self, path: &Path) -> StoreResult<Resolved> {
        let name = basename(path);
        for (store, root) in self.stores.iter().enumerate() {
            let candidate = join_name(root, name);
            if fs::symlink_metadata(&candidate).is_ok() {
                tracing::trace!(?name, store, path = %candidate.display(), "resolved");
                return Ok(Resolved {
                    store,
                    path: candidate,
                });
            }
        }
        tracing::trace!(?name, "not present in any store");
        Err(StoreFsError::NotFound {
            name: name.to_os_string(),
        })
    }

    /// Physical location for `path` inside a specific store, without probing.
    ///
    /// Out-of-range indices fall back to the creation target.
    pub fn place(&self, path: &Path, store: usize) -> Resolved {
        let (store, root) = match self.stores.root(store) {
            Some(root) => (store, root),
            None => (0, self.stores.creation_target()),
        };
        Resolved {
            store,
            path: join_name(root, basename(path)),
        }
    }

    /// Location for a new node: always the creation target.
    pub fn place_new(&self, path: &Path) -> Resolved {
        self.place(path, 0)
    }

    /// Resolve `path` if it exists anywhere, else place it in `fallback_store`.
    pub fn resolve_or_place(&self, path: &Path, fallback_store: usize) -> StoreResult<Resolved> {
        match self.resolve(path) {
            Ok(found) => Ok(found),
            Err(StoreFsError::NotFound { .. }) => Ok(self.place(path, fallback_store)),
            Err(e) => Err(e),
        }
    }
}

fn join_name(root: &Path, name: &OsStr) -> PathBuf {
    if name.is_empty() {
        root.to_path_buf()
    } else {
        root.join(name)
    }
}
