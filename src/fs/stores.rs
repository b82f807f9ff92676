//! The ordered list of physical store directories
//!
//! A [`StoreList`] is built once before the filesystem serves its first call
//! and is read-only afterwards. Order is significant: it is the search
//! priority for resolution, the concatenation order for listings, and store 0
//! is the creation target for new files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

/// Errors raised while validating store roots
#[derive(Debug, Error)]
pub enum StoreListError {
    /// No store roots were supplied
    #[error("at least one store directory is required")]
    Empty,

    /// A store root could not be inspected
    #[error("store {}: {source}", path.display())]
    Inaccessible {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A store root exists but is not a directory
    #[error("store {} is not a directory", path.display())]
    NotADirectory { path: PathBuf },
}

/// Immutable, non-empty, ordered sequence of canonical store roots
///
/// Cloning is cheap: clones share the same backing slice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreList {
    roots: Arc<[PathBuf]>,
}

impl StoreList {
    /// Validate and canonicalize the given roots, preserving their order.
    pub fn new<I, P>(roots: I) -> Result<Self, StoreListError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut canonical = Vec::new();
        for root in roots {
            let root = root.as_ref();
            let resolved = fs::canonicalize(root).map_err(|source| StoreListError::Inaccessible {
                path: root.to_path_buf(),
                source,
            })?;
            let meta = fs::metadata(&resolved).map_err(|source| StoreListError::Inaccessible {
                path: root.to_path_buf(),
                source,
            })?;
            if !meta.is_dir() {
                return Err(StoreListError::NotADirectory {
                    path: root.to_path_buf(),
                });
            }
            canonical.push(resolved);
        }

        if canonical.is_empty() {
            return Err(StoreListError::Empty);
        }

        Ok(Self {
            roots: canonical.into(),
        })
    }

    /// Store that receives every newly created node.
    pub fn creation_target(&self) -> &Path {
        &self.roots[0]
    }

    /// Root of the store at `index`, if there is one.
    pub fn root(&self, index: usize) -> Option<&Path> {
        self.roots.get(index).map(PathBuf::as_path)
    }

    /// Store roots in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &Path> + '_ {
        self.roots.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// A store list holds at least one root, so this is false.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}
