//! Shared store fixtures for integration tests

#![allow(dead_code)] // Not every test binary uses every helper

use std::fs;
use std::path::{Path, PathBuf};

use storefs::{StoreFs, StoreList};
use tempfile::TempDir;

/// A temporary directory holding `s1`, `s2`, ... store roots
pub struct TestStores {
    _tmp: TempDir,
    pub fs: StoreFs,
}

impl TestStores {
    /// Create one store per slice, each pre-populated with the named files.
    ///
    /// File content is `"<store>:<name>"` so tests can tell copies apart.
    pub fn new(layout: &[&[&str]]) -> Self {
        let tmp = TempDir::new().expect("tempdir");
        let mut roots = Vec::new();
        for (i, files) in layout.iter().enumerate() {
            let root = tmp.path().join(format!("s{}", i + 1));
            fs::create_dir(&root).expect("store dir");
            for name in *files {
                fs::write(root.join(name), format!("s{}:{}", i + 1, name)).expect("seed file");
            }
            roots.push(root);
        }
        let stores = StoreList::new(&roots).expect("store list");
        Self {
            _tmp: tmp,
            fs: StoreFs::new(stores),
        }
    }

    /// Canonical root of store `index` (0-based).
    pub fn root(&self, index: usize) -> PathBuf {
        self.fs.stores().root(index).expect("store index").to_path_buf()
    }

    pub fn physical(&self, index: usize, name: &str) -> PathBuf {
        self.root(index).join(name)
    }

    pub fn read_physical(&self, index: usize, name: &str) -> String {
        fs::read_to_string(self.physical(index, name)).expect("read physical")
    }

    pub fn exists_in(&self, index: usize, name: &str) -> bool {
        fs::symlink_metadata(self.physical(index, name)).is_ok()
    }
}

pub fn vpath(name: &str) -> &Path {
    Path::new(name)
}
