//! Directory listing across all stores
//!
//! A listing is the concatenation, in store order, of every store's entries.
//! Names shared by several stores appear once per store. Stores are read one
//! at a time as the iterator reaches them, and within a store names are
//! ordered bytewise so that an offset into the listing means the same thing
//! on every call.
//!
//! The first store that fails to enumerate ends the listing: the failure is
//! yielded and later stores are not read.

use std::ffi::OsString;
use std::fs;
use std::vec;

use super::attr::FileKind;
use super::error::StoreResult;
use super::stores::StoreList;

/// One name yielded by a store listing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListedEntry {
    /// Index of the store the entry came from
    pub store: usize,
    pub name: OsString,
    pub kind: FileKind,
}

/// Lazy concatenation of store listings
///
/// Cloning an iterator gives an independent cursor at the same position; a
/// fresh listing is obtained with [`StoreEntries::new`].
#[derive(Clone, Debug)]
pub struct StoreEntries {
    stores: StoreList,
    next_store: usize,
    current: Option<vec::IntoIter<ListedEntry>>,
    done: bool,
}

impl StoreEntries {
    pub fn new(stores: StoreList) -> Self {
        Self {
            stores,
            next_store: 0,
            current: None,
            done: false,
        }
    }

    /// Just the names, failures included.
    pub fn names(self) -> impl Iterator<Item = StoreResult<OsString>> {
        self.map(|entry| entry.map(|e| e.name))
    }

    fn read_store(&self, store: usize) -> StoreResult<Vec<ListedEntry>> {
        let Some(root) = self.stores.root(store) else {
            return Ok(Vec::new());
        };
        let mut entries = Vec::new();
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            let kind = entry.file_type()?.into();
            entries.push(ListedEntry {
                store,
                name: entry.file_name(),
                kind,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

impl Iterator for StoreEntries {
    type Item = StoreResult<ListedEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            if let Some(entry) = self.current.as_mut().and_then(Iterator::next) {
                return Some(Ok(entry));
            }
            if self.next_store >= self.stores.len() {
                self.done = true;
                return None;
            }

            let store = self.next_store;
            self.next_store += 1;
            match self.read_store(store) {
                Ok(entries) => self.current = Some(entries.into_iter()),
                Err(e) => {
                    tracing::warn!(store, error = %e, "listing store failed");
                    self.done = true;
                    self.current = None;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl std::iter::FusedIterator for StoreEntries {}
