//! Mount configuration
//!
//! A configuration names the stores (in priority order), the mount point and
//! a few mount options. It can be read from a JSON file and then overridden
//! from the command line:
//!
//! ```json
//! {
//!   "stores": ["/data/store1", "/data/store2"],
//!   "mountpoint": "/mnt/union",
//!   "allow_other": false,
//!   "read_only": false,
//!   "ttl_secs": 1
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fs::stores::{StoreList, StoreListError};

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parsing config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no mount point given")]
    MissingMountpoint,

    #[error(transparent)]
    Stores(#[from] StoreListError),
}

fn default_fsname() -> String {
    "storefs".to_string()
}

fn default_ttl_secs() -> u64 {
    1
}

/// Everything needed to mount a store filesystem
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreFsConfig {
    /// Store roots; the first is the creation target
    #[serde(default)]
    pub stores: Vec<PathBuf>,

    #[serde(default)]
    pub mountpoint: Option<PathBuf>,

    #[serde(default)]
    pub allow_other: bool,

    #[serde(default)]
    pub read_only: bool,

    #[serde(default = "default_fsname")]
    pub fsname: String,

    /// Kernel attribute/entry cache lifetime in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for StoreFsConfig {
    fn default() -> Self {
        Self {
            stores: Vec::new(),
            mountpoint: None,
            allow_other: false,
            read_only: false,
            fsname: default_fsname(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl StoreFsConfig {
    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Command-line stores replace the file's list when any are given.
    pub fn with_stores(mut self, stores: Vec<PathBuf>) -> Self {
        if !stores.is_empty() {
            self.stores = stores;
        }
        self
    }

    pub fn with_mountpoint(mut self, mountpoint: Option<PathBuf>) -> Self {
        if mountpoint.is_some() {
            self.mountpoint = mountpoint;
        }
        self
    }

    /// Validate the store roots and build the immutable store list.
    pub fn store_list(&self) -> Result<StoreList, ConfigError> {
        Ok(StoreList::new(&self.stores)?)
    }

    pub fn mountpoint(&self) -> Result<&Path, ConfigError> {
        self.mountpoint
            .as_deref()
            .ok_or(ConfigError::MissingMountpoint)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_applies_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("storefs.json");
        fs::write(&path, r#"{"stores": ["/a", "/b"]}"#).unwrap();

        let cfg = StoreFsConfig::load(&path).unwrap();
        assert_eq!(cfg.stores, [PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(cfg.fsname, "storefs");
        assert_eq!(cfg.ttl(), Duration::from_secs(1));
        assert!(cfg.mountpoint.is_none());
        assert!(matches!(cfg.mountpoint(), Err(ConfigError::MissingMountpoint)));
    }

    #[test]
    fn test_cli_overrides() {
        let cfg = StoreFsConfig {
            stores: vec![PathBuf::from("/file")],
            mountpoint: Some(PathBuf::from("/mnt/file")),
            ..StoreFsConfig::default()
        };

        let kept = cfg.clone().with_stores(Vec::new()).with_mountpoint(None);
        assert_eq!(kept, cfg);

        let replaced = cfg
            .with_stores(vec![PathBuf::from("/cli")])
            .with_mountpoint(Some(PathBuf::from("/mnt/cli")));
        assert_eq!(replaced.stores, [PathBuf::from("/cli")]);
        assert_eq!(replaced.mountpoint().unwrap(), Path::new("/mnt/cli"));
    }

    #[test]
    fn test_parse_error_names_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();

        let err = StoreFsConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn test_store_list_validation() {
        let cfg = StoreFsConfig::default();
        assert!(matches!(
            cfg.store_list(),
            Err(ConfigError::Stores(StoreListError::Empty))
        ));

        let tmp = TempDir::new().unwrap();
        let cfg = StoreFsConfig::default().with_stores(vec![tmp.path().to_path_buf()]);
        assert_eq!(cfg.store_list().unwrap().len(), 1);
    }
}
