//! Fetch sources
//!
//! Asynchronous retrieval of model text. Failures carry an HTTP-style status
//! so callers can surface them the same way regardless of where the bytes
//! come from.

use std::future::Future;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::{AssetError, AssetResult};

/// Asynchronous source of model text
pub trait Fetcher {
    /// Fetch the full text behind `path`
    fn fetch(&self, path: &str) -> impl Future<Output = AssetResult<String>>;
}

/// Reads files from the local file system, optionally below a root directory
#[derive(Debug, Clone, Default)]
pub struct FileFetcher {
    root: Option<PathBuf>,
}

impl FileFetcher {
    /// Fetcher resolving paths as given
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Fetcher resolving relative paths below `root`
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        Self {
            root: Some(root.as_ref().to_path_buf()),
        }
    }

    /// Resolve a request path to a file path
    pub fn resolve(&self, path: &str) -> PathBuf {
        let requested = Path::new(path.trim_start_matches("file://"));
        match &self.root {
            Some(root) if requested.is_relative() => root.join(requested),
            _ => requested.to_path_buf(),
        }
    }
}

impl Fetcher for FileFetcher {
    fn fetch(&self, path: &str) -> impl Future<Output = AssetResult<String>> {
        let resolved = self.resolve(path);
        let path = path.to_string();

        async move {
            log::debug!("Reading {}", resolved.display());
            match tokio::fs::read(&resolved).await {
                // Legacy files are occasionally Latin-1; keep going on bad bytes
                Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
                Err(error) => Err(AssetError::from_io(path, error)),
            }
        }
    }
}

#[derive(Debug, Clone)]
enum MemoryEntry {
    Document(String),
    Status(u16),
}

/// Serves documents registered in memory; unknown paths answer 404
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    entries: RwLock<AHashMap<String, MemoryEntry>>,
}

impl MemoryFetcher {
    /// Create an empty fetcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document
    pub fn insert(&self, path: impl Into<String>, text: impl Into<String>) {
        self.entries
            .write()
            .insert(path.into(), MemoryEntry::Document(text.into()));
    }

    /// Make `path` fail with the given status
    pub fn fail_with(&self, path: impl Into<String>, status: u16) {
        self.entries.write().insert(path.into(), MemoryEntry::Status(status));
    }

    /// Remove a registered path
    pub fn remove(&self, path: &str) {
        self.entries.write().remove(path);
    }

    /// Number of registered paths
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch(&self, path: &str) -> impl Future<Output = AssetResult<String>> {
        let entry = self.entries.read().get(path).cloned();
        let path = path.to_string();

        async move {
            match entry {
                Some(MemoryEntry::Document(text)) => Ok(text),
                Some(MemoryEntry::Status(status)) => Err(AssetError::Fetch { status, path }),
                None => Err(AssetError::Fetch { status: 404, path }),
            }
        }
    }
}
