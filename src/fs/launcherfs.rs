//! The filesystem service behind the mount
//!
//! [`LauncherFs`] owns the registry and answers the three operations the
//! driver adapter needs, all keyed by virtual path. It holds no mutable state,
//! so a single instance can be shared across threads as-is.

use std::path::Path;

use tracing::debug;

use super::attr::{AttributeProvider, FileAttr};
use super::content::read_content;
use super::error::{LauncherFsError, LauncherResult};
use super::listing::{map_text, root_entries, DirEntry};
use super::path::{Ino, VirtualPath};
use super::registry::Registry;

/// Read-only view of a registry of AppImages
#[derive(Clone, Debug)]
pub struct LauncherFs {
    registry: Registry,
    attrs: AttributeProvider,
}

impl LauncherFs {
    /// Serve `registry`, stamping synthetic entries with the current time.
    pub fn new(registry: Registry) -> Self {
        Self::with_attributes(registry, AttributeProvider::new())
    }

    pub fn with_attributes(registry: Registry, attrs: AttributeProvider) -> Self {
        Self { registry, attrs }
    }

    /// Register every regular file in `source_dir` and serve the result.
    pub fn from_source_dir(source_dir: &Path) -> LauncherResult<Self> {
        let registry = Registry::scan(source_dir)?;
        debug!(
            source = %source_dir.display(),
            entries = registry.len(),
            "registry populated"
        );
        Ok(Self::new(registry))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Classify a virtual path
    pub fn classify(&self, path: &str) -> VirtualPath {
        VirtualPath::parse(path, &self.registry)
    }

    /// Classify an inode number
    pub fn classify_ino(&self, ino: Ino) -> VirtualPath {
        VirtualPath::from_ino(ino, &self.registry)
    }

    /// Metadata for `path`
    pub fn getattr(&self, path: &str) -> LauncherResult<FileAttr> {
        self.attributes(self.classify(path))
    }

    pub fn attributes(&self, vpath: VirtualPath) -> LauncherResult<FileAttr> {
        let result = self.attrs.attributes(vpath, &self.registry);
        debug!(path = %vpath, ok = result.is_ok(), "getattr");
        result
    }

    /// Entries of `path`; only the root is a directory
    pub fn readdir(&self, path: &str) -> LauncherResult<Vec<DirEntry>> {
        self.entries(self.classify(path))
    }

    pub fn entries(&self, vpath: VirtualPath) -> LauncherResult<Vec<DirEntry>> {
        debug!(path = %vpath, "readdir");
        match vpath {
            VirtualPath::Root => Ok(root_entries(&self.registry)),
            VirtualPath::MapFile | VirtualPath::BundleEntry(_) => {
                Err(LauncherFsError::NotDirectory(vpath.to_string()))
            }
            VirtualPath::Invalid => Err(LauncherFsError::NotFound(vpath.to_string())),
        }
    }

    /// Up to `size` bytes of `path` starting at `offset`
    pub fn read(&self, path: &str, offset: u64, size: u64) -> LauncherResult<Vec<u8>> {
        self.read_vpath(self.classify(path), offset, size)
    }

    pub fn read_vpath(&self, vpath: VirtualPath, offset: u64, size: u64) -> LauncherResult<Vec<u8>> {
        let result = read_content(vpath, &self.registry, offset, size);
        debug!(
            path = %vpath,
            offset,
            size,
            delivered = result.as_ref().map(Vec::len).unwrap_or(0),
            "read"
        );
        result
    }

    /// The text currently served as `/map`
    pub fn map_text(&self) -> String {
        map_text(&self.registry)
    }
}
