//! Registry of exposed AppImages
//!
//! Each regular file of the source directory is assigned a numeric id in
//! discovery order. The registry is built once before serving starts and is
//! never mutated afterwards, so lookups need no locking.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::{LauncherFsError, LauncherResult};

/// Suffix appended to every canonical filename
pub const BUNDLE_SUFFIX: &str = ".AppImage";

/// Render the only filename a given id is exposed under, e.g. `0007.AppImage`.
#[inline]
pub fn canonical_filename(id: u64) -> String {
    format!("{:04}{}", id, BUNDLE_SUFFIX)
}

/// A single registered bundle
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryEntry {
    /// Numeric id, unique for the process lifetime
    pub id: u64,
    /// Absolute path of the original file
    pub original_path: PathBuf,
}

/// Immutable id -> original path mapping
#[derive(Clone, Debug, Default)]
pub struct Registry {
    entries: BTreeMap<u64, PathBuf>,
    next_id: u64,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from explicit paths, assigning ids in iteration order.
    ///
    /// No filtering is applied; callers are responsible for passing files.
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut registry = Self::new();
        for path in paths {
            registry.register(path.into());
        }
        registry
    }

    /// Scan `dir` (non-recursively) and register every regular file.
    ///
    /// Symlinks are followed. Ids follow the order the host returns entries in,
    /// which is not sorted.
    pub fn scan(dir: &Path) -> LauncherResult<Self> {
        let source_err = |source| LauncherFsError::SourceDir {
            path: dir.to_path_buf(),
            source,
        };

        let mut registry = Self::new();
        for entry in fs::read_dir(dir).map_err(source_err)? {
            let path = entry.map_err(source_err)?.path();

            if !path.is_file() {
                debug!(path = %path.display(), "skipping non-regular entry");
                continue;
            }

            let id = registry.register(path);
            debug!(id, name = %canonical_filename(id), "registered bundle");
        }

        Ok(registry)
    }

    fn register(&mut self, path: PathBuf) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, path);
        id
    }

    /// Original path for `id`
    pub fn lookup(&self, id: u64) -> Option<&Path> {
        self.entries.get(&id).map(PathBuf::as_path)
    }

    /// Whether `id` is registered
    pub fn contains(&self, id: u64) -> bool {
        self.entries.contains_key(&id)
    }

    /// All entries in ascending id order
    pub fn entries(&self) -> impl Iterator<Item = (u64, &Path)> + '_ {
        self.entries.iter().map(|(id, path)| (*id, path.as_path()))
    }

    /// Owned snapshot of all entries in ascending id order
    pub fn to_entries(&self) -> Vec<RegistryEntry> {
        self.entries()
            .map(|(id, path)| RegistryEntry {
                id,
                original_path: path.to_path_buf(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_canonical_filename() {
        assert_eq!(canonical_filename(0), "0000.AppImage");
        assert_eq!(canonical_filename(7), "0007.AppImage");
        assert_eq!(canonical_filename(1234), "1234.AppImage");
        assert_eq!(canonical_filename(12345), "12345.AppImage");
    }

    #[test]
    fn test_from_paths_assigns_sequential_ids() {
        let registry = Registry::from_paths(["/a.AppImage", "/b.AppImage", "/c.AppImage"]);

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.lookup(0), Some(Path::new("/a.AppImage")));
        assert_eq!(registry.lookup(2), Some(Path::new("/c.AppImage")));
        assert_eq!(registry.lookup(3), None);

        let ids: Vec<u64> = registry.entries().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_scan_skips_directories() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("one.AppImage"), b"1").unwrap();
        fs::write(dir.path().join("notes.txt"), b"lenient").unwrap();
        fs::create_dir(dir.path().join("subdir")).unwrap();
        fs::write(dir.path().join("subdir").join("nested.AppImage"), b"n").unwrap();

        let registry = Registry::scan(dir.path()).unwrap();

        // Any regular file is accepted, nested files are not visited
        assert_eq!(registry.len(), 2);
        let names: Vec<String> = registry
            .entries()
            .map(|(_, p)| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names.contains(&"one.AppImage".to_string()));
        assert!(names.contains(&"notes.txt".to_string()));
    }

    #[test]
    fn test_scan_missing_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");

        let err = Registry::scan(&missing).unwrap_err();
        assert!(matches!(err, LauncherFsError::SourceDir { .. }));
    }

    #[test]
    fn test_empty_registry() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.entries().count(), 0);
    }
}
