//! Root directory listing and the generated `/map` text

use super::attr::FileKind;
use super::path::{Ino, VirtualPath, MAP_INO, MAP_NAME, ROOT_INO};
use super::registry::{canonical_filename, Registry};

/// Directory entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    /// Inode number
    pub ino: Ino,
    /// Entry name
    pub name: String,
    /// Entry type
    pub kind: FileKind,
}

impl DirEntry {
    fn new(ino: Ino, name: impl Into<String>, kind: FileKind) -> Self {
        Self {
            ino,
            name: name.into(),
            kind,
        }
    }
}

/// Entries of the root directory: `.`, `..`, `map`, then one canonical name per
/// registered bundle in ascending id order.
///
/// The mount root has no visible parent, so `..` points back at the root.
pub fn root_entries(registry: &Registry) -> Vec<DirEntry> {
    let mut entries = Vec::with_capacity(3 + registry.len());
    entries.push(DirEntry::new(ROOT_INO, ".", FileKind::Directory));
    entries.push(DirEntry::new(ROOT_INO, "..", FileKind::Directory));
    entries.push(DirEntry::new(MAP_INO, MAP_NAME, FileKind::RegularFile));

    entries.extend(registry.entries().filter_map(|(id, _)| {
        let ino = VirtualPath::BundleEntry(id).ino()?;
        Some(DirEntry::new(ino, canonical_filename(id), FileKind::RegularFile))
    }));

    entries
}

/// Render the id -> original path map, one `"<canonical> -> <path>\n"` line per
/// entry in ascending id order.
pub fn map_text(registry: &Registry) -> String {
    let mut text = String::new();
    for (id, path) in registry.entries() {
        text.push_str(&canonical_filename(id));
        text.push_str(" -> ");
        text.push_str(&path.to_string_lossy());
        text.push('\n');
    }
    text
}
