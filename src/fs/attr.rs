//! Attribute synthesis
//!
//! All metadata the mount reports comes out of [`AttributeProvider::attributes`],
//! which owns the read-only permission policy:
//!
//! | Path            | Kind      | Mode  | Source of the remaining fields |
//! |-----------------|-----------|-------|--------------------------------|
//! | `/`             | directory | 0550  | process start time, own uid/gid |
//! | `/map`          | file      | 0444  | start time, size of fresh map text |
//! | `/NNNN.AppImage`| file      | 0555  | host metadata of the original |

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::error::{LauncherFsError, LauncherResult};
use super::listing::map_text;
use super::path::{Ino, VirtualPath};
use super::registry::Registry;

/// Mode of the root directory: read and traverse for owner and group
pub const ROOT_PERM: u16 = 0o550;

/// Mode of the generated map file
pub const MAP_PERM: u16 = 0o444;

/// Mode forced onto every exposed bundle, whatever the original allows
pub const BUNDLE_PERM: u16 = 0o555;

/// File attributes for FUSE
///
/// This mirrors fuser::FileAttr but is always available regardless
/// of feature flags, allowing the core filesystem logic to work
/// without the fuser crate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileAttr {
    /// Inode number
    pub ino: Ino,
    /// File size in bytes
    pub size: u64,
    /// Number of 512-byte blocks allocated
    pub blocks: u64,
    /// Last access time
    pub atime: SystemTime,
    /// Last modification time
    pub mtime: SystemTime,
    /// Last status change time
    pub ctime: SystemTime,
    /// Creation time (macOS only)
    pub crtime: SystemTime,
    /// File type
    pub kind: FileKind,
    /// Permissions (mode & 0o7777)
    pub perm: u16,
    /// Hard link count
    pub nlink: u32,
    /// User ID of owner
    pub uid: u32,
    /// Group ID of owner
    pub gid: u32,
    /// Device ID (for special files)
    pub rdev: u32,
    /// Block size for filesystem I/O
    pub blksize: u32,
    /// Flags (macOS only)
    pub flags: u32,
}

#[cfg(feature = "fuse")]
impl From<FileAttr> for fuser::FileAttr {
    fn from(attr: FileAttr) -> Self {
        fuser::FileAttr {
            ino: attr.ino,
            size: attr.size,
            blocks: attr.blocks,
            atime: attr.atime,
            mtime: attr.mtime,
            ctime: attr.ctime,
            crtime: attr.crtime,
            kind: attr.kind.into(),
            perm: attr.perm,
            nlink: attr.nlink,
            uid: attr.uid,
            gid: attr.gid,
            rdev: attr.rdev,
            blksize: attr.blksize,
            flags: attr.flags,
        }
    }
}

/// File type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    /// Directory
    Directory,
    /// Regular file
    RegularFile,
}

#[cfg(feature = "fuse")]
impl From<FileKind> for fuser::FileType {
    fn from(kind: FileKind) -> Self {
        match kind {
            FileKind::Directory => fuser::FileType::Directory,
            FileKind::RegularFile => fuser::FileType::RegularFile,
        }
    }
}

/// Builds metadata for classified paths.
///
/// Synthetic entries share the timestamp and ownership captured when the
/// provider was created.
#[derive(Clone, Debug)]
pub struct AttributeProvider {
    start_time: SystemTime,
    uid: u32,
    gid: u32,
}

impl AttributeProvider {
    /// Capture the current time and the calling process's uid/gid.
    pub fn new() -> Self {
        // whole seconds, matching what time(2) based tools display
        let start_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| UNIX_EPOCH + Duration::from_secs(d.as_secs()))
            .unwrap_or(UNIX_EPOCH);

        Self::with_owner(start_time, unsafe { libc::getuid() }, unsafe {
            libc::getgid()
        })
    }

    /// Provider with explicit timestamp and ownership
    pub fn with_owner(start_time: SystemTime, uid: u32, gid: u32) -> Self {
        Self {
            start_time,
            uid,
            gid,
        }
    }

    pub fn start_time(&self) -> SystemTime {
        self.start_time
    }

    /// Metadata for `vpath`, or `NotFound` if it does not exist.
    pub fn attributes(&self, vpath: VirtualPath, registry: &Registry) -> LauncherResult<FileAttr> {
        let ino = vpath
            .ino()
            .ok_or_else(|| LauncherFsError::NotFound(vpath.to_string()))?;

        match vpath {
            VirtualPath::Root => Ok(self.synthetic(ino, FileKind::Directory, ROOT_PERM, 0)),
            VirtualPath::MapFile => {
                let size = map_text(registry).len() as u64;
                Ok(self.synthetic(ino, FileKind::RegularFile, MAP_PERM, size))
            }
            VirtualPath::BundleEntry(id) => {
                let original = registry
                    .lookup(id)
                    .ok_or_else(|| LauncherFsError::NotFound(vpath.to_string()))?;

                // Follows symlinks; anything but a regular file is hidden
                let meta = fs::metadata(original)
                    .ok()
                    .filter(|m| m.is_file())
                    .ok_or_else(|| LauncherFsError::NotFound(vpath.to_string()))?;

                Ok(host_attr(ino, &meta))
            }
            VirtualPath::Invalid => Err(LauncherFsError::NotFound(vpath.to_string())),
        }
    }

    fn synthetic(&self, ino: Ino, kind: FileKind, perm: u16, size: u64) -> FileAttr {
        FileAttr {
            ino,
            size,
            blocks: size.div_ceil(512),
            atime: self.start_time,
            mtime: self.start_time,
            ctime: self.start_time,
            crtime: self.start_time,
            kind,
            perm,
            nlink: if kind == FileKind::Directory { 2 } else { 1 },
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: 4096,
            flags: 0,
        }
    }
}

impl Default for AttributeProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Host metadata of an original bundle with its mode replaced by [`BUNDLE_PERM`].
fn host_attr(ino: Ino, meta: &fs::Metadata) -> FileAttr {
    let mtime = meta.modified().unwrap_or(UNIX_EPOCH);

    FileAttr {
        ino,
        size: meta.len(),
        blocks: meta.blocks(),
        atime: meta.accessed().unwrap_or(mtime),
        mtime,
        ctime: unix_time(meta.ctime(), meta.ctime_nsec()),
        crtime: meta.created().unwrap_or(UNIX_EPOCH),
        kind: FileKind::RegularFile,
        perm: BUNDLE_PERM,
        nlink: meta.nlink() as u32,
        uid: meta.uid(),
        gid: meta.gid(),
        rdev: meta.rdev() as u32,
        blksize: meta.blksize() as u32,
        flags: 0,
    }
}

fn unix_time(secs: i64, nsecs: i64) -> SystemTime {
    if secs >= 0 {
        UNIX_EPOCH + Duration::new(secs as u64, nsecs as u32)
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn provider() -> AttributeProvider {
        AttributeProvider::with_owner(UNIX_EPOCH + Duration::from_secs(1_700_000_000), 1000, 100)
    }

    #[test]
    fn test_root_attributes() {
        let attr = provider()
            .attributes(VirtualPath::Root, &Registry::new())
            .unwrap();

        assert_eq!(attr.kind, FileKind::Directory);
        assert_eq!(attr.perm, 0o550);
        assert_eq!(attr.nlink, 2);
        assert_eq!(attr.uid, 1000);
        assert_eq!(attr.gid, 100);
        assert_eq!(attr.mtime, UNIX_EPOCH + Duration::from_secs(1_700_000_000));
    }

    #[test]
    fn test_map_size_tracks_registry() {
        let registry = Registry::from_paths(["/apps/a.AppImage"]);
        let attr = provider().attributes(VirtualPath::MapFile, &registry).unwrap();

        assert_eq!(attr.kind, FileKind::RegularFile);
        assert_eq!(attr.perm, 0o444);
        assert_eq!(attr.size, map_text(&registry).len() as u64);
        assert_eq!(attr.size, "0000.AppImage -> /apps/a.AppImage\n".len() as u64);
    }

    #[test]
    fn test_bundle_permissions_overridden() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("tool.AppImage");
        fs::write(&file, vec![7u8; 2048]).unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o600)).unwrap();

        let registry = Registry::from_paths([&file]);
        let attr = provider()
            .attributes(VirtualPath::BundleEntry(0), &registry)
            .unwrap();

        assert_eq!(attr.kind, FileKind::RegularFile);
        assert_eq!(attr.perm, 0o555);
        assert_eq!(attr.size, 2048);
        assert_eq!(attr.mtime, fs::metadata(&file).unwrap().modified().unwrap());
    }

    #[test]
    fn test_bundle_vanished() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("gone.AppImage");
        fs::write(&file, b"x").unwrap();
        let registry = Registry::from_paths([&file]);
        fs::remove_file(&file).unwrap();

        let err = provider()
            .attributes(VirtualPath::BundleEntry(0), &registry)
            .unwrap_err();
        assert!(matches!(err, LauncherFsError::NotFound(_)));
    }

    #[test]
    fn test_bundle_replaced_by_directory() {
        let dir = TempDir::new().unwrap();
        let registry = Registry::from_paths([dir.path()]);

        assert!(provider()
            .attributes(VirtualPath::BundleEntry(0), &registry)
            .is_err());
    }

    #[test]
    fn test_invalid_not_found() {
        let err = provider()
            .attributes(VirtualPath::Invalid, &Registry::new())
            .unwrap_err();
        assert!(matches!(err, LauncherFsError::NotFound(_)));
    }
}
