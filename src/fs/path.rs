//! Virtual path classification
//!
//! Every operation starts by turning the incoming path into a [`VirtualPath`].
//! Bundle names are validated by regenerating the canonical filename for the
//! parsed id and requiring an exact match, so `/7.AppImage`, `/00007.AppImage`
//! or `/0007.AppImage/x` never alias `/0007.AppImage`.

use std::fmt;

use super::error::{LauncherFsError, LauncherResult};
use super::registry::{canonical_filename, Registry};

/// Inode number type (matches fuser's u64 inode convention)
pub type Ino = u64;

/// Root inode number (FUSE convention: inode 1 is root)
pub const ROOT_INO: Ino = 1;

/// Inode of the generated `/map` file
pub const MAP_INO: Ino = 2;

/// Bundle id `n` is served under inode `n + BUNDLE_INO_BASE`
pub const BUNDLE_INO_BASE: Ino = 3;

/// Name of the generated map file inside the root directory
pub const MAP_NAME: &str = "map";

/// Classification of a path inside the mount
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VirtualPath {
    Root,
    MapFile,
    BundleEntry(u64),
    Invalid,
}

impl VirtualPath {
    /// Classify `path`, folding every failure into [`VirtualPath::Invalid`].
    pub fn parse(path: &str, registry: &Registry) -> Self {
        Self::resolve(path, registry).unwrap_or(VirtualPath::Invalid)
    }

    /// Classify `path`, keeping the reason a path was rejected.
    ///
    /// Malformed names yield `InvalidPath`; canonical names whose id is not
    /// registered yield `NotFound`.
    pub fn resolve(path: &str, registry: &Registry) -> LauncherResult<Self> {
        match path {
            "/" => return Ok(VirtualPath::Root),
            "/map" => return Ok(VirtualPath::MapFile),
            _ => {}
        }

        let id = parse_bundle_name(path)
            .ok_or_else(|| LauncherFsError::InvalidPath(path.to_string()))?;

        if registry.contains(id) {
            Ok(VirtualPath::BundleEntry(id))
        } else {
            Err(LauncherFsError::NotFound(path.to_string()))
        }
    }

    /// Classify an inode number handed out by [`VirtualPath::ino`].
    pub fn from_ino(ino: Ino, registry: &Registry) -> Self {
        match ino {
            ROOT_INO => VirtualPath::Root,
            MAP_INO => VirtualPath::MapFile,
            ino if ino >= BUNDLE_INO_BASE && registry.contains(ino - BUNDLE_INO_BASE) => {
                VirtualPath::BundleEntry(ino - BUNDLE_INO_BASE)
            }
            _ => VirtualPath::Invalid,
        }
    }

    /// Inode number for this path, `None` for [`VirtualPath::Invalid`]
    pub fn ino(&self) -> Option<Ino> {
        match self {
            VirtualPath::Root => Some(ROOT_INO),
            VirtualPath::MapFile => Some(MAP_INO),
            VirtualPath::BundleEntry(id) => id.checked_add(BUNDLE_INO_BASE),
            VirtualPath::Invalid => None,
        }
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VirtualPath::Root => write!(f, "/"),
            VirtualPath::MapFile => write!(f, "/{}", MAP_NAME),
            VirtualPath::BundleEntry(id) => write!(f, "/{}", canonical_filename(*id)),
            VirtualPath::Invalid => write!(f, "<invalid>"),
        }
    }
}

/// Extract the id from `/<canonical filename>`, or `None` if `path` is not
/// exactly the canonical rendering of some id.
fn parse_bundle_name(path: &str) -> Option<u64> {
    let name = path.strip_prefix('/')?;
    let prefix = name.split('.').next()?;

    // u64::from_str tolerates a leading '+', the exact match below rejects it
    let id: u64 = prefix.parse().ok()?;

    (name == canonical_filename(id)).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry::from_paths((0..12).map(|i| format!("/apps/{}.AppImage", i)))
    }

    #[test]
    fn test_fixed_paths() {
        let reg = registry();
        assert_eq!(VirtualPath::parse("/", &reg), VirtualPath::Root);
        assert_eq!(VirtualPath::parse("/map", &reg), VirtualPath::MapFile);
    }

    #[test]
    fn test_canonical_round_trip() {
        let reg = registry();
        for (id, _) in reg.entries() {
            let path = format!("/{}", canonical_filename(id));
            assert_eq!(VirtualPath::parse(&path, &reg), VirtualPath::BundleEntry(id));
        }
    }

    #[test]
    fn test_non_canonical_spellings_rejected() {
        let reg = registry();
        for path in [
            "/7.AppImage",
            "/00007.AppImage",
            "/0007.appimage",
            "/0007.AppImage/x",
            "/0007.AppImage.bak",
            "/+007.AppImage",
            "/ 007.AppImage",
            "/.AppImage",
            "/0007",
            "0007.AppImage",
            "//0007.AppImage",
            "/map/",
            "/map.txt",
            "",
        ] {
            assert_eq!(
                VirtualPath::parse(path, &reg),
                VirtualPath::Invalid,
                "{:?} should not resolve",
                path
            );
        }
    }

    #[test]
    fn test_resolve_distinguishes_invalid_from_missing() {
        let reg = registry();

        assert!(matches!(
            VirtualPath::resolve("/7.AppImage", &reg),
            Err(LauncherFsError::InvalidPath(_))
        ));
        assert!(matches!(
            VirtualPath::resolve("/0099.AppImage", &reg),
            Err(LauncherFsError::NotFound(_))
        ));
    }

    #[test]
    fn test_wide_ids_accepted() {
        let reg = Registry::from_paths((0..10_001).map(|i| format!("/apps/{}", i)));
        assert_eq!(
            VirtualPath::parse("/10000.AppImage", &reg),
            VirtualPath::BundleEntry(10_000)
        );
        assert_eq!(VirtualPath::parse("/010000.AppImage", &reg), VirtualPath::Invalid);
    }

    #[test]
    fn test_inode_mapping() {
        let reg = registry();

        for vpath in [
            VirtualPath::Root,
            VirtualPath::MapFile,
            VirtualPath::BundleEntry(0),
            VirtualPath::BundleEntry(11),
        ] {
            let ino = vpath.ino().unwrap();
            assert_eq!(VirtualPath::from_ino(ino, &reg), vpath);
        }

        assert_eq!(VirtualPath::Invalid.ino(), None);
        assert_eq!(VirtualPath::from_ino(0, &reg), VirtualPath::Invalid);
        assert_eq!(
            VirtualPath::from_ino(12 + BUNDLE_INO_BASE, &reg),
            VirtualPath::Invalid
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(VirtualPath::Root.to_string(), "/");
        assert_eq!(VirtualPath::MapFile.to_string(), "/map");
        assert_eq!(VirtualPath::BundleEntry(3).to_string(), "/0003.AppImage");
    }
}
