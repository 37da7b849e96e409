//! # appimagelauncherfs
//!
//! Read-only FUSE filesystem exposing the AppImages of one directory under
//! stable numeric names (`0000.AppImage`, `0001.AppImage`, ...) next to a
//! generated `map` file listing where each one came from.
//!
//! Bundle contents are served with bytes 8..=10 zeroed, hiding the AppImage
//! type magic so a launcher that intercepts AppImage executions does not
//! intercept the ones it starts itself through this mount.

pub mod fs;
pub use fs::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_loads() {
        let fs = LauncherFs::new(Registry::new());
        assert!(fs.registry().is_empty());
        assert_eq!(fs.readdir("/").unwrap().len(), 3);
    }
}
