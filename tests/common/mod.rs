//! Shared fixtures for integration tests
//!
//! Builds a throwaway source directory of fake AppImages and a filesystem
//! serving it.

#![allow(dead_code)] // Utility functions may not be used by all tests

use std::fs;
use std::path::PathBuf;

use appimagelauncherfs::{LauncherFs, Registry};
use tempfile::TempDir;

/// A source directory plus the filesystem serving it
pub struct Fixture {
    pub dir: TempDir,
    pub paths: Vec<PathBuf>,
    pub fs: LauncherFs,
}

/// Deterministic content: byte `i` is `i % 251 + 1`, so no byte is zero
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251 + 1) as u8).collect()
}

/// Content shaped like a type 2 AppImage: ELF header with `AI\x02` at offset 8
pub fn fake_appimage(len: usize) -> Vec<u8> {
    let mut data = pattern(len);
    data[..4].copy_from_slice(b"\x7fELF");
    data[8..11].copy_from_slice(b"AI\x02");
    data
}

/// Write one file per entry of `contents` and register them in that order.
pub fn fixture(contents: &[Vec<u8>]) -> Fixture {
    let dir = TempDir::new().expect("create temp dir");

    let paths: Vec<PathBuf> = contents
        .iter()
        .enumerate()
        .map(|(i, data)| {
            let path = dir.path().join(format!("app-{}.AppImage", i));
            fs::write(&path, data).expect("write fixture file");
            path
        })
        .collect();

    let fs = LauncherFs::new(Registry::from_paths(paths.iter()));
    Fixture { dir, paths, fs }
}
