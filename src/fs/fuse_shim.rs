//! FUSE shim for the launcher filesystem
//!
//! Translates inode-based `fuser` requests into the path-keyed operations of
//! [`LauncherFs`].
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │            Launcher / file manager / shell                     │
//! │                 (stat, readdir, read, exec)                    │
//! └────────────────────────────────────────────────────────────────┘
//!                                  │ FUSE protocol
//!                                  ▼
//! ┌────────────────────────────────────────────────────────────────┐
//! │                   LauncherFuse (this module)                   │
//! │        ino <-> VirtualPath, errno mapping, reply plumbing       │
//! └────────────────────────────────────────────────────────────────┘
//!                                  │
//!                                  ▼
//! ┌────────────────────────────────────────────────────────────────┐
//! │                         LauncherFs                             │
//! │   Registry │ attributes │ root listing │ map │ redacted reads  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Inode numbers are derived, not allocated: root is 1, `/map` is 2 and bundle
//! `n` is `n + 3`, so no table has to be kept in sync with the registry.

use std::time::Duration;

use crate::fs::launcherfs::LauncherFs;

#[cfg(feature = "fuse")]
use std::ffi::OsStr;

#[cfg(feature = "fuse")]
use std::path::Path;

#[cfg(feature = "fuse")]
use tracing::{debug, info};

#[cfg(feature = "fuse")]
use crate::fs::config::FS_NAME;
#[cfg(feature = "fuse")]
use crate::fs::path::VirtualPath;

/// The `fuser` adapter around a [`LauncherFs`]
pub struct LauncherFuse {
    fs: LauncherFs,
    /// TTL for cached attributes and entries
    ttl: Duration,
}

impl LauncherFuse {
    /// Wrap `fs` with a one second kernel cache TTL
    pub fn new(fs: LauncherFs) -> Self {
        Self::with_ttl(fs, Duration::from_secs(1))
    }

    pub fn with_ttl(fs: LauncherFs, ttl: Duration) -> Self {
        Self { fs, ttl }
    }

    pub fn service(&self) -> &LauncherFs {
        &self.fs
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

// =============================================================================
// FUSER FILESYSTEM TRAIT IMPLEMENTATION
// =============================================================================

#[cfg(feature = "fuse")]
impl fuser::Filesystem for LauncherFuse {
    fn init(
        &mut self,
        _req: &fuser::Request<'_>,
        _config: &mut fuser::KernelConfig,
    ) -> Result<(), libc::c_int> {
        info!(entries = self.fs.registry().len(), "launcher filesystem initialized");
        Ok(())
    }

    fn destroy(&mut self) {
        info!("launcher filesystem unmounted");
    }

    /// Look up a directory entry by name
    fn lookup(
        &mut self,
        _req: &fuser::Request<'_>,
        parent: u64,
        name: &OsStr,
        reply: fuser::ReplyEntry,
    ) {
        match self.fs.classify_ino(parent) {
            VirtualPath::Root => {}
            VirtualPath::Invalid => {
                reply.error(libc::ENOENT);
                return;
            }
            _ => {
                reply.error(libc::ENOTDIR);
                return;
            }
        }

        let Some(name) = name.to_str() else {
            reply.error(libc::ENOENT);
            return;
        };

        match self.fs.getattr(&format!("/{}", name)) {
            Ok(attr) => {
                let fuser_attr: fuser::FileAttr = attr.into();
                reply.entry(&self.ttl, &fuser_attr, 0);
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    /// Get file attributes
    fn getattr(
        &mut self,
        _req: &fuser::Request<'_>,
        ino: u64,
        _fh: Option<u64>,
        reply: fuser::ReplyAttr,
    ) {
        match self.fs.attributes(self.fs.classify_ino(ino)) {
            Ok(attr) => {
                let fuser_attr: fuser::FileAttr = attr.into();
                reply.attr(&self.ttl, &fuser_attr);
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    /// Read data from a file
    fn read(
        &mut self,
        _req: &fuser::Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: fuser::ReplyData,
    ) {
        let Ok(offset) = u64::try_from(offset) else {
            reply.error(libc::EINVAL);
            return;
        };

        match self
            .fs
            .read_vpath(self.fs.classify_ino(ino), offset, u64::from(size))
        {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(e.errno()),
        }
    }

    /// Open a file
    fn open(&mut self, _req: &fuser::Request<'_>, ino: u64, flags: i32, reply: fuser::ReplyOpen) {
        match self.fs.classify_ino(ino) {
            VirtualPath::Root => {
                reply.error(libc::EISDIR);
                return;
            }
            VirtualPath::Invalid => {
                reply.error(libc::ENOENT);
                return;
            }
            VirtualPath::MapFile | VirtualPath::BundleEntry(_) => {}
        }

        let write_flags = libc::O_WRONLY | libc::O_RDWR | libc::O_APPEND | libc::O_TRUNC;
        if flags & write_flags != 0 {
            reply.error(libc::EROFS);
            return;
        }

        // Stateless: every read reopens the original
        reply.opened(0, 0);
    }

    fn release(
        &mut self,
        _req: &fuser::Request<'_>,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: fuser::ReplyEmpty,
    ) {
        reply.ok();
    }

    fn opendir(&mut self, _req: &fuser::Request<'_>, ino: u64, _flags: i32, reply: fuser::ReplyOpen) {
        match self.fs.classify_ino(ino) {
            VirtualPath::Root => reply.opened(0, 0),
            VirtualPath::Invalid => reply.error(libc::ENOENT),
            _ => reply.error(libc::ENOTDIR),
        }
    }

    /// Read directory entries
    fn readdir(
        &mut self,
        _req: &fuser::Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: fuser::ReplyDirectory,
    ) {
        let Ok(skip) = usize::try_from(offset) else {
            reply.error(libc::EINVAL);
            return;
        };

        let entries = match self.fs.entries(self.fs.classify_ino(ino)) {
            Ok(entries) => entries,
            Err(e) => {
                reply.error(e.errno());
                return;
            }
        };

        for (i, entry) in entries.into_iter().enumerate().skip(skip) {
            // Reply returns true if buffer is full
            if reply.add(entry.ino, (i + 1) as i64, entry.kind.into(), &entry.name) {
                break;
            }
        }

        reply.ok();
    }

    fn releasedir(
        &mut self,
        _req: &fuser::Request<'_>,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        reply: fuser::ReplyEmpty,
    ) {
        reply.ok();
    }

    /// Get filesystem statistics
    fn statfs(&mut self, _req: &fuser::Request<'_>, _ino: u64, reply: fuser::ReplyStatfs) {
        let files = self.fs.registry().len() as u64 + 1;
        let block_size = 4096u32;

        reply.statfs(
            0,          // blocks - nothing is stored by the mount itself
            0,          // bfree
            0,          // bavail
            files,      // files - map + bundles
            0,          // ffree
            block_size, // bsize
            255,        // namelen
            block_size, // frsize
        );
    }

    /// Check file access permissions
    fn access(&mut self, _req: &fuser::Request<'_>, ino: u64, mask: i32, reply: fuser::ReplyEmpty) {
        if self.fs.classify_ino(ino) == VirtualPath::Invalid {
            reply.error(libc::ENOENT);
            return;
        }

        if mask & libc::W_OK != 0 {
            reply.error(libc::EROFS);
            return;
        }

        reply.ok();
    }
}

// =============================================================================
// MOUNT FUNCTIONS
// =============================================================================

/// Mount options for the launcher filesystem
#[cfg(feature = "fuse")]
#[derive(Clone, Debug)]
pub struct MountOptions {
    /// Allow other users to access the mount (default: false)
    pub allow_other: bool,
    /// Allow root to access the mount (default: false)
    pub allow_root: bool,
    /// Have the kernel helper unmount if the process dies (default: false)
    pub auto_unmount: bool,
    /// Filesystem name shown in mount output
    pub fsname: String,
}

#[cfg(feature = "fuse")]
impl Default for MountOptions {
    fn default() -> Self {
        MountOptions {
            allow_other: false,
            allow_root: false,
            auto_unmount: false,
            fsname: FS_NAME.to_string(),
        }
    }
}

#[cfg(feature = "fuse")]
impl MountOptions {
    fn to_fuser(&self) -> Vec<fuser::MountOption> {
        use fuser::MountOption;

        let mut mount_options = vec![
            MountOption::FSName(self.fsname.clone()),
            MountOption::RO,
            MountOption::DefaultPermissions,
        ];

        if self.allow_other {
            mount_options.push(MountOption::AllowOther);
        } else if self.allow_root {
            mount_options.push(MountOption::AllowRoot);
        }

        if self.auto_unmount {
            mount_options.push(MountOption::AutoUnmount);
        }

        mount_options
    }
}

/// Mount at `mountpoint`, blocking until the filesystem is unmounted.
#[cfg(feature = "fuse")]
pub fn mount<P: AsRef<Path>>(
    fs: LauncherFuse,
    mountpoint: P,
    options: &MountOptions,
) -> Result<(), std::io::Error> {
    debug!(mountpoint = %mountpoint.as_ref().display(), ?options, "mounting");
    fuser::mount2(fs, mountpoint.as_ref(), &options.to_fuser())
}

/// Mount in a background thread.
///
/// The returned session unmounts when dropped.
///
/// # Example
///
/// ```no_run
/// use appimagelauncherfs::{spawn_mount, LauncherFs, LauncherFuse, MountOptions, Registry};
///
/// let fs = LauncherFs::new(Registry::from_paths(["/opt/tool.AppImage"]));
/// let session = spawn_mount(LauncherFuse::new(fs), "/tmp/launcher", &MountOptions::default()).unwrap();
/// // ... serve ...
/// drop(session);
/// ```
#[cfg(feature = "fuse")]
pub fn spawn_mount<P: AsRef<Path>>(
    fs: LauncherFuse,
    mountpoint: P,
    options: &MountOptions,
) -> Result<fuser::BackgroundSession, std::io::Error> {
    debug!(mountpoint = %mountpoint.as_ref().display(), ?options, "spawning mount");
    fuser::spawn_mount2(fs, mountpoint.as_ref(), &options.to_fuser())
}
