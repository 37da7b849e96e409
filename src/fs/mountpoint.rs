//! Mountpoint lifecycle
//!
//! The mountpoint directory only exists while an instance is serving it, so
//! its presence doubles as the "already running" marker. A crashed instance
//! leaves a stale directory (and possibly a dead FUSE mount) behind, which
//! [`Mountpoint::prepare`] can clear when asked to.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, warn};

use super::error::{LauncherFsError, LauncherResult};

/// Mode of the mountpoint directory while nothing is mounted on it
pub const MOUNTPOINT_PERM: u32 = 0o750;

/// Helper used to detach a FUSE mount without root privileges
const FUSERMOUNT: &str = "fusermount";

/// A prepared mountpoint directory
#[derive(Debug)]
pub struct Mountpoint {
    path: PathBuf,
}

impl Mountpoint {
    /// Create the mountpoint directory with mode 0750.
    ///
    /// An existing directory is taken as another running instance and reported
    /// as `AlreadyRunning`, unless `replace_stale` is set, in which case any
    /// leftover mount is detached and the directory recreated.
    pub fn prepare(path: impl Into<PathBuf>, replace_stale: bool) -> LauncherResult<Self> {
        let path = path.into();

        if path.exists() {
            if !replace_stale {
                return Err(LauncherFsError::AlreadyRunning { mountpoint: path });
            }
            clear_stale(&path);
        }

        let mount_err = |source| LauncherFsError::Mount {
            mountpoint: path.clone(),
            source,
        };
        fs::create_dir_all(&path).map_err(mount_err)?;
        fs::set_permissions(&path, fs::Permissions::from_mode(MOUNTPOINT_PERM))
            .map_err(mount_err)?;

        info!(mountpoint = %path.display(), "mountpoint ready");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory once the filesystem has been unmounted.
    pub fn cleanup(self) -> LauncherResult<()> {
        match fs::remove_dir(&self.path) {
            Ok(()) => {
                debug!(mountpoint = %self.path.display(), "mountpoint removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(LauncherFsError::Mount {
                mountpoint: self.path,
                source,
            }),
        }
    }
}

/// Detach whatever is mounted at `path` and remove the directory.
///
/// Both steps are best effort: a directory that was never mounted makes
/// `fusermount` fail, which is expected.
fn clear_stale(path: &Path) {
    info!(mountpoint = %path.display(), "clearing stale mountpoint");

    match Command::new(FUSERMOUNT).arg("-u").arg(path).output() {
        Ok(out) if out.status.success() => debug!("detached stale mount"),
        Ok(out) => debug!(
            status = %out.status,
            stderr = %String::from_utf8_lossy(&out.stderr).trim(),
            "nothing to detach"
        ),
        Err(e) => warn!(error = %e, "could not run {}", FUSERMOUNT),
    }

    if let Err(e) = fs::remove_dir(path) {
        warn!(mountpoint = %path.display(), error = %e, "could not remove stale mountpoint");
    }
}
