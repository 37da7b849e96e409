//! Runtime configuration.
//!
//! Defaults mirror where AppImages usually live and where per-user runtime
//! mounts belong; every field can be overridden from the command line.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use super::error::{LauncherFsError, LauncherResult};

/// Name used for the mountpoint directory and the FUSE fsname
pub const FS_NAME: &str = "appimagelauncherfs";

/// Directory below `$HOME` scanned by default
pub const DEFAULT_APPLICATIONS_DIR: &str = "Applications";

/// Configuration for a launcher filesystem instance.
///
/// # Example
///
/// ```no_run
/// use appimagelauncherfs::LauncherConfig;
///
/// let config = LauncherConfig::from_env()
///     .unwrap()
///     .with_debug(true)
///     .with_source_dir("/opt/appimages");
/// ```
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    /// Directory whose regular files are registered
    pub source_dir: PathBuf,
    /// Where the filesystem is mounted
    pub mountpoint: PathBuf,
    /// Verbose logging
    pub debug: bool,
    /// How long the kernel may cache attributes and entries
    pub attr_ttl: Duration,
}

/// Values supplied on the command line. Unset fields fall back to the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub source_dir: Option<PathBuf>,
    pub mountpoint: Option<PathBuf>,
    /// Forces debug on; cannot turn off a set `DEBUG`
    pub debug: bool,
}

impl LauncherConfig {
    /// Defaults derived from the environment: `$HOME/Applications` as source
    /// and `/run/user/<uid>/appimagelauncherfs/` as mountpoint.
    pub fn from_env() -> LauncherResult<Self> {
        Self::resolve(ConfigOverrides::default())
    }

    /// Apply `overrides` on top of the environment defaults.
    ///
    /// `HOME` is only required when no source directory was given. Any value of
    /// `DEBUG`, including the empty string, enables debug.
    pub fn resolve(overrides: ConfigOverrides) -> LauncherResult<Self> {
        Self::resolve_with(
            overrides,
            env::var_os("HOME"),
            env::var_os("DEBUG").is_some(),
        )
    }

    fn resolve_with(
        overrides: ConfigOverrides,
        home: Option<OsString>,
        debug_env: bool,
    ) -> LauncherResult<Self> {
        let source_dir = match overrides.source_dir {
            Some(dir) => dir,
            None => {
                let home = home.ok_or(LauncherFsError::MissingEnv("HOME"))?;
                PathBuf::from(home).join(DEFAULT_APPLICATIONS_DIR)
            }
        };

        Ok(Self {
            source_dir,
            mountpoint: overrides.mountpoint.unwrap_or_else(default_mountpoint),
            debug: overrides.debug || debug_env,
            attr_ttl: Duration::from_secs(1),
        })
    }

    /// Set the scanned directory.
    pub fn with_source_dir(mut self, source_dir: impl Into<PathBuf>) -> Self {
        self.source_dir = source_dir.into();
        self
    }

    /// Set the mountpoint.
    pub fn with_mountpoint(mut self, mountpoint: impl Into<PathBuf>) -> Self {
        self.mountpoint = mountpoint.into();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_attr_ttl(mut self, ttl: Duration) -> Self {
        self.attr_ttl = ttl;
        self
    }
}

/// `/run/user/<uid>/appimagelauncherfs/` for the calling user
pub fn default_mountpoint() -> PathBuf {
    let uid = unsafe { libc::getuid() };
    PathBuf::from("/run/user").join(uid.to_string()).join(FS_NAME)
}
