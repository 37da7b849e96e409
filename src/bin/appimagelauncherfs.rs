//! appimagelauncherfs CLI
//!
//! Mounts the launcher filesystem for a directory of AppImages, or prints
//! what such a mount would expose.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use appimagelauncherfs::signal::{install_signal_handlers, ShutdownSignal};
use appimagelauncherfs::{
    canonical_filename, spawn_mount, ConfigOverrides, LauncherConfig, LauncherFs, LauncherFsError,
    LauncherFuse, LauncherResult, MountOptions, Mountpoint,
};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Format bytes as human-readable size
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

#[derive(Parser)]
#[command(name = "appimagelauncherfs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Read-only FUSE view of a directory of AppImages")]
#[command(long_about = "appimagelauncherfs - serve AppImages under stable numeric names\n\n\
    Every regular file of the source directory is exposed as NNNN.AppImage,\n\
    next to a 'map' file listing the original path of each entry. Bytes 8-10\n\
    of every served file are zeroed to hide the AppImage type magic.\n\n\
    Examples:\n\
      appimagelauncherfs mount\n\
      appimagelauncherfs --source-dir /opt/apps --mountpoint /tmp/apps mount --replace-stale\n\
      appimagelauncherfs map")]
pub struct Cli {
    /// Directory whose files are registered [default: $HOME/Applications]
    #[arg(short, long, global = true, value_name = "DIR")]
    source_dir: Option<PathBuf>,

    /// Where to mount [default: /run/user/<uid>/appimagelauncherfs]
    #[arg(short, long, global = true, value_name = "DIR")]
    mountpoint: Option<PathBuf>,

    /// Verbose logging (also enabled by setting DEBUG to any value)
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Mount the filesystem and serve until interrupted
    #[command(long_about = "Mount the filesystem and serve until SIGINT, SIGTERM or SIGHUP\n\n\
        The mountpoint directory is created with mode 0750 and removed again on\n\
        shutdown. An existing mountpoint is treated as another running instance\n\
        unless --replace-stale is given.")]
    Mount {
        /// Detach and remove a leftover mountpoint instead of refusing to start
        #[arg(long)]
        replace_stale: bool,

        /// Let other users access the mount (needs user_allow_other in fuse.conf)
        #[arg(long)]
        allow_other: bool,

        /// Attribute cache TTL in seconds
        #[arg(long, default_value_t = 1, value_name = "SECS")]
        ttl: u64,
    },

    /// Print the map file the mount would serve
    Map,

    /// List registered entries with their sizes
    List,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(config.debug);

    match run(cli.command, config, &mut io::stdout().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn build_config(cli: &Cli) -> LauncherResult<LauncherConfig> {
    let mut config = LauncherConfig::resolve(ConfigOverrides {
        source_dir: cli.source_dir.clone(),
        mountpoint: cli.mountpoint.clone(),
        debug: cli.debug,
    })?;

    if let Commands::Mount { ttl, .. } = cli.command {
        config = config.with_attr_ttl(Duration::from_secs(ttl));
    }

    Ok(config)
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands, config: LauncherConfig, out: &mut impl Write) -> LauncherResult<()> {
    let fs = LauncherFs::from_source_dir(&config.source_dir)?;

    match command {
        Commands::Mount {
            replace_stale,
            allow_other,
            ..
        } => serve(fs, &config, replace_stale, allow_other),

        Commands::Map => out
            .write_all(fs.map_text().as_bytes())
            .map_err(LauncherFsError::Output),

        Commands::List => write_list(&fs, out).map_err(LauncherFsError::Output),
    }
}

/// One line per entry: canonical name, size (or `missing`), original path
fn write_list(fs: &LauncherFs, out: &mut impl Write) -> io::Result<()> {
    for entry in fs.registry().to_entries() {
        let name = canonical_filename(entry.id);
        let size = match fs.getattr(&format!("/{}", name)) {
            Ok(attr) => format_bytes(attr.size),
            Err(_) => "missing".to_string(),
        };
        writeln!(out, "{}  {:>10}  {}", name, size, entry.original_path.display())?;
    }
    Ok(())
}

fn serve(
    fs: LauncherFs,
    config: &LauncherConfig,
    replace_stale: bool,
    allow_other: bool,
) -> LauncherResult<()> {
    let shutdown = Arc::new(ShutdownSignal::new());
    install_signal_handlers(shutdown.clone()).map_err(|source| LauncherFsError::Mount {
        mountpoint: config.mountpoint.clone(),
        source,
    })?;

    let mountpoint = Mountpoint::prepare(&config.mountpoint, replace_stale)?;

    let options = MountOptions {
        allow_other,
        ..Default::default()
    };
    let entries = fs.registry().len();
    let shim = LauncherFuse::with_ttl(fs, config.attr_ttl);

    let session = match spawn_mount(shim, mountpoint.path(), &options) {
        Ok(session) => session,
        Err(source) => {
            let err = LauncherFsError::Mount {
                mountpoint: mountpoint.path().to_path_buf(),
                source,
            };
            // leave no directory behind that would look like a running instance
            discard_mountpoint(mountpoint);
            return Err(err);
        }
    };

    info!(
        mountpoint = %mountpoint.path().display(),
        source = %config.source_dir.display(),
        entries,
        "serving"
    );

    shutdown.wait(Duration::from_millis(200));
    info!(signal = shutdown.signal_name(), "shutting down");

    // Dropping the session unmounts
    drop(session);
    mountpoint.cleanup()
}

/// Remove a mountpoint that was never served. Returns whether it is gone.
fn discard_mountpoint(mountpoint: Mountpoint) -> bool {
    let path = mountpoint.path().to_path_buf();
    match mountpoint.cleanup() {
        Ok(()) => true,
        Err(e) => {
            warn!(mountpoint = %path.display(), error = %e, "failed to remove mountpoint after mount failure");
            false
        }
    }
}
