pub mod attr;
pub mod config;
pub mod content;
pub mod error;
pub mod fuse_shim;
pub mod launcherfs;
pub mod listing;
pub mod mountpoint;
pub mod path;
pub mod registry;
pub mod signal;

pub use attr::*;
pub use config::*;
pub use content::*;
pub use error::*;
pub use fuse_shim::*;
pub use launcherfs::*;
pub use listing::*;
pub use mountpoint::*;
pub use path::*;
pub use registry::*;
