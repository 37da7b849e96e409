//! Content delivery
//!
//! `/map` is rendered fresh for every read. Bundle reads open the original,
//! copy the requested range and zero the part of it that overlaps
//! [`REDACT_START`]..=[`REDACT_END`]. That window holds the AppImage type magic
//! (`AI\x02` at offset 8), which would otherwise make the launcher intercept
//! executions of its own mount.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use tracing::warn;

use super::error::{LauncherFsError, LauncherResult};
use super::listing::map_text;
use super::path::VirtualPath;
use super::registry::Registry;

/// First redacted byte (inclusive), in original file offsets
pub const REDACT_START: u64 = 8;

/// Last redacted byte (inclusive), in original file offsets
pub const REDACT_END: u64 = 10;

/// Read up to `size` bytes of `vpath` starting at `offset`.
///
/// Reading exactly at the end returns an empty buffer; reading past it fails
/// with `OutOfRange`.
pub fn read_content(
    vpath: VirtualPath,
    registry: &Registry,
    offset: u64,
    size: u64,
) -> LauncherResult<Vec<u8>> {
    match vpath {
        VirtualPath::MapFile => read_map(registry, offset, size),
        VirtualPath::BundleEntry(id) => {
            let original = registry
                .lookup(id)
                .ok_or_else(|| LauncherFsError::NotFound(vpath.to_string()))?;
            read_bundle(original, offset, size)
        }
        VirtualPath::Root => Err(LauncherFsError::IsDirectory(vpath.to_string())),
        VirtualPath::Invalid => Err(LauncherFsError::NotFound(vpath.to_string())),
    }
}

fn read_map(registry: &Registry, offset: u64, size: u64) -> LauncherResult<Vec<u8>> {
    let text = map_text(registry);
    let (start, end) = clamp_range(offset, size, text.len() as u64)?;
    Ok(text.as_bytes()[start as usize..end as usize].to_vec())
}

/// Read a range of an original bundle and redact it.
///
/// The handle is dropped before returning on every path.
pub fn read_bundle(path: &std::path::Path, offset: u64, size: u64) -> LauncherResult<Vec<u8>> {
    let io_err = |source| {
        warn!(path = %path.display(), error = %source, "bundle read failed");
        LauncherFsError::Io {
            path: path.to_path_buf(),
            source,
        }
    };

    let mut file = File::open(path).map_err(io_err)?;
    let total = file.metadata().map_err(io_err)?.len();
    let (start, end) = clamp_range(offset, size, total)?;

    file.seek(SeekFrom::Start(start)).map_err(io_err)?;

    // A file shrinking underneath us simply yields a shorter buffer
    let mut buf = Vec::with_capacity((end - start) as usize);
    file.take(end - start).read_to_end(&mut buf).map_err(io_err)?;

    redact(&mut buf, offset);
    Ok(buf)
}

/// Zero the bytes of `buf` that fall inside the redaction window, where
/// `buf[0]` is the byte at `offset` of the original file.
pub fn redact(buf: &mut [u8], offset: u64) {
    let Some(last) = (buf.len() as u64)
        .checked_sub(1)
        .and_then(|n| offset.checked_add(n))
    else {
        return;
    };

    let lo = REDACT_START.max(offset);
    let hi = REDACT_END.min(last);
    if lo > hi {
        return;
    }

    let from = (lo - offset) as usize;
    let to = (hi - offset) as usize;
    buf[from..=to].fill(0);
}

/// Clip `offset..offset + size` to `total`, rejecting offsets past the end.
fn clamp_range(offset: u64, size: u64, total: u64) -> LauncherResult<(u64, u64)> {
    if offset > total {
        return Err(LauncherFsError::OutOfRange {
            offset,
            size: total,
        });
    }
    Ok((offset, offset + size.min(total - offset)))
}
