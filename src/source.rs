//! Backing storage for the compressed byte range.
//!
//! A reader needs random access to the complete compressed stream. The
//! three ways to obtain that range come with three different teardown
//! obligations, so ownership is encoded in the enum itself rather than
//! in flags:
//!
//! - a caller-supplied buffer is borrowed and never released here;
//! - a mapping created from a path owns both the map and the file;
//! - a mapping over a caller-owned descriptor is unmapped on drop, but
//!   the descriptor itself is left open for the caller to close.

use std::fs::File;
use std::io;
use std::path::Path;

use memmap2::Mmap;

#[cfg(unix)]
use std::os::unix::io::{AsRawFd, RawFd};

/// Read-only view over the full compressed byte range.
pub(crate) enum ByteSource<'a> {
    /// Caller-supplied buffer, borrowed for the life of the reader.
    Borrowed(&'a [u8]),
    /// Mapping created from a path. Dropping unmaps and closes the file.
    OwnedFile {
        /// The read-only mapping over the whole file.
        mmap: Mmap,
        /// Kept open for the lifetime of the mapping; also answers `fileno`.
        file: File,
    },
    /// Mapping over a caller-owned descriptor. Dropping unmaps only.
    #[cfg(unix)]
    MappedFd {
        /// The read-only mapping over the whole descriptor.
        mmap: Mmap,
        /// The caller's descriptor; never closed by this crate.
        fd: RawFd,
    },
}

impl<'a> ByteSource<'a> {
    /// Opens `path` and maps it read-only. The returned source owns both
    /// the mapping and the file.
    pub(crate) fn open_path(path: &Path) -> io::Result<ByteSource<'static>> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(ByteSource::OwnedFile { mmap, file })
    }

    /// Maps a caller-owned descriptor read-only. The returned source owns
    /// the mapping but not the descriptor.
    #[cfg(unix)]
    pub(crate) fn map_fd(fd: RawFd) -> io::Result<ByteSource<'static>> {
        let mmap = unsafe { Mmap::map(fd)? };
        Ok(ByteSource::MappedFd { mmap, fd })
    }

    /// The full compressed byte range.
    pub(crate) fn as_slice(&self) -> &[u8] {
        match self {
            ByteSource::Borrowed(buf) => buf,
            ByteSource::OwnedFile { mmap, .. } => mmap,
            #[cfg(unix)]
            ByteSource::MappedFd { mmap, .. } => mmap,
        }
    }

    /// The descriptor backing the mapping, if there is one.
    #[cfg(unix)]
    pub(crate) fn raw_fd(&self) -> Option<RawFd> {
        match self {
            ByteSource::Borrowed(_) => None,
            ByteSource::OwnedFile { file, .. } => Some(file.as_raw_fd()),
            ByteSource::MappedFd { fd, .. } => Some(*fd),
        }
    }
}

impl std::fmt::Debug for ByteSource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = match self {
            ByteSource::Borrowed(_) => "Borrowed",
            ByteSource::OwnedFile { .. } => "OwnedFile",
            #[cfg(unix)]
            ByteSource::MappedFd { .. } => "MappedFd",
        };
        f.debug_struct("ByteSource")
            .field("variant", &variant)
            .field("len", &self.as_slice().len())
            .finish()
    }
}
