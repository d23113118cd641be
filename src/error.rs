//! Error types for seekable Zstandard decompression.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes when opening or reading a seekable stream, along with a
//! convenient [`Result<T>`] type alias.
//!
//! All fallible operations in this crate return `Result<T, Error>`. Range
//! errors from [`seek`] are non-destructive: the reader stays usable at its
//! prior position. A codec error from [`read`] leaves the decoder in an
//! indeterminate state; seek before retrying, or drop the reader.
//!
//! [`seek`]: crate::SeekReader::seek
//! [`read`]: crate::SeekReader::read

use std::io;

/// The main error type for seekable stream operations.
///
/// # Error Categories
///
/// | Category | Variants | Typical Cause |
/// |----------|----------|---------------|
/// | I/O | [`Io`][Self::Io] | Opening or mapping the source file |
/// | Format | [`InvalidFormat`][Self::InvalidFormat] | Source is not Zstandard data |
/// | Range | [`NegativeSeek`][Self::NegativeSeek], [`BeyondEndSeek`][Self::BeyondEndSeek] | Out-of-bounds seek targets |
/// | Codec | [`Read`][Self::Read] | Corrupt or truncated frames |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred while opening or mapping the source.
    ///
    /// This wraps [`std::io::Error`] and is returned by the path and file
    /// descriptor factories. Common causes include a missing file,
    /// insufficient permissions, or a descriptor that cannot be mapped.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The source does not look like Zstandard data.
    ///
    /// Every factory validates that the source begins with a parseable
    /// frame. The string describes what was expected vs. found.
    #[error("invalid Zstandard data: {0}")]
    InvalidFormat(String),

    /// A seek resolved to a negative absolute position.
    ///
    /// Produced by relative and end-relative seeks whose computed target
    /// lies before the start of the stream. The reader keeps its previous
    /// position.
    #[error("negative seek to offset {offset}")]
    NegativeSeek {
        /// The computed absolute target that was negative.
        offset: i64,
    },

    /// A seek target lies beyond the end of the decompressed stream.
    ///
    /// The reader keeps its previous position.
    #[error("seek to offset {offset} is beyond the end of the stream ({end} bytes)")]
    BeyondEndSeek {
        /// The requested absolute target.
        offset: u64,
        /// The decompressed size of the stream.
        end: u64,
    },

    /// The decoder reported an error while decompressing a frame.
    ///
    /// This covers corrupt frame contents and streams truncated mid-frame,
    /// both during reads and during frame scanning. The string is the
    /// decoder's own error name.
    #[error("decompression failed: {0}")]
    Read(String),
}

impl Error {
    /// Returns the errno-style code for this error, if it has one.
    ///
    /// Callers porting from C-like interfaces can match on the classic
    /// numeric contract: `-1` for a negative seek, `-2` for a seek beyond
    /// the end of the stream, `-3` for a decode failure. I/O and format
    /// errors have no numeric equivalent and return `None`.
    pub fn code(&self) -> Option<i32> {
        match self {
            Error::NegativeSeek { .. } => Some(-1),
            Error::BeyondEndSeek { .. } => Some(-2),
            Error::Read(_) => Some(-3),
            _ => None,
        }
    }

    /// Returns `true` if this is a recoverable out-of-range seek.
    ///
    /// Range errors leave the reader untouched at its previous position,
    /// so the caller can simply retry with a corrected offset.
    pub fn is_out_of_range(&self) -> bool {
        matches!(
            self,
            Error::NegativeSeek { .. } | Error::BeyondEndSeek { .. }
        )
    }
}

/// A specialized Result type for seekable stream operations.
pub type Result<T> = std::result::Result<T, Error>;
