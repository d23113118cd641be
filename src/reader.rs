//! The seekable reader: factories, the seek/read engine, introspection.
//!
//! [`SeekReader`] presents a concatenation of Zstandard frames as a
//! read-only, seekable byte stream. Positioning works on uncompressed
//! offsets; under the hood a seek resolves to "reset the decoder at the
//! base of the frame containing the target, then discard the intra-frame
//! prefix", using the [`JumpTable`] to find frame bases.
//!
//! The jump table can be built eagerly at construction (parsing a
//! seekable-format footer when one is present, scanning frames
//! otherwise), or lazily: the `*_without_jump_table` factories defer all
//! indexing until the first seek or read, which only ever scans as far
//! as the requested position. Lazy construction is the only way to open
//! streams whose indexing would require decompressing frames of unknown
//! content size up front.

use std::io::{self, SeekFrom};
use std::path::Path;

use tracing::debug;

use crate::decoder::{self, StreamDecoder};
use crate::jump_table::{
    read_le32, JumpCoordinate, JumpTable, SKIPPABLE_MAGIC_MASK, SKIPPABLE_MAGIC_START,
};
use crate::source::ByteSource;
use crate::{Error, Result};

#[cfg(unix)]
use std::os::unix::io::RawFd;

/// Random-access reader over concatenated Zstandard frames.
///
/// A `SeekReader` behaves like a read-only file handle on the
/// decompressed stream: it supports absolute, relative and end-relative
/// seeks and bounded reads, and implements [`std::io::Read`] and
/// [`std::io::Seek`] so it drops into generic I/O code.
///
/// # Example
///
/// ```rust,no_run
/// use std::io::SeekFrom;
/// use zstd_seek::SeekReader;
///
/// fn tail(path: &str) -> zstd_seek::Result<Vec<u8>> {
///     let mut reader = SeekReader::open_path(path)?;
///     reader.seek(SeekFrom::End(-16))?;
///     let mut buf = vec![0u8; 16];
///     let n = reader.read(&mut buf)?;
///     buf.truncate(n);
///     Ok(buf)
/// }
/// ```
///
/// # Concurrency
///
/// A `SeekReader` is a single-caller object: it owns one decompression
/// session and one scratch buffer, and every operation mutates them.
/// Open independent readers over the same source for concurrent access.
pub struct SeekReader<'a> {
    source: ByteSource<'a>,
    jump_table: JumpTable,
    decoder: StreamDecoder,

    /// Position in the uncompressed stream, as reported by [`position`].
    ///
    /// [`position`]: SeekReader::position
    position: u64,
    /// Position in the compressed stream, as reported by
    /// [`compressed_position`].
    ///
    /// [`compressed_position`]: SeekReader::compressed_position
    compressed_position: u64,
    /// The most recently installed jump coordinate. Its
    /// `uncompressed_offset` is the live intra-frame discard counter.
    coord: JumpCoordinate,
    /// Offset into the source of the frame currently fed to the decoder.
    frame_offset: u64,
    /// Compressed size of that frame; 0 means the next frame has not
    /// been located yet.
    input_size: usize,
    /// Bytes of that frame already consumed by the decoder.
    input_pos: usize,
}

impl<'a> SeekReader<'a> {
    /// Creates a reader over a caller-owned buffer holding the whole
    /// compressed stream, and initializes the full jump table.
    ///
    /// # Errors
    ///
    /// Fails if the buffer does not begin with a Zstandard frame, or if
    /// the jump table cannot be built (corrupt or truncated frames).
    pub fn from_bytes(buf: &'a [u8]) -> Result<Self> {
        let mut reader = Self::from_bytes_without_jump_table(buf)?;
        reader.initialize_jump_table()?;
        Ok(reader)
    }

    /// Creates a reader over a caller-owned buffer without building the
    /// jump table. Indexing happens on demand at the first seek or read,
    /// or explicitly via [`initialize_jump_table`].
    ///
    /// [`initialize_jump_table`]: SeekReader::initialize_jump_table
    pub fn from_bytes_without_jump_table(buf: &'a [u8]) -> Result<Self> {
        Self::from_source(ByteSource::Borrowed(buf))
    }

    fn from_source(source: ByteSource<'a>) -> Result<Self> {
        if !decoder::starts_with_frame(source.as_slice()) {
            return Err(Error::InvalidFormat(
                "source does not begin with a Zstandard frame".into(),
            ));
        }
        Ok(Self {
            source,
            jump_table: JumpTable::new(),
            decoder: StreamDecoder::new(),
            position: 0,
            compressed_position: 0,
            coord: JumpCoordinate::default(),
            frame_offset: 0,
            input_size: 0,
            input_pos: 0,
        })
    }
}

impl SeekReader<'static> {
    /// Opens `path`, maps it into memory and initializes the full jump
    /// table. The reader owns the mapping and the file.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = Self::open_path_without_jump_table(path)?;
        reader.initialize_jump_table()?;
        Ok(reader)
    }

    /// Opens `path` and maps it into memory without building the jump
    /// table.
    pub fn open_path_without_jump_table(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_source(ByteSource::open_path(path.as_ref())?)
    }

    /// Maps a caller-owned file descriptor and initializes the full jump
    /// table. The reader owns the mapping; the descriptor stays open and
    /// is never closed by this crate.
    #[cfg(unix)]
    pub fn from_fd(fd: RawFd) -> Result<Self> {
        let mut reader = Self::from_fd_without_jump_table(fd)?;
        reader.initialize_jump_table()?;
        Ok(reader)
    }

    /// Maps a caller-owned file descriptor without building the jump
    /// table. The descriptor is never closed by this crate.
    #[cfg(unix)]
    pub fn from_fd_without_jump_table(fd: RawFd) -> Result<Self> {
        Self::from_source(ByteSource::map_fd(fd)?)
    }
}

impl SeekReader<'_> {
    /// Discovers every frame in the stream and installs the trailing
    /// sentinel record.
    ///
    /// Prefers the seekable-format footer when the stream carries a valid
    /// one; otherwise scans frame headers forward, decompressing frames of
    /// unknown content size into a throwaway buffer to measure them.
    /// Calling this on a fully initialized table is a no-op.
    pub fn initialize_jump_table(&mut self) -> Result<()> {
        self.initialize_jump_table_up_to(u64::MAX)
    }

    /// Extends the jump table until it covers `up_until_pos`, or to the
    /// end of the stream, whichever comes first.
    ///
    /// When the scan stops early the table keeps a trailing record at the
    /// last discovered boundary but is not marked fully initialized, so a
    /// later call resumes where this one stopped.
    pub fn initialize_jump_table_up_to(&mut self, up_until_pos: u64) -> Result<()> {
        if self.jump_table.is_fully_initialized() {
            return Ok(());
        }

        let src = self.source.as_slice();
        if self.jump_table.is_empty() && self.jump_table.parse_seekable_footer(src) {
            debug!(frames = self.jump_table.len() - 1, "seek table parsed");
            return Ok(());
        }

        let (mut compressed_pos, mut uncompressed_pos) = match self.jump_table.last() {
            Some(record) => (record.compressed_pos, record.uncompressed_pos),
            None => (0, 0),
        };

        let mut reached_end = true;
        while let Some(frame_size) = decoder::find_frame_size(&src[compressed_pos as usize..]) {
            let frame = &src[compressed_pos as usize..compressed_pos as usize + frame_size];

            // Skippable frames occupy compressed space but decode to
            // nothing; they never get a record.
            if (read_le32(frame, 0) & SKIPPABLE_MAGIC_MASK) == SKIPPABLE_MAGIC_START {
                compressed_pos += frame_size as u64;
                continue;
            }

            if self
                .jump_table
                .last()
                .map_or(true, |r| r.uncompressed_pos < uncompressed_pos)
            {
                self.jump_table.push(compressed_pos, uncompressed_pos);
            }

            let content_size = match decoder::frame_content_size(frame) {
                Some(size) => size,
                None => decoder::count_decompressed_size(frame)?,
            };

            compressed_pos += frame_size as u64;
            uncompressed_pos += content_size;

            if uncompressed_pos >= up_until_pos {
                reached_end = false;
                break;
            }
        }

        if self
            .jump_table
            .last()
            .is_some_and(|r| r.uncompressed_pos < uncompressed_pos)
        {
            self.jump_table.push(compressed_pos, uncompressed_pos);
        }
        if self.jump_table.is_empty() {
            return Err(Error::InvalidFormat("no Zstandard frames found".into()));
        }
        if reached_end {
            self.jump_table.mark_fully_initialized();
        }
        Ok(())
    }

    /// Resolves the jump coordinate for `uncompressed_pos`, extending the
    /// jump table first when the position lies past the last known record.
    fn jump_coordinate(&mut self, uncompressed_pos: u64) -> Result<JumpCoordinate> {
        if !self.jump_table.is_fully_initialized()
            && (self.jump_table.is_empty()
                || self.jump_table.last_uncompressed_pos() <= uncompressed_pos)
        {
            self.initialize_jump_table_up_to(uncompressed_pos)?;
        }
        Ok(self.jump_table.lookup(uncompressed_pos))
    }

    /// Reads up to `out.len()` decompressed bytes at the current position.
    ///
    /// Returns the number of bytes produced, which is smaller than
    /// requested only at the end of the stream. The position advances by
    /// the returned count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Read`] when the decoder rejects a frame; the
    /// decode state is indeterminate afterwards, seek before retrying.
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize> {
        let local = self.jump_coordinate(self.position)?;
        self.compressed_position = local.record.compressed_pos;

        let max_readable = self
            .jump_table
            .last_uncompressed_pos()
            .saturating_sub(self.position);
        let mut remaining = (out.len() as u64).min(max_readable) as usize;
        let should_read = remaining;
        let mut copied = 0usize;

        // Decoded bytes left over from a previous call.
        let n = self
            .decoder
            .drain_into(&mut self.coord.uncompressed_offset, &mut out[..remaining]);
        copied += n;
        remaining -= n;
        self.position += n as u64;

        while remaining > 0 {
            if self.input_pos == self.input_size {
                let src = self.source.as_slice();
                match decoder::find_frame_size(&src[self.frame_offset as usize..]) {
                    Some(size) => {
                        self.input_size = size;
                        self.input_pos = 0;
                    }
                    // End of the logical stream.
                    None => break,
                }
            }

            while self.input_pos < self.input_size {
                let start = self.frame_offset as usize;
                let frame = &self.source.as_slice()[start..start + self.input_size];
                let before = self.input_pos;
                self.decoder.decompress_step(frame, &mut self.input_pos)?;
                self.compressed_position += (self.input_pos - before) as u64;

                let n = self.decoder.drain_into(
                    &mut self.coord.uncompressed_offset,
                    &mut out[copied..copied + remaining],
                );
                copied += n;
                remaining -= n;
                self.position += n as u64;

                if remaining == 0 {
                    break;
                }
            }

            if self.input_pos == self.input_size {
                // Frame fully consumed: step over it to the next one.
                self.frame_offset += self.input_size as u64;
                self.input_size = 0;
                self.input_pos = 0;
            }

            if remaining == 0 {
                break;
            }
        }

        Ok(should_read - remaining)
    }

    /// Moves the position in the uncompressed stream, like a file seek.
    ///
    /// Returns the new absolute position. Seeking to the current position
    /// never touches the decoder. A seek into another frame, or backward
    /// within the current one, resets the decompression session and lands
    /// on the target frame base; a forward seek within the current frame
    /// reads and discards the intervening bytes instead, so frames are
    /// never re-decoded unnecessarily.
    ///
    /// # Errors
    ///
    /// - [`Error::NegativeSeek`] when the computed target is negative.
    /// - [`Error::BeyondEndSeek`] when it lies past the end of the
    ///   stream. Both leave the reader at its previous position.
    /// - [`Error::Read`] when the jump table has to be extended over
    ///   frames that fail to decode.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => offset,
            SeekFrom::Current(0) => return Ok(self.position),
            SeekFrom::Current(offset) => {
                let target = self.position as i64 + offset;
                if target < 0 {
                    return Err(Error::NegativeSeek { offset: target });
                }
                target as u64
            }
            SeekFrom::End(offset) => {
                let target = self.decompressed_size()? as i64 + offset;
                if target < 0 {
                    return Err(Error::NegativeSeek { offset: target });
                }
                target as u64
            }
        };

        if target == self.position {
            return Ok(target);
        }

        // Grows the table through the target, so the bounds check below
        // sees the true extent of the stream.
        let new_coord = self.jump_coordinate(target)?;
        let known_end = self.jump_table.last_uncompressed_pos();
        if target > known_end {
            return Err(Error::BeyondEndSeek {
                offset: target,
                end: known_end,
            });
        }

        if new_coord.compressed_offset != self.coord.compressed_offset
            || target < self.position
        {
            // Another frame, or backwards: restart decoding at its base.
            self.decoder.reset_session();
            self.coord = new_coord;
            self.frame_offset = new_coord.compressed_offset;
            self.position = target;
            self.compressed_position = new_coord.compressed_offset;
            self.input_size = 0;
            self.input_pos = 0;
        } else {
            // Forward within the current frame: drain through the normal
            // read path instead of re-decoding the frame from its base.
            let mut skip = vec![0u8; self.decoder.block_size()];
            let mut to_skip = target - self.position;
            while to_skip > 0 {
                let len = skip.len().min(to_skip as usize);
                let n = self.read(&mut skip[..len])? as u64;
                if n == 0 {
                    return Err(Error::Read(
                        "stream ended while skipping to the seek target".into(),
                    ));
                }
                to_skip -= n;
            }
        }

        Ok(self.position)
    }

    /// Current position in the uncompressed stream.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Current position in the compressed stream: the base of the frame
    /// being decoded, advanced by the compressed bytes consumed so far.
    pub fn compressed_position(&self) -> u64 {
        self.compressed_position
    }

    /// Total size of the uncompressed stream.
    ///
    /// Forces full jump-table initialization, which on a lazily opened
    /// stream may scan (and partially decompress) every frame.
    pub fn decompressed_size(&mut self) -> Result<u64> {
        self.initialize_jump_table()?;
        Ok(self.jump_table.last_uncompressed_pos())
    }

    /// Uncompressed size of everything discovered so far, without
    /// triggering any indexing. Equals [`decompressed_size`] once the
    /// jump table is fully initialized.
    ///
    /// [`decompressed_size`]: SeekReader::decompressed_size
    pub fn known_decompressed_size(&self) -> u64 {
        self.jump_table.last_uncompressed_pos()
    }

    fn count_frames_up_to(&self, limit: usize) -> usize {
        let src = self.source.as_slice();
        let mut offset = 0usize;
        let mut count = 0usize;
        while let Some(frame_size) = decoder::find_frame_size(&src[offset..]) {
            count += 1;
            offset += frame_size;
            if count >= limit {
                break;
            }
        }
        count
    }

    /// Number of frames in the stream, counted by walking the frame
    /// headers. Does not build or consult the jump table; skippable
    /// frames are included in the count.
    pub fn num_frames(&self) -> usize {
        self.count_frames_up_to(usize::MAX)
    }

    /// Returns `true` if the stream holds more than one frame. Stops
    /// walking headers after the second frame.
    pub fn is_multiframe(&self) -> bool {
        self.count_frames_up_to(2) > 1
    }

    /// The file descriptor backing the mapping, when the reader was
    /// created from a path or descriptor. `None` for buffer-backed
    /// readers.
    #[cfg(unix)]
    pub fn as_raw_fd(&self) -> Option<RawFd> {
        self.source.raw_fd()
    }

    /// The jump table, for inspection.
    pub fn jump_table(&self) -> &JumpTable {
        &self.jump_table
    }

    /// The jump table, for manual construction from an external catalog.
    ///
    /// Advanced use: records pushed here must respect the monotonicity
    /// contract, and mixing manual records with the automatic
    /// initialization paths is not supported.
    pub fn jump_table_mut(&mut self) -> &mut JumpTable {
        &mut self.jump_table
    }

    /// Returns `true` once the jump table covers the whole stream.
    pub fn jump_table_is_initialized(&self) -> bool {
        self.jump_table.is_fully_initialized()
    }
}

impl io::Read for SeekReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        SeekReader::read(self, buf).map_err(io::Error::other)
    }
}

impl io::Seek for SeekReader<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        SeekReader::seek(self, pos).map_err(io::Error::other)
    }
}

impl std::fmt::Debug for SeekReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeekReader")
            .field("source", &self.source)
            .field("position", &self.position)
            .field("compressed_position", &self.compressed_position)
            .field("jump_table_initialized", &self.jump_table.is_fully_initialized())
            .finish_non_exhaustive()
    }
}
