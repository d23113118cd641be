//! The jump table: a sparse index from uncompressed positions to the
//! compressed frames that contain them.
//!
//! Each [`JumpTableRecord`] marks a frame boundary: the compressed offset
//! where a frame starts and the uncompressed offset of the first byte it
//! decodes to. Records are strictly increasing on both axes. Once every
//! frame has been discovered, the table carries a trailing sentinel record
//! holding the total compressed and uncompressed sizes and is marked
//! *fully initialized*.
//!
//! Two construction paths exist: an eager parse of the Zstandard
//! seekable-format footer (when the stream carries one), and a progressive
//! scan over the frames driven by [`SeekReader`]. A malformed footer is
//! never fatal; the table simply falls back to the scan.
//!
//! [`SeekReader`]: crate::SeekReader

use tracing::debug;

/// Number of trailing bytes in the seekable-format footer.
pub(crate) const SEEK_TABLE_FOOTER_SIZE: usize = 9;
/// Magic number terminating the seekable-format footer, little-endian.
pub(crate) const SEEKABLE_MAGIC_NUMBER: u32 = 0x8F92_EAB1;
/// Size of a skippable frame header: 4-byte magic plus 4-byte length.
pub(crate) const SKIPPABLE_HEADER_SIZE: usize = 8;
/// First magic value of the skippable-frame range.
pub(crate) const SKIPPABLE_MAGIC_START: u32 = 0x184D_2A50;
/// Mask selecting the fixed bits of a skippable-frame magic.
pub(crate) const SKIPPABLE_MAGIC_MASK: u32 = 0xFFFF_FFF0;

/// Reads a little-endian `u32` at `offset`. Callers guarantee bounds.
pub(crate) fn read_le32(buf: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

/// A single frame boundary in the compressed stream.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JumpTableRecord {
    /// Offset into the compressed stream where the frame begins.
    pub compressed_pos: u64,
    /// Uncompressed position of the first byte the frame decodes to.
    pub uncompressed_pos: u64,
}

/// Where to start decoding to reach a requested uncompressed position.
///
/// Produced by [`JumpTable::lookup`]: decoding starts at
/// `compressed_offset` and the first `uncompressed_offset` decoded bytes
/// are discarded to land exactly on the requested position.
#[derive(Debug, Default, Clone, Copy)]
pub struct JumpCoordinate {
    /// Compressed offset of the frame to feed to the decoder.
    pub compressed_offset: u64,
    /// Decoded bytes to discard before the requested position is reached.
    pub uncompressed_offset: u64,
    /// The record this coordinate was derived from.
    pub record: JumpTableRecord,
}

/// The sparse frame index over a compressed stream.
///
/// Most callers never touch this directly; [`SeekReader`] grows and
/// queries it on demand. It is exposed for inspection and for advanced
/// use where the caller builds the index from an external catalog with
/// [`push`].
///
/// [`SeekReader`]: crate::SeekReader
/// [`push`]: JumpTable::push
#[derive(Debug, Default, Clone)]
pub struct JumpTable {
    records: Vec<JumpTableRecord>,
    fully_initialized: bool,
}

impl JumpTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a frame boundary record.
    ///
    /// The caller guarantees monotonicity: both positions must be greater
    /// than those of the last record. The contract is debug-asserted. The
    /// final record of a complete table is special: its positions are the
    /// total compressed and uncompressed sizes of the stream.
    pub fn push(&mut self, compressed_pos: u64, uncompressed_pos: u64) {
        debug_assert!(
            self.records.last().map_or(true, |r| {
                r.compressed_pos < compressed_pos && r.uncompressed_pos < uncompressed_pos
            }),
            "jump table records must be strictly increasing on both axes"
        );
        self.records.push(JumpTableRecord {
            compressed_pos,
            uncompressed_pos,
        });
    }

    /// The records discovered so far, in stream order.
    pub fn records(&self) -> &[JumpTableRecord] {
        &self.records
    }

    /// Number of records in the table.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no frame boundary has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns `true` once every frame of the stream has been discovered
    /// and the trailing sentinel record is in place.
    pub fn is_fully_initialized(&self) -> bool {
        self.fully_initialized
    }

    pub(crate) fn mark_fully_initialized(&mut self) {
        self.fully_initialized = true;
    }

    pub(crate) fn last(&self) -> Option<JumpTableRecord> {
        self.records.last().copied()
    }

    /// Uncompressed position of the last known frame boundary; the total
    /// decompressed size once the table is fully initialized.
    pub fn last_uncompressed_pos(&self) -> u64 {
        self.records.last().map_or(0, |r| r.uncompressed_pos)
    }

    /// Finds the frame containing `uncompressed_pos`.
    ///
    /// Binary-searches for the greatest record whose `uncompressed_pos`
    /// does not exceed the requested position. An empty table yields the
    /// degenerate coordinate `(0, uncompressed_pos)`, which the engine
    /// treats as "start decoding from the beginning of the stream".
    pub fn lookup(&self, uncompressed_pos: u64) -> JumpCoordinate {
        let idx = self
            .records
            .partition_point(|r| r.uncompressed_pos <= uncompressed_pos);
        if idx == 0 {
            return JumpCoordinate {
                compressed_offset: 0,
                uncompressed_offset: uncompressed_pos,
                record: JumpTableRecord::default(),
            };
        }
        let record = self.records[idx - 1];
        JumpCoordinate {
            compressed_offset: record.compressed_pos,
            uncompressed_offset: uncompressed_pos - record.uncompressed_pos,
            record,
        }
    }

    /// Tries to build the full table from a trailing seekable-format
    /// footer.
    ///
    /// Returns `true` on success, with the table fully initialized.
    /// Returns `false` when `src` carries no footer or a malformed one;
    /// the table is left untouched and the caller falls back to the
    /// progressive scan. Only attempted on an empty table, so records
    /// added by hand or by a partial scan are never clobbered.
    pub(crate) fn parse_seekable_footer(&mut self, src: &[u8]) -> bool {
        if !self.records.is_empty() {
            return false;
        }
        let min_len = SEEK_TABLE_FOOTER_SIZE + SKIPPABLE_HEADER_SIZE;
        if src.len() < min_len {
            return false;
        }

        let footer = &src[src.len() - SEEK_TABLE_FOOTER_SIZE..];
        if read_le32(footer, 5) != SEEKABLE_MAGIC_NUMBER {
            return false;
        }

        let descriptor = footer[4];
        if (descriptor >> 2) & 0x1f != 0 {
            debug!(
                descriptor,
                "reserved seek table descriptor bits set, ignoring seek table"
            );
            return false;
        }
        let with_checksum = descriptor >> 7 == 1;

        let num_frames = read_le32(footer, 0);
        let size_per_entry: u64 = if with_checksum { 12 } else { 8 };
        let table_size = u64::from(num_frames) * size_per_entry;
        let frame_size = table_size + min_len as u64;

        let Some(frame_at) = (src.len() as u64).checked_sub(frame_size) else {
            debug!(frame_size, "seek table frame larger than source, ignoring");
            return false;
        };
        let frame = &src[frame_at as usize..];

        let header_magic = read_le32(frame, 0);
        if header_magic != (SKIPPABLE_MAGIC_START | 0xE) {
            debug!(
                header_magic,
                "seek table frame header does not match skippable magic, ignoring"
            );
            return false;
        }
        let header_size = u64::from(read_le32(frame, 4));
        if header_size + SKIPPABLE_HEADER_SIZE as u64 != frame_size {
            debug!(
                header_size,
                frame_size, "seek table frame size field mismatch, ignoring"
            );
            return false;
        }

        let table = &frame[SKIPPABLE_HEADER_SIZE..];
        let mut c_offset = 0u64;
        let mut d_offset = 0u64;
        for i in 0..num_frames as usize {
            let compressed = read_le32(table, i * size_per_entry as usize);
            let decompressed = read_le32(table, i * size_per_entry as usize + 4);
            // A zero-sized entry would break the strict ordering of the
            // records; treat the whole table as malformed.
            if compressed == 0 || decompressed == 0 {
                debug!(entry = i, "zero-sized seek table entry, ignoring seek table");
                self.records.clear();
                return false;
            }
            self.push(c_offset, d_offset);
            c_offset += u64::from(compressed);
            d_offset += u64::from(decompressed);
        }
        self.push(c_offset, d_offset);

        self.fully_initialized = true;
        true
    }
}
