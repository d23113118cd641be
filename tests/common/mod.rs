//! Shared test utilities for integration tests.
//!
//! Builders for the compressed fixtures the tests read back: known-size
//! frames, streaming frames without a declared content size, skippable
//! frames, and seekable-format streams with a trailing seek table.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test
//! file compiles as a separate crate and may only use a subset of these
//! helpers.

#![allow(dead_code)]

use std::io::Write;

/// First magic value of the skippable-frame range.
pub const SKIPPABLE_MAGIC_START: u32 = 0x184D_2A50;
/// Magic number terminating a seekable-format footer.
pub const SEEKABLE_MAGIC_NUMBER: u32 = 0x8F92_EAB1;

/// Compresses `data` into one frame whose header declares the content
/// size.
pub fn frame(data: &[u8]) -> Vec<u8> {
    zstd::bulk::compress(data, 3).expect("compression of test data never fails")
}

/// Compresses `data` into one frame with no content size in the header,
/// the way a streaming encoder writes it.
pub fn streaming_frame(data: &[u8]) -> Vec<u8> {
    let mut encoder =
        zstd::stream::write::Encoder::new(Vec::new(), 3).expect("encoder creation never fails");
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Concatenates one known-size frame per chunk.
pub fn concat_frames(chunks: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in chunks {
        out.extend_from_slice(&frame(chunk));
    }
    out
}

/// A skippable frame wrapping `payload`.
pub fn skippable_frame(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(SKIPPABLE_MAGIC_START | 0x3).to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

/// The seekable-format seek table (skippable frame plus 9-byte footer)
/// for the given `(compressed_size, decompressed_size)` pairs.
///
/// `descriptor` is the Seek Table Descriptor byte; pass `0` for the plain
/// no-checksum layout.
pub fn seek_table(entries: &[(u32, u32)], descriptor: u8) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(SKIPPABLE_MAGIC_START | 0xE).to_le_bytes());
    out.extend_from_slice(&((entries.len() * 8 + 9) as u32).to_le_bytes());
    for (compressed, decompressed) in entries {
        out.extend_from_slice(&compressed.to_le_bytes());
        out.extend_from_slice(&decompressed.to_le_bytes());
    }
    out.extend_from_slice(&(entries.len() as u32).to_le_bytes());
    out.push(descriptor);
    out.extend_from_slice(&SEEKABLE_MAGIC_NUMBER.to_le_bytes());
    out
}

/// Compresses each chunk into its own frame and appends a valid seek
/// table, producing a compliant seekable-format stream.
pub fn seekable_stream(chunks: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut entries = Vec::new();
    for chunk in chunks {
        let compressed = frame(chunk);
        entries.push((compressed.len() as u32, chunk.len() as u32));
        out.extend_from_slice(&compressed);
    }
    out.extend_from_slice(&seek_table(&entries, 0));
    out
}

/// Deterministic, compressible plaintext of the given length.
pub fn plaintext(len: usize) -> Vec<u8> {
    let pattern = b"the quick brown fox jumps over the lazy dog ";
    (0..len).map(|i| pattern[i % pattern.len()]).collect()
}
