//! Thin wrapper around the streaming Zstandard decoder.
//!
//! [`StreamDecoder`] owns a decompression session and a scratch output
//! buffer sized to the decoder's natural block size. One call to
//! [`decompress_step`] runs a single streaming step: it consumes
//! compressed bytes from the current frame and fills the scratch buffer,
//! whose produced/consumed cursors the read engine then drains through
//! [`drain_into`].
//!
//! [`decompress_step`]: StreamDecoder::decompress_step
//! [`drain_into`]: StreamDecoder::drain_into

use zstd::zstd_safe::{self, DCtx, InBuffer, OutBuffer, ResetDirective};

use crate::{Error, Result};

fn codec_error(code: zstd_safe::ErrorCode) -> Error {
    Error::Read(zstd_safe::get_error_name(code).to_string())
}

/// A streaming decompression session plus its scratch output block.
pub(crate) struct StreamDecoder {
    dctx: DCtx<'static>,
    scratch: Vec<u8>,
    /// Bytes of `scratch` filled by the most recent decompression step.
    out_len: usize,
    /// Bytes of the current production already delivered or discarded.
    out_consumed: usize,
}

impl StreamDecoder {
    pub(crate) fn new() -> Self {
        Self {
            dctx: DCtx::create(),
            scratch: vec![0u8; DCtx::out_size()],
            out_len: 0,
            out_consumed: 0,
        }
    }

    /// The decoder's natural output block size.
    pub(crate) fn block_size(&self) -> usize {
        self.scratch.len()
    }

    /// Runs one streaming step over `frame`, starting at `*input_pos`.
    ///
    /// Fills the scratch buffer from the beginning, resetting the
    /// produced/consumed cursors, and advances `*input_pos` by however
    /// many compressed bytes the decoder accepted. Any residual decoded
    /// bytes still in the scratch buffer are dropped, so callers drain
    /// them first.
    pub(crate) fn decompress_step(&mut self, frame: &[u8], input_pos: &mut usize) -> Result<()> {
        let mut input = InBuffer {
            src: frame,
            pos: *input_pos,
        };
        let mut output = OutBuffer::around(self.scratch.as_mut_slice());
        self.dctx
            .decompress_stream(&mut output, &mut input)
            .map_err(codec_error)?;
        *input_pos = input.pos;
        self.out_len = output.pos();
        self.out_consumed = 0;
        Ok(())
    }

    /// Copies decoded bytes not yet delivered into `out`, after skipping
    /// a discard prefix. Returns the number of bytes copied.
    ///
    /// `discard` is the intra-frame skip counter: when it covers the whole
    /// residual, the residual is dropped and `discard` decremented; when
    /// it is smaller, the skip is consumed entirely and up to `out.len()`
    /// of the remaining bytes are delivered.
    pub(crate) fn drain_into(&mut self, discard: &mut u64, out: &mut [u8]) -> usize {
        let residual = self.out_len - self.out_consumed;
        if *discard >= residual as u64 {
            *discard -= residual as u64;
            self.out_consumed = self.out_len;
            return 0;
        }

        let skip = *discard as usize;
        let n = (residual - skip).min(out.len());
        let start = self.out_consumed + skip;
        out[..n].copy_from_slice(&self.scratch[start..start + n]);
        self.out_consumed += skip + n;
        *discard = 0;
        n
    }

    /// Discards any mid-frame state, keeping the session's allocations.
    /// Invoked whenever the engine repositions to a non-sequential frame.
    pub(crate) fn reset_session(&mut self) {
        self.dctx
            .reset(ResetDirective::SessionOnly)
            .expect("resetting the session never fails");
        self.out_len = 0;
        self.out_consumed = 0;
    }
}

impl std::fmt::Debug for StreamDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamDecoder")
            .field("out_len", &self.out_len)
            .field("out_consumed", &self.out_consumed)
            .finish_non_exhaustive()
    }
}

/// Compressed size of the frame at the head of `src`.
///
/// Returns `None` at the end of the stream (empty input, or input that no
/// longer parses as a frame header); both terminate a forward scan.
pub(crate) fn find_frame_size(src: &[u8]) -> Option<usize> {
    if src.is_empty() {
        return None;
    }
    zstd_safe::find_frame_compressed_size(src)
        .ok()
        .filter(|size| *size > 0)
}

/// Returns `true` if `src` begins with a parseable Zstandard frame.
pub(crate) fn starts_with_frame(src: &[u8]) -> bool {
    find_frame_size(src).is_some()
}

/// Decompressed content size declared in the frame header at the head of
/// `frame`, or `None` when the header does not carry one (streaming
/// frames) or cannot be interpreted.
pub(crate) fn frame_content_size(frame: &[u8]) -> Option<u64> {
    zstd_safe::get_frame_content_size(frame)
        .ok()
        .flatten()
}

/// Decompresses one whole frame with a throwaway session, counting the
/// output bytes. Used by the progressive scan for frames whose header
/// does not declare a content size.
pub(crate) fn count_decompressed_size(frame: &[u8]) -> Result<u64> {
    let mut dctx = DCtx::create();
    let mut scratch = vec![0u8; DCtx::out_size()];
    let mut input = InBuffer::around(frame);
    let mut total = 0u64;
    let mut hint = 0;
    while input.pos < frame.len() {
        let mut output = OutBuffer::around(scratch.as_mut_slice());
        hint = dctx
            .decompress_stream(&mut output, &mut input)
            .map_err(codec_error)?;
        total += output.pos() as u64;
    }
    if hint != 0 {
        return Err(Error::Read(
            "unexpected end of frame, is the stream truncated?".into(),
        ));
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decompress_step_round_trip() {
        let original = b"a small payload that survives one streaming step";
        let frame = zstd::bulk::compress(original, 3).unwrap();

        let mut decoder = StreamDecoder::new();
        let mut input_pos = 0;
        let mut discard = 0u64;
        let mut out = vec![0u8; original.len()];
        let mut copied = 0;
        while input_pos < frame.len() {
            decoder.decompress_step(&frame, &mut input_pos).unwrap();
            copied += decoder.drain_into(&mut discard, &mut out[copied..]);
        }
        assert_eq!(copied, original.len());
        assert_eq!(&out, original);
    }

    #[test]
    fn test_drain_discard_covers_whole_production() {
        let original = b"0123456789";
        let frame = zstd::bulk::compress(original, 3).unwrap();

        let mut decoder = StreamDecoder::new();
        let mut input_pos = 0;
        decoder.decompress_step(&frame, &mut input_pos).unwrap();

        // Discard larger than the production: nothing copied, discard shrinks.
        let mut discard = 14u64;
        let mut out = [0u8; 10];
        assert_eq!(decoder.drain_into(&mut discard, &mut out), 0);
        assert_eq!(discard, 4);
    }

    #[test]
    fn test_drain_discard_prefix_then_copy() {
        let original = b"0123456789";
        let frame = zstd::bulk::compress(original, 3).unwrap();

        let mut decoder = StreamDecoder::new();
        let mut input_pos = 0;
        decoder.decompress_step(&frame, &mut input_pos).unwrap();

        let mut discard = 4u64;
        let mut out = [0u8; 3];
        assert_eq!(decoder.drain_into(&mut discard, &mut out), 3);
        assert_eq!(discard, 0);
        assert_eq!(&out, b"456");

        // The rest of the production is still drainable.
        let mut out = [0u8; 8];
        assert_eq!(decoder.drain_into(&mut 0, &mut out[..]), 3);
        assert_eq!(&out[..3], b"789");
    }

    #[test]
    fn test_decompress_step_rejects_garbage() {
        let garbage = vec![0x11u8; 64];
        let mut decoder = StreamDecoder::new();
        let mut input_pos = 0;
        let err = decoder.decompress_step(&garbage, &mut input_pos).unwrap_err();
        assert!(matches!(err, Error::Read(_)));
    }

    #[test]
    fn test_find_frame_size() {
        let frame = zstd::bulk::compress(b"frame one", 3).unwrap();
        assert_eq!(find_frame_size(&frame), Some(frame.len()));

        let mut two = frame.clone();
        two.extend_from_slice(&zstd::bulk::compress(b"frame two", 3).unwrap());
        assert_eq!(find_frame_size(&two), Some(frame.len()));

        assert_eq!(find_frame_size(&[]), None);
        assert_eq!(find_frame_size(&[0xFF; 8]), None);
    }

    #[test]
    fn test_frame_content_size_known_and_unknown() {
        let known = zstd::bulk::compress(b"known size", 3).unwrap();
        assert_eq!(frame_content_size(&known), Some(10));

        // The streaming encoder does not pledge a source size.
        let unknown = {
            use std::io::Write;
            let mut enc = zstd::stream::write::Encoder::new(Vec::new(), 3).unwrap();
            enc.write_all(b"unknown size").unwrap();
            enc.finish().unwrap()
        };
        assert_eq!(frame_content_size(&unknown), None);
        assert_eq!(count_decompressed_size(&unknown).unwrap(), 12);
    }

    #[test]
    fn test_count_decompressed_size_truncated_frame() {
        let frame = zstd::bulk::compress(&vec![7u8; 100_000], 3).unwrap();
        let err = count_decompressed_size(&frame[..frame.len() - 4]).unwrap_err();
        assert!(matches!(err, Error::Read(_)));
    }
}
