//! Property-based tests using proptest.
//!
//! The central contract: for any plaintext split into frames at arbitrary
//! points, seeking to any offset and reading any length returns exactly
//! the bytes of the plaintext slice, no matter how the requests are
//! interleaved.

mod common;

use std::io::SeekFrom;

use proptest::prelude::*;
use zstd_seek::SeekReader;

/// A plaintext plus sorted, deduplicated split points inside it.
fn chunked_plaintext() -> impl Strategy<Value = (Vec<u8>, Vec<usize>)> {
    (64usize..2048).prop_flat_map(|len| {
        let splits = proptest::collection::vec(1..len, 0..6).prop_map(move |mut splits| {
            splits.sort_unstable();
            splits.dedup();
            splits
        });
        (Just(common::plaintext(len)), splits)
    })
}

fn frames_for(plain: &[u8], splits: &[usize]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut start = 0;
    for &split in splits {
        out.extend_from_slice(&common::frame(&plain[start..split]));
        start = split;
    }
    out.extend_from_slice(&common::frame(&plain[start..]));
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Any (seek, read) against the reader matches the plaintext slice.
    #[test]
    fn seek_read_matches_plaintext(
        (plain, splits) in chunked_plaintext(),
        requests in proptest::collection::vec((0.0f64..1.0, 1usize..256), 1..8),
    ) {
        let data = frames_for(&plain, &splits);
        let mut reader = SeekReader::from_bytes(&data).unwrap();
        prop_assert_eq!(reader.decompressed_size().unwrap(), plain.len() as u64);

        for (frac, len) in requests {
            let offset = (frac * plain.len() as f64) as usize;
            reader.seek(SeekFrom::Start(offset as u64)).unwrap();

            let mut buf = vec![0u8; len];
            let n = reader.read(&mut buf).unwrap();

            let expected = &plain[offset..(offset + len).min(plain.len())];
            prop_assert_eq!(n, expected.len());
            prop_assert_eq!(&buf[..n], expected);
            prop_assert_eq!(reader.position(), (offset + n) as u64);
        }
    }

    /// Sequential whole-stream reads reproduce the plaintext regardless of
    /// the read granularity.
    #[test]
    fn round_trip_any_granularity(
        (plain, splits) in chunked_plaintext(),
        step in 1usize..512,
    ) {
        let data = frames_for(&plain, &splits);
        let mut reader = SeekReader::from_bytes(&data).unwrap();

        let mut rebuilt = Vec::new();
        let mut buf = vec![0u8; step];
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            rebuilt.extend_from_slice(&buf[..n]);
        }
        prop_assert_eq!(rebuilt, plain);
    }

    /// The jump table stays strictly monotone on both axes for any frame
    /// layout.
    #[test]
    fn jump_table_is_monotone((plain, splits) in chunked_plaintext()) {
        let data = frames_for(&plain, &splits);
        let reader = SeekReader::from_bytes(&data).unwrap();
        for pair in reader.jump_table().records().windows(2) {
            prop_assert!(pair[0].compressed_pos < pair[1].compressed_pos);
            prop_assert!(pair[0].uncompressed_pos < pair[1].uncompressed_pos);
        }
    }
}
