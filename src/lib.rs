//! # zstd-seek
//!
//! Random-access decompression over concatenated Zstandard frames.
//!
//! A Zstandard stream is a sequence of independently decodable frames.
//! This crate indexes those frame boundaries in a [`JumpTable`] and uses
//! it to give you [`SeekReader`], a read-only, seekable handle on the
//! decompressed byte stream: position by absolute, relative or
//! end-relative offsets and read byte ranges, exactly as you would with
//! an ordinary file, while the underlying storage stays compressed.
//!
//! Streams produced with the Zstandard [seekable format] carry a frame
//! index in a trailing skippable frame; the reader parses it eagerly so
//! no scanning is needed. Any other concatenation of frames works too:
//! the index is then built by scanning frame headers, either up front or
//! lazily as positions are requested.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::io::SeekFrom;
//! use zstd_seek::{Result, SeekReader};
//!
//! fn main() -> Result<()> {
//!     let mut reader = SeekReader::open_path("data.zst")?;
//!
//!     println!("{} bytes uncompressed", reader.decompressed_size()?);
//!
//!     // Read bytes [1000, 1016) of the decompressed stream.
//!     let mut buf = [0u8; 16];
//!     reader.seek(SeekFrom::Start(1000))?;
//!     let n = reader.read(&mut buf)?;
//!     println!("{:?}", &buf[..n]);
//!     Ok(())
//! }
//! ```
//!
//! ## Opening a stream
//!
//! Three kinds of sources are supported, each with an eager and a lazy
//! factory:
//!
//! | Source | Eager | Lazy |
//! |--------|-------|------|
//! | Byte slice | [`SeekReader::from_bytes`] | [`SeekReader::from_bytes_without_jump_table`] |
//! | File path (mmap) | [`SeekReader::open_path`] | [`SeekReader::open_path_without_jump_table`] |
//! | File descriptor (mmap, unix) | [`SeekReader::from_fd`] | [`SeekReader::from_fd_without_jump_table`] |
//!
//! The lazy variants defer all indexing to the first seek or read. They
//! are not a micro-optimization: frames written by a streaming encoder
//! carry no content size in their header, so eager indexing has to
//! decompress them just to measure them. Lazy opening skips that cost
//! until (and unless) the relevant positions are actually used.
//!
//! ## Concurrency
//!
//! A [`SeekReader`] owns one decompression session and must not be shared
//! between threads; open one reader per thread over the same source
//! instead. The compressed range itself is only ever read.
//!
//! [seekable format]: https://github.com/facebook/zstd/tree/dev/contrib/seekable_format

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod error;
pub mod jump_table;
pub mod reader;

mod decoder;
mod source;

pub use error::{Error, Result};
pub use jump_table::{JumpCoordinate, JumpTable, JumpTableRecord};
pub use reader::SeekReader;
