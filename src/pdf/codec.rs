//! Lossless compression of trimmed page bitmaps.
//!
//! Pages are compressed once by the background rasterizer and decompressed
//! many times by the UI thread, so the encoder runs at the fastest zlib level.
//! The zlib container carries an Adler-32 checksum, which lets the cache tell
//! a damaged buffer apart from a valid one.

use std::io::{self, Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

#[derive(Clone, Copy, Debug)]
pub struct Compressor {
    level: Compression,
}

impl Default for Compressor {
    fn default() -> Self {
        Self::fast()
    }
}

impl Compressor {
    #[must_use]
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }

    #[must_use]
    pub fn fast() -> Self {
        Self {
            level: Compression::fast(),
        }
    }

    pub fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 4 + 64), self.level);
        encoder.write_all(data)?;
        encoder.finish()
    }
}

/// Decompress into `out`, replacing its contents.
///
/// At most `expected + 1` bytes are produced so an oversized stream shows up
/// as a length mismatch instead of an unbounded allocation. Returns the
/// number of bytes written.
pub fn decompress_into(compressed: &[u8], out: &mut Vec<u8>, expected: usize) -> io::Result<usize> {
    out.clear();
    ZlibDecoder::new(compressed)
        .take(expected as u64 + 1)
        .read_to_end(out)
}
