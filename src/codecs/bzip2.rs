use std::io::{self, Read, Write};

use bzip2::{read::BzDecoder, write::BzEncoder, Compression};

use super::Compressor;

/// The `BZIP2` block codec.
pub struct Bzip2;

impl Compressor for Bzip2 {
    fn compress(&self, src: &[u8]) -> io::Result<Vec<u8>> {
        let mut encoder = BzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(src)?;
        encoder.finish()
    }

    fn decompress(&self, src: &[u8], uncompressed_size: usize) -> io::Result<Vec<u8>> {
        let mut dst = Vec::with_capacity(uncompressed_size);
        BzDecoder::new(src).read_to_end(&mut dst)?;
        Ok(dst)
    }
}
