use std::io::{self, Read, Write};

use xz2::{read::XzDecoder, write::XzEncoder};

use super::Compressor;

/// The `LZMA` block codec.
pub struct Lzma;

impl Compressor for Lzma {
    fn compress(&self, src: &[u8]) -> io::Result<Vec<u8>> {
        let mut encoder = XzEncoder::new(Vec::new(), 6);
        encoder.write_all(src)?;
        encoder.finish()
    }

    fn decompress(&self, src: &[u8], uncompressed_size: usize) -> io::Result<Vec<u8>> {
        let mut dst = Vec::with_capacity(uncompressed_size);
        XzDecoder::new(src).read_to_end(&mut dst)?;
        Ok(dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() -> io::Result<()> {
        let src = b"noodles-cram noodles-cram noodles-cram".to_vec();
        let compressed = Lzma.compress(&src)?;
        let decompressed = Lzma.decompress(&compressed, src.len())?;
        assert_eq!(decompressed, src);
        Ok(())
    }
}
