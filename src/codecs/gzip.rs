use std::io::{self, Read, Write};

use flate2::{read::GzDecoder, write::GzEncoder, Compression};

use super::Compressor;

/// The `GZIP` block codec.
pub struct Gzip;

impl Compressor for Gzip {
    fn compress(&self, src: &[u8]) -> io::Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(src)?;
        encoder.finish()
    }

    fn decompress(&self, src: &[u8], uncompressed_size: usize) -> io::Result<Vec<u8>> {
        let mut dst = Vec::with_capacity(uncompressed_size);
        GzDecoder::new(src).read_to_end(&mut dst)?;
        Ok(dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() -> io::Result<()> {
        let src = b"noodles-cram noodles-cram noodles-cram".to_vec();
        let compressed = Gzip.compress(&src)?;
        let decompressed = Gzip.decompress(&compressed, src.len())?;
        assert_eq!(decompressed, src);
        Ok(())
    }
}
