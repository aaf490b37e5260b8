use std::io;

use super::Compressor;

/// The identity codec: block payloads are stored uncompressed.
pub struct Raw;

impl Compressor for Raw {
    fn compress(&self, src: &[u8]) -> io::Result<Vec<u8>> {
        Ok(src.to_vec())
    }

    fn decompress(&self, src: &[u8], uncompressed_size: usize) -> io::Result<Vec<u8>> {
        if src.len() != uncompressed_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "raw block size mismatch",
            ));
        }

        Ok(src.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() -> io::Result<()> {
        let src = b"noodles-cram".to_vec();
        let compressed = Raw.compress(&src)?;
        let decompressed = Raw.decompress(&compressed, src.len())?;
        assert_eq!(decompressed, src);
        Ok(())
    }
}
