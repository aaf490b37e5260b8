//! Block compression codecs.
//!
//! Each CRAM block carries a compression method tag identifying which of
//! these codecs was used to produce its payload. [`Compressor`] is the
//! common interface the container/slice writers and readers compress and
//! decompress through; callers never need to match on [`Method`] directly.

mod bzip2;
mod gzip;
mod lzma;
mod raw;
mod rans;

use std::io;

/// Compression method tag stored in a block header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Method {
    Raw = 0,
    Gzip = 1,
    Bzip2 = 2,
    Lzma = 3,
    Rans4x8 = 4,
}

impl Method {
    pub fn from_u8(n: u8) -> io::Result<Self> {
        match n {
            0 => Ok(Self::Raw),
            1 => Ok(Self::Gzip),
            2 => Ok(Self::Bzip2),
            3 => Ok(Self::Lzma),
            4 => Ok(Self::Rans4x8),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unsupported compression method: {n}"),
            )),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns the codec implementing this method.
    pub fn compressor(self) -> &'static dyn Compressor {
        match self {
            Self::Raw => &raw::Raw,
            Self::Gzip => &gzip::Gzip,
            Self::Bzip2 => &bzip2::Bzip2,
            Self::Lzma => &lzma::Lzma,
            Self::Rans4x8 => &rans::Rans4x8,
        }
    }
}

/// A block compression codec.
///
/// Implementations are stateless: all per-block parameters (e.g. a
/// frequency table) are self-describing within the compressed payload.
pub trait Compressor: Sync {
    fn compress(&self, src: &[u8]) -> io::Result<Vec<u8>>;
    fn decompress(&self, src: &[u8], uncompressed_size: usize) -> io::Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_round_trip() -> io::Result<()> {
        for method in [
            Method::Raw,
            Method::Gzip,
            Method::Bzip2,
            Method::Lzma,
            Method::Rans4x8,
        ] {
            assert_eq!(Method::from_u8(method.as_u8())?, method);
        }

        Ok(())
    }

    #[test]
    fn test_from_u8_invalid() {
        assert!(Method::from_u8(255).is_err());
    }
}
