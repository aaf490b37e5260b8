//! Integer-valued encodings: the codecs available to any data series whose
//! per-record value is a single signed integer.

use std::io;

use crate::bitio::{BitReader, BitWriter};
use crate::huffman::{CanonicalHuffmanDecoder, CanonicalHuffmanEncoder};

use super::super::kind::Kind;

/// A codec for a single `i32` data series value.
///
/// [`Integer::External`] reads and writes ITF8 values against an external
/// byte stream keyed by its content id, never the core bitstream; every
/// other variant is a core-bitstream bit-level codec and is driven through
/// [`Integer::decode_core`] / [`Integer::encode_core`].
#[derive(Clone, Debug)]
pub enum Integer {
    External {
        block_content_id: i32,
    },
    Golomb {
        offset: i32,
        m: i32,
    },
    Huffman {
        alphabet: Vec<i32>,
        bit_lens: Vec<u32>,
        decoder: CanonicalHuffmanDecoder,
        encoder: CanonicalHuffmanEncoder,
    },
    Beta {
        offset: i32,
        len: u32,
    },
    Subexp {
        offset: i32,
        k: u32,
    },
    GolombRice {
        offset: i32,
        log2_m: u32,
    },
    Gamma {
        offset: i32,
    },
}

impl Integer {
    pub fn huffman(alphabet: Vec<i32>, bit_lens: Vec<u32>) -> Self {
        let decoder = CanonicalHuffmanDecoder::new(&alphabet, &bit_lens);
        let encoder = CanonicalHuffmanEncoder::new(&alphabet, &bit_lens);

        Self::Huffman {
            alphabet,
            bit_lens,
            decoder,
            encoder,
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Self::External { .. } => Kind::External,
            Self::Golomb { .. } => Kind::Golomb,
            Self::Huffman { .. } => Kind::Huffman,
            Self::Beta { .. } => Kind::Beta,
            Self::Subexp { .. } => Kind::Subexp,
            Self::GolombRice { .. } => Kind::GolombRice,
            Self::Gamma { .. } => Kind::Gamma,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Self::External { .. })
    }

    /// Decodes one value from the core bitstream.
    ///
    /// Panics if called on [`Integer::External`]; that variant has no
    /// bitstream representation and is decoded from an external byte
    /// stream instead.
    pub fn decode_core(&self, reader: &mut BitReader<'_>) -> io::Result<i32> {
        match self {
            Self::External { .. } => panic!("external integer encodings have no core representation"),
            Self::Golomb { offset, m } => decode_golomb(reader, *offset, *m),
            Self::Huffman { decoder, .. } => decoder.decode(reader),
            Self::Beta { offset, len } => decode_beta(reader, *offset, *len),
            Self::Subexp { offset, k } => decode_subexp(reader, *offset, *k),
            Self::GolombRice { offset, log2_m } => decode_golomb_rice(reader, *offset, *log2_m),
            Self::Gamma { offset } => decode_gamma(reader, *offset),
        }
    }

    /// Encodes one value into the core bitstream.
    pub fn encode_core(&self, writer: &mut BitWriter, value: i32) -> io::Result<()> {
        match self {
            Self::External { .. } => panic!("external integer encodings have no core representation"),
            Self::Golomb { offset, m } => encode_golomb(writer, *offset, *m, value),
            Self::Huffman { encoder, .. } => encoder.encode(writer, value),
            Self::Beta { offset, len } => encode_beta(writer, *offset, *len, value),
            Self::Subexp { offset, k } => encode_subexp(writer, *offset, *k, value),
            Self::GolombRice { offset, log2_m } => encode_golomb_rice(writer, *offset, *log2_m, value),
            Self::Gamma { offset } => encode_gamma(writer, *offset, value),
        }
    }
}

fn bit_length(n: u32) -> u32 {
    32 - n.leading_zeros()
}

fn encode_gamma(writer: &mut BitWriter, offset: i32, value: i32) -> io::Result<()> {
    let n = (value + offset) as u32;
    assert!(n >= 1, "gamma code requires a positive offset value");

    let len = bit_length(n);

    for _ in 1..len {
        writer.write_bit(0)?;
    }

    writer.write_u32(n, len as usize)
}

fn decode_gamma(reader: &mut BitReader<'_>, offset: i32) -> io::Result<i32> {
    let mut len = 1;

    while reader.read_bit()? == 0 {
        len += 1;
    }

    let mut n: u32 = 1;

    for _ in 1..len {
        let bit = reader.read_bit()?;
        n = (n << 1) | bit;
    }

    Ok(n as i32 - offset)
}

fn encode_beta(writer: &mut BitWriter, offset: i32, len: u32, value: i32) -> io::Result<()> {
    writer.write_u32((value + offset) as u32, len as usize)
}

fn decode_beta(reader: &mut BitReader<'_>, offset: i32, len: u32) -> io::Result<i32> {
    let n = reader.read_u32(len)?;
    Ok(n as i32 - offset)
}

/// Truncated binary encoding of `value` in the range `[0, m)`.
fn encode_truncated_binary(writer: &mut BitWriter, m: u32, value: u32) -> io::Result<()> {
    if m <= 1 {
        return Ok(());
    }

    let b = bit_length(m - 1).max(1);
    let cutoff = (1u32 << b) - m;

    if value < cutoff {
        writer.write_u32(value, (b - 1) as usize)
    } else {
        writer.write_u32(value + cutoff, b as usize)
    }
}

fn decode_truncated_binary(reader: &mut BitReader<'_>, m: u32) -> io::Result<u32> {
    if m <= 1 {
        return Ok(0);
    }

    let b = bit_length(m - 1).max(1);
    let cutoff = (1u32 << b) - m;

    let prefix = reader.read_u32(b - 1)?;

    if prefix < cutoff {
        Ok(prefix)
    } else {
        let bit = reader.read_bit()?;
        let full = (prefix << 1) | bit;
        Ok(full - cutoff)
    }
}

fn encode_golomb(writer: &mut BitWriter, offset: i32, m: i32, value: i32) -> io::Result<()> {
    let n = (value + offset) as u32;
    let m = m as u32;

    let q = n / m;
    let r = n % m;

    for _ in 0..q {
        writer.write_bit(0)?;
    }
    writer.write_bit(1)?;

    encode_truncated_binary(writer, m, r)
}

fn decode_golomb(reader: &mut BitReader<'_>, offset: i32, m: i32) -> io::Result<i32> {
    let m = m as u32;

    let mut q = 0u32;
    while reader.read_bit()? == 0 {
        q += 1;
    }

    let r = decode_truncated_binary(reader, m)?;
    let n = q * m + r;

    Ok(n as i32 - offset)
}

fn encode_golomb_rice(writer: &mut BitWriter, offset: i32, log2_m: u32, value: i32) -> io::Result<()> {
    let n = (value + offset) as u32;
    let q = n >> log2_m;
    let r = n & ((1 << log2_m) - 1);

    for _ in 0..q {
        writer.write_bit(0)?;
    }
    writer.write_bit(1)?;

    writer.write_u32(r, log2_m as usize)
}

fn decode_golomb_rice(reader: &mut BitReader<'_>, offset: i32, log2_m: u32) -> io::Result<i32> {
    let mut q = 0u32;
    while reader.read_bit()? == 0 {
        q += 1;
    }

    let r = reader.read_u32(log2_m)?;
    let n = (q << log2_m) | r;

    Ok(n as i32 - offset)
}

/// Subexponential code: a geometrically tiered generalization of
/// Golomb-Rice. Values below `2^k` are stored directly in `k` bits
/// (tier `u = 0`, a single terminating `0` bit); each higher tier doubles
/// the covered range and costs one extra leading `1` bit.
fn encode_subexp(writer: &mut BitWriter, offset: i32, k: u32, value: i32) -> io::Result<()> {
    let n = (value + offset) as u32;

    if n < (1 << k) {
        writer.write_bit(0)?;
        return writer.write_u32(n, k as usize);
    }

    let mut u = 1;
    loop {
        let b = u + k - 1;
        if n < (1u32 << (b + 1)) {
            break;
        }
        u += 1;
    }

    let b = u + k - 1;

    for _ in 0..u {
        writer.write_bit(1)?;
    }
    writer.write_bit(0)?;

    let base = n - (1 << b);
    writer.write_u32(base, b as usize)
}

fn decode_subexp(reader: &mut BitReader<'_>, offset: i32, k: u32) -> io::Result<i32> {
    let mut u = 0;
    while reader.read_bit()? == 1 {
        u += 1;
    }

    let n = if u == 0 {
        reader.read_u32(k)?
    } else {
        let b = u + k - 1;
        let base = reader.read_u32(b)?;
        (1u32 << b) + base
    };

    Ok(n as i32 - offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip_core(encoding: &Integer, values: &[i32]) -> io::Result<()> {
        let mut writer = BitWriter::default();

        for &v in values {
            encoding.encode_core(&mut writer, v)?;
        }

        let buf = writer.finish()?;
        let mut reader = BitReader::new(&buf);

        for &v in values {
            assert_eq!(encoding.decode_core(&mut reader)?, v);
        }

        Ok(())
    }

    #[test]
    fn test_gamma_round_trip() -> io::Result<()> {
        let encoding = Integer::Gamma { offset: 1 };
        round_trip_core(&encoding, &[0, 1, 2, 3, 10, 100, 1000])
    }

    #[test]
    fn test_beta_round_trip() -> io::Result<()> {
        let encoding = Integer::Beta { offset: 0, len: 8 };
        round_trip_core(&encoding, &[0, 1, 127, 255])
    }

    #[test]
    fn test_golomb_round_trip() -> io::Result<()> {
        let encoding = Integer::Golomb { offset: 0, m: 5 };
        round_trip_core(&encoding, &[0, 1, 2, 3, 4, 5, 6, 7, 20, 100])
    }

    #[test]
    fn test_golomb_rice_round_trip() -> io::Result<()> {
        let encoding = Integer::GolombRice {
            offset: 0,
            log2_m: 3,
        };
        round_trip_core(&encoding, &[0, 1, 7, 8, 9, 100])
    }

    #[test]
    fn test_subexp_round_trip() -> io::Result<()> {
        let encoding = Integer::Subexp { offset: 0, k: 2 };
        round_trip_core(&encoding, &[0, 1, 2, 3, 4, 5, 10, 50, 1000, 100000])
    }

    #[test]
    fn test_huffman_round_trip() -> io::Result<()> {
        let encoding = Integer::huffman(vec![65, 66, 67], vec![1, 2, 2]);
        round_trip_core(&encoding, &[65, 66, 67, 65, 65])
    }

    #[test]
    fn test_kind() {
        assert_eq!(
            Integer::External { block_content_id: 0 }.kind(),
            Kind::External
        );
        assert_eq!(Integer::Gamma { offset: 0 }.kind(), Kind::Gamma);
    }
}
