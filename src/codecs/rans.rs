use std::io::{self, Read, Write};

use crate::num::{read_u16_le, read_u32_le, write_u16_le, write_u32_le};

use super::Compressor;

/// The `RANS4x8` block codec.
///
/// CRAM has no off-the-shelf crate for this; this is a from-scratch
/// order-0 static range-ANS coder (a single-stream rendition of the
/// algorithm; the reference codec interleaves four states for SIMD
/// throughput, which has no bearing on the compressed semantics). Only
/// order 0 is implemented: the leading order byte is always 0 on encode,
/// and decode rejects any other value.
pub struct Rans4x8;

const PROB_BITS: u32 = 12;
const PROB_SCALE: u32 = 1 << PROB_BITS;
const RANS_L: u32 = 1 << 23;

struct FrequencyTable {
    freq: [u32; 256],
    cum_freq: [u32; 256],
}

impl FrequencyTable {
    fn build(src: &[u8]) -> Self {
        let mut counts = [0u64; 256];

        for &b in src {
            counts[usize::from(b)] += 1;
        }

        let total: u64 = counts.iter().sum();
        let mut freq = [0u32; 256];

        if total > 0 {
            for (i, &count) in counts.iter().enumerate() {
                if count > 0 {
                    let scaled = ((count * u64::from(PROB_SCALE)) / total).max(1);
                    freq[i] = scaled as u32;
                }
            }

            // Normalize so frequencies sum to exactly PROB_SCALE.
            let mut sum: i64 = freq.iter().map(|&f| i64::from(f)).sum();
            let mut order: Vec<usize> = (0..256).filter(|&i| freq[i] > 0).collect();
            order.sort_by_key(|&i| std::cmp::Reverse(counts[i]));

            let mut idx = 0;
            while sum != i64::from(PROB_SCALE) && !order.is_empty() {
                let i = order[idx % order.len()];
                if sum > i64::from(PROB_SCALE) {
                    if freq[i] > 1 {
                        freq[i] -= 1;
                        sum -= 1;
                    }
                } else {
                    freq[i] += 1;
                    sum += 1;
                }
                idx += 1;
            }
        }

        let mut cum_freq = [0u32; 256];
        let mut running = 0u32;

        for i in 0..256 {
            cum_freq[i] = running;
            running += freq[i];
        }

        Self { freq, cum_freq }
    }

    fn from_table(freq: [u32; 256]) -> Self {
        let mut cum_freq = [0u32; 256];
        let mut running = 0u32;

        for i in 0..256 {
            cum_freq[i] = running;
            running += freq[i];
        }

        Self { freq, cum_freq }
    }

    fn symbol_at(&self, cum: u32) -> u8 {
        // Linear scan is sufficient: the alphabet is 256 symbols.
        for s in 0..256 {
            let lo = self.cum_freq[s];
            let hi = lo + self.freq[s];

            if cum >= lo && cum < hi {
                return s as u8;
            }
        }

        unreachable!("cumulative frequency out of range")
    }

    fn write<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: Write,
    {
        let symbols: Vec<usize> = (0..256).filter(|&i| self.freq[i] > 0).collect();
        write_u16_le(writer, symbols.len() as u16)?;

        for i in symbols {
            writer.write_all(&[i as u8])?;
            write_u16_le(writer, self.freq[i] as u16)?;
        }

        Ok(())
    }

    fn read<R>(reader: &mut R) -> io::Result<Self>
    where
        R: Read,
    {
        let mut freq = [0u32; 256];
        let n = read_u16_le(reader)?;

        for _ in 0..n {
            let mut sym = [0u8; 1];
            reader.read_exact(&mut sym)?;
            let f = read_u16_le(reader)?;
            freq[usize::from(sym[0])] = u32::from(f);
        }

        Ok(Self::from_table(freq))
    }
}

impl Compressor for Rans4x8 {
    fn compress(&self, src: &[u8]) -> io::Result<Vec<u8>> {
        let table = FrequencyTable::build(src);

        let mut groups: Vec<Vec<u8>> = Vec::with_capacity(src.len());
        let mut state = RANS_L;

        for &b in src.iter().rev() {
            let freq = table.freq[usize::from(b)];
            let cum_freq = table.cum_freq[usize::from(b)];

            if freq == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "symbol missing from frequency table",
                ));
            }

            let x_max = ((RANS_L >> PROB_BITS) << 8) * freq;
            let mut local = Vec::new();

            while state >= x_max {
                local.push((state & 0xff) as u8);
                state >>= 8;
            }

            local.reverse();
            groups.push(local);

            state = ((state / freq) << PROB_BITS) + (state % freq) + cum_freq;
        }

        groups.reverse();

        let mut out = Vec::new();
        out.push(0u8); // order 0
        write_u32_le(&mut out, src.len() as u32)?;
        table.write(&mut out)?;
        write_u32_le(&mut out, state)?;

        for group in groups {
            out.extend(group);
        }

        Ok(out)
    }

    fn decompress(&self, src: &[u8], uncompressed_size: usize) -> io::Result<Vec<u8>> {
        let mut reader = src;

        let mut order = [0u8; 1];
        reader.read_exact(&mut order)?;

        if order[0] != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "unsupported rans order (only order 0 is implemented)",
            ));
        }

        let num_symbols = read_u32_le(&mut reader)? as usize;
        let table = FrequencyTable::read(&mut reader)?;
        let mut state = read_u32_le(&mut reader)?;

        let mut dst = Vec::with_capacity(num_symbols.min(uncompressed_size));

        for _ in 0..num_symbols {
            let cum = state & (PROB_SCALE - 1);
            let symbol = table.symbol_at(cum);
            let freq = table.freq[usize::from(symbol)];
            let cum_freq = table.cum_freq[usize::from(symbol)];

            state = freq * (state >> PROB_BITS) + cum - cum_freq;

            while state < RANS_L {
                let mut byte = [0u8; 1];
                reader.read_exact(&mut byte)?;
                state = (state << 8) | u32::from(byte[0]);
            }

            dst.push(symbol);
        }

        Ok(dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_empty() -> io::Result<()> {
        let src: Vec<u8> = Vec::new();
        let compressed = Rans4x8.compress(&src)?;
        let decompressed = Rans4x8.decompress(&compressed, 0)?;
        assert_eq!(decompressed, src);
        Ok(())
    }

    #[test]
    fn test_round_trip_single_symbol() -> io::Result<()> {
        let src = vec![b'A'; 64];
        let compressed = Rans4x8.compress(&src)?;
        let decompressed = Rans4x8.decompress(&compressed, src.len())?;
        assert_eq!(decompressed, src);
        Ok(())
    }

    #[test]
    fn test_round_trip_mixed_alphabet() -> io::Result<()> {
        let src = b"noodles-cram is a crate for reading and writing CRAM files".to_vec();
        let compressed = Rans4x8.compress(&src)?;
        let decompressed = Rans4x8.decompress(&compressed, src.len())?;
        assert_eq!(decompressed, src);
        Ok(())
    }

    #[test]
    fn test_decode_rejects_order_1() {
        let data = [1u8, 0, 0, 0, 0];
        let result = Rans4x8.decompress(&data, 0);
        assert!(result.is_err());
    }
}
