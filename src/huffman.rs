//! Canonical Huffman decoding and encoding for the `HUFFMAN` integer and
//! byte array encodings.

use std::collections::HashMap;
use std::io;

use crate::bitio::{BitReader, BitWriter};

/// Assigns canonical codes to an alphabet given each symbol's bit length.
///
/// Symbols are ordered first by bit length, then by symbol value, and codes
/// are assigned in that order starting from 0, incrementing and shifting
/// left whenever the bit length increases.
fn build_canonical_code_book(alphabet: &[i32], bit_lens: &[u32]) -> Vec<(i32, u32, u32)> {
    let mut symbols: Vec<(i32, u32)> = alphabet
        .iter()
        .copied()
        .zip(bit_lens.iter().copied())
        .collect();

    symbols.sort_by_key(|&(symbol, bit_len)| (bit_len, symbol));

    let mut code_book = Vec::with_capacity(symbols.len());
    let mut code = 0u32;
    let mut prev_bit_len = 0u32;

    for (symbol, bit_len) in symbols {
        if bit_len > prev_bit_len {
            code <<= bit_len - prev_bit_len;
            prev_bit_len = bit_len;
        }

        code_book.push((symbol, bit_len, code));
        code += 1;
    }

    code_book
}

/// Decodes symbols encoded with a canonical Huffman code.
#[derive(Debug, Clone)]
pub struct CanonicalHuffmanDecoder {
    decode_table: Vec<(u32, Vec<(u32, i32)>)>,
}

impl CanonicalHuffmanDecoder {
    pub fn new(alphabet: &[i32], bit_lens: &[u32]) -> Self {
        let code_book = build_canonical_code_book(alphabet, bit_lens);

        let mut by_len: HashMap<u32, Vec<(u32, i32)>> = HashMap::new();

        for (symbol, bit_len, code) in code_book {
            by_len.entry(bit_len).or_default().push((code, symbol));
        }

        let mut decode_table: Vec<(u32, Vec<(u32, i32)>)> = by_len.into_iter().collect();
        decode_table.sort_by_key(|&(bit_len, _)| bit_len);

        Self { decode_table }
    }

    /// Returns the decoder's lone symbol when the alphabet has exactly one
    /// member (a zero bit length code, read as zero bits).
    pub fn single_symbol(&self) -> Option<i32> {
        match self.decode_table.as_slice() {
            [(0, codes)] if codes.len() == 1 => Some(codes[0].1),
            _ => None,
        }
    }

    pub fn decode(&self, reader: &mut BitReader<'_>) -> io::Result<i32> {
        if let Some(symbol) = self.single_symbol() {
            return Ok(symbol);
        }

        let mut code = 0u32;
        let mut len = 0u32;

        for (bit_len, codes) in &self.decode_table {
            while len < *bit_len {
                let bit = reader.read_bit()?;
                code = (code << 1) | bit;
                len += 1;
            }

            if let Some(&(_, symbol)) = codes.iter().find(|&&(c, _)| c == code) {
                return Ok(symbol);
            }
        }

        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "no matching huffman code",
        ))
    }
}

/// Encodes symbols with a canonical Huffman code.
#[derive(Debug, Clone)]
pub struct CanonicalHuffmanEncoder {
    code_book: HashMap<i32, (u32, u32)>,
}

impl CanonicalHuffmanEncoder {
    pub fn new(alphabet: &[i32], bit_lens: &[u32]) -> Self {
        let code_book = build_canonical_code_book(alphabet, bit_lens)
            .into_iter()
            .map(|(symbol, bit_len, code)| (symbol, (code, bit_len)))
            .collect();

        Self { code_book }
    }

    pub fn encode(&self, writer: &mut BitWriter, symbol: i32) -> io::Result<()> {
        let &(code, bit_len) = self.code_book.get(&symbol).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "symbol not in huffman alphabet")
        })?;

        if bit_len == 0 {
            return Ok(());
        }

        writer.write_u32(code, bit_len as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_canonical_code_book() {
        let alphabet = [65, 66, 67, 68];
        let bit_lens = [2, 1, 3, 3];

        let code_book = build_canonical_code_book(&alphabet, &bit_lens);

        assert_eq!(
            code_book,
            [(66, 1, 0b0), (65, 2, 0b10), (67, 3, 0b110), (68, 3, 0b111)]
        );
    }

    #[test]
    fn test_round_trip() -> io::Result<()> {
        let alphabet = [65, 66, 67, 68];
        let bit_lens = [2, 1, 3, 3];

        let encoder = CanonicalHuffmanEncoder::new(&alphabet, &bit_lens);
        let decoder = CanonicalHuffmanDecoder::new(&alphabet, &bit_lens);

        let mut writer = BitWriter::default();

        for &symbol in &[65, 66, 67, 68, 66, 65] {
            encoder.encode(&mut writer, symbol)?;
        }

        let buf = writer.finish()?;
        let mut reader = BitReader::new(&buf);

        for &expected in &[65, 66, 67, 68, 66, 65] {
            assert_eq!(decoder.decode(&mut reader)?, expected);
        }

        Ok(())
    }

    #[test]
    fn test_single_symbol_alphabet() -> io::Result<()> {
        let alphabet = [42];
        let bit_lens = [0];

        let decoder = CanonicalHuffmanDecoder::new(&alphabet, &bit_lens);
        let mut reader = BitReader::new(&[]);

        assert_eq!(decoder.decode(&mut reader)?, 42);

        Ok(())
    }
}
