//! The 5x4 base-substitution code table (the `SM` preservation map entry).

use std::io;

const BASES: [u8; 5] = [b'A', b'C', b'G', b'T', b'N'];

/// Maps a `(reference base, substitution code)` pair to the substituted
/// base, per CRAM's fixed 5-byte packed table.
///
/// Each reference base (A, C, G, T, N) has its own ordering of the other
/// four bases, indexed 0-3 by a 2-bit code. The table is packed 2 bits per
/// code, 4 codes per reference base, one byte per reference base.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SubstitutionMatrix {
    // codes[reference_base_index][code] = substituted base
    codes: [[u8; 4]; 5],
}

impl SubstitutionMatrix {
    /// Builds a matrix from the standard base ordering, using each
    /// reference base's remaining three bases (alphabetical by ASCII,
    /// `N` last) followed by `N` as the fourth slot when the reference
    /// base itself is not `N`.
    pub fn default_for_ordering() -> Self {
        let mut codes = [[0u8; 4]; 5];

        for (i, &ref_base) in BASES.iter().enumerate() {
            let others: Vec<u8> = BASES.iter().copied().filter(|&b| b != ref_base).collect();
            codes[i].copy_from_slice(&others);
        }

        Self { codes }
    }

    pub fn substituted_base(&self, reference_base: u8, code: u8) -> io::Result<u8> {
        let i = base_index(reference_base)?;

        if code > 3 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid substitution code: {code}"),
            ));
        }

        Ok(self.codes[i][usize::from(code)])
    }

    pub fn code(&self, reference_base: u8, read_base: u8) -> io::Result<u8> {
        let i = base_index(reference_base)?;

        self.codes[i]
            .iter()
            .position(|&b| b == read_base)
            .map(|code| code as u8)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("{read_base} is not a substitution of {reference_base}"),
                )
            })
    }

    pub fn to_bytes(self) -> [u8; 5] {
        let mut bytes = [0u8; 5];

        for (i, row) in self.codes.iter().enumerate() {
            let mut byte = 0u8;

            for (code, &base) in row.iter().enumerate() {
                let rank = BASES.iter().position(|&b| b == base).unwrap_or(4) as u8;
                byte |= rank << (code * 2);
            }

            bytes[i] = byte;
        }

        bytes
    }

    pub fn from_bytes(bytes: [u8; 5]) -> Self {
        let mut codes = [[0u8; 4]; 5];

        for (i, &byte) in bytes.iter().enumerate() {
            for code in 0..4 {
                let rank = (byte >> (code * 2)) & 0x03;
                codes[i][code] = BASES[usize::from(rank)];
            }
        }

        Self { codes }
    }
}

impl Default for SubstitutionMatrix {
    fn default() -> Self {
        Self::default_for_ordering()
    }
}

fn base_index(base: u8) -> io::Result<usize> {
    BASES
        .iter()
        .position(|&b| b == base)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, format!("not a base: {base}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_round_trip() {
        let matrix = SubstitutionMatrix::default_for_ordering();
        let bytes = matrix.to_bytes();
        let roundtripped = SubstitutionMatrix::from_bytes(bytes);

        assert_eq!(matrix, roundtripped);
    }

    #[test]
    fn test_code_and_substituted_base_are_inverses() -> io::Result<()> {
        let matrix = SubstitutionMatrix::default_for_ordering();

        for &read_base in &[b'C', b'G', b'T', b'N'] {
            let code = matrix.code(b'A', read_base)?;
            assert_eq!(matrix.substituted_base(b'A', code)?, read_base);
        }

        Ok(())
    }

    #[test]
    fn test_invalid_base() {
        let matrix = SubstitutionMatrix::default_for_ordering();
        assert!(matrix.code(b'X', b'A').is_err());
    }
}
