use std::io;

/// The encoding id byte stored ahead of an encoding's parameters.
///
/// Only the CRAM 2.1/3.0 encodings are represented; the variable-length
/// integer encodings introduced for CRAM 4 have no place in this format
/// version and are never produced or accepted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Kind {
    Null = 0,
    External = 1,
    Golomb = 2,
    Huffman = 3,
    ByteArrayLength = 4,
    ByteArrayStop = 5,
    Beta = 6,
    Subexp = 7,
    GolombRice = 8,
    Gamma = 9,
}

impl Kind {
    pub fn from_u8(n: u8) -> io::Result<Self> {
        match n {
            0 => Ok(Self::Null),
            1 => Ok(Self::External),
            2 => Ok(Self::Golomb),
            3 => Ok(Self::Huffman),
            4 => Ok(Self::ByteArrayLength),
            5 => Ok(Self::ByteArrayStop),
            6 => Ok(Self::Beta),
            7 => Ok(Self::Subexp),
            8 => Ok(Self::GolombRice),
            9 => Ok(Self::Gamma),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid encoding kind: {n}"),
            )),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() -> io::Result<()> {
        for kind in [
            Kind::Null,
            Kind::External,
            Kind::Golomb,
            Kind::Huffman,
            Kind::ByteArrayLength,
            Kind::ByteArrayStop,
            Kind::Beta,
            Kind::Subexp,
            Kind::GolombRice,
            Kind::Gamma,
        ] {
            assert_eq!(Kind::from_u8(kind.as_u8())?, kind);
        }

        Ok(())
    }
}
