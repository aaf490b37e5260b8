//! Byte-array-valued encodings: read names, tag values, and other
//! variable-length byte payloads.

use std::io::{self, Read, Write};

use crate::bitio::BitReader;
use crate::num::{read_itf8, write_itf8};

use super::super::kind::Kind;
use super::integer::Integer;

/// A codec for a single variable-length byte array value.
#[derive(Clone, Debug)]
pub enum ByteArray {
    /// Reads bytes from an external stream until `stop_byte` is seen.
    ByteArrayStop { stop_byte: u8, block_content_id: i32 },
    /// Reads a length (via a nested integer encoding) then that many bytes
    /// from an external stream.
    ByteArrayLength {
        len_encoding: Box<Integer>,
        value_block_content_id: i32,
    },
}

impl ByteArray {
    pub fn kind(&self) -> Kind {
        match self {
            Self::ByteArrayStop { .. } => Kind::ByteArrayStop,
            Self::ByteArrayLength { .. } => Kind::ByteArrayLength,
        }
    }

    /// Decodes one value.
    ///
    /// `core` backs any non-`External` length sub-encoding; `len_reader`
    /// backs an `External` length sub-encoding; `data_reader` is always the
    /// stream the payload bytes themselves are read from.
    pub fn decode<L, D>(
        &self,
        core: &mut BitReader<'_>,
        len_reader: &mut L,
        data_reader: &mut D,
    ) -> io::Result<Vec<u8>>
    where
        L: Read,
        D: Read,
    {
        match self {
            Self::ByteArrayStop { stop_byte, .. } => {
                let mut buf = Vec::new();
                let mut byte = [0u8; 1];

                loop {
                    data_reader.read_exact(&mut byte)?;

                    if byte[0] == *stop_byte {
                        break;
                    }

                    buf.push(byte[0]);
                }

                Ok(buf)
            }
            Self::ByteArrayLength { len_encoding, .. } => {
                let len = if len_encoding.is_external() {
                    read_itf8(len_reader)?
                } else {
                    len_encoding.decode_core(core)?
                };

                let len = usize::try_from(len).map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidData, "negative byte array length")
                })?;

                let mut buf = vec![0u8; len];
                data_reader.read_exact(&mut buf)?;

                Ok(buf)
            }
        }
    }

    /// Encodes one value.
    pub fn encode<L, D>(
        &self,
        core: &mut crate::bitio::BitWriter,
        len_writer: &mut L,
        data_writer: &mut D,
        value: &[u8],
    ) -> io::Result<()>
    where
        L: Write,
        D: Write,
    {
        match self {
            Self::ByteArrayStop { stop_byte, .. } => {
                if value.contains(stop_byte) {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "byte array value contains the stop byte",
                    ));
                }

                data_writer.write_all(value)?;
                data_writer.write_all(&[*stop_byte])
            }
            Self::ByteArrayLength { len_encoding, .. } => {
                let len = i32::try_from(value.len()).map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidInput, "byte array too long")
                })?;

                if len_encoding.is_external() {
                    write_itf8(len_writer, len)?;
                } else {
                    len_encoding.encode_core(core, len)?;
                }

                data_writer.write_all(value)
            }
        }
    }

    pub fn block_content_id(&self) -> i32 {
        match self {
            Self::ByteArrayStop { block_content_id, .. } => *block_content_id,
            Self::ByteArrayLength {
                value_block_content_id,
                ..
            } => *value_block_content_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitio::BitWriter;

    #[test]
    fn test_byte_array_stop_round_trip() -> io::Result<()> {
        let encoding = ByteArray::ByteArrayStop {
            stop_byte: 0x00,
            block_content_id: 7,
        };

        let mut core_writer = BitWriter::default();
        let mut len_writer: Vec<u8> = Vec::new();
        let mut data_writer: Vec<u8> = Vec::new();

        encoding.encode(&mut core_writer, &mut len_writer, &mut data_writer, b"read-1")?;

        let mut data_reader = &data_writer[..];
        let mut len_reader = &len_writer[..];
        let core_buf = core_writer.finish()?;
        let mut core_reader = BitReader::new(&core_buf);

        let decoded = encoding.decode(&mut core_reader, &mut len_reader, &mut data_reader)?;
        assert_eq!(decoded, b"read-1");

        Ok(())
    }

    #[test]
    fn test_byte_array_length_external_round_trip() -> io::Result<()> {
        let encoding = ByteArray::ByteArrayLength {
            len_encoding: Box::new(Integer::External { block_content_id: 9 }),
            value_block_content_id: 9,
        };

        let mut core_writer = BitWriter::default();
        let mut len_writer: Vec<u8> = Vec::new();
        let mut data_writer: Vec<u8> = Vec::new();

        encoding.encode(&mut core_writer, &mut len_writer, &mut data_writer, b"ACGT")?;

        let mut data_reader = &data_writer[..];
        let mut len_reader = &len_writer[..];
        let core_buf = core_writer.finish()?;
        let mut core_reader = BitReader::new(&core_buf);

        let decoded = encoding.decode(&mut core_reader, &mut len_reader, &mut data_reader)?;
        assert_eq!(decoded, b"ACGT");

        Ok(())
    }
}
