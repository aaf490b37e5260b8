//! Encoding descriptors: `(kind, params)` pairs that select and
//! parameterize a per-data-series codec.

mod codec;
mod kind;

pub use self::{
    codec::{ByteArray, Integer},
    kind::Kind,
};

use std::io::{self, Read, Write};

use crate::num::{read_itf8, write_itf8, write_u8};

/// Either family of per-series codec, tagged by which value type it
/// produces.
#[derive(Clone, Debug)]
pub enum Encoding {
    Integer(Integer),
    ByteArray(ByteArray),
}

impl Encoding {
    pub fn kind(&self) -> Kind {
        match self {
            Self::Integer(e) => e.kind(),
            Self::ByteArray(e) => e.kind(),
        }
    }

    pub fn as_integer(&self) -> Option<&Integer> {
        match self {
            Self::Integer(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_byte_array(&self) -> Option<&ByteArray> {
        match self {
            Self::ByteArray(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Integer> for Encoding {
    fn from(encoding: Integer) -> Self {
        Self::Integer(encoding)
    }
}

impl From<ByteArray> for Encoding {
    fn from(encoding: ByteArray) -> Self {
        Self::ByteArray(encoding)
    }
}

/// Reads one `(kind, param_len, params)` descriptor, or `None` for `NULL`.
pub fn read_encoding<R>(reader: &mut R) -> io::Result<Option<Encoding>>
where
    R: Read,
{
    let mut kind_buf = [0u8; 1];
    reader.read_exact(&mut kind_buf)?;
    let kind = Kind::from_u8(kind_buf[0])?;

    let len = read_itf8(reader)?;
    let len = usize::try_from(len)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "negative encoding param length"))?;

    let mut params = vec![0u8; len];
    reader.read_exact(&mut params)?;

    if kind == Kind::Null {
        return Ok(None);
    }

    let mut cursor = &params[..];
    let encoding = decode_params(kind, &mut cursor)?;

    Ok(Some(encoding))
}

fn decode_params<R>(kind: Kind, reader: &mut R) -> io::Result<Encoding>
where
    R: Read,
{
    match kind {
        Kind::Null => unreachable!("null encodings are filtered out by the caller"),
        Kind::External => {
            let block_content_id = read_itf8(reader)?;
            Ok(Integer::External { block_content_id }.into())
        }
        Kind::Golomb => {
            let offset = read_itf8(reader)?;
            let m = read_itf8(reader)?;
            Ok(Integer::Golomb { offset, m }.into())
        }
        Kind::Huffman => {
            let alphabet_len = read_itf8(reader)? as usize;
            let mut alphabet = Vec::with_capacity(alphabet_len);
            for _ in 0..alphabet_len {
                alphabet.push(read_itf8(reader)?);
            }

            let bit_lens_len = read_itf8(reader)? as usize;
            let mut bit_lens = Vec::with_capacity(bit_lens_len);
            for _ in 0..bit_lens_len {
                bit_lens.push(read_itf8(reader)? as u32);
            }

            Ok(Integer::huffman(alphabet, bit_lens).into())
        }
        Kind::Beta => {
            let offset = read_itf8(reader)?;
            let len = read_itf8(reader)? as u32;
            Ok(Integer::Beta { offset, len }.into())
        }
        Kind::Subexp => {
            let offset = read_itf8(reader)?;
            let k = read_itf8(reader)? as u32;
            Ok(Integer::Subexp { offset, k }.into())
        }
        Kind::GolombRice => {
            let offset = read_itf8(reader)?;
            let log2_m = read_itf8(reader)? as u32;
            Ok(Integer::GolombRice { offset, log2_m }.into())
        }
        Kind::Gamma => {
            let offset = read_itf8(reader)?;
            Ok(Integer::Gamma { offset }.into())
        }
        Kind::ByteArrayStop => {
            let mut stop_byte = [0u8; 1];
            reader.read_exact(&mut stop_byte)?;
            let block_content_id = read_itf8(reader)?;

            Ok(ByteArray::ByteArrayStop {
                stop_byte: stop_byte[0],
                block_content_id,
            }
            .into())
        }
        Kind::ByteArrayLength => {
            let nested = read_encoding(reader)?.ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    "byte array length encoding cannot be null",
                )
            })?;

            let len_encoding = match nested {
                Encoding::Integer(i) => Box::new(i),
                Encoding::ByteArray(_) => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "byte array length sub-encoding must be an integer encoding",
                    ))
                }
            };

            let value_block_content_id = read_itf8(reader)?;

            Ok(ByteArray::ByteArrayLength {
                len_encoding,
                value_block_content_id,
            }
            .into())
        }
    }
}

/// Writes one `(kind, param_len, params)` descriptor, or the `NULL`
/// sentinel for `None`.
pub fn write_encoding<W>(writer: &mut W, encoding: Option<&Encoding>) -> io::Result<()>
where
    W: Write,
{
    let Some(encoding) = encoding else {
        write_u8(writer, Kind::Null.as_u8())?;
        return write_itf8(writer, 0);
    };

    let mut params = Vec::new();
    encode_params(encoding, &mut params)?;

    write_u8(writer, encoding.kind().as_u8())?;
    write_itf8(writer, params.len() as i32)?;
    writer.write_all(&params)
}

fn encode_params<W>(encoding: &Encoding, writer: &mut W) -> io::Result<()>
where
    W: Write,
{
    match encoding {
        Encoding::Integer(Integer::External { block_content_id }) => {
            write_itf8(writer, *block_content_id)
        }
        Encoding::Integer(Integer::Golomb { offset, m }) => {
            write_itf8(writer, *offset)?;
            write_itf8(writer, *m)
        }
        Encoding::Integer(Integer::Huffman {
            alphabet, bit_lens, ..
        }) => {
            write_itf8(writer, alphabet.len() as i32)?;
            for &symbol in alphabet {
                write_itf8(writer, symbol)?;
            }

            write_itf8(writer, bit_lens.len() as i32)?;
            for &len in bit_lens {
                write_itf8(writer, len as i32)?;
            }

            Ok(())
        }
        Encoding::Integer(Integer::Beta { offset, len }) => {
            write_itf8(writer, *offset)?;
            write_itf8(writer, *len as i32)
        }
        Encoding::Integer(Integer::Subexp { offset, k }) => {
            write_itf8(writer, *offset)?;
            write_itf8(writer, *k as i32)
        }
        Encoding::Integer(Integer::GolombRice { offset, log2_m }) => {
            write_itf8(writer, *offset)?;
            write_itf8(writer, *log2_m as i32)
        }
        Encoding::Integer(Integer::Gamma { offset }) => write_itf8(writer, *offset),
        Encoding::ByteArray(ByteArray::ByteArrayStop {
            stop_byte,
            block_content_id,
        }) => {
            write_u8(writer, *stop_byte)?;
            write_itf8(writer, *block_content_id)
        }
        Encoding::ByteArray(ByteArray::ByteArrayLength {
            len_encoding,
            value_block_content_id,
        }) => {
            write_encoding(writer, Some(&Encoding::Integer((**len_encoding).clone())))?;
            write_itf8(writer, *value_block_content_id)
        }
    }
}
