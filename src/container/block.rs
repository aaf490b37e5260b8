//! The block: CRAM's unit of (optionally) compressed storage.

use std::io::{self, Read, Write};

use flate2::{CrcReader, CrcWriter};

use crate::codecs::Method as CompressionMethod;
use crate::file_definition::Version;
use crate::num::{read_itf8, read_u32_le, read_u8, write_itf8, write_u32_le, write_u8};

pub use CompressionMethod as Method;

/// The kind of payload a block carries.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum ContentType {
    FileHeader = 0,
    CompressionHeader = 1,
    MappedSliceHeader = 2,
    Reserved = 3,
    ExternalData = 4,
    CoreData = 5,
}

impl ContentType {
    pub fn from_u8(n: u8) -> io::Result<Self> {
        match n {
            0 => Ok(Self::FileHeader),
            1 => Ok(Self::CompressionHeader),
            2 => Ok(Self::MappedSliceHeader),
            3 => Ok(Self::Reserved),
            4 => Ok(Self::ExternalData),
            5 => Ok(Self::CoreData),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid block content type: {n}"),
            )),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// The identifier of a block's content. `-1` is reserved for blocks that
/// are not keyed by content id (e.g. the core data block always uses `0`,
/// but callers must not rely on that outside this crate).
pub type ContentId = i32;

/// A unit of (optionally) compressed CRAM storage.
///
/// A [`Block`] is immutable once constructed: [`Block::compression_method`]
/// and the two byte buffers never change after [`Block::encode`] or
/// [`Block::decode`] produce it.
#[derive(Clone, Debug)]
pub struct Block {
    content_type: ContentType,
    content_id: ContentId,
    compression_method: Method,
    compressed_data: Vec<u8>,
    uncompressed_size: usize,
}

impl Block {
    /// Compresses `data` with `method` and wraps it as a block.
    pub fn encode(
        content_type: ContentType,
        content_id: ContentId,
        method: Method,
        data: &[u8],
    ) -> io::Result<Self> {
        if content_type == ContentType::CoreData && method != Method::Raw {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "core data blocks must use the raw compression method",
            ));
        }

        let compressed_data = method.compressor().compress(data)?;

        Ok(Self {
            content_type,
            content_id,
            compression_method: method,
            compressed_data,
            uncompressed_size: data.len(),
        })
    }

    /// Wraps already-compressed bytes without re-running the codec.
    pub fn new(
        content_type: ContentType,
        content_id: ContentId,
        compression_method: Method,
        compressed_data: Vec<u8>,
        uncompressed_size: usize,
    ) -> Self {
        Self {
            content_type,
            content_id,
            compression_method,
            compressed_data,
            uncompressed_size,
        }
    }

    /// Convenience constructor for the slice's single, always-raw core
    /// data block.
    pub fn create_raw_core_data_block(data: Vec<u8>) -> Self {
        let uncompressed_size = data.len();

        Self {
            content_type: ContentType::CoreData,
            content_id: 0,
            compression_method: Method::Raw,
            compressed_data: data,
            uncompressed_size,
        }
    }

    /// Convenience constructor for a raw (uncompressed) slice header block.
    pub fn create_raw_slice_header_block(data: Vec<u8>) -> Self {
        let uncompressed_size = data.len();

        Self {
            content_type: ContentType::MappedSliceHeader,
            content_id: 0,
            compression_method: Method::Raw,
            compressed_data: data,
            uncompressed_size,
        }
    }

    /// Convenience constructor for a raw file header block.
    pub fn create_file_header_block(data: Vec<u8>) -> Self {
        let uncompressed_size = data.len();

        Self {
            content_type: ContentType::FileHeader,
            content_id: 0,
            compression_method: Method::Raw,
            compressed_data: data,
            uncompressed_size,
        }
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn content_id(&self) -> ContentId {
        self.content_id
    }

    pub fn compression_method(&self) -> Method {
        self.compression_method
    }

    pub fn compressed_data(&self) -> &[u8] {
        &self.compressed_data
    }

    pub fn compressed_size(&self) -> usize {
        self.compressed_data.len()
    }

    pub fn uncompressed_size(&self) -> usize {
        self.uncompressed_size
    }

    /// Decompresses the block's payload.
    pub fn decode(&self) -> io::Result<Vec<u8>> {
        self.compression_method
            .compressor()
            .decompress(&self.compressed_data, self.uncompressed_size)
    }
}

/// Writes a block's wire form: method, content type, content id, compressed
/// and uncompressed sizes, the payload, and (from CRAM 3.0) a trailing
/// CRC32 over everything written before it.
pub fn write_block<W>(writer: &mut W, block: &Block, version: Version) -> io::Result<()>
where
    W: Write,
{
    if version.has_crc32() {
        let mut crc_writer = CrcWriter::new(writer);
        write_block_body(&mut crc_writer, block)?;
        let crc32 = crc_writer.crc().sum();
        write_u32_le(crc_writer.get_mut(), crc32)
    } else {
        write_block_body(writer, block)
    }
}

fn write_block_body<W>(writer: &mut W, block: &Block) -> io::Result<()>
where
    W: Write,
{
    write_u8(writer, block.compression_method.as_u8())?;
    write_u8(writer, block.content_type.as_u8())?;
    write_itf8(writer, block.content_id)?;

    let compressed_size = i32::try_from(block.compressed_data.len())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let uncompressed_size = i32::try_from(block.uncompressed_size)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    write_itf8(writer, compressed_size)?;
    write_itf8(writer, uncompressed_size)?;
    writer.write_all(&block.compressed_data)
}

/// Reads a block's wire form, verifying the trailing CRC32 when the stream
/// version carries one.
pub fn read_block<R>(reader: &mut R, version: Version) -> io::Result<Block>
where
    R: Read,
{
    if version.has_crc32() {
        let mut crc_reader = CrcReader::new(reader);
        let block = read_block_body(&mut crc_reader)?;
        let actual_crc32 = crc_reader.crc().sum();
        let expected_crc32 = read_u32_le(crc_reader.get_mut())?;

        if actual_crc32 != expected_crc32 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "block checksum mismatch: expected {expected_crc32:08x}, got {actual_crc32:08x}"
                ),
            ));
        }

        Ok(block)
    } else {
        read_block_body(reader)
    }
}

fn read_block_body<R>(reader: &mut R) -> io::Result<Block>
where
    R: Read,
{
    let compression_method = Method::from_u8(read_u8(reader)?)?;
    let content_type = ContentType::from_u8(read_u8(reader)?)?;
    let content_id = read_itf8(reader)?;

    let compressed_size = read_itf8(reader)?.max(0) as usize;
    let uncompressed_size = read_itf8(reader)?.max(0) as usize;

    let mut compressed_data = vec![0u8; compressed_size];
    reader.read_exact(&mut compressed_data)?;

    Ok(Block::new(
        content_type,
        content_id,
        compression_method,
        compressed_data,
        uncompressed_size,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_block_round_trip_with_crc32() -> io::Result<()> {
        let block = Block::encode(ContentType::ExternalData, 1, Method::Raw, b"ndls")?;

        let mut buf = Vec::new();
        write_block(&mut buf, &block, Version::V3_0)?;

        let mut reader = &buf[..];
        let decoded = read_block(&mut reader, Version::V3_0)?;

        assert_eq!(decoded.content_type(), block.content_type());
        assert_eq!(decoded.content_id(), block.content_id());
        assert_eq!(decoded.decode()?, block.decode()?);

        Ok(())
    }

    #[test]
    fn test_write_read_block_round_trip_without_crc32() -> io::Result<()> {
        let block = Block::encode(ContentType::CoreData, 0, Method::Raw, b"core")?;

        let mut buf = Vec::new();
        write_block(&mut buf, &block, Version::V2_1)?;

        let mut reader = &buf[..];
        let decoded = read_block(&mut reader, Version::V2_1)?;

        assert_eq!(decoded.decode()?, block.decode()?);

        Ok(())
    }

    #[test]
    fn test_read_block_detects_crc32_mismatch() -> io::Result<()> {
        let block = Block::encode(ContentType::ExternalData, 1, Method::Raw, b"ndls")?;

        let mut buf = Vec::new();
        write_block(&mut buf, &block, Version::V3_0)?;
        let last = buf.len() - 1;
        buf[last] ^= 0xff;

        let mut reader = &buf[..];
        assert!(read_block(&mut reader, Version::V3_0).is_err());

        Ok(())
    }

    #[test]
    fn test_encode_decode_round_trip() -> io::Result<()> {
        let data = b"noodles-cram external block".to_vec();
        let block = Block::encode(ContentType::ExternalData, 3, Method::Gzip, &data)?;

        assert_eq!(block.content_type(), ContentType::ExternalData);
        assert_eq!(block.content_id(), 3);
        assert_eq!(block.uncompressed_size(), data.len());
        assert_eq!(block.decode()?, data);

        Ok(())
    }

    #[test]
    fn test_core_data_must_be_raw() {
        let data = b"core".to_vec();
        let result = Block::encode(ContentType::CoreData, 0, Method::Gzip, &data);
        assert!(result.is_err());
    }

    #[test]
    fn test_content_type_round_trip() -> io::Result<()> {
        for ty in [
            ContentType::FileHeader,
            ContentType::CompressionHeader,
            ContentType::MappedSliceHeader,
            ContentType::Reserved,
            ContentType::ExternalData,
            ContentType::CoreData,
        ] {
            assert_eq!(ContentType::from_u8(ty.as_u8())?, ty);
        }

        Ok(())
    }
}
