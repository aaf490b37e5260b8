//! The container header: the framing record at the start of every
//! container, naming how many bytes of block data follow it, the
//! reference context the container's slices share, and the byte offset
//! ("landmark") of each slice within that block data.

use std::io::{self, Read, Write};

use flate2::{CrcReader, CrcWriter};

use crate::error::{Error, Kind};
use crate::file_definition::Version;
use crate::num::{read_i32_le, read_itf8, read_ltf8, read_u32_le, write_i32_le, write_itf8, write_ltf8, write_u32_le};

use super::reference_context::{MULTIREF_ID, UNMAPPED_UNPLACED_ID};
use super::{AlignmentContext, ReferenceContext};

/// The sentinel container appended to the end of a well-formed CRAM stream
/// (spec.md §9): an empty compression header block, no slices.
pub const EOF_BLOCK_COUNT: usize = 1;

/// The container header.
#[derive(Clone, Debug)]
pub struct ContainerHeader {
    body_length: usize,
    alignment_context: AlignmentContext,
    record_count: usize,
    global_record_counter: u64,
    base_count: u64,
    block_count: usize,
    landmarks: Vec<usize>,
}

impl ContainerHeader {
    pub fn new(
        body_length: usize,
        alignment_context: AlignmentContext,
        record_count: usize,
        global_record_counter: u64,
        base_count: u64,
        block_count: usize,
        landmarks: Vec<usize>,
    ) -> Self {
        Self {
            body_length,
            alignment_context,
            record_count,
            global_record_counter,
            base_count,
            block_count,
            landmarks,
        }
    }

    pub fn body_length(&self) -> usize {
        self.body_length
    }

    pub fn alignment_context(&self) -> AlignmentContext {
        self.alignment_context
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    pub fn global_record_counter(&self) -> u64 {
        self.global_record_counter
    }

    pub fn base_count(&self) -> u64 {
        self.base_count
    }

    pub fn block_count(&self) -> usize {
        self.block_count
    }

    pub fn landmarks(&self) -> &[usize] {
        &self.landmarks
    }

    /// Whether this header is the EOF sentinel (spec.md §9): an
    /// [`AlignmentContext::eof`] context and a single (compression header)
    /// block.
    pub fn is_eof(&self) -> bool {
        self.alignment_context.is_eof() && self.block_count == EOF_BLOCK_COUNT
    }

    pub fn encode<W>(&self, writer: &mut W, version: Version) -> io::Result<()>
    where
        W: Write,
    {
        if version.has_crc32() {
            let mut crc_writer = CrcWriter::new(writer);
            self.encode_body(&mut crc_writer, version)?;
            let crc32 = crc_writer.crc().sum();
            write_u32_le(crc_writer.get_mut(), crc32)
        } else {
            self.encode_body(writer, version)
        }
    }

    fn encode_body<W>(&self, writer: &mut W, version: Version) -> io::Result<()>
    where
        W: Write,
    {
        let body_length = i32::try_from(self.body_length)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        write_i32_le(writer, body_length)?;

        write_itf8(writer, self.alignment_context.reference_context().id())?;
        write_itf8(writer, self.alignment_context.alignment_start())?;
        write_itf8(writer, self.alignment_context.alignment_span())?;
        write_itf8(writer, self.record_count as i32)?;

        if version.uses_wide_record_counter() {
            write_ltf8(writer, self.global_record_counter as i64)?;
            write_ltf8(writer, self.base_count as i64)?;
        } else {
            write_itf8(writer, self.global_record_counter as i32)?;
            write_itf8(writer, self.base_count as i32)?;
        }

        write_itf8(writer, self.block_count as i32)?;

        write_itf8(writer, self.landmarks.len() as i32)?;
        for &landmark in &self.landmarks {
            write_itf8(writer, landmark as i32)?;
        }

        Ok(())
    }

    /// Decodes a container header. Returns `Ok(None)` when the stream ends
    /// before a full header can be read (a truncated CRAM 2.x stream with
    /// no EOF sentinel); any other truncation is reported as
    /// [`Kind::TruncatedStream`].
    pub fn decode<R>(reader: &mut R, version: Version) -> io::Result<Option<Self>>
    where
        R: Read,
    {
        let result = if version.has_crc32() {
            let mut crc_reader = CrcReader::new(reader);
            let header = Self::decode_body(&mut crc_reader, version);

            match header {
                Ok(header) => {
                    let actual_crc32 = crc_reader.crc().sum();
                    let expected_crc32 = read_u32_le(crc_reader.get_mut())?;

                    if actual_crc32 != expected_crc32 {
                        return Err(Error::new(
                            Kind::CorruptBlock,
                            format!(
                                "container header checksum mismatch: expected {expected_crc32:08x}, got {actual_crc32:08x}"
                            ),
                        )
                        .into());
                    }

                    Ok(header)
                }
                Err(e) => Err(e),
            }
        } else {
            Self::decode_body(reader, version)
        };

        match result {
            Ok(header) => Ok(Some(header)),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn decode_body<R>(reader: &mut R, version: Version) -> io::Result<Self>
    where
        R: Read,
    {
        let body_length = read_i32_le(reader)?;
        let body_length = usize::try_from(body_length)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let reference_context_id = read_itf8(reader)?;
        let alignment_start = read_itf8(reader)?;
        let alignment_span = read_itf8(reader)?;
        let record_count = read_itf8(reader)?.max(0) as usize;

        let (global_record_counter, base_count) = if version.uses_wide_record_counter() {
            (read_ltf8(reader)? as u64, read_ltf8(reader)? as u64)
        } else {
            (read_itf8(reader)? as u64, read_itf8(reader)? as u64)
        };

        let block_count = read_itf8(reader)?.max(0) as usize;

        let n_landmarks = read_itf8(reader)?.max(0);
        let mut landmarks = Vec::with_capacity(n_landmarks as usize);
        for _ in 0..n_landmarks {
            landmarks.push(read_itf8(reader)?.max(0) as usize);
        }

        let reference_context = reference_context_from_raw(reference_context_id)?;
        let alignment_context = AlignmentContext::from_legacy_unchecked(
            reference_context,
            alignment_start,
            alignment_span,
        );

        Ok(Self {
            body_length,
            alignment_context,
            record_count,
            global_record_counter,
            base_count,
            block_count,
            landmarks,
        })
    }
}

fn reference_context_from_raw(id: i32) -> io::Result<ReferenceContext> {
    match id {
        MULTIREF_ID => Ok(ReferenceContext::MultiRef),
        UNMAPPED_UNPLACED_ID => Ok(ReferenceContext::UnmappedUnplaced),
        n if n >= 0 => Ok(ReferenceContext::SingleRef(n as usize)),
        n => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid container reference context id: {n}"),
        )),
    }
}

/// Builds the EOF sentinel header: an [`AlignmentContext::eof`] context,
/// zero records, and a single (empty compression header) block.
pub fn eof_header(body_length: usize) -> ContainerHeader {
    ContainerHeader::new(body_length, AlignmentContext::eof(), 0, 0, 0, EOF_BLOCK_COUNT, vec![])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_v3_0() -> io::Result<()> {
        let alignment_context =
            AlignmentContext::new(ReferenceContext::SingleRef(0), 2, 10).unwrap();
        let header =
            ContainerHeader::new(123, alignment_context, 5, 5, 500, 3, vec![0, 40, 80]);

        let mut buf = Vec::new();
        header.encode(&mut buf, Version::V3_0)?;

        let mut reader = &buf[..];
        let decoded = ContainerHeader::decode(&mut reader, Version::V3_0)?.unwrap();

        assert_eq!(decoded.body_length(), 123);
        assert_eq!(decoded.alignment_context(), header.alignment_context());
        assert_eq!(decoded.record_count(), 5);
        assert_eq!(decoded.base_count(), 500);
        assert_eq!(decoded.landmarks(), &[0, 40, 80]);

        Ok(())
    }

    #[test]
    fn test_round_trip_v2_1_no_crc32() -> io::Result<()> {
        let alignment_context =
            AlignmentContext::new(ReferenceContext::UnmappedUnplaced, 0, 0).unwrap();
        let header = ContainerHeader::new(10, alignment_context, 1, 1, 36, 2, vec![0]);

        let mut buf = Vec::new();
        header.encode(&mut buf, Version::V2_1)?;

        let mut reader = &buf[..];
        let decoded = ContainerHeader::decode(&mut reader, Version::V2_1)?.unwrap();
        assert_eq!(decoded.record_count(), 1);

        Ok(())
    }

    #[test]
    fn test_detects_corrupt_crc32() -> io::Result<()> {
        let alignment_context =
            AlignmentContext::new(ReferenceContext::SingleRef(0), 1, 1).unwrap();
        let header = ContainerHeader::new(4, alignment_context, 1, 1, 1, 1, vec![]);

        let mut buf = Vec::new();
        header.encode(&mut buf, Version::V3_0)?;
        let last = buf.len() - 1;
        buf[last] ^= 0xff;

        let mut reader = &buf[..];
        assert!(ContainerHeader::decode(&mut reader, Version::V3_0).is_err());

        Ok(())
    }

    #[test]
    fn test_is_eof() {
        let header = eof_header(15);
        assert!(header.is_eof());

        let placed = ContainerHeader::new(
            1,
            AlignmentContext::new(ReferenceContext::SingleRef(0), 1, 1).unwrap(),
            1,
            0,
            1,
            1,
            vec![],
        );
        assert!(!placed.is_eof());
    }

    #[test]
    fn test_decode_empty_stream_returns_none() -> io::Result<()> {
        let mut reader: &[u8] = &[];
        assert!(ContainerHeader::decode(&mut reader, Version::V3_0)?.is_none());
        Ok(())
    }
}
