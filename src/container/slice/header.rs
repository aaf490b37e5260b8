//! The slice header: the fields serialized into a slice's raw header block.

use std::io::{self, Read, Write};

use crate::container::reference_context::{MULTIREF_ID, UNMAPPED_UNPLACED_ID};
use crate::container::{AlignmentContext, ReferenceContext};
use crate::file_definition::Version;
use crate::num::{read_itf8, read_ltf8, write_itf8, write_ltf8};

pub const MD5_LEN: usize = 16;

/// The serialized portion of a slice's identity: everything written into
/// the raw slice-header block (spec.md §3, §6).
#[derive(Clone, Debug)]
pub struct SliceHeader {
    alignment_context: AlignmentContext,
    record_count: usize,
    global_record_counter: u64,
    n_blocks: usize,
    external_content_ids: Vec<i32>,
    embedded_reference_content_id: Option<i32>,
    reference_md5: [u8; MD5_LEN],
    tags: Vec<u8>,
}

impl SliceHeader {
    pub fn new(
        alignment_context: AlignmentContext,
        record_count: usize,
        global_record_counter: u64,
        n_blocks: usize,
        external_content_ids: Vec<i32>,
        embedded_reference_content_id: Option<i32>,
        reference_md5: [u8; MD5_LEN],
    ) -> Self {
        Self {
            alignment_context,
            record_count,
            global_record_counter,
            n_blocks,
            external_content_ids,
            embedded_reference_content_id,
            reference_md5,
            tags: Vec::new(),
        }
    }

    pub fn alignment_context(&self) -> AlignmentContext {
        self.alignment_context
    }

    pub fn reference_context(&self) -> ReferenceContext {
        self.alignment_context.reference_context()
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    pub fn global_record_counter(&self) -> u64 {
        self.global_record_counter
    }

    pub fn n_blocks(&self) -> usize {
        self.n_blocks
    }

    pub fn external_content_ids(&self) -> &[i32] {
        &self.external_content_ids
    }

    pub fn embedded_reference_content_id(&self) -> Option<i32> {
        self.embedded_reference_content_id
    }

    pub fn reference_md5(&self) -> &[u8; MD5_LEN] {
        &self.reference_md5
    }

    pub fn tags(&self) -> &[u8] {
        &self.tags
    }

    pub fn with_tags(mut self, tags: Vec<u8>) -> Self {
        self.tags = tags;
        self
    }

    pub fn encode<W>(&self, writer: &mut W, version: Version) -> io::Result<()>
    where
        W: Write,
    {
        write_itf8(writer, self.reference_context().id())?;
        write_itf8(writer, self.alignment_context.alignment_start())?;
        write_itf8(writer, self.alignment_context.alignment_span())?;
        write_itf8(writer, self.record_count as i32)?;

        if version.uses_wide_record_counter() {
            write_ltf8(writer, self.global_record_counter as i64)?;
        } else {
            write_itf8(writer, self.global_record_counter as i32)?;
        }

        write_itf8(writer, self.n_blocks as i32)?;

        write_itf8(writer, self.external_content_ids.len() as i32)?;
        for &id in &self.external_content_ids {
            write_itf8(writer, id)?;
        }

        write_itf8(writer, self.embedded_reference_content_id.unwrap_or(-1))?;
        writer.write_all(&self.reference_md5)?;
        writer.write_all(&self.tags)
    }

    pub fn decode<R>(reader: &mut R, version: Version) -> io::Result<Self>
    where
        R: Read,
    {
        let reference_context_id = read_itf8(reader)?;
        let alignment_start = read_itf8(reader)?;
        let alignment_span = read_itf8(reader)?;
        let record_count = read_itf8(reader)? as usize;

        let global_record_counter = if version.uses_wide_record_counter() {
            read_ltf8(reader)? as u64
        } else {
            read_itf8(reader)? as u64
        };

        let n_blocks = read_itf8(reader)? as usize;

        let n_content_ids = read_itf8(reader)?;
        let mut external_content_ids = Vec::with_capacity(n_content_ids.max(0) as usize);
        for _ in 0..n_content_ids {
            external_content_ids.push(read_itf8(reader)?);
        }

        let embedded_reference_content_id = match read_itf8(reader)? {
            -1 => None,
            id => Some(id),
        };

        let mut reference_md5 = [0u8; MD5_LEN];
        reader.read_exact(&mut reference_md5)?;

        let mut tags = Vec::new();
        reader.read_to_end(&mut tags)?;

        let reference_context = reference_context_from_raw(reference_context_id)?;
        let alignment_context = AlignmentContext::from_legacy_unchecked(
            reference_context,
            alignment_start,
            alignment_span,
        );

        Ok(Self {
            alignment_context,
            record_count,
            global_record_counter,
            n_blocks,
            external_content_ids,
            embedded_reference_content_id,
            reference_md5,
            tags,
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
            format!("invalid slice reference context id: {n}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() -> io::Result<()> {
        let alignment_context =
            AlignmentContext::new(ReferenceContext::SingleRef(0), 2, 4).unwrap();

        let header = SliceHeader::new(
            alignment_context,
            3,
            10,
            4,
            vec![0, 1, 2],
            None,
            [0u8; MD5_LEN],
        );

        let mut buf = Vec::new();
        header.encode(&mut buf, Version::V3_0)?;

        let mut reader = &buf[..];
        let decoded = SliceHeader::decode(&mut reader, Version::V3_0)?;

        assert_eq!(decoded.alignment_context(), header.alignment_context());
        assert_eq!(decoded.record_count(), 3);
        assert_eq!(decoded.global_record_counter(), 10);
        assert_eq!(decoded.external_content_ids(), &[0, 1, 2]);
        assert_eq!(decoded.embedded_reference_content_id(), None);

        Ok(())
    }

    #[test]
    fn test_round_trip_v2_1_narrow_counter() -> io::Result<()> {
        let alignment_context =
            AlignmentContext::new(ReferenceContext::UnmappedUnplaced, 0, 0).unwrap();

        let header = SliceHeader::new(alignment_context, 1, 5, 1, vec![], Some(9), [1u8; MD5_LEN]);

        let mut buf = Vec::new();
        header.encode(&mut buf, Version::V2_1)?;

        let mut reader = &buf[..];
        let decoded = SliceHeader::decode(&mut reader, Version::V2_1)?;

        assert_eq!(decoded.embedded_reference_content_id(), Some(9));
        assert_eq!(decoded.reference_md5(), &[1u8; MD5_LEN]);

        Ok(())
    }
}
