//! The container: the top-level CRAM unit, carrying one compression header
//! shared by an ordered run of slices.

pub mod alignment_context;
pub mod alignment_span;
pub mod block;
pub mod compression_header;
pub mod header;
pub mod reference_context;
pub mod slice;

pub use self::{
    alignment_context::AlignmentContext,
    alignment_span::AlignmentSpan,
    block::{Block, ContentType, Method},
    compression_header::CompressionHeader,
    header::ContainerHeader,
    reference_context::ReferenceContext,
    slice::{Slice, SliceBlocks, SliceHeader},
};

use std::io::{self, Read, Write};

use indexmap::IndexMap;

use crate::file_definition::Version;
use crate::record::CramRecord;

use self::block::{read_block, write_block};

/// A container: a compression header plus the slices it governs.
#[derive(Clone, Debug)]
pub struct Container {
    compression_header: CompressionHeader,
    slices: Vec<Slice>,
}

impl Container {
    pub fn new(compression_header: CompressionHeader, slices: Vec<Slice>) -> Self {
        Self {
            compression_header,
            slices,
        }
    }

    pub fn compression_header(&self) -> &CompressionHeader {
        &self.compression_header
    }

    pub fn slices(&self) -> &[Slice] {
        &self.slices
    }

    /// Decodes every slice's records, in slice order.
    pub fn records(&self) -> io::Result<Vec<CramRecord>> {
        let mut records = Vec::new();

        for s in &self.slices {
            records.extend(slice::decode_slice(s, &self.compression_header)?);
        }

        Ok(records)
    }

    /// Verifies every slice's reference MD5 against `reference` (spec.md
    /// §4.8). Run this before or alongside [`crate::normalize::normalize`]
    /// on the records `records()` decodes from the same slices.
    pub fn verify_reference_md5(
        &self,
        reference: &dyn crate::reference::ReferenceSequence,
        diagnostics: &mut crate::diagnostics::Diagnostics,
    ) -> Result<(), crate::error::Error> {
        for s in &self.slices {
            s.verify_reference_md5(reference, diagnostics)?;
        }

        Ok(())
    }
}

/// Builds a container from a record batch: one slice per `records_per_slice`
/// chunk, all sharing a single compression header built from `header`
/// (spec.md §4.9). `global_record_counter` is the running count of records
/// written by prior containers, used to seed each slice's counter.
///
/// `reference` is consulted only for `SingleRef` slices whose preservation
/// map requires one (`RR=true`), to fill in the slice header's reference
/// MD5 (spec.md §4.8); pass `None` when no reference is available, which
/// stores the all-zero sentinel instead.
pub fn build_container(
    compression_header: CompressionHeader,
    records: &[CramRecord],
    records_per_slice: usize,
    global_record_counter: u64,
    reference: Option<&dyn crate::reference::ReferenceSequence>,
    diagnostics: &mut crate::diagnostics::Diagnostics,
) -> io::Result<Container> {
    let records_per_slice = records_per_slice.max(1);
    let mut slices = Vec::new();
    let mut counter = global_record_counter;

    for chunk in records.chunks(records_per_slice) {
        let slice = slice::build_slice(&compression_header, chunk, counter, reference, diagnostics)?;
        counter += chunk.len() as u64;
        slices.push(slice);
    }

    Ok(Container::new(compression_header, slices))
}

/// Writes a container: header, compression header block, then each slice's
/// header block followed by its core and external blocks (spec.md §4.9).
pub fn encode_container<W>(writer: &mut W, container: &Container, version: Version) -> io::Result<()>
where
    W: Write,
{
    let mut compression_header_bytes = Vec::new();
    container
        .compression_header
        .encode(&mut compression_header_bytes)?;
    let compression_header_block = Block::encode(
        ContentType::CompressionHeader,
        0,
        Method::Raw,
        &compression_header_bytes,
    )?;

    let mut body = Vec::new();
    write_block(&mut body, &compression_header_block, version)?;

    let mut landmarks = Vec::with_capacity(container.slices.len());
    let mut block_count = 1;

    for slice in &container.slices {
        landmarks.push(body.len());

        let mut header_bytes = Vec::new();
        slice.header().encode(&mut header_bytes, version)?;
        let header_block = Block::create_raw_slice_header_block(header_bytes);
        write_block(&mut body, &header_block, version)?;

        write_block(&mut body, slice.blocks().core(), version)?;
        for block in slice.blocks().external().values() {
            write_block(&mut body, block, version)?;
        }

        block_count += slice.blocks().n_blocks() + 1;
    }

    let alignment_context = derive_container_alignment_context(&container.slices);
    let record_count = container
        .slices
        .iter()
        .map(|slice| slice.header().record_count())
        .sum();
    let global_record_counter = container
        .slices
        .first()
        .map(Slice::header)
        .map(SliceHeader::global_record_counter)
        .unwrap_or(0);
    let base_count = container
        .records()?
        .iter()
        .map(|r| r.read_length as u64)
        .sum();

    let header = ContainerHeader::new(
        body.len(),
        alignment_context,
        record_count,
        global_record_counter,
        base_count,
        block_count,
        landmarks,
    );

    header.encode(writer, version)?;
    writer.write_all(&body)
}

/// Reads one container. Returns `Ok(None)` at the EOF sentinel or at a
/// clean end of stream.
pub fn decode_container<R>(reader: &mut R, version: Version) -> io::Result<Option<Container>>
where
    R: Read,
{
    Ok(decode_container_with_header(reader, version)?.map(|(container, _)| container))
}

/// Like [`decode_container`], but also returns the container header — the
/// landmarks and block count [`crate::index`] needs to place each slice in
/// the file.
pub fn decode_container_with_header<R>(
    reader: &mut R,
    version: Version,
) -> io::Result<Option<(Container, ContainerHeader)>>
where
    R: Read,
{
    let header = match ContainerHeader::decode(reader, version)? {
        Some(header) => header,
        None => return Ok(None),
    };

    let mut body = vec![0u8; header.body_length()];
    reader.read_exact(&mut body)?;

    if header.is_eof() {
        return Ok(None);
    }

    let mut cursor = &body[..];
    let compression_header_block = read_block(&mut cursor, version)?;
    let compression_header_bytes = compression_header_block.decode()?;
    let mut diagnostics = crate::diagnostics::Diagnostics::default();
    let compression_header =
        CompressionHeader::decode(&mut compression_header_bytes.as_slice(), &mut diagnostics)?;

    let mut slices = Vec::new();

    while !cursor.is_empty() {
        let slice_header_block = read_block(&mut cursor, version)?;
        let slice_header_bytes = slice_header_block.decode()?;
        let slice_header = SliceHeader::decode(&mut slice_header_bytes.as_slice(), version)?;

        let core = read_block(&mut cursor, version)?;

        let mut external = IndexMap::new();
        for &content_id in slice_header.external_content_ids() {
            let block = read_block(&mut cursor, version)?;
            external.insert(content_id, block);
        }

        let blocks = SliceBlocks::new(
            core,
            external,
            slice_header.embedded_reference_content_id(),
        )
        .map_err(io::Error::from)?;

        slices.push(Slice::new(slice_header, blocks));
    }

    Ok(Some((Container::new(compression_header, slices), header)))
}

/// Writes the special file-header container (spec.md §6): a container
/// framed exactly like any other (same [`ContainerHeader`] layout) but
/// carrying a single `FileHeader` block instead of a compression header,
/// whose payload is `raw_header_bytes` (the length-prefixed SAM header
/// text, out of scope for this crate to parse — see spec.md §1).
///
/// The container's alignment context is the `UnmappedUnplaced` sentinel
/// `(0, 0)`, matching the teacher's reader (`read_header`, which ignores
/// this container's reference context/alignment fields entirely).
pub fn write_file_header_container<W>(
    writer: &mut W,
    raw_header_bytes: &[u8],
    version: Version,
) -> io::Result<()>
where
    W: Write,
{
    let mut payload = Vec::with_capacity(4 + raw_header_bytes.len());
    crate::num::write_i32_le(&mut payload, raw_header_bytes.len() as i32)?;
    payload.extend_from_slice(raw_header_bytes);

    let block = Block::create_file_header_block(payload);

    let mut body = Vec::new();
    write_block(&mut body, &block, version)?;

    let header = ContainerHeader::new(
        body.len(),
        AlignmentContext::new(ReferenceContext::UnmappedUnplaced, 0, 0).unwrap(),
        0,
        0,
        0,
        1,
        vec![0],
    );

    header.encode(writer, version)?;
    writer.write_all(&body)
}

/// Reads the file-header container written by [`write_file_header_container`],
/// returning the raw (still-unparsed) SAM header bytes it carries.
pub fn read_file_header_container<R>(reader: &mut R, version: Version) -> io::Result<Vec<u8>>
where
    R: Read,
{
    let header = ContainerHeader::decode(reader, version)?.ok_or_else(|| {
        io::Error::new(io::ErrorKind::UnexpectedEof, "missing file header container")
    })?;

    let mut body = vec![0u8; header.body_length()];
    reader.read_exact(&mut body)?;

    let mut cursor = &body[..];
    let block = read_block(&mut cursor, version)?;
    let payload = block.decode()?;

    let mut payload_cursor = &payload[..];
    let len = crate::num::read_i32_le(&mut payload_cursor)? as usize;

    if len > payload_cursor.len() {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "file header block shorter than its declared length",
        ));
    }

    Ok(payload_cursor[..len].to_vec())
}

/// Writes the EOF sentinel container (spec.md §9): an empty compression
/// header, no slices.
pub fn write_eof_container<W>(writer: &mut W, version: Version) -> io::Result<()>
where
    W: Write,
{
    let empty_header = CompressionHeader::new(
        compression_header::PreservationMap::default(),
        compression_header::DataSeriesEncodings::default(),
        std::collections::HashMap::new(),
    );

    let mut compression_header_bytes = Vec::new();
    empty_header.encode(&mut compression_header_bytes)?;
    let compression_header_block = Block::encode(
        ContentType::CompressionHeader,
        0,
        Method::Raw,
        &compression_header_bytes,
    )?;

    let mut body = Vec::new();
    write_block(&mut body, &compression_header_block, version)?;

    let header = header::eof_header(body.len());
    header.encode(writer, version)?;
    writer.write_all(&body)
}

/// Folds each slice's alignment context into the container-level context
/// (spec.md §4.9): the interval spanning every `SingleRef` slice sharing one
/// id, `MultiRef` as soon as two different ids appear, `UnmappedUnplaced`
/// when nothing is placed.
fn derive_container_alignment_context(slices: &[Slice]) -> AlignmentContext {
    let mut single_ref_id: Option<usize> = None;
    let mut is_multi_ref = false;
    let mut has_unmapped_unplaced = false;
    let mut start = i32::MAX;
    let mut end = i32::MIN;

    for slice in slices {
        match slice.header().reference_context() {
            ReferenceContext::SingleRef(id) => {
                match single_ref_id {
                    None => single_ref_id = Some(id),
                    Some(existing) if existing == id => {}
                    Some(_) => is_multi_ref = true,
                }

                let context = slice.header().alignment_context();
                start = start.min(context.alignment_start());
                end = end.max(context.alignment_end());
            }
            ReferenceContext::MultiRef => is_multi_ref = true,
            ReferenceContext::UnmappedUnplaced => has_unmapped_unplaced = true,
        }
    }

    if is_multi_ref || (single_ref_id.is_some() && has_unmapped_unplaced) {
        return AlignmentContext::new(ReferenceContext::MultiRef, 0, 0).unwrap();
    }

    if let Some(id) = single_ref_id {
        let span = (end - start + 1).max(0);
        return AlignmentContext::from_legacy_unchecked(
            ReferenceContext::SingleRef(id),
            start,
            span,
        );
    }

    AlignmentContext::new(ReferenceContext::UnmappedUnplaced, 0, 0).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{CramFlags, CramRecord, Flags, MateFlags};

    fn sample_record(reference_sequence_id: Option<usize>, alignment_start: i32) -> CramRecord {
        CramRecord {
            bam_flags: Flags::empty(),
            cram_flags: CramFlags::empty(),
            reference_sequence_id,
            alignment_start,
            read_length: 4,
            read_features: Vec::new(),
            mapping_quality: Some(40),
            read_group_id: None,
            read_name: Some(b"r1".to_vec()),
            read_bases: vec![b'A'; 4],
            quality_scores: Vec::new(),
            tags: Vec::new(),
            sequential_index: 0,
            template_size: 0,
            mate_flags: MateFlags::empty(),
            mate_reference_sequence_id: None,
            mate_alignment_start: 0,
            records_to_next_fragment: -1,
            next: None,
            prev: None,
        }
    }

    #[test]
    fn test_build_and_round_trip_single_slice_container() -> io::Result<()> {
        let compression_header = CompressionHeader::default();
        let records = vec![sample_record(Some(0), 1), sample_record(Some(0), 5)];

        let mut diagnostics = crate::diagnostics::Diagnostics::default();
        let container = build_container(compression_header, &records, 10, 0, None, &mut diagnostics)?;

        let mut buf = Vec::new();
        encode_container(&mut buf, &container, Version::V3_0)?;

        let mut reader = &buf[..];
        let decoded = decode_container(&mut reader, Version::V3_0)?.unwrap();

        assert_eq!(decoded.slices().len(), 1);
        assert_eq!(decoded.records()?.len(), 2);

        Ok(())
    }

    #[test]
    fn test_round_trip_multiple_slices() -> io::Result<()> {
        let compression_header = CompressionHeader::default();
        let records = vec![
            sample_record(Some(0), 1),
            sample_record(Some(0), 2),
            sample_record(Some(0), 3),
        ];

        let mut diagnostics = crate::diagnostics::Diagnostics::default();
        let container = build_container(compression_header, &records, 1, 100, None, &mut diagnostics)?;
        assert_eq!(container.slices().len(), 3);

        let mut buf = Vec::new();
        encode_container(&mut buf, &container, Version::V3_0)?;

        let mut reader = &buf[..];
        let decoded = decode_container(&mut reader, Version::V3_0)?.unwrap();

        assert_eq!(decoded.slices().len(), 3);
        assert_eq!(
            decoded.slices()[0].header().global_record_counter(),
            100
        );
        assert_eq!(
            decoded.slices()[2].header().global_record_counter(),
            102
        );

        Ok(())
    }

    #[test]
    fn test_build_and_verify_reference_md5() -> io::Result<()> {
        use crate::reference::InMemoryReferenceSequences;

        let compression_header = CompressionHeader::default();
        let records = vec![sample_record(Some(0), 1), sample_record(Some(0), 5)];
        let reference = InMemoryReferenceSequences::new(vec![b"ACGTACGTACGT".to_vec()]);

        let mut diagnostics = crate::diagnostics::Diagnostics::default();
        let container =
            build_container(compression_header, &records, 10, 0, Some(&reference), &mut diagnostics)?;

        container.verify_reference_md5(&reference, &mut diagnostics).unwrap();
        assert!(diagnostics.is_empty());

        let wrong_reference = InMemoryReferenceSequences::new(vec![b"TTTTTTTTTTTT".to_vec()]);
        container
            .verify_reference_md5(&wrong_reference, &mut diagnostics)
            .unwrap();
        assert!(!diagnostics.is_empty());

        Ok(())
    }

    #[test]
    fn test_eof_container_round_trips_to_none() -> io::Result<()> {
        let mut buf = Vec::new();
        write_eof_container(&mut buf, Version::V3_0)?;

        let mut reader = &buf[..];
        assert!(decode_container(&mut reader, Version::V3_0)?.is_none());

        Ok(())
    }

    #[test]
    fn test_derive_container_alignment_context_multi_ref() {
        let mut diagnostics = crate::diagnostics::Diagnostics::default();
        let slice_a = slice::build_slice(
            &CompressionHeader::default(),
            &[sample_record(Some(0), 1)],
            0,
            None,
            &mut diagnostics,
        )
        .unwrap();
        let slice_b = slice::build_slice(
            &CompressionHeader::default(),
            &[sample_record(Some(1), 1)],
            1,
            None,
            &mut diagnostics,
        )
        .unwrap();

        let context = derive_container_alignment_context(&[slice_a, slice_b]);
        assert_eq!(context.reference_context(), ReferenceContext::MultiRef);
    }

    #[test]
    fn test_file_header_container_round_trip() -> io::Result<()> {
        let mut buf = Vec::new();
        write_file_header_container(&mut buf, b"@HD\tVN:1.6\n", Version::V3_0)?;

        let mut reader = &buf[..];
        let bytes = read_file_header_container(&mut reader, Version::V3_0)?;

        assert_eq!(bytes, b"@HD\tVN:1.6\n");

        Ok(())
    }
}
