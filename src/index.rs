//! CRAM indexing (spec.md §4.10): flat CRAI entries and per-reference-context
//! BAI entries built from a container's slices, without requiring a prior
//! normalization pass (spec.md §4.11 — indexing may stop at raw records).
//!
//! Grounded on a pruned pack file outside the chosen teacher crate (a
//! standalone `noodles-cram` indexer) rather than the teacher itself, since
//! the filtered teacher source doesn't carry its indexing module: the
//! multi-reference-slice dispatch (direct slice header for single-reference
//! slices, decode-and-fold for multi-reference ones) follows that file's
//! `push_index_records`/`push_index_records_for_multi_reference_slice`
//! shape.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::io::{self, Read};

use crate::container::compression_header::CompressionHeader;
use crate::container::slice::decode_slice;
use crate::container::{
    decode_container_with_header, AlignmentSpan, Container, ContainerHeader, ReferenceContext, Slice,
};
use crate::error::{Error, Kind};
use crate::file_definition::Version;
use crate::record::CramRecord;

/// A CRAI entry (spec.md §4.10): one reference's placement within one
/// slice, or that slice's unmapped-unplaced records under `reference_sequence_id: None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CraiRecord {
    pub reference_sequence_id: Option<usize>,
    pub alignment_start: i32,
    pub alignment_span: i32,
    pub container_byte_offset: u64,
    pub slice_header_byte_offset: u64,
    pub slice_byte_size: u64,
}

/// A BAI entry: one reference context's alignment span and placement counts
/// within one slice, plus the offsets and landmark index needed to seek to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BaiEntry {
    pub reference_context: ReferenceContext,
    pub alignment_span: AlignmentSpan,
    pub container_byte_offset: u64,
    pub slice_header_byte_offset: u64,
    pub landmark_index: usize,
}

/// Reads every container in `reader` and builds its CRAI and BAI entries,
/// in container and slice order. `reader` is assumed positioned just past
/// the file definition and file header.
pub fn build_index<R>(reader: &mut R, version: Version) -> io::Result<(Vec<CraiRecord>, Vec<BaiEntry>)>
where
    R: Read,
{
    let mut counting = CountingReader::new(reader);
    let mut crai_records = Vec::new();
    let mut bai_entries = Vec::new();

    loop {
        let container_byte_offset = counting.position();

        let decoded = decode_container_with_header(&mut counting, version)?;
        let (container, header) = match decoded {
            Some(pair) => pair,
            None => break,
        };

        let (mut crai, mut bai) = index_container(&container, &header, container_byte_offset)?;
        crai_records.append(&mut crai);
        bai_entries.append(&mut bai);
    }

    Ok((crai_records, bai_entries))
}

/// Builds CRAI and BAI entries for every slice in `container`, whose header
/// started at `container_byte_offset` in the stream.
///
/// Fails with [`Kind::IndexNotInitialized`] if `container_header` doesn't
/// carry one landmark per slice — an encoder bug, since
/// [`crate::container::encode_container`] always writes exactly one.
pub fn index_container(
    container: &Container,
    container_header: &ContainerHeader,
    container_byte_offset: u64,
) -> io::Result<(Vec<CraiRecord>, Vec<BaiEntry>)> {
    let landmarks = container_header.landmarks();
    let slices = container.slices();

    if landmarks.len() != slices.len() {
        return Err(Error::new(
            Kind::IndexNotInitialized,
            format!(
                "container has {} slices but {} landmarks",
                slices.len(),
                landmarks.len()
            ),
        )
        .into());
    }

    let mut crai_records = Vec::new();
    let mut bai_entries = Vec::new();

    for (landmark_index, slice) in slices.iter().enumerate() {
        let slice_header_byte_offset = landmarks[landmark_index] as u64;
        let slice_byte_size = landmarks
            .get(landmark_index + 1)
            .map(|&next| next - landmarks[landmark_index])
            .unwrap_or_else(|| container_header.body_length() - landmarks[landmark_index])
            as u64;

        push_crai_records(
            &mut crai_records,
            container.compression_header(),
            slice,
            container_byte_offset,
            slice_header_byte_offset,
            slice_byte_size,
        )?;

        push_bai_entries(
            &mut bai_entries,
            container.compression_header(),
            slice,
            container_byte_offset,
            slice_header_byte_offset,
            landmark_index,
        )?;
    }

    Ok((crai_records, bai_entries))
}

fn push_crai_records(
    index: &mut Vec<CraiRecord>,
    compression_header: &CompressionHeader,
    slice: &Slice,
    container_byte_offset: u64,
    slice_header_byte_offset: u64,
    slice_byte_size: u64,
) -> io::Result<()> {
    match slice.header().reference_context() {
        ReferenceContext::MultiRef => push_crai_records_for_multi_reference_slice(
            index,
            compression_header,
            slice,
            container_byte_offset,
            slice_header_byte_offset,
            slice_byte_size,
        ),
        _ => {
            push_crai_record_for_single_reference_slice(
                index,
                slice,
                container_byte_offset,
                slice_header_byte_offset,
                slice_byte_size,
            );
            Ok(())
        }
    }
}

fn push_crai_record_for_single_reference_slice(
    index: &mut Vec<CraiRecord>,
    slice: &Slice,
    container_byte_offset: u64,
    slice_header_byte_offset: u64,
    slice_byte_size: u64,
) {
    let header = slice.header();

    let (reference_sequence_id, alignment_start, alignment_span) = match header.reference_context() {
        ReferenceContext::SingleRef(id) => (
            Some(id),
            header.alignment_context().alignment_start(),
            header.alignment_context().alignment_span(),
        ),
        ReferenceContext::UnmappedUnplaced => (None, 0, 0),
        ReferenceContext::MultiRef => unreachable!("dispatched to the multi-reference path"),
    };

    index.push(CraiRecord {
        reference_sequence_id,
        alignment_start,
        alignment_span,
        container_byte_offset,
        slice_header_byte_offset,
        slice_byte_size,
    });
}

fn push_crai_records_for_multi_reference_slice(
    index: &mut Vec<CraiRecord>,
    compression_header: &CompressionHeader,
    slice: &Slice,
    container_byte_offset: u64,
    slice_header_byte_offset: u64,
    slice_byte_size: u64,
) -> io::Result<()> {
    let records = decode_slice(slice, compression_header)?;

    let mut ranges: BTreeMap<Option<usize>, (i32, i32)> = BTreeMap::new();
    for record in &records {
        let key = placed_reference_id(record);
        let entry = ranges.entry(key).or_insert((i32::MAX, i32::MIN));

        if key.is_some() {
            entry.0 = entry.0.min(record.alignment_start);
            entry.1 = entry.1.max(record.alignment_end());
        }
    }

    let mut keys: Vec<Option<usize>> = ranges.keys().copied().collect();
    keys.sort_unstable_by(order_reference_ids_placed_first);

    for key in keys {
        let (alignment_start, alignment_span) = match key {
            Some(_) => {
                let &(start, end) = &ranges[&key];
                (start, (end - start + 1).max(0))
            }
            None => (0, 0),
        };

        index.push(CraiRecord {
            reference_sequence_id: key,
            alignment_start,
            alignment_span,
            container_byte_offset,
            slice_header_byte_offset,
            slice_byte_size,
        });
    }

    Ok(())
}

fn push_bai_entries(
    bai: &mut Vec<BaiEntry>,
    compression_header: &CompressionHeader,
    slice: &Slice,
    container_byte_offset: u64,
    slice_header_byte_offset: u64,
    landmark_index: usize,
) -> io::Result<()> {
    let header = slice.header();

    match header.reference_context() {
        ReferenceContext::MultiRef => {
            let records = decode_slice(slice, compression_header)?;
            let mut spans: BTreeMap<Option<usize>, AlignmentSpan> = BTreeMap::new();

            for record in &records {
                let (key, span) = classify_record(record);
                let entry = spans.entry(key).or_insert_with(AlignmentSpan::default);
                *entry = entry.combine(span);
            }

            let mut keys: Vec<Option<usize>> = spans.keys().copied().collect();
            keys.sort_unstable_by(order_reference_ids_placed_first);

            for key in keys {
                bai.push(BaiEntry {
                    reference_context: key
                        .map(ReferenceContext::SingleRef)
                        .unwrap_or(ReferenceContext::UnmappedUnplaced),
                    alignment_span: spans[&key],
                    container_byte_offset,
                    slice_header_byte_offset,
                    landmark_index,
                });
            }
        }
        ReferenceContext::SingleRef(id) => {
            let alignment_context = header.alignment_context();
            let span = AlignmentSpan::new(
                alignment_context.alignment_start(),
                alignment_context.alignment_span(),
                header.record_count(),
                0,
                0,
            );

            bai.push(BaiEntry {
                reference_context: ReferenceContext::SingleRef(id),
                alignment_span: span,
                container_byte_offset,
                slice_header_byte_offset,
                landmark_index,
            });
        }
        ReferenceContext::UnmappedUnplaced => {
            bai.push(BaiEntry {
                reference_context: ReferenceContext::UnmappedUnplaced,
                alignment_span: AlignmentSpan::unplaced(header.record_count()),
                container_byte_offset,
                slice_header_byte_offset,
                landmark_index,
            });
        }
    }

    Ok(())
}

fn placed_reference_id(record: &CramRecord) -> Option<usize> {
    if record.is_placed() {
        record.reference_sequence_id
    } else {
        None
    }
}

fn classify_record(record: &CramRecord) -> (Option<usize>, AlignmentSpan) {
    if !record.is_placed() {
        return (None, AlignmentSpan::unplaced(1));
    }

    let span = record.alignment_span() as i32;

    if record.bam_flags.is_unmapped() {
        (
            record.reference_sequence_id,
            AlignmentSpan::new(record.alignment_start, span, 0, 1, 0),
        )
    } else {
        (
            record.reference_sequence_id,
            AlignmentSpan::new(record.alignment_start, span, 1, 0, 0),
        )
    }
}

/// Orders `Some` ids ascending, with the unplaced/unmapped `None` bucket
/// sorted last (CRAI/BAI convention).
fn order_reference_ids_placed_first(a: &Option<usize>, b: &Option<usize>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// A thin byte-counting wrapper so [`build_index`] can record each
/// container's start offset without requiring a `Seek` bound on `reader`.
struct CountingReader<R> {
    inner: R,
    position: u64,
}

impl<R> CountingReader<R> {
    fn new(inner: R) -> Self {
        Self { inner, position: 0 }
    }

    fn position(&self) -> u64 {
        self.position
    }
}

impl<R> Read for CountingReader<R>
where
    R: Read,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{build_container, encode_container, AlignmentContext, Block, ContentType, Method};
    use crate::container::compression_header::CompressionHeader;
    use crate::record::{CramFlags, CramRecord, Flags, MateFlags};

    fn sample(reference_sequence_id: Option<usize>, alignment_start: i32) -> CramRecord {
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
    fn test_index_container_single_reference_slice() -> io::Result<()> {
        let compression_header = CompressionHeader::default();
        let records = vec![sample(Some(0), 1), sample(Some(0), 5)];

        let mut diagnostics = crate::diagnostics::Diagnostics::default();
        let container = build_container(compression_header, &records, 10, 0, None, &mut diagnostics)?;

        let mut buf = Vec::new();
        encode_container(&mut buf, &container, Version::V3_0)?;

        let mut reader = &buf[..];
        let (decoded, header) = decode_container_with_header(&mut reader, Version::V3_0)?.unwrap();

        let (crai, bai) = index_container(&decoded, &header, 0)?;

        assert_eq!(crai.len(), 1);
        assert_eq!(crai[0].reference_sequence_id, Some(0));
        assert_eq!(bai.len(), 1);
        assert_eq!(bai[0].alignment_span.mapped_count(), 2);

        Ok(())
    }

    #[test]
    fn test_index_container_rejects_landmark_mismatch() {
        let compression_header = CompressionHeader::default();
        let container = Container::new(compression_header, Vec::new());
        let header = ContainerHeader::new(
            0,
            AlignmentContext::new(ReferenceContext::UnmappedUnplaced, 0, 0).unwrap(),
            0,
            0,
            0,
            1,
            vec![0],
        );

        let result = index_container(&container, &header, 0);
        assert!(result.is_err());
    }

    #[test]
    fn test_order_reference_ids_places_none_last() {
        let mut ids = vec![None, Some(2), Some(0)];
        ids.sort_unstable_by(order_reference_ids_placed_first);
        assert_eq!(ids, vec![Some(0), Some(2), None]);
    }
}
