//! Builds a [`super::Slice`] from an in-memory batch of records: derives
//! the slice's [`AlignmentContext`], runs each record through the
//! compression header's per-series encoders, and packs the resulting core
//! and external byte streams into [`Block`]s.

use std::collections::HashMap;
use std::io::{self, Write};

use indexmap::IndexMap;

use crate::bitio::BitWriter;
use crate::container::block::{Block, ContentType, Method};
use crate::container::compression_header::encoding::{ByteArray, Encoding, Integer};
use crate::container::compression_header::CompressionHeader;
use crate::container::{AlignmentContext, ReferenceContext};
use crate::diagnostics::Diagnostics;
use crate::num::write_itf8;
use crate::reference::ReferenceSequence;
use crate::record::CramRecord;

use super::header::MD5_LEN;
use super::{Slice, SliceBlocks, SliceHeader};

/// Derives a batch of records' [`AlignmentContext`] (spec.md §4.5): zero
/// distinct placed reference ids collapses to `UnmappedUnplaced`, exactly
/// one to `SingleRef` with the covering interval, more than one to
/// `MultiRef`.
pub fn derive_alignment_context(records: &[CramRecord]) -> AlignmentContext {
    let mut placed_ref_ids: Vec<usize> = records
        .iter()
        .filter(|r| r.is_placed())
        .filter_map(|r| r.reference_sequence_id)
        .collect();
    placed_ref_ids.sort_unstable();
    placed_ref_ids.dedup();

    match placed_ref_ids.as_slice() {
        [] => AlignmentContext::new(ReferenceContext::UnmappedUnplaced, 0, 0)
            .expect("(0, 0) is always a valid unmapped/unplaced context"),
        [seq_id] => {
            let seq_id = *seq_id;

            let (start, end) = records
                .iter()
                .filter(|r| r.is_placed() && r.reference_sequence_id == Some(seq_id))
                .map(|r| (r.alignment_start, r.alignment_end()))
                .fold((i32::MAX, i32::MIN), |(min_start, max_end), (start, end)| {
                    (min_start.min(start), max_end.max(end))
                });

            let span = (end - start + 1).max(0);

            AlignmentContext::new(ReferenceContext::SingleRef(seq_id), start, span)
                .expect("a derived single-reference span is never negative")
        }
        _ => AlignmentContext::new(ReferenceContext::MultiRef, 0, 0)
            .expect("(0, 0) is always a valid multi-reference context"),
    }
}

/// Builds a slice out of `records`, sharing `header`'s per-series codec
/// assignments. `global_record_counter` is this slice's first record's
/// position in the container's overall record stream.
///
/// When the derived context is `SingleRef` and the compression header's
/// preservation map requires an external reference (`RR=true`), `reference`
/// is hashed into the slice header's reference MD5 (spec.md §4.8); any other
/// context stores the all-zero sentinel, and so does a `SingleRef` slice
/// built with `reference: None`.
pub fn build_slice(
    header: &CompressionHeader,
    records: &[CramRecord],
    global_record_counter: u64,
    reference: Option<&dyn ReferenceSequence>,
    diagnostics: &mut Diagnostics,
) -> io::Result<Slice> {
    let alignment_context = derive_alignment_context(records);
    let reference_context = alignment_context.reference_context();

    let mut core = BitWriter::default();
    let mut external: HashMap<i32, Vec<u8>> = HashMap::new();
    let mut previous_alignment_start = 0;

    for record in records {
        encode_record(
            header,
            &mut core,
            &mut external,
            reference_context,
            record,
            &mut previous_alignment_start,
        )?;
    }

    let core_block = Block::create_raw_core_data_block(core.finish()?);

    let mut content_ids: Vec<i32> = external.keys().copied().collect();
    content_ids.sort_unstable();

    let mut external_blocks = IndexMap::new();
    for id in content_ids {
        let data = external.remove(&id).unwrap_or_default();
        let block = Block::encode(ContentType::ExternalData, id, Method::Gzip, &data)?;
        external_blocks.insert(id, block);
    }

    let slice_blocks = SliceBlocks::new(core_block, external_blocks, None).map_err(io::Error::from)?;

    let external_content_ids = slice_blocks.external().keys().copied().collect();
    let n_blocks = slice_blocks.n_blocks();

    let reference_md5 = match (reference_context, reference) {
        (ReferenceContext::SingleRef(seq_id), Some(reference))
            if header.preservation_map().external_reference_sequence_is_required() =>
        {
            super::compute_reference_md5(
                reference,
                seq_id,
                alignment_context.alignment_start(),
                alignment_context.alignment_span(),
                diagnostics,
            )?
        }
        _ => [0u8; MD5_LEN],
    };

    let slice_header = SliceHeader::new(
        alignment_context,
        records.len(),
        global_record_counter,
        n_blocks,
        external_content_ids,
        None,
        reference_md5,
    );

    Ok(Slice::new(slice_header, slice_blocks))
}

fn encode_record(
    header: &CompressionHeader,
    core: &mut BitWriter,
    external: &mut HashMap<i32, Vec<u8>>,
    reference_context: ReferenceContext,
    record: &CramRecord,
    previous_alignment_start: &mut i32,
) -> io::Result<()> {
    let encodings = header.data_series_encodings();
    let preservation_map = header.preservation_map();

    encode_integer(must(encodings.bam_flags())?, core, external, i32::from(record.bam_flags.bits()))?;
    encode_integer(must(encodings.cram_flags())?, core, external, i32::from(record.cram_flags.bits()))?;

    if reference_context.is_many() {
        let reference_id = record.reference_sequence_id.map_or(-1, |id| id as i32);
        encode_integer(must(encodings.reference_ids())?, core, external, reference_id)?;
    }

    encode_integer(must(encodings.read_lengths())?, core, external, record.read_length as i32)?;

    let alignment_start_value = if preservation_map.alignment_starts_are_deltas() {
        let delta = record.alignment_start - *previous_alignment_start;
        *previous_alignment_start = record.alignment_start;
        delta
    } else {
        record.alignment_start
    };
    encode_integer(must(encodings.alignment_starts())?, core, external, alignment_start_value)?;

    let read_group = record.read_group_id.map_or(-1, |id| id as i32);
    encode_integer(must(encodings.read_groups())?, core, external, read_group)?;

    if preservation_map.records_have_names() {
        let name = record.read_name.as_deref().unwrap_or(&[]);
        encode_byte_array(must_ba(encodings.names())?, core, external, name)?;
    }

    if record.cram_flags.is_detached() {
        encode_integer(must(encodings.mate_flags())?, core, external, i32::from(record.mate_flags.bits()))?;

        let mate_reference_id = record.mate_reference_sequence_id.map_or(-1, |id| id as i32);
        encode_integer(must(encodings.mate_reference_ids())?, core, external, mate_reference_id)?;
        encode_integer(
            must(encodings.mate_alignment_starts())?,
            core,
            external,
            record.mate_alignment_start,
        )?;
        encode_integer(must(encodings.template_sizes())?, core, external, record.template_size)?;
    }

    if record.cram_flags.has_mate_downstream() {
        encode_integer(
            must(encodings.mate_distances())?,
            core,
            external,
            record.records_to_next_fragment,
        )?;
    }

    let tag_line = tag_line_index(preservation_map, record)?;
    encode_integer(must(encodings.tag_set_ids())?, core, external, tag_line)?;

    encode_integer(must(encodings.feature_counts())?, core, external, record.read_features.len() as i32)?;

    let mut previous_position = 0usize;
    for feature in &record.read_features {
        encode_feature(encodings, core, external, feature, &mut previous_position)?;
    }

    let mapping_quality = i32::from(record.mapping_quality.unwrap_or(0));
    encode_integer(must(encodings.mapping_qualities())?, core, external, mapping_quality)?;

    if record.cram_flags.are_quality_scores_stored_as_array() {
        for &quality_score in &record.quality_scores {
            encode_integer(must(encodings.quality_scores())?, core, external, i32::from(quality_score))?;
        }
    }

    for tag in &record.tags {
        let encoding = header.tag_encoding(tag.tag().key()).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("no encoding registered for tag {:?}", tag.tag().key()),
            )
        })?;

        encode_tag_value(encoding, core, external, tag.value())?;
    }

    Ok(())
}

fn encode_feature(
    encodings: &crate::container::compression_header::DataSeriesEncodings,
    core: &mut BitWriter,
    external: &mut HashMap<i32, Vec<u8>>,
    feature: &crate::record::feature::ReadFeature,
    previous_position: &mut usize,
) -> io::Result<()> {
    use crate::record::feature::ReadFeature;

    encode_integer(must(encodings.feature_codes())?, core, external, i32::from(feature.code().as_u8()))?;

    let position_delta = feature.position() as i64 - *previous_position as i64;
    encode_integer(
        must(encodings.feature_position_deltas())?,
        core,
        external,
        position_delta as i32,
    )?;
    *previous_position = feature.position();

    match feature {
        ReadFeature::Substitution { code, .. } => {
            encode_integer(must(encodings.base_substitution_codes())?, core, external, i32::from(*code))
        }
        ReadFeature::Insertion { bases, .. } => {
            encode_byte_array(must_ba(encodings.insertion_bases())?, core, external, bases)
        }
        ReadFeature::Deletion { len, .. } => {
            encode_integer(must(encodings.deletion_lengths())?, core, external, *len as i32)
        }
        ReadFeature::InsertBase { base, .. } => {
            encode_byte_array(must_ba(encodings.insertion_bases())?, core, external, &[*base])
        }
        ReadFeature::ReferenceSkip { len, .. } => {
            encode_integer(must(encodings.reference_skip_lengths())?, core, external, *len as i32)
        }
        ReadFeature::SoftClip { bases, .. } => {
            encode_byte_array(must_ba(encodings.soft_clip_bases())?, core, external, bases)
        }
        ReadFeature::Padding { len, .. } => {
            encode_integer(must(encodings.padding_lengths())?, core, external, *len as i32)
        }
        ReadFeature::HardClip { len, .. } => {
            encode_integer(must(encodings.hard_clip_lengths())?, core, external, *len as i32)
        }
        ReadFeature::ReadBase { base, quality_score, .. } => {
            encode_integer(must(encodings.bases())?, core, external, i32::from(*base))?;
            encode_integer(must(encodings.quality_scores())?, core, external, i32::from(*quality_score))
        }
        ReadFeature::QualityScore { quality_score, .. } => {
            encode_integer(must(encodings.quality_scores())?, core, external, i32::from(*quality_score))
        }
        ReadFeature::Bases { bases, .. } => {
            encode_byte_array(must_ba(encodings.stretches_of_bases())?, core, external, bases)
        }
        ReadFeature::Scores { quality_scores, .. } => {
            encode_byte_array(must_ba(encodings.stretches_of_quality_scores())?, core, external, quality_scores)
        }
    }
}

fn encode_tag_value(
    encoding: &Encoding,
    core: &mut BitWriter,
    external: &mut HashMap<i32, Vec<u8>>,
    value: &[u8],
) -> io::Result<()> {
    match encoding {
        Encoding::ByteArray(ba) => encode_byte_array(ba, core, external, value),
        Encoding::Integer(Integer::External { block_content_id }) => {
            external.entry(*block_content_id).or_default().extend_from_slice(value);
            Ok(())
        }
        Encoding::Integer(_) => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "tag values require an external or byte-array encoding",
        )),
    }
}

fn encode_integer(
    encoding: &Integer,
    core: &mut BitWriter,
    external: &mut HashMap<i32, Vec<u8>>,
    value: i32,
) -> io::Result<()> {
    if let Integer::External { block_content_id } = encoding {
        write_itf8(external.entry(*block_content_id).or_default(), value)
    } else {
        encoding.encode_core(core, value)
    }
}

fn encode_byte_array(
    encoding: &ByteArray,
    core: &mut BitWriter,
    external: &mut HashMap<i32, Vec<u8>>,
    value: &[u8],
) -> io::Result<()> {
    match encoding {
        ByteArray::ByteArrayStop { stop_byte, block_content_id } => {
            if value.contains(stop_byte) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "byte array value contains its series' stop byte",
                ));
            }

            let buf = external.entry(*block_content_id).or_default();
            buf.write_all(value)?;
            buf.push(*stop_byte);
            Ok(())
        }
        ByteArray::ByteArrayLength { len_encoding, value_block_content_id } => {
            let len = value.len() as i32;

            if len_encoding.is_external() {
                write_itf8(external.entry(*value_block_content_id).or_default(), len)?;
            } else {
                len_encoding.encode_core(core, len)?;
            }

            external.entry(*value_block_content_id).or_default().write_all(value)
        }
    }
}

/// Looks up `record`'s tag key set in the compression header's `TD`
/// dictionary, returning its index for the `TL` data series.
fn tag_line_index(
    preservation_map: &crate::container::compression_header::PreservationMap,
    record: &CramRecord,
) -> io::Result<i32> {
    let keys: Vec<[u8; 3]> = record.tags.iter().map(|t| t.tag().key()).collect();

    for (index, tag_set) in preservation_map.tag_sets().iter().enumerate() {
        let set_keys: Vec<[u8; 3]> = tag_set.iter().map(|(tag, _)| tag.key()).collect();
        if set_keys == keys {
            return Ok(index as i32);
        }
    }

    if keys.is_empty() {
        return Ok(-1);
    }

    Err(io::Error::new(
        io::ErrorKind::InvalidData,
        "record's tag set has no matching entry in the compression header's tag dictionary",
    ))
}

fn must(encoding: Option<&Integer>) -> io::Result<&Integer> {
    encoding.ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidData, "compression header is missing a required data series encoding")
    })
}

fn must_ba(encoding: Option<&ByteArray>) -> io::Result<&ByteArray> {
    encoding.ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidData, "compression header is missing a required data series encoding")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{CramFlags, Flags, MateFlags};

    fn record(reference_sequence_id: Option<usize>, alignment_start: i32, read_length: usize) -> CramRecord {
        CramRecord {
            bam_flags: Flags::empty(),
            cram_flags: CramFlags::empty(),
            reference_sequence_id,
            alignment_start,
            read_length,
            read_features: Vec::new(),
            mapping_quality: Some(40),
            read_group_id: None,
            read_name: Some(b"r1".to_vec()),
            read_bases: vec![b'A'; read_length],
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
    fn test_derive_alignment_context_single_ref() {
        let records = vec![record(Some(0), 10, 5), record(Some(0), 20, 5)];
        let ctx = derive_alignment_context(&records);

        assert_eq!(ctx.reference_context(), ReferenceContext::SingleRef(0));
        assert_eq!(ctx.alignment_start(), 10);
        assert_eq!(ctx.alignment_span(), 15);
    }

    #[test]
    fn test_derive_alignment_context_multi_ref() {
        let records = vec![record(Some(0), 10, 5), record(Some(1), 20, 5)];
        let ctx = derive_alignment_context(&records);
        assert_eq!(ctx.reference_context(), ReferenceContext::MultiRef);
    }

    #[test]
    fn test_derive_alignment_context_unplaced() {
        let records = vec![record(None, 0, 5)];
        let ctx = derive_alignment_context(&records);
        assert_eq!(ctx.reference_context(), ReferenceContext::UnmappedUnplaced);
    }

    #[test]
    fn test_build_slice_round_trips_record_count() -> io::Result<()> {
        let header = CompressionHeader::default();
        let records = vec![record(Some(0), 10, 5), record(Some(0), 12, 5)];

        let mut diagnostics = Diagnostics::default();
        let slice = build_slice(&header, &records, 0, None, &mut diagnostics)?;
        assert_eq!(slice.header().record_count(), 2);
        assert_eq!(slice.header().reference_context(), ReferenceContext::SingleRef(0));
        assert_eq!(slice.header().reference_md5(), &[0u8; MD5_LEN]);

        Ok(())
    }

    #[test]
    fn test_build_slice_computes_reference_md5_when_required() -> io::Result<()> {
        use crate::reference::InMemoryReferenceSequences;

        // `CompressionHeader::default()`'s preservation map already has
        // `RR=true` (external reference sequence required).
        let header = CompressionHeader::default();
        let records = vec![record(Some(0), 1, 4)];
        let reference = InMemoryReferenceSequences::new(vec![b"ACGTACGT".to_vec()]);

        let mut diagnostics = Diagnostics::default();
        let slice = build_slice(&header, &records, 0, Some(&reference), &mut diagnostics)?;

        assert_ne!(slice.header().reference_md5(), &[0u8; MD5_LEN]);

        Ok(())
    }
}
