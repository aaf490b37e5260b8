//! Decodes a [`super::Slice`] back into raw [`CramRecord`]s: reads the core
//! bitstream and external byte streams against the compression header's
//! per-series codec assignments.
//!
//! Records produced here are *raw*: unnamed/unlinked mates, substitution
//! codes not yet resolved against a reference, and (unless
//! `FORCE_PRESERVE_QUALITY_SCORES` was set) empty quality scores. Turning
//! these into fully resolved records is [`crate::normalize`]'s job.

use std::collections::HashMap;
use std::io::{self, Read};

use crate::bitio::BitReader;
use crate::container::compression_header::encoding::{ByteArray, Integer};
use crate::container::compression_header::CompressionHeader;
use crate::container::ReferenceContext;
use crate::num::read_itf8;
use crate::record::feature::{Code, ReadFeature};
use crate::record::{CramFlags, CramRecord, Flags, MateFlags};

use super::Slice;

/// Decodes every record in `slice` against `header`.
pub fn decode_slice(slice: &Slice, header: &CompressionHeader) -> io::Result<Vec<CramRecord>> {
    let reference_context = slice.header().reference_context();

    let mut external_data: HashMap<i32, Vec<u8>> = HashMap::new();
    for (&id, block) in slice.blocks().external() {
        external_data.insert(id, block.decode()?);
    }

    let mut external: HashMap<i32, &[u8]> =
        external_data.iter().map(|(&id, data)| (id, data.as_slice())).collect();

    let core_bytes = slice.blocks().core().decode()?;
    let mut core = BitReader::new(&core_bytes);

    let record_count = slice.header().record_count();
    let mut records = Vec::with_capacity(record_count);
    let mut previous_alignment_start = 0;

    for sequential_index in 0..record_count {
        let record = decode_record(
            header,
            &mut core,
            &mut external,
            reference_context,
            sequential_index,
            &mut previous_alignment_start,
        )?;
        records.push(record);
    }

    Ok(records)
}

fn decode_record(
    header: &CompressionHeader,
    core: &mut BitReader<'_>,
    external: &mut HashMap<i32, &[u8]>,
    reference_context: ReferenceContext,
    sequential_index: usize,
    previous_alignment_start: &mut i32,
) -> io::Result<CramRecord> {
    let encodings = header.data_series_encodings();
    let preservation_map = header.preservation_map();

    let bam_flags = Flags::from_bits_truncate(decode_integer(must(encodings.bam_flags())?, core, external)? as u16);
    let cram_flags =
        CramFlags::from_bits_truncate(decode_integer(must(encodings.cram_flags())?, core, external)? as u8);

    let reference_sequence_id = if reference_context.is_many() {
        match decode_integer(must(encodings.reference_ids())?, core, external)? {
            -1 => None,
            id => Some(id as usize),
        }
    } else if let ReferenceContext::SingleRef(id) = reference_context {
        Some(id)
    } else {
        None
    };

    let read_length = decode_integer(must(encodings.read_lengths())?, core, external)? as usize;

    let alignment_start_value = decode_integer(must(encodings.alignment_starts())?, core, external)?;
    let alignment_start = if preservation_map.alignment_starts_are_deltas() {
        *previous_alignment_start += alignment_start_value;
        *previous_alignment_start
    } else {
        *previous_alignment_start = alignment_start_value;
        alignment_start_value
    };

    let read_group_id = match decode_integer(must(encodings.read_groups())?, core, external)? {
        -1 => None,
        id => Some(id as usize),
    };

    let read_name = if preservation_map.records_have_names() {
        let name = decode_byte_array(must_ba(encodings.names())?, core, external)?;
        if name.is_empty() { None } else { Some(name) }
    } else {
        None
    };

    let (mate_flags, mate_reference_sequence_id, mate_alignment_start, template_size) =
        if cram_flags.is_detached() {
            let mate_flags =
                MateFlags::from_bits_truncate(decode_integer(must(encodings.mate_flags())?, core, external)? as u8);

            let mate_reference_sequence_id =
                match decode_integer(must(encodings.mate_reference_ids())?, core, external)? {
                    -1 => None,
                    id => Some(id as usize),
                };

            let mate_alignment_start = decode_integer(must(encodings.mate_alignment_starts())?, core, external)?;
            let template_size = decode_integer(must(encodings.template_sizes())?, core, external)?;

            (mate_flags, mate_reference_sequence_id, mate_alignment_start, template_size)
        } else {
            (MateFlags::empty(), None, 0, 0)
        };

    let records_to_next_fragment = if cram_flags.has_mate_downstream() {
        decode_integer(must(encodings.mate_distances())?, core, external)?
    } else {
        -1
    };

    let tag_line = decode_integer(must(encodings.tag_set_ids())?, core, external)?;
    let tags = resolve_tags(preservation_map, tag_line, header, core, external)?;

    let feature_count = decode_integer(must(encodings.feature_counts())?, core, external)? as usize;

    let mut read_features = Vec::with_capacity(feature_count);
    let mut previous_position = 0usize;
    for _ in 0..feature_count {
        read_features.push(decode_feature(encodings, core, external, &mut previous_position)?);
    }

    let mapping_quality_value = decode_integer(must(encodings.mapping_qualities())?, core, external)?;
    let mapping_quality = if reference_sequence_id.is_some() && alignment_start != 0 {
        Some(mapping_quality_value as u8)
    } else {
        None
    };

    let quality_scores = if cram_flags.are_quality_scores_stored_as_array() {
        let mut scores = Vec::with_capacity(read_length);
        for _ in 0..read_length {
            scores.push(decode_integer(must(encodings.quality_scores())?, core, external)? as u8);
        }
        scores
    } else {
        Vec::new()
    };

    Ok(CramRecord {
        bam_flags,
        cram_flags,
        reference_sequence_id,
        alignment_start,
        read_length,
        read_features,
        mapping_quality,
        read_group_id,
        read_name,
        read_bases: Vec::new(),
        quality_scores,
        tags,
        sequential_index,
        template_size,
        mate_flags,
        mate_reference_sequence_id,
        mate_alignment_start,
        records_to_next_fragment,
        next: None,
        prev: None,
    })
}

fn decode_feature(
    encodings: &crate::container::compression_header::DataSeriesEncodings,
    core: &mut BitReader<'_>,
    external: &mut HashMap<i32, &[u8]>,
    previous_position: &mut usize,
) -> io::Result<ReadFeature> {
    let code_value = decode_integer(must(encodings.feature_codes())?, core, external)? as u8;
    let code = Code::from_u8(code_value)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, format!("invalid feature code: {code_value}")))?;

    let delta = decode_integer(must(encodings.feature_position_deltas())?, core, external)?;
    let position = (*previous_position as i64 + delta as i64) as usize;
    *previous_position = position;

    let feature = match code {
        Code::Substitution => {
            let value = decode_integer(must(encodings.base_substitution_codes())?, core, external)?;
            ReadFeature::Substitution { position, code: value as u8 }
        }
        Code::Insertion => {
            let bases = decode_byte_array(must_ba(encodings.insertion_bases())?, core, external)?;
            ReadFeature::Insertion { position, bases }
        }
        Code::Deletion => {
            let len = decode_integer(must(encodings.deletion_lengths())?, core, external)?;
            ReadFeature::Deletion { position, len: len as usize }
        }
        Code::InsertBase => {
            let bases = decode_byte_array(must_ba(encodings.insertion_bases())?, core, external)?;
            let base = *bases.first().unwrap_or(&b'N');
            ReadFeature::InsertBase { position, base }
        }
        Code::ReferenceSkip => {
            let len = decode_integer(must(encodings.reference_skip_lengths())?, core, external)?;
            ReadFeature::ReferenceSkip { position, len: len as usize }
        }
        Code::SoftClip => {
            let bases = decode_byte_array(must_ba(encodings.soft_clip_bases())?, core, external)?;
            ReadFeature::SoftClip { position, bases }
        }
        Code::Padding => {
            let len = decode_integer(must(encodings.padding_lengths())?, core, external)?;
            ReadFeature::Padding { position, len: len as usize }
        }
        Code::HardClip => {
            let len = decode_integer(must(encodings.hard_clip_lengths())?, core, external)?;
            ReadFeature::HardClip { position, len: len as usize }
        }
        Code::ReadBase => {
            let base = decode_integer(must(encodings.bases())?, core, external)? as u8;
            let quality_score = decode_integer(must(encodings.quality_scores())?, core, external)? as u8;
            ReadFeature::ReadBase { position, base, quality_score }
        }
        Code::QualityScore => {
            let quality_score = decode_integer(must(encodings.quality_scores())?, core, external)? as u8;
            ReadFeature::QualityScore { position, quality_score }
        }
        Code::Bases => {
            let bases = decode_byte_array(must_ba(encodings.stretches_of_bases())?, core, external)?;
            ReadFeature::Bases { position, bases }
        }
        Code::Scores => {
            let quality_scores = decode_byte_array(must_ba(encodings.stretches_of_quality_scores())?, core, external)?;
            ReadFeature::Scores { position, quality_scores }
        }
    };

    Ok(feature)
}

fn resolve_tags(
    preservation_map: &crate::container::compression_header::PreservationMap,
    tag_line: i32,
    header: &CompressionHeader,
    core: &mut BitReader<'_>,
    external: &mut HashMap<i32, &[u8]>,
) -> io::Result<Vec<crate::record::ReadTag>> {
    use crate::record::ReadTag;

    if tag_line < 0 {
        return Ok(Vec::new());
    }

    let tag_set = preservation_map
        .tag_sets()
        .get(tag_line as usize)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, format!("unknown tag line index: {tag_line}")))?;

    let mut tags = Vec::with_capacity(tag_set.len());

    for (tag, _ty) in tag_set {
        let encoding = header
            .tag_encoding(tag.key())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, format!("no encoding for tag {:?}", tag.key())))?;

        let value = match encoding {
            crate::container::compression_header::Encoding::ByteArray(ba) => {
                decode_byte_array(ba, core, external)?
            }
            crate::container::compression_header::Encoding::Integer(Integer::External { block_content_id }) => {
                let cursor = external.get_mut(block_content_id).ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidData, format!("missing external block {block_content_id}"))
                })?;
                let mut buf = Vec::new();
                cursor.read_to_end(&mut buf)?;
                buf
            }
            crate::container::compression_header::Encoding::Integer(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "tag values require an external or byte-array encoding",
                ))
            }
        };

        tags.push(ReadTag::new(*tag, value));
    }

    Ok(tags)
}

fn decode_integer(encoding: &Integer, core: &mut BitReader<'_>, external: &mut HashMap<i32, &[u8]>) -> io::Result<i32> {
    if let Integer::External { block_content_id } = encoding {
        let cursor = external.get_mut(block_content_id).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, format!("missing external block {block_content_id}"))
        })?;
        read_itf8(cursor)
    } else {
        encoding.decode_core(core)
    }
}

fn decode_byte_array(
    encoding: &ByteArray,
    core: &mut BitReader<'_>,
    external: &mut HashMap<i32, &[u8]>,
) -> io::Result<Vec<u8>> {
    match encoding {
        ByteArray::ByteArrayStop { stop_byte, block_content_id } => {
            let cursor = external.get_mut(block_content_id).ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidData, format!("missing external block {block_content_id}"))
            })?;

            let mut buf = Vec::new();
            let mut byte = [0u8; 1];

            loop {
                cursor.read_exact(&mut byte)?;
                if byte[0] == *stop_byte {
                    break;
                }
                buf.push(byte[0]);
            }

            Ok(buf)
        }
        ByteArray::ByteArrayLength { len_encoding, value_block_content_id } => {
            let len = if len_encoding.is_external() {
                let cursor = external.get_mut(value_block_content_id).ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("missing external block {value_block_content_id}"),
                    )
                })?;
                read_itf8(cursor)?
            } else {
                len_encoding.decode_core(core)?
            };

            let len = usize::try_from(len)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "negative byte array length"))?;

            let cursor = external.get_mut(value_block_content_id).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("missing external block {value_block_content_id}"),
                )
            })?;

            let mut buf = vec![0u8; len];
            cursor.read_exact(&mut buf)?;

            Ok(buf)
        }
    }
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
    use crate::container::compression_header::CompressionHeader;
    use crate::container::slice::build::build_slice;
    use crate::diagnostics::Diagnostics;
    use crate::record::{CramFlags, Flags, MateFlags};

    fn record(reference_sequence_id: Option<usize>, alignment_start: i32, read_length: usize) -> CramRecord {
        CramRecord {
            bam_flags: Flags::empty(),
            cram_flags: CramFlags::empty(),
            reference_sequence_id,
            alignment_start,
            read_length,
            read_features: vec![ReadFeature::Substitution { position: 2, code: 1 }],
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
    fn test_round_trip_single_record() -> io::Result<()> {
        let header = CompressionHeader::default();
        let records = vec![record(Some(0), 10, 8)];

        let mut diagnostics = Diagnostics::default();
        let slice = build_slice(&header, &records, 0, None, &mut diagnostics)?;
        let decoded = decode_slice(&slice, &header)?;

        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].alignment_start, 10);
        assert_eq!(decoded[0].read_length, 8);
        assert_eq!(decoded[0].read_name, Some(b"r1".to_vec()));
        assert_eq!(decoded[0].read_features.len(), 1);

        Ok(())
    }

    #[test]
    fn test_round_trip_preserves_alignment_start_deltas() -> io::Result<()> {
        let header = CompressionHeader::default();
        let records = vec![record(Some(0), 10, 4), record(Some(0), 25, 4), record(Some(0), 12, 4)];

        let mut diagnostics = Diagnostics::default();
        let slice = build_slice(&header, &records, 0, None, &mut diagnostics)?;
        let decoded = decode_slice(&slice, &header)?;

        let starts: Vec<i32> = decoded.iter().map(|r| r.alignment_start).collect();
        assert_eq!(starts, vec![10, 25, 12]);

        Ok(())
    }

    #[test]
    fn test_round_trip_detached_mate() -> io::Result<()> {
        let header = CompressionHeader::default();

        let mut rec = record(Some(0), 10, 4);
        rec.cram_flags = CramFlags::DETACHED;
        rec.mate_reference_sequence_id = Some(0);
        rec.mate_alignment_start = 110;
        rec.template_size = 200;

        let mut diagnostics = Diagnostics::default();
        let slice = build_slice(&header, &[rec], 0, None, &mut diagnostics)?;
        let decoded = decode_slice(&slice, &header)?;

        assert_eq!(decoded[0].mate_alignment_start, 110);
        assert_eq!(decoded[0].template_size, 200);

        Ok(())
    }
}
