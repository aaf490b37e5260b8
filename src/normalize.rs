//! Normalization (spec.md §4.7): turns a slice's raw, decoded records into
//! fully materialized SAM-equivalent records — linking mate pairs, naming
//! unnamed reads, and restoring bases and quality scores against a
//! reference.
//!
//! This has no counterpart in the filtered teacher source (mate resolution
//! and base restoration live outside the pruned `noodles-cram` slice);
//! it's written in the same `Diagnostics`-collaborator, `io::Result`-return
//! style as the rest of this crate's decode path.

use std::io;

use crate::container::compression_header::SubstitutionMatrix;
use crate::diagnostics::Diagnostics;
use crate::reference::ReferenceSequence;
use crate::record::{CramFlags, CramRecord, MateFlags, RecordIndex};
use crate::record::feature::ReadFeature;

/// The CRAM convention for "no quality score recorded at this position".
pub const MISSING_QUALITY_SCORE: u8 = 0xff;

/// Knobs for [`normalize`] that the format leaves up to the implementation.
#[derive(Clone, Copy, Debug)]
pub struct NormalizeOptions {
    /// The score substituted for [`MISSING_QUALITY_SCORE`] sentinels and for
    /// positions a mapped record's feature list never supplies one for.
    pub default_quality_score: u8,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            default_quality_score: 30,
        }
    }
}

/// Normalizes every record in `records` in place: mate graph, name
/// assignment, base restoration, quality restoration (spec.md §4.7, in
/// that order). `global_record_counter` is the slice's first record's
/// position in the overall stream, used to resolve `records_to_next_fragment`
/// into an in-slice index.
pub fn normalize<R>(
    records: &mut [CramRecord],
    reference: &R,
    substitution_matrix: &SubstitutionMatrix,
    global_record_counter: u64,
    options: &NormalizeOptions,
    diagnostics: &mut Diagnostics,
) -> io::Result<()>
where
    R: ReferenceSequence,
{
    link_mates(records, global_record_counter);
    assign_names(records);

    for index in 0..records.len() {
        restore_bases(records, index, reference, substitution_matrix, diagnostics)?;
        restore_quality_scores(&mut records[index], options);
    }

    Ok(())
}

fn link_mates(records: &mut [CramRecord], global_record_counter: u64) {
    let n = records.len();

    for i in 0..n {
        let record = &records[i];

        if !(record.is_paired() && !record.cram_flags.is_detached() && record.cram_flags.has_mate_downstream()) {
            continue;
        }

        let target = record.sequential_index as i64 + record.records_to_next_fragment as i64 + 1
            - global_record_counter as i64;

        if target < 0 || target as usize >= n || target as usize == i {
            continue;
        }

        let down = target as usize;
        records[i].next = Some(down);
        records[down].prev = Some(i);
    }

    for i in 0..n {
        if records[i].prev.is_none() && records[i].next.is_some() {
            propagate_mate_chain(records, i);
        }
    }
}

/// Walks a mate chain from its head, propagating each record's mate fields
/// from the next record in the chain (wrapping from tail back to head, the
/// usual convention for templates with more than two segments), then sets
/// the head's and tail's template length from `compute_insert_size`.
fn propagate_mate_chain(records: &mut [CramRecord], head: RecordIndex) {
    let mut chain = vec![head];
    let mut cursor = head;
    while let Some(next) = records[cursor].next {
        chain.push(next);
        cursor = next;
    }

    let n = chain.len();

    let mate_info: Vec<(Option<usize>, i32, bool, bool)> = (0..n)
        .map(|i| {
            let mate = &records[chain[(i + 1) % n]];
            (
                mate.reference_sequence_id,
                mate.alignment_start,
                mate.bam_flags.is_reverse_complemented(),
                mate.bam_flags.is_unmapped(),
            )
        })
        .collect();

    for (i, &this) in chain.iter().enumerate() {
        let (mate_reference_sequence_id, mate_alignment_start, mate_reverse, mate_unmapped) = mate_info[i];

        let mut mate_flags = MateFlags::empty();
        if mate_reverse {
            mate_flags |= MateFlags::MATE_REVERSE_COMPLEMENTED;
        }
        if mate_unmapped {
            mate_flags |= MateFlags::MATE_UNMAPPED;
        }

        let record = &mut records[this];
        record.mate_reference_sequence_id = mate_reference_sequence_id;
        record.mate_alignment_start = mate_alignment_start;
        record.mate_flags = mate_flags;
    }

    let first = chain[0];
    let last = chain[n - 1];

    let insert_size = compute_insert_size(
        records[first].reference_sequence_id,
        records[first].alignment_start,
        records[first].alignment_end(),
        records[last].reference_sequence_id,
        records[last].alignment_start,
        records[last].alignment_end(),
    );

    records[first].template_size = insert_size;
    records[last].template_size = -insert_size;
}

/// `rightmost.alignment_end - leftmost.alignment_start + 1`, signed by read
/// order; `0` when either end is unplaced or they sit on different
/// references.
fn compute_insert_size(
    first_reference_sequence_id: Option<usize>,
    first_alignment_start: i32,
    first_alignment_end: i32,
    last_reference_sequence_id: Option<usize>,
    last_alignment_start: i32,
    last_alignment_end: i32,
) -> i32 {
    if first_reference_sequence_id.is_none()
        || last_reference_sequence_id.is_none()
        || first_reference_sequence_id != last_reference_sequence_id
        || first_alignment_start == 0
        || last_alignment_start == 0
    {
        return 0;
    }

    if first_alignment_start <= last_alignment_start {
        last_alignment_end - first_alignment_start + 1
    } else {
        -(first_alignment_end - last_alignment_start + 1)
    }
}

/// Assigns a stable name (its decimal sequential index) to every unnamed
/// record, then propagates it to that record's immediate chain neighbors
/// if they're unnamed too.
fn assign_names(records: &mut [CramRecord]) {
    let assignments: Vec<(usize, Vec<u8>)> = records
        .iter()
        .enumerate()
        .filter(|(_, record)| record.read_name.is_none())
        .map(|(index, record)| (index, record.sequential_index.to_string().into_bytes()))
        .collect();

    for (index, name) in assignments {
        records[index].read_name = Some(name.clone());

        if let Some(next) = records[index].next {
            if records[next].read_name.is_none() {
                records[next].read_name = Some(name.clone());
            }
        }

        if let Some(prev) = records[index].prev {
            if records[prev].read_name.is_none() {
                records[prev].read_name = Some(name);
            }
        }
    }
}

/// Rebuilds a mapped record's bases from its reference window plus its read
/// features; leaves unplaced records and `CF_UNKNOWN_BASES` records alone
/// (their bases, if any, were already stored literally).
fn restore_bases<R>(
    records: &mut [CramRecord],
    index: usize,
    reference: &R,
    substitution_matrix: &SubstitutionMatrix,
    diagnostics: &mut Diagnostics,
) -> io::Result<()>
where
    R: ReferenceSequence,
{
    if records[index].cram_flags.contains(CramFlags::UNKNOWN_BASES) {
        records[index].read_bases.clear();
        return Ok(());
    }

    if !records[index].is_placed() {
        return Ok(());
    }

    let seq_id = records[index].reference_sequence_id.unwrap();
    let alignment_start = records[index].alignment_start as usize;
    let span = records[index].alignment_span().max(1);

    let reference_length = reference.sequence_length(seq_id)?;
    let available = reference_length.saturating_sub(alignment_start.saturating_sub(1));
    let want = span.min(available);

    let reference_bases = if want == 0 {
        Vec::new()
    } else {
        reference.bases(seq_id, alignment_start, want)?
    };

    if want < span {
        diagnostics.warn(format!(
            "record at sequential index {} spans past the end of reference {seq_id}; padding with N",
            records[index].sequential_index
        ));
    }

    let record = &mut records[index];
    let mut bases = vec![b'N'; record.read_length];
    let mut read_pos = 0usize;
    let mut ref_offset = 0usize;

    let fill_from_reference = |bases: &mut [u8], read_pos: usize, ref_offset: usize| {
        bases[read_pos] = reference_bases.get(ref_offset).copied().unwrap_or(b'N');
    };

    for feature in &record.read_features {
        let feature_pos = feature.position().saturating_sub(1);

        while read_pos < feature_pos && read_pos < bases.len() {
            fill_from_reference(&mut bases, read_pos, ref_offset);
            read_pos += 1;
            ref_offset += 1;
        }

        match feature {
            ReadFeature::Substitution { code, .. } => {
                if read_pos < bases.len() {
                    let reference_base = reference_bases.get(ref_offset).copied().unwrap_or(b'N');
                    bases[read_pos] = substitution_matrix.substituted_base(reference_base, *code)?;
                    read_pos += 1;
                }
                ref_offset += 1;
            }
            ReadFeature::ReadBase { base, .. } => {
                if read_pos < bases.len() {
                    bases[read_pos] = *base;
                    read_pos += 1;
                }
                ref_offset += 1;
            }
            ReadFeature::Bases { bases: literal, .. } => {
                for &base in literal {
                    if read_pos < bases.len() {
                        bases[read_pos] = base;
                        read_pos += 1;
                    }
                    ref_offset += 1;
                }
            }
            ReadFeature::Insertion { bases: literal, .. } | ReadFeature::SoftClip { bases: literal, .. } => {
                for &base in literal {
                    if read_pos < bases.len() {
                        bases[read_pos] = base;
                        read_pos += 1;
                    }
                }
            }
            ReadFeature::InsertBase { base, .. } => {
                if read_pos < bases.len() {
                    bases[read_pos] = *base;
                    read_pos += 1;
                }
            }
            ReadFeature::Deletion { len, .. } | ReadFeature::ReferenceSkip { len, .. } => {
                ref_offset += len;
            }
            ReadFeature::QualityScore { .. }
            | ReadFeature::Scores { .. }
            | ReadFeature::Padding { .. }
            | ReadFeature::HardClip { .. } => {}
        }
    }

    while read_pos < bases.len() {
        fill_from_reference(&mut bases, read_pos, ref_offset);
        read_pos += 1;
        ref_offset += 1;
    }

    record.read_bases = bases;
    Ok(())
}

/// Fills in a record's `read_length` quality scores. `CF_FORCE_PRESERVE_QS`
/// records keep their materialized stream, with missing-sentinel positions
/// substituted (or the whole stream dropped if every position is missing);
/// everything else is filled with the default score and then overlaid with
/// whatever `ReadBase`/`QualityScore` features carried.
fn restore_quality_scores(record: &mut CramRecord, options: &NormalizeOptions) {
    if record.cram_flags.are_quality_scores_stored_as_array() {
        if record.quality_scores.iter().all(|&q| q == MISSING_QUALITY_SCORE) {
            record.quality_scores.clear();
            return;
        }

        for score in &mut record.quality_scores {
            if *score == MISSING_QUALITY_SCORE {
                *score = options.default_quality_score;
            }
        }

        return;
    }

    let mut scores = vec![options.default_quality_score; record.read_length];

    for feature in &record.read_features {
        let position = feature.position().saturating_sub(1);

        match feature {
            ReadFeature::ReadBase { quality_score, .. } | ReadFeature::QualityScore { quality_score, .. } => {
                if position < scores.len() {
                    scores[position] = *quality_score;
                }
            }
            ReadFeature::Scores { quality_scores, .. } => {
                for (offset, &score) in quality_scores.iter().enumerate() {
                    if position + offset < scores.len() {
                        scores[position + offset] = score;
                    }
                }
            }
            _ => {}
        }
    }

    record.quality_scores = scores;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::InMemoryReferenceSequences;
    use crate::record::Flags;

    #[cfg(test)]
    fn sample(sequential_index: usize, alignment_start: i32, read_length: usize) -> CramRecord {
        CramRecord {
            bam_flags: Flags::SEGMENTED,
            cram_flags: CramFlags::empty(),
            reference_sequence_id: Some(0),
            alignment_start,
            read_length,
            read_features: Vec::new(),
            mapping_quality: Some(40),
            read_group_id: None,
            read_name: None,
            read_bases: Vec::new(),
            quality_scores: Vec::new(),
            tags: Vec::new(),
            sequential_index,
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
    fn test_compute_insert_size_is_signed_by_order() {
        assert_eq!(compute_insert_size(Some(0), 1, 4, Some(0), 10, 14), 14);
        assert_eq!(compute_insert_size(Some(0), 10, 14, Some(0), 1, 4), -(14));
    }

    #[test]
    fn test_compute_insert_size_different_references_is_zero() {
        assert_eq!(compute_insert_size(Some(0), 1, 4, Some(1), 10, 14), 0);
    }

    #[test]
    fn test_assign_names_propagates_to_mate() {
        let mut records = vec![sample(0, 1, 4), sample(1, 10, 4)];
        records[0].next = Some(1);
        records[1].prev = Some(0);

        assign_names(&mut records);

        assert_eq!(records[0].read_name, records[1].read_name);
    }

    #[test]
    fn test_restore_quality_scores_fills_default_and_overlay() {
        let mut record = sample(0, 1, 4);
        record.read_features = vec![ReadFeature::QualityScore { position: 2, quality_score: 5 }];

        let options = NormalizeOptions::default();
        restore_quality_scores(&mut record, &options);

        assert_eq!(record.quality_scores, vec![30, 5, 30, 30]);
    }

    #[test]
    fn test_restore_quality_scores_collapses_all_missing() {
        let mut record = sample(0, 1, 4);
        record.cram_flags = CramFlags::FORCE_PRESERVE_QUALITY_SCORES;
        record.quality_scores = vec![MISSING_QUALITY_SCORE; 4];

        restore_quality_scores(&mut record, &NormalizeOptions::default());

        assert!(record.quality_scores.is_empty());
    }

    #[test]
    fn test_link_mates_sets_template_size() {
        let mut records = vec![sample(0, 1, 4), sample(1, 10, 4)];
        records[0].cram_flags = CramFlags::HAS_MATE_DOWNSTREAM;
        records[0].records_to_next_fragment = 0;
        records[1].cram_flags = CramFlags::DETACHED;

        link_mates(&mut records, 0);

        assert_eq!(records[0].next, Some(1));
        assert_eq!(records[1].prev, Some(0));
        assert_eq!(records[0].template_size, 13);
        assert_eq!(records[1].template_size, -13);
    }

    #[test]
    fn test_restore_bases_for_unplaced_record_is_a_no_op() {
        let reference = InMemoryReferenceSequences::new(vec![b"ACGTACGT".to_vec()]);
        let mut records = vec![sample(0, 1, 4)];
        records[0].reference_sequence_id = None;
        records[0].alignment_start = 0;
        records[0].read_bases = b"TTTT".to_vec();

        let matrix = SubstitutionMatrix::default_for_ordering();
        let mut diagnostics = Diagnostics::default();
        restore_bases(&mut records, 0, &reference, &matrix, &mut diagnostics).unwrap();

        assert_eq!(records[0].read_bases, b"TTTT");
    }

    #[test]
    fn test_restore_bases_handles_substitution_and_deletion() {
        let reference = InMemoryReferenceSequences::new(vec![b"ACGTACGT".to_vec()]);
        let matrix = SubstitutionMatrix::default_for_ordering();

        let mut records = vec![sample(0, 1, 4)];
        records[0].read_features = vec![
            ReadFeature::Substitution { position: 1, code: 0 },
            ReadFeature::Deletion { position: 3, len: 2 },
        ];

        let mut diagnostics = Diagnostics::default();
        restore_bases(&mut records, 0, &reference, &matrix, &mut diagnostics).unwrap();

        let substituted = matrix.substituted_base(b'A', 0).unwrap();
        assert_eq!(records[0].read_bases[0], substituted);
        assert_eq!(records[0].read_bases.len(), 4);
    }
}
