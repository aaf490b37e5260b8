//! Per-data-series codec assignment.

use std::collections::HashSet;

use super::data_series::DataSeries;
use super::encoding::{ByteArray, Encoding, Integer};

macro_rules! data_series_encodings {
    ($($field:ident: $ty:ty),+ $(,)?) => {
        /// One codec per data series, as assigned by the compression
        /// header's encoding map. A `None` field means that series is
        /// never written for this compression header (e.g. `RN` is
        /// absent when the preservation map's `RN` flag is `false`).
        #[derive(Clone, Debug, Default)]
        pub struct DataSeriesEncodings {
            $(pub(crate) $field: Option<$ty>),+
        }

        impl DataSeriesEncodings {
            $(
                pub fn $field(&self) -> Option<&$ty> {
                    self.$field.as_ref()
                }
            )+
        }
    };
}

data_series_encodings! {
    bam_flags: Integer,
    cram_flags: Integer,
    reference_ids: Integer,
    read_lengths: Integer,
    alignment_starts: Integer,
    read_groups: Integer,
    names: ByteArray,
    mate_flags: Integer,
    mate_reference_ids: Integer,
    mate_alignment_starts: Integer,
    template_sizes: Integer,
    mate_distances: Integer,
    tag_set_ids: Integer,
    feature_counts: Integer,
    feature_codes: Integer,
    feature_position_deltas: Integer,
    deletion_lengths: Integer,
    stretches_of_bases: ByteArray,
    stretches_of_quality_scores: ByteArray,
    base_substitution_codes: Integer,
    insertion_bases: ByteArray,
    reference_skip_lengths: Integer,
    padding_lengths: Integer,
    hard_clip_lengths: Integer,
    soft_clip_bases: ByteArray,
    mapping_qualities: Integer,
    bases: Integer,
    quality_scores: Integer,
}

/// Content ids assigned to each byte-oriented data series under the
/// legacy (CRAM 2.1/3.0) encoding scheme: every series lives in its own
/// external block, addressed by a stable small integer.
mod content_id {
    pub const NAMES: i32 = 11;
    pub const STRETCHES_OF_BASES: i32 = 12;
    pub const STRETCHES_OF_QUALITY_SCORES: i32 = 13;
    pub const INSERTION_BASES: i32 = 14;
    pub const SOFT_CLIP_BASES: i32 = 15;
}

impl DataSeriesEncodings {
    /// The conventional assignment used when building a fresh compression
    /// header: every series gets an `EXTERNAL` encoding, one content id
    /// per series.
    pub fn init_legacy() -> Self {
        Self {
            bam_flags: Some(Integer::External { block_content_id: 0 }),
            cram_flags: Some(Integer::External { block_content_id: 1 }),
            reference_ids: Some(Integer::External { block_content_id: 2 }),
            read_lengths: Some(Integer::External { block_content_id: 3 }),
            alignment_starts: Some(Integer::External { block_content_id: 4 }),
            read_groups: Some(Integer::External { block_content_id: 5 }),
            names: Some(ByteArray::ByteArrayStop {
                stop_byte: 0x00,
                block_content_id: content_id::NAMES,
            }),
            mate_flags: Some(Integer::External { block_content_id: 6 }),
            mate_reference_ids: Some(Integer::External { block_content_id: 7 }),
            mate_alignment_starts: Some(Integer::External { block_content_id: 8 }),
            template_sizes: Some(Integer::External { block_content_id: 9 }),
            mate_distances: Some(Integer::External { block_content_id: 10 }),
            tag_set_ids: Some(Integer::External { block_content_id: 16 }),
            feature_counts: Some(Integer::External { block_content_id: 17 }),
            feature_codes: Some(Integer::External { block_content_id: 18 }),
            feature_position_deltas: Some(Integer::External { block_content_id: 19 }),
            deletion_lengths: Some(Integer::External { block_content_id: 20 }),
            stretches_of_bases: Some(ByteArray::ByteArrayLength {
                len_encoding: Box::new(Integer::External {
                    block_content_id: content_id::STRETCHES_OF_BASES,
                }),
                value_block_content_id: content_id::STRETCHES_OF_BASES,
            }),
            stretches_of_quality_scores: Some(ByteArray::ByteArrayLength {
                len_encoding: Box::new(Integer::External {
                    block_content_id: content_id::STRETCHES_OF_QUALITY_SCORES,
                }),
                value_block_content_id: content_id::STRETCHES_OF_QUALITY_SCORES,
            }),
            base_substitution_codes: Some(Integer::External { block_content_id: 21 }),
            insertion_bases: Some(ByteArray::ByteArrayStop {
                stop_byte: 0x00,
                block_content_id: content_id::INSERTION_BASES,
            }),
            reference_skip_lengths: Some(Integer::External { block_content_id: 22 }),
            padding_lengths: Some(Integer::External { block_content_id: 23 }),
            hard_clip_lengths: Some(Integer::External { block_content_id: 24 }),
            soft_clip_bases: Some(ByteArray::ByteArrayStop {
                stop_byte: 0x00,
                block_content_id: content_id::SOFT_CLIP_BASES,
            }),
            mapping_qualities: Some(Integer::External { block_content_id: 25 }),
            bases: Some(Integer::External { block_content_id: 26 }),
            quality_scores: Some(Integer::External { block_content_id: 27 }),
        }
    }

    /// Drops encodings whose external content id is not present in
    /// `used`, e.g. after filtering empty external blocks out of a built
    /// slice.
    pub fn retain_used_content_ids(&mut self, used: &HashSet<i32>) {
        macro_rules! clear_if_unused {
            ($field:ident, $content_id:expr) => {
                if let Some(encoding) = &self.$field {
                    if let Some(id) = $content_id(encoding) {
                        if !used.contains(&id) {
                            self.$field = None;
                        }
                    }
                }
            };
        }

        clear_if_unused!(bam_flags, integer_content_id);
        clear_if_unused!(cram_flags, integer_content_id);
        clear_if_unused!(reference_ids, integer_content_id);
        clear_if_unused!(read_lengths, integer_content_id);
        clear_if_unused!(alignment_starts, integer_content_id);
        clear_if_unused!(read_groups, integer_content_id);
        clear_if_unused!(names, byte_array_content_id);
        clear_if_unused!(mate_flags, integer_content_id);
        clear_if_unused!(mate_reference_ids, integer_content_id);
        clear_if_unused!(mate_alignment_starts, integer_content_id);
        clear_if_unused!(template_sizes, integer_content_id);
        clear_if_unused!(mate_distances, integer_content_id);
        clear_if_unused!(tag_set_ids, integer_content_id);
        clear_if_unused!(feature_counts, integer_content_id);
        clear_if_unused!(feature_codes, integer_content_id);
        clear_if_unused!(feature_position_deltas, integer_content_id);
        clear_if_unused!(deletion_lengths, integer_content_id);
        clear_if_unused!(stretches_of_bases, byte_array_content_id);
        clear_if_unused!(stretches_of_quality_scores, byte_array_content_id);
        clear_if_unused!(base_substitution_codes, integer_content_id);
        clear_if_unused!(insertion_bases, byte_array_content_id);
        clear_if_unused!(reference_skip_lengths, integer_content_id);
        clear_if_unused!(padding_lengths, integer_content_id);
        clear_if_unused!(hard_clip_lengths, integer_content_id);
        clear_if_unused!(soft_clip_bases, byte_array_content_id);
        clear_if_unused!(mapping_qualities, integer_content_id);
        clear_if_unused!(bases, integer_content_id);
        clear_if_unused!(quality_scores, integer_content_id);
    }
}

impl DataSeriesEncodings {
    /// Looks up the encoding assigned to `series`, tagged by value family,
    /// for serialization in the encoding map.
    pub fn get(&self, series: DataSeries) -> Option<Encoding> {
        macro_rules! e {
            ($field:ident) => {
                self.$field.clone().map(Encoding::from)
            };
        }

        match series {
            DataSeries::BamFlags => e!(bam_flags),
            DataSeries::CramFlags => e!(cram_flags),
            DataSeries::ReferenceId => e!(reference_ids),
            DataSeries::ReadLengths => e!(read_lengths),
            DataSeries::AlignmentStarts => e!(alignment_starts),
            DataSeries::ReadGroups => e!(read_groups),
            DataSeries::Names => e!(names),
            DataSeries::MateFlags => e!(mate_flags),
            DataSeries::MateReferenceId => e!(mate_reference_ids),
            DataSeries::MateAlignmentStart => e!(mate_alignment_starts),
            DataSeries::TemplateSize => e!(template_sizes),
            DataSeries::MateDistance => e!(mate_distances),
            DataSeries::TagSetIds => e!(tag_set_ids),
            DataSeries::FeatureCounts => e!(feature_counts),
            DataSeries::FeatureCodes => e!(feature_codes),
            DataSeries::FeaturePositionDeltas => e!(feature_position_deltas),
            DataSeries::DeletionLengths => e!(deletion_lengths),
            DataSeries::StretchesOfBases => e!(stretches_of_bases),
            DataSeries::StretchesOfQualityScores => e!(stretches_of_quality_scores),
            DataSeries::BaseSubstitutionCodes => e!(base_substitution_codes),
            DataSeries::InsertionBases => e!(insertion_bases),
            DataSeries::ReferenceSkipLengths => e!(reference_skip_lengths),
            DataSeries::PaddingLengths => e!(padding_lengths),
            DataSeries::HardClipLengths => e!(hard_clip_lengths),
            DataSeries::SoftClipBases => e!(soft_clip_bases),
            DataSeries::MappingQualities => e!(mapping_qualities),
            DataSeries::Bases => e!(bases),
            DataSeries::QualityScores => e!(quality_scores),
        }
    }

    /// Assigns `encoding` to `series`. Panics if `encoding`'s value family
    /// (integer vs. byte array) does not match the series.
    pub fn set(&mut self, series: DataSeries, encoding: Option<Encoding>) {
        macro_rules! set_integer {
            ($field:ident) => {
                self.$field = encoding.map(|e| {
                    e.as_integer()
                        .cloned()
                        .expect("series expects an integer encoding")
                })
            };
        }

        macro_rules! set_byte_array {
            ($field:ident) => {
                self.$field = encoding.map(|e| {
                    e.as_byte_array()
                        .cloned()
                        .expect("series expects a byte array encoding")
                })
            };
        }

        match series {
            DataSeries::BamFlags => set_integer!(bam_flags),
            DataSeries::CramFlags => set_integer!(cram_flags),
            DataSeries::ReferenceId => set_integer!(reference_ids),
            DataSeries::ReadLengths => set_integer!(read_lengths),
            DataSeries::AlignmentStarts => set_integer!(alignment_starts),
            DataSeries::ReadGroups => set_integer!(read_groups),
            DataSeries::Names => set_byte_array!(names),
            DataSeries::MateFlags => set_integer!(mate_flags),
            DataSeries::MateReferenceId => set_integer!(mate_reference_ids),
            DataSeries::MateAlignmentStart => set_integer!(mate_alignment_starts),
            DataSeries::TemplateSize => set_integer!(template_sizes),
            DataSeries::MateDistance => set_integer!(mate_distances),
            DataSeries::TagSetIds => set_integer!(tag_set_ids),
            DataSeries::FeatureCounts => set_integer!(feature_counts),
            DataSeries::FeatureCodes => set_integer!(feature_codes),
            DataSeries::FeaturePositionDeltas => set_integer!(feature_position_deltas),
            DataSeries::DeletionLengths => set_integer!(deletion_lengths),
            DataSeries::StretchesOfBases => set_byte_array!(stretches_of_bases),
            DataSeries::StretchesOfQualityScores => set_byte_array!(stretches_of_quality_scores),
            DataSeries::BaseSubstitutionCodes => set_integer!(base_substitution_codes),
            DataSeries::InsertionBases => set_byte_array!(insertion_bases),
            DataSeries::ReferenceSkipLengths => set_integer!(reference_skip_lengths),
            DataSeries::PaddingLengths => set_integer!(padding_lengths),
            DataSeries::HardClipLengths => set_integer!(hard_clip_lengths),
            DataSeries::SoftClipBases => set_byte_array!(soft_clip_bases),
            DataSeries::MappingQualities => set_integer!(mapping_qualities),
            DataSeries::Bases => set_integer!(bases),
            DataSeries::QualityScores => set_integer!(quality_scores),
        }
    }
}

fn integer_content_id(encoding: &Integer) -> Option<i32> {
    match encoding {
        Integer::External { block_content_id } => Some(*block_content_id),
        _ => None,
    }
}

fn byte_array_content_id(encoding: &ByteArray) -> Option<i32> {
    Some(encoding.block_content_id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_legacy_populates_all_fields() {
        let encodings = DataSeriesEncodings::init_legacy();

        assert!(encodings.bam_flags().is_some());
        assert!(encodings.names().is_some());
        assert!(encodings.quality_scores().is_some());
    }

    #[test]
    fn test_retain_used_content_ids() {
        let mut encodings = DataSeriesEncodings::init_legacy();
        let mut used = HashSet::new();
        used.insert(0); // bam_flags

        encodings.retain_used_content_ids(&used);

        assert!(encodings.bam_flags().is_some());
        assert!(encodings.cram_flags().is_none());
    }
}
