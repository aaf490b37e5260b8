//! The in-memory CRAM record.

pub mod feature;
pub mod flags;
pub mod tag;

pub use self::{
    feature::ReadFeature,
    flags::{CramFlags, Flags, MateFlags},
    tag::{ReadTag, Tag},
};

/// An index into the record arena of the slice a record belongs to.
///
/// Mate linkage (`prev`/`next`) is modeled as indices into that arena
/// rather than owning references, since the chain is built and walked
/// entirely within one slice's lifetime.
pub type RecordIndex = usize;

/// The per-read in-memory record.
///
/// Geometry fields (`alignment_start`, `read_length`, `read_features`, ...)
/// are fixed once a record is built or decoded. Mate-linkage fields
/// (`next`, `prev`, mate info) are mutated in place during normalization
/// (see [`crate::normalize`]).
#[derive(Clone, Debug)]
pub struct CramRecord {
    pub bam_flags: Flags,
    pub cram_flags: CramFlags,

    pub reference_sequence_id: Option<usize>,
    pub alignment_start: i32,
    pub read_length: usize,
    pub read_features: Vec<ReadFeature>,

    pub mapping_quality: Option<u8>,
    pub read_group_id: Option<usize>,

    pub read_name: Option<Vec<u8>>,
    pub read_bases: Vec<u8>,
    pub quality_scores: Vec<u8>,

    pub tags: Vec<ReadTag>,

    pub sequential_index: usize,
    pub template_size: i32,

    pub mate_flags: MateFlags,
    pub mate_reference_sequence_id: Option<usize>,
    pub mate_alignment_start: i32,
    pub records_to_next_fragment: i32,

    pub next: Option<RecordIndex>,
    pub prev: Option<RecordIndex>,
}

impl CramRecord {
    /// `alignment_start + alignment_span(read_length, read_features) - 1`,
    /// or `0` for an unplaced record.
    pub fn alignment_end(&self) -> i32 {
        if !self.is_placed() {
            return 0;
        }

        feature::calculate_alignment_end(self.alignment_start, self.read_length, &self.read_features)
    }

    pub fn alignment_span(&self) -> usize {
        feature::calculate_alignment_span(self.read_length, &self.read_features)
    }

    /// A record is placed when it carries a reference index and a
    /// non-zero alignment start, independent of the mapped/unmapped BAM
    /// flag (per the source's unresolved `isPlaced` TODO, this crate
    /// decided to ignore the flag and key placement on position alone,
    /// matching how BAM indexing already treats it).
    pub fn is_placed(&self) -> bool {
        self.reference_sequence_id.is_some() && self.alignment_start != 0
    }

    pub fn is_paired(&self) -> bool {
        self.bam_flags.is_segmented()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_record() -> CramRecord {
        CramRecord {
            bam_flags: Flags::empty(),
            cram_flags: CramFlags::empty(),
            reference_sequence_id: Some(0),
            alignment_start: 2,
            read_length: 4,
            read_features: Vec::new(),
            mapping_quality: Some(60),
            read_group_id: None,
            read_name: None,
            read_bases: b"CGTA".to_vec(),
            quality_scores: vec![30; 4],
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
    fn test_is_placed() {
        let mut record = base_record();
        assert!(record.is_placed());

        record.alignment_start = 0;
        assert!(!record.is_placed());

        record.alignment_start = 2;
        record.reference_sequence_id = None;
        assert!(!record.is_placed());
    }

    #[test]
    fn test_alignment_end() {
        let record = base_record();
        assert_eq!(record.alignment_end(), 5);
    }

    #[test]
    fn test_alignment_end_unplaced() {
        let mut record = base_record();
        record.reference_sequence_id = None;
        assert_eq!(record.alignment_end(), 0);
    }
}
