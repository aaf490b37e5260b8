mod key;

pub use self::key::Key;

use super::substitution_matrix::SubstitutionMatrix;

/// The `RN`/`AP`/`RR`/`SM`/`TD` preservation map.
///
/// `tag_sets` holds the `TD` dictionary's distinct tag-id lists, each a
/// sequence of `(tag, type)` pairs shared by every record whose `TL`
/// data series value indexes it.
#[derive(Clone, Debug)]
pub struct PreservationMap {
    records_have_names: bool,
    alignment_starts_are_deltas: bool,
    external_reference_sequence_is_required: bool,
    substitution_matrix: SubstitutionMatrix,
    tag_sets: Vec<Vec<(crate::record::tag::Tag, u8)>>,
}

impl PreservationMap {
    pub fn new(
        records_have_names: bool,
        alignment_starts_are_deltas: bool,
        external_reference_sequence_is_required: bool,
        substitution_matrix: SubstitutionMatrix,
        tag_sets: Vec<Vec<(crate::record::tag::Tag, u8)>>,
    ) -> Self {
        Self {
            records_have_names,
            alignment_starts_are_deltas,
            external_reference_sequence_is_required,
            substitution_matrix,
            tag_sets,
        }
    }

    pub fn records_have_names(&self) -> bool {
        self.records_have_names
    }

    pub fn alignment_starts_are_deltas(&self) -> bool {
        self.alignment_starts_are_deltas
    }

    pub fn external_reference_sequence_is_required(&self) -> bool {
        self.external_reference_sequence_is_required
    }

    pub fn substitution_matrix(&self) -> &SubstitutionMatrix {
        &self.substitution_matrix
    }

    pub fn tag_sets(&self) -> &[Vec<(crate::record::tag::Tag, u8)>] {
        &self.tag_sets
    }
}

impl Default for PreservationMap {
    fn default() -> Self {
        Self {
            records_have_names: true,
            alignment_starts_are_deltas: true,
            external_reference_sequence_is_required: true,
            substitution_matrix: SubstitutionMatrix::default(),
            tag_sets: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let map = PreservationMap::default();
        assert!(map.records_have_names());
        assert!(map.alignment_starts_are_deltas());
        assert!(map.external_reference_sequence_is_required());
        assert!(map.tag_sets().is_empty());
    }
}
