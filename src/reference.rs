//! The reference-sequence collaborator (spec.md §6): the trait this crate
//! uses to pull reference bases when computing or verifying a slice's
//! reference MD5, and when restoring read bases during normalization.
//!
//! This mirrors the way the teacher crate takes `noodles_fasta`'s indexed
//! reader as an external collaborator rather than owning sequence storage
//! itself: callers adapt their own reference source (an indexed FASTA, an
//! in-memory map, ...) to this trait.

use std::io;

/// A source of reference bases, addressed by the same 0-based sequence id
/// CRAM uses in `ReferenceContext::SingleRef`.
pub trait ReferenceSequence {
    /// Returns `length` bases starting at the 1-based position `start` on
    /// sequence `seq_id`, upper-cased, with no interior newlines.
    fn bases(&self, seq_id: usize, start: usize, length: usize) -> io::Result<Vec<u8>>;

    /// Returns the total length of sequence `seq_id`.
    fn sequence_length(&self, seq_id: usize) -> io::Result<usize>;
}

/// A reference held entirely in memory, keyed by sequence id in insertion
/// order. Useful for tests and for small references; callers working from a
/// large indexed FASTA should implement [`ReferenceSequence`] directly over
/// `noodles_fasta`'s indexed reader instead.
#[derive(Clone, Debug, Default)]
pub struct InMemoryReferenceSequences {
    sequences: Vec<Vec<u8>>,
}

impl InMemoryReferenceSequences {
    pub fn new(sequences: Vec<Vec<u8>>) -> Self {
        Self { sequences }
    }
}

impl ReferenceSequence for InMemoryReferenceSequences {
    fn bases(&self, seq_id: usize, start: usize, length: usize) -> io::Result<Vec<u8>> {
        let sequence = self.sequences.get(seq_id).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no reference sequence with id {seq_id}"),
            )
        })?;

        let start = start
            .checked_sub(1)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "start must be >= 1"))?;

        let end = start.checked_add(length).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "start + length overflowed")
        })?;

        sequence.get(start..end).map(|s| s.to_vec()).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("requested range {start}..{end} is out of bounds for sequence {seq_id}"),
            )
        })
    }

    fn sequence_length(&self, seq_id: usize) -> io::Result<usize> {
        self.sequences
            .get(seq_id)
            .map(|s| s.len())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no reference sequence with id {seq_id}"),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bases_are_one_based_inclusive_start() {
        let reference = InMemoryReferenceSequences::new(vec![b"ACGTACGT".to_vec()]);
        assert_eq!(reference.bases(0, 1, 4).unwrap(), b"ACGT");
        assert_eq!(reference.bases(0, 5, 4).unwrap(), b"ACGT");
    }

    #[test]
    fn test_bases_out_of_bounds() {
        let reference = InMemoryReferenceSequences::new(vec![b"ACGT".to_vec()]);
        assert!(reference.bases(0, 1, 10).is_err());
    }

    #[test]
    fn test_sequence_length() {
        let reference = InMemoryReferenceSequences::new(vec![b"ACGT".to_vec(), b"TT".to_vec()]);
        assert_eq!(reference.sequence_length(1).unwrap(), 2);
    }
}
