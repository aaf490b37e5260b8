//! A slice: a set of records sharing a reference context within a
//! container, plus the pipeline that builds one from records and the one
//! that decodes one back into raw records.

pub mod blocks;
pub mod build;
pub mod decode;
pub mod header;

pub use self::{
    blocks::SliceBlocks, build::build_slice, decode::decode_slice, header::SliceHeader,
};

use std::io;

use md5::{Digest, Md5};

use crate::diagnostics::{Diagnostics, Strictness};
use crate::error::{Error, Kind};
use crate::reference::ReferenceSequence;

use super::ReferenceContext;

/// A slice: its header plus the (core + external) blocks built from or
/// decoded into records.
#[derive(Clone, Debug)]
pub struct Slice {
    header: SliceHeader,
    blocks: SliceBlocks,
}

impl Slice {
    pub fn new(header: SliceHeader, blocks: SliceBlocks) -> Self {
        Self { header, blocks }
    }

    pub fn header(&self) -> &SliceHeader {
        &self.header
    }

    pub fn blocks(&self) -> &SliceBlocks {
        &self.blocks
    }

    /// Verifies this slice's stored reference MD5 against `reference`
    /// (spec.md §4.8). A no-op for multi-reference or unmapped/unplaced
    /// slices, whose stored digest is the all-zero sentinel by construction.
    pub fn verify_reference_md5(
        &self,
        reference: &dyn ReferenceSequence,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), Error> {
        let ReferenceContext::SingleRef(seq_id) = self.header.reference_context() else {
            return Ok(());
        };

        verify_reference_md5(
            reference,
            seq_id,
            self.header.alignment_context().alignment_start(),
            self.header.alignment_context().alignment_span(),
            self.header.reference_md5(),
            diagnostics,
        )
    }
}

/// Computes the reference MD5 for a SingleRef, `RR=true` slice (spec.md
/// §4.8): the digest of `ref[start-1 .. start-1+min(span, len-start+1)]`.
///
/// Returns `[0; 16]` unchanged for non-SingleRef contexts, matching the
/// "multi-ref or unmapped slices store 16 zero bytes" rule.
pub fn compute_reference_md5(
    reference: &dyn ReferenceSequence,
    seq_id: usize,
    alignment_start: i32,
    alignment_span: i32,
    diagnostics: &mut Diagnostics,
) -> io::Result<[u8; 16]> {
    if alignment_span <= 0 {
        return Ok([0u8; 16]);
    }

    let ref_len = reference.sequence_length(seq_id)?;
    let start = (alignment_start - 1).max(0) as usize;

    if start >= ref_len {
        diagnostics.warn(format!(
            "alignment start {alignment_start} is beyond reference length {ref_len}"
        ));
        return Ok([0u8; 16]);
    }

    let available = ref_len - start;
    let want = alignment_span as usize;

    if want > available {
        diagnostics.warn(format!(
            "alignment span {alignment_span} extends {} bases past reference length {ref_len}; hashing only the available suffix",
            want - available
        ));
    }

    let len = want.min(available);
    let bases = reference.bases(seq_id, alignment_start as usize, len)?;

    let mut hasher = Md5::new();
    hasher.update(&bases);
    let digest = hasher.finalize();

    let mut out = [0u8; 16];
    out.copy_from_slice(&digest);
    Ok(out)
}

/// Verifies a slice's stored reference MD5 against a freshly computed one.
/// Partial matches (where the stored digest was computed over a shorter
/// reference) are never treated as a pass (spec.md §9): any mismatch is
/// reported, and under [`Strictness::Strict`] that is a hard error.
pub fn verify_reference_md5(
    reference: &dyn ReferenceSequence,
    seq_id: usize,
    alignment_start: i32,
    alignment_span: i32,
    stored: &[u8; 16],
    diagnostics: &mut Diagnostics,
) -> Result<(), Error> {
    let computed = compute_reference_md5(
        reference,
        seq_id,
        alignment_start,
        alignment_span,
        diagnostics,
    )
    .map_err(|e| Error::new(Kind::ReferenceMissing, e.to_string()))?;

    if &computed == stored {
        return Ok(());
    }

    let message = "reference md5 mismatch".to_string();

    if diagnostics.strictness() == Strictness::Strict {
        return Err(Error::new(Kind::ReferenceMd5Mismatch, message));
    }

    diagnostics.warn(message);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::AlignmentContext;
    use crate::reference::InMemoryReferenceSequences;

    #[test]
    fn test_compute_reference_md5_matches_known_digest() {
        let reference = InMemoryReferenceSequences::new(vec![b"ACGTACGT".to_vec()]);
        let mut diagnostics = Diagnostics::default();

        let digest = compute_reference_md5(&reference, 0, 1, 4, &mut diagnostics).unwrap();
        let expected = Md5::digest(b"ACGT");
        assert_eq!(&digest[..], &expected[..]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_verify_reference_md5_warns_on_mismatch_when_lenient() {
        let reference = InMemoryReferenceSequences::new(vec![b"ACGTACGT".to_vec()]);
        let mut diagnostics = Diagnostics::default();

        verify_reference_md5(&reference, 0, 1, 4, &[0u8; 16], &mut diagnostics).unwrap();
        assert!(!diagnostics.is_empty());
    }

    #[test]
    fn test_verify_reference_md5_fails_on_mismatch_when_strict() {
        let reference = InMemoryReferenceSequences::new(vec![b"ACGTACGT".to_vec()]);
        let mut diagnostics = Diagnostics::new(Strictness::Strict);

        let result = verify_reference_md5(&reference, 0, 1, 4, &[0u8; 16], &mut diagnostics);
        assert!(result.is_err());
    }

    #[test]
    fn test_slice_verify_reference_md5_is_a_no_op_for_multi_ref() {
        let alignment_context = AlignmentContext::new(ReferenceContext::MultiRef, 0, 0).unwrap();
        let header = SliceHeader::new(
            alignment_context,
            0,
            0,
            1,
            vec![],
            None,
            [0xffu8; 16],
        );
        let core = crate::container::block::Block::create_raw_core_data_block(Vec::new());
        let blocks = SliceBlocks::new(core, indexmap::IndexMap::new(), None).unwrap();
        let slice = Slice::new(header, blocks);

        let reference = InMemoryReferenceSequences::new(vec![b"ACGT".to_vec()]);
        let mut diagnostics = Diagnostics::default();
        assert!(slice.verify_reference_md5(&reference, &mut diagnostics).is_ok());
    }
}
