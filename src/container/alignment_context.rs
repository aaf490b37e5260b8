use crate::error::{Error, Kind};

use super::ReferenceContext;

/// The alignment start at which the EOF container's sentinel slice sits.
pub const EOF_ALIGNMENT_START: i32 = 4_542_278;

/// A reference context paired with its 1-based alignment start and span.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AlignmentContext {
    reference_context: ReferenceContext,
    alignment_start: i32,
    alignment_span: i32,
}

impl AlignmentContext {
    /// Builds a context, validating start/span against the rules for its
    /// reference context.
    pub fn new(
        reference_context: ReferenceContext,
        alignment_start: i32,
        alignment_span: i32,
    ) -> Result<Self, Error> {
        let is_valid = match reference_context {
            ReferenceContext::SingleRef(_) => alignment_start >= 1 && alignment_span >= 0,
            ReferenceContext::UnmappedUnplaced => {
                (alignment_start == 0 && alignment_span == 0)
                    || (alignment_start == EOF_ALIGNMENT_START && alignment_span == 0)
            }
            ReferenceContext::MultiRef => alignment_start == 0 && alignment_span == 0,
        };

        if is_valid {
            Ok(Self {
                reference_context,
                alignment_start,
                alignment_span,
            })
        } else {
            Err(Error::new(
                Kind::InvalidAlignmentContext,
                format!(
                    "invalid (start, span) = ({alignment_start}, {alignment_span}) for {reference_context:?}"
                ),
            ))
        }
    }

    /// Builds a context without validation, for decoding legacy streams
    /// that may carry values the current constructor would reject.
    pub fn from_legacy_unchecked(
        reference_context: ReferenceContext,
        alignment_start: i32,
        alignment_span: i32,
    ) -> Self {
        Self {
            reference_context,
            alignment_start,
            alignment_span,
        }
    }

    /// The sentinel context of the EOF container/slice.
    pub fn eof() -> Self {
        Self {
            reference_context: ReferenceContext::UnmappedUnplaced,
            alignment_start: EOF_ALIGNMENT_START,
            alignment_span: 0,
        }
    }

    pub fn reference_context(&self) -> ReferenceContext {
        self.reference_context
    }

    pub fn alignment_start(&self) -> i32 {
        self.alignment_start
    }

    pub fn alignment_span(&self) -> i32 {
        self.alignment_span
    }

    pub fn alignment_end(&self) -> i32 {
        if self.alignment_span == 0 {
            self.alignment_start - 1
        } else {
            self.alignment_start + self.alignment_span - 1
        }
    }

    pub fn is_eof(&self) -> bool {
        *self == Self::eof()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_single_ref() {
        assert!(AlignmentContext::new(ReferenceContext::SingleRef(0), 1, 4).is_ok());
        assert!(AlignmentContext::new(ReferenceContext::SingleRef(0), 0, 4).is_err());
        assert!(AlignmentContext::new(ReferenceContext::SingleRef(0), 1, -1).is_err());
    }

    #[test]
    fn test_new_unmapped_unplaced() {
        assert!(AlignmentContext::new(ReferenceContext::UnmappedUnplaced, 0, 0).is_ok());
        assert!(
            AlignmentContext::new(ReferenceContext::UnmappedUnplaced, EOF_ALIGNMENT_START, 0)
                .is_ok()
        );
        assert!(AlignmentContext::new(ReferenceContext::UnmappedUnplaced, 1, 0).is_err());
    }

    #[test]
    fn test_new_multi_ref() {
        assert!(AlignmentContext::new(ReferenceContext::MultiRef, 0, 0).is_ok());
        assert!(AlignmentContext::new(ReferenceContext::MultiRef, 1, 0).is_err());
    }

    #[test]
    fn test_eof() {
        let ctx = AlignmentContext::eof();
        assert!(ctx.is_eof());
        assert_eq!(ctx.reference_context(), ReferenceContext::UnmappedUnplaced);
    }

    #[test]
    fn test_alignment_end() {
        let ctx = AlignmentContext::new(ReferenceContext::SingleRef(0), 2, 4).unwrap();
        assert_eq!(ctx.alignment_end(), 5);

        let ctx = AlignmentContext::new(ReferenceContext::SingleRef(0), 2, 0).unwrap();
        assert_eq!(ctx.alignment_end(), 1);
    }
}
