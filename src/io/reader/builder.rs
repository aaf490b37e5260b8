use std::io::Read;

use crate::diagnostics::{Diagnostics, Strictness};
use crate::reference::ReferenceSequence;

use super::Reader;

/// A CRAM reader builder.
///
/// # Examples
///
/// ```
/// use cram::io::reader::Builder;
///
/// let reader = Builder::default().build(std::io::empty());
/// ```
#[derive(Default)]
pub struct Builder {
    strictness: Strictness,
}

impl Builder {
    /// Sets the strictness diagnostics (and MD5 verification failures) are
    /// recorded under.
    ///
    /// The default is [`Strictness::Lenient`].
    pub fn set_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    /// Builds a reader around `inner`, without a reference sequence
    /// collaborator. [`Reader::verify_container_reference_md5`] is then
    /// always a no-op.
    pub fn build<R>(self, inner: R) -> Reader<R>
    where
        R: Read,
    {
        self.build_with_reference(inner, None)
    }

    /// Builds a reader around `inner`, verifying each `SingleRef` slice's
    /// reference MD5 against `reference` (spec.md §4.8) when
    /// [`Reader::verify_container_reference_md5`] is called.
    pub fn build_with_reference<R>(
        self,
        inner: R,
        reference: Option<Box<dyn ReferenceSequence>>,
    ) -> Reader<R>
    where
        R: Read,
    {
        Reader {
            inner,
            file_definition: None,
            reference,
            diagnostics: Diagnostics::new(self.strictness),
        }
    }
}
