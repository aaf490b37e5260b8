use std::io::Write;

use crate::container::compression_header::CompressionHeader;
use crate::diagnostics::{Diagnostics, Strictness};
use crate::file_definition::{Version, FILE_ID_LEN};
use crate::reference::ReferenceSequence;

use super::Writer;

/// A CRAM writer builder.
///
/// # Examples
///
/// ```
/// use cram::io::writer::Builder;
///
/// let writer = Builder::default().build(Vec::new());
/// ```
pub struct Builder {
    version: Version,
    file_id: [u8; FILE_ID_LEN],
    compression_header: CompressionHeader,
    records_per_slice: usize,
    strictness: Strictness,
}

impl Builder {
    /// Sets the CRAM version for the output file.
    ///
    /// The default is 3.0.
    pub fn set_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Sets the 20-byte file id stored in the file definition.
    pub fn set_file_id(mut self, file_id: [u8; FILE_ID_LEN]) -> Self {
        self.file_id = file_id;
        self
    }

    /// Sets the compression header every container shares.
    ///
    /// The default compression header preserves read names, deltas
    /// alignment starts, and requires an external reference sequence.
    pub fn set_compression_header(mut self, compression_header: CompressionHeader) -> Self {
        self.compression_header = compression_header;
        self
    }

    /// Sets the number of records per slice.
    ///
    /// The default is 10,000. Each container written by
    /// [`Writer::write_records`] holds exactly one slice.
    ///
    /// # Panics
    ///
    /// Panics if `records_per_slice` is 0.
    pub fn set_records_per_slice(mut self, records_per_slice: usize) -> Self {
        assert!(records_per_slice > 0, "records_per_slice must be > 0");
        self.records_per_slice = records_per_slice;
        self
    }

    /// Sets the strictness diagnostics are recorded under.
    ///
    /// The default is [`Strictness::Lenient`].
    pub fn set_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    /// Builds a writer around `inner`, without a reference sequence
    /// collaborator. A compression header with `RR=true` will still write
    /// the all-zero reference MD5 sentinel for `SingleRef` slices, matching
    /// [`crate::container::slice::build_slice`]'s behavior with
    /// `reference: None`.
    pub fn build<W>(self, inner: W) -> Writer<W>
    where
        W: Write,
    {
        self.build_with_reference(inner, None)
    }

    /// Builds a writer around `inner`, computing each `SingleRef` slice's
    /// reference MD5 against `reference` (spec.md §4.8).
    pub fn build_with_reference<W>(
        self,
        inner: W,
        reference: Option<Box<dyn ReferenceSequence>>,
    ) -> Writer<W>
    where
        W: Write,
    {
        Writer {
            inner,
            version: self.version,
            file_id: self.file_id,
            compression_header: self.compression_header,
            records_per_slice: self.records_per_slice,
            reference,
            diagnostics: Diagnostics::new(self.strictness),
            global_record_counter: 0,
            wrote_file_definition: false,
        }
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            version: Version::default(),
            file_id: [0; FILE_ID_LEN],
            compression_header: CompressionHeader::default(),
            records_per_slice: 10_000,
            strictness: Strictness::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "records_per_slice must be > 0")]
    fn test_set_records_per_slice_zero_panics() {
        Builder::default().set_records_per_slice(0);
    }

    #[test]
    fn test_build_defaults_to_version_3_0() {
        let writer = Builder::default().build(Vec::new());
        assert_eq!(writer.version(), Version::V3_0);
    }
}
