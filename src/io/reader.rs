//! The file-level CRAM reader: file definition, file-header container,
//! then a run of data containers terminated by the EOF sentinel.

mod builder;

pub use self::builder::Builder;

use std::io::{self, Read};

use crate::container::{decode_container, read_file_header_container, Container};
use crate::diagnostics::Diagnostics;
use crate::error::Error;
use crate::file_definition::FileDefinition;
use crate::reference::ReferenceSequence;

/// A file-level CRAM reader, built with [`Builder`].
pub struct Reader<R> {
    inner: R,
    file_definition: Option<FileDefinition>,
    reference: Option<Box<dyn ReferenceSequence>>,
    diagnostics: Diagnostics,
}

impl<R> Reader<R>
where
    R: Read,
{
    /// Diagnostics recorded so far (spec.md §9): non-fatal observations
    /// raised while decoding headers or verifying a reference MD5.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    /// Reads the 26-byte file definition preamble, if it hasn't been read
    /// yet, and returns it.
    pub fn read_file_definition(&mut self) -> io::Result<FileDefinition> {
        if let Some(file_definition) = &self.file_definition {
            return Ok(file_definition.clone());
        }

        let file_definition = FileDefinition::decode(&mut self.inner)?;
        self.file_definition = Some(file_definition.clone());
        Ok(file_definition)
    }

    /// Reads the file-header container, returning its raw (length-prefixed)
    /// SAM header bytes. Reads the file definition first if it hasn't been
    /// read yet.
    pub fn read_file_header(&mut self) -> io::Result<Vec<u8>> {
        let version = self.read_file_definition()?.version();
        read_file_header_container(&mut self.inner, version)
    }

    /// Reads the next data container. Returns `Ok(None)` at the EOF
    /// sentinel or a clean end of stream. Reads the file definition first
    /// if it hasn't been read yet, so this may be called directly after
    /// construction to skip a stream with no file-header container.
    pub fn read_container(&mut self) -> io::Result<Option<Container>> {
        let version = self.read_file_definition()?.version();
        decode_container(&mut self.inner, version)
    }

    /// Verifies `container`'s slices' reference MD5s against this reader's
    /// reference sequence collaborator (spec.md §4.8). A no-op when no
    /// reference was configured on [`Builder`].
    pub fn verify_container_reference_md5(&mut self, container: &Container) -> Result<(), Error> {
        let Some(reference) = &self.reference else {
            return Ok(());
        };

        container.verify_reference_md5(reference.as_ref(), &mut self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{build_container, encode_container, write_eof_container, write_file_header_container};
    use crate::container::compression_header::CompressionHeader;
    use crate::file_definition::Version;
    use crate::record::{CramFlags, CramRecord, Flags, MateFlags};

    fn sample_record(alignment_start: i32) -> CramRecord {
        CramRecord {
            bam_flags: Flags::empty(),
            cram_flags: CramFlags::empty(),
            reference_sequence_id: Some(0),
            alignment_start,
            read_length: 4,
            read_features: Vec::new(),
            mapping_quality: Some(40),
            read_group_id: None,
            read_name: Some(b"r1".to_vec()),
            read_bases: vec![b'A'; 4],
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

    fn sample_stream() -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        FileDefinition::default().encode(&mut buf)?;
        write_file_header_container(&mut buf, b"@HD\tVN:1.6\n", Version::V3_0)?;

        let mut diagnostics = Diagnostics::default();
        let container = build_container(
            CompressionHeader::default(),
            &[sample_record(1), sample_record(5)],
            10_000,
            0,
            None,
            &mut diagnostics,
        )?;
        encode_container(&mut buf, &container, Version::V3_0)?;
        write_eof_container(&mut buf, Version::V3_0)?;

        Ok(buf)
    }

    #[test]
    fn test_read_file_header_then_container_then_eof() -> io::Result<()> {
        let buf = sample_stream()?;
        let mut reader = Builder::default().build(&buf[..]);

        let header_bytes = reader.read_file_header()?;
        assert_eq!(header_bytes, b"@HD\tVN:1.6\n");

        let container = reader.read_container()?.unwrap();
        assert_eq!(container.records()?.len(), 2);

        assert!(reader.read_container()?.is_none());

        Ok(())
    }

    #[test]
    fn test_read_file_definition_is_idempotent() -> io::Result<()> {
        let buf = sample_stream()?;
        let mut reader = Builder::default().build(&buf[..]);

        let first = reader.read_file_definition()?;
        let second = reader.read_file_definition()?;
        assert_eq!(first, second);

        Ok(())
    }
}
