//! The file-level CRAM writer: file definition, file-header container,
//! then a run of data containers terminated by the EOF sentinel.

mod builder;

pub use self::builder::Builder;

use std::io::{self, Write};

use crate::container::compression_header::CompressionHeader;
use crate::container::{build_container, encode_container, write_eof_container, write_file_header_container};
use crate::diagnostics::Diagnostics;
use crate::file_definition::{FileDefinition, Version, FILE_ID_LEN};
use crate::reference::ReferenceSequence;
use crate::record::CramRecord;

/// A file-level CRAM writer, built with [`Builder`].
pub struct Writer<W> {
    inner: W,
    version: Version,
    file_id: [u8; FILE_ID_LEN],
    compression_header: CompressionHeader,
    records_per_slice: usize,
    reference: Option<Box<dyn ReferenceSequence>>,
    diagnostics: Diagnostics,
    global_record_counter: u64,
    wrote_file_definition: bool,
}

impl<W> Writer<W>
where
    W: Write,
{
    pub fn version(&self) -> Version {
        self.version
    }

    /// Diagnostics recorded so far (spec.md §9): non-fatal observations
    /// raised while computing a slice's reference MD5.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Writes the 26-byte file definition preamble, if it hasn't been
    /// written yet. [`Self::write_file_header`] and [`Self::write_records`]
    /// both call this on first use, matching the teacher's `write_header`
    /// (file definition, then file-header container, in that order).
    pub fn write_file_definition(&mut self) -> io::Result<()> {
        if self.wrote_file_definition {
            return Ok(());
        }

        let file_definition = FileDefinition::new(self.version, self.file_id);
        file_definition.encode(&mut self.inner)?;
        self.wrote_file_definition = true;
        Ok(())
    }

    /// Writes the file-header container carrying `raw_header_bytes` (the
    /// length-prefixed SAM header text; see
    /// [`crate::container::write_file_header_container`]).
    pub fn write_file_header(&mut self, raw_header_bytes: &[u8]) -> io::Result<()> {
        self.write_file_definition()?;
        write_file_header_container(&mut self.inner, raw_header_bytes, self.version)
    }

    /// Builds one container from `records` (one slice, per
    /// [`build_container`]'s `records_per_slice` chunking) and writes it.
    /// Call this as many times as needed to write the whole record stream,
    /// then [`Self::finish`].
    pub fn write_records(&mut self, records: &[CramRecord]) -> io::Result<()> {
        self.write_file_definition()?;

        let container = build_container(
            self.compression_header.clone(),
            records,
            self.records_per_slice,
            self.global_record_counter,
            self.reference.as_deref(),
            &mut self.diagnostics,
        )?;

        encode_container(&mut self.inner, &container, self.version)?;
        self.global_record_counter += records.len() as u64;

        Ok(())
    }

    /// Writes the EOF sentinel container and returns the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        write_eof_container(&mut self.inner, self.version)?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::decode_container;
    use crate::record::{CramFlags, Flags, MateFlags};

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

    #[test]
    fn test_write_file_header_then_records_then_finish() -> io::Result<()> {
        let mut writer = Builder::default().build(Vec::new());

        writer.write_file_header(b"@HD\tVN:1.6\n")?;
        writer.write_records(&[sample_record(1), sample_record(5)])?;
        let buf = writer.finish()?;

        let mut reader = &buf[..];
        FileDefinition::decode(&mut reader)?;
        let header_bytes = crate::container::read_file_header_container(&mut reader, Version::V3_0)?;
        assert_eq!(header_bytes, b"@HD\tVN:1.6\n");

        let container = decode_container(&mut reader, Version::V3_0)?.unwrap();
        assert_eq!(container.records()?.len(), 2);

        assert!(decode_container(&mut reader, Version::V3_0)?.is_none());

        Ok(())
    }

    #[test]
    fn test_write_records_calls_write_file_definition_implicitly() -> io::Result<()> {
        let mut writer = Builder::default().build(Vec::new());
        writer.write_records(&[sample_record(1)])?;
        let buf = writer.finish()?;

        let mut reader = &buf[..];
        let file_definition = FileDefinition::decode(&mut reader)?;
        assert_eq!(file_definition.version(), Version::V3_0);

        Ok(())
    }
}
