//! A reader and writer for the CRAM format: a reference-based,
//! block-compressed binary container for aligned sequencing reads.
//!
//! A CRAM stream is a hierarchy of [`container::Container`]s, each holding
//! one [`container::CompressionHeader`] and an ordered run of
//! [`container::Slice`]s; each slice packs its records into one core bit
//! stream and a handful of per-data-series external byte streams, each
//! independently compressed into a [`container::Block`].
//!
//! This crate covers that hierarchy end to end: building a slice from a
//! batch of [`record::CramRecord`]s, decoding one back, normalizing raw
//! decoded records into fully materialized ones ([`normalize`]), and
//! producing BAI/CRAI index entries ([`index`]). [`io::Writer`] and
//! [`io::Reader`] sequence the file-level pieces (file definition,
//! file-header container, data containers, EOF sentinel) around the
//! container-level functions in [`container`]. The SAM record model and a
//! reference-sequence fetch service are external collaborators this crate
//! only takes as trait parameters or converts through ([`sam`],
//! [`reference`]) — see spec.md §6 for the exact interface boundaries.
//!
//! # Reading a stream
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! use cram::container::decode_container;
//! use cram::file_definition::Version;
//!
//! # fn main() -> std::io::Result<()> {
//! let mut reader = BufReader::new(File::open("sample.cram")?);
//!
//! while let Some(container) = decode_container(&mut reader, Version::V3_0)? {
//!     for record in container.records()? {
//!         let _ = record;
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The same stream read through the file-level [`io::Reader`] instead:
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! use cram::io::reader::Builder;
//!
//! # fn main() -> std::io::Result<()> {
//! let mut reader = Builder::default().build(BufReader::new(File::open("sample.cram")?));
//!
//! let _header = reader.read_file_header()?;
//! while let Some(container) = reader.read_container()? {
//!     let _ = container.records()?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod bitio;
pub mod codecs;
pub mod container;
pub mod diagnostics;
pub mod error;
pub mod file_definition;
mod huffman;
pub mod index;
pub mod io;
pub mod normalize;
pub mod num;
pub mod record;
pub mod reference;
pub mod sam;

pub use self::{
    container::Container,
    error::{Error, Kind},
    file_definition::FileDefinition,
    record::CramRecord,
};
