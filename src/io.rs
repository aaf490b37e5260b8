//! The file-level reader and writer: the file definition preamble, the
//! file-header container, and the run of data containers terminated by
//! the EOF sentinel (spec.md §6, §9), with a builder on each side to
//! configure a [`crate::diagnostics::Strictness`] and a reference sequence
//! collaborator.

pub mod reader;
pub mod writer;

pub use self::{reader::Reader, writer::Writer};
