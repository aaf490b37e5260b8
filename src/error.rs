//! Crate-level error classification.
//!
//! Individual readers/writers return `std::io::Result`; this type exists so
//! callers of the top-level entry points (`encode_container`,
//! `decode_container`, `build_slice`, `normalize`, `index`) can match on the
//! kind of failure from spec §7 without downcasting through `io::Error`.

use std::{error, fmt, io};

/// The kinds of failure a CRAM operation can report.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Kind {
    TruncatedStream,
    CorruptBlock,
    UnknownCompressionMethod,
    CodecError,
    InvalidContentId,
    InvalidReferenceContext,
    InvalidAlignmentContext,
    ReferenceMd5Mismatch,
    ReferenceMissing,
    IndexNotInitialized,
    UnsupportedVersion,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TruncatedStream => "truncated stream",
            Self::CorruptBlock => "corrupt block",
            Self::UnknownCompressionMethod => "unknown compression method",
            Self::CodecError => "codec error",
            Self::InvalidContentId => "invalid content id",
            Self::InvalidReferenceContext => "invalid reference context",
            Self::InvalidAlignmentContext => "invalid alignment context",
            Self::ReferenceMd5Mismatch => "reference md5 mismatch",
            Self::ReferenceMissing => "reference missing",
            Self::IndexNotInitialized => "index not initialized",
            Self::UnsupportedVersion => "unsupported version",
        };

        f.write_str(s)
    }
}

/// Diagnostic context attached to a [`Error`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Context {
    pub container_offset: Option<u64>,
    pub slice_index: Option<usize>,
    pub record_index: Option<usize>,
    pub content_id: Option<i32>,
}

impl Context {
    pub fn with_container_offset(mut self, offset: u64) -> Self {
        self.container_offset = Some(offset);
        self
    }

    pub fn with_slice_index(mut self, index: usize) -> Self {
        self.slice_index = Some(index);
        self
    }

    pub fn with_record_index(mut self, index: usize) -> Self {
        self.record_index = Some(index);
        self
    }

    pub fn with_content_id(mut self, id: i32) -> Self {
        self.content_id = Some(id);
        self
    }
}

/// A classified CRAM operation failure.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Error {
    kind: Kind,
    context: Context,
    message: String,
}

impl Error {
    pub fn new(kind: Kind, message: impl Into<String>) -> Self {
        Self {
            kind,
            context: Context::default(),
            message: message.into(),
        }
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn context(&self) -> &Context {
        &self.context
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;

        if let Some(offset) = self.context.container_offset {
            write!(f, " (container offset {offset})")?;
        }

        if let Some(index) = self.context.slice_index {
            write!(f, " (slice {index})")?;
        }

        if let Some(index) = self.context.record_index {
            write!(f, " (record {index})")?;
        }

        if let Some(id) = self.context.content_id {
            write!(f, " (content id {id})")?;
        }

        Ok(())
    }
}

impl error::Error for Error {}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        let kind = match e.kind {
            Kind::TruncatedStream => io::ErrorKind::UnexpectedEof,
            Kind::UnsupportedVersion | Kind::InvalidContentId => io::ErrorKind::InvalidInput,
            _ => io::ErrorKind::InvalidData,
        };

        io::Error::new(kind, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let err = Error::new(Kind::CorruptBlock, "crc mismatch")
            .with_context(Context::default().with_container_offset(128).with_content_id(3));

        let s = err.to_string();
        assert!(s.contains("corrupt block"));
        assert!(s.contains("128"));
        assert!(s.contains("content id 3"));
    }

    #[test]
    fn test_into_io_error() {
        let err = Error::new(Kind::TruncatedStream, "eof");
        let io_err: io::Error = err.into();
        assert_eq!(io_err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
