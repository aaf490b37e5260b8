//! The CRAM file definition: magic number, version, and file id.

mod version;

pub use self::version::Version;

use std::io::{self, Read, Write};

use crate::error::{Error, Kind};

pub const MAGIC_NUMBER: [u8; 4] = *b"CRAM";
pub const FILE_ID_LEN: usize = 20;

/// The 26-byte preamble of every CRAM stream.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileDefinition {
    version: Version,
    file_id: [u8; FILE_ID_LEN],
}

impl FileDefinition {
    pub fn new(version: Version, file_id: [u8; FILE_ID_LEN]) -> Self {
        Self { version, file_id }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn file_id(&self) -> &[u8; FILE_ID_LEN] {
        &self.file_id
    }

    /// Writes the 26-byte preamble: magic number, major/minor version,
    /// then the file id, in that order.
    pub fn encode<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: Write,
    {
        writer.write_all(&MAGIC_NUMBER)?;
        writer.write_all(&[self.version.major(), self.version.minor()])?;
        writer.write_all(&self.file_id)
    }

    /// Reads the 26-byte preamble, rejecting a bad magic number or an
    /// unsupported version (spec.md §7 `UnsupportedVersion`).
    pub fn decode<R>(reader: &mut R) -> io::Result<Self>
    where
        R: Read,
    {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;

        if magic != MAGIC_NUMBER {
            return Err(Error::new(
                Kind::UnsupportedVersion,
                format!("invalid magic number: {magic:?}"),
            )
            .into());
        }

        let mut version_bytes = [0u8; 2];
        reader.read_exact(&mut version_bytes)?;
        let version = Version::new(version_bytes[0], version_bytes[1]);

        if !version.is_supported() {
            return Err(Error::new(
                Kind::UnsupportedVersion,
                format!("unsupported CRAM version: {version}"),
            )
            .into());
        }

        let mut file_id = [0u8; FILE_ID_LEN];
        reader.read_exact(&mut file_id)?;

        Ok(Self::new(version, file_id))
    }
}

impl Default for FileDefinition {
    fn default() -> Self {
        Self::new(Version::default(), [0; FILE_ID_LEN])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let definition = FileDefinition::default();
        assert_eq!(definition.version(), Version::V3_0);
        assert_eq!(definition.file_id(), &[0; FILE_ID_LEN]);
    }

    #[test]
    fn test_round_trip() -> io::Result<()> {
        let mut file_id = [0u8; FILE_ID_LEN];
        file_id[..6].copy_from_slice(b"sample");
        let definition = FileDefinition::new(Version::V3_0, file_id);

        let mut buf = Vec::new();
        definition.encode(&mut buf)?;
        assert_eq!(buf.len(), 4 + 2 + FILE_ID_LEN);

        let mut reader = &buf[..];
        let decoded = FileDefinition::decode(&mut reader)?;
        assert_eq!(decoded, definition);

        Ok(())
    }

    #[test]
    fn test_decode_rejects_bad_magic_number() {
        let mut reader: &[u8] = &[b'X', b'R', b'A', b'M', 3, 0];
        assert!(FileDefinition::decode(&mut reader).is_err());
    }

    #[test]
    fn test_decode_rejects_unsupported_version() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&MAGIC_NUMBER);
        buf.extend_from_slice(&[9, 9]);
        buf.extend_from_slice(&[0u8; FILE_ID_LEN]);

        let mut reader = &buf[..];
        assert!(FileDefinition::decode(&mut reader).is_err());
    }
}
