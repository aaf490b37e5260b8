use std::fmt;

/// A CRAM format version.
///
/// Only 2.1 and 3.0 are supported; anything else is rejected with
/// [`crate::error::Kind::UnsupportedVersion`] at the file-definition boundary.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub struct Version {
    major: u8,
    minor: u8,
}

impl Version {
    pub const V2_1: Self = Self::new(2, 1);
    pub const V3_0: Self = Self::new(3, 0);

    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    pub const fn major(&self) -> u8 {
        self.major
    }

    pub const fn minor(&self) -> u8 {
        self.minor
    }

    pub fn is_supported(&self) -> bool {
        matches!(*self, Self::V2_1 | Self::V3_0)
    }

    /// Block and container headers carry a trailing CRC32 starting at 3.0.
    pub fn has_crc32(&self) -> bool {
        self.major >= 3
    }

    /// The slice header's global record counter is ITF8 (32-bit) in 2.x and
    /// LTF8 (64-bit) from 3.0 onward.
    pub fn uses_wide_record_counter(&self) -> bool {
        self.major >= 3
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::V3_0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_crc32() {
        assert!(!Version::V2_1.has_crc32());
        assert!(Version::V3_0.has_crc32());
    }

    #[test]
    fn test_is_supported() {
        assert!(Version::V2_1.is_supported());
        assert!(Version::V3_0.is_supported());
        assert!(!Version::new(4, 0).is_supported());
        assert!(!Version::new(1, 0).is_supported());
    }

    #[test]
    fn test_ordering() {
        assert!(Version::V2_1 < Version::V3_0);
    }
}
