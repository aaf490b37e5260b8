//! SAM-style auxiliary tags carried on a [`super::CramRecord`].

use std::io;

/// A two-character tag name plus its BAM/SAM value type character (e.g.
/// `i` for a 32-bit integer, `Z` for a printable string).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Tag {
    name: [u8; 2],
    ty: u8,
}

impl Tag {
    pub fn new(name: [u8; 2], ty: u8) -> Self {
        Self { name, ty }
    }

    pub fn name(&self) -> [u8; 2] {
        self.name
    }

    pub fn ty(&self) -> u8 {
        self.ty
    }

    /// The 3-byte key (`name[0], name[1], ty`) used to look up this tag's
    /// encoding in the compression header's tag encoding map, and as the
    /// identity of an entry in a `TD` tag set.
    pub fn key(&self) -> [u8; 3] {
        [self.name[0], self.name[1], self.ty]
    }

    pub fn from_key(key: [u8; 3]) -> Self {
        Self::new([key[0], key[1]], key[2])
    }
}

/// An auxiliary tag attached to a record, with its raw (already
/// type-tagged) value bytes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReadTag {
    tag: Tag,
    value: Vec<u8>,
}

impl ReadTag {
    pub fn new(tag: Tag, value: Vec<u8>) -> Self {
        Self { tag, value }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }
}

/// Computes the ITF8-serialized key used as an entry in the `TD`
/// dictionary and the encoded `TL` tag-line index lookup: the tag's
/// 3-byte key packed big-endian into the low 24 bits of an `i32`.
pub fn line_key(tags: &[ReadTag]) -> io::Result<Vec<[u8; 3]>> {
    Ok(tags.iter().map(|t| t.tag().key()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_key_round_trip() {
        let tag = Tag::new(*b"NM", b'i');
        assert_eq!(Tag::from_key(tag.key()), tag);
    }

    #[test]
    fn test_line_key() -> io::Result<()> {
        let tags = vec![
            ReadTag::new(Tag::new(*b"NM", b'i'), vec![0]),
            ReadTag::new(Tag::new(*b"MD", b'Z'), b"4T0".to_vec()),
        ];

        let keys = line_key(&tags)?;
        assert_eq!(keys, vec![*b"NMi", *b"MDZ"]);

        Ok(())
    }
}
