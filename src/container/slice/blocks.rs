//! The decompressed-container-unit view of one slice's blocks: exactly one
//! core block plus an ordered map of external blocks, one of which may be
//! marked as an embedded reference.

use indexmap::IndexMap;

use crate::container::block::{Block, ContentId};
use crate::error::{Error, Kind};

/// One slice's [`Block`]s, keyed the way a [`super::Slice`] addresses them:
/// a single core (bit-packed) block, and external (byte-oriented) blocks by
/// content id.
#[derive(Clone, Debug)]
pub struct SliceBlocks {
    core: Block,
    external: IndexMap<ContentId, Block>,
    embedded_reference_content_id: Option<ContentId>,
}

impl SliceBlocks {
    /// Builds a slice's block set, validating that external content ids are
    /// pairwise distinct and non-`-1` (spec.md §3, §8 invariant 2).
    pub fn new(
        core: Block,
        external: IndexMap<ContentId, Block>,
        embedded_reference_content_id: Option<ContentId>,
    ) -> Result<Self, Error> {
        for &id in external.keys() {
            if id == -1 {
                return Err(Error::new(
                    Kind::InvalidContentId,
                    "external block content id -1 is reserved",
                ));
            }
        }

        if let Some(id) = embedded_reference_content_id {
            if !external.contains_key(&id) {
                return Err(Error::new(
                    Kind::InvalidContentId,
                    format!("embedded reference content id {id} has no external block"),
                ));
            }
        }

        Ok(Self {
            core,
            external,
            embedded_reference_content_id,
        })
    }

    pub fn core(&self) -> &Block {
        &self.core
    }

    pub fn external(&self) -> &IndexMap<ContentId, Block> {
        &self.external
    }

    pub fn get_external(&self, content_id: ContentId) -> Option<&Block> {
        self.external.get(&content_id)
    }

    pub fn embedded_reference_content_id(&self) -> Option<ContentId> {
        self.embedded_reference_content_id
    }

    pub fn embedded_reference_block(&self) -> Option<&Block> {
        self.embedded_reference_content_id
            .and_then(|id| self.external.get(&id))
    }

    /// `n_blocks` per spec.md §8 invariant 1: the core block counts as one,
    /// plus one per external block.
    pub fn n_blocks(&self) -> usize {
        1 + self.external.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::block::ContentType;
    use crate::codecs::Method;

    #[test]
    fn test_n_blocks() {
        let core = Block::create_raw_core_data_block(Vec::new());
        let mut external = IndexMap::new();
        external.insert(
            0,
            Block::encode(ContentType::ExternalData, 0, Method::Raw, b"a").unwrap(),
        );
        external.insert(
            1,
            Block::encode(ContentType::ExternalData, 1, Method::Raw, b"b").unwrap(),
        );

        let blocks = SliceBlocks::new(core, external, None).unwrap();
        assert_eq!(blocks.n_blocks(), 3);
    }

    #[test]
    fn test_rejects_reserved_content_id() {
        let core = Block::create_raw_core_data_block(Vec::new());
        let mut external = IndexMap::new();
        external.insert(
            -1,
            Block::encode(ContentType::ExternalData, -1, Method::Raw, b"a").unwrap(),
        );

        assert!(SliceBlocks::new(core, external, None).is_err());
    }

    #[test]
    fn test_rejects_dangling_embedded_reference() {
        let core = Block::create_raw_core_data_block(Vec::new());
        let external = IndexMap::new();

        assert!(SliceBlocks::new(core, external, Some(5)).is_err());
    }
}
