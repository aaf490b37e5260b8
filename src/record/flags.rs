//! The three flag sets carried by a [`super::CramRecord`]: BAM-style
//! record flags, CRAM-specific record flags, and mate flags.

use bitflags::bitflags;

bitflags! {
    /// The subset of BAM flags CRAM records carry directly.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct Flags: u16 {
        const SEGMENTED = 0x0001;
        const PROPERLY_SEGMENTED = 0x0002;
        const UNMAPPED = 0x0004;
        const REVERSE_COMPLEMENTED = 0x0010;
        const FIRST_SEGMENT = 0x0040;
        const LAST_SEGMENT = 0x0080;
        const SECONDARY = 0x0100;
        const QC_FAIL = 0x0200;
        const DUPLICATE = 0x0400;
        const SUPPLEMENTARY = 0x0800;
    }
}

impl Flags {
    pub fn is_segmented(&self) -> bool {
        self.contains(Self::SEGMENTED)
    }

    pub fn is_unmapped(&self) -> bool {
        self.contains(Self::UNMAPPED)
    }

    pub fn is_reverse_complemented(&self) -> bool {
        self.contains(Self::REVERSE_COMPLEMENTED)
    }
}

bitflags! {
    /// CRAM-specific per-record flags (the `CF` data series).
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct CramFlags: u8 {
        /// Quality scores are stored even where they would otherwise be
        /// reconstructible (e.g. an unmapped read).
        const FORCE_PRESERVE_QUALITY_SCORES = 0x01;
        /// This record's mate information is stored in full rather than
        /// as a reference to a downstream record in the same slice.
        const DETACHED = 0x02;
        /// This record's mate is a downstream record in the same slice,
        /// referenced via `records_to_next_fragment`.
        const HAS_MATE_DOWNSTREAM = 0x04;
        /// The read sequence is unknown (BAM `*`).
        const UNKNOWN_BASES = 0x08;
    }
}

impl CramFlags {
    pub fn is_detached(&self) -> bool {
        self.contains(Self::DETACHED)
    }

    pub fn has_mate_downstream(&self) -> bool {
        self.contains(Self::HAS_MATE_DOWNSTREAM)
    }

    pub fn are_quality_scores_stored_as_array(&self) -> bool {
        self.contains(Self::FORCE_PRESERVE_QUALITY_SCORES)
    }
}

bitflags! {
    /// Flags describing a detached record's mate (the `MF` data series).
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct MateFlags: u8 {
        const MATE_REVERSE_COMPLEMENTED = 0x01;
        const MATE_UNMAPPED = 0x02;
    }
}

impl MateFlags {
    pub fn is_mate_reverse_complemented(&self) -> bool {
        self.contains(Self::MATE_REVERSE_COMPLEMENTED)
    }

    pub fn is_mate_unmapped(&self) -> bool {
        self.contains(Self::MATE_UNMAPPED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let flags = Flags::SEGMENTED | Flags::FIRST_SEGMENT;
        assert!(flags.is_segmented());
        assert!(!flags.is_unmapped());
    }

    #[test]
    fn test_cram_flags() {
        let flags = CramFlags::DETACHED | CramFlags::UNKNOWN_BASES;
        assert!(flags.is_detached());
        assert!(!flags.has_mate_downstream());
    }

    #[test]
    fn test_mate_flags() {
        let flags = MateFlags::MATE_UNMAPPED;
        assert!(flags.is_mate_unmapped());
        assert!(!flags.is_mate_reverse_complemented());
    }
}
