use std::io;

/// The two-character key identifying a data series in the encoding map.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DataSeries {
    BamFlags,
    CramFlags,
    ReferenceId,
    ReadLengths,
    AlignmentStarts,
    ReadGroups,
    Names,
    MateFlags,
    MateReferenceId,
    MateAlignmentStart,
    TemplateSize,
    MateDistance,
    TagSetIds,
    FeatureCounts,
    FeatureCodes,
    FeaturePositionDeltas,
    DeletionLengths,
    StretchesOfBases,
    StretchesOfQualityScores,
    BaseSubstitutionCodes,
    InsertionBases,
    ReferenceSkipLengths,
    PaddingLengths,
    HardClipLengths,
    SoftClipBases,
    MappingQualities,
    Bases,
    QualityScores,
}

impl DataSeries {
    pub const ALL: [Self; 28] = [
        Self::BamFlags,
        Self::CramFlags,
        Self::ReferenceId,
        Self::ReadLengths,
        Self::AlignmentStarts,
        Self::ReadGroups,
        Self::Names,
        Self::MateFlags,
        Self::MateReferenceId,
        Self::MateAlignmentStart,
        Self::TemplateSize,
        Self::MateDistance,
        Self::TagSetIds,
        Self::FeatureCounts,
        Self::FeatureCodes,
        Self::FeaturePositionDeltas,
        Self::DeletionLengths,
        Self::StretchesOfBases,
        Self::StretchesOfQualityScores,
        Self::BaseSubstitutionCodes,
        Self::InsertionBases,
        Self::ReferenceSkipLengths,
        Self::PaddingLengths,
        Self::HardClipLengths,
        Self::SoftClipBases,
        Self::MappingQualities,
        Self::Bases,
        Self::QualityScores,
    ];

    pub fn from_key(key: [u8; 2]) -> io::Result<Self> {
        match &key {
            b"BF" => Ok(Self::BamFlags),
            b"CF" => Ok(Self::CramFlags),
            b"RI" => Ok(Self::ReferenceId),
            b"RL" => Ok(Self::ReadLengths),
            b"AP" => Ok(Self::AlignmentStarts),
            b"RG" => Ok(Self::ReadGroups),
            b"RN" => Ok(Self::Names),
            b"MF" => Ok(Self::MateFlags),
            b"NS" => Ok(Self::MateReferenceId),
            b"NP" => Ok(Self::MateAlignmentStart),
            b"TS" => Ok(Self::TemplateSize),
            b"NF" => Ok(Self::MateDistance),
            b"TL" => Ok(Self::TagSetIds),
            b"FN" => Ok(Self::FeatureCounts),
            b"FC" => Ok(Self::FeatureCodes),
            b"FP" => Ok(Self::FeaturePositionDeltas),
            b"DL" => Ok(Self::DeletionLengths),
            b"BB" => Ok(Self::StretchesOfBases),
            b"QQ" => Ok(Self::StretchesOfQualityScores),
            b"BS" => Ok(Self::BaseSubstitutionCodes),
            b"IN" => Ok(Self::InsertionBases),
            b"RS" => Ok(Self::ReferenceSkipLengths),
            b"PD" => Ok(Self::PaddingLengths),
            b"HC" => Ok(Self::HardClipLengths),
            b"SC" => Ok(Self::SoftClipBases),
            b"MQ" => Ok(Self::MappingQualities),
            b"BA" => Ok(Self::Bases),
            b"QS" => Ok(Self::QualityScores),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid data series key: {:?}", String::from_utf8_lossy(&key)),
            )),
        }
    }

    pub fn key(&self) -> [u8; 2] {
        match self {
            Self::BamFlags => *b"BF",
            Self::CramFlags => *b"CF",
            Self::ReferenceId => *b"RI",
            Self::ReadLengths => *b"RL",
            Self::AlignmentStarts => *b"AP",
            Self::ReadGroups => *b"RG",
            Self::Names => *b"RN",
            Self::MateFlags => *b"MF",
            Self::MateReferenceId => *b"NS",
            Self::MateAlignmentStart => *b"NP",
            Self::TemplateSize => *b"TS",
            Self::MateDistance => *b"NF",
            Self::TagSetIds => *b"TL",
            Self::FeatureCounts => *b"FN",
            Self::FeatureCodes => *b"FC",
            Self::FeaturePositionDeltas => *b"FP",
            Self::DeletionLengths => *b"DL",
            Self::StretchesOfBases => *b"BB",
            Self::StretchesOfQualityScores => *b"QQ",
            Self::BaseSubstitutionCodes => *b"BS",
            Self::InsertionBases => *b"IN",
            Self::ReferenceSkipLengths => *b"RS",
            Self::PaddingLengths => *b"PD",
            Self::HardClipLengths => *b"HC",
            Self::SoftClipBases => *b"SC",
            Self::MappingQualities => *b"MQ",
            Self::Bases => *b"BA",
            Self::QualityScores => *b"QS",
        }
    }
}
