//! The per-container compression header: preservation map, per-data-series
//! encoding map, and tag encoding map.

pub mod data_series;
pub mod data_series_encodings;
pub mod encoding;
pub mod preservation_map;
pub mod substitution_matrix;

pub use self::{
    data_series::DataSeries,
    data_series_encodings::DataSeriesEncodings,
    encoding::Encoding,
    preservation_map::PreservationMap,
    substitution_matrix::SubstitutionMatrix,
};

use std::collections::HashMap;
use std::io::{self, Read, Write};

use crate::diagnostics::Diagnostics;
use crate::num::{read_itf8, write_itf8};
use crate::record::Tag;

use self::encoding::{read_encoding, write_encoding};
use self::preservation_map::Key as PreservationKey;

/// The packed 3-byte tag key (`name[0], name[1], type`), used both as the
/// tag encoding map's key and as an entry in a `TD` tag set.
pub type TagKey = [u8; 3];

/// The compression header: one per container, shared by every slice it
/// holds.
#[derive(Clone, Debug)]
pub struct CompressionHeader {
    preservation_map: PreservationMap,
    data_series_encodings: DataSeriesEncodings,
    tag_encodings: HashMap<TagKey, Encoding>,
}

impl CompressionHeader {
    pub fn new(
        preservation_map: PreservationMap,
        data_series_encodings: DataSeriesEncodings,
        tag_encodings: HashMap<TagKey, Encoding>,
    ) -> Self {
        Self {
            preservation_map,
            data_series_encodings,
            tag_encodings,
        }
    }

    pub fn preservation_map(&self) -> &PreservationMap {
        &self.preservation_map
    }

    pub fn data_series_encodings(&self) -> &DataSeriesEncodings {
        &self.data_series_encodings
    }

    pub fn tag_encodings(&self) -> &HashMap<TagKey, Encoding> {
        &self.tag_encodings
    }

    pub fn tag_encoding(&self, key: TagKey) -> Option<&Encoding> {
        self.tag_encodings.get(&key)
    }

    /// Writes the three ITF8-length-prefixed sub-maps, in order
    /// (preservation map, encoding map, tag encoding map).
    pub fn encode<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: Write,
    {
        write_length_prefixed(writer, |buf| self.write_preservation_map(buf))?;
        write_length_prefixed(writer, |buf| self.write_encoding_map(buf))?;
        write_length_prefixed(writer, |buf| self.write_tag_encoding_map(buf))
    }

    fn write_preservation_map<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: Write,
    {
        write_itf8(writer, PreservationKey::ALL.len() as i32)?;

        for key in PreservationKey::ALL {
            let raw: [u8; 2] = key.into();
            writer.write_all(&raw)?;

            match key {
                PreservationKey::RecordsHaveNames => {
                    writer.write_all(&[self.preservation_map.records_have_names() as u8])?;
                }
                PreservationKey::AlignmentStartsAreDeltas => {
                    writer.write_all(&[self.preservation_map.alignment_starts_are_deltas() as u8])?;
                }
                PreservationKey::ExternalReferenceSequenceIsRequired => {
                    writer.write_all(&[self
                        .preservation_map
                        .external_reference_sequence_is_required()
                        as u8])?;
                }
                PreservationKey::SubstitutionMatrix => {
                    writer.write_all(&self.preservation_map.substitution_matrix().to_bytes())?;
                }
                PreservationKey::TagSets => {
                    let mut td = Vec::new();

                    for tag_set in self.preservation_map.tag_sets() {
                        for (tag, _ty) in tag_set {
                            td.extend_from_slice(&tag.key());
                        }
                        td.push(0x00);
                    }

                    write_itf8(writer, td.len() as i32)?;
                    writer.write_all(&td)?;
                }
            }
        }

        Ok(())
    }

    fn write_encoding_map<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: Write,
    {
        let entries: Vec<_> = DataSeries::ALL
            .into_iter()
            .filter_map(|series| self.data_series_encodings.get(series).map(|e| (series, e)))
            .collect();

        write_itf8(writer, entries.len() as i32)?;

        for (series, encoding) in entries {
            writer.write_all(&series.key())?;
            write_encoding(writer, Some(&encoding))?;
        }

        Ok(())
    }

    fn write_tag_encoding_map<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: Write,
    {
        write_itf8(writer, self.tag_encodings.len() as i32)?;

        let mut entries: Vec<_> = self.tag_encodings.iter().collect();
        entries.sort_by_key(|(key, _)| **key);

        for (key, encoding) in entries {
            write_itf8(writer, pack_tag_key(*key))?;
            write_encoding(writer, Some(encoding))?;
        }

        Ok(())
    }

    /// Reads the three sub-maps. Unknown preservation map keys are
    /// tolerated under [`crate::diagnostics::Strictness::Lenient`] and
    /// rejected under `Strict`.
    pub fn decode<R>(reader: &mut R, diagnostics: &mut Diagnostics) -> io::Result<Self>
    where
        R: Read,
    {
        let preservation_map = read_length_prefixed(reader, |buf| {
            Self::read_preservation_map(buf, diagnostics)
        })?;

        let data_series_encodings =
            read_length_prefixed(reader, |buf| Self::read_encoding_map(buf))?;

        let tag_encodings = read_length_prefixed(reader, |buf| Self::read_tag_encoding_map(buf))?;

        Ok(Self::new(preservation_map, data_series_encodings, tag_encodings))
    }

    fn read_preservation_map<R>(
        reader: &mut R,
        diagnostics: &mut Diagnostics,
    ) -> io::Result<PreservationMap>
    where
        R: Read,
    {
        use crate::diagnostics::Strictness;

        let n = read_itf8(reader)?;

        let mut records_have_names = true;
        let mut alignment_starts_are_deltas = true;
        let mut external_reference_sequence_is_required = true;
        let mut substitution_matrix = SubstitutionMatrix::default();
        let mut tag_sets = Vec::new();

        for _ in 0..n {
            let mut raw_key = [0u8; 2];
            reader.read_exact(&mut raw_key)?;

            match PreservationKey::try_from(raw_key) {
                Ok(PreservationKey::RecordsHaveNames) => {
                    records_have_names = read_bool(reader)?;
                }
                Ok(PreservationKey::AlignmentStartsAreDeltas) => {
                    alignment_starts_are_deltas = read_bool(reader)?;
                }
                Ok(PreservationKey::ExternalReferenceSequenceIsRequired) => {
                    external_reference_sequence_is_required = read_bool(reader)?;
                }
                Ok(PreservationKey::SubstitutionMatrix) => {
                    let mut bytes = [0u8; 5];
                    reader.read_exact(&mut bytes)?;
                    substitution_matrix = SubstitutionMatrix::from_bytes(bytes);
                }
                Ok(PreservationKey::TagSets) => {
                    let len = read_itf8(reader)? as usize;
                    let mut td = vec![0u8; len];
                    reader.read_exact(&mut td)?;
                    tag_sets = parse_tag_sets(&td);
                }
                Err(_) => {
                    if diagnostics.strictness() == Strictness::Strict {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!(
                                "unknown preservation map key: {:?}",
                                String::from_utf8_lossy(&raw_key)
                            ),
                        ));
                    }

                    diagnostics.warn(format!(
                        "skipping unknown preservation map key: {:?}",
                        String::from_utf8_lossy(&raw_key)
                    ));
                }
            }
        }

        Ok(PreservationMap::new(
            records_have_names,
            alignment_starts_are_deltas,
            external_reference_sequence_is_required,
            substitution_matrix,
            tag_sets,
        ))
    }

    fn read_encoding_map<R>(reader: &mut R) -> io::Result<DataSeriesEncodings>
    where
        R: Read,
    {
        let n = read_itf8(reader)?;
        let mut encodings = DataSeriesEncodings::default();

        for _ in 0..n {
            let mut key = [0u8; 2];
            reader.read_exact(&mut key)?;
            let series = DataSeries::from_key(key)?;

            let encoding = read_encoding(reader)?;
            encodings.set(series, encoding);
        }

        Ok(encodings)
    }

    fn read_tag_encoding_map<R>(reader: &mut R) -> io::Result<HashMap<TagKey, Encoding>>
    where
        R: Read,
    {
        let n = read_itf8(reader)?;
        let mut map = HashMap::new();

        for _ in 0..n {
            let packed = read_itf8(reader)?;
            let key = unpack_tag_key(packed);

            let encoding = read_encoding(reader)?.ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidData, "tag encoding cannot be null")
            })?;

            map.insert(key, encoding);
        }

        Ok(map)
    }
}

impl Default for CompressionHeader {
    fn default() -> Self {
        Self::new(
            PreservationMap::default(),
            DataSeriesEncodings::init_legacy(),
            HashMap::new(),
        )
    }
}

fn read_bool<R>(reader: &mut R) -> io::Result<bool>
where
    R: Read,
{
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0] != 0)
}

fn pack_tag_key(key: TagKey) -> i32 {
    (i32::from(key[0]) << 16) | (i32::from(key[1]) << 8) | i32::from(key[2])
}

fn unpack_tag_key(packed: i32) -> TagKey {
    [
        ((packed >> 16) & 0xff) as u8,
        ((packed >> 8) & 0xff) as u8,
        (packed & 0xff) as u8,
    ]
}

fn parse_tag_sets(td: &[u8]) -> Vec<Vec<(Tag, u8)>> {
    td.split(|&b| b == 0x00)
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| {
            chunk
                .chunks_exact(3)
                .map(|raw| {
                    let tag = Tag::from_key([raw[0], raw[1], raw[2]]);
                    (tag, raw[2])
                })
                .collect()
        })
        .collect()
}

fn write_length_prefixed<W, F>(writer: &mut W, f: F) -> io::Result<()>
where
    W: Write,
    F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
{
    let mut buf = Vec::new();
    f(&mut buf)?;
    write_itf8(writer, buf.len() as i32)?;
    writer.write_all(&buf)
}

fn read_length_prefixed<R, F, T>(reader: &mut R, f: F) -> io::Result<T>
where
    R: Read,
    F: FnOnce(&mut &[u8]) -> io::Result<T>,
{
    let len = read_itf8(reader)?;
    let len = usize::try_from(len)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "negative sub-map length"))?;

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;

    let mut cursor = &buf[..];
    f(&mut cursor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Strictness;

    #[test]
    fn test_default_round_trip() -> io::Result<()> {
        let header = CompressionHeader::default();

        let mut buf = Vec::new();
        header.encode(&mut buf)?;

        let mut reader = &buf[..];
        let mut diagnostics = Diagnostics::new(Strictness::Lenient);
        let decoded = CompressionHeader::decode(&mut reader, &mut diagnostics)?;

        assert_eq!(
            decoded.preservation_map().records_have_names(),
            header.preservation_map().records_have_names()
        );
        assert_eq!(
            decoded.data_series_encodings().bam_flags().is_some(),
            header.data_series_encodings().bam_flags().is_some()
        );
        assert!(diagnostics.is_empty());

        Ok(())
    }

    #[test]
    fn test_tag_key_pack_round_trip() {
        let key: TagKey = *b"NMi";
        assert_eq!(unpack_tag_key(pack_tag_key(key)), key);
    }

    #[test]
    fn test_tag_encoding_map_round_trip() -> io::Result<()> {
        let mut tag_encodings = HashMap::new();
        tag_encodings.insert(
            *b"NMi",
            Encoding::ByteArray(encoding::ByteArray::ByteArrayLength {
                len_encoding: Box::new(encoding::Integer::External { block_content_id: 100 }),
                value_block_content_id: 100,
            }),
        );

        let header = CompressionHeader::new(
            PreservationMap::default(),
            DataSeriesEncodings::init_legacy(),
            tag_encodings,
        );

        let mut buf = Vec::new();
        header.encode(&mut buf)?;

        let mut reader = &buf[..];
        let mut diagnostics = Diagnostics::new(Strictness::Lenient);
        let decoded = CompressionHeader::decode(&mut reader, &mut diagnostics)?;

        assert!(decoded.tag_encoding(*b"NMi").is_some());

        Ok(())
    }

    #[test]
    fn test_unknown_preservation_key_is_lenient_by_default() -> io::Result<()> {
        let mut buf = Vec::new();
        write_itf8(&mut buf, 1)?;
        buf.extend_from_slice(b"ZZ");
        buf.extend_from_slice(&[1]);

        let mut sub = Vec::new();
        write_itf8(&mut sub, buf.len() as i32)?;
        sub.extend_from_slice(&buf);

        // empty encoding map, empty tag encoding map
        write_itf8(&mut sub, 0)?;
        write_itf8(&mut sub, 0)?;

        let mut reader = &sub[..];
        let mut diagnostics = Diagnostics::new(Strictness::Lenient);
        let header = CompressionHeader::decode(&mut reader, &mut diagnostics)?;

        assert!(!diagnostics.is_empty());
        assert!(header.preservation_map().records_have_names());

        Ok(())
    }
}
