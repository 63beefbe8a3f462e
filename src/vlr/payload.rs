//! Typed payloads for the well-known variable length records.

use crate::{
    units,
    vlr::{ExtraBytes, WAVEFORM_DESCRIPTOR_IDS},
    Error, Result,
};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::ops::RangeInclusive;

const CLASSIFICATION_DESCRIPTION_SIZE: usize = 15;
const MAX_CLASSIFICATION_ENTRIES: usize = 256;

/// The decoded payload of a variable length record.
///
/// Payloads of registered (user id, record id) pairs decode to one of the
/// typed variants; everything else is carried as raw [Payload::Bytes].
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// GeoTIFF key directory ("LASF_Projection", 34735).
    GeoKeys(GeoKeys),
    /// GeoTIFF double parameters ("LASF_Projection", 34736).
    GeoDoubleParams(GeoDoubleParams),
    /// GeoTIFF ascii parameters ("LASF_Projection", 34737).
    GeoAsciiParams(GeoAsciiParams),
    /// An OGC coordinate system WKT string ("LASF_Projection", 2112).
    OgcWkt(OgcWkt),
    /// A classification dictionary ("LASF_Spec", 0).
    ClassificationLookup(ClassificationLookup),
    /// Free-form descriptive text ("LASF_Spec", 3).
    TextAreaDescription(TextAreaDescription),
    /// The schema of user-defined point columns ("LASF_Spec", 4).
    ExtraBytes(ExtraBytes),
    /// A waveform packet descriptor ("LASF_Spec", 100-354).
    WaveformPacketDescriptor(WaveformPacketDescriptor),
    /// An unregistered payload, carried as-is.
    Bytes(Vec<u8>),
}

impl Payload {
    /// The name of this payload's type, for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Payload::GeoKeys(_) => "GeoKeys",
            Payload::GeoDoubleParams(_) => "GeoDoubleParams",
            Payload::GeoAsciiParams(_) => "GeoAsciiParams",
            Payload::OgcWkt(_) => "OgcWkt",
            Payload::ClassificationLookup(_) => "ClassificationLookup",
            Payload::TextAreaDescription(_) => "TextAreaDescription",
            Payload::ExtraBytes(_) => "ExtraBytes",
            Payload::WaveformPacketDescriptor(_) => "WaveformPacketDescriptor",
            Payload::Bytes(_) => "Bytes",
        }
    }

    /// The user id and record ids this payload type must be stored under,
    /// or `None` for raw bytes.
    pub fn registration(&self) -> Option<(&'static str, RangeInclusive<u16>)> {
        match self {
            Payload::GeoKeys(_) => Some(("LASF_Projection", 34735..=34735)),
            Payload::GeoDoubleParams(_) => Some(("LASF_Projection", 34736..=34736)),
            Payload::GeoAsciiParams(_) => Some(("LASF_Projection", 34737..=34737)),
            Payload::OgcWkt(_) => Some(("LASF_Projection", 2112..=2112)),
            Payload::ClassificationLookup(_) => Some(("LASF_Spec", 0..=0)),
            Payload::TextAreaDescription(_) => Some(("LASF_Spec", 3..=3)),
            Payload::ExtraBytes(_) => Some(("LASF_Spec", 4..=4)),
            Payload::WaveformPacketDescriptor(_) => {
                Some(("LASF_Spec", WAVEFORM_DESCRIPTOR_IDS))
            }
            Payload::Bytes(_) => None,
        }
    }

    /// Encodes this payload to its wire bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.byte_len());
        match self {
            Payload::GeoKeys(geo_keys) => geo_keys.write_to(&mut bytes)?,
            Payload::GeoDoubleParams(doubles) => {
                for double in &doubles.0 {
                    bytes.write_f64::<LittleEndian>(*double)?;
                }
            }
            Payload::GeoAsciiParams(ascii) => bytes.extend_from_slice(&ascii.data),
            Payload::OgcWkt(wkt) => {
                bytes.extend_from_slice(wkt.wkt.as_bytes());
                bytes.push(0);
            }
            Payload::ClassificationLookup(lookup) => lookup.write_to(&mut bytes)?,
            Payload::TextAreaDescription(text) => bytes.extend_from_slice(text.0.as_bytes()),
            Payload::ExtraBytes(extra_bytes) => extra_bytes.write_to(&mut bytes)?,
            Payload::WaveformPacketDescriptor(descriptor) => descriptor.write_to(&mut bytes)?,
            Payload::Bytes(data) => bytes.extend_from_slice(data),
        }
        Ok(bytes)
    }

    /// The size of this payload's wire bytes.
    pub fn byte_len(&self) -> usize {
        match self {
            Payload::GeoKeys(geo_keys) => 8 + geo_keys.keys.len() * 8,
            Payload::GeoDoubleParams(doubles) => doubles.0.len() * 8,
            Payload::GeoAsciiParams(ascii) => ascii.data.len(),
            Payload::OgcWkt(wkt) => wkt.wkt.len() + 1,
            Payload::ClassificationLookup(lookup) => lookup.entries.len() * 16,
            Payload::TextAreaDescription(text) => text.0.len(),
            Payload::ExtraBytes(extra_bytes) => extra_bytes.byte_len(),
            Payload::WaveformPacketDescriptor(_) => 26,
            Payload::Bytes(data) => data.len(),
        }
    }
}

macro_rules! payload_from {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl From<$ty> for Payload {
                fn from(payload: $ty) -> Payload {
                    Payload::$ty(payload)
                }
            }
        )+
    };
}

payload_from!(
    GeoKeys,
    GeoDoubleParams,
    GeoAsciiParams,
    OgcWkt,
    ClassificationLookup,
    TextAreaDescription,
    ExtraBytes,
    WaveformPacketDescriptor,
);

impl From<Vec<u8>> for Payload {
    fn from(data: Vec<u8>) -> Payload {
        Payload::Bytes(data)
    }
}

/// The GeoTIFF key directory.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeoKeys {
    /// Always 1.
    pub key_directory_version: u16,
    /// Always 1.
    pub key_revision: u16,
    /// Always 0.
    pub minor_revision: u16,
    /// The key entries.
    pub keys: Vec<GeoKeyEntry>,
}

/// One GeoTIFF key.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GeoKeyEntry {
    /// The key id.
    pub key_id: u16,
    /// Where the value lives: 0 for inline, or the record id of the
    /// double/ascii params record.
    pub tiff_tag_location: u16,
    /// The number of values.
    pub count: u16,
    /// The inline value, or the offset into the referenced record.
    pub value_offset: u16,
}

impl GeoKeys {
    pub(crate) fn read_from(data: &[u8]) -> Result<GeoKeys> {
        let mut read = data;
        let key_directory_version = read.read_u16::<LittleEndian>()?;
        let key_revision = read.read_u16::<LittleEndian>()?;
        let minor_revision = read.read_u16::<LittleEndian>()?;
        let number_of_keys = read.read_u16::<LittleEndian>()?;
        let mut keys = Vec::with_capacity(usize::from(number_of_keys));
        for _ in 0..number_of_keys {
            keys.push(GeoKeyEntry {
                key_id: read.read_u16::<LittleEndian>()?,
                tiff_tag_location: read.read_u16::<LittleEndian>()?,
                count: read.read_u16::<LittleEndian>()?,
                value_offset: read.read_u16::<LittleEndian>()?,
            });
        }
        Ok(GeoKeys {
            key_directory_version,
            key_revision,
            minor_revision,
            keys,
        })
    }

    pub(crate) fn write_to(&self, write: &mut Vec<u8>) -> Result<()> {
        write.write_u16::<LittleEndian>(self.key_directory_version)?;
        write.write_u16::<LittleEndian>(self.key_revision)?;
        write.write_u16::<LittleEndian>(self.minor_revision)?;
        write.write_u16::<LittleEndian>(self.keys.len() as u16)?;
        for key in &self.keys {
            write.write_u16::<LittleEndian>(key.key_id)?;
            write.write_u16::<LittleEndian>(key.tiff_tag_location)?;
            write.write_u16::<LittleEndian>(key.count)?;
            write.write_u16::<LittleEndian>(key.value_offset)?;
        }
        Ok(())
    }
}

/// The doubles referenced by GeoTIFF keys.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeoDoubleParams(pub Vec<f64>);

impl GeoDoubleParams {
    pub(crate) fn read_from(data: &[u8]) -> Result<GeoDoubleParams> {
        let mut read = data;
        let mut doubles = Vec::with_capacity(data.len() / 8);
        for _ in 0..data.len() / 8 {
            doubles.push(read.read_f64::<LittleEndian>()?);
        }
        Ok(GeoDoubleParams(doubles))
    }
}

/// The null-delimited ascii blob referenced by GeoTIFF keys.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeoAsciiParams {
    /// The raw blob, including its null delimiters.
    pub data: Vec<u8>,
}

impl GeoAsciiParams {
    /// The blob split into its null-delimited strings.
    pub fn strings(&self) -> Vec<&str> {
        self.data
            .split(|&byte| byte == 0)
            .filter(|s| !s.is_empty())
            .map(|s| std::str::from_utf8(s).unwrap_or(""))
            .collect()
    }
}

/// An OGC coordinate system WKT string.
///
/// The horizontal and vertical linear unit names are derived from the
/// string when the payload is decoded or created:
///
/// ```
/// use las_dataset::vlr::OgcWkt;
/// let wkt = OgcWkt::new(r#"PROJCS["p",UNIT["metre",1]]"#);
/// assert_eq!(Some("metre"), wkt.horizontal_units.as_deref());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OgcWkt {
    /// The WKT string, without its trailing null.
    pub wkt: String,
    /// The horizontal linear unit named by the string, if any.
    pub horizontal_units: Option<String>,
    /// The vertical linear unit named by the string, if any.
    pub vertical_units: Option<String>,
}

impl OgcWkt {
    /// Creates a payload from a WKT string, deriving its units.
    pub fn new(wkt: &str) -> OgcWkt {
        let (horizontal_units, vertical_units) = units::linear_units(wkt);
        OgcWkt {
            wkt: wkt.to_string(),
            horizontal_units,
            vertical_units,
        }
    }

    /// The per-axis factors that convert these units to metres, or `None`
    /// when the horizontal unit is unknown or already metric.
    pub fn conversion_to_metres(&self) -> Option<crate::Vector<f64>> {
        let horizontal = units::metres_per_unit(self.horizontal_units.as_deref()?)?;
        let vertical = self
            .vertical_units
            .as_deref()
            .and_then(units::metres_per_unit)
            .unwrap_or(horizontal);
        if horizontal == 1. && vertical == 1. {
            None
        } else {
            Some(crate::Vector {
                x: horizontal,
                y: horizontal,
                z: vertical,
            })
        }
    }

    pub(crate) fn read_from(data: &[u8]) -> Result<OgcWkt> {
        let end = data
            .iter()
            .position(|&byte| byte == 0)
            .unwrap_or(data.len());
        let wkt = std::str::from_utf8(&data[..end])?;
        Ok(OgcWkt::new(wkt))
    }
}

/// A classification dictionary: up to 256 (class number, description) pairs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClassificationLookup {
    entries: Vec<ClassificationEntry>,
}

/// One classification dictionary entry.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassificationEntry {
    /// The class number.
    pub class_number: u8,
    /// The class description, at most fifteen bytes.
    pub description: String,
}

impl ClassificationLookup {
    /// A dictionary of the standard ASPRS classes, 0 through 18.
    ///
    /// Descriptions are abbreviated to fit the fifteen-byte field.
    pub fn asprs() -> ClassificationLookup {
        let entries = [
            (0, "Created"),
            (1, "Unclassified"),
            (2, "Ground"),
            (3, "Low vegetation"),
            (4, "Med vegetation"),
            (5, "High vegetation"),
            (6, "Building"),
            (7, "Low point"),
            (8, "Model key-point"),
            (9, "Water"),
            (10, "Rail"),
            (11, "Road surface"),
            (12, "Overlap"),
            (13, "Wire guard"),
            (14, "Wire conductor"),
            (15, "Transmission"),
            (16, "Wire connector"),
            (17, "Bridge deck"),
            (18, "High noise"),
        ];
        ClassificationLookup {
            entries: entries
                .into_iter()
                .map(|(class_number, description)| ClassificationEntry {
                    class_number,
                    description: description.to_string(),
                })
                .collect(),
        }
    }

    /// The dictionary entries.
    pub fn entries(&self) -> &[ClassificationEntry] {
        &self.entries
    }

    /// Adds an entry.
    ///
    /// Fails when the description exceeds fifteen bytes or the dictionary
    /// its 256 entries:
    ///
    /// ```
    /// use las_dataset::vlr::ClassificationLookup;
    /// let mut lookup = ClassificationLookup::default();
    /// lookup.insert(2, "ground").unwrap();
    /// assert!(lookup.insert(3, "a description that is too long").is_err());
    /// ```
    pub fn insert(&mut self, class_number: u8, description: &str) -> Result<()> {
        if description.len() > CLASSIFICATION_DESCRIPTION_SIZE {
            return Err(Error::StringTooLong {
                string: description.to_string(),
                len: CLASSIFICATION_DESCRIPTION_SIZE,
            });
        }
        if self.entries.len() >= MAX_CLASSIFICATION_ENTRIES {
            return Err(Error::PayloadTooLarge {
                len: (self.entries.len() as u64 + 1) * 16,
                cap: (MAX_CLASSIFICATION_ENTRIES as u64) * 16,
            });
        }
        self.entries.push(ClassificationEntry {
            class_number,
            description: description.to_string(),
        });
        Ok(())
    }

    pub(crate) fn read_from(data: &[u8]) -> Result<ClassificationLookup> {
        let mut read = data;
        let mut entries = Vec::with_capacity(data.len() / 16);
        for _ in 0..data.len() / 16 {
            let class_number = read.read_u8()?;
            let description = crate::utils::read_padded_string(&mut read, 15)?;
            entries.push(ClassificationEntry {
                class_number,
                description,
            });
        }
        Ok(ClassificationLookup { entries })
    }

    pub(crate) fn write_to(&self, write: &mut Vec<u8>) -> Result<()> {
        for entry in &self.entries {
            write.write_u8(entry.class_number)?;
            crate::utils::write_padded_string(write, &entry.description, 15)?;
        }
        Ok(())
    }
}

/// Free-form descriptive text about the file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextAreaDescription(pub String);

impl TextAreaDescription {
    pub(crate) fn read_from(data: &[u8]) -> Result<TextAreaDescription> {
        let end = data
            .iter()
            .rposition(|&byte| byte != 0)
            .map(|position| position + 1)
            .unwrap_or(0);
        Ok(TextAreaDescription(
            std::str::from_utf8(&data[..end])?.to_string(),
        ))
    }
}

/// A waveform packet descriptor ("LASF_Spec", record ids 100 through 354).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WaveformPacketDescriptor {
    /// Bits per waveform sample.
    pub bits_per_sample: u8,
    /// The compression type of the waveform packets.
    pub waveform_compression_type: u8,
    /// The number of samples per packet.
    pub number_of_samples: u32,
    /// The temporal spacing between samples, in picoseconds.
    pub temporal_sample_spacing: u32,
    /// The gain to apply to raw samples.
    pub digitizer_gain: f64,
    /// The offset to apply to raw samples.
    pub digitizer_offset: f64,
}

impl WaveformPacketDescriptor {
    pub(crate) fn read_from(data: &[u8]) -> Result<WaveformPacketDescriptor> {
        let mut read = data;
        Ok(WaveformPacketDescriptor {
            bits_per_sample: read.read_u8()?,
            waveform_compression_type: read.read_u8()?,
            number_of_samples: read.read_u32::<LittleEndian>()?,
            temporal_sample_spacing: read.read_u32::<LittleEndian>()?,
            digitizer_gain: read.read_f64::<LittleEndian>()?,
            digitizer_offset: read.read_f64::<LittleEndian>()?,
        })
    }

    pub(crate) fn write_to(&self, write: &mut Vec<u8>) -> Result<()> {
        write.write_u8(self.bits_per_sample)?;
        write.write_u8(self.waveform_compression_type)?;
        write.write_u32::<LittleEndian>(self.number_of_samples)?;
        write.write_u32::<LittleEndian>(self.temporal_sample_spacing)?;
        write.write_f64::<LittleEndian>(self.digitizer_gain)?;
        write.write_f64::<LittleEndian>(self.digitizer_offset)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geo_keys_roundtrip() {
        let geo_keys = GeoKeys {
            key_directory_version: 1,
            key_revision: 1,
            minor_revision: 0,
            keys: vec![GeoKeyEntry {
                key_id: 3072,
                tiff_tag_location: 0,
                count: 1,
                value_offset: 32633,
            }],
        };
        let bytes = Payload::GeoKeys(geo_keys.clone()).to_bytes().unwrap();
        assert_eq!(16, bytes.len());
        assert_eq!(geo_keys, GeoKeys::read_from(&bytes).unwrap());
    }

    #[test]
    fn wkt_null_terminated() {
        let payload = Payload::OgcWkt(OgcWkt::new("PROJCS[\"p\"]"));
        let bytes = payload.to_bytes().unwrap();
        assert_eq!(Some(&0), bytes.last());
        let read_back = OgcWkt::read_from(&bytes).unwrap();
        assert_eq!("PROJCS[\"p\"]", read_back.wkt);
    }

    #[test]
    fn wkt_units() {
        let wkt = OgcWkt::new(r#"PROJCS["p",UNIT["foot",0.3048]]"#);
        let conversion = wkt.conversion_to_metres().unwrap();
        assert_eq!(0.3048, conversion.x);
        assert_eq!(0.3048, conversion.z);
        let wkt = OgcWkt::new(r#"PROJCS["p",UNIT["metre",1]]"#);
        assert!(wkt.conversion_to_metres().is_none());
    }

    #[test]
    fn classification_lookup_roundtrip() {
        let mut lookup = ClassificationLookup::default();
        lookup.insert(2, "ground").unwrap();
        lookup.insert(5, "high veg").unwrap();
        let bytes = Payload::ClassificationLookup(lookup.clone())
            .to_bytes()
            .unwrap();
        assert_eq!(32, bytes.len());
        assert_eq!(lookup, ClassificationLookup::read_from(&bytes).unwrap());
    }

    #[test]
    fn asprs_dictionary() {
        let lookup = ClassificationLookup::asprs();
        assert_eq!(19, lookup.entries().len());
        assert!(lookup
            .entries()
            .iter()
            .all(|entry| entry.description.len() <= 15));
        let bytes = Payload::ClassificationLookup(lookup.clone()).to_bytes().unwrap();
        assert_eq!(lookup, ClassificationLookup::read_from(&bytes).unwrap());
    }

    #[test]
    fn classification_lookup_full() {
        let mut lookup = ClassificationLookup::default();
        for n in 0..=255u8 {
            lookup.insert(n, "class").unwrap();
        }
        assert!(matches!(
            lookup.insert(0, "overflow").unwrap_err(),
            Error::PayloadTooLarge { .. }
        ));
    }

    #[test]
    fn waveform_descriptor_roundtrip() {
        let descriptor = WaveformPacketDescriptor {
            bits_per_sample: 16,
            waveform_compression_type: 0,
            number_of_samples: 256,
            temporal_sample_spacing: 1000,
            digitizer_gain: 1.5,
            digitizer_offset: -0.5,
        };
        let bytes = Payload::WaveformPacketDescriptor(descriptor).to_bytes().unwrap();
        assert_eq!(26, bytes.len());
        assert_eq!(
            descriptor,
            WaveformPacketDescriptor::read_from(&bytes).unwrap()
        );
    }

    #[test]
    fn ascii_params_strings() {
        let ascii = GeoAsciiParams {
            data: b"NAD83|UTM zone 17N\0metre\0".to_vec(),
        };
        assert_eq!(vec!["NAD83|UTM zone 17N", "metre"], ascii.strings());
    }
}
