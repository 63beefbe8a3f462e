use crate::{
    feature::{Evlrs, LargeFiles, Waveforms},
    utils, Error, Result, Vector, Version,
};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

const IS_COMPRESSED_MASK: u8 = 0x80;

/// The wire image of a las header block.
///
/// The block is 227 bytes for las 1.1 and 1.2, 235 bytes for 1.3, and 375
/// bytes for 1.4; the version-conditional tail fields are optionals here.
#[derive(Clone, Debug, PartialEq)]
pub struct Header {
    /// A project-wide unique ID for the file.
    pub file_source_id: u16,

    /// A bit field carrying global properties: gps time type, waveform
    /// packet location, synthetic return numbers, and the WKT CRS flag.
    pub global_encoding: u16,

    /// The project GUID.
    pub guid: [u8; 16],

    /// The las version of this file.
    pub version: Version,

    /// The hardware or operation that produced these data, null-padded.
    pub system_identifier: [u8; 32],

    /// The software that produced these data, null-padded.
    pub generating_software: [u8; 32],

    /// GMT day of year of file creation, with January 1st as day 1.
    pub file_creation_day_of_year: u16,

    /// Four-digit year of file creation.
    pub file_creation_year: u16,

    /// The size of the header block itself.
    pub header_size: u16,

    /// The number of bytes from the start of the file to the first point
    /// record.
    pub offset_to_point_data: u32,

    /// The number of variable length records.
    pub number_of_variable_length_records: u32,

    /// The point format code, possibly with the compression bit set.
    pub point_data_record_format: u8,

    /// The size of one point record, including any extra bytes.
    pub point_data_record_length: u16,

    /// The legacy 32-bit point count.
    pub legacy_number_of_point_records: u32,

    /// The legacy per-return point counts, returns one through five.
    pub legacy_number_of_points_by_return: [u32; 5],

    /// The per-axis scale factors.
    pub scale: Vector<f64>,

    /// The per-axis offsets.
    pub offset: Vector<f64>,

    /// The per-axis maxima, in real coordinates.
    pub max: Vector<f64>,

    /// The per-axis minima, in real coordinates.
    pub min: Vector<f64>,

    /// The offset to the first waveform data packet record (las 1.3+).
    pub start_of_waveform_data_packet_record: Option<u64>,

    /// The extended variable length record block (las 1.4).
    pub evlr: Option<Evlr>,

    /// The 64-bit point counts (las 1.4).
    pub large_file: Option<LargeFile>,

    /// Bytes between the nominal end of the header and `header_size`.
    pub padding: Vec<u8>,
}

/// The las 1.4 extended variable length record block.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Evlr {
    /// The offset to the first byte of the first evlr.
    pub start_of_first_evlr: u64,

    /// The number of evlrs stored after the point records.
    pub number_of_evlrs: u32,
}

/// The las 1.4 64-bit point counts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LargeFile {
    /// The total number of point records.
    pub number_of_point_records: u64,

    /// The per-return point counts, returns one through fifteen.
    pub number_of_points_by_return: [u64; 15],
}

impl Header {
    /// Reads a raw header.
    ///
    /// Fails unless the stream opens with the "LASF" signature and declares
    /// a supported las version.
    ///
    /// ```
    /// use std::io::Cursor;
    /// use las_dataset::raw::Header;
    ///
    /// let mut cursor = Cursor::new(Vec::new());
    /// Header::default().write_to(&mut cursor).unwrap();
    /// cursor.set_position(0);
    /// let header = Header::read_from(&mut cursor).unwrap();
    /// ```
    pub fn read_from<R: Read>(mut read: R) -> Result<Header> {
        utils::skip_signature(&mut read)?;
        let file_source_id = read.read_u16::<LittleEndian>()?;
        let global_encoding = read.read_u16::<LittleEndian>()?;
        let mut guid = [0; 16];
        read.read_exact(&mut guid)?;
        let version = Version::new(read.read_u8()?, read.read_u8()?);
        version.verify()?;
        let mut system_identifier = [0; 32];
        read.read_exact(&mut system_identifier)?;
        let mut generating_software = [0; 32];
        read.read_exact(&mut generating_software)?;
        let file_creation_day_of_year = read.read_u16::<LittleEndian>()?;
        let file_creation_year = read.read_u16::<LittleEndian>()?;
        let header_size = read.read_u16::<LittleEndian>()?;
        let offset_to_point_data = read.read_u32::<LittleEndian>()?;
        if offset_to_point_data < u32::from(header_size) {
            return Err(Error::InconsistentHeader(format!(
                "offset to point data ({}) is smaller than the header size ({})",
                offset_to_point_data, header_size
            )));
        }
        let number_of_variable_length_records = read.read_u32::<LittleEndian>()?;
        let point_data_record_format = read.read_u8()?;
        let point_data_record_length = read.read_u16::<LittleEndian>()?;
        let legacy_number_of_point_records = read.read_u32::<LittleEndian>()?;
        let mut legacy_number_of_points_by_return = [0; 5];
        for n in legacy_number_of_points_by_return.iter_mut() {
            *n = read.read_u32::<LittleEndian>()?;
        }
        let scale = read_vector(&mut read)?;
        let offset = read_vector(&mut read)?;
        let max_x = read.read_f64::<LittleEndian>()?;
        let min_x = read.read_f64::<LittleEndian>()?;
        let max_y = read.read_f64::<LittleEndian>()?;
        let min_y = read.read_f64::<LittleEndian>()?;
        let max_z = read.read_f64::<LittleEndian>()?;
        let min_z = read.read_f64::<LittleEndian>()?;
        let start_of_waveform_data_packet_record = if version.supports::<Waveforms>() {
            utils::some_or_none_if_zero(read.read_u64::<LittleEndian>()?)
        } else {
            None
        };
        let evlr = if version.supports::<Evlrs>() {
            Evlr::read_from(&mut read)?.into_option()
        } else {
            None
        };
        let large_file = if version.supports::<LargeFiles>() {
            Some(LargeFile::read_from(&mut read)?)
        } else {
            None
        };
        let padding = if header_size > version.header_size() {
            let mut bytes = vec![0; usize::from(header_size - version.header_size())];
            read.read_exact(&mut bytes)?;
            bytes
        } else {
            Vec::new()
        };
        Ok(Header {
            file_source_id,
            global_encoding,
            guid,
            version,
            system_identifier,
            generating_software,
            file_creation_day_of_year,
            file_creation_year,
            header_size,
            offset_to_point_data,
            number_of_variable_length_records,
            point_data_record_format,
            point_data_record_length,
            legacy_number_of_point_records,
            legacy_number_of_points_by_return,
            scale,
            offset,
            max: Vector {
                x: max_x,
                y: max_y,
                z: max_z,
            },
            min: Vector {
                x: min_x,
                y: min_y,
                z: min_z,
            },
            start_of_waveform_data_packet_record,
            evlr,
            large_file,
            padding,
        })
    }

    /// Writes a raw header.
    ///
    /// ```
    /// use std::io::Cursor;
    /// use las_dataset::raw::Header;
    /// let mut cursor = Cursor::new(Vec::new());
    /// Header::default().write_to(&mut cursor).unwrap();
    /// assert_eq!(227, cursor.get_ref().len());
    /// ```
    pub fn write_to<W: Write>(&self, mut write: W) -> Result<()> {
        write.write_all(&utils::LASF)?;
        write.write_u16::<LittleEndian>(self.file_source_id)?;
        write.write_u16::<LittleEndian>(self.global_encoding)?;
        write.write_all(&self.guid)?;
        write.write_u8(self.version.major)?;
        write.write_u8(self.version.minor)?;
        write.write_all(&self.system_identifier)?;
        write.write_all(&self.generating_software)?;
        write.write_u16::<LittleEndian>(self.file_creation_day_of_year)?;
        write.write_u16::<LittleEndian>(self.file_creation_year)?;
        write.write_u16::<LittleEndian>(self.header_size)?;
        write.write_u32::<LittleEndian>(self.offset_to_point_data)?;
        write.write_u32::<LittleEndian>(self.number_of_variable_length_records)?;
        write.write_u8(self.point_data_record_format)?;
        write.write_u16::<LittleEndian>(self.point_data_record_length)?;
        write.write_u32::<LittleEndian>(self.legacy_number_of_point_records)?;
        for n in &self.legacy_number_of_points_by_return {
            write.write_u32::<LittleEndian>(*n)?;
        }
        write_vector(&mut write, self.scale)?;
        write_vector(&mut write, self.offset)?;
        write.write_f64::<LittleEndian>(self.max.x)?;
        write.write_f64::<LittleEndian>(self.min.x)?;
        write.write_f64::<LittleEndian>(self.max.y)?;
        write.write_f64::<LittleEndian>(self.min.y)?;
        write.write_f64::<LittleEndian>(self.max.z)?;
        write.write_f64::<LittleEndian>(self.min.z)?;
        if self.version.supports::<Waveforms>() {
            write.write_u64::<LittleEndian>(self.start_of_waveform_data_packet_record.unwrap_or(0))?;
        }
        if self.version.supports::<Evlrs>() {
            let evlr = self.evlr.unwrap_or_default();
            write.write_u64::<LittleEndian>(evlr.start_of_first_evlr)?;
            write.write_u32::<LittleEndian>(evlr.number_of_evlrs)?;
        }
        if self.version.supports::<LargeFiles>() {
            let large_file = self.large_file.unwrap_or_default();
            write.write_u64::<LittleEndian>(large_file.number_of_point_records)?;
            for n in &large_file.number_of_points_by_return {
                write.write_u64::<LittleEndian>(*n)?;
            }
        }
        if !self.padding.is_empty() {
            write.write_all(&self.padding)?;
        }
        Ok(())
    }

    /// Returns true if this raw header is for laszip compressed data.
    ///
    /// The high bit of the point format code marks compression; this isn't
    /// part of the las spec, but laszip writes it.
    ///
    /// ```
    /// use las_dataset::raw::Header;
    /// let mut header = Header::default();
    /// assert!(!header.is_compressed());
    /// header.point_data_record_format = 131;
    /// assert!(header.is_compressed());
    /// ```
    pub fn is_compressed(&self) -> bool {
        self.point_data_record_format & IS_COMPRESSED_MASK == IS_COMPRESSED_MASK
    }
}

impl Default for Header {
    fn default() -> Header {
        let version = Version::default();
        Header {
            file_source_id: 0,
            global_encoding: 0,
            guid: [0; 16],
            version,
            system_identifier: [0; 32],
            generating_software: [0; 32],
            file_creation_day_of_year: 0,
            file_creation_year: 0,
            header_size: version.header_size(),
            offset_to_point_data: u32::from(version.header_size()),
            number_of_variable_length_records: 0,
            point_data_record_format: 0,
            point_data_record_length: 20,
            legacy_number_of_point_records: 0,
            legacy_number_of_points_by_return: [0; 5],
            scale: Vector::splat(1.),
            offset: Vector::splat(0.),
            max: Vector::splat(0.),
            min: Vector::splat(0.),
            start_of_waveform_data_packet_record: None,
            evlr: None,
            large_file: None,
            padding: Vec::new(),
        }
    }
}

impl Evlr {
    fn read_from<R: Read>(read: &mut R) -> Result<Evlr> {
        Ok(Evlr {
            start_of_first_evlr: read.read_u64::<LittleEndian>()?,
            number_of_evlrs: read.read_u32::<LittleEndian>()?,
        })
    }

    fn into_option(self) -> Option<Evlr> {
        if self.start_of_first_evlr == 0 && self.number_of_evlrs == 0 {
            None
        } else {
            Some(self)
        }
    }
}

impl LargeFile {
    fn read_from<R: Read>(read: &mut R) -> Result<LargeFile> {
        let number_of_point_records = read.read_u64::<LittleEndian>()?;
        let mut number_of_points_by_return = [0; 15];
        for n in &mut number_of_points_by_return {
            *n = read.read_u64::<LittleEndian>()?;
        }
        Ok(LargeFile {
            number_of_point_records,
            number_of_points_by_return,
        })
    }
}

impl Default for LargeFile {
    fn default() -> LargeFile {
        LargeFile {
            number_of_point_records: 0,
            number_of_points_by_return: [0; 15],
        }
    }
}

fn read_vector<R: Read>(read: &mut R) -> Result<Vector<f64>> {
    Ok(Vector {
        x: read.read_f64::<LittleEndian>()?,
        y: read.read_f64::<LittleEndian>()?,
        z: read.read_f64::<LittleEndian>()?,
    })
}

fn write_vector<W: Write>(write: &mut W, vector: Vector<f64>) -> Result<()> {
    write.write_f64::<LittleEndian>(vector.x)?;
    write.write_f64::<LittleEndian>(vector.y)?;
    write.write_f64::<LittleEndian>(vector.z)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    macro_rules! roundtrip {
        ($name:ident, $minor:expr) => {
            mod $name {
                use super::*;

                #[test]
                fn roundtrip() {
                    let version = Version::new(1, $minor);
                    let mut header = Header {
                        version,
                        header_size: version.header_size(),
                        offset_to_point_data: u32::from(version.header_size()),
                        ..Default::default()
                    };
                    if version.minor == 4 {
                        header.large_file = Some(LargeFile::default());
                    }
                    let mut cursor = Cursor::new(Vec::new());
                    header.write_to(&mut cursor).unwrap();
                    assert_eq!(
                        usize::from(version.header_size()),
                        cursor.get_ref().len()
                    );
                    cursor.set_position(0);
                    assert_eq!(header, Header::read_from(cursor).unwrap());
                }
            }
        };
    }

    roundtrip!(las_1_1, 1);
    roundtrip!(las_1_2, 2);
    roundtrip!(las_1_3, 3);
    roundtrip!(las_1_4, 4);

    #[test]
    fn bad_signature() {
        let mut bytes = Vec::new();
        Header::default().write_to(&mut bytes).unwrap();
        bytes[3] = b'Z';
        assert!(matches!(
            Header::read_from(Cursor::new(bytes)).unwrap_err(),
            Error::InvalidFormat(_)
        ));
    }

    #[test]
    fn unsupported_version() {
        let mut bytes = Vec::new();
        Header::default().write_to(&mut bytes).unwrap();
        bytes[25] = 0;
        assert!(matches!(
            Header::read_from(Cursor::new(bytes)).unwrap_err(),
            Error::UnsupportedVersion(_)
        ));
    }

    #[test]
    fn offset_before_header_end() {
        let mut bytes = Vec::new();
        Header::default().write_to(&mut bytes).unwrap();
        bytes[96] = 10;
        bytes[97] = 0;
        bytes[98] = 0;
        bytes[99] = 0;
        assert!(matches!(
            Header::read_from(Cursor::new(bytes)).unwrap_err(),
            Error::InconsistentHeader(_)
        ));
    }
}
