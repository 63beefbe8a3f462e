use crate::{
    feature::{Evlrs, GpsStandardTime, SyntheticReturnNumbers, Waveforms, WktCrs},
    point::Format,
    raw, utils, Bounds, Error, GpsTimeType, Result, Transform, Vector, Version,
};
use chrono::{Datelike, NaiveDate, Utc};
use log::warn;
use uuid::Uuid;

const GPS_TIME_TYPE_BIT: u16 = 1;
const WAVEFORM_INTERNAL_BIT: u16 = 2;
const WAVEFORM_EXTERNAL_BIT: u16 = 4;
const SYNTHETIC_RETURNS_BIT: u16 = 8;
const WKT_CRS_BIT: u16 = 16;

const IDENTIFIER_SIZE: usize = 32;

/// The metadata block describing a file's layout and interpretation.
///
/// The header owns every counter and offset that ties the file together, so
/// its setters enforce the cross-field contracts: versions never downgrade
/// below what the point format needs, record lengths never shrink below the
/// format's size, and the legacy 32-bit counters stay in sync with the
/// 64-bit ones.
///
/// ```
/// use las_dataset::point::Format;
/// use las_dataset::{Header, Version};
///
/// let mut header = Header::default();
/// assert_eq!(Version::new(1, 2), header.version());
///
/// // setting an extended format upgrades the version
/// header.set_point_format(Format::new(6).unwrap()).unwrap();
/// assert_eq!(Version::new(1, 4), header.version());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Header {
    file_source_id: u16,
    global_encoding: u16,
    guid: Uuid,
    version: Version,
    system_identifier: String,
    generating_software: String,
    date: Option<NaiveDate>,
    padding: Vec<u8>,
    offset_to_point_data: u32,
    number_of_vlrs: u32,
    point_format: Format,
    point_data_record_length: u16,
    number_of_points: u64,
    number_of_points_by_return: [u64; 15],
    transforms: Vector<Transform>,
    bounds: Bounds,
    start_of_waveform_data_packet_record: Option<u64>,
    start_of_first_evlr: Option<u64>,
    number_of_evlrs: u32,
}

impl Header {
    /// Creates a default header for the given version.
    pub fn new(version: Version) -> Result<Header> {
        version.verify()?;
        let mut header = Header::default();
        header.set_version(version)?;
        Ok(header)
    }

    /// The size of the header block, padding included.
    pub fn size(&self) -> u16 {
        self.version.header_size() + self.padding.len() as u16
    }

    /// A project-wide unique ID for the file.
    pub fn file_source_id(&self) -> u16 {
        self.file_source_id
    }

    /// Sets the file source id.
    pub fn set_file_source_id(&mut self, file_source_id: u16) {
        self.file_source_id = file_source_id;
    }

    /// The raw global encoding bit field.
    pub fn global_encoding(&self) -> u16 {
        self.global_encoding
    }

    /// The meaning of GPS time in the point records (bit 0).
    pub fn gps_time_type(&self) -> GpsTimeType {
        (self.global_encoding & GPS_TIME_TYPE_BIT != 0).into()
    }

    /// Sets the GPS time type.
    ///
    /// Standard GPS time requires las 1.2 or later.
    pub fn set_gps_time_type(&mut self, gps_time_type: GpsTimeType) -> Result<()> {
        if gps_time_type.is_standard() {
            self.version.verify_support_for::<GpsStandardTime>()?;
        }
        self.set_bit(GPS_TIME_TYPE_BIT, gps_time_type.is_standard());
        Ok(())
    }

    /// Are the waveform data packets stored inside this file (bit 1)?
    pub fn has_internal_waveforms(&self) -> bool {
        self.global_encoding & WAVEFORM_INTERNAL_BIT != 0
    }

    /// Are the waveform data packets stored in an auxiliary file (bit 2)?
    pub fn has_external_waveforms(&self) -> bool {
        self.global_encoding & WAVEFORM_EXTERNAL_BIT != 0
    }

    /// Declares the waveform packets internal, clearing the external bit.
    ///
    /// The two location bits are mutually exclusive.
    pub fn set_internal_waveforms(&mut self, enabled: bool) -> Result<()> {
        if enabled {
            self.version.verify_support_for::<Waveforms>()?;
            self.set_bit(WAVEFORM_EXTERNAL_BIT, false);
        }
        self.set_bit(WAVEFORM_INTERNAL_BIT, enabled);
        Ok(())
    }

    /// Declares the waveform packets external, clearing the internal bit.
    pub fn set_external_waveforms(&mut self, enabled: bool) -> Result<()> {
        if enabled {
            self.version.verify_support_for::<Waveforms>()?;
            self.set_bit(WAVEFORM_INTERNAL_BIT, false);
        }
        self.set_bit(WAVEFORM_EXTERNAL_BIT, enabled);
        Ok(())
    }

    /// Were the return numbers synthetically generated (bit 3)?
    pub fn has_synthetic_returns(&self) -> bool {
        self.global_encoding & SYNTHETIC_RETURNS_BIT != 0
    }

    /// Sets the synthetic-returns flag.
    pub fn set_synthetic_returns(&mut self, enabled: bool) -> Result<()> {
        if enabled {
            self.version.verify_support_for::<SyntheticReturnNumbers>()?;
        }
        self.set_bit(SYNTHETIC_RETURNS_BIT, enabled);
        Ok(())
    }

    /// Is the coordinate reference system WKT (bit 4)?
    ///
    /// The extended point formats require this bit, so querying a header
    /// whose format and bit disagree is an error:
    ///
    /// ```
    /// use las_dataset::Header;
    /// let header = Header::default();
    /// assert_eq!(false, header.has_wkt_crs().unwrap());
    /// ```
    pub fn has_wkt_crs(&self) -> Result<bool> {
        let enabled = self.global_encoding & WKT_CRS_BIT != 0;
        if self.point_format.is_extended && !enabled {
            Err(Error::InconsistentHeader(format!(
                "{} requires the wkt bit, but it is not set",
                self.point_format
            )))
        } else {
            Ok(enabled)
        }
    }

    /// Sets the WKT CRS flag.
    pub fn set_wkt_crs(&mut self, enabled: bool) -> Result<()> {
        if enabled {
            self.version.verify_support_for::<WktCrs>()?;
        }
        self.set_bit(WKT_CRS_BIT, enabled);
        Ok(())
    }

    /// The project GUID.
    pub fn guid(&self) -> Uuid {
        self.guid
    }

    /// Sets the project GUID.
    pub fn set_guid(&mut self, guid: Uuid) {
        self.guid = guid;
    }

    /// The las version of this file.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Sets the las version.
    ///
    /// The current point format must be representable in the new version,
    /// the point count must fit its counter fields, and any evlrs must stay
    /// supported; the data offset moves by the difference in header size.
    ///
    /// ```
    /// use las_dataset::{Header, Version};
    /// let mut header = Header::default();
    /// header.set_version(Version::new(1, 4)).unwrap();
    /// assert!(header.set_version(Version::new(2, 0)).is_err());
    /// ```
    pub fn set_version(&mut self, version: Version) -> Result<()> {
        version.verify()?;
        let required = self.point_format.min_version();
        if version < required {
            return Err(Error::IncompatiblePointFormat {
                format: self.point_format.to_u8()?,
                required,
                actual: version,
            });
        }
        if !version.supports::<Evlrs>() {
            if self.number_of_evlrs > 0 {
                return Err(Error::UnsupportedFeature {
                    version,
                    feature: "Evlrs",
                });
            }
            if self.number_of_points > u64::from(u32::MAX) {
                return Err(Error::CountTooLarge(self.number_of_points));
            }
        }
        let delta = i64::from(version.header_size()) - i64::from(self.version.header_size());
        self.offset_to_point_data = (i64::from(self.offset_to_point_data) + delta) as u32;
        self.version = version;
        Ok(())
    }

    /// The system that produced this file.
    pub fn system_identifier(&self) -> &str {
        &self.system_identifier
    }

    /// Sets the system identifier (at most 32 bytes).
    pub fn set_system_identifier(&mut self, system_identifier: &str) -> Result<()> {
        if system_identifier.len() > IDENTIFIER_SIZE {
            return Err(Error::StringTooLong {
                string: system_identifier.to_string(),
                len: IDENTIFIER_SIZE,
            });
        }
        self.system_identifier = system_identifier.to_string();
        Ok(())
    }

    /// The software that produced this file.
    pub fn generating_software(&self) -> &str {
        &self.generating_software
    }

    /// Sets the generating software (at most 32 bytes).
    pub fn set_generating_software(&mut self, generating_software: &str) -> Result<()> {
        if generating_software.len() > IDENTIFIER_SIZE {
            return Err(Error::StringTooLong {
                string: generating_software.to_string(),
                len: IDENTIFIER_SIZE,
            });
        }
        self.generating_software = generating_software.to_string();
        Ok(())
    }

    /// The date these data were collected.
    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    /// Sets the creation date.
    pub fn set_date(&mut self, date: Option<NaiveDate>) {
        self.date = date;
    }

    /// The number of bytes from the start of the file to the first point
    /// record.
    pub fn offset_to_point_data(&self) -> u32 {
        self.offset_to_point_data
    }

    pub(crate) fn set_offset_to_point_data(&mut self, offset: u32) {
        self.offset_to_point_data = offset;
    }

    /// The number of variable length records.
    pub fn number_of_vlrs(&self) -> u32 {
        self.number_of_vlrs
    }

    pub(crate) fn set_number_of_vlrs(&mut self, number_of_vlrs: u32) {
        self.number_of_vlrs = number_of_vlrs;
    }

    /// The point format of these points.
    pub fn point_format(&self) -> Format {
        self.point_format
    }

    /// Sets the point format.
    ///
    /// If the current version is too old for the format, the version is
    /// upgraded (never downgraded) with a warning. The record length moves
    /// by the difference in format size, preserving any extra bytes, and
    /// extended formats force the WKT CRS bit on.
    pub fn set_point_format(&mut self, point_format: Format) -> Result<()> {
        let _ = point_format.to_u8()?;
        let required = point_format.min_version();
        if self.version < required {
            warn!(
                "upgrading las {} to {} to carry {}",
                self.version, required, point_format
            );
            self.set_version(required)?;
        }
        let extra_bytes = self.point_data_record_length - self.point_format.len();
        self.point_format = point_format;
        self.point_data_record_length = point_format.len() + extra_bytes;
        if point_format.is_extended {
            self.set_bit(WKT_CRS_BIT, true);
        }
        Ok(())
    }

    /// The size of one point record, extra bytes included.
    pub fn point_data_record_length(&self) -> u16 {
        self.point_data_record_length
    }

    /// Sets the point record length.
    ///
    /// The length must hold at least the point format itself.
    pub fn set_point_data_record_length(&mut self, len: u16) -> Result<()> {
        if len < self.point_format.len() {
            return Err(Error::InconsistentRecordLength {
                len,
                required: self.point_format.len(),
            });
        }
        self.point_data_record_length = len;
        Ok(())
    }

    /// The number of bytes in each record past the point format's end.
    pub fn extra_bytes_len(&self) -> u16 {
        self.point_data_record_length - self.point_format.len()
    }

    /// The number of points.
    pub fn number_of_points(&self) -> u64 {
        self.number_of_points
    }

    /// Sets the point count.
    ///
    /// Counts past `u32::MAX` need both las 1.4 and an extended point
    /// format, because older versions and formats keep the legacy 32-bit
    /// counter authoritative.
    pub fn set_number_of_points(&mut self, number_of_points: u64) -> Result<()> {
        if number_of_points > u64::from(u32::MAX)
            && (!self.version.supports::<Evlrs>() || !self.point_format.is_extended)
        {
            return Err(Error::CountTooLarge(number_of_points));
        }
        self.number_of_points = number_of_points;
        Ok(())
    }

    /// The number of points of each return number, returns one through
    /// fifteen.
    pub fn number_of_points_by_return(&self) -> [u64; 15] {
        self.number_of_points_by_return
    }

    pub(crate) fn set_number_of_points_by_return(&mut self, counts: [u64; 15]) {
        self.number_of_points_by_return = counts;
    }

    /// The per-axis scales and offsets that map raw coordinates to reals.
    pub fn transforms(&self) -> Vector<Transform> {
        self.transforms
    }

    /// Sets the coordinate transforms.
    pub fn set_transforms(&mut self, transforms: Vector<Transform>) {
        self.transforms = transforms;
    }

    /// The bounds of these data, in real coordinates.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub(crate) fn set_bounds(&mut self, bounds: Bounds) {
        self.bounds = bounds;
    }

    /// The offset to the first waveform data packet record.
    pub fn start_of_waveform_data_packet_record(&self) -> Option<u64> {
        self.start_of_waveform_data_packet_record
    }

    /// The offset to the first evlr.
    pub fn start_of_first_evlr(&self) -> Option<u64> {
        self.start_of_first_evlr
    }

    pub(crate) fn set_start_of_first_evlr(&mut self, start: Option<u64>) {
        self.start_of_first_evlr = start;
    }

    /// The number of extended variable length records.
    pub fn number_of_evlrs(&self) -> u32 {
        self.number_of_evlrs
    }

    pub(crate) fn set_number_of_evlrs(&mut self, number_of_evlrs: u32) {
        self.number_of_evlrs = number_of_evlrs;
    }

    fn set_bit(&mut self, mask: u16, enabled: bool) {
        if enabled {
            self.global_encoding |= mask;
        } else {
            self.global_encoding &= !mask;
        }
    }

    /// Builds a header from its wire image.
    ///
    /// The 64-bit counts win when the legacy counters are zero; when both
    /// are populated they must agree.
    pub fn from_raw(raw: raw::Header) -> Result<Header> {
        let point_format = Format::new(raw.point_data_record_format & 0x3F)?;
        if point_format.min_version() > raw.version {
            return Err(Error::IncompatiblePointFormat {
                format: raw.point_data_record_format & 0x3F,
                required: point_format.min_version(),
                actual: raw.version,
            });
        }
        if raw.point_data_record_length < point_format.len() {
            return Err(Error::InconsistentRecordLength {
                len: raw.point_data_record_length,
                required: point_format.len(),
            });
        }
        let legacy = u64::from(raw.legacy_number_of_point_records);
        let number_of_points = match raw.large_file {
            Some(large_file) => {
                if legacy != 0
                    && large_file.number_of_point_records != 0
                    && legacy != large_file.number_of_point_records
                {
                    return Err(Error::InconsistentHeader(format!(
                        "legacy point count ({}) and 64-bit point count ({}) disagree",
                        legacy, large_file.number_of_point_records
                    )));
                }
                if large_file.number_of_point_records != 0 {
                    large_file.number_of_point_records
                } else {
                    legacy
                }
            }
            None => legacy,
        };
        let mut number_of_points_by_return = [0; 15];
        match raw.large_file {
            Some(large_file) if large_file.number_of_points_by_return.iter().any(|&n| n > 0) => {
                number_of_points_by_return = large_file.number_of_points_by_return;
            }
            _ => {
                for (count, legacy) in number_of_points_by_return
                    .iter_mut()
                    .zip(raw.legacy_number_of_points_by_return)
                {
                    *count = u64::from(legacy);
                }
            }
        }
        Ok(Header {
            file_source_id: raw.file_source_id,
            global_encoding: raw.global_encoding,
            guid: Uuid::from_bytes(raw.guid),
            version: raw.version,
            system_identifier: utils::fixed_to_string(&raw.system_identifier)?.to_string(),
            generating_software: utils::fixed_to_string(&raw.generating_software)?.to_string(),
            date: NaiveDate::from_yo_opt(
                i32::from(raw.file_creation_year),
                u32::from(raw.file_creation_day_of_year),
            ),
            padding: raw.padding,
            offset_to_point_data: raw.offset_to_point_data,
            number_of_vlrs: raw.number_of_variable_length_records,
            point_format,
            point_data_record_length: raw.point_data_record_length,
            number_of_points,
            number_of_points_by_return,
            transforms: Vector {
                x: Transform {
                    scale: raw.scale.x,
                    offset: raw.offset.x,
                },
                y: Transform {
                    scale: raw.scale.y,
                    offset: raw.offset.y,
                },
                z: Transform {
                    scale: raw.scale.z,
                    offset: raw.offset.z,
                },
            },
            bounds: Bounds {
                min: raw.min,
                max: raw.max,
            },
            start_of_waveform_data_packet_record: raw.start_of_waveform_data_packet_record,
            start_of_first_evlr: raw.evlr.map(|evlr| evlr.start_of_first_evlr),
            number_of_evlrs: raw.evlr.map(|evlr| evlr.number_of_evlrs).unwrap_or(0),
        })
    }

    /// Converts this header into its wire image.
    ///
    /// The legacy 32-bit counters are populated whenever the count fits and
    /// the format is not extended; las 1.4 additionally gets the 64-bit
    /// block.
    pub fn to_raw(&self) -> Result<raw::Header> {
        let use_legacy = !self.point_format.is_extended
            && self.number_of_points <= u64::from(u32::MAX);
        let legacy_number_of_point_records = if use_legacy {
            self.number_of_points as u32
        } else {
            0
        };
        let mut legacy_number_of_points_by_return = [0; 5];
        if use_legacy {
            for (legacy, count) in legacy_number_of_points_by_return
                .iter_mut()
                .zip(self.number_of_points_by_return)
            {
                *legacy = count.min(u64::from(u32::MAX)) as u32;
            }
        }
        let evlr = if self.number_of_evlrs > 0 {
            Some(raw::Evlr {
                start_of_first_evlr: self.start_of_first_evlr.unwrap_or(0),
                number_of_evlrs: self.number_of_evlrs,
            })
        } else {
            None
        };
        let large_file = if self.version.supports::<Evlrs>() {
            Some(raw::LargeFile {
                number_of_point_records: self.number_of_points,
                number_of_points_by_return: self.number_of_points_by_return,
            })
        } else {
            None
        };
        Ok(raw::Header {
            file_source_id: self.file_source_id,
            global_encoding: self.global_encoding,
            guid: self.guid.into_bytes(),
            version: self.version,
            system_identifier: utils::string_to_fixed(&self.system_identifier)?,
            generating_software: utils::string_to_fixed(&self.generating_software)?,
            file_creation_day_of_year: self.date.map(|date| date.ordinal() as u16).unwrap_or(0),
            file_creation_year: self.date.map(|date| date.year() as u16).unwrap_or(0),
            header_size: self.size(),
            offset_to_point_data: self.offset_to_point_data,
            number_of_variable_length_records: self.number_of_vlrs,
            point_data_record_format: self.point_format.to_u8()?,
            point_data_record_length: self.point_data_record_length,
            legacy_number_of_point_records,
            legacy_number_of_points_by_return,
            scale: Vector {
                x: self.transforms.x.scale,
                y: self.transforms.y.scale,
                z: self.transforms.z.scale,
            },
            offset: Vector {
                x: self.transforms.x.offset,
                y: self.transforms.y.offset,
                z: self.transforms.z.offset,
            },
            max: self.bounds.max,
            min: self.bounds.min,
            start_of_waveform_data_packet_record: self.start_of_waveform_data_packet_record,
            evlr,
            large_file,
            padding: self.padding.clone(),
        })
    }
}

impl Default for Header {
    fn default() -> Header {
        let version = Version::default();
        Header {
            file_source_id: 0,
            global_encoding: 0,
            guid: Uuid::nil(),
            version,
            system_identifier: "las-dataset".to_string(),
            generating_software: format!("las-dataset {}", env!("CARGO_PKG_VERSION")),
            date: Some(Utc::now().date_naive()),
            padding: Vec::new(),
            offset_to_point_data: u32::from(version.header_size()),
            number_of_vlrs: 0,
            point_format: Format::default(),
            point_data_record_length: Format::default().len(),
            number_of_points: 0,
            number_of_points_by_return: [0; 15],
            transforms: Vector::splat(Transform::default()),
            bounds: Bounds::default(),
            start_of_waveform_data_packet_record: None,
            start_of_first_evlr: None,
            number_of_evlrs: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_upgrade_moves_offset() {
        let mut header = Header::default();
        assert_eq!(227, header.offset_to_point_data());
        header.set_version(Version::new(1, 4)).unwrap();
        assert_eq!(375, header.offset_to_point_data());
        header.set_version(Version::new(1, 1)).unwrap();
        assert_eq!(227, header.offset_to_point_data());
    }

    #[test]
    fn version_cannot_drop_below_format() {
        let mut header = Header::default();
        header.set_point_format(Format::new(4).unwrap()).unwrap();
        assert_eq!(Version::new(1, 3), header.version());
        assert!(matches!(
            header.set_version(Version::new(1, 2)).unwrap_err(),
            Error::IncompatiblePointFormat { .. }
        ));
    }

    #[test]
    fn format_upgrade_preserves_extra_bytes() {
        let mut header = Header::default();
        header.set_point_data_record_length(25).unwrap();
        header.set_point_format(Format::new(1).unwrap()).unwrap();
        assert_eq!(33, header.point_data_record_length());
        assert_eq!(5, header.extra_bytes_len());
    }

    #[test]
    fn extended_format_sets_wkt_bit() {
        let mut header = Header::default();
        header.set_point_format(Format::new(6).unwrap()).unwrap();
        assert!(header.has_wkt_crs().unwrap());
    }

    #[test]
    fn wkt_bit_query_is_checked() {
        let mut header = Header::default();
        header.set_point_format(Format::new(6).unwrap()).unwrap();
        header.set_wkt_crs(false).unwrap();
        assert!(matches!(
            header.has_wkt_crs().unwrap_err(),
            Error::InconsistentHeader(_)
        ));
    }

    #[test]
    fn waveform_bits_are_exclusive() {
        let mut header = Header::new(Version::new(1, 3)).unwrap();
        header.set_internal_waveforms(true).unwrap();
        assert!(header.has_internal_waveforms());
        header.set_external_waveforms(true).unwrap();
        assert!(!header.has_internal_waveforms());
        assert!(header.has_external_waveforms());
    }

    #[test]
    fn count_too_large_for_legacy() {
        let mut header = Header::new(Version::new(1, 4)).unwrap();
        let too_many = u64::from(u32::MAX) + 1;
        assert!(matches!(
            header.set_number_of_points(too_many).unwrap_err(),
            Error::CountTooLarge(_)
        ));
        header.set_point_format(Format::new(6).unwrap()).unwrap();
        header.set_number_of_points(too_many).unwrap();
        assert!(header.set_version(Version::new(1, 2)).is_err());
    }

    #[test]
    fn gps_time_type_needs_1_2() {
        let mut header = Header::new(Version::new(1, 1)).unwrap();
        assert!(header.set_gps_time_type(GpsTimeType::Standard).is_err());
        header.set_gps_time_type(GpsTimeType::Week).unwrap();
        let mut header = Header::default();
        header.set_gps_time_type(GpsTimeType::Standard).unwrap();
        assert!(header.gps_time_type().is_standard());
    }

    #[test]
    fn raw_roundtrip_1_4() {
        let mut header = Header::new(Version::new(1, 4)).unwrap();
        header.set_number_of_points(42).unwrap();
        let raw = header.to_raw().unwrap();
        assert_eq!(42, raw.legacy_number_of_point_records);
        assert_eq!(
            42,
            raw.large_file.unwrap().number_of_point_records
        );
        let read_back = Header::from_raw(raw).unwrap();
        assert_eq!(header, read_back);
    }

    #[test]
    fn extended_formats_zero_legacy_counts() {
        let mut header = Header::new(Version::new(1, 4)).unwrap();
        header.set_point_format(Format::new(6).unwrap()).unwrap();
        header.set_number_of_points(42).unwrap();
        let raw = header.to_raw().unwrap();
        assert_eq!(0, raw.legacy_number_of_point_records);
        assert_eq!(
            42,
            raw.large_file.unwrap().number_of_point_records
        );
    }

    #[test]
    fn mismatched_counts_are_inconsistent() {
        let mut header = Header::new(Version::new(1, 4)).unwrap();
        header.set_number_of_points(42).unwrap();
        let mut raw = header.to_raw().unwrap();
        raw.legacy_number_of_point_records = 41;
        assert!(matches!(
            Header::from_raw(raw).unwrap_err(),
            Error::InconsistentHeader(_)
        ));
    }
}
