use crate::{color, point::Format, Result, Transform, Vector};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{ErrorKind, Read, Write};

/// The scan angle resolution of the extended point formats, in degrees.
const SCAN_ANGLE_LSB: f32 = 0.006;

/// A raw point, as stored on disk.
///
/// Positions are scaled i32s, intensities and color channels raw u16s.
/// Trailing bytes past the end of the format — documented extra bytes and
/// undocumented padding alike — are carried opaquely in `extra_bytes`.
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    #[allow(missing_docs)]
    pub x: i32,
    #[allow(missing_docs)]
    pub y: i32,
    #[allow(missing_docs)]
    pub z: i32,
    /// The pulse return magnitude.
    pub intensity: u16,
    /// The packed flag bytes, one layout per format family.
    pub flags: Flags,
    /// The scan angle, stored as a rank or a scaled i16 depending on the
    /// format family.
    pub scan_angle: ScanAngle,
    /// Used at the user's discretion.
    pub user_data: u8,
    /// The file from which this point originated.
    pub point_source_id: u16,
    /// The time at which the point was acquired.
    pub gps_time: Option<f64>,
    /// Red, green, and blue channels.
    pub color: Option<[u16; 3]>,
    /// The near infrared channel.
    pub nir: Option<u16>,
    /// Waveform packet information.
    pub waveform: Option<Waveform>,
    /// Bytes past the end of the point format.
    pub extra_bytes: Vec<u8>,
}

impl Point {
    /// Reads a raw point.
    ///
    /// If there are exactly zero bytes left in the `Read`, returns
    /// `Ok(None)`. `extra_len` is the number of bytes past the format's end
    /// in each record.
    ///
    /// ```
    /// use std::io::Cursor;
    /// use las_dataset::point::Format;
    /// use las_dataset::raw::Point;
    ///
    /// let mut cursor = Cursor::new(vec![0; 20]);
    /// let point = Point::read_from(&mut cursor, Format::new(0).unwrap(), 0)
    ///     .unwrap()
    ///     .unwrap();
    /// assert!(Point::read_from(&mut cursor, Format::new(0).unwrap(), 0)
    ///     .unwrap()
    ///     .is_none());
    /// ```
    pub fn read_from<R: Read>(mut read: R, format: Format, extra_len: usize) -> Result<Option<Point>> {
        let first = match read.read_u8() {
            Ok(byte) => byte,
            Err(err) => match err.kind() {
                ErrorKind::UnexpectedEof => return Ok(None),
                _ => return Err(err.into()),
            },
        };
        let mut rest = [0; 3];
        read.read_exact(&mut rest)?;
        let x = i32::from_le_bytes([first, rest[0], rest[1], rest[2]]);
        let y = read.read_i32::<LittleEndian>()?;
        let z = read.read_i32::<LittleEndian>()?;
        let intensity = read.read_u16::<LittleEndian>()?;
        let (flags, scan_angle, user_data, point_source_id) = if format.is_extended {
            let returns = read.read_u8()?;
            let flags = read.read_u8()?;
            let classification = read.read_u8()?;
            let user_data = read.read_u8()?;
            let scan_angle = read.read_i16::<LittleEndian>()?;
            let point_source_id = read.read_u16::<LittleEndian>()?;
            (
                Flags::ThreeByte(returns, flags, classification),
                ScanAngle::Scaled(scan_angle),
                user_data,
                point_source_id,
            )
        } else {
            let flags = read.read_u8()?;
            let classification = read.read_u8()?;
            let scan_angle = read.read_i8()?;
            let user_data = read.read_u8()?;
            let point_source_id = read.read_u16::<LittleEndian>()?;
            (
                Flags::TwoByte(flags, classification),
                ScanAngle::Rank(scan_angle),
                user_data,
                point_source_id,
            )
        };
        let gps_time = if format.has_gps_time {
            Some(read.read_f64::<LittleEndian>()?)
        } else {
            None
        };
        let color = if format.has_color {
            let red = read.read_u16::<LittleEndian>()?;
            let green = read.read_u16::<LittleEndian>()?;
            let blue = read.read_u16::<LittleEndian>()?;
            Some([red, green, blue])
        } else {
            None
        };
        let nir = if format.has_nir {
            Some(read.read_u16::<LittleEndian>()?)
        } else {
            None
        };
        let waveform = if format.has_waveform {
            Some(Waveform::read_from(&mut read)?)
        } else {
            None
        };
        let mut extra_bytes = vec![0; extra_len];
        read.read_exact(&mut extra_bytes)?;
        Ok(Some(Point {
            x,
            y,
            z,
            intensity,
            flags,
            scan_angle,
            user_data,
            point_source_id,
            gps_time,
            color,
            nir,
            waveform,
            extra_bytes,
        }))
    }

    /// Writes a raw point.
    ///
    /// Attributes the format requires but the point lacks are written as
    /// zeros.
    pub fn write_to<W: Write>(&self, mut write: W, format: Format) -> Result<()> {
        write.write_i32::<LittleEndian>(self.x)?;
        write.write_i32::<LittleEndian>(self.y)?;
        write.write_i32::<LittleEndian>(self.z)?;
        write.write_u16::<LittleEndian>(self.intensity)?;
        if format.is_extended {
            let (returns, flags, classification) = match self.flags {
                Flags::ThreeByte(returns, flags, classification) => (returns, flags, classification),
                Flags::TwoByte(..) => self.flags.to_three_byte(),
            };
            write.write_u8(returns)?;
            write.write_u8(flags)?;
            write.write_u8(classification)?;
            write.write_u8(self.user_data)?;
            write.write_i16::<LittleEndian>(match self.scan_angle {
                ScanAngle::Scaled(n) => n,
                ScanAngle::Rank(n) => ScanAngle::from_degrees(f32::from(n), true).raw_i16(),
            })?;
            write.write_u16::<LittleEndian>(self.point_source_id)?;
        } else {
            let (flags, classification) = match self.flags {
                Flags::TwoByte(flags, classification) => (flags, classification),
                Flags::ThreeByte(..) => self.flags.to_two_byte(),
            };
            write.write_u8(flags)?;
            write.write_u8(classification)?;
            write.write_i8(match self.scan_angle {
                ScanAngle::Rank(n) => n,
                ScanAngle::Scaled(_) => ScanAngle::from_degrees(self.scan_angle.degrees(), false).raw_i8(),
            })?;
            write.write_u8(self.user_data)?;
            write.write_u16::<LittleEndian>(self.point_source_id)?;
        }
        if format.has_gps_time {
            write.write_f64::<LittleEndian>(self.gps_time.unwrap_or(0.))?;
        }
        if format.has_color {
            let [red, green, blue] = self.color.unwrap_or([0, 0, 0]);
            write.write_u16::<LittleEndian>(red)?;
            write.write_u16::<LittleEndian>(green)?;
            write.write_u16::<LittleEndian>(blue)?;
        }
        if format.has_nir {
            write.write_u16::<LittleEndian>(self.nir.unwrap_or(0))?;
        }
        if format.has_waveform {
            self.waveform.unwrap_or_default().write_to(&mut write)?;
        }
        write.write_all(&self.extra_bytes)?;
        Ok(())
    }

    /// Builds a raw point from a logical row.
    ///
    /// Positions saturate to the i32 range, normalised intensities and
    /// colors are denormalised to u16s, return counts clamp to the format's
    /// field width, and waveform sub-fields default to zero when absent.
    pub fn from_point(point: &crate::Point, format: Format, transforms: Vector<Transform>) -> Point {
        Point {
            x: transforms.x.inverse_clamped(point.x),
            y: transforms.y.inverse_clamped(point.y),
            z: transforms.z.inverse_clamped(point.z),
            intensity: color::denormalize(point.intensity),
            flags: Flags::from_point(point, format),
            scan_angle: ScanAngle::from_degrees(point.scan_angle, format.is_extended),
            user_data: point.user_data,
            point_source_id: point.point_source_id,
            gps_time: format.has_gps_time.then(|| point.gps_time.unwrap_or(0.)),
            color: format.has_color.then(|| {
                let (red, green, blue) = point.color.unwrap_or_default().to_raw();
                [red, green, blue]
            }),
            nir: format
                .has_nir
                .then(|| color::denormalize(point.nir.unwrap_or(0.))),
            waveform: format
                .has_waveform
                .then(|| point.waveform.unwrap_or_default()),
            extra_bytes: Vec::new(),
        }
    }
}

impl Default for Point {
    fn default() -> Point {
        Point {
            x: 0,
            y: 0,
            z: 0,
            intensity: 0,
            flags: Flags::TwoByte(0, 0),
            scan_angle: ScanAngle::Rank(0),
            user_data: 0,
            point_source_id: 0,
            gps_time: None,
            color: None,
            nir: None,
            waveform: None,
            extra_bytes: Vec::new(),
        }
    }
}

/// The packed flag bytes of a point record.
///
/// Formats 0 through 5 pack returns and classification into two bytes;
/// formats 6 through 10 use three.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flags {
    /// The flag byte and the raw classification byte of formats 0-5.
    ///
    /// Byte one, LSB first: three bits of return number, three bits of
    /// number of returns, scan direction, edge of flight line. Byte two:
    /// five bits of classification, synthetic, key point, withheld.
    TwoByte(u8, u8),
    /// The two flag bytes and the classification byte of formats 6-10.
    ///
    /// Byte one: four bits of return number, four bits of number of returns.
    /// Byte two, LSB first: synthetic, key point, withheld, overlap, two
    /// bits of scanner channel, scan direction, edge of flight line. Byte
    /// three: the full classification.
    ThreeByte(u8, u8, u8),
}

impl Flags {
    /// Packs a logical point's attributes for the given format family.
    pub fn from_point(point: &crate::Point, format: Format) -> Flags {
        if format.is_extended {
            Flags::ThreeByte(
                (point.return_number.min(15)) | (point.number_of_returns.min(15) << 4),
                u8::from(point.is_synthetic)
                    | u8::from(point.is_key_point) << 1
                    | u8::from(point.is_withheld) << 2
                    | u8::from(point.is_overlap) << 3
                    | (point.scanner_channel.min(3)) << 4
                    | u8::from(bool::from(point.scan_direction)) << 6
                    | u8::from(point.is_edge_of_flight_line) << 7,
                point.classification,
            )
        } else {
            Flags::TwoByte(
                (point.return_number.min(5))
                    | (point.number_of_returns.min(5) << 3)
                    | u8::from(bool::from(point.scan_direction)) << 6
                    | u8::from(point.is_edge_of_flight_line) << 7,
                (point.classification & 0x1F)
                    | u8::from(point.is_synthetic) << 5
                    | u8::from(point.is_key_point) << 6
                    | u8::from(point.is_withheld) << 7,
            )
        }
    }

    /// The return number.
    pub fn return_number(&self) -> u8 {
        match *self {
            Flags::TwoByte(flags, _) => flags & 7,
            Flags::ThreeByte(returns, ..) => returns & 0xF,
        }
    }

    /// The number of returns.
    pub fn number_of_returns(&self) -> u8 {
        match *self {
            Flags::TwoByte(flags, _) => (flags >> 3) & 7,
            Flags::ThreeByte(returns, ..) => returns >> 4,
        }
    }

    /// The scan direction.
    pub fn scan_direction(&self) -> crate::point::ScanDirection {
        let is_positive = match *self {
            Flags::TwoByte(flags, _) => flags & 0x40 != 0,
            Flags::ThreeByte(_, flags, _) => flags & 0x40 != 0,
        };
        is_positive.into()
    }

    /// Is this point at the edge of a flight line?
    pub fn is_edge_of_flight_line(&self) -> bool {
        match *self {
            Flags::TwoByte(flags, _) => flags & 0x80 != 0,
            Flags::ThreeByte(_, flags, _) => flags & 0x80 != 0,
        }
    }

    /// The classification number.
    pub fn classification(&self) -> u8 {
        match *self {
            Flags::TwoByte(_, classification) => classification & 0x1F,
            Flags::ThreeByte(.., classification) => classification,
        }
    }

    /// Is this point synthetic?
    pub fn is_synthetic(&self) -> bool {
        match *self {
            Flags::TwoByte(_, classification) => classification & 0x20 != 0,
            Flags::ThreeByte(_, flags, _) => flags & 1 != 0,
        }
    }

    /// Is this point a model key-point?
    pub fn is_key_point(&self) -> bool {
        match *self {
            Flags::TwoByte(_, classification) => classification & 0x40 != 0,
            Flags::ThreeByte(_, flags, _) => flags & 2 != 0,
        }
    }

    /// Is this point withheld?
    pub fn is_withheld(&self) -> bool {
        match *self {
            Flags::TwoByte(_, classification) => classification & 0x80 != 0,
            Flags::ThreeByte(_, flags, _) => flags & 4 != 0,
        }
    }

    /// Is this an overlap point?
    ///
    /// Only representable in the three-byte layout.
    pub fn is_overlap(&self) -> bool {
        match *self {
            Flags::TwoByte(..) => false,
            Flags::ThreeByte(_, flags, _) => flags & 8 != 0,
        }
    }

    /// The scanner channel.
    pub fn scanner_channel(&self) -> u8 {
        match *self {
            Flags::TwoByte(..) => 0,
            Flags::ThreeByte(_, flags, _) => (flags >> 4) & 3,
        }
    }

    /// Repacks into the three-byte layout.
    pub fn to_three_byte(&self) -> (u8, u8, u8) {
        (
            self.return_number() | self.number_of_returns() << 4,
            u8::from(self.is_synthetic())
                | u8::from(self.is_key_point()) << 1
                | u8::from(self.is_withheld()) << 2
                | u8::from(self.is_overlap()) << 3
                | self.scanner_channel() << 4
                | u8::from(bool::from(self.scan_direction())) << 6
                | u8::from(self.is_edge_of_flight_line()) << 7,
            self.classification(),
        )
    }

    /// Repacks into the two-byte layout, clamping what doesn't fit.
    pub fn to_two_byte(&self) -> (u8, u8) {
        (
            self.return_number().min(5)
                | self.number_of_returns().min(5) << 3
                | u8::from(bool::from(self.scan_direction())) << 6
                | u8::from(self.is_edge_of_flight_line()) << 7,
            (self.classification() & 0x1F)
                | u8::from(self.is_synthetic()) << 5
                | u8::from(self.is_key_point()) << 6
                | u8::from(self.is_withheld()) << 7,
        )
    }
}

/// The stored scan angle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanAngle {
    /// Formats 0-5 store whole degrees in an i8, clamped to ±90.
    Rank(i8),
    /// Formats 6-10 store an i16 in 0.006° increments, clamped to ±30000.
    Scaled(i16),
}

impl ScanAngle {
    /// This scan angle in degrees.
    ///
    /// ```
    /// use las_dataset::raw::ScanAngle;
    /// assert_eq!(-90., ScanAngle::Rank(-90).degrees());
    /// assert_eq!(3., ScanAngle::Scaled(500).degrees());
    /// ```
    pub fn degrees(&self) -> f32 {
        match *self {
            ScanAngle::Rank(n) => f32::from(n),
            ScanAngle::Scaled(n) => f32::from(n) * SCAN_ANGLE_LSB,
        }
    }

    /// Stores degrees in the representation of the format family.
    pub fn from_degrees(degrees: f32, extended: bool) -> ScanAngle {
        if extended {
            ScanAngle::Scaled((degrees / SCAN_ANGLE_LSB).round().clamp(-30_000., 30_000.) as i16)
        } else {
            ScanAngle::Rank(degrees.round().clamp(-90., 90.) as i8)
        }
    }

    fn raw_i8(&self) -> i8 {
        match *self {
            ScanAngle::Rank(n) => n,
            ScanAngle::Scaled(_) => 0,
        }
    }

    fn raw_i16(&self) -> i16 {
        match *self {
            ScanAngle::Rank(_) => 0,
            ScanAngle::Scaled(n) => n,
        }
    }
}

impl Default for ScanAngle {
    fn default() -> ScanAngle {
        ScanAngle::Rank(0)
    }
}

/// Waveform packet information for one point.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Waveform {
    /// The index into the waveform packet descriptor vlrs.
    pub wave_packet_descriptor_index: u8,
    /// The offset of this point's waveform data.
    pub wave_data_offset: u64,
    /// The size of this point's waveform packet.
    pub wave_packet_size: u32,
    /// The location of the return within the waveform packet.
    pub wave_return_point: f32,
    #[allow(missing_docs)]
    pub x_t: f32,
    #[allow(missing_docs)]
    pub y_t: f32,
    #[allow(missing_docs)]
    pub z_t: f32,
}

impl Waveform {
    pub(crate) fn read_from<R: Read>(read: &mut R) -> Result<Waveform> {
        Ok(Waveform {
            wave_packet_descriptor_index: read.read_u8()?,
            wave_data_offset: read.read_u64::<LittleEndian>()?,
            wave_packet_size: read.read_u32::<LittleEndian>()?,
            wave_return_point: read.read_f32::<LittleEndian>()?,
            x_t: read.read_f32::<LittleEndian>()?,
            y_t: read.read_f32::<LittleEndian>()?,
            z_t: read.read_f32::<LittleEndian>()?,
        })
    }

    pub(crate) fn write_to<W: Write>(&self, write: &mut W) -> Result<()> {
        write.write_u8(self.wave_packet_descriptor_index)?;
        write.write_u64::<LittleEndian>(self.wave_data_offset)?;
        write.write_u32::<LittleEndian>(self.wave_packet_size)?;
        write.write_f32::<LittleEndian>(self.wave_return_point)?;
        write.write_f32::<LittleEndian>(self.x_t)?;
        write.write_f32::<LittleEndian>(self.y_t)?;
        write.write_f32::<LittleEndian>(self.z_t)?;
        Ok(())
    }
}
