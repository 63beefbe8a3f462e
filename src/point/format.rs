use crate::{point::Dimension, Error, Result, Version};
use std::fmt;

const TIME_FORMATS: &[u8] = &[1, 3, 4, 5, 6, 7, 8, 9, 10];
const COLOR_FORMATS: &[u8] = &[2, 3, 5, 7, 8, 10];
const WAVEFORM_FORMATS: &[u8] = &[4, 5, 9, 10];
const NIR_FORMATS: &[u8] = &[8, 10];

/// Point formats are defined by the las spec.
///
/// As of las 1.4 there are eleven point formats (0-10). A new [Format] can be
/// created from its code and converted back into it:
///
/// ```
/// use las_dataset::point::Format;
///
/// let format = Format::new(1).unwrap();
/// assert!(format.has_gps_time);
/// assert_eq!(1, format.to_u8().unwrap());
/// assert_eq!(28, format.len());
///
/// assert!(Format::new(11).is_err());
/// ```
///
/// Each format requires a minimum las version:
///
/// ```
/// use las_dataset::point::Format;
/// use las_dataset::Version;
///
/// assert_eq!(Version::new(1, 2), Format::new(2).unwrap().min_version());
/// assert_eq!(Version::new(1, 4), Format::new(6).unwrap().min_version());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Format {
    /// Does this point format include gps time?
    pub has_gps_time: bool,
    /// Does this point format include red, green, and blue colors?
    pub has_color: bool,
    /// Does this point format have near infrared data?
    pub has_nir: bool,
    /// Does this point format have waveforms?
    pub has_waveform: bool,
    /// Does this point format use two flag bytes and scaled scan angles?
    pub is_extended: bool,
}

#[allow(clippy::len_without_is_empty)]
impl Format {
    /// Creates a new point format from a u8.
    ///
    /// ```
    /// use las_dataset::point::Format;
    /// let format = Format::new(3).unwrap();
    /// assert!(format.has_gps_time);
    /// assert!(format.has_color);
    /// ```
    pub fn new(n: u8) -> Result<Format> {
        if n > 10 {
            Err(Error::UnsupportedPointFormat(n))
        } else {
            Ok(Format {
                has_gps_time: TIME_FORMATS.contains(&n),
                has_color: COLOR_FORMATS.contains(&n),
                has_nir: NIR_FORMATS.contains(&n),
                has_waveform: WAVEFORM_FORMATS.contains(&n),
                is_extended: n >= 6,
            })
        }
    }

    /// Converts this point format to a u8.
    ///
    /// Returns an error for combinations of attributes that don't map onto a
    /// format number, e.g. nir without the extended flag.
    ///
    /// ```
    /// use las_dataset::point::Format;
    /// let mut format = Format::default();
    /// assert_eq!(0, format.to_u8().unwrap());
    /// format.has_nir = true;
    /// assert!(format.to_u8().is_err());
    /// ```
    pub fn to_u8(&self) -> Result<u8> {
        for n in 0..=10 {
            if let Ok(format) = Format::new(n) {
                if format == *self {
                    return Ok(n);
                }
            }
        }
        Err(Error::InvalidFormatCombination(*self))
    }

    /// Returns this point format's record length in bytes, without any extra
    /// bytes.
    ///
    /// ```
    /// use las_dataset::point::Format;
    /// assert_eq!(20, Format::new(0).unwrap().len());
    /// assert_eq!(67, Format::new(10).unwrap().len());
    /// ```
    pub fn len(&self) -> u16 {
        let mut len = if self.is_extended { 22 } else { 20 };
        if self.has_gps_time {
            len += 8;
        }
        if self.has_color {
            len += 6;
        }
        if self.has_nir {
            len += 2;
        }
        if self.has_waveform {
            len += 29;
        }
        len
    }

    /// Returns the earliest las version that can carry this point format.
    pub fn min_version(&self) -> Version {
        if self.is_extended {
            Version::new(1, 4)
        } else if self.has_waveform {
            Version::new(1, 3)
        } else if self.has_color {
            Version::new(1, 2)
        } else {
            Version::new(1, 1)
        }
    }

    /// Returns the semantic columns this point format carries, in record
    /// order.
    pub fn dimensions(&self) -> Vec<Dimension> {
        let mut dimensions = vec![
            Dimension::Position,
            Dimension::Intensity,
            Dimension::ReturnNumber,
            Dimension::NumberOfReturns,
            Dimension::ScanDirection,
            Dimension::EdgeOfFlightLine,
            Dimension::Synthetic,
            Dimension::KeyPoint,
            Dimension::Withheld,
        ];
        if self.is_extended {
            dimensions.push(Dimension::Overlap);
            dimensions.push(Dimension::ScannerChannel);
        }
        dimensions.extend([
            Dimension::Classification,
            Dimension::ScanAngle,
            Dimension::UserData,
            Dimension::PointSourceId,
        ]);
        if self.has_gps_time {
            dimensions.push(Dimension::GpsTime);
        }
        if self.has_color {
            dimensions.push(Dimension::Color);
        }
        if self.has_nir {
            dimensions.push(Dimension::Nir);
        }
        if self.has_waveform {
            dimensions.extend([
                Dimension::WavePacketDescriptorIndex,
                Dimension::WaveDataOffset,
                Dimension::WavePacketSize,
                Dimension::WaveReturnPoint,
                Dimension::WaveParameters,
            ]);
        }
        dimensions
    }

    /// Returns true if this point format carries the dimension.
    ///
    /// ```
    /// use las_dataset::point::{Dimension, Format};
    /// let format = Format::new(2).unwrap();
    /// assert!(format.supports(Dimension::Color));
    /// assert!(!format.supports(Dimension::GpsTime));
    /// ```
    pub fn supports(&self, dimension: Dimension) -> bool {
        self.dimensions().contains(&dimension)
    }

    /// Selects the smallest-numbered point format that carries every
    /// requested dimension.
    ///
    /// ```
    /// use las_dataset::point::{Dimension, Format};
    ///
    /// let format = Format::with_dimensions(&[Dimension::Color]).unwrap();
    /// assert_eq!(2, format.to_u8().unwrap());
    ///
    /// let format = Format::with_dimensions(&[Dimension::Color, Dimension::Nir]).unwrap();
    /// assert_eq!(8, format.to_u8().unwrap());
    /// ```
    pub fn with_dimensions(required: &[Dimension]) -> Result<Format> {
        for n in 0..=10 {
            let format = Format::new(n)?;
            let dimensions = format.dimensions();
            if required
                .iter()
                .all(|dimension| dimensions.contains(dimension))
            {
                return Ok(format);
            }
        }
        Err(Error::UnrepresentableColumns(required.to_vec()))
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Ok(n) = self.to_u8() {
            write!(f, "point format {}", n)
        } else {
            write!(f, "point format that does not map onto a code: {:?}", self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! format {
        ($name:ident, $n:expr, $len:expr, $minor:expr) => {
            mod $name {
                use super::super::*;

                #[test]
                fn roundtrip() {
                    assert_eq!($n, Format::new($n).unwrap().to_u8().unwrap());
                }

                #[test]
                fn len() {
                    assert_eq!($len, Format::new($n).unwrap().len());
                }

                #[test]
                fn min_version() {
                    assert_eq!(
                        Version::new(1, $minor),
                        Format::new($n).unwrap().min_version()
                    );
                }
            }
        };
    }

    format!(format_0, 0, 20, 1);
    format!(format_1, 1, 28, 1);
    format!(format_2, 2, 26, 2);
    format!(format_3, 3, 34, 2);
    format!(format_4, 4, 57, 3);
    format!(format_5, 5, 63, 3);
    format!(format_6, 6, 30, 4);
    format!(format_7, 7, 36, 4);
    format!(format_8, 8, 38, 4);
    format!(format_9, 9, 59, 4);
    format!(format_10, 10, 67, 4);

    #[test]
    fn eleven_is_too_many() {
        assert!(Format::new(11).is_err());
    }

    #[test]
    fn nir_without_extended() {
        let format = Format {
            has_nir: true,
            ..Default::default()
        };
        assert!(format.to_u8().is_err());
    }

    #[test]
    fn smallest_format_wins() {
        let format = Format::with_dimensions(&[Dimension::Position]).unwrap();
        assert_eq!(0, format.to_u8().unwrap());
        let format = Format::with_dimensions(&[Dimension::GpsTime, Dimension::Color]).unwrap();
        assert_eq!(3, format.to_u8().unwrap());
        let format = Format::with_dimensions(&[Dimension::Overlap]).unwrap();
        assert_eq!(6, format.to_u8().unwrap());
    }

    #[test]
    fn overlap_needs_extended() {
        let format = Format::new(0).unwrap();
        assert!(!format.supports(Dimension::Overlap));
        assert!(!format.supports(Dimension::ScannerChannel));
    }
}
