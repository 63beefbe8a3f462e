//! Logical points and their formats.
//!
//! Inside las files, positions are stored as scaled integers and intensities
//! and colors as u16s. The row view presented here is fully "logical":
//! positions are f64 coordinates, intensities and color channels are
//! normalised to 0..=1, and scan angles are degrees. The mapping back to the
//! packed binary record lives in [crate::raw].

mod dimension;
mod format;
mod scan_direction;

pub use self::dimension::Dimension;
pub use self::format::Format;
pub use self::scan_direction::ScanDirection;

use crate::{color, raw, Color, Transform, Vector};

/// A point is the basic unit of information in las data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Point {
    /// The x coordinate, as a float.
    pub x: f64,

    /// The y coordinate, as a float.
    pub y: f64,

    /// The z coordinate, as a float.
    pub z: f64,

    /// The pulse return magnitude, normalised to 0..=1.
    ///
    /// Zero could be a valid intensity, so this is not wrapped in an
    /// `Option`.
    pub intensity: f64,

    /// The pulse return number for a given output pulse.
    pub return_number: u8,

    /// The total number of returns for a given pulse.
    pub number_of_returns: u8,

    /// The direction at which the scanner mirror was traveling at the time of
    /// the output pulse.
    pub scan_direction: ScanDirection,

    /// True if the point is at the end of a scan.
    pub is_edge_of_flight_line: bool,

    /// The ASPRS classification number for this point.
    ///
    /// Formats 0 through 5 can store classes 0 through 31; the extended
    /// formats store a full byte.
    pub classification: u8,

    /// This point was created by a technique other than lidar collection.
    pub is_synthetic: bool,

    /// The point should be considered a model key-point.
    pub is_key_point: bool,

    /// The point should be considered withheld (i.e. it's deleted).
    pub is_withheld: bool,

    /// Is this an overlap point?
    ///
    /// Only representable in the extended formats 6 through 10.
    pub is_overlap: bool,

    /// The channel of the scanner, used only in multi-channel systems.
    pub scanner_channel: u8,

    /// The angle of the output of the laser pulse, in degrees.
    ///
    /// Zero degrees is nadir, -90° is to the left.
    pub scan_angle: f32,

    /// Used at the user's discretion.
    pub user_data: u8,

    /// The file from which this point originated.
    pub point_source_id: u16,

    /// The time at which the point was acquired.
    pub gps_time: Option<f64>,

    /// This point's color, with channels normalised to 0..=1.
    pub color: Option<Color>,

    /// This point's near infrared value, normalised to 0..=1.
    pub nir: Option<f64>,

    /// This point's waveform information.
    pub waveform: Option<raw::Waveform>,
}

impl Point {
    /// Creates a point from a raw point.
    ///
    /// ```
    /// use las_dataset::{raw, Point};
    /// let raw_point = raw::Point::default();
    /// let point = Point::new(&raw_point, Default::default());
    /// ```
    pub fn new(raw_point: &raw::Point, transforms: Vector<Transform>) -> Point {
        Point {
            x: transforms.x.direct(raw_point.x),
            y: transforms.y.direct(raw_point.y),
            z: transforms.z.direct(raw_point.z),
            intensity: color::normalize(raw_point.intensity),
            return_number: raw_point.flags.return_number(),
            number_of_returns: raw_point.flags.number_of_returns(),
            scan_direction: raw_point.flags.scan_direction(),
            is_edge_of_flight_line: raw_point.flags.is_edge_of_flight_line(),
            classification: raw_point.flags.classification(),
            is_synthetic: raw_point.flags.is_synthetic(),
            is_key_point: raw_point.flags.is_key_point(),
            is_withheld: raw_point.flags.is_withheld(),
            is_overlap: raw_point.flags.is_overlap(),
            scanner_channel: raw_point.flags.scanner_channel(),
            scan_angle: raw_point.scan_angle.degrees(),
            user_data: raw_point.user_data,
            point_source_id: raw_point.point_source_id,
            gps_time: raw_point.gps_time,
            color: raw_point
                .color
                .map(|[red, green, blue]| Color::from_raw(red, green, blue)),
            nir: raw_point.nir.map(color::normalize),
            waveform: raw_point.waveform,
        }
    }

    /// This point's position as a vector.
    pub fn position(&self) -> Vector<f64> {
        Vector {
            x: self.x,
            y: self.y,
            z: self.z,
        }
    }

    /// Returns true if this point's optional attributes match the format's.
    ///
    /// ```
    /// use las_dataset::point::Format;
    /// use las_dataset::Point;
    ///
    /// let mut point = Point::default();
    /// assert!(point.matches(Format::new(0).unwrap()));
    /// assert!(!point.matches(Format::new(1).unwrap()));
    /// point.gps_time = Some(42.);
    /// assert!(point.matches(Format::new(1).unwrap()));
    /// ```
    pub fn matches(&self, format: Format) -> bool {
        self.gps_time.is_some() == format.has_gps_time
            && self.color.is_some() == format.has_color
            && self.nir.is_some() == format.has_nir
            && self.waveform.is_some() == format.has_waveform
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_applies_transforms() {
        let raw_point = raw::Point {
            x: 10,
            y: 20,
            z: 30,
            ..Default::default()
        };
        let transforms = Vector::splat(Transform {
            scale: 0.1,
            offset: 100.,
        });
        let point = Point::new(&raw_point, transforms);
        assert_eq!(101., point.x);
        assert_eq!(102., point.y);
        assert_eq!(103., point.z);
    }

    #[test]
    fn matches() {
        let point = Point {
            gps_time: Some(1.),
            color: Some(Color::default()),
            ..Default::default()
        };
        assert!(point.matches(Format::new(3).unwrap()));
        assert!(!point.matches(Format::new(2).unwrap()));
        assert!(!point.matches(Format::new(8).unwrap()));
    }
}
