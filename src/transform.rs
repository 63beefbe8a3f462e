use crate::{Error, Interval, Result};
use std::fmt;

/// The default coordinate resolution, 0.1mm.
pub const DEFAULT_SCALE: f64 = 1e-4;

/// Offsets are rounded to multiples of this many scale units so they stay
/// human-readable in the header.
const OFFSET_THRESHOLD: f64 = 1e7;

/// A scale and an offset that convert raw i32 coordinates to floats.
///
/// `real = raw * scale + offset`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// The scale.
    pub scale: f64,
    /// The offset.
    pub offset: f64,
}

impl Transform {
    /// Applies this transform to an i32, returning a float.
    ///
    /// ```
    /// use las_dataset::Transform;
    /// let transform = Transform { scale: 2., offset: 1. };
    /// assert_eq!(3., transform.direct(1));
    /// ```
    pub fn direct(&self, n: i32) -> f64 {
        self.scale * f64::from(n) + self.offset
    }

    /// Applies the inverse transform, rounding the result.
    ///
    /// Returns an error if the result can't be represented as an i32.
    ///
    /// ```
    /// use las_dataset::Transform;
    /// let transform = Transform { scale: 2., offset: 1. };
    /// assert_eq!(1, transform.inverse(2.9).unwrap());
    /// ```
    pub fn inverse(&self, n: f64) -> Result<i32> {
        let n = ((n - self.offset) / self.scale).round();
        if n > f64::from(i32::MAX) || n < f64::from(i32::MIN) || !n.is_finite() {
            Err(Error::InverseTransform(n, *self))
        } else {
            Ok(n as i32)
        }
    }

    /// Applies the inverse transform, saturating to the i32 range.
    ///
    /// ```
    /// use las_dataset::Transform;
    /// let transform = Transform { scale: 1e-4, offset: 0. };
    /// assert_eq!(i32::MAX, transform.inverse_clamped(1e9));
    /// ```
    pub fn inverse_clamped(&self, n: f64) -> i32 {
        let n = ((n - self.offset) / self.scale).round();
        if n >= f64::from(i32::MAX) {
            i32::MAX
        } else if n <= f64::from(i32::MIN) {
            i32::MIN
        } else {
            n as i32
        }
    }

    /// Chooses a rounded offset that makes this interval representable with
    /// the given scale.
    ///
    /// The offset is snapped to a multiple of `scale * 1e7` near the middle of
    /// the interval. Fails if either endpoint still can't round-trip an i32
    /// with its sign intact.
    ///
    /// ```
    /// use las_dataset::{Interval, Transform};
    /// let transform = Transform::suggested(Interval::new(0., 9.), 1e-4).unwrap();
    /// assert_eq!(1e-4, transform.scale);
    /// assert!(Transform::suggested(Interval::new(0., 3e9), 1e-4).is_err());
    /// ```
    pub fn suggested(interval: Interval<f64>, scale: f64) -> Result<Transform> {
        let step = scale * OFFSET_THRESHOLD;
        let offset = ((interval.min + interval.max) / (2. * step)).round() * step;
        let transform = Transform { scale, offset };
        for endpoint in [interval.min, interval.max] {
            let raw = ((endpoint - offset) / scale).round();
            let representable = raw <= f64::from(i32::MAX) && raw >= f64::from(i32::MIN);
            let sign_preserved = raw == 0. || endpoint == offset || (raw > 0.) == (endpoint > offset);
            if !representable || !sign_preserved {
                return Err(Error::ScaleOutOfRange {
                    coordinate: endpoint,
                    scale,
                });
            }
        }
        Ok(transform)
    }
}

impl Default for Transform {
    fn default() -> Transform {
        Transform {
            scale: DEFAULT_SCALE,
            offset: 0.,
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{} * x + {}`", self.scale, self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let transform = Transform {
            scale: 0.01,
            offset: 1.,
        };
        let raw = transform.inverse(2.5).unwrap();
        assert_eq!(150, raw);
        assert_eq!(2.5, transform.direct(raw));
    }

    #[test]
    fn inverse_out_of_range() {
        let transform = Transform {
            scale: 1e-4,
            offset: 0.,
        };
        assert!(transform.inverse(1e9).is_err());
        assert_eq!(i32::MAX, transform.inverse_clamped(1e9));
        assert_eq!(i32::MIN, transform.inverse_clamped(-1e9));
    }

    #[test]
    fn suggested_centers_large_coordinates() {
        // UTM-ish eastings don't fit an i32 at 0.1mm without an offset.
        let interval = Interval::new(500_000., 500_100.);
        let transform = Transform::suggested(interval, 1e-4).unwrap();
        assert!(transform.offset != 0.);
        assert!(transform.inverse(500_000.).is_ok());
        assert!(transform.inverse(500_100.).is_ok());
    }

    #[test]
    fn suggested_rejects_unrepresentable_spans() {
        let coordinate = 3. * f64::from(i32::MAX) * 1e-4;
        let interval = Interval::new(0., coordinate);
        assert!(matches!(
            Transform::suggested(interval, 1e-4).unwrap_err(),
            Error::ScaleOutOfRange { .. }
        ));
        assert!(Transform::suggested(interval, 1e-2).is_ok());
    }
}
