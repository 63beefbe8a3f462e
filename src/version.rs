use crate::{Error, Feature, Result};
use std::fmt;

/// LAS version.
///
/// This crate supports versions 1.1 through 1.4. The default is 1.2.
///
/// ```
/// use las_dataset::Version;
/// let version = Version::new(1, 4);
/// assert!(version.is_supported());
/// assert_eq!(375, version.header_size());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// The major version, always 1.
    pub major: u8,
    /// The minor version, between 1 and 4.
    pub minor: u8,
}

impl Version {
    /// Creates a new version.
    ///
    /// Doesn't do any checking that it's an actual las version.
    ///
    /// ```
    /// use las_dataset::Version;
    /// let version = Version::new(1, 2);
    /// ```
    pub fn new(major: u8, minor: u8) -> Version {
        Version { major, minor }
    }

    /// Returns true if this version is inside the supported 1.1..=1.4 window.
    ///
    /// ```
    /// use las_dataset::Version;
    /// assert!(Version::new(1, 1).is_supported());
    /// assert!(!Version::new(1, 0).is_supported());
    /// assert!(!Version::new(2, 0).is_supported());
    /// ```
    pub fn is_supported(&self) -> bool {
        self.major == 1 && (1..=4).contains(&self.minor)
    }

    /// Returns an error if this version is outside the supported window.
    pub fn verify(&self) -> Result<()> {
        if self.is_supported() {
            Ok(())
        } else {
            Err(Error::UnsupportedVersion(*self))
        }
    }

    /// Returns the size of this version's header block.
    ///
    /// ```
    /// use las_dataset::Version;
    /// assert_eq!(227, Version::new(1, 2).header_size());
    /// assert_eq!(235, Version::new(1, 3).header_size());
    /// assert_eq!(375, Version::new(1, 4).header_size());
    /// ```
    pub fn header_size(&self) -> u16 {
        if self.minor >= 4 {
            375
        } else if self.minor == 3 {
            235
        } else {
            227
        }
    }

    /// Is this feature supported by this version?
    ///
    /// ```
    /// use las_dataset::feature::Evlrs;
    /// use las_dataset::Version;
    /// assert!(Version::new(1, 4).supports::<Evlrs>());
    /// assert!(!Version::new(1, 2).supports::<Evlrs>());
    /// ```
    pub fn supports<F: Feature>(&self) -> bool {
        F::is_supported_by(*self)
    }

    /// Returns an error if this version doesn't support a feature.
    pub fn verify_support_for<F: Feature>(&self) -> Result<()> {
        if self.supports::<F>() {
            Ok(())
        } else {
            Err(Error::UnsupportedFeature {
                version: *self,
                feature: F::name(),
            })
        }
    }
}

impl Default for Version {
    fn default() -> Version {
        Version { major: 1, minor: 2 }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl From<(u8, u8)> for Version {
    fn from((major, minor): (u8, u8)) -> Version {
        Version { major, minor }
    }
}

impl From<Version> for (u8, u8) {
    fn from(version: Version) -> (u8, u8) {
        (version.major, version.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_window() {
        assert!(!Version::new(1, 0).is_supported());
        for minor in 1..=4 {
            assert!(Version::new(1, minor).is_supported());
        }
        assert!(!Version::new(1, 5).is_supported());
        assert!(Version::new(2, 2).verify().is_err());
    }

    #[test]
    fn header_sizes() {
        assert_eq!(227, Version::new(1, 1).header_size());
        assert_eq!(227, Version::new(1, 2).header_size());
        assert_eq!(235, Version::new(1, 3).header_size());
        assert_eq!(375, Version::new(1, 4).header_size());
    }

    #[test]
    fn ordering() {
        assert!(Version::new(1, 1) < Version::new(1, 4));
        assert!(Version::new(1, 2) == Version::default());
    }
}
