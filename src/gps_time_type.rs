/// The meaning of GPS time in the point records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GpsTimeType {
    /// GPS Week Time (the same as las 1.0 and 1.1).
    #[default]
    Week,
    /// Standard GPS time (satellite GPS time) minus 1e9.
    Standard,
}

impl GpsTimeType {
    /// Returns true if this time type is gps standard time.
    ///
    /// ```
    /// use las_dataset::GpsTimeType;
    /// assert!(!GpsTimeType::Week.is_standard());
    /// assert!(GpsTimeType::Standard.is_standard());
    /// ```
    pub fn is_standard(&self) -> bool {
        matches!(self, GpsTimeType::Standard)
    }
}

impl From<bool> for GpsTimeType {
    fn from(is_standard: bool) -> GpsTimeType {
        if is_standard {
            GpsTimeType::Standard
        } else {
            GpsTimeType::Week
        }
    }
}
