use crate::ScalarKind;

/// The semantic per-point columns a las point format can carry.
///
/// Each dimension has a canonical column name, a scalar kind, and a width
/// (scalars per point). Standard columns in a [PointCloud](crate::PointCloud)
/// are keyed by these names:
///
/// ```
/// use las_dataset::point::Dimension;
/// use las_dataset::ScalarKind;
///
/// assert_eq!("gps_time", Dimension::GpsTime.name());
/// assert_eq!(Some(Dimension::Color), Dimension::from_name("color"));
/// assert_eq!(ScalarKind::F64, Dimension::Color.kind());
/// assert_eq!(3, Dimension::Color.width());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum Dimension {
    Position,
    Intensity,
    ReturnNumber,
    NumberOfReturns,
    ScanDirection,
    EdgeOfFlightLine,
    Synthetic,
    KeyPoint,
    Withheld,
    Overlap,
    ScannerChannel,
    Classification,
    ScanAngle,
    UserData,
    PointSourceId,
    GpsTime,
    Color,
    Nir,
    WavePacketDescriptorIndex,
    WaveDataOffset,
    WavePacketSize,
    WaveReturnPoint,
    WaveParameters,
}

const ALL: [Dimension; 23] = [
    Dimension::Position,
    Dimension::Intensity,
    Dimension::ReturnNumber,
    Dimension::NumberOfReturns,
    Dimension::ScanDirection,
    Dimension::EdgeOfFlightLine,
    Dimension::Synthetic,
    Dimension::KeyPoint,
    Dimension::Withheld,
    Dimension::Overlap,
    Dimension::ScannerChannel,
    Dimension::Classification,
    Dimension::ScanAngle,
    Dimension::UserData,
    Dimension::PointSourceId,
    Dimension::GpsTime,
    Dimension::Color,
    Dimension::Nir,
    Dimension::WavePacketDescriptorIndex,
    Dimension::WaveDataOffset,
    Dimension::WavePacketSize,
    Dimension::WaveReturnPoint,
    Dimension::WaveParameters,
];

impl Dimension {
    /// Every dimension, in canonical column order.
    pub fn all() -> &'static [Dimension] {
        &ALL
    }

    /// The canonical column name for this dimension.
    pub fn name(&self) -> &'static str {
        match self {
            Dimension::Position => "position",
            Dimension::Intensity => "intensity",
            Dimension::ReturnNumber => "return_number",
            Dimension::NumberOfReturns => "number_of_returns",
            Dimension::ScanDirection => "scan_direction",
            Dimension::EdgeOfFlightLine => "edge_of_flight_line",
            Dimension::Synthetic => "synthetic",
            Dimension::KeyPoint => "key_point",
            Dimension::Withheld => "withheld",
            Dimension::Overlap => "overlap",
            Dimension::ScannerChannel => "scanner_channel",
            Dimension::Classification => "classification",
            Dimension::ScanAngle => "scan_angle",
            Dimension::UserData => "user_data",
            Dimension::PointSourceId => "point_source_id",
            Dimension::GpsTime => "gps_time",
            Dimension::Color => "color",
            Dimension::Nir => "nir",
            Dimension::WavePacketDescriptorIndex => "wave_packet_descriptor_index",
            Dimension::WaveDataOffset => "wave_data_offset",
            Dimension::WavePacketSize => "wave_packet_size",
            Dimension::WaveReturnPoint => "wave_return_point",
            Dimension::WaveParameters => "wave_parameters",
        }
    }

    /// Looks a dimension up by its column name.
    pub fn from_name(name: &str) -> Option<Dimension> {
        ALL.iter().find(|dimension| dimension.name() == name).copied()
    }

    /// The scalar kind of this dimension's column.
    pub fn kind(&self) -> ScalarKind {
        match self {
            Dimension::Position | Dimension::Intensity | Dimension::GpsTime => ScalarKind::F64,
            Dimension::Color | Dimension::Nir => ScalarKind::F64,
            Dimension::ScanAngle | Dimension::WaveReturnPoint | Dimension::WaveParameters => {
                ScalarKind::F32
            }
            Dimension::PointSourceId => ScalarKind::U16,
            Dimension::WavePacketSize => ScalarKind::U32,
            Dimension::WaveDataOffset => ScalarKind::U64,
            _ => ScalarKind::U8,
        }
    }

    /// The number of scalars per point in this dimension's column.
    pub fn width(&self) -> usize {
        match self {
            Dimension::Position | Dimension::Color | Dimension::WaveParameters => 3,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_roundtrip() {
        for &dimension in Dimension::all() {
            assert_eq!(Some(dimension), Dimension::from_name(dimension.name()));
        }
    }

    #[test]
    fn unknown_name() {
        assert_eq!(None, Dimension::from_name("density"));
    }
}
