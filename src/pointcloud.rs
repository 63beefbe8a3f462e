//! The columnar point table.

use crate::{
    point::{Dimension, Format},
    raw, Bounds, Column, Point, ScalarKind, Vector,
};

/// The name of the synthetic row-id column.
pub const ID_COLUMN: &str = "id";

/// The name of the column carrying undocumented trailing record bytes.
pub const UNDOCUMENTED_COLUMN: &str = "undocumented_bytes";

/// A columnar table of points.
///
/// The table carries three families of columns, all the same length:
///
/// - *standard* columns, named after [Dimension]s and typed per the point
///   format (positions as f64 triples, normalised intensities, and so on);
/// - *user* columns of any supported scalar kind, persisted as las extra
///   bytes;
/// - two special columns: a synthetic `id` (1..=n, added automatically) and
///   optionally `undocumented_bytes`, a fixed-width byte block per point.
///
/// ```
/// use las_dataset::{Point, PointCloud};
///
/// let mut pointcloud = PointCloud::with_format(Default::default());
/// pointcloud.push(&Point { x: 1., y: 2., z: 3., ..Default::default() });
/// assert_eq!(1, pointcloud.len());
/// assert_eq!(1., pointcloud.point(0).x);
/// assert_eq!(Some(1.), pointcloud.column("id").unwrap().get(0, 0));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PointCloud {
    columns: Vec<(String, Column)>,
    next_id: u64,
}

impl PointCloud {
    /// Creates an empty table with the standard columns of a point format.
    pub fn with_format(format: Format) -> PointCloud {
        let mut columns = vec![(ID_COLUMN.to_string(), Column::new(ScalarKind::U64, 1))];
        for dimension in format.dimensions() {
            columns.push((
                dimension.name().to_string(),
                Column::new(dimension.kind(), dimension.width()),
            ));
        }
        PointCloud {
            columns,
            next_id: 1,
        }
    }

    /// The number of points in the table.
    pub fn len(&self) -> usize {
        self.columns
            .first()
            .map(|(_, column)| column.len())
            .unwrap_or(0)
    }

    /// Returns true if the table holds no points.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks a column up by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|(column_name, _)| column_name == name)
            .map(|(_, column)| column)
    }

    pub(crate) fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns
            .iter_mut()
            .find(|(column_name, _)| column_name == name)
            .map(|(_, column)| column)
    }

    /// The column names, in storage order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// The standard dimensions this table carries.
    pub fn dimensions(&self) -> Vec<Dimension> {
        self.columns
            .iter()
            .filter_map(|(name, _)| Dimension::from_name(name))
            .collect()
    }

    /// The user columns, in the order they appear in records.
    pub fn user_columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns
            .iter()
            .filter(|(name, _)| {
                name != ID_COLUMN
                    && name != UNDOCUMENTED_COLUMN
                    && Dimension::from_name(name).is_none()
            })
            .map(|(name, column)| (name.as_str(), column))
    }

    /// The number of extra bytes per record occupied by user columns.
    pub fn user_bytes_per_point(&self) -> usize {
        self.user_columns()
            .map(|(_, column)| column.element_size())
            .sum()
    }

    /// The number of undocumented trailing bytes per record.
    pub fn undocumented_bytes_per_point(&self) -> usize {
        self.column(UNDOCUMENTED_COLUMN)
            .map(|column| column.width())
            .unwrap_or(0)
    }

    pub(crate) fn insert_column(&mut self, name: &str, column: Column) {
        self.columns.push((name.to_string(), column));
    }

    pub(crate) fn replace_column(&mut self, name: &str, column: Column) -> bool {
        match self.column_mut(name) {
            Some(slot) => {
                *slot = column;
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove_column(&mut self, name: &str) -> Option<Column> {
        let position = self
            .columns
            .iter()
            .position(|(column_name, _)| column_name == name)?;
        Some(self.columns.remove(position).1)
    }

    /// Appends a point, zero-filling any user columns.
    pub fn push(&mut self, point: &Point) {
        self.push_standard(point);
        let names: Vec<String> = self
            .user_columns()
            .map(|(name, _)| name.to_string())
            .collect();
        for name in names {
            if let Some(column) = self.column_mut(&name) {
                column.push_zero_row();
            }
        }
        if let Some(column) = self.column_mut(UNDOCUMENTED_COLUMN) {
            column.push_zero_row();
        }
    }

    /// Appends a point's id and standard dimensions only.
    ///
    /// The caller is responsible for bringing the user and undocumented
    /// columns up to the same length.
    pub(crate) fn push_standard(&mut self, point: &Point) {
        let id = self.next_id;
        self.next_id += 1;
        for (name, column) in &mut self.columns {
            if name == ID_COLUMN {
                column.push_cast(id as f64);
            } else if let Some(dimension) = Dimension::from_name(name) {
                for lane in 0..dimension.width() {
                    column.push_cast(dimension_value(point, dimension, lane));
                }
            }
        }
    }

    /// The point at `index`, reassembled from the standard columns.
    pub fn point(&self, index: usize) -> Point {
        let get = |dimension: Dimension, lane: usize| {
            self.column(dimension.name())
                .and_then(|column| column.get(index, lane))
        };
        let value = |dimension, lane| get(dimension, lane).unwrap_or(0.);
        Point {
            x: value(Dimension::Position, 0),
            y: value(Dimension::Position, 1),
            z: value(Dimension::Position, 2),
            intensity: value(Dimension::Intensity, 0),
            return_number: value(Dimension::ReturnNumber, 0) as u8,
            number_of_returns: value(Dimension::NumberOfReturns, 0) as u8,
            scan_direction: (value(Dimension::ScanDirection, 0) != 0.).into(),
            is_edge_of_flight_line: value(Dimension::EdgeOfFlightLine, 0) != 0.,
            classification: value(Dimension::Classification, 0) as u8,
            is_synthetic: value(Dimension::Synthetic, 0) != 0.,
            is_key_point: value(Dimension::KeyPoint, 0) != 0.,
            is_withheld: value(Dimension::Withheld, 0) != 0.,
            is_overlap: value(Dimension::Overlap, 0) != 0.,
            scanner_channel: value(Dimension::ScannerChannel, 0) as u8,
            scan_angle: value(Dimension::ScanAngle, 0) as f32,
            user_data: value(Dimension::UserData, 0) as u8,
            point_source_id: value(Dimension::PointSourceId, 0) as u16,
            gps_time: get(Dimension::GpsTime, 0),
            color: self.column(Dimension::Color.name()).map(|_| crate::Color {
                red: value(Dimension::Color, 0),
                green: value(Dimension::Color, 1),
                blue: value(Dimension::Color, 2),
            }),
            nir: get(Dimension::Nir, 0),
            waveform: self
                .column(Dimension::WavePacketDescriptorIndex.name())
                .map(|_| raw::Waveform {
                    wave_packet_descriptor_index: value(Dimension::WavePacketDescriptorIndex, 0)
                        as u8,
                    wave_data_offset: value(Dimension::WaveDataOffset, 0) as u64,
                    wave_packet_size: value(Dimension::WavePacketSize, 0) as u32,
                    wave_return_point: value(Dimension::WaveReturnPoint, 0) as f32,
                    x_t: value(Dimension::WaveParameters, 0) as f32,
                    y_t: value(Dimension::WaveParameters, 1) as f32,
                    z_t: value(Dimension::WaveParameters, 2) as f32,
                }),
        }
    }

    /// Removes the points at the given indices.
    ///
    /// Out-of-range indices are ignored.
    pub fn remove(&mut self, indices: &[usize]) {
        let mut sorted: Vec<usize> = indices.iter().copied().filter(|&i| i < self.len()).collect();
        sorted.sort_unstable();
        sorted.dedup();
        for (_, column) in &mut self.columns {
            column.remove_rows(&sorted);
        }
    }

    /// The position of the point at `index`.
    pub fn position(&self, index: usize) -> Vector<f64> {
        let column = self.column(Dimension::Position.name());
        let value = |lane| {
            column
                .and_then(|column| column.get(index, lane))
                .unwrap_or(0.)
        };
        Vector {
            x: value(0),
            y: value(1),
            z: value(2),
        }
    }

    /// The bounds of all positions, in one pass.
    pub fn bounds(&self) -> Bounds {
        Bounds::of((0..self.len()).map(|index| self.position(index)))
    }

    /// The number of points of each return number, returns one through
    /// fifteen.
    pub fn points_by_return(&self) -> [u64; 15] {
        let mut counts = [0; 15];
        if let Some(column) = self.column(Dimension::ReturnNumber.name()) {
            for index in 0..column.len() {
                let return_number = column.get(index, 0).unwrap_or(0.) as usize;
                if (1..=15).contains(&return_number) {
                    counts[return_number - 1] += 1;
                }
            }
        }
        counts
    }

    /// Multiplies all positions by per-axis factors.
    pub(crate) fn scale_positions(&mut self, factors: Vector<f64>) {
        if let Some(column) = self.column_mut(Dimension::Position.name()) {
            column.scale_lanes(&[factors.x, factors.y, factors.z]);
        }
    }

    /// Compares two tables column by column, floats at the given absolute
    /// tolerance.
    pub fn approx_eq(&self, other: &PointCloud, tolerance: f64) -> bool {
        self.columns.len() == other.columns.len()
            && self.columns.iter().all(|(name, column)| {
                other
                    .column(name)
                    .map(|other| column.approx_eq(other, tolerance))
                    .unwrap_or(false)
            })
    }
}

fn dimension_value(point: &Point, dimension: Dimension, lane: usize) -> f64 {
    match dimension {
        Dimension::Position => match lane {
            0 => point.x,
            1 => point.y,
            _ => point.z,
        },
        Dimension::Intensity => point.intensity,
        Dimension::ReturnNumber => f64::from(point.return_number),
        Dimension::NumberOfReturns => f64::from(point.number_of_returns),
        Dimension::ScanDirection => f64::from(u8::from(bool::from(point.scan_direction))),
        Dimension::EdgeOfFlightLine => f64::from(u8::from(point.is_edge_of_flight_line)),
        Dimension::Synthetic => f64::from(u8::from(point.is_synthetic)),
        Dimension::KeyPoint => f64::from(u8::from(point.is_key_point)),
        Dimension::Withheld => f64::from(u8::from(point.is_withheld)),
        Dimension::Overlap => f64::from(u8::from(point.is_overlap)),
        Dimension::ScannerChannel => f64::from(point.scanner_channel),
        Dimension::Classification => f64::from(point.classification),
        Dimension::ScanAngle => f64::from(point.scan_angle),
        Dimension::UserData => f64::from(point.user_data),
        Dimension::PointSourceId => f64::from(point.point_source_id),
        Dimension::GpsTime => point.gps_time.unwrap_or(0.),
        Dimension::Color => {
            let color = point.color.unwrap_or_default();
            match lane {
                0 => color.red,
                1 => color.green,
                _ => color.blue,
            }
        }
        Dimension::Nir => point.nir.unwrap_or(0.),
        Dimension::WavePacketDescriptorIndex => {
            f64::from(point.waveform.unwrap_or_default().wave_packet_descriptor_index)
        }
        Dimension::WaveDataOffset => point.waveform.unwrap_or_default().wave_data_offset as f64,
        Dimension::WavePacketSize => {
            f64::from(point.waveform.unwrap_or_default().wave_packet_size)
        }
        Dimension::WaveReturnPoint => {
            f64::from(point.waveform.unwrap_or_default().wave_return_point)
        }
        Dimension::WaveParameters => {
            let waveform = point.waveform.unwrap_or_default();
            f64::from(match lane {
                0 => waveform.x_t,
                1 => waveform.y_t,
                _ => waveform.z_t,
            })
        }
    }
}

impl Default for PointCloud {
    fn default() -> PointCloud {
        PointCloud::with_format(Format::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;

    #[test]
    fn push_and_read_back() {
        let mut pointcloud = PointCloud::with_format(Format::new(3).unwrap());
        let point = Point {
            x: 1.,
            y: 2.,
            z: 3.,
            intensity: 0.5,
            return_number: 2,
            number_of_returns: 3,
            classification: 4,
            gps_time: Some(42.),
            color: Some(Color {
                red: 0.25,
                green: 0.5,
                blue: 0.75,
            }),
            ..Default::default()
        };
        pointcloud.push(&point);
        let read_back = pointcloud.point(0);
        assert_eq!(point, read_back);
    }

    #[test]
    fn ids_count_up_from_one() {
        let mut pointcloud = PointCloud::default();
        for _ in 0..3 {
            pointcloud.push(&Point::default());
        }
        let ids = pointcloud.column(ID_COLUMN).unwrap();
        assert_eq!(Some(&[1, 2, 3][..]), ids.as_u64());
    }

    #[test]
    fn user_columns_and_sizes() {
        let mut pointcloud = PointCloud::default();
        pointcloud.push(&Point::default());
        pointcloud.insert_column("thing", Column::from(vec![1.0f64]));
        pointcloud.insert_column("other", Column::from(vec![2i16]));
        assert_eq!(10, pointcloud.user_bytes_per_point());
        assert_eq!(2, pointcloud.user_columns().count());
        // pushed points zero-fill user columns
        pointcloud.push(&Point::default());
        assert_eq!(2, pointcloud.column("thing").unwrap().len());
    }

    #[test]
    fn remove_points() {
        let mut pointcloud = PointCloud::default();
        for i in 0..4 {
            pointcloud.push(&Point {
                x: f64::from(i),
                ..Default::default()
            });
        }
        pointcloud.remove(&[1, 3, 17]);
        assert_eq!(2, pointcloud.len());
        assert_eq!(0., pointcloud.point(0).x);
        assert_eq!(2., pointcloud.point(1).x);
    }

    #[test]
    fn points_by_return() {
        let mut pointcloud = PointCloud::default();
        for return_number in [1, 1, 2, 15, 0] {
            pointcloud.push(&Point {
                return_number,
                ..Default::default()
            });
        }
        let counts = pointcloud.points_by_return();
        assert_eq!(2, counts[0]);
        assert_eq!(1, counts[1]);
        assert_eq!(1, counts[14]);
    }

    #[test]
    fn bounds() {
        let mut pointcloud = PointCloud::default();
        pointcloud.push(&Point {
            x: -1.,
            y: 2.,
            z: 3.,
            ..Default::default()
        });
        pointcloud.push(&Point {
            x: 4.,
            y: 0.,
            z: 3.,
            ..Default::default()
        });
        let bounds = pointcloud.bounds();
        assert_eq!(-1., bounds.min.x);
        assert_eq!(4., bounds.max.x);
        assert_eq!(3., bounds.min.z);
    }

    #[test]
    fn approx_eq_tolerates_float_noise() {
        let mut a = PointCloud::default();
        a.push(&Point {
            x: 1.,
            ..Default::default()
        });
        let mut b = PointCloud::default();
        b.push(&Point {
            x: 1. + 1e-8,
            ..Default::default()
        });
        assert!(a.approx_eq(&b, 1e-6));
        assert!(!a.approx_eq(&b, 1e-10));
    }
}
