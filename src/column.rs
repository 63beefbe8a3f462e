//! Typed columnar storage for point attributes.
//!
//! A [Column] stores one attribute for every point in a table. Elements are
//! one of the ten las base scalar types, or a fixed-width vector of one of
//! them; vector elements are stored flattened, `width` scalars per point.

use num_traits::ToPrimitive;
use std::fmt;

/// The ten scalar types a las extra-bytes column can carry.
///
/// The discriminants follow the extra-bytes data type codes, 1 through 10.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ScalarKind {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
}

impl ScalarKind {
    /// The size of one scalar of this kind, in bytes.
    ///
    /// ```
    /// use las_dataset::ScalarKind;
    /// assert_eq!(1, ScalarKind::U8.size());
    /// assert_eq!(8, ScalarKind::F64.size());
    /// ```
    pub fn size(&self) -> usize {
        match self {
            ScalarKind::U8 | ScalarKind::I8 => 1,
            ScalarKind::U16 | ScalarKind::I16 => 2,
            ScalarKind::U32 | ScalarKind::I32 | ScalarKind::F32 => 4,
            ScalarKind::U64 | ScalarKind::I64 | ScalarKind::F64 => 8,
        }
    }

    /// The extra-bytes data type code for this kind.
    ///
    /// ```
    /// use las_dataset::ScalarKind;
    /// assert_eq!(1, ScalarKind::U8.code());
    /// assert_eq!(10, ScalarKind::F64.code());
    /// ```
    pub fn code(&self) -> u8 {
        match self {
            ScalarKind::U8 => 1,
            ScalarKind::I8 => 2,
            ScalarKind::U16 => 3,
            ScalarKind::I16 => 4,
            ScalarKind::U32 => 5,
            ScalarKind::I32 => 6,
            ScalarKind::U64 => 7,
            ScalarKind::I64 => 8,
            ScalarKind::F32 => 9,
            ScalarKind::F64 => 10,
        }
    }

    /// Looks a kind up by its extra-bytes data type code.
    ///
    /// ```
    /// use las_dataset::ScalarKind;
    /// assert_eq!(Some(ScalarKind::F64), ScalarKind::from_code(10));
    /// assert_eq!(None, ScalarKind::from_code(0));
    /// assert_eq!(None, ScalarKind::from_code(11));
    /// ```
    pub fn from_code(code: u8) -> Option<ScalarKind> {
        match code {
            1 => Some(ScalarKind::U8),
            2 => Some(ScalarKind::I8),
            3 => Some(ScalarKind::U16),
            4 => Some(ScalarKind::I16),
            5 => Some(ScalarKind::U32),
            6 => Some(ScalarKind::I32),
            7 => Some(ScalarKind::U64),
            8 => Some(ScalarKind::I64),
            9 => Some(ScalarKind::F32),
            10 => Some(ScalarKind::F64),
            _ => None,
        }
    }

    /// Is this a floating point kind?
    pub fn is_float(&self) -> bool {
        matches!(self, ScalarKind::F32 | ScalarKind::F64)
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarKind::U8 => "u8",
            ScalarKind::I8 => "i8",
            ScalarKind::U16 => "u16",
            ScalarKind::I16 => "i16",
            ScalarKind::U32 => "u32",
            ScalarKind::I32 => "i32",
            ScalarKind::U64 => "u64",
            ScalarKind::I64 => "i64",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Values {
    U8(Vec<u8>),
    I8(Vec<i8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    U64(Vec<u64>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! for_each_values {
    ($values:expr, $v:ident => $body:expr) => {
        match $values {
            Values::U8($v) => $body,
            Values::I8($v) => $body,
            Values::U16($v) => $body,
            Values::I16($v) => $body,
            Values::U32($v) => $body,
            Values::I32($v) => $body,
            Values::U64($v) => $body,
            Values::I64($v) => $body,
            Values::F32($v) => $body,
            Values::F64($v) => $body,
        }
    };
}

impl Values {
    fn new(kind: ScalarKind) -> Values {
        match kind {
            ScalarKind::U8 => Values::U8(Vec::new()),
            ScalarKind::I8 => Values::I8(Vec::new()),
            ScalarKind::U16 => Values::U16(Vec::new()),
            ScalarKind::I16 => Values::I16(Vec::new()),
            ScalarKind::U32 => Values::U32(Vec::new()),
            ScalarKind::I32 => Values::I32(Vec::new()),
            ScalarKind::U64 => Values::U64(Vec::new()),
            ScalarKind::I64 => Values::I64(Vec::new()),
            ScalarKind::F32 => Values::F32(Vec::new()),
            ScalarKind::F64 => Values::F64(Vec::new()),
        }
    }

    fn kind(&self) -> ScalarKind {
        match self {
            Values::U8(_) => ScalarKind::U8,
            Values::I8(_) => ScalarKind::I8,
            Values::U16(_) => ScalarKind::U16,
            Values::I16(_) => ScalarKind::I16,
            Values::U32(_) => ScalarKind::U32,
            Values::I32(_) => ScalarKind::I32,
            Values::U64(_) => ScalarKind::U64,
            Values::I64(_) => ScalarKind::I64,
            Values::F32(_) => ScalarKind::F32,
            Values::F64(_) => ScalarKind::F64,
        }
    }

    fn len(&self) -> usize {
        for_each_values!(self, v => v.len())
    }
}

/// A typed column of per-point values.
///
/// Columns are created from vectors of any supported scalar type, or from
/// vectors of fixed-size arrays for vector-valued columns:
///
/// ```
/// use las_dataset::{Column, ScalarKind};
///
/// let column = Column::from(vec![1u16, 2, 3]);
/// assert_eq!(ScalarKind::U16, column.kind());
/// assert_eq!(3, column.len());
/// assert_eq!(1, column.width());
///
/// let column = Column::from(vec![[0.0f64, 0.1, 0.2], [1.0, 1.1, 1.2]]);
/// assert_eq!(2, column.len());
/// assert_eq!(3, column.width());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    width: usize,
    values: Values,
}

macro_rules! column_conversions {
    ($(($ty:ty, $variant:ident, $as_fn:ident)),+ $(,)?) => {
        $(
            impl From<Vec<$ty>> for Column {
                fn from(values: Vec<$ty>) -> Column {
                    Column {
                        width: 1,
                        values: Values::$variant(values),
                    }
                }
            }

            impl<const N: usize> From<Vec<[$ty; N]>> for Column {
                fn from(values: Vec<[$ty; N]>) -> Column {
                    Column {
                        width: N,
                        values: Values::$variant(values.into_iter().flatten().collect()),
                    }
                }
            }

            impl Column {
                /// Returns the flattened values if this column has the matching kind.
                pub fn $as_fn(&self) -> Option<&[$ty]> {
                    if let Values::$variant(values) = &self.values {
                        Some(values)
                    } else {
                        None
                    }
                }
            }
        )+
    };
}

column_conversions!(
    (u8, U8, as_u8),
    (i8, I8, as_i8),
    (u16, U16, as_u16),
    (i16, I16, as_i16),
    (u32, U32, as_u32),
    (i32, I32, as_i32),
    (u64, U64, as_u64),
    (i64, I64, as_i64),
    (f32, F32, as_f32),
    (f64, F64, as_f64),
);

impl Column {
    /// Creates an empty column of the given kind and element width.
    ///
    /// ```
    /// use las_dataset::{Column, ScalarKind};
    /// let column = Column::new(ScalarKind::F32, 1);
    /// assert!(column.is_empty());
    /// ```
    pub fn new(kind: ScalarKind, width: usize) -> Column {
        Column {
            width: width.max(1),
            values: Values::new(kind),
        }
    }

    /// The scalar kind of this column's elements.
    pub fn kind(&self) -> ScalarKind {
        self.values.kind()
    }

    /// The number of scalars per point: 1 for scalar columns, more for
    /// vector columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The number of points in this column.
    pub fn len(&self) -> usize {
        self.values.len() / self.width
    }

    /// Returns true if this column holds no points.
    pub fn is_empty(&self) -> bool {
        self.values.len() == 0
    }

    /// The number of bytes one point's element occupies on disk.
    pub fn element_size(&self) -> usize {
        self.width * self.kind().size()
    }

    /// The value at `(row, lane)` widened to an f64.
    ///
    /// Returns `None` when the row or lane is out of range.
    pub fn get(&self, row: usize, lane: usize) -> Option<f64> {
        if lane >= self.width {
            return None;
        }
        let index = row * self.width + lane;
        for_each_values!(&self.values, v => v.get(index).and_then(|n| n.to_f64()))
    }

    /// Appends one scalar, narrowing from an f64 with saturation.
    pub(crate) fn push_cast(&mut self, value: f64) {
        match &mut self.values {
            Values::U8(v) => v.push(value as u8),
            Values::I8(v) => v.push(value as i8),
            Values::U16(v) => v.push(value as u16),
            Values::I16(v) => v.push(value as i16),
            Values::U32(v) => v.push(value as u32),
            Values::I32(v) => v.push(value as i32),
            Values::U64(v) => v.push(value as u64),
            Values::I64(v) => v.push(value as i64),
            Values::F32(v) => v.push(value as f32),
            Values::F64(v) => v.push(value),
        }
    }

    /// Appends one row of zeros.
    pub(crate) fn push_zero_row(&mut self) {
        for _ in 0..self.width {
            self.push_cast(0.);
        }
    }

    /// Serialises one row into `out` as little-endian bytes.
    ///
    /// `out` must be exactly `element_size()` bytes.
    pub(crate) fn write_row(&self, row: usize, out: &mut [u8]) {
        let range = row * self.width..(row + 1) * self.width;
        match &self.values {
            Values::U8(v) => out.copy_from_slice(&v[range]),
            Values::I8(v) => {
                for (lane, byte) in v[range].iter().zip(out.iter_mut()) {
                    *byte = lane.to_le_bytes()[0];
                }
            }
            Values::U16(v) => write_lanes(&v[range], out, |n| n.to_le_bytes()),
            Values::I16(v) => write_lanes(&v[range], out, |n| n.to_le_bytes()),
            Values::U32(v) => write_lanes(&v[range], out, |n| n.to_le_bytes()),
            Values::I32(v) => write_lanes(&v[range], out, |n| n.to_le_bytes()),
            Values::U64(v) => write_lanes(&v[range], out, |n| n.to_le_bytes()),
            Values::I64(v) => write_lanes(&v[range], out, |n| n.to_le_bytes()),
            Values::F32(v) => write_lanes(&v[range], out, |n| n.to_le_bytes()),
            Values::F64(v) => write_lanes(&v[range], out, |n| n.to_le_bytes()),
        }
    }

    /// Appends one row decoded from little-endian bytes.
    ///
    /// `bytes` must be exactly `element_size()` bytes.
    pub(crate) fn push_row_bytes(&mut self, bytes: &[u8]) {
        match &mut self.values {
            Values::U8(v) => v.extend_from_slice(bytes),
            Values::I8(v) => v.extend(bytes.iter().map(|&b| i8::from_le_bytes([b]))),
            Values::U16(v) => read_lanes(bytes, v, u16::from_le_bytes),
            Values::I16(v) => read_lanes(bytes, v, i16::from_le_bytes),
            Values::U32(v) => read_lanes(bytes, v, u32::from_le_bytes),
            Values::I32(v) => read_lanes(bytes, v, i32::from_le_bytes),
            Values::U64(v) => read_lanes(bytes, v, u64::from_le_bytes),
            Values::I64(v) => read_lanes(bytes, v, i64::from_le_bytes),
            Values::F32(v) => read_lanes(bytes, v, f32::from_le_bytes),
            Values::F64(v) => read_lanes(bytes, v, f64::from_le_bytes),
        }
    }

    /// Removes the given rows, which must be sorted and deduplicated.
    pub(crate) fn remove_rows(&mut self, remove: &[usize]) {
        let width = self.width;
        for_each_values!(&mut self.values, v => {
            let mut removed = remove.iter().peekable();
            let mut index = 0;
            v.retain(|_| {
                let row = index / width;
                index += 1;
                if removed.peek() == Some(&&row) {
                    if index % width == 0 {
                        let _ = removed.next();
                    }
                    false
                } else {
                    true
                }
            });
        });
    }

    /// Multiplies each lane of an f64 column by a per-lane factor.
    ///
    /// Used for unit conversion of positions; does nothing for other kinds.
    pub(crate) fn scale_lanes(&mut self, factors: &[f64]) {
        if let Values::F64(values) = &mut self.values {
            for (lane, value) in values.iter_mut().enumerate() {
                *value *= factors[lane % factors.len()];
            }
        }
    }

    /// Compares two columns, allowing floats to differ by `tolerance`.
    pub(crate) fn approx_eq(&self, other: &Column, tolerance: f64) -> bool {
        if self.width != other.width {
            return false;
        }
        match (&self.values, &other.values) {
            (Values::F32(a), Values::F32(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|(a, b)| f64::from(a - b).abs() <= tolerance)
            }
            (Values::F64(a), Values::F64(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(a, b)| (a - b).abs() <= tolerance)
            }
            (a, b) => a == b,
        }
    }
}

fn write_lanes<T: Copy, const N: usize>(lanes: &[T], out: &mut [u8], to_bytes: fn(T) -> [u8; N]) {
    for (lane, chunk) in lanes.iter().zip(out.chunks_exact_mut(N)) {
        chunk.copy_from_slice(&to_bytes(*lane));
    }
}

fn read_lanes<T, const N: usize>(bytes: &[u8], into: &mut Vec<T>, from_bytes: fn([u8; N]) -> T) {
    for chunk in bytes.chunks_exact(N) {
        let mut buffer = [0; N];
        buffer.copy_from_slice(chunk);
        into.push(from_bytes(buffer));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_sizes_match_codes() {
        for code in 1..=10 {
            let kind = ScalarKind::from_code(code).unwrap();
            assert_eq!(code, kind.code());
        }
    }

    #[test]
    fn row_bytes_roundtrip() {
        let column = Column::from(vec![[0.5f64, 1.5, 2.5], [3.5, 4.5, 5.5]]);
        let mut bytes = vec![0; column.element_size()];
        column.write_row(1, &mut bytes);
        let mut other = Column::new(ScalarKind::F64, 3);
        other.push_row_bytes(&bytes);
        assert_eq!(Some(4.5), other.get(0, 1));
    }

    #[test]
    fn signed_row_bytes() {
        let column = Column::from(vec![-2i16, 300]);
        let mut bytes = vec![0; 2];
        column.write_row(0, &mut bytes);
        assert_eq!(vec![0xFE, 0xFF], bytes);
    }

    #[test]
    fn remove_rows() {
        let mut column = Column::from(vec![[0u32, 1], [2, 3], [4, 5], [6, 7]]);
        column.remove_rows(&[1, 3]);
        assert_eq!(2, column.len());
        assert_eq!(Some(&[0, 1, 4, 5][..]), column.as_u32());
    }

    #[test]
    fn approx_eq() {
        let a = Column::from(vec![1.0f64, 2.0]);
        let b = Column::from(vec![1.0000005f64, 2.0]);
        assert!(a.approx_eq(&b, 1e-6));
        assert!(!a.approx_eq(&b, 1e-9));
        let c = Column::from(vec![1u8, 2]);
        assert!(!a.approx_eq(&c, 1e-6));
    }

    #[test]
    fn push_cast_saturates() {
        let mut column = Column::new(ScalarKind::U8, 1);
        column.push_cast(300.);
        column.push_cast(-5.);
        assert_eq!(Some(&[255, 0][..]), column.as_u8());
    }
}
