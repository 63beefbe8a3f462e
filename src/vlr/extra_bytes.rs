//! The extra-bytes record: the schema of user-defined point columns.
//!
//! A file carries at most one extra-bytes record (user id "LASF_Spec",
//! record id 4). Its payload is a sequence of fixed 192-byte entries, one
//! per scalar; vector columns are split into consecutive entries named
//! `"column [0]"`, `"column [1]"`, and so on, and stitched back into a
//! single column when a table is built.

use crate::{utils, Error, Result, ScalarKind};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// The wire size of one extra-bytes entry.
pub const ENTRY_SIZE: usize = 192;

const NAME_SIZE: usize = 32;
const DESCRIPTION_SIZE: usize = 32;

/// One 192-byte entry documenting a single extra scalar on each point.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtraBytesEntry {
    /// The bit field declaring which of the optional fields are relevant.
    pub options: u8,
    /// The column name.
    pub name: String,
    /// The value that should be interpreted as missing data.
    pub no_data: f64,
    /// The minimum value present, if the options declare it.
    pub min: f64,
    /// The maximum value present, if the options declare it.
    pub max: f64,
    /// A multiplier for stored values, if the options declare it.
    pub scale: f64,
    /// An additive offset for stored values, if the options declare it.
    pub offset: f64,
    /// A textual description.
    pub description: String,
    kind: ScalarKind,
}

impl ExtraBytesEntry {
    /// Creates a new entry for a scalar of the given kind.
    ///
    /// ```
    /// use las_dataset::vlr::ExtraBytesEntry;
    /// use las_dataset::ScalarKind;
    /// let entry = ExtraBytesEntry::new("thing", ScalarKind::F64).unwrap();
    /// assert_eq!(ScalarKind::F64, entry.kind());
    /// ```
    pub fn new(name: &str, kind: ScalarKind) -> Result<ExtraBytesEntry> {
        if name.len() > NAME_SIZE {
            return Err(Error::StringTooLong {
                string: name.to_string(),
                len: NAME_SIZE,
            });
        }
        Ok(ExtraBytesEntry {
            options: 0,
            name: name.to_string(),
            no_data: 0.,
            min: 0.,
            max: 0.,
            scale: 0.,
            offset: 0.,
            description: String::new(),
            kind,
        })
    }

    /// The scalar kind this entry documents.
    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    pub(crate) fn read_from<R: Read>(read: &mut R) -> Result<ExtraBytesEntry> {
        let _reserved = read.read_u16::<LittleEndian>()?;
        let data_type = read.read_u8()?;
        let options = read.read_u8()?;
        let name = utils::read_padded_string(read, NAME_SIZE)?;
        let mut unused = [0; 4];
        read.read_exact(&mut unused)?;
        let kind = ScalarKind::from_code(data_type).ok_or_else(|| Error::UnsupportedUserType {
            name: name.clone(),
            reason: format!("extra bytes data type code {}", data_type),
        })?;
        let no_data = read_anytype(read)?;
        let min = read_anytype(read)?;
        let max = read_anytype(read)?;
        let scale = read_anytype(read)?;
        let offset = read_anytype(read)?;
        let description = utils::read_padded_string(read, DESCRIPTION_SIZE)?;
        Ok(ExtraBytesEntry {
            options,
            name,
            no_data,
            min,
            max,
            scale,
            offset,
            description,
            kind,
        })
    }

    pub(crate) fn write_to<W: Write>(&self, write: &mut W) -> Result<()> {
        write.write_u16::<LittleEndian>(0)?;
        write.write_u8(self.kind.code())?;
        write.write_u8(self.options)?;
        utils::write_padded_string(write, &self.name, NAME_SIZE)?;
        write.write_all(&[0; 4])?;
        write_anytype(write, self.no_data)?;
        write_anytype(write, self.min)?;
        write_anytype(write, self.max)?;
        write_anytype(write, self.scale)?;
        write_anytype(write, self.offset)?;
        utils::write_padded_string(write, &self.description, DESCRIPTION_SIZE)?;
        Ok(())
    }
}

/// Reads one of the 24-byte "anytype" fields, of which only the first eight
/// bytes are meaningful here.
fn read_anytype<R: Read>(read: &mut R) -> Result<f64> {
    let value = read.read_f64::<LittleEndian>()?;
    let mut deprecated = [0; 16];
    read.read_exact(&mut deprecated)?;
    Ok(value)
}

fn write_anytype<W: Write>(write: &mut W, value: f64) -> Result<()> {
    write.write_f64::<LittleEndian>(value)?;
    write.write_all(&[0; 16])?;
    Ok(())
}

/// The payload of the single extra-bytes record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtraBytes {
    entries: Vec<ExtraBytesEntry>,
}

impl ExtraBytes {
    /// Creates an empty extra-bytes payload.
    pub fn new() -> ExtraBytes {
        ExtraBytes::default()
    }

    /// The entries, one per scalar.
    pub fn entries(&self) -> &[ExtraBytesEntry] {
        &self.entries
    }

    /// The payload size in bytes.
    pub fn byte_len(&self) -> usize {
        self.entries.len() * ENTRY_SIZE
    }

    /// The number of bytes this schema occupies in each point record.
    pub fn bytes_per_point(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| entry.kind.size())
            .sum()
    }

    /// Documents a column, splitting vector columns into `"name [i]"`
    /// entries.
    ///
    /// ```
    /// use las_dataset::vlr::ExtraBytes;
    /// use las_dataset::ScalarKind;
    ///
    /// let mut extra_bytes = ExtraBytes::new();
    /// extra_bytes.push_column("rgbish", ScalarKind::F64, 3).unwrap();
    /// let names: Vec<_> = extra_bytes
    ///     .entries()
    ///     .iter()
    ///     .map(|entry| entry.name.as_str())
    ///     .collect();
    /// assert_eq!(vec!["rgbish [0]", "rgbish [1]", "rgbish [2]"], names);
    /// ```
    pub fn push_column(&mut self, name: &str, kind: ScalarKind, width: usize) -> Result<()> {
        if width == 1 {
            self.entries.push(ExtraBytesEntry::new(name, kind)?);
        } else {
            for lane in 0..width {
                self.entries
                    .push(ExtraBytesEntry::new(&format!("{} [{}]", name, lane), kind)?);
            }
        }
        Ok(())
    }

    /// Removes a column's entries, returning true if any were present.
    pub fn remove_column(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|entry| entry.name != name && !is_lane_of(&entry.name, name));
        before != self.entries.len()
    }

    /// Replaces a column's entries in place, preserving their position.
    ///
    /// Returns false (and changes nothing) if the column isn't documented.
    pub fn replace_column(&mut self, name: &str, kind: ScalarKind, width: usize) -> Result<bool> {
        let position = self
            .entries
            .iter()
            .position(|entry| entry.name == name || is_lane_of(&entry.name, name));
        let Some(position) = position else {
            return Ok(false);
        };
        let mut replacement = ExtraBytes::new();
        replacement.push_column(name, kind, width)?;
        self.entries
            .retain(|entry| entry.name != name && !is_lane_of(&entry.name, name));
        for (lane, entry) in replacement.entries.into_iter().enumerate() {
            self.entries.insert(position + lane, entry);
        }
        Ok(true)
    }

    /// Stitches the entries back into columns: `(name, kind, width)`.
    ///
    /// Runs of consecutive entries named `"base [0]"`, `"base [1]"`, … with
    /// one kind become a single vector column.
    pub fn columns(&self) -> Vec<(String, ScalarKind, usize)> {
        let mut columns: Vec<(String, ScalarKind, usize)> = Vec::new();
        let mut entries = self.entries.iter().peekable();
        while let Some(entry) = entries.next() {
            match split_indexed(&entry.name) {
                Some((base, 0)) => {
                    let mut width = 1;
                    while let Some(next) = entries.peek() {
                        match split_indexed(&next.name) {
                            Some((next_base, index))
                                if next_base == base
                                    && index == width
                                    && next.kind == entry.kind =>
                            {
                                width += 1;
                                let _ = entries.next();
                            }
                            _ => break,
                        }
                    }
                    columns.push((base.to_string(), entry.kind, width));
                }
                _ => columns.push((entry.name.clone(), entry.kind, 1)),
            }
        }
        columns
    }

    pub(crate) fn read_from(data: &[u8]) -> Result<ExtraBytes> {
        let mut entries = Vec::with_capacity(data.len() / ENTRY_SIZE);
        let mut read = data;
        for _ in 0..data.len() / ENTRY_SIZE {
            entries.push(ExtraBytesEntry::read_from(&mut read)?);
        }
        Ok(ExtraBytes { entries })
    }

    pub(crate) fn write_to<W: Write>(&self, write: &mut W) -> Result<()> {
        for entry in &self.entries {
            entry.write_to(write)?;
        }
        Ok(())
    }
}

/// Returns true if `name` is a `"base [i]"` lane of `base`.
fn is_lane_of(name: &str, base: &str) -> bool {
    matches!(split_indexed(name), Some((b, _)) if b == base)
}

fn split_indexed(name: &str) -> Option<(&str, usize)> {
    let rest = name.strip_suffix(']')?;
    let (base, index) = rest.rsplit_once(" [")?;
    index.parse().ok().map(|index| (base, index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_is_192_bytes() {
        let entry = ExtraBytesEntry::new("thing", ScalarKind::I16).unwrap();
        let mut bytes = Vec::new();
        entry.write_to(&mut bytes).unwrap();
        assert_eq!(ENTRY_SIZE, bytes.len());
        let read_back = ExtraBytesEntry::read_from(&mut bytes.as_slice()).unwrap();
        assert_eq!(entry, read_back);
    }

    #[test]
    fn unknown_data_type_code() {
        let entry = ExtraBytesEntry::new("thing", ScalarKind::U8).unwrap();
        let mut bytes = Vec::new();
        entry.write_to(&mut bytes).unwrap();
        bytes[2] = 0;
        assert!(matches!(
            ExtraBytesEntry::read_from(&mut bytes.as_slice()).unwrap_err(),
            Error::UnsupportedUserType { .. }
        ));
        bytes[2] = 11;
        assert!(ExtraBytesEntry::read_from(&mut bytes.as_slice()).is_err());
    }

    #[test]
    fn vector_column_stitching() {
        let mut extra_bytes = ExtraBytes::new();
        extra_bytes.push_column("thing", ScalarKind::F64, 1).unwrap();
        extra_bytes.push_column("rgbish", ScalarKind::F32, 3).unwrap();
        extra_bytes.push_column("other", ScalarKind::I16, 1).unwrap();
        let columns = extra_bytes.columns();
        assert_eq!(
            vec![
                ("thing".to_string(), ScalarKind::F64, 1),
                ("rgbish".to_string(), ScalarKind::F32, 3),
                ("other".to_string(), ScalarKind::I16, 1),
            ],
            columns
        );
        assert_eq!(8 + 12 + 2, extra_bytes.bytes_per_point());
    }

    #[test]
    fn lone_indexed_entry_stays_a_scalar() {
        let mut extra_bytes = ExtraBytes::new();
        extra_bytes.push_column("odd [1]", ScalarKind::U8, 1).unwrap();
        let columns = extra_bytes.columns();
        assert_eq!(vec![("odd [1]".to_string(), ScalarKind::U8, 1)], columns);
    }

    #[test]
    fn remove_vector_column() {
        let mut extra_bytes = ExtraBytes::new();
        extra_bytes.push_column("rgbish", ScalarKind::F64, 3).unwrap();
        extra_bytes.push_column("thing", ScalarKind::U8, 1).unwrap();
        assert!(extra_bytes.remove_column("rgbish"));
        assert_eq!(1, extra_bytes.entries().len());
        assert!(!extra_bytes.remove_column("rgbish"));
    }

    #[test]
    fn replace_preserves_position() {
        let mut extra_bytes = ExtraBytes::new();
        extra_bytes.push_column("a", ScalarKind::U8, 1).unwrap();
        extra_bytes.push_column("b", ScalarKind::U8, 1).unwrap();
        assert!(extra_bytes.replace_column("a", ScalarKind::F64, 2).unwrap());
        let columns = extra_bytes.columns();
        assert_eq!(("a".to_string(), ScalarKind::F64, 2), columns[0]);
        assert_eq!(("b".to_string(), ScalarKind::U8, 1), columns[1]);
    }

    #[test]
    fn name_too_long() {
        let name = "x".repeat(33);
        assert!(ExtraBytesEntry::new(&name, ScalarKind::U8).is_err());
    }

    #[test]
    fn payload_roundtrip() {
        let mut extra_bytes = ExtraBytes::new();
        extra_bytes.push_column("thing", ScalarKind::F64, 1).unwrap();
        extra_bytes.push_column("rgbish", ScalarKind::F32, 3).unwrap();
        let mut bytes = Vec::new();
        extra_bytes.write_to(&mut bytes).unwrap();
        assert_eq!(extra_bytes.byte_len(), bytes.len());
        assert_eq!(extra_bytes, ExtraBytes::read_from(&bytes).unwrap());
    }
}
