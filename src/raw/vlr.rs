use crate::{Result, utils};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// A raw variable length record.
///
/// The wire header is 54 bytes for a normal vlr and 60 for an extended one;
/// the only difference is the width of the payload length field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Vlr {
    /// Reserved, must be zero in las 1.4.
    pub reserved: u16,
    /// The owner of this record's id space, null-padded.
    pub user_id: [u8; 16],
    /// The record type, interpreted per user id.
    pub record_id: u16,
    /// The payload length after the wire header.
    pub record_length_after_header: RecordLength,
    /// A textual description, null-padded.
    pub description: [u8; 32],
    /// The payload.
    pub data: Vec<u8>,
}

/// The payload length field, 16 bits for a vlr and 64 for an evlr.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RecordLength {
    /// A normal vlr's payload length.
    Normal(u16),
    /// An extended vlr's payload length.
    Extended(u64),
}

impl RecordLength {
    /// The payload length as a u64.
    pub fn get(&self) -> u64 {
        match *self {
            RecordLength::Normal(n) => u64::from(n),
            RecordLength::Extended(n) => n,
        }
    }
}

impl Default for RecordLength {
    fn default() -> RecordLength {
        RecordLength::Normal(0)
    }
}

impl Vlr {
    /// Reads a raw vlr.
    ///
    /// Pass `extended: true` to read an evlr with its 64-bit payload length.
    ///
    /// ```
    /// use std::io::Cursor;
    /// use las_dataset::raw::Vlr;
    ///
    /// let mut cursor = Cursor::new(Vec::new());
    /// Vlr::default().write_to(&mut cursor).unwrap();
    /// cursor.set_position(0);
    /// let vlr = Vlr::read_from(cursor, false).unwrap();
    /// ```
    pub fn read_from<R: Read>(mut read: R, extended: bool) -> Result<Vlr> {
        let reserved = read.read_u16::<LittleEndian>()?;
        let mut user_id = [0; 16];
        read.read_exact(&mut user_id)?;
        let record_id = read.read_u16::<LittleEndian>()?;
        let record_length_after_header = if extended {
            RecordLength::Extended(read.read_u64::<LittleEndian>()?)
        } else {
            RecordLength::Normal(read.read_u16::<LittleEndian>()?)
        };
        let mut description = [0; 32];
        read.read_exact(&mut description)?;
        let mut data = Vec::new();
        let _ = read
            .take(record_length_after_header.get())
            .read_to_end(&mut data)?;
        Ok(Vlr {
            reserved,
            user_id,
            record_id,
            record_length_after_header,
            description,
            data,
        })
    }

    /// Writes a raw vlr.
    ///
    /// The width of the payload length field follows
    /// `record_length_after_header`.
    pub fn write_to<W: Write>(&self, mut write: W) -> Result<()> {
        write.write_u16::<LittleEndian>(self.reserved)?;
        write.write_all(&self.user_id)?;
        write.write_u16::<LittleEndian>(self.record_id)?;
        match self.record_length_after_header {
            RecordLength::Normal(n) => write.write_u16::<LittleEndian>(n)?,
            RecordLength::Extended(n) => write.write_u64::<LittleEndian>(n)?,
        }
        write.write_all(&self.description)?;
        write.write_all(&self.data)?;
        Ok(())
    }

    /// The user id with trailing nulls discarded.
    pub fn user_id(&self) -> Result<&str> {
        utils::fixed_to_string(&self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip() {
        let vlr = Vlr {
            reserved: 0,
            user_id: *b"LASF_Spec\0\0\0\0\0\0\0",
            record_id: 3,
            record_length_after_header: RecordLength::Normal(4),
            description: [0; 32],
            data: vec![1, 2, 3, 4],
        };
        let mut cursor = Cursor::new(Vec::new());
        vlr.write_to(&mut cursor).unwrap();
        assert_eq!(58, cursor.get_ref().len());
        cursor.set_position(0);
        assert_eq!(vlr, Vlr::read_from(cursor, false).unwrap());
    }

    #[test]
    fn extended_roundtrip() {
        let vlr = Vlr {
            record_length_after_header: RecordLength::Extended(2),
            data: vec![1, 2],
            ..Default::default()
        };
        let mut cursor = Cursor::new(Vec::new());
        vlr.write_to(&mut cursor).unwrap();
        assert_eq!(62, cursor.get_ref().len());
        cursor.set_position(0);
        assert_eq!(vlr, Vlr::read_from(cursor, true).unwrap());
    }

    #[test]
    fn truncated_payload() {
        let vlr = Vlr {
            record_length_after_header: RecordLength::Normal(10),
            data: vec![1, 2],
            ..Default::default()
        };
        let mut cursor = Cursor::new(Vec::new());
        vlr.write_to(&mut cursor).unwrap();
        cursor.set_position(0);
        let read_back = Vlr::read_from(cursor, false).unwrap();
        assert_eq!(2, read_back.data.len());
    }
}
