//! Stream points out of las data.
//!
//! A [Reader] decodes the header, the vlrs, and the padding up front, then
//! hands out points one at a time; it never materialises the whole table.
//! Use [Dataset::read_from](crate::Dataset::read_from) to build the full
//! in-memory dataset instead.

use crate::{
    raw,
    vlr::{self, extract_vlr, ExtraBytes, Payload},
    Error, Header, Point, RecordKind, Result, Vlr,
};
use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

/// Reads las points from anything that is `Read`.
///
/// ```no_run
/// use las_dataset::Reader;
/// let mut reader = Reader::from_path("points.las").unwrap();
/// let first = reader.read_point().unwrap().unwrap();
/// let the_rest = reader.points().collect::<Result<Vec<_>, _>>().unwrap();
/// ```
#[derive(Debug)]
pub struct Reader<R> {
    read: R,
    header: Header,
    vlrs: Vec<Vlr>,
    user_defined_bytes: Vec<u8>,
    record_kind: RecordKind,
    index: u64,
}

impl<R: Read> Reader<R> {
    /// Creates a new reader, consuming the header block, the vlrs, and any
    /// padding before the point records.
    ///
    /// Compressed (laszip) streams are refused; decompression is delegated
    /// to the external tool by the path-based entry points.
    pub fn new(mut read: R) -> Result<Reader<R>> {
        let raw_header = raw::Header::read_from(&mut read)?;
        if raw_header.is_compressed() {
            return Err(Error::Laszip(
                "the stream is laszip compressed; open the .laz path instead".to_string(),
            ));
        }
        let header = Header::from_raw(raw_header)?;
        let mut vlrs = Vec::new();
        let mut vlr_bytes = 0u64;
        for _ in 0..header.number_of_vlrs() {
            let raw_vlr = raw::Vlr::read_from(&mut read, false)?;
            // count the bytes actually consumed, which can differ from the
            // re-encoded size for non-canonical payloads
            vlr_bytes += vlr::VLR_HEADER_SIZE + raw_vlr.data.len() as u64;
            vlrs.push(Vlr::from_raw(raw_vlr, vlr::global())?);
        }
        let consumed = u64::from(header.size()) + vlr_bytes;
        let offset = u64::from(header.offset_to_point_data());
        if offset < consumed {
            return Err(Error::InconsistentHeader(format!(
                "offset to point data ({}) lies inside the header and vlrs ({} bytes)",
                offset, consumed
            )));
        }
        let mut user_defined_bytes = vec![0; (offset - consumed) as usize];
        read.read_exact(&mut user_defined_bytes)?;
        let record_kind = RecordKind::resolve(
            header.point_format(),
            header.point_data_record_length(),
            extra_bytes_schema(&vlrs),
        )?;
        Ok(Reader {
            read,
            header,
            vlrs,
            user_defined_bytes,
            record_kind,
            index: 0,
        })
    }

    /// Returns a reference to this reader's header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The variable length records read so far (evlrs are not consumed by a
    /// streaming reader).
    pub fn vlrs(&self) -> &[Vlr] {
        &self.vlrs
    }

    /// The bytes between the vlrs and the point records.
    pub fn user_defined_bytes(&self) -> &[u8] {
        &self.user_defined_bytes
    }

    /// The resolved shape of this file's point records.
    pub fn record_kind(&self) -> &RecordKind {
        &self.record_kind
    }

    /// Reads one raw point, extra bytes included.
    ///
    /// Returns `Ok(None)` once the declared point count is exhausted.
    pub fn read_raw_point(&mut self) -> Result<Option<raw::Point>> {
        if self.index >= self.header.number_of_points() {
            return Ok(None);
        }
        let point = raw::Point::read_from(
            &mut self.read,
            self.header.point_format(),
            self.record_kind.extra_len(),
        )?;
        if point.is_some() {
            self.index += 1;
        }
        Ok(point)
    }

    /// Reads one point.
    pub fn read_point(&mut self) -> Result<Option<Point>> {
        let transforms = self.header.transforms();
        Ok(self
            .read_raw_point()?
            .map(|raw_point| Point::new(&raw_point, transforms)))
    }

    /// Returns an iterator over this reader's points.
    pub fn points(&mut self) -> PointIterator<'_, R> {
        PointIterator { reader: self }
    }

    pub(crate) fn into_parts(self) -> (Header, Vec<Vlr>, Vec<u8>, RecordKind, R) {
        (
            self.header,
            self.vlrs,
            self.user_defined_bytes,
            self.record_kind,
            self.read,
        )
    }
}

impl Reader<BufReader<File>> {
    /// Creates a reader for a path, buffering the file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Reader<BufReader<File>>> {
        File::open(path)
            .map_err(Error::from)
            .and_then(|file| Reader::new(BufReader::new(file)))
    }
}

/// An iterator over a reader's points.
#[derive(Debug)]
pub struct PointIterator<'a, R> {
    reader: &'a mut Reader<R>,
}

impl<R: Read> Iterator for PointIterator<'_, R> {
    type Item = Result<Point>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_point().transpose()
    }
}

/// The extra-bytes schema among these vlrs, if any.
pub(crate) fn extra_bytes_schema(vlrs: &[Vlr]) -> Option<&ExtraBytes> {
    extract_vlr(vlrs, "LASF_Spec", 4).and_then(|vlr| match vlr.payload() {
        Payload::ExtraBytes(extra_bytes) => Some(extra_bytes),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Dataset, PointCloud};
    use std::io::Cursor;

    #[test]
    fn stream_points() {
        let mut pointcloud = PointCloud::default();
        for i in 0..3 {
            pointcloud.push(&Point {
                x: f64::from(i),
                ..Default::default()
            });
        }
        let dataset = Dataset::new(pointcloud).unwrap();
        let mut cursor = Cursor::new(Vec::new());
        dataset.write_to(&mut cursor).unwrap();
        cursor.set_position(0);

        let mut reader = Reader::new(cursor).unwrap();
        assert_eq!(3, reader.header().number_of_points());
        let points = reader.points().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(3, points.len());
        assert_eq!(2., points[2].x);
        assert!(reader.read_point().unwrap().is_none());
    }
}
