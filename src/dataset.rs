//! The dataset: header, point table, and records, reconciled.

use crate::{
    laz,
    point::{Dimension, Format},
    pointcloud::{ID_COLUMN, UNDOCUMENTED_COLUMN},
    raw,
    reader::{extra_bytes_schema, Reader},
    transform::DEFAULT_SCALE,
    vlr::{self, ExtraBytes, Payload},
    writer, Bounds, Column, Error, Header, Interval, Point, PointCloud, Result, ScalarKind,
    Transform, Vector, Vlr,
};
use log::{info, warn};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write},
    path::Path,
};

/// The absolute tolerance used when comparing float columns and bounds.
const TOLERANCE: f64 = 1e-6;

/// An in-memory las dataset.
///
/// A dataset owns a [Header], a columnar [PointCloud], the (extended)
/// variable length records, and any padding bytes between the vlrs and the
/// point records. Every mutation restores the global invariants: the
/// header's offsets, counters, record length, and format always describe
/// the table and the records exactly, and each user column is documented by
/// the single extra-bytes record.
///
/// ```
/// use std::io::Cursor;
/// use las_dataset::{Dataset, Point, PointCloud};
///
/// let mut pointcloud = PointCloud::with_format(Default::default());
/// pointcloud.push(&Point { x: 1., y: 2., z: 3., ..Default::default() });
/// let mut dataset = Dataset::new(pointcloud).unwrap();
/// dataset.add_column("thing", vec![0.25f64]).unwrap();
///
/// let mut cursor = Cursor::new(Vec::new());
/// dataset.write_to(&mut cursor).unwrap();
/// cursor.set_position(0);
/// let read_back = Dataset::read_from(cursor).unwrap();
/// assert_eq!(dataset, read_back);
/// ```
#[derive(Clone, Debug)]
pub struct Dataset {
    header: Header,
    pointcloud: PointCloud,
    vlrs: Vec<Vlr>,
    evlrs: Vec<Vlr>,
    user_defined_bytes: Vec<u8>,
    unit_conversion: Option<Vector<f64>>,
}

impl Dataset {
    /// Assembles a dataset from a point table, synthesising the header.
    ///
    /// The point format is the smallest one carrying the table's columns,
    /// and offsets are chosen so every position fits a scaled i32 at the
    /// default scale; an unrepresentable table is a scale-out-of-range
    /// error.
    pub fn new(pointcloud: PointCloud) -> Result<Dataset> {
        Dataset::assemble(pointcloud, None, Vec::new(), Vec::new(), Vec::new())
    }

    /// Assembles a dataset with a caller-chosen coordinate resolution.
    pub fn with_scale(pointcloud: PointCloud, scale: f64) -> Result<Dataset> {
        let header = synthesize_header(&pointcloud, scale)?;
        Dataset::assemble(pointcloud, Some(header), Vec::new(), Vec::new(), Vec::new())
    }

    /// Assembles a dataset from parts.
    ///
    /// A supplied header is reconciled — its format is upgraded if the
    /// table carries columns it can't, its transforms are checked against
    /// the table's bounds, and its counters and offsets are recomputed. A
    /// missing header is synthesised. Vlrs pass through the same checks as
    /// [Dataset::add_vlr], and the extra-bytes record is rebuilt from the
    /// table's user columns.
    pub fn assemble(
        pointcloud: PointCloud,
        header: Option<Header>,
        vlrs: Vec<Vlr>,
        evlrs: Vec<Vlr>,
        user_defined_bytes: Vec<u8>,
    ) -> Result<Dataset> {
        let mut header = match header {
            Some(header) => header,
            None => synthesize_header(&pointcloud, DEFAULT_SCALE)?,
        };
        let dimensions = pointcloud.dimensions();
        if !dimensions
            .iter()
            .all(|&dimension| header.point_format().supports(dimension))
        {
            let format = Format::with_dimensions(&dimensions)?;
            warn!(
                "upgrading {} to {} to carry the table's columns",
                header.point_format(),
                format
            );
            header.set_point_format(format)?;
        }
        verify_transforms(header.transforms(), &pointcloud.bounds())?;
        let mut dataset = Dataset {
            header,
            pointcloud,
            vlrs: Vec::new(),
            evlrs: Vec::new(),
            user_defined_bytes,
            unit_conversion: None,
        };
        for vlr in vlrs.into_iter().chain(evlrs) {
            dataset.add_vlr(vlr)?;
        }
        dataset.sync_extra_bytes()?;
        dataset.update_layout()?;
        Ok(dataset)
    }

    /// Reads a dataset from a byte stream.
    ///
    /// The stream must be uncompressed las; `.laz` paths go through
    /// [Dataset::from_path], which shells out to the external tool first.
    pub fn read_from<R: Read + Seek>(mut read: R) -> Result<Dataset> {
        let mut reader = Reader::new(&mut read)?;
        let transforms = reader.header().transforms();
        let mut pointcloud = PointCloud::with_format(reader.header().point_format());
        let schema_columns = reader
            .record_kind()
            .schema()
            .map(|schema| schema.columns())
            .unwrap_or_default();
        for (name, kind, width) in &schema_columns {
            pointcloud.insert_column(name, Column::new(*kind, *width));
        }
        let undocumented = usize::from(reader.record_kind().undocumented());
        if undocumented > 0 {
            pointcloud.insert_column(
                UNDOCUMENTED_COLUMN,
                Column::new(ScalarKind::U8, undocumented),
            );
        }
        while let Some(raw_point) = reader.read_raw_point()? {
            let point = Point::new(&raw_point, transforms);
            pointcloud.push_standard(&point);
            let mut offset = 0;
            for (name, kind, width) in &schema_columns {
                let size = kind.size() * width;
                if let Some(column) = pointcloud.column_mut(name) {
                    column.push_row_bytes(&raw_point.extra_bytes[offset..offset + size]);
                }
                offset += size;
            }
            if undocumented > 0 {
                if let Some(column) = pointcloud.column_mut(UNDOCUMENTED_COLUMN) {
                    column.push_row_bytes(&raw_point.extra_bytes[offset..]);
                }
            }
        }
        let (header, vlrs, user_defined_bytes, _, _) = reader.into_parts();
        if header.number_of_points() != pointcloud.len() as u64 {
            warn!(
                "the header declares {} points but the stream held {}",
                header.number_of_points(),
                pointcloud.len()
            );
        }
        let mut evlrs = Vec::new();
        if header.number_of_evlrs() > 0 {
            if let Some(start) = header.start_of_first_evlr() {
                let _ = read.seek(SeekFrom::Start(start))?;
            }
            for _ in 0..header.number_of_evlrs() {
                let raw_vlr = raw::Vlr::read_from(&mut read, true)?;
                evlrs.push(Vlr::from_raw(raw_vlr, vlr::global())?);
            }
        }
        let mut dataset = Dataset {
            header,
            pointcloud,
            vlrs,
            evlrs,
            user_defined_bytes,
            unit_conversion: None,
        };
        dataset.update_layout()?;
        dataset.apply_unit_conversion();
        Ok(dataset)
    }

    /// Writes this dataset to a byte stream: header, vlrs, padding, point
    /// records, evlrs, in that order.
    ///
    /// If a unit conversion was applied on read, coordinates are emitted in
    /// their original unit.
    pub fn write_to<W: Write>(&self, mut write: W) -> Result<()> {
        writer::write_dataset(
            &self.header,
            &self.pointcloud,
            &self.vlrs,
            &self.evlrs,
            &self.user_defined_bytes,
            self.unit_conversion,
            &mut write,
        )
    }

    /// Reads a dataset from a path, decompressing `.laz` via the external
    /// tool.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Dataset> {
        let path = path.as_ref();
        if laz::is_laz_path(path) {
            let tempfile = laz::decompress(path)?;
            Dataset::read_from(BufReader::new(File::open(tempfile.path())?))
        } else {
            Dataset::read_from(BufReader::new(File::open(path)?))
        }
    }

    /// Writes a dataset to a path, compressing via the external tool when
    /// the extension is `.laz`.
    pub fn to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if laz::is_laz_path(path) {
            if self.pointcloud.user_columns().next().is_some() {
                warn!("user columns are passed to the external compressor as opaque extra bytes");
            }
            let tempfile = laz::las_tempfile()?;
            {
                let mut write = BufWriter::new(File::create(tempfile.path())?);
                self.write_to(&mut write)?;
                write.flush()?;
            }
            laz::compress(tempfile.path(), path)
        } else {
            let mut write = BufWriter::new(File::create(path)?);
            self.write_to(&mut write)?;
            write.flush()?;
            Ok(())
        }
    }

    /// This dataset's header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// This dataset's point table.
    pub fn pointcloud(&self) -> &PointCloud {
        &self.pointcloud
    }

    /// The variable length records, in insertion order.
    pub fn vlrs(&self) -> &[Vlr] {
        &self.vlrs
    }

    /// The extended variable length records, in insertion order.
    pub fn evlrs(&self) -> &[Vlr] {
        &self.evlrs
    }

    /// The bytes between the vlrs and the point records.
    pub fn user_defined_bytes(&self) -> &[u8] {
        &self.user_defined_bytes
    }

    /// The unit conversion applied on read, if any.
    pub fn unit_conversion(&self) -> Option<Vector<f64>> {
        self.unit_conversion
    }

    /// The number of points.
    pub fn len(&self) -> usize {
        self.pointcloud.len()
    }

    /// Returns true if the dataset holds no points.
    pub fn is_empty(&self) -> bool {
        self.pointcloud.is_empty()
    }

    /// The point at `index`.
    pub fn point(&self, index: usize) -> Point {
        self.pointcloud.point(index)
    }

    /// Looks a column up by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.pointcloud.column(name)
    }

    /// Adds a column to the table.
    ///
    /// A recognised las column name may upgrade the point format (and with
    /// it the version), with a warning. Anything else becomes a user column
    /// documented in the extra-bytes record:
    ///
    /// ```
    /// use las_dataset::{Dataset, Point, PointCloud};
    ///
    /// let mut pointcloud = PointCloud::with_format(Default::default());
    /// pointcloud.push(&Point::default());
    /// let mut dataset = Dataset::new(pointcloud).unwrap();
    ///
    /// dataset.add_column("thing", vec![1.5f64]).unwrap();
    /// assert!(dataset.add_column("thing", vec![2.5f64]).is_err());
    /// assert!(dataset.add_column("other", vec![1.0f64, 2.0]).is_err()); // wrong length
    /// ```
    pub fn add_column<C: Into<Column>>(&mut self, name: &str, values: C) -> Result<()> {
        let column = values.into();
        self.verify_new_column(name, &column)?;
        if self.pointcloud.column(name).is_some() {
            return Err(Error::DuplicateColumn(name.to_string()));
        }
        if let Some(dimension) = Dimension::from_name(name) {
            self.upgrade_format_for(dimension)?;
        } else if name != UNDOCUMENTED_COLUMN {
            self.document_user_column(name, column.kind(), column.width())?;
        }
        self.pointcloud.insert_column(name, column);
        self.update_layout()
    }

    /// Adds a column, or overwrites it in place when it already exists.
    pub fn merge_column<C: Into<Column>>(&mut self, name: &str, values: C) -> Result<()> {
        if self.pointcloud.column(name).is_none() {
            return self.add_column(name, values);
        }
        let column = values.into();
        self.verify_new_column(name, &column)?;
        if Dimension::from_name(name).is_none() && name != UNDOCUMENTED_COLUMN {
            let mut extra_bytes = self.extra_bytes_payload().cloned().unwrap_or_default();
            let _ = extra_bytes.replace_column(name, column.kind(), column.width())?;
            self.set_extra_bytes_payload(extra_bytes)?;
        }
        let _ = self.pointcloud.replace_column(name, column);
        self.update_layout()
    }

    /// Removes a user column (or the undocumented bytes) from the table.
    pub fn remove_column(&mut self, name: &str) -> Result<Column> {
        if name == ID_COLUMN || Dimension::from_name(name).is_some() {
            return Err(Error::UnsupportedUserType {
                name: name.to_string(),
                reason: "standard columns cannot be removed".to_string(),
            });
        }
        let column = self
            .pointcloud
            .remove_column(name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))?;
        if name != UNDOCUMENTED_COLUMN {
            let mut extra_bytes = self.extra_bytes_payload().cloned().unwrap_or_default();
            if extra_bytes.remove_column(name) {
                self.set_extra_bytes_payload(extra_bytes)?;
            }
        }
        self.update_layout()?;
        Ok(column)
    }

    /// Adds a (possibly extended) variable length record.
    ///
    /// Adding an evlr to a pre-1.4 dataset upgrades the version with a
    /// warning; adding a WKT record sets the global-encoding bit.
    pub fn add_vlr(&mut self, vlr: Vlr) -> Result<()> {
        if !vlr.is_superseded() {
            if let Some(existing) = self
                .all_vlrs()
                .find(|existing| {
                    !existing.is_superseded() && existing.matches(vlr.user_id(), vlr.record_id())
                })
            {
                return Err(Error::DuplicateVlrId {
                    user_id: existing.user_id().to_string(),
                    record_id: existing.record_id(),
                });
            }
        }
        let needs_1_4 = (vlr.is_extended() || vlr.matches("LASF_Projection", 2112))
            && self.header.version() < crate::Version::new(1, 4);
        if needs_1_4 {
            warn!(
                "upgrading las {} to 1.4 to carry the {}/{} record",
                self.header.version(),
                vlr.user_id(),
                vlr.record_id()
            );
            self.header.set_version(crate::Version::new(1, 4))?;
        }
        let is_wkt = vlr.matches("LASF_Projection", 2112);
        if vlr.is_extended() {
            self.evlrs.push(vlr);
        } else {
            self.vlrs.push(vlr);
        }
        if is_wkt {
            self.header.set_wkt_crs(true)?;
        }
        self.update_layout()
    }

    /// Removes the record with these ids, reversing [Dataset::add_vlr].
    pub fn remove_vlr(&mut self, user_id: &str, record_id: u16) -> Result<Vlr> {
        let vlr = if let Some(position) = self
            .vlrs
            .iter()
            .position(|vlr| vlr.matches(user_id, record_id))
        {
            self.vlrs.remove(position)
        } else if let Some(position) = self
            .evlrs
            .iter()
            .position(|vlr| vlr.matches(user_id, record_id))
        {
            self.evlrs.remove(position)
        } else {
            return Err(Error::VlrNotFound {
                user_id: user_id.to_string(),
                record_id,
            });
        };
        let any_wkt = self
            .all_vlrs()
            .any(|vlr| vlr.matches("LASF_Projection", 2112));
        if !any_wkt && !self.header.point_format().is_extended {
            self.header.set_wkt_crs(false)?;
        }
        self.update_layout()?;
        Ok(vlr)
    }

    /// Marks the record with these ids superseded, rewriting its record id
    /// to 7 in place.
    pub fn set_superseded(&mut self, user_id: &str, record_id: u16) -> Result<()> {
        let vlr = self
            .vlrs
            .iter_mut()
            .chain(self.evlrs.iter_mut())
            .find(|vlr| !vlr.is_superseded() && vlr.matches(user_id, record_id))
            .ok_or_else(|| Error::VlrNotFound {
                user_id: user_id.to_string(),
                record_id,
            })?;
        vlr.set_superseded()
    }

    /// Appends points to the table.
    ///
    /// Columns the points don't carry — user columns, and standard columns
    /// their optionals leave out — are filled with zeros of their type.
    pub fn add_points(&mut self, points: &[Point]) -> Result<()> {
        let new_len = self.pointcloud.len() + points.len();
        let mut check = self.header.clone();
        check.set_number_of_points(new_len as u64)?;
        let mut bounds = self.pointcloud.bounds();
        for point in points {
            bounds.grow(point.position());
        }
        verify_transforms(self.header.transforms(), &bounds)?;
        let user_columns = self.pointcloud.user_columns().count();
        if user_columns > 0 && !points.is_empty() {
            warn!(
                "zero-filling {} user column(s) for {} appended point(s)",
                user_columns,
                points.len()
            );
        }
        for point in points {
            self.pointcloud.push(point);
        }
        self.update_layout()
    }

    /// Deletes the points at the given indices and recomputes the counts
    /// and bounds.
    pub fn remove_points(&mut self, indices: &[usize]) -> Result<()> {
        self.pointcloud.remove(indices);
        self.update_layout()
    }

    fn all_vlrs(&self) -> impl Iterator<Item = &Vlr> {
        self.vlrs.iter().chain(self.evlrs.iter())
    }

    /// The non-superseded extra-bytes payload, if any.
    fn extra_bytes_payload(&self) -> Option<&ExtraBytes> {
        extra_bytes_schema(&self.vlrs)
    }

    fn set_extra_bytes_payload(&mut self, extra_bytes: ExtraBytes) -> Result<()> {
        if let Some(vlr) = self
            .vlrs
            .iter_mut()
            .find(|vlr| vlr.matches("LASF_Spec", 4))
        {
            vlr.set_payload(extra_bytes.into())
        } else {
            self.add_vlr(Vlr::new(
                "LASF_Spec",
                4,
                "extra bytes",
                extra_bytes.into(),
            )?)
        }
    }

    /// Rebuilds the extra-bytes record to match the table's user columns.
    fn sync_extra_bytes(&mut self) -> Result<()> {
        let mut expected = ExtraBytes::new();
        for (name, column) in self.pointcloud.user_columns() {
            expected.push_column(name, column.kind(), column.width())?;
        }
        let (up_to_date, exists) = {
            let current = self.extra_bytes_payload();
            (current == Some(&expected), current.is_some())
        };
        if up_to_date {
            return Ok(());
        }
        if expected.entries().is_empty() {
            if exists {
                warn!("dropping an extra-bytes record that documents no column");
                let _ = self.remove_vlr("LASF_Spec", 4)?;
            }
            return Ok(());
        }
        if exists {
            warn!("rebuilding the extra-bytes record to match the table's user columns");
        }
        self.set_extra_bytes_payload(expected)
    }

    /// Checks a column against the table before any mutation happens.
    fn verify_new_column(&self, name: &str, column: &Column) -> Result<()> {
        if column.len() != self.pointcloud.len() {
            return Err(Error::LengthMismatch {
                name: name.to_string(),
                len: column.len(),
                expected: self.pointcloud.len(),
            });
        }
        if column.width() == 0 {
            return Err(Error::UnsupportedUserType {
                name: name.to_string(),
                reason: "zero-width vector columns cannot be stored".to_string(),
            });
        }
        if name == UNDOCUMENTED_COLUMN && column.kind() != ScalarKind::U8 {
            return Err(Error::UnsupportedUserType {
                name: name.to_string(),
                reason: format!("undocumented bytes must be u8, not {}", column.kind()),
            });
        }
        if let Some(dimension) = Dimension::from_name(name) {
            if column.kind() != dimension.kind() || column.width() != dimension.width() {
                return Err(Error::UnsupportedUserType {
                    name: name.to_string(),
                    reason: format!(
                        "the {} column stores {} x{}, not {} x{}",
                        name,
                        dimension.kind(),
                        dimension.width(),
                        column.kind(),
                        column.width()
                    ),
                });
            }
        }
        let new_record_length = usize::from(self.header.point_format().len())
            + self.pointcloud.user_bytes_per_point()
            + self.pointcloud.undocumented_bytes_per_point()
            + column.element_size();
        if new_record_length > usize::from(u16::MAX) {
            return Err(Error::InconsistentRecordLength {
                len: u16::MAX,
                required: u16::MAX,
            });
        }
        Ok(())
    }

    /// Upgrades the point format (warning) so it carries this dimension.
    fn upgrade_format_for(&mut self, dimension: Dimension) -> Result<()> {
        if self.header.point_format().supports(dimension) {
            return Ok(());
        }
        let mut dimensions = self.pointcloud.dimensions();
        dimensions.push(dimension);
        let format = Format::with_dimensions(&dimensions)?;
        warn!(
            "upgrading {} to {} to carry column {:?}",
            self.header.point_format(),
            format,
            dimension.name()
        );
        self.header.set_point_format(format)
    }

    /// Appends this column to the extra-bytes record, creating the record
    /// if it doesn't exist yet.
    fn document_user_column(&mut self, name: &str, kind: ScalarKind, width: usize) -> Result<()> {
        let mut extra_bytes = self.extra_bytes_payload().cloned().unwrap_or_default();
        extra_bytes.push_column(name, kind, width)?;
        self.set_extra_bytes_payload(extra_bytes)
    }

    /// Recomputes every derived header field from the dataset's parts.
    fn update_layout(&mut self) -> Result<()> {
        self.header
            .set_number_of_points(self.pointcloud.len() as u64)?;
        self.header
            .set_number_of_points_by_return(self.pointcloud.points_by_return());
        self.header.set_bounds(self.pointcloud.bounds());
        let record_length = usize::from(self.header.point_format().len())
            + self.pointcloud.user_bytes_per_point()
            + self.pointcloud.undocumented_bytes_per_point();
        if record_length > usize::from(u16::MAX) {
            return Err(Error::InconsistentRecordLength {
                len: u16::MAX,
                required: u16::MAX,
            });
        }
        self.header
            .set_point_data_record_length(record_length as u16)?;
        self.header.set_number_of_vlrs(self.vlrs.len() as u32);
        let vlr_bytes: u64 = self.vlrs.iter().map(Vlr::len).sum();
        let offset =
            u64::from(self.header.size()) + vlr_bytes + self.user_defined_bytes.len() as u64;
        if offset > u64::from(u32::MAX) {
            return Err(Error::InconsistentHeader(format!(
                "the point data offset ({}) does not fit a u32",
                offset
            )));
        }
        self.header.set_offset_to_point_data(offset as u32);
        self.header.set_number_of_evlrs(self.evlrs.len() as u32);
        let start_of_first_evlr = if self.evlrs.is_empty() {
            None
        } else {
            Some(
                offset
                    + self.pointcloud.len() as u64
                        * u64::from(self.header.point_data_record_length()),
            )
        };
        self.header.set_start_of_first_evlr(start_of_first_evlr);
        Ok(())
    }

    /// Converts positions to metres when the WKT record names a non-metric
    /// linear unit, remembering the factors so writes can reverse them.
    fn apply_unit_conversion(&mut self) {
        let conversion = self.all_vlrs().find_map(|vlr| match vlr.payload() {
            Payload::OgcWkt(wkt) if !vlr.is_superseded() => wkt.conversion_to_metres(),
            _ => None,
        });
        if let Some(factors) = conversion {
            info!(
                "converting positions to metres (factors {}, {}, {})",
                factors.x, factors.y, factors.z
            );
            self.pointcloud.scale_positions(factors);
            let transforms = self.header.transforms();
            self.header.set_transforms(Vector {
                x: multiply(transforms.x, factors.x),
                y: multiply(transforms.y, factors.y),
                z: multiply(transforms.z, factors.z),
            });
            self.header.set_bounds(self.pointcloud.bounds());
            self.unit_conversion = Some(factors);
        }
    }
}

impl PartialEq for Dataset {
    fn eq(&self, other: &Dataset) -> bool {
        headers_eq(&self.header, &other.header, TOLERANCE)
            && self.pointcloud.approx_eq(&other.pointcloud, TOLERANCE)
            && vlr_set_eq(&self.vlrs, &other.vlrs)
            && vlr_set_eq(&self.evlrs, &other.evlrs)
            && self.user_defined_bytes == other.user_defined_bytes
    }
}

fn vlr_set_eq(a: &[Vlr], b: &[Vlr]) -> bool {
    a.len() == b.len() && a.iter().all(|vlr| b.contains(vlr))
}

fn headers_eq(a: &Header, b: &Header, tolerance: f64) -> bool {
    let bounds_eq = {
        let (a, b) = (a.bounds(), b.bounds());
        let close = |a: f64, b: f64| (a - b).abs() <= tolerance || (!a.is_finite() && !b.is_finite());
        close(a.min.x, b.min.x)
            && close(a.min.y, b.min.y)
            && close(a.min.z, b.min.z)
            && close(a.max.x, b.max.x)
            && close(a.max.y, b.max.y)
            && close(a.max.z, b.max.z)
    };
    a.file_source_id() == b.file_source_id()
        && a.global_encoding() == b.global_encoding()
        && a.guid() == b.guid()
        && a.version() == b.version()
        && a.system_identifier() == b.system_identifier()
        && a.generating_software() == b.generating_software()
        && a.date() == b.date()
        && a.size() == b.size()
        && a.offset_to_point_data() == b.offset_to_point_data()
        && a.number_of_vlrs() == b.number_of_vlrs()
        && a.point_format() == b.point_format()
        && a.point_data_record_length() == b.point_data_record_length()
        && a.number_of_points() == b.number_of_points()
        && a.number_of_points_by_return() == b.number_of_points_by_return()
        && a.transforms() == b.transforms()
        && bounds_eq
        && a.start_of_first_evlr() == b.start_of_first_evlr()
        && a.number_of_evlrs() == b.number_of_evlrs()
}

/// Builds a header for a table: smallest sufficient format, rounded offsets.
fn synthesize_header(pointcloud: &PointCloud, scale: f64) -> Result<Header> {
    let mut header = Header::default();
    let format = Format::with_dimensions(&pointcloud.dimensions())?;
    header.set_point_format(format)?;
    let bounds = pointcloud.bounds();
    let transform_for = |interval: Interval<f64>| -> Result<Transform> {
        if interval.min.is_finite() {
            Transform::suggested(interval, scale)
        } else {
            Ok(Transform { scale, offset: 0. })
        }
    };
    header.set_transforms(Vector {
        x: transform_for(bounds.x())?,
        y: transform_for(bounds.y())?,
        z: transform_for(bounds.z())?,
    });
    Ok(header)
}

/// Checks that every bound endpoint fits a scaled i32 under these
/// transforms.
fn verify_transforms(transforms: Vector<Transform>, bounds: &Bounds) -> Result<()> {
    for (transform, interval) in [
        (transforms.x, bounds.x()),
        (transforms.y, bounds.y()),
        (transforms.z, bounds.z()),
    ] {
        for endpoint in [interval.min, interval.max] {
            if !endpoint.is_finite() {
                continue;
            }
            let raw = ((endpoint - transform.offset) / transform.scale).round();
            if raw > f64::from(i32::MAX) || raw < f64::from(i32::MIN) {
                return Err(Error::ScaleOutOfRange {
                    coordinate: endpoint,
                    scale: transform.scale,
                });
            }
        }
    }
    Ok(())
}

fn multiply(transform: Transform, factor: f64) -> Transform {
    Transform {
        scale: transform.scale * factor,
        offset: transform.offset * factor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vlr::TextAreaDescription;

    fn dataset_with_points(n: u32) -> Dataset {
        let mut pointcloud = PointCloud::default();
        for i in 0..n {
            pointcloud.push(&Point {
                x: f64::from(i),
                y: f64::from(i),
                z: f64::from(i),
                ..Default::default()
            });
        }
        Dataset::new(pointcloud).unwrap()
    }

    fn text_vlr(text: &str) -> Vlr {
        Vlr::new(
            "LASF_Spec",
            3,
            "",
            TextAreaDescription(text.to_string()).into(),
        )
        .unwrap()
    }

    #[test]
    fn layout_invariants() {
        let mut dataset = dataset_with_points(10);
        assert_eq!(227, dataset.header().offset_to_point_data());
        assert_eq!(10, dataset.header().number_of_points());
        dataset.add_vlr(text_vlr("hello")).unwrap();
        assert_eq!(227 + 54 + 5, dataset.header().offset_to_point_data());
        assert_eq!(1, dataset.header().number_of_vlrs());
    }

    #[test]
    fn add_column_documents_extra_bytes() {
        let mut dataset = dataset_with_points(3);
        dataset.add_column("thing", vec![1.0f64, 2., 3.]).unwrap();
        assert_eq!(28, dataset.header().point_data_record_length());
        let extra_bytes = dataset.extra_bytes_payload().unwrap();
        assert_eq!(1, extra_bytes.entries().len());
        assert_eq!("thing", extra_bytes.entries()[0].name);
    }

    #[test]
    fn remove_column_undoes_add() {
        let mut dataset = dataset_with_points(3);
        dataset.add_column("thing", vec![1.0f64, 2., 3.]).unwrap();
        let column = dataset.remove_column("thing").unwrap();
        assert_eq!(3, column.len());
        assert_eq!(20, dataset.header().point_data_record_length());
        assert!(dataset.remove_column("thing").is_err());
        assert!(dataset.remove_column("position").is_err());
    }

    #[test]
    fn merge_overwrites_in_place() {
        let mut dataset = dataset_with_points(2);
        dataset.add_column("thing", vec![1.0f64, 2.]).unwrap();
        dataset.merge_column("thing", vec![3i16, 4]).unwrap();
        assert_eq!(Some(&[3, 4][..]), dataset.column("thing").unwrap().as_i16());
        assert_eq!(22, dataset.header().point_data_record_length());
    }

    #[test]
    fn duplicate_vlrs_are_rejected() {
        let mut dataset = dataset_with_points(1);
        dataset.add_vlr(text_vlr("a")).unwrap();
        assert!(matches!(
            dataset.add_vlr(text_vlr("b")).unwrap_err(),
            Error::DuplicateVlrId { .. }
        ));
    }

    #[test]
    fn superseded_vlrs_make_room() {
        let mut dataset = dataset_with_points(1);
        dataset.add_vlr(text_vlr("a")).unwrap();
        dataset.set_superseded("LASF_Spec", 3).unwrap();
        dataset.add_vlr(text_vlr("b")).unwrap();
        assert_eq!(2, dataset.vlrs().len());
        assert_eq!(vlr::SUPERSEDED_RECORD_ID, dataset.vlrs()[0].record_id());
        let found = vlr::extract_vlr(dataset.vlrs(), "LASF_Spec", 3).unwrap();
        assert_eq!(
            &Payload::TextAreaDescription(TextAreaDescription("b".to_string())),
            found.payload()
        );
    }

    #[test]
    fn evlr_upgrades_version() {
        let mut dataset = dataset_with_points(1);
        let evlr = Vlr::new_extended("ACME", 1, "", Payload::Bytes(vec![1, 2, 3])).unwrap();
        dataset.add_vlr(evlr).unwrap();
        assert_eq!(crate::Version::new(1, 4), dataset.header().version());
        assert_eq!(1, dataset.header().number_of_evlrs());
        let expected = u64::from(dataset.header().offset_to_point_data()) + 20;
        assert_eq!(Some(expected), dataset.header().start_of_first_evlr());
    }

    #[test]
    fn add_points_recounts() {
        let mut dataset = dataset_with_points(2);
        dataset
            .add_points(&[Point {
                x: 10.,
                y: -3.,
                z: 0.5,
                return_number: 2,
                ..Default::default()
            }])
            .unwrap();
        assert_eq!(3, dataset.header().number_of_points());
        assert_eq!(1, dataset.header().number_of_points_by_return()[1]);
        assert_eq!(10., dataset.header().bounds().max.x);
        assert_eq!(-3., dataset.header().bounds().min.y);
    }

    #[test]
    fn remove_points_recounts() {
        let mut dataset = dataset_with_points(5);
        dataset.remove_points(&[0, 4]).unwrap();
        assert_eq!(3, dataset.header().number_of_points());
        assert_eq!(1., dataset.header().bounds().min.x);
        assert_eq!(3., dataset.header().bounds().max.x);
    }

    #[test]
    fn bounds_enclose_points() {
        let dataset = dataset_with_points(10);
        let bounds = dataset.header().bounds();
        for i in 0..dataset.len() {
            assert!(bounds.contains(dataset.pointcloud().position(i)));
        }
    }

    #[test]
    fn wkt_vlr_sets_bit() {
        let mut dataset = dataset_with_points(1);
        let wkt = Vlr::new(
            "LASF_Projection",
            2112,
            "",
            vlr::OgcWkt::new(r#"PROJCS["p",UNIT["metre",1]]"#).into(),
        )
        .unwrap();
        dataset.add_vlr(wkt).unwrap();
        assert!(dataset.header().has_wkt_crs().unwrap());
        let _ = dataset.remove_vlr("LASF_Projection", 2112).unwrap();
        assert!(!dataset.header().has_wkt_crs().unwrap());
    }
}
