//! Serialise a dataset: header, vlrs, padding, one point buffer, evlrs.
//!
//! The point buffer is assembled column by column: each wire field gets a
//! byte-stride template over the whole buffer and its column's raw bytes
//! are scattered into the computed slots. This keeps the hot path at one
//! pass per field instead of one write per field per point.

use crate::{
    color,
    point::Dimension,
    pointcloud::UNDOCUMENTED_COLUMN,
    raw::ScanAngle,
    Column, Error, Header, PointCloud, Result, Transform, Vector, Vlr,
};
use std::io::Write;

pub(crate) fn write_dataset<W: Write>(
    header: &Header,
    pointcloud: &PointCloud,
    vlrs: &[Vlr],
    evlrs: &[Vlr],
    user_defined_bytes: &[u8],
    unit_conversion: Option<Vector<f64>>,
    write: &mut W,
) -> Result<()> {
    let disk_header = match unit_conversion {
        Some(factors) => reverse_conversion(header, factors),
        None => header.clone(),
    };
    disk_header.to_raw()?.write_to(&mut *write)?;
    for vlr in vlrs {
        vlr.to_raw()?.write_to(&mut *write)?;
    }
    write.write_all(user_defined_bytes)?;
    let buffer = point_buffer(header, pointcloud)?;
    write.write_all(&buffer)?;
    for evlr in evlrs {
        evlr.to_raw()?.write_to(&mut *write)?;
    }
    Ok(())
}

/// Rewrites the header's transforms and bounds in the file's original unit.
///
/// Raw coordinates are unchanged by unit conversion (both the positions and
/// the transforms were multiplied by the same factors), so only the header
/// fields need to move back.
fn reverse_conversion(header: &Header, factors: Vector<f64>) -> Header {
    let mut header = header.clone();
    let transforms = header.transforms();
    header.set_transforms(Vector {
        x: divide(transforms.x, factors.x),
        y: divide(transforms.y, factors.y),
        z: divide(transforms.z, factors.z),
    });
    let mut bounds = header.bounds();
    bounds.min.x /= factors.x;
    bounds.max.x /= factors.x;
    bounds.min.y /= factors.y;
    bounds.max.y /= factors.y;
    bounds.min.z /= factors.z;
    bounds.max.z /= factors.z;
    header.set_bounds(bounds);
    header
}

fn divide(transform: Transform, factor: f64) -> Transform {
    Transform {
        scale: transform.scale / factor,
        offset: transform.offset / factor,
    }
}

/// Assembles every point record into a single buffer, column by column.
pub(crate) fn point_buffer(header: &Header, pointcloud: &PointCloud) -> Result<Vec<u8>> {
    let format = header.point_format();
    let record_length = usize::from(header.point_data_record_length());
    let n = pointcloud.len();
    let mut buffer = vec![0; n * record_length];
    let mut offset = 0;

    let u8_column = |dimension: Dimension| {
        pointcloud
            .column(dimension.name())
            .and_then(Column::as_u8)
    };
    let u8_value = |column: Option<&[u8]>, i: usize| column.map(|s| s[i]).unwrap_or(0);
    let f64_value = |column: Option<&[f64]>, i: usize| column.map(|s| s[i]).unwrap_or(0.);

    // positions
    let positions = pointcloud
        .column(Dimension::Position.name())
        .and_then(Column::as_f64);
    let transforms = header.transforms();
    for (lane, transform) in [transforms.x, transforms.y, transforms.z].iter().enumerate() {
        scatter(&mut buffer, offset, record_length, 4, |i, out| {
            let position = positions.map(|s| s[i * 3 + lane]).unwrap_or(0.);
            out.copy_from_slice(&transform.inverse_clamped(position).to_le_bytes());
        });
        offset += 4;
    }

    // intensity
    let intensity = pointcloud
        .column(Dimension::Intensity.name())
        .and_then(Column::as_f64);
    scatter(&mut buffer, offset, record_length, 2, |i, out| {
        out.copy_from_slice(&color::denormalize(f64_value(intensity, i)).to_le_bytes());
    });
    offset += 2;

    // the packed flag and classification bytes
    let return_numbers = u8_column(Dimension::ReturnNumber);
    let numbers_of_returns = u8_column(Dimension::NumberOfReturns);
    let scan_directions = u8_column(Dimension::ScanDirection);
    let edges = u8_column(Dimension::EdgeOfFlightLine);
    let synthetics = u8_column(Dimension::Synthetic);
    let key_points = u8_column(Dimension::KeyPoint);
    let withhelds = u8_column(Dimension::Withheld);
    let overlaps = u8_column(Dimension::Overlap);
    let scanner_channels = u8_column(Dimension::ScannerChannel);
    let classifications = u8_column(Dimension::Classification);
    let scan_angles = pointcloud
        .column(Dimension::ScanAngle.name())
        .and_then(Column::as_f32);
    let user_data = u8_column(Dimension::UserData);
    let point_source_ids = pointcloud
        .column(Dimension::PointSourceId.name())
        .and_then(Column::as_u16);

    if format.is_extended {
        scatter(&mut buffer, offset, record_length, 1, |i, out| {
            out[0] = u8_value(return_numbers, i).min(15)
                | u8_value(numbers_of_returns, i).min(15) << 4;
        });
        offset += 1;
        scatter(&mut buffer, offset, record_length, 1, |i, out| {
            out[0] = u8_value(synthetics, i).min(1)
                | u8_value(key_points, i).min(1) << 1
                | u8_value(withhelds, i).min(1) << 2
                | u8_value(overlaps, i).min(1) << 3
                | u8_value(scanner_channels, i).min(3) << 4
                | u8_value(scan_directions, i).min(1) << 6
                | u8_value(edges, i).min(1) << 7;
        });
        offset += 1;
        scatter(&mut buffer, offset, record_length, 1, |i, out| {
            out[0] = u8_value(classifications, i);
        });
        offset += 1;
        scatter(&mut buffer, offset, record_length, 1, |i, out| {
            out[0] = u8_value(user_data, i);
        });
        offset += 1;
        scatter(&mut buffer, offset, record_length, 2, |i, out| {
            let scan_angle = scan_angles.map(|s| s[i]).unwrap_or(0.);
            let raw = match ScanAngle::from_degrees(scan_angle, true) {
                ScanAngle::Scaled(n) => n,
                ScanAngle::Rank(n) => i16::from(n),
            };
            out.copy_from_slice(&raw.to_le_bytes());
        });
        offset += 2;
        scatter(&mut buffer, offset, record_length, 2, |i, out| {
            out.copy_from_slice(&point_source_ids.map(|s| s[i]).unwrap_or(0).to_le_bytes());
        });
        offset += 2;
    } else {
        scatter(&mut buffer, offset, record_length, 1, |i, out| {
            out[0] = u8_value(return_numbers, i).min(5)
                | u8_value(numbers_of_returns, i).min(5) << 3
                | u8_value(scan_directions, i).min(1) << 6
                | u8_value(edges, i).min(1) << 7;
        });
        offset += 1;
        scatter(&mut buffer, offset, record_length, 1, |i, out| {
            out[0] = (u8_value(classifications, i) & 0x1F)
                | u8_value(synthetics, i).min(1) << 5
                | u8_value(key_points, i).min(1) << 6
                | u8_value(withhelds, i).min(1) << 7;
        });
        offset += 1;
        scatter(&mut buffer, offset, record_length, 1, |i, out| {
            let scan_angle = scan_angles.map(|s| s[i]).unwrap_or(0.);
            let raw = match ScanAngle::from_degrees(scan_angle, false) {
                ScanAngle::Rank(n) => n,
                ScanAngle::Scaled(_) => 0,
            };
            out[0] = raw.to_le_bytes()[0];
        });
        offset += 1;
        scatter(&mut buffer, offset, record_length, 1, |i, out| {
            out[0] = u8_value(user_data, i);
        });
        offset += 1;
        scatter(&mut buffer, offset, record_length, 2, |i, out| {
            out.copy_from_slice(&point_source_ids.map(|s| s[i]).unwrap_or(0).to_le_bytes());
        });
        offset += 2;
    }

    if format.has_gps_time {
        let gps_times = pointcloud
            .column(Dimension::GpsTime.name())
            .and_then(Column::as_f64);
        scatter(&mut buffer, offset, record_length, 8, |i, out| {
            out.copy_from_slice(&f64_value(gps_times, i).to_le_bytes());
        });
        offset += 8;
    }

    if format.has_color {
        let colors = pointcloud
            .column(Dimension::Color.name())
            .and_then(Column::as_f64);
        for lane in 0..3 {
            scatter(&mut buffer, offset, record_length, 2, |i, out| {
                let channel = colors.map(|s| s[i * 3 + lane]).unwrap_or(0.);
                out.copy_from_slice(&color::denormalize(channel).to_le_bytes());
            });
            offset += 2;
        }
    }

    if format.has_nir {
        let nirs = pointcloud
            .column(Dimension::Nir.name())
            .and_then(Column::as_f64);
        scatter(&mut buffer, offset, record_length, 2, |i, out| {
            out.copy_from_slice(&color::denormalize(f64_value(nirs, i)).to_le_bytes());
        });
        offset += 2;
    }

    if format.has_waveform {
        offset = waveform_fields(&mut buffer, offset, record_length, pointcloud);
    }

    // documented user fields, in schema order
    for (_, column) in pointcloud.user_columns() {
        let size = column.element_size();
        scatter(&mut buffer, offset, record_length, size, |i, out| {
            column.write_row(i, out);
        });
        offset += size;
    }

    // undocumented trailing bytes
    if let Some(column) = pointcloud.column(UNDOCUMENTED_COLUMN) {
        let size = column.element_size();
        scatter(&mut buffer, offset, record_length, size, |i, out| {
            column.write_row(i, out);
        });
        offset += size;
    }

    if offset != record_length && n > 0 {
        return Err(Error::InconsistentRecordLength {
            len: record_length as u16,
            required: offset as u16,
        });
    }
    Ok(buffer)
}

fn waveform_fields(
    buffer: &mut [u8],
    mut offset: usize,
    record_length: usize,
    pointcloud: &PointCloud,
) -> usize {
    let descriptor_indices = pointcloud
        .column(Dimension::WavePacketDescriptorIndex.name())
        .and_then(Column::as_u8);
    scatter(buffer, offset, record_length, 1, |i, out| {
        out[0] = descriptor_indices.map(|s| s[i]).unwrap_or(0);
    });
    offset += 1;
    let data_offsets = pointcloud
        .column(Dimension::WaveDataOffset.name())
        .and_then(Column::as_u64);
    scatter(buffer, offset, record_length, 8, |i, out| {
        out.copy_from_slice(&data_offsets.map(|s| s[i]).unwrap_or(0).to_le_bytes());
    });
    offset += 8;
    let packet_sizes = pointcloud
        .column(Dimension::WavePacketSize.name())
        .and_then(Column::as_u32);
    scatter(buffer, offset, record_length, 4, |i, out| {
        out.copy_from_slice(&packet_sizes.map(|s| s[i]).unwrap_or(0).to_le_bytes());
    });
    offset += 4;
    let return_points = pointcloud
        .column(Dimension::WaveReturnPoint.name())
        .and_then(Column::as_f32);
    scatter(buffer, offset, record_length, 4, |i, out| {
        out.copy_from_slice(&return_points.map(|s| s[i]).unwrap_or(0.).to_le_bytes());
    });
    offset += 4;
    let parameters = pointcloud
        .column(Dimension::WaveParameters.name())
        .and_then(Column::as_f32);
    for lane in 0..3 {
        scatter(buffer, offset, record_length, 4, |i, out| {
            let value = parameters.map(|s| s[i * 3 + lane]).unwrap_or(0.);
            out.copy_from_slice(&value.to_le_bytes());
        });
        offset += 4;
    }
    offset
}

/// Visits `buffer[i * record_length + offset ..][..size]` for every record.
fn scatter<F: FnMut(usize, &mut [u8])>(
    buffer: &mut [u8],
    offset: usize,
    record_length: usize,
    size: usize,
    mut fill: F,
) {
    for (i, record) in buffer.chunks_exact_mut(record_length).enumerate() {
        fill(i, &mut record[offset..offset + size]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{point::Format, Point, PointCloud};

    fn header_for(format_number: u8) -> Header {
        let mut header = Header::default();
        header
            .set_point_format(Format::new(format_number).unwrap())
            .unwrap();
        header
    }

    #[test]
    fn buffer_is_record_sized() {
        let mut pointcloud = PointCloud::with_format(Format::new(1).unwrap());
        for _ in 0..5 {
            pointcloud.push(&Point {
                gps_time: Some(1.),
                ..Default::default()
            });
        }
        let buffer = point_buffer(&header_for(1), &pointcloud).unwrap();
        assert_eq!(5 * 28, buffer.len());
    }

    #[test]
    fn positions_are_scaled() {
        let mut pointcloud = PointCloud::default();
        pointcloud.push(&Point {
            x: 1.,
            ..Default::default()
        });
        let header = header_for(0);
        let buffer = point_buffer(&header, &pointcloud).unwrap();
        let raw = i32::from_le_bytes(buffer[0..4].try_into().unwrap());
        assert_eq!(10_000, raw);
    }

    #[test]
    fn flag_byte_packing() {
        let mut pointcloud = PointCloud::default();
        pointcloud.push(&Point {
            return_number: 5,
            number_of_returns: 5,
            scan_direction: true.into(),
            is_edge_of_flight_line: true,
            classification: 31,
            is_synthetic: true,
            is_withheld: true,
            ..Default::default()
        });
        let buffer = point_buffer(&header_for(0), &pointcloud).unwrap();
        assert_eq!(0xED, buffer[14]);
        assert_eq!(0xBF, buffer[15]);
    }

    #[test]
    fn record_length_mismatch_is_caught() {
        let mut header = header_for(0);
        header.set_point_data_record_length(25).unwrap();
        let mut pointcloud = PointCloud::default();
        pointcloud.push(&Point::default());
        assert!(matches!(
            point_buffer(&header, &pointcloud).unwrap_err(),
            Error::InconsistentRecordLength { .. }
        ));
    }
}
