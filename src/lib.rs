//! Read and write [ASPRS LAS](https://www.asprs.org/divisions-committees/lidar-division/laser-las-file-format-exchange-activities)
//! point cloud data as whole, reconciled datasets.
//!
//! A [Dataset] ties together the three layers of a LAS file — the header, the
//! columnar point table, and the (extended) variable length records — and
//! keeps them consistent through every mutation. Reading a file produces a
//! dataset whose header offsets, counters, record lengths, and extra-bytes
//! schema are guaranteed to agree with the table; writing a dataset
//! re-materialises the same byte layout.
//!
//! # Reading
//!
//! ```no_run
//! use las_dataset::Dataset;
//! let dataset = Dataset::from_path("points.las").unwrap();
//! println!("{} points", dataset.len());
//! ```
//!
//! Anything that is `Read + Seek` works:
//!
//! ```no_run
//! use std::{fs::File, io::BufReader};
//! use las_dataset::Dataset;
//! let read = BufReader::new(File::open("points.las").unwrap());
//! let dataset = Dataset::read_from(read).unwrap();
//! ```
//!
//! To stream points without building a table, use a [Reader]:
//!
//! ```no_run
//! use las_dataset::Reader;
//! let mut reader = Reader::from_path("points.las").unwrap();
//! for point in reader.points() {
//!     let point = point.unwrap();
//!     println!("({}, {}, {})", point.x, point.y, point.z);
//! }
//! ```
//!
//! # Writing
//!
//! Build a table, assemble a dataset, write it out:
//!
//! ```
//! use std::io::Cursor;
//! use las_dataset::{Dataset, Point, PointCloud};
//!
//! let mut pointcloud = PointCloud::with_format(Default::default());
//! pointcloud.push(&Point { x: 1., y: 2., z: 3., ..Default::default() });
//! let dataset = Dataset::new(pointcloud).unwrap();
//! let mut cursor = Cursor::new(Vec::new());
//! dataset.write_to(&mut cursor).unwrap();
//! ```
//!
//! User-defined columns ride along as LAS "extra bytes" and are documented in
//! the dataset's extra-bytes record automatically:
//!
//! ```
//! use las_dataset::{Dataset, Point, PointCloud};
//!
//! let mut pointcloud = PointCloud::with_format(Default::default());
//! pointcloud.push(&Point::default());
//! let mut dataset = Dataset::new(pointcloud).unwrap();
//! dataset.add_column("temperature", vec![21.5f64]).unwrap();
//! ```
//!
//! # Compression
//!
//! `.laz` paths are handled by delegating to an external `laszip` executable
//! working on a temporary uncompressed file. The in-memory dataset never sees
//! compressed bytes.

#![deny(
    elided_lifetimes_in_paths,
    macro_use_extern_crate,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_import_braces,
    unused_qualifications
)]
#![warn(missing_docs)]

pub mod feature;
pub mod point;
pub mod raw;
pub mod vlr;

mod bounds;
mod color;
mod column;
mod dataset;
mod error;
mod gps_time_type;
mod header;
mod laz;
mod pointcloud;
mod reader;
mod record;
mod transform;
mod units;
mod utils;
mod vector;
mod version;
mod writer;

pub use crate::bounds::{Bounds, Interval};
pub use crate::color::Color;
pub use crate::column::{Column, ScalarKind};
pub use crate::dataset::Dataset;
pub use crate::error::Error;
pub use crate::feature::Feature;
pub use crate::gps_time_type::GpsTimeType;
pub use crate::header::Header;
pub use crate::point::Point;
pub use crate::pointcloud::PointCloud;
pub use crate::reader::{PointIterator, Reader};
pub use crate::record::RecordKind;
pub use crate::transform::Transform;
pub use crate::units::linear_units;
pub use crate::vector::Vector;
pub use crate::version::Version;
pub use crate::vlr::Vlr;

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, Error>;
