use crate::{
    point::{Dimension, Format},
    Transform, Version,
};
use thiserror::Error;

/// Crate-specific error enum.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The file signature is not "LASF".
    #[error("invalid file signature: {0:?}")]
    InvalidFormat([u8; 4]),

    /// The las version is outside 1.1 through 1.4.
    #[error("las version {0} is not supported (supported versions are 1.1 through 1.4)")]
    UnsupportedVersion(Version),

    /// The point format number is outside 0 through 10.
    #[error("point format {0} is outside the supported range 0 through 10")]
    UnsupportedPointFormat(u8),

    /// This combination of format attributes doesn't map onto a format number.
    #[error("point format attributes do not map onto a format code: {0:?}")]
    InvalidFormatCombination(Format),

    /// The point format cannot be stored under the declared las version.
    #[error("point format {format} requires las {required} or later, but the header declares {actual}")]
    IncompatiblePointFormat {
        /// The point format number.
        format: u8,
        /// The earliest las version that can carry the format.
        required: Version,
        /// The version the header declares.
        actual: Version,
    },

    /// A feature is not supported by a las version.
    #[error("{feature} is not supported by las {version}")]
    UnsupportedFeature {
        /// The las version.
        version: Version,
        /// The name of the unsupported feature.
        feature: &'static str,
    },

    /// Header fields disagree with each other or with the rest of the file.
    #[error("inconsistent header: {0}")]
    InconsistentHeader(String),

    /// A known payload type was stored under the wrong user id or record id.
    #[error("{payload} payloads cannot be stored under {user_id:?}/{record_id}")]
    InconsistentVlr {
        /// The offending user id.
        user_id: String,
        /// The offending record id.
        record_id: u16,
        /// The name of the payload type.
        payload: &'static str,
    },

    /// The point record length cannot hold the point format and its extra bytes.
    #[error("point record length {len} cannot hold the {required} bytes required by the point format and its extra bytes")]
    InconsistentRecordLength {
        /// The declared record length.
        len: u16,
        /// The minimum length required.
        required: u16,
    },

    /// A vlr payload exceeds the size cap of its wire format.
    #[error("vlr payload of {len} bytes exceeds the {cap} byte cap")]
    PayloadTooLarge {
        /// The payload length in bytes.
        len: u64,
        /// The cap that was exceeded.
        cap: u64,
    },

    /// The point count does not fit the legacy 32-bit count field.
    #[error("point count {0} does not fit the legacy 32-bit count field")]
    CountTooLarge(u64),

    /// A coordinate cannot be represented as a scaled i32.
    #[error("coordinate {coordinate} cannot be represented as an i32 with scale {scale}")]
    ScaleOutOfRange {
        /// The coordinate value.
        coordinate: f64,
        /// The scale in use.
        scale: f64,
    },

    /// No point format carries all of the requested dimensions.
    #[error("no point format carries all of the requested dimensions: {0:?}")]
    UnrepresentableColumns(Vec<Dimension>),

    /// A user column has an element type outside the supported set.
    #[error("column {name:?} has an unsupported element type: {reason}")]
    UnsupportedUserType {
        /// The column name.
        name: String,
        /// Why the type is unsupported.
        reason: String,
    },

    /// A column's length does not match the point count.
    #[error("column {name:?} has {len} values but the point table holds {expected} points")]
    LengthMismatch {
        /// The column name.
        name: String,
        /// The number of values provided.
        len: usize,
        /// The number of points in the table.
        expected: usize,
    },

    /// A column with this name already exists.
    #[error("column {0:?} already exists")]
    DuplicateColumn(String),

    /// No column with this name exists.
    #[error("no column named {0:?}")]
    ColumnNotFound(String),

    /// A non-superseded vlr with the same ids is already present.
    #[error("a vlr with user id {user_id:?} and record id {record_id} already exists")]
    DuplicateVlrId {
        /// The user id.
        user_id: String,
        /// The record id.
        record_id: u16,
    },

    /// A payload decoder is already registered for these ids.
    #[error("a payload decoder is already registered for {user_id:?}/{record_id}")]
    DuplicateRegistration {
        /// The user id.
        user_id: String,
        /// A record id inside the overlapping range.
        record_id: u16,
    },

    /// No vlr with these ids exists.
    #[error("no vlr with user id {user_id:?} and record id {record_id}")]
    VlrNotFound {
        /// The user id.
        user_id: String,
        /// The record id.
        record_id: u16,
    },

    /// This string is too long for its fixed-width field.
    #[error("string is too long for a {len} byte field: {string:?}")]
    StringTooLong {
        /// The string.
        string: String,
        /// The width of the target field.
        len: usize,
    },

    /// The value can't have the inverse transform applied.
    #[error("the transform {1} cannot be inversely applied to {0}")]
    InverseTransform(f64, Transform),

    /// The external laszip tool failed.
    #[error("laszip failed: {0}")]
    Laszip(String),

    /// Wrapper around `std::io::Error`.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapper around `std::str::Utf8Error`.
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),
}
