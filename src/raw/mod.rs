//! Structures that map directly onto the on-disk las byte layout.
//!
//! Raw structures know nothing about scales, offsets, or normalisation; they
//! hold exactly what the file holds, and their `read_from`/`write_to`
//! methods are the crate's little-endian codec.

mod header;
mod point;
mod vlr;

pub use self::header::{Evlr, Header, LargeFile};
pub use self::point::{Flags, Point, ScanAngle, Waveform};
pub use self::vlr::{RecordLength, Vlr};
