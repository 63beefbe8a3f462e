//! Variable length records: typed metadata attached to a dataset.
//!
//! A [Vlr] couples a (user id, record id) pair with a typed [Payload].
//! Payloads of well-known pairs — coordinate systems, classification
//! dictionaries, extra-byte schemas, waveform descriptors — decode to typed
//! structures via the payload [Registry]; anything else is carried as raw
//! bytes. Extended vlrs (evlrs) live after the point records and carry a
//! 64-bit payload length on the wire instead of a 16-bit one.

mod extra_bytes;
mod payload;
mod registry;

pub use self::extra_bytes::{ExtraBytes, ExtraBytesEntry, ENTRY_SIZE};
pub use self::payload::{
    ClassificationEntry, ClassificationLookup, GeoAsciiParams, GeoDoubleParams, GeoKeyEntry,
    GeoKeys, OgcWkt, Payload, TextAreaDescription, WaveformPacketDescriptor,
};
pub use self::registry::{DecodeFn, Registry};

pub(crate) use self::registry::global;

use crate::{raw, utils, Error, Result};
use std::ops::RangeInclusive;

/// The record id that marks a "LASF_Spec" record as superseded.
pub const SUPERSEDED_RECORD_ID: u16 = 7;

/// The record ids of waveform packet descriptors.
pub const WAVEFORM_DESCRIPTOR_IDS: RangeInclusive<u16> = 100..=354;

/// The wire size of a normal vlr header.
pub(crate) const VLR_HEADER_SIZE: u64 = 54;

/// The wire size of an extended vlr header.
const EVLR_HEADER_SIZE: u64 = 60;

const USER_ID_SIZE: usize = 16;
const DESCRIPTION_SIZE: usize = 32;

/// A variable length record.
///
/// Construction checks that well-known payload types are stored under their
/// registered ids:
///
/// ```
/// use las_dataset::vlr::{Payload, TextAreaDescription, Vlr};
///
/// let payload = TextAreaDescription("about this file".to_string());
/// let vlr = Vlr::new("LASF_Spec", 3, "", payload.clone().into()).unwrap();
/// assert_eq!(54 + 15, vlr.len());
///
/// // record id 4 belongs to the extra-bytes schema
/// assert!(Vlr::new("LASF_Spec", 4, "", payload.into()).is_err());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Vlr {
    user_id: String,
    record_id: u16,
    description: String,
    payload: Payload,
    extended: bool,
}

#[allow(clippy::len_without_is_empty)]
impl Vlr {
    /// Creates a new vlr, checking id/payload consistency.
    pub fn new(user_id: &str, record_id: u16, description: &str, payload: Payload) -> Result<Vlr> {
        Vlr::with_extended(user_id, record_id, description, payload, false)
    }

    /// Creates a new extended vlr (evlr).
    ///
    /// Evlrs live after the point records and may carry payloads larger
    /// than `u16::MAX` bytes.
    pub fn new_extended(
        user_id: &str,
        record_id: u16,
        description: &str,
        payload: Payload,
    ) -> Result<Vlr> {
        Vlr::with_extended(user_id, record_id, description, payload, true)
    }

    fn with_extended(
        user_id: &str,
        record_id: u16,
        description: &str,
        payload: Payload,
        extended: bool,
    ) -> Result<Vlr> {
        if user_id.len() > USER_ID_SIZE {
            return Err(Error::StringTooLong {
                string: user_id.to_string(),
                len: USER_ID_SIZE,
            });
        }
        if description.len() > DESCRIPTION_SIZE {
            return Err(Error::StringTooLong {
                string: description.to_string(),
                len: DESCRIPTION_SIZE,
            });
        }
        if let Some((expected_user_id, record_ids)) = payload.registration() {
            let superseded = user_id == "LASF_Spec" && record_id == SUPERSEDED_RECORD_ID;
            if user_id != expected_user_id || (!record_ids.contains(&record_id) && !superseded) {
                return Err(Error::InconsistentVlr {
                    user_id: user_id.to_string(),
                    record_id,
                    payload: payload.name(),
                });
            }
        }
        let vlr = Vlr {
            user_id: user_id.to_string(),
            record_id,
            description: description.to_string(),
            payload,
            extended,
        };
        vlr.verify_payload_size()?;
        Ok(vlr)
    }

    /// The owner of this record's id space.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The record type, interpreted per user id.
    pub fn record_id(&self) -> u16 {
        self.record_id
    }

    /// The textual description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The typed payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Replaces the payload, rechecking consistency and size.
    pub fn set_payload(&mut self, payload: Payload) -> Result<()> {
        let replacement = Vlr::with_extended(
            &self.user_id,
            self.record_id,
            &self.description,
            payload,
            self.extended,
        )?;
        *self = replacement;
        Ok(())
    }

    /// Is this an extended vlr?
    pub fn is_extended(&self) -> bool {
        self.extended
    }

    /// The number of bytes this record occupies on disk, header included.
    pub fn len(&self) -> u64 {
        let header = if self.extended {
            EVLR_HEADER_SIZE
        } else {
            VLR_HEADER_SIZE
        };
        header + self.payload.byte_len() as u64
    }

    /// Returns true if this vlr has the given user id and record id.
    pub fn matches(&self, user_id: &str, record_id: u16) -> bool {
        self.user_id == user_id && self.record_id == record_id
    }

    /// Has this record been superseded by a newer one?
    pub fn is_superseded(&self) -> bool {
        self.matches("LASF_Spec", SUPERSEDED_RECORD_ID)
    }

    /// Marks this record superseded by rewriting its record id to 7.
    ///
    /// Only records authored under "LASF_Spec" may be superseded.
    ///
    /// ```
    /// use las_dataset::vlr::{TextAreaDescription, Vlr};
    ///
    /// let payload = TextAreaDescription("old".to_string());
    /// let mut vlr = Vlr::new("LASF_Spec", 3, "", payload.into()).unwrap();
    /// vlr.set_superseded().unwrap();
    /// assert_eq!(7, vlr.record_id());
    /// ```
    pub fn set_superseded(&mut self) -> Result<()> {
        if self.user_id != "LASF_Spec" {
            return Err(Error::InconsistentVlr {
                user_id: self.user_id.clone(),
                record_id: SUPERSEDED_RECORD_ID,
                payload: self.payload.name(),
            });
        }
        self.record_id = SUPERSEDED_RECORD_ID;
        Ok(())
    }

    /// Does this record's payload exceed its wire format's size cap?
    fn verify_payload_size(&self) -> Result<()> {
        let len = self.payload.byte_len() as u64;
        if !self.extended && len > u64::from(u16::MAX) {
            Err(Error::PayloadTooLarge {
                len,
                cap: u64::from(u16::MAX),
            })
        } else {
            Ok(())
        }
    }

    /// Decodes a raw vlr through a payload registry.
    pub fn from_raw(raw: raw::Vlr, registry: &Registry) -> Result<Vlr> {
        let user_id = raw.user_id()?.to_string();
        let extended = matches!(raw.record_length_after_header, raw::RecordLength::Extended(_));
        let payload = registry.decode(&user_id, raw.record_id, raw.data)?;
        Ok(Vlr {
            user_id,
            record_id: raw.record_id,
            description: utils::fixed_to_string(&raw.description)?.to_string(),
            payload,
            extended,
        })
    }

    /// Encodes this vlr, recomputing the payload length.
    pub fn to_raw(&self) -> Result<raw::Vlr> {
        self.verify_payload_size()?;
        let data = self.payload.to_bytes()?;
        let record_length_after_header = if self.extended {
            raw::RecordLength::Extended(data.len() as u64)
        } else {
            raw::RecordLength::Normal(data.len() as u16)
        };
        Ok(raw::Vlr {
            reserved: 0,
            user_id: utils::string_to_fixed(&self.user_id)?,
            record_id: self.record_id,
            record_length_after_header,
            description: utils::string_to_fixed(&self.description)?,
            data,
        })
    }
}

/// Finds the first vlr with the given user id and record id.
///
/// This is the canonical lookup: superseded records no longer answer to
/// their original record id, so they are skipped naturally.
///
/// ```
/// use las_dataset::vlr::{extract_vlr, TextAreaDescription, Vlr};
///
/// let vlrs = vec![
///     Vlr::new("LASF_Spec", 3, "", TextAreaDescription("a".to_string()).into()).unwrap(),
/// ];
/// assert!(extract_vlr(&vlrs, "LASF_Spec", 3).is_some());
/// assert!(extract_vlr(&vlrs, "LASF_Spec", 4).is_none());
/// ```
pub fn extract_vlr<'a>(vlrs: &'a [Vlr], user_id: &str, record_id: u16) -> Option<&'a Vlr> {
    vlrs.iter().find(|vlr| vlr.matches(user_id, record_id))
}
