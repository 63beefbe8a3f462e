//! The process-wide map from (user id, record id) to payload decoder.
//!
//! The global registry is built once, before any vlr is decoded, and is
//! read-only afterwards. Custom registries can be built for decoding with
//! additional payload types; ids may only be claimed once.

use crate::{
    vlr::{
        payload::{
            ClassificationLookup, GeoDoubleParams, GeoKeys, OgcWkt, TextAreaDescription,
            WaveformPacketDescriptor,
        },
        ExtraBytes, GeoAsciiParams, Payload, WAVEFORM_DESCRIPTOR_IDS,
    },
    Error, Result,
};
use std::ops::RangeInclusive;
use std::sync::OnceLock;

/// A payload decoder: wire bytes in, typed payload out.
pub type DecodeFn = fn(&[u8]) -> Result<Payload>;

struct Registration {
    user_id: &'static str,
    record_ids: RangeInclusive<u16>,
    decode: DecodeFn,
}

/// A table of payload decoders keyed by (user id, record id).
pub struct Registry {
    registrations: Vec<Registration>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Registry {
        Registry {
            registrations: Vec::new(),
        }
    }

    /// Creates a registry holding the payload types the las spec defines.
    pub fn with_builtins() -> Registry {
        let mut registry = Registry::new();
        let builtins: [(&'static str, RangeInclusive<u16>, DecodeFn); 9] = [
            ("LASF_Projection", 34735..=34735, |data| {
                GeoKeys::read_from(data).map(Payload::GeoKeys)
            }),
            ("LASF_Projection", 34736..=34736, |data| {
                GeoDoubleParams::read_from(data).map(Payload::GeoDoubleParams)
            }),
            ("LASF_Projection", 34737..=34737, |data| {
                Ok(Payload::GeoAsciiParams(GeoAsciiParams {
                    data: data.to_vec(),
                }))
            }),
            ("LASF_Projection", 2112..=2112, |data| {
                OgcWkt::read_from(data).map(Payload::OgcWkt)
            }),
            ("LASF_Spec", 0..=0, |data| {
                ClassificationLookup::read_from(data).map(Payload::ClassificationLookup)
            }),
            ("LASF_Spec", 3..=3, |data| {
                TextAreaDescription::read_from(data).map(Payload::TextAreaDescription)
            }),
            ("LASF_Spec", 4..=4, |data| {
                ExtraBytes::read_from(data).map(Payload::ExtraBytes)
            }),
            ("LASF_Spec", WAVEFORM_DESCRIPTOR_IDS, |data| {
                WaveformPacketDescriptor::read_from(data).map(Payload::WaveformPacketDescriptor)
            }),
            // waveform data packets are not interpreted, only carried
            ("LASF_Spec", 65535..=65535, |data| {
                Ok(Payload::Bytes(data.to_vec()))
            }),
        ];
        // the builtin id ranges are disjoint, so no overlap check is needed
        for (user_id, record_ids, decode) in builtins {
            registry.registrations.push(Registration {
                user_id,
                record_ids,
                decode,
            });
        }
        registry
    }

    /// Binds a decoder to a user id and a range of record ids.
    ///
    /// Fails when any id in the range is already claimed:
    ///
    /// ```
    /// use las_dataset::vlr::{Payload, Registry};
    ///
    /// let mut registry = Registry::with_builtins();
    /// registry
    ///     .register("ACME", 1..=1, |data| Ok(Payload::Bytes(data.to_vec())))
    ///     .unwrap();
    /// assert!(registry
    ///     .register("LASF_Spec", 4..=4, |data| Ok(Payload::Bytes(data.to_vec())))
    ///     .is_err());
    /// ```
    pub fn register(
        &mut self,
        user_id: &'static str,
        record_ids: RangeInclusive<u16>,
        decode: DecodeFn,
    ) -> Result<()> {
        for registration in &self.registrations {
            if registration.user_id == user_id
                && registration.record_ids.start() <= record_ids.end()
                && record_ids.start() <= registration.record_ids.end()
            {
                return Err(Error::DuplicateRegistration {
                    user_id: user_id.to_string(),
                    record_id: *record_ids.start().max(registration.record_ids.start()),
                });
            }
        }
        self.registrations.push(Registration {
            user_id,
            record_ids,
            decode,
        });
        Ok(())
    }

    /// Decodes a payload, falling back to raw bytes for unregistered ids.
    pub fn decode(&self, user_id: &str, record_id: u16, data: Vec<u8>) -> Result<Payload> {
        for registration in &self.registrations {
            if registration.user_id == user_id && registration.record_ids.contains(&record_id) {
                return (registration.decode)(&data);
            }
        }
        Ok(Payload::Bytes(data))
    }
}

impl Default for Registry {
    fn default() -> Registry {
        Registry::with_builtins()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("registrations", &self.registrations.len())
            .finish()
    }
}

/// The registry used when decoding files.
pub(crate) fn global() -> &'static Registry {
    static GLOBAL: OnceLock<Registry> = OnceLock::new();
    GLOBAL.get_or_init(Registry::with_builtins)
}
