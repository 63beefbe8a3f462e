use crate::{point::Format, vlr::ExtraBytes, Error, Result};

/// The shape of a file's point records.
///
/// A record is the chosen point format, optionally followed by documented
/// user fields (the extra-bytes schema), optionally followed by
/// undocumented trailing bytes. The shape is resolved from the header's
/// record length and the extra-bytes record:
///
/// ```
/// use las_dataset::point::Format;
/// use las_dataset::RecordKind;
///
/// let format = Format::new(0).unwrap();
/// let kind = RecordKind::resolve(format, 20, None).unwrap();
/// assert_eq!(RecordKind::Standard, kind);
///
/// let kind = RecordKind::resolve(format, 24, None).unwrap();
/// assert_eq!(RecordKind::Undocumented { count: 4 }, kind);
///
/// assert!(RecordKind::resolve(format, 19, None).is_err());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum RecordKind {
    /// Just the formatted point.
    Standard,
    /// The point followed by documented user fields.
    Extended {
        /// The user field schema.
        schema: ExtraBytes,
    },
    /// The point followed by undocumented bytes.
    Undocumented {
        /// The number of undocumented bytes per record.
        count: u16,
    },
    /// The point followed by user fields and undocumented bytes.
    Full {
        /// The user field schema.
        schema: ExtraBytes,
        /// The number of undocumented bytes per record.
        count: u16,
    },
}

impl RecordKind {
    /// Resolves the record shape for a format, a declared record length,
    /// and the extra-bytes record, if any.
    ///
    /// Fails with an inconsistent-record-length error when the length can't
    /// hold the format, or when the schema needs more bytes than the length
    /// leaves.
    pub fn resolve(
        format: Format,
        record_length: u16,
        extra_bytes: Option<&ExtraBytes>,
    ) -> Result<RecordKind> {
        let base = format.len();
        if record_length < base {
            return Err(Error::InconsistentRecordLength {
                len: record_length,
                required: base,
            });
        }
        let available = record_length - base;
        let schema = extra_bytes.filter(|extra_bytes| !extra_bytes.entries().is_empty());
        match schema {
            None if available == 0 => Ok(RecordKind::Standard),
            None => Ok(RecordKind::Undocumented { count: available }),
            Some(schema) => {
                let documented = schema.bytes_per_point() as u16;
                if documented > available {
                    Err(Error::InconsistentRecordLength {
                        len: record_length,
                        required: base + documented,
                    })
                } else if documented == available {
                    Ok(RecordKind::Extended {
                        schema: schema.clone(),
                    })
                } else {
                    Ok(RecordKind::Full {
                        schema: schema.clone(),
                        count: available - documented,
                    })
                }
            }
        }
    }

    /// The user field schema, if this shape has one.
    pub fn schema(&self) -> Option<&ExtraBytes> {
        match self {
            RecordKind::Extended { schema } | RecordKind::Full { schema, .. } => Some(schema),
            _ => None,
        }
    }

    /// The number of undocumented bytes per record.
    pub fn undocumented(&self) -> u16 {
        match self {
            RecordKind::Undocumented { count } | RecordKind::Full { count, .. } => *count,
            _ => 0,
        }
    }

    /// The number of bytes past the format's end in each record.
    pub fn extra_len(&self) -> usize {
        self.schema().map(ExtraBytes::bytes_per_point).unwrap_or(0)
            + usize::from(self.undocumented())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScalarKind;

    fn schema() -> ExtraBytes {
        let mut extra_bytes = ExtraBytes::new();
        extra_bytes.push_column("thing", ScalarKind::F64, 1).unwrap();
        extra_bytes
    }

    #[test]
    fn documented_fields_fill_the_record() {
        let format = Format::new(0).unwrap();
        let schema = schema();
        let kind = RecordKind::resolve(format, 28, Some(&schema)).unwrap();
        assert_eq!(RecordKind::Extended { schema }, kind);
        assert_eq!(8, kind.extra_len());
    }

    #[test]
    fn documented_fields_plus_padding() {
        let format = Format::new(0).unwrap();
        let schema = schema();
        let kind = RecordKind::resolve(format, 30, Some(&schema)).unwrap();
        assert_eq!(RecordKind::Full { schema, count: 2 }, kind);
        assert_eq!(10, kind.extra_len());
    }

    #[test]
    fn schema_overflows_record() {
        let format = Format::new(0).unwrap();
        let schema = schema();
        assert!(matches!(
            RecordKind::resolve(format, 24, Some(&schema)).unwrap_err(),
            Error::InconsistentRecordLength { required: 28, .. }
        ));
    }

    #[test]
    fn empty_schema_is_no_schema() {
        let format = Format::new(0).unwrap();
        let empty = ExtraBytes::new();
        let kind = RecordKind::resolve(format, 20, Some(&empty)).unwrap();
        assert_eq!(RecordKind::Standard, kind);
    }
}
