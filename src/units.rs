//! Linear unit extraction from OGC WKT coordinate system strings.
//!
//! Only enough of the WKT is parsed to recover the horizontal and vertical
//! linear unit names; everything else in the string is ignored. Unknown or
//! missing units come back as `None` and the dataset is left untouched.

/// Extracts the horizontal and vertical linear unit names from a WKT string.
///
/// The string is split at its vertical CRS (`VERT_CS` in WKT v1, `VERTCRS`
/// in v2) and each half is scanned for its last `UNIT`/`LENGTHUNIT` keyword
/// that names a known linear unit. Angular units are skipped.
///
/// ```
/// use las_dataset::linear_units;
///
/// let wkt = r#"PROJCS["NAD83",GEOGCS["NAD83",UNIT["degree",0.0174532925199433]],UNIT["metre",1]]"#;
/// let (horizontal, vertical) = linear_units(wkt);
/// assert_eq!(Some("metre".to_string()), horizontal);
/// assert_eq!(None, vertical);
/// ```
pub fn linear_units(wkt: &str) -> (Option<String>, Option<String>) {
    let (horizontal, vertical) = match wkt.split_once("VERT") {
        Some((horizontal, vertical)) => (horizontal, Some(vertical)),
        None => (wkt, None),
    };
    (
        last_linear_unit(horizontal),
        vertical.and_then(last_linear_unit),
    )
}

/// Returns the number of metres in one of the named unit, or `None` for
/// unknown units.
pub(crate) fn metres_per_unit(name: &str) -> Option<f64> {
    let normalized = name
        .to_lowercase()
        .replace(['_', '-'], " ")
        .trim()
        .to_string();
    match normalized.as_str() {
        "metre" | "meter" | "metres" | "meters" | "m" => Some(1.),
        "kilometre" | "kilometer" => Some(1000.),
        "centimetre" | "centimeter" => Some(0.01),
        "millimetre" | "millimeter" => Some(0.001),
        "foot" | "feet" | "ft" | "international foot" => Some(0.3048),
        "us survey foot" | "u.s. foot" | "us foot" | "foot us" | "us ft" => Some(1200. / 3937.),
        "yard" => Some(0.9144),
        "inch" => Some(0.0254),
        _ => None,
    }
}

fn last_linear_unit(piece: &str) -> Option<String> {
    let mut found = None;
    let mut rest = piece;
    while let Some(position) = rest.find("UNIT[\"") {
        let name_start = &rest[position + 6..];
        if let Some(end) = name_start.find('"') {
            let name = &name_start[..end];
            if metres_per_unit(name).is_some() {
                found = Some(name.to_string());
            }
            rest = &name_start[end..];
        } else {
            break;
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizontal_and_vertical() {
        let wkt = concat!(
            r#"COMPD_CS["both",PROJCS["p",GEOGCS["g",UNIT["degree",0.017]],"#,
            r#"UNIT["US survey foot",0.3048006096]],"#,
            r#"VERT_CS["v",VERT_DATUM["d",2005],UNIT["foot",0.3048]]]"#,
        );
        let (horizontal, vertical) = linear_units(wkt);
        assert_eq!(Some("US survey foot".to_string()), horizontal);
        assert_eq!(Some("foot".to_string()), vertical);
    }

    #[test]
    fn wkt2_lengthunit() {
        let wkt = r#"PROJCRS["p",CS[Cartesian,2],LENGTHUNIT["metre",1]]"#;
        let (horizontal, vertical) = linear_units(wkt);
        assert_eq!(Some("metre".to_string()), horizontal);
        assert_eq!(None, vertical);
    }

    #[test]
    fn angular_only() {
        let wkt = r#"GEOGCS["g",UNIT["degree",0.0174532925199433]]"#;
        assert_eq!((None, None), linear_units(wkt));
    }

    #[test]
    fn factors() {
        assert_eq!(Some(1.), metres_per_unit("metre"));
        assert_eq!(Some(0.3048), metres_per_unit("Foot"));
        assert_eq!(Some(1200. / 3937.), metres_per_unit("US_survey_foot"));
        assert_eq!(None, metres_per_unit("degree"));
    }
}
