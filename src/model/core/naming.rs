//! The flat-name codec for probabilistic sites.
//!
//! Purpose
//! -------
//! Map the hierarchical identifier `(component, coordinate key, argument)`
//! to the single flat string under which a probabilistic site is
//! registered, and back. The encoding joins segments with `:` and the
//! names inside a joint key with `-`; both characters are reserved, and
//! [`validate_name`] rejects user-supplied names containing either, which
//! is what keeps the codec bijective.
//!
//! Conventions
//! -----------
//! - Parameter sites are three segments: `component:coordinate:argument`.
//! - Observation sites are two segments plus the `-obs` suffix; only
//!   three-segment parameter names are `decode`-able.
//! - `expand` regroups one component's flat parameter map into
//!   `coordinate key → argument → value`. Callers pre-filter by
//!   component; if several component prefixes are mixed in, the last one
//!   in sorted order wins.

use std::collections::BTreeMap;

use crate::distributions::ParamValue;
use crate::model::core::coords::CoordKey;
use crate::model::errors::{ModelError, ModelResult};

/// Separator between the component, coordinate, and argument segments.
pub const SEGMENT_SEPARATOR: char = ':';

/// Separator between the names inside a joint coordinate key.
pub const JOINT_SEPARATOR: char = '-';

/// Suffix appended to a coordinate's site name for its observation site.
pub const OBS_SUFFIX: &str = "-obs";

/// Reject names containing a reserved separator (or nothing at all).
pub fn validate_name(name: &str) -> ModelResult<()> {
    if name.is_empty() {
        return Err(ModelError::MalformedName { name: name.to_string(), reason: "empty name" });
    }
    for reserved in [SEGMENT_SEPARATOR, JOINT_SEPARATOR] {
        if name.contains(reserved) {
            return Err(ModelError::ReservedCharacter { name: name.to_string(), character: reserved });
        }
    }
    Ok(())
}

/// The flat label of a coordinate key (joint names joined by `-`).
pub fn coord_label(key: &CoordKey) -> String {
    key.names().join(&JOINT_SEPARATOR.to_string())
}

/// Encode `(component, key, argument)` into a flat site name; with no
/// argument, the two-segment coordinate site name.
pub fn encode(component: &str, key: &CoordKey, arg: Option<&str>) -> String {
    let base = format!("{component}{SEGMENT_SEPARATOR}{}", coord_label(key));
    match arg {
        None => base,
        Some(arg) => format!("{base}{SEGMENT_SEPARATOR}{arg}"),
    }
}

/// The observation-site name for a coordinate key.
pub fn obs_site_name(component: &str, key: &CoordKey) -> String {
    format!("{}{OBS_SUFFIX}", encode(component, key, None))
}

/// Decode a flat parameter name into `(component, key, argument)`.
///
/// # Errors
/// - [`ModelError::MalformedName`] unless the name has exactly three
///   non-empty segments.
pub fn decode(flat_name: &str) -> ModelResult<(String, CoordKey, String)> {
    let segments: Vec<&str> = flat_name.split(SEGMENT_SEPARATOR).collect();
    if segments.len() != 3 {
        return Err(ModelError::MalformedName {
            name: flat_name.to_string(),
            reason: "expected component:coordinate:argument",
        });
    }
    if segments.iter().any(|s| s.is_empty()) {
        return Err(ModelError::MalformedName {
            name: flat_name.to_string(),
            reason: "empty segment",
        });
    }
    let coord = if segments[1].contains(JOINT_SEPARATOR) {
        CoordKey::joint(segments[1].split(JOINT_SEPARATOR))
    } else {
        CoordKey::single(segments[1])
    };
    Ok((segments[0].to_string(), coord, segments[2].to_string()))
}

/// Regroup one component's flat parameter map into
/// `coordinate key → argument → value`.
///
/// # Errors
/// - [`ModelError::MalformedName`] if any key fails to decode.
pub fn expand(
    flat: &BTreeMap<String, ParamValue>,
) -> ModelResult<BTreeMap<CoordKey, BTreeMap<String, ParamValue>>> {
    let mut by_component: BTreeMap<String, BTreeMap<CoordKey, BTreeMap<String, ParamValue>>> =
        BTreeMap::new();
    for (name, value) in flat {
        let (component, key, arg) = decode(name)?;
        by_component
            .entry(component)
            .or_default()
            .entry(key)
            .or_default()
            .insert(arg, value.clone());
    }
    Ok(by_component.into_values().last().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Round-tripping encode/decode for single and joint keys.
    // - Reserved-character and malformed-name rejection.
    // - Flat-map expansion into the nested coordinate → argument layout.
    // -------------------------------------------------------------------------

    #[test]
    fn encode_decode_round_trips_single_and_joint_keys() {
        for key in [CoordKey::single("phi2"), CoordKey::joint(["pm1", "pm2"])] {
            let flat = encode("background", &key, Some("loc"));
            let (component, decoded, arg) = decode(&flat).unwrap();
            assert_eq!(component, "background");
            assert_eq!(decoded, key);
            assert_eq!(arg, "loc");
        }
    }

    #[test]
    fn encoded_forms_use_the_documented_separators() {
        assert_eq!(encode("stream", &CoordKey::single("phi2"), Some("scale")), "stream:phi2:scale");
        assert_eq!(encode("stream", &CoordKey::joint(["pm1", "pm2"]), None), "stream:pm1-pm2");
        assert_eq!(obs_site_name("stream", &CoordKey::single("phi2")), "stream:phi2-obs");
    }

    #[test]
    fn validate_name_rejects_reserved_characters() {
        assert!(validate_name("phi1").is_ok());
        let err = validate_name("phi:1").unwrap_err();
        assert!(matches!(err, ModelError::ReservedCharacter { character: ':', .. }));
        let err = validate_name("phi-1").unwrap_err();
        assert!(matches!(err, ModelError::ReservedCharacter { character: '-', .. }));
        assert!(validate_name("").is_err());
    }

    #[test]
    fn decode_rejects_wrong_segment_counts() {
        assert!(matches!(decode("a:b"), Err(ModelError::MalformedName { .. })));
        assert!(matches!(decode("a:b:c:d"), Err(ModelError::MalformedName { .. })));
        assert!(matches!(decode("a::c"), Err(ModelError::MalformedName { .. })));
    }

    #[test]
    fn expand_groups_by_coordinate_then_argument() {
        let mut flat = BTreeMap::new();
        flat.insert("bg:phi2:loc".to_string(), ParamValue::Scalar(0.5));
        flat.insert("bg:phi2:scale".to_string(), ParamValue::Scalar(2.0));
        flat.insert("bg:pm1-pm2:loc".to_string(), ParamValue::Vector(array![1.0, 2.0]));

        let nested = expand(&flat).unwrap();
        let phi2 = &nested[&CoordKey::single("phi2")];
        assert_eq!(phi2["loc"], ParamValue::Scalar(0.5));
        assert_eq!(phi2["scale"], ParamValue::Scalar(2.0));
        let joint = &nested[&CoordKey::joint(["pm1", "pm2"])];
        assert_eq!(joint["loc"], ParamValue::Vector(array![1.0, 2.0]));
    }

    #[test]
    fn expand_of_an_empty_map_is_empty() {
        assert!(expand(&BTreeMap::new()).unwrap().is_empty());
    }
}
