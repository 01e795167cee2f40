//! Parsing of Takeout JSON sidecars into [`SidecarManifest`] records.

use crate::features::error::ManifestError;
use crate::features::geo::LatLonAlt;
use crate::structs::SidecarManifest;
use crate::utils::file_stem_string;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::borrow::Cow;
use std::path::Path;

/// Stems of JSON files that Takeout writes alongside media but which are not sidecars.
const IGNORED_STEM_PREFIXES: [&str; 4] = [
    "metadata",
    "print-subscriptions",
    "shared_album_comments",
    "user-generated-memory-titles",
];

const LAT_LON_DECIMALS: i32 = 6;
const ALTITUDE_DECIMALS: i32 = 3;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSidecar {
    title: Option<String>,
    description: Option<String>,
    photo_taken_time: Option<Value>,
    creation_time: Option<Value>,
    photo_last_modified_time: Option<Value>,
    geo_data_exif: Option<Value>,
    geo_data: Option<Value>,
}

/// Album metadata and similar JSON files that should be skipped without parsing.
pub fn is_ignored_sidecar(path: &Path) -> bool {
    let stem = file_stem_string(path);
    IGNORED_STEM_PREFIXES
        .iter()
        .any(|prefix| stem.starts_with(prefix))
}

/// Reads and parses one sidecar file.
///
/// Returns `Ok(None)` when the JSON has no `title`, meaning it is not a media sidecar.
///
/// # Errors
///
/// * [`ManifestError::Read`] if the file cannot be read.
/// * [`ManifestError::Json`] if the file is not valid JSON. Takeout only writes valid JSON, so this
///   points at a damaged archive.
/// * [`ManifestError::InvalidTimestamp`] if a timestamp is not a whole number of seconds.
pub async fn parse_sidecar(path: &Path) -> Result<Option<SidecarManifest>, ManifestError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    parse_sidecar_slice(&bytes, path)
}

/// Parses sidecar JSON already in memory. `path` is only used for error context.
pub fn parse_sidecar_slice(
    bytes: &[u8],
    path: &Path,
) -> Result<Option<SidecarManifest>, ManifestError> {
    let bytes = strip_trailing_commas(bytes);
    let raw: RawSidecar = serde_json::from_slice(&bytes).map_err(|source| ManifestError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let Some(title) = raw.title else {
        return Ok(None);
    };

    let taken_time = timestamp_field("photoTakenTime", raw.photo_taken_time.as_ref())?;
    let creation_time = timestamp_field("creationTime", raw.creation_time.as_ref())?;
    let last_modified_time =
        timestamp_field("photoLastModifiedTime", raw.photo_last_modified_time.as_ref())?;

    // Takeout always writes both; fall back to each other, then to the epoch.
    let (taken_time, creation_time) = match (taken_time, creation_time) {
        (Some(taken), Some(created)) => (taken, created),
        (Some(t), None) | (None, Some(t)) => (t, t),
        (None, None) => (DateTime::UNIX_EPOCH, DateTime::UNIX_EPOCH),
    };

    Ok(Some(SidecarManifest {
        title,
        description: raw.description,
        taken_time,
        creation_time,
        last_modified_time,
        exif_location: location_field(raw.geo_data_exif.as_ref()),
        edited_location: location_field(raw.geo_data.as_ref()),
    }))
}

/// Reads `{ "timestamp": "<unix seconds>" }`. A missing object or missing `timestamp` is `None`.
fn timestamp_field(
    field: &'static str,
    value: Option<&Value>,
) -> Result<Option<DateTime<Utc>>, ManifestError> {
    let Some(timestamp) = value.and_then(|v| v.get("timestamp")) else {
        return Ok(None);
    };

    let invalid = || ManifestError::InvalidTimestamp {
        field,
        value: timestamp.to_string(),
    };
    let seconds = match timestamp {
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid())?,
        Value::Number(n) => n.as_i64().ok_or_else(invalid)?,
        _ => return Err(invalid()),
    };
    DateTime::from_timestamp(seconds, 0)
        .map(Some)
        .ok_or_else(invalid)
}

/// Reads `{ "latitude", "longitude", "altitude" }`. Anything missing or non-numeric gives the null
/// location.
fn location_field(value: Option<&Value>) -> LatLonAlt {
    let Some(obj) = value else {
        return LatLonAlt::NULL;
    };
    let number = |name: &str| obj.get(name).and_then(Value::as_f64);
    match (number("latitude"), number("longitude"), number("altitude")) {
        (Some(lat), Some(lon), Some(alt)) => LatLonAlt::new(
            truncate_decimals(lat, LAT_LON_DECIMALS),
            truncate_decimals(lon, LAT_LON_DECIMALS),
            truncate_decimals(alt, ALTITUDE_DECIMALS),
        ),
        _ => LatLonAlt::NULL,
    }
}

/// Drops commas directly before a closing `}` or `]`. Commas inside strings are kept.
fn strip_trailing_commas(bytes: &[u8]) -> Cow<'_, [u8]> {
    if !bytes.contains(&b',') {
        return Cow::Borrowed(bytes);
    }
    let mut out = Vec::with_capacity(bytes.len());
    let mut in_string = false;
    let mut escaped = false;
    for (i, &byte) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
        } else if byte == b'"' {
            in_string = true;
        } else if byte == b',' {
            let next = bytes[i + 1..].iter().find(|b| !b.is_ascii_whitespace());
            if matches!(next, Some(&(b'}' | b']'))) {
                continue;
            }
        }
        out.push(byte);
    }
    if out.len() == bytes.len() {
        Cow::Borrowed(bytes)
    } else {
        Cow::Owned(out)
    }
}

/// Truncates toward zero at `places` decimals. Values already representable at that precision
/// are kept as-is so that binary noise (53.4783 * 1e6 = 53478299.99...) doesn't lose a digit.
fn truncate_decimals(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    let scaled = value * scale;
    let nearest = scaled.round();
    let kept = if (scaled - nearest).abs() < 1e-6 {
        nearest
    } else {
        scaled.trunc()
    };
    kept / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const FULL_SIDECAR: &str = r#"{
        "title": "IMG_20190505_101010.jpg",
        "description": "Beach",
        "imageViews": "12",
        "creationTime": { "timestamp": "1557052300", "formatted": "5 May 2019, 10:31:40 UTC" },
        "photoTakenTime": { "timestamp": "1557051010", "formatted": "5 May 2019, 10:10:10 UTC" },
        "photoLastModifiedTime": { "timestamp": "1557138610" },
        "geoData": { "latitude": 44.6463219, "longitude": 10.9255, "altitude": 60.12345, "latitudeSpan": 0.0 },
        "geoDataExif": { "latitude": -33.4369789, "longitude": -70.6344512, "altitude": 80.0 }
    }"#;

    fn parse(json: &str) -> Result<Option<SidecarManifest>, ManifestError> {
        parse_sidecar_slice(json.as_bytes(), Path::new("test.json"))
    }

    #[test]
    fn test_full_sidecar() -> Result<(), Box<dyn std::error::Error>> {
        let manifest = parse(FULL_SIDECAR)?.ok_or("expected a sidecar")?;

        assert_eq!(manifest.title, "IMG_20190505_101010.jpg");
        assert_eq!(manifest.description.as_deref(), Some("Beach"));
        assert_eq!(
            manifest.taken_time,
            Utc.with_ymd_and_hms(2019, 5, 5, 10, 10, 10).unwrap()
        );
        assert_eq!(manifest.creation_time.timestamp(), 1_557_052_300);
        assert_eq!(
            manifest.last_modified_time.map(|t| t.timestamp()),
            Some(1_557_138_610)
        );

        // Truncated toward zero, six decimals for lat/lon and three for altitude.
        assert_eq!(manifest.edited_location, LatLonAlt::new(44.646321, 10.9255, 60.123));
        assert_eq!(
            manifest.exif_location,
            LatLonAlt::new(-33.436978, -70.634451, 80.0)
        );
        Ok(())
    }

    #[test]
    fn test_missing_title_is_not_a_sidecar() -> Result<(), ManifestError> {
        let result = parse(r#"{ "albumData": { "title": "Holiday" } }"#)?;
        assert!(result.is_none(), "Album metadata is not a sidecar");
        Ok(())
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let result = parse(r#"{ "title": "IMG_0001.jpg", "#);
        assert!(matches!(result, Err(ManifestError::Json { .. })));
    }

    #[test]
    fn test_trailing_commas_are_accepted() -> Result<(), Box<dyn std::error::Error>> {
        let json = r#"{
            "title": "a, b.jpg",
            "description": "ends with ,}",
            "photoTakenTime": { "timestamp": "100", },
            "geoDataExif": { "latitude": 1.5, "longitude": 2.5, "altitude": 0.0 },
        }"#;
        let manifest = parse(json)?.ok_or("expected a sidecar")?;
        assert_eq!(manifest.title, "a, b.jpg");
        assert_eq!(manifest.description.as_deref(), Some("ends with ,}"));
        assert_eq!(manifest.taken_time.timestamp(), 100);
        assert_eq!(manifest.exif_location, LatLonAlt::new(1.5, 2.5, 0.0));
        Ok(())
    }

    #[test]
    fn test_missing_locations_are_null() -> Result<(), Box<dyn std::error::Error>> {
        let json = r#"{
            "title": "IMG_0001.jpg",
            "photoTakenTime": { "timestamp": "100" },
            "creationTime": { "timestamp": "200" },
            "geoData": { "latitude": 1.5, "longitude": "east" }
        }"#;
        let manifest = parse(json)?.ok_or("expected a sidecar")?;
        assert!(manifest.exif_location.is_null());
        assert!(manifest.edited_location.is_null(), "Malformed geoData is null");
        assert!(manifest.description.is_none());
        assert!(manifest.last_modified_time.is_none());
        Ok(())
    }

    #[test]
    fn test_timestamp_fallbacks() -> Result<(), Box<dyn std::error::Error>> {
        let only_creation = r#"{ "title": "a.jpg", "creationTime": { "timestamp": 300 } }"#;
        let manifest = parse(only_creation)?.ok_or("expected a sidecar")?;
        assert_eq!(manifest.taken_time.timestamp(), 300);
        assert_eq!(manifest.creation_time.timestamp(), 300);

        let none = r#"{ "title": "a.jpg" }"#;
        let manifest = parse(none)?.ok_or("expected a sidecar")?;
        assert_eq!(manifest.taken_time, DateTime::UNIX_EPOCH);
        Ok(())
    }

    #[test]
    fn test_non_numeric_timestamp_is_an_error() {
        let json = r#"{ "title": "a.jpg", "photoTakenTime": { "timestamp": "yesterday" } }"#;
        match parse(json) {
            Err(ManifestError::InvalidTimestamp { field, value }) => {
                assert_eq!(field, "photoTakenTime");
                assert_eq!(value, "\"yesterday\"");
            }
            other => panic!("Expected InvalidTimestamp, got {other:?}"),
        }
    }

    #[test]
    fn test_ignored_sidecars() {
        assert!(is_ignored_sidecar(Path::new("Album/metadata.json")));
        assert!(is_ignored_sidecar(Path::new("Album/metadata(1).json")));
        assert!(is_ignored_sidecar(Path::new("print-subscriptions.json")));
        assert!(is_ignored_sidecar(Path::new("shared_album_comments.json")));
        assert!(is_ignored_sidecar(Path::new("user-generated-memory-titles.json")));
        assert!(!is_ignored_sidecar(Path::new("IMG_0001.jpg.json")));
    }

    #[tokio::test]
    async fn test_parse_sidecar_from_disk() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("IMG_20190505_101010.jpg.json");
        std::fs::write(&path, FULL_SIDECAR)?;

        let manifest = parse_sidecar(&path).await?;
        assert!(manifest.is_some());

        let missing = parse_sidecar(&dir.path().join("missing.json")).await;
        assert!(matches!(missing, Err(ManifestError::Read { .. })));
        Ok(())
    }
}
