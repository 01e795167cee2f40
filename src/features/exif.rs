//! EXIF rewriting for copied images.

use crate::features::error::ExifError;
use crate::features::geo::{DEFAULT_SECONDS_DECIMALS, LatLonAlt};
use chrono::{DateTime, Utc};
use little_exif::endian::Endian;
use little_exif::exif_tag::ExifTag;
use little_exif::exif_tag_format::ExifTagFormat;
use little_exif::ifd::ExifTagGroup;
use little_exif::metadata::Metadata;
use little_exif::rational::uR64;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};

const EXIF_TIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";
const DOCUMENT_NAME_TAG: u16 = 0x010d;
const SECONDS_DENOMINATOR: u32 = 1000;
const ALTITUDE_DENOMINATOR: u32 = 1000;

/// Tag values written into one output image.
#[derive(Debug, Clone, PartialEq)]
pub struct ExifUpdate {
    pub title: String,
    pub description: Option<String>,
    pub taken_time: DateTime<Utc>,
    pub modified_time: DateTime<Utc>,
    pub location: LatLonAlt,
}

/// Rewrites the EXIF block of `path` in place.
///
/// Existing tags are kept unless overwritten. A file without EXIF gets a fresh block. GPS tags
/// are only written for a non-null location.
///
/// # Errors
///
/// * [`ExifError::Location`] if the location can't be expressed as GPS tags. All other tags are
///   still written in that case.
/// * [`ExifError::Write`] if the file couldn't be saved.
/// * [`ExifError::Panicked`] if the EXIF library panicked on the file.
pub fn rewrite_exif(path: &Path, update: &ExifUpdate) -> Result<(), ExifError> {
    catch_unwind(AssertUnwindSafe(|| write_tags(path, update)))
        .unwrap_or_else(|_| Err(ExifError::Panicked(PathBuf::from(path))))
}

/// Like [`rewrite_exif`], on the blocking thread pool.
pub async fn rewrite_exif_blocking(path: PathBuf, update: ExifUpdate) -> Result<(), ExifError> {
    tokio::task::spawn_blocking(move || rewrite_exif(&path, &update))
        .await
        .map_err(|e| ExifError::Task(e.to_string()))?
}

fn write_tags(path: &Path, update: &ExifUpdate) -> Result<(), ExifError> {
    let mut metadata = Metadata::new_from_path(path).unwrap_or_else(|_| Metadata::new());

    if let Some(tag) = Some(update.title.as_str())
        .filter(|t| !t.is_empty())
        .and_then(document_name)
    {
        metadata.set_tag(tag);
    }
    if let Some(description) = update.description.as_deref().filter(|d| !d.is_empty()) {
        metadata.set_tag(ExifTag::ImageDescription(description.to_string()));
    }
    metadata.set_tag(ExifTag::DateTimeOriginal(
        update.taken_time.format(EXIF_TIME_FORMAT).to_string(),
    ));
    metadata.set_tag(ExifTag::ModifyDate(
        update.modified_time.format(EXIF_TIME_FORMAT).to_string(),
    ));

    let gps = if update.location.is_null() {
        Ok(())
    } else {
        set_gps_tags(&mut metadata, &update.location)
    };

    metadata.write_to_file(path).map_err(ExifError::Write)?;
    gps
}

/// `DocumentName` has no typed variant, so it is built from raw ASCII bytes.
fn document_name(title: &str) -> Option<ExifTag> {
    let data = format!("{title}\0").into_bytes();
    ExifTag::from_u16_with_data(
        DOCUMENT_NAME_TAG,
        &ExifTagFormat::STRING,
        &data,
        &Endian::Little,
        &ExifTagGroup::GENERIC,
    )
    .ok()
}

fn set_gps_tags(metadata: &mut Metadata, location: &LatLonAlt) -> Result<(), ExifError> {
    let dms = location.to_dms(DEFAULT_SECONDS_DECIMALS)?;

    metadata.set_tag(ExifTag::GPSLatitudeRef(
        location.latitude_ref().as_exif().to_string(),
    ));
    metadata.set_tag(ExifTag::GPSLatitude(vec![
        whole(dms.lat_deg),
        whole(dms.lat_min),
        fraction(dms.lat_sec, SECONDS_DENOMINATOR),
    ]));
    metadata.set_tag(ExifTag::GPSLongitudeRef(
        location.longitude_ref().as_exif().to_string(),
    ));
    metadata.set_tag(ExifTag::GPSLongitude(vec![
        whole(dms.lon_deg),
        whole(dms.lon_min),
        fraction(dms.lon_sec, SECONDS_DENOMINATOR),
    ]));
    metadata.set_tag(ExifTag::GPSAltitudeRef(vec![
        location.altitude_ref().as_exif(),
    ]));
    metadata.set_tag(ExifTag::GPSAltitude(vec![fraction(
        dms.alt,
        ALTITUDE_DENOMINATOR,
    )]));
    Ok(())
}

// EXIF rationals are unsigned; the hemisphere lives in the reference tags.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn fraction(value: f64, denominator: u32) -> uR64 {
    uR64 {
        nominator: (value.abs() * f64::from(denominator)).round() as u32,
        denominator,
    }
}

fn whole(value: f64) -> uR64 {
    fraction(value, 1)
}
