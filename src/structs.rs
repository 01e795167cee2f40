use crate::features::geo::LatLonAlt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Metadata read from one Takeout JSON sidecar.
///
/// All timestamps are UTC. A location that was not recorded is represented by
/// [`LatLonAlt::NULL`], never by an `Option`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SidecarManifest {
    /// Nominal file name of the original media file.
    pub title: String,
    pub description: Option<String>,
    pub taken_time: DateTime<Utc>,
    pub creation_time: DateTime<Utc>,
    pub last_modified_time: Option<DateTime<Utc>>,
    /// Location as recorded by the capturing device.
    pub exif_location: LatLonAlt,
    /// Location as edited in the web interface.
    pub edited_location: LatLonAlt,
}

impl SidecarManifest {
    /// The location to embed in an edited copy: the edited location when one was entered,
    /// otherwise the device location.
    #[must_use]
    pub fn edited_or_exif_location(&self) -> LatLonAlt {
        if self.edited_location.is_null() {
            self.exif_location
        } else {
            self.edited_location
        }
    }
}

/// An original media file and its optional edited companion, both in the sidecar's directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPair {
    pub original: PathBuf,
    pub edited: Option<PathBuf>,
}

/// Coarse media type, decided by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum MediaKind {
    Photo,
    Video,
    Unknown,
}

// (extension, can carry EXIF)
const IMAGE_EXTENSIONS: [(&str, bool); 4] =
    [("jpg", true), ("jpeg", true), ("png", true), ("gif", false)];
const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "mpeg4", "mov"];

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

impl MediaKind {
    pub fn from_path(path: &Path) -> Self {
        let Some(ext) = lowercase_extension(path) else {
            return Self::Unknown;
        };
        if IMAGE_EXTENSIONS.iter().any(|(e, _)| *e == ext) {
            Self::Photo
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Self::Video
        } else {
            Self::Unknown
        }
    }

    /// Name of the top-level output directory for this kind of media.
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Photo => "Photos",
            Self::Video => "Videos",
            Self::Unknown => "Unknown",
        }
    }

    /// Whether the file is an image format whose EXIF block gets rewritten.
    pub fn supports_exif(path: &Path) -> bool {
        lowercase_extension(path).is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|(e, has_exif)| *has_exif && *e == ext)
        })
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Photo => "Photo",
            Self::Video => "Video",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_is_decided_by_extension() {
        assert_eq!(MediaKind::from_path(Path::new("a/IMG_0001.jpg")), MediaKind::Photo);
        assert_eq!(MediaKind::from_path(Path::new("IMG_0001.JPEG")), MediaKind::Photo);
        assert_eq!(MediaKind::from_path(Path::new("anim.gif")), MediaKind::Photo);
        assert_eq!(MediaKind::from_path(Path::new("VID_0001.MP4")), MediaKind::Video);
        assert_eq!(MediaKind::from_path(Path::new("clip.mov")), MediaKind::Video);
        assert_eq!(MediaKind::from_path(Path::new("scan.heic")), MediaKind::Unknown);
        assert_eq!(MediaKind::from_path(Path::new("no_extension")), MediaKind::Unknown);
    }

    #[test]
    fn test_only_exif_capable_images_support_exif() {
        assert!(MediaKind::supports_exif(Path::new("a.jpg")));
        assert!(MediaKind::supports_exif(Path::new("a.PNG")));
        assert!(!MediaKind::supports_exif(Path::new("a.gif")));
        assert!(!MediaKind::supports_exif(Path::new("a.mp4")));
    }

    #[test]
    fn test_edited_location_falls_back_to_exif_location() {
        let exif_location = LatLonAlt::new(53.4783, -2.24958, 50.0);
        let mut manifest = SidecarManifest {
            title: "IMG_0001.jpg".to_string(),
            description: None,
            taken_time: DateTime::UNIX_EPOCH,
            creation_time: DateTime::UNIX_EPOCH,
            last_modified_time: None,
            exif_location,
            edited_location: LatLonAlt::NULL,
        };
        assert_eq!(manifest.edited_or_exif_location(), exif_location);

        let edited = LatLonAlt::new(44.64632, 10.9255, 60.0);
        manifest.edited_location = edited;
        assert_eq!(manifest.edited_or_exif_location(), edited);
    }
}
