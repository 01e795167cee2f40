//! Where each version of a media item is written.

use crate::options::{DirOrganisation, ExtractionOptions, VersionOrganisation};
use crate::structs::{MediaKind, MediaPair};
use chrono::{DateTime, Datelike, Utc};
use std::path::{Path, PathBuf};

/// Destination directory and optional file name suffix for one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub dir: PathBuf,
    pub suffix: Option<String>,
}

/// Placements for the original and edited versions. `None` means the version is not written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlacementPlan {
    pub original: Option<Placement>,
    pub edited: Option<Placement>,
}

impl Placement {
    fn at(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            suffix: None,
        }
    }

    fn with_suffix(dir: impl Into<PathBuf>, suffix: &str) -> Self {
        Self {
            dir: dir.into(),
            suffix: Some(suffix.to_string()),
        }
    }
}

/// `<root>/<Photos|Videos|Unknown>[/<yyyy>[/<mm>[/<dd>]]]` for the original file.
///
/// The date is the UTC calendar date of `taken_time`, whatever clock the file names use.
pub fn base_output_dir(
    output_root: &Path,
    original: &Path,
    taken_time: DateTime<Utc>,
    options: &ExtractionOptions,
) -> PathBuf {
    let mut dir = output_root.join(MediaKind::from_path(original).dir_name());
    let date = taken_time.date_naive();

    match options.dir_organisation {
        DirOrganisation::None => {}
        DirOrganisation::Year => {
            dir.push(format!("{:04}", date.year()));
        }
        DirOrganisation::YearMonth => {
            dir.push(format!("{:04}", date.year()));
            dir.push(format!("{:02}", date.month()));
        }
        DirOrganisation::YearMonthDay => {
            dir.push(format!("{:04}", date.year()));
            dir.push(format!("{:02}", date.month()));
            dir.push(format!("{:02}", date.day()));
        }
    }
    dir
}

/// Applies the version organisation policy to a resolved pair.
pub fn plan_placement(pair: &MediaPair, base: &Path, options: &ExtractionOptions) -> PlacementPlan {
    let has_edited = pair.edited.is_some();
    let originals_dir = || base.join(&options.originals_subdir);

    let (original, edited) = match options.version_organisation {
        VersionOrganisation::LatestVersionOnly => {
            if has_edited {
                (None, Some(Placement::at(base)))
            } else {
                (Some(Placement::at(base)), None)
            }
        }
        VersionOrganisation::AllVersionsOriginalsSubdir => {
            if has_edited {
                (Some(Placement::at(originals_dir())), Some(Placement::at(base)))
            } else {
                (Some(Placement::at(base)), None)
            }
        }
        VersionOrganisation::AllVersionsSameDir => {
            if has_edited {
                (
                    Some(Placement::with_suffix(base, &options.original_suffix)),
                    Some(Placement::with_suffix(base, &options.edited_suffix)),
                )
            } else {
                (Some(Placement::at(base)), None)
            }
        }
        VersionOrganisation::AllVersionsSeparateSubdirs => (
            Some(Placement::at(originals_dir())),
            has_edited.then(|| Placement::at(base.join(&options.edited_subdir))),
        ),
        VersionOrganisation::EditedVersionsOnly => (None, has_edited.then(|| Placement::at(base))),
        VersionOrganisation::OriginalVersionsOnly => (Some(Placement::at(base)), None),
    };

    PlacementPlan { original, edited }
}
