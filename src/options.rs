use crate::error::OptionsError;
use bon::Builder;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Characters that can't appear in an output file or directory name on common filesystems.
const FORBIDDEN_NAME_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Which versions of a media item are written, and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum VersionOrganisation {
    /// The edited version if there is one, otherwise the original.
    #[default]
    LatestVersionOnly,
    /// Edited versions in the base directory, their originals in a subdirectory.
    AllVersionsOriginalsSubdir,
    /// Both versions side by side, told apart by a file name suffix.
    AllVersionsSameDir,
    /// Originals and edited versions each in their own subdirectory.
    AllVersionsSeparateSubdirs,
    EditedVersionsOnly,
    OriginalVersionsOnly,
}

/// Date-based nesting below the media type directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum DirOrganisation {
    #[default]
    None,
    Year,
    YearMonth,
    YearMonthDay,
}

/// The clock used when turning a taken time into a file name and date directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum FileNameTimeKind {
    Utc,
    /// The local time zone of the machine running the extraction.
    #[default]
    Local,
    Zone(Tz),
}

/// Configuration for one extraction run. Immutable once built; validated before the run starts.
///
/// ```rust
/// use takeout_extractor::options::{ExtractionOptions, FileNameTimeKind, VersionOrganisation};
///
/// let options = ExtractionOptions::builder()
///     .version_organisation(VersionOrganisation::AllVersionsSameDir)
///     .file_name_time_kind(FileNameTimeKind::Utc)
///     .build();
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Builder, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractionOptions {
    /// `strftime` format for output file names, applied to the taken time.
    #[builder(into, default = "%Y%m%d_%H%M%S".to_string())]
    pub file_name_format: String,
    #[builder(default)]
    pub file_name_time_kind: FileNameTimeKind,
    #[builder(default)]
    pub version_organisation: VersionOrganisation,
    #[builder(default)]
    pub dir_organisation: DirOrganisation,
    /// Rewrite EXIF metadata on copied images.
    #[builder(default = true)]
    pub update_exif: bool,
    /// Also extract items from the deleted-items directory.
    #[builder(default = false)]
    pub extract_deleted: bool,
    /// Abort the run at the first Error alert.
    #[builder(default = false)]
    pub stop_on_error: bool,
    #[builder(into, default = "_original".to_string())]
    pub original_suffix: String,
    #[builder(into, default = "_edited".to_string())]
    pub edited_suffix: String,
    #[builder(into, default = "originals".to_string())]
    pub originals_subdir: String,
    #[builder(into, default = "edited".to_string())]
    pub edited_subdir: String,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ExtractionOptions {
    /// Checks the options before a run.
    ///
    /// # Errors
    ///
    /// * [`OptionsError::InvalidFileNameFormat`] if the format has an unknown specifier.
    /// * [`OptionsError::InvalidFileName`] if the format produces an empty name or a name with
    ///   characters not allowed in file names.
    /// * [`OptionsError::AmbiguousSuffixes`] / [`OptionsError::AmbiguousSubdirs`] when both
    ///   versions are kept but the active mode couldn't tell them apart.
    /// * [`OptionsError::InvalidName`] for a suffix or subdirectory name that isn't a valid path
    ///   component.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if StrftimeItems::new(&self.file_name_format).any(|item| matches!(item, Item::Error)) {
            return Err(OptionsError::InvalidFileNameFormat(
                self.file_name_format.clone(),
            ));
        }
        let sample = self.format_time(DateTime::UNIX_EPOCH)?;
        if sample.is_empty() || sample.contains(FORBIDDEN_NAME_CHARS) {
            return Err(OptionsError::InvalidFileName {
                format: self.file_name_format.clone(),
                sample,
            });
        }

        match self.version_organisation {
            VersionOrganisation::AllVersionsSameDir => {
                check_suffix(&self.original_suffix)?;
                check_suffix(&self.edited_suffix)?;
                if self.original_suffix.is_empty() || self.original_suffix == self.edited_suffix {
                    return Err(OptionsError::AmbiguousSuffixes {
                        original: self.original_suffix.clone(),
                        edited: self.edited_suffix.clone(),
                    });
                }
            }
            VersionOrganisation::AllVersionsOriginalsSubdir => {
                check_dir_name(&self.originals_subdir)?;
            }
            VersionOrganisation::AllVersionsSeparateSubdirs => {
                check_dir_name(&self.originals_subdir)?;
                check_dir_name(&self.edited_subdir)?;
                if self.originals_subdir == self.edited_subdir {
                    return Err(OptionsError::AmbiguousSubdirs {
                        originals: self.originals_subdir.clone(),
                        edited: self.edited_subdir.clone(),
                    });
                }
            }
            VersionOrganisation::LatestVersionOnly
            | VersionOrganisation::EditedVersionsOnly
            | VersionOrganisation::OriginalVersionsOnly => {}
        }
        Ok(())
    }

    /// Formats `time` with the file name format in the configured clock.
    ///
    /// # Errors
    ///
    /// Returns [`OptionsError::InvalidFileNameFormat`] if the format can't be rendered.
    pub fn format_time(&self, time: DateTime<Utc>) -> Result<String, OptionsError> {
        match self.file_name_time_kind {
            FileNameTimeKind::Utc => self.format_in(&time),
            FileNameTimeKind::Local => self.format_in(&time.with_timezone(&Local)),
            FileNameTimeKind::Zone(tz) => self.format_in(&time.with_timezone(&tz)),
        }
    }

    fn format_in<T>(&self, time: &DateTime<T>) -> Result<String, OptionsError>
    where
        T: TimeZone,
        T::Offset: std::fmt::Display,
    {
        let mut out = String::new();
        write!(out, "{}", time.format(&self.file_name_format))
            .map_err(|_| OptionsError::InvalidFileNameFormat(self.file_name_format.clone()))?;
        Ok(out)
    }
}

fn check_suffix(suffix: &str) -> Result<(), OptionsError> {
    if suffix.contains(FORBIDDEN_NAME_CHARS) {
        return Err(OptionsError::InvalidName(suffix.to_string()));
    }
    Ok(())
}

fn check_dir_name(name: &str) -> Result<(), OptionsError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(FORBIDDEN_NAME_CHARS) {
        return Err(OptionsError::InvalidName(name.to_string()));
    }
    Ok(())
}
