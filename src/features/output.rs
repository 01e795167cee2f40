//! Creating one output file: unique name, byte copy, EXIF rewrite and file times.

use crate::error::LogError;
use crate::features::error::OutputError;
use crate::features::exif::{ExifUpdate, rewrite_exif_blocking};
use crate::features::geo::LatLonAlt;
use crate::features::placement::Placement;
use crate::options::ExtractionOptions;
use crate::results::{Alert, LOG_TIME_FORMAT};
use crate::structs::MediaKind;
use crate::structured_log::StructuredLog;
use crate::utils::dotted_extension;
use chrono::{DateTime, Utc};
use std::fs::FileTimes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

/// Number of candidate names tried per output file: the bare name, then `-001` to `-9998`.
pub const MAX_NAME_ATTEMPTS: u32 = 9999;

pub const EXIF_UPDATE_FAILED: &str = "An error occurred while updating image EXIF data";

/// What gets embedded in, and stamped on, one output file.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputMetadata {
    pub title: String,
    pub description: Option<String>,
    /// Drives the file name and `DateTimeOriginal`.
    pub taken_time: DateTime<Utc>,
    pub creation_time: DateTime<Utc>,
    /// Falls back to `creation_time` for the file's modification time.
    pub modified_time: Option<DateTime<Utc>>,
    pub location: LatLonAlt,
}

impl OutputMetadata {
    fn effective_modified_time(&self) -> DateTime<Utc> {
        self.modified_time.unwrap_or(self.creation_time)
    }
}

/// A file that was written, with the non-fatal problem hit while writing it, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenFile {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub kind: MediaKind,
    pub creation_time: DateTime<Utc>,
    pub modified_time: Option<DateTime<Utc>>,
    pub alert: Option<Alert>,
}

impl WrittenFile {
    /// Writes an `Item` entry for the extracted files list.
    pub fn write_to(&self, log: &mut StructuredLog) -> Result<(), LogError> {
        log.start_object(Some("Item"))?;
        log.write_string("Type", &self.kind.to_string())?;
        log.write_string("Source", &self.source.to_string_lossy())?;
        log.write_string("Output", &self.destination.to_string_lossy())?;
        log.write_string(
            "CreationTime",
            &self.creation_time.format(LOG_TIME_FORMAT).to_string(),
        )?;
        if let Some(modified) = self.modified_time {
            log.write_string("ModifiedTime", &modified.format(LOG_TIME_FORMAT).to_string())?;
        }
        log.end_object()
    }
}

/// Copies `source` into the placement's directory under a fresh name derived from the taken time.
///
/// A failed EXIF rewrite doesn't fail the call: the copy is kept and the problem is returned as
/// [`WrittenFile::alert`]. File times are set either way.
///
/// # Errors
///
/// * [`OutputError::UniquenessOverflow`] if every candidate name is taken.
/// * [`OutputError::FileNameFormat`] if the taken time can't be formatted.
/// * [`OutputError::Io`] if the directory, the copy or the file times can't be written. The
///   claimed name is released again in that case.
pub async fn create_output_file(
    source: &Path,
    placement: &Placement,
    metadata: &OutputMetadata,
    options: &ExtractionOptions,
) -> Result<WrittenFile, OutputError> {
    tokio::fs::create_dir_all(&placement.dir).await?;

    let stem = options
        .format_time(metadata.taken_time)
        .map_err(|e| OutputError::FileNameFormat(e.to_string()))?;
    let tail = format!(
        "{}{}",
        placement.suffix.as_deref().unwrap_or_default(),
        dotted_extension(source)
    );
    let destination =
        claim_destination(&placement.dir, source, &stem, &tail, MAX_NAME_ATTEMPTS).await?;

    match fill_destination(source, &destination, metadata, options).await {
        Ok(alert) => Ok(WrittenFile {
            source: source.to_path_buf(),
            destination,
            kind: MediaKind::from_path(source),
            creation_time: metadata.creation_time,
            modified_time: metadata.modified_time,
            alert,
        }),
        Err(e) => {
            // Don't leave the claimed placeholder behind.
            if let Err(remove) = tokio::fs::remove_file(&destination).await {
                warn!("Failed to remove {}: {remove}", destination.display());
            }
            Err(e)
        }
    }
}

/// Copies, rewrites EXIF and sets file times on a claimed destination.
async fn fill_destination(
    source: &Path,
    destination: &Path,
    metadata: &OutputMetadata,
    options: &ExtractionOptions,
) -> Result<Option<Alert>, OutputError> {
    tokio::fs::copy(source, destination).await?;
    debug!("Copied {} to {}", source.display(), destination.display());

    let mut alert = None;
    if options.update_exif && MediaKind::supports_exif(destination) {
        let update = ExifUpdate {
            title: metadata.title.clone(),
            description: metadata.description.clone(),
            taken_time: metadata.taken_time,
            modified_time: metadata.effective_modified_time(),
            location: metadata.location,
        };
        if let Err(e) = rewrite_exif_blocking(destination.to_path_buf(), update).await {
            warn!("EXIF update failed for {}: {e}", destination.display());
            alert = Some(
                Alert::new(e.severity(), EXIF_UPDATE_FAILED)
                    .with_file(destination)
                    .with_error(&e),
            );
        }
    }

    set_file_times(
        destination.to_path_buf(),
        metadata.creation_time,
        metadata.effective_modified_time(),
    )
    .await?;
    Ok(alert)
}

/// Creates the first free `<stem>[-NNN]<tail>` in `dir` and returns its path.
///
/// The name is claimed by creating the file, so two writers never get the same name.
async fn claim_destination(
    dir: &Path,
    source: &Path,
    stem: &str,
    tail: &str,
    attempts: u32,
) -> Result<PathBuf, OutputError> {
    for i in 0..attempts {
        let name = if i == 0 {
            format!("{stem}{tail}")
        } else {
            format!("{stem}-{i:03}{tail}")
        };
        let candidate = dir.join(name);
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(_) => return Ok(candidate),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e.into()),
        }
    }
    Err(OutputError::UniquenessOverflow {
        dir: dir.to_path_buf(),
        source_file: source.to_path_buf(),
    })
}

/// Sets the modification time, and the creation time where the platform allows it.
async fn set_file_times(
    path: PathBuf,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
) -> Result<(), OutputError> {
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let file = std::fs::OpenOptions::new().write(true).open(&path)?;
        let times = FileTimes::new().set_modified(SystemTime::from(modified));
        #[cfg(windows)]
        let times = {
            use std::os::windows::fs::FileTimesExt;
            times.set_created(SystemTime::from(created))
        };
        #[cfg(target_os = "macos")]
        let times = {
            use std::os::macos::fs::FileTimesExt;
            times.set_created(SystemTime::from(created))
        };
        #[cfg(not(any(windows, target_os = "macos")))]
        let _ = created;
        file.set_times(times)
    })
    .await
    .map_err(std::io::Error::other)??;
    Ok(())
}
