//! Locating the media files a sidecar refers to.
//!
//! Takeout truncates the name part of media files to [`MAX_NAME_LEN`] characters and appends a
//! `"(n)"` uniqueness suffix to colliding names, in a different position on the sidecar than on the
//! media file. The original file can be rebuilt from the sidecar's title; the edited file cannot,
//! because the suffix marking an edit has changed over time, so it is searched for.

use crate::features::error::ResolveError;
use crate::structs::{MediaPair, SidecarManifest};
use crate::utils::{
    MAX_NAME_LEN, append_to_name, dotted_extension, file_stem_string, trim_name,
    uniqueness_suffix,
};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Replaces characters Takeout substitutes in file names, plus path separators.
pub fn sanitize_title(title: &str) -> String {
    title.replace(['&', '?', '/', '\\'], "_")
}

/// Finds the original media file for `sidecar` and its edited version, if any.
///
/// # Errors
///
/// * [`ResolveError::MissingExtension`] if the title has no file extension.
/// * [`ResolveError::OriginalNotFound`] if the rebuilt original path is not an existing file.
/// * [`ResolveError::EditedSearch`] if the sidecar's directory cannot be listed.
pub async fn resolve_media(
    sidecar: &Path,
    manifest: &SidecarManifest,
) -> Result<MediaPair, ResolveError> {
    let title = sanitize_title(&manifest.title);
    if Path::new(&title)
        .extension()
        .is_none_or(|ext| ext.is_empty())
    {
        return Err(ResolveError::MissingExtension(sidecar.to_path_buf()));
    }

    let dir = sidecar.parent().unwrap_or(Path::new(""));
    let suffix = uniqueness_suffix(sidecar);
    let original = append_to_name(&trim_name(&dir.join(&title), MAX_NAME_LEN), &suffix);

    let is_file = tokio::fs::metadata(&original)
        .await
        .is_ok_and(|m| m.is_file());
    if !is_file {
        return Err(ResolveError::OriginalNotFound {
            sidecar: sidecar.to_path_buf(),
            expected: original,
        });
    }

    let edited = find_edited(&original, sidecar, &suffix).await?;
    debug!(?original, ?edited, "Resolved media for {}", sidecar.display());
    Ok(MediaPair { original, edited })
}

/// Searches the original's directory for its edited version.
///
/// Candidates are files named `<original stem without suffix>*<suffix><ext>`, in name order. A
/// candidate with a sidecar of its own (other than `sidecar`) is another original and is skipped.
/// The first candidate that either extends a maximum-length original name or carries the same
/// uniqueness suffix as the original is the edited file.
///
/// # Errors
///
/// Returns [`ResolveError::EditedSearch`] if the directory cannot be listed.
pub async fn find_edited(
    original: &Path,
    sidecar: &Path,
    suffix: &str,
) -> Result<Option<PathBuf>, ResolveError> {
    let dir = original.parent().unwrap_or(Path::new(""));
    let original_stem = file_stem_string(original);
    let original_suffix = uniqueness_suffix(original);

    let prefix = if suffix.is_empty() {
        original_stem.clone()
    } else {
        original_stem.replace(suffix, "")
    };
    let tail = format!("{suffix}{}", dotted_extension(original));

    let mut candidates = matching_files(dir, &prefix, &tail).await?;
    candidates.sort();
    candidates.retain(|c| c.file_name() != original.file_name());

    for candidate in candidates {
        if has_other_sidecar(&candidate, sidecar).await {
            continue;
        }

        let stem = file_stem_string(&candidate);
        if stem.chars().count() >= MAX_NAME_LEN && stem.starts_with(&original_stem) {
            return Ok(Some(candidate));
        }
        if uniqueness_suffix(&candidate) == original_suffix {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

/// Regular files in `dir` whose name starts with `prefix` and ends with `tail`, unordered.
async fn matching_files(dir: &Path, prefix: &str, tail: &str) -> Result<Vec<PathBuf>, ResolveError> {
    let search_error = |source| ResolveError::EditedSearch {
        dir: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(search_error)?;
    let mut matches = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(search_error)? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.len() < prefix.len() + tail.len()
            || !name.starts_with(prefix)
            || !name.ends_with(tail)
        {
            continue;
        }
        if entry.file_type().await.is_ok_and(|t| t.is_file()) {
            matches.push(entry.path());
        }
    }
    Ok(matches)
}

/// Whether `candidate` has a sidecar that isn't `current`, under any of the names Takeout uses:
/// `IMG.json`, `IMG.jpg.json`, or `IMG.jpg(1).json` for `IMG(1).jpg`.
async fn has_other_sidecar(candidate: &Path, current: &Path) -> bool {
    let stem = file_stem_string(candidate);
    let ext = dotted_extension(candidate);
    let suffix = uniqueness_suffix(candidate);
    let base = stem.strip_suffix(suffix.as_str()).unwrap_or(&stem);

    let names = [
        format!("{stem}.json"),
        format!("{stem}{ext}.json"),
        format!("{base}{ext}{suffix}.json"),
    ];
    for name in names {
        let possible = candidate.with_file_name(name);
        if possible.file_name() == current.file_name() {
            continue;
        }
        if tokio::fs::try_exists(&possible).await.unwrap_or(false) {
            return true;
        }
    }
    false
}
