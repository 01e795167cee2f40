use regex::Regex;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::{DirEntry, WalkDir};

/// Longest name part (excluding extension) that Takeout writes for a media file.
pub const MAX_NAME_LEN: usize = 47;

/// Name of the Takeout directory that holds deleted items.
pub const DELETED_DIR_NAME: &str = "Bin";

const ELLIPSIS: &str = "...";

static RE_UNIQUENESS_SUFFIX: OnceLock<Regex> = OnceLock::new();

/// Name part of a path: the file name without its last extension.
pub fn file_stem_string(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Extension of a path including the leading dot, or an empty string.
pub fn dotted_extension(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}

/// Truncates the name part of `path` to at most `max_len` characters, keeping the directory and
/// extension.
pub fn trim_name(path: &Path, max_len: usize) -> PathBuf {
    let stem = file_stem_string(path);
    if stem.chars().count() <= max_len {
        return path.to_path_buf();
    }
    let trimmed: String = stem.chars().take(max_len).collect();
    path.with_file_name(format!("{trimmed}{}", dotted_extension(path)))
}

/// Appends `s` to the name part of `path`, keeping the directory and extension.
pub fn append_to_name(path: &Path, s: &str) -> PathBuf {
    if s.is_empty() {
        return path.to_path_buf();
    }
    let stem = file_stem_string(path);
    path.with_file_name(format!("{stem}{s}{}", dotted_extension(path)))
}

/// The `"(n)"` uniqueness suffix Takeout appends to colliding names, or an empty string.
///
/// The suffix sits at the end of the name part, which differs between a sidecar and its media:
/// `IMG_1.jpg(1).json` and `IMG_1(1).jpg` both yield `"(1)"`.
pub fn uniqueness_suffix(path: &Path) -> String {
    let re = RE_UNIQUENESS_SUFFIX.get_or_init(|| Regex::new(r"\([^(]*\)$").unwrap());
    let stem = file_stem_string(path);
    re.find(&stem)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Shortens a path for display by replacing its longest directory components with `...` until it
/// is no longer than `max_len` characters, or nothing more can be replaced. The file name is kept.
pub fn compact_path(path: &Path, max_len: usize) -> String {
    let full = path.to_string_lossy().into_owned();
    let separator = std::path::MAIN_SEPARATOR;
    let mut parts: Vec<String> = full.split(separator).map(str::to_string).collect();
    if parts.len() < 2 {
        return full;
    }

    let mut len = full.chars().count();
    let last = parts.len() - 1;
    while len > max_len {
        let Some((longest, part)) = parts[..last]
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| {
                a.chars()
                    .count()
                    .cmp(&b.chars().count())
                    // Earliest wins a tie.
                    .then_with(|| ib.cmp(ia))
            })
        else {
            break;
        };
        let part_len = part.chars().count();
        if part_len <= ELLIPSIS.len() {
            break;
        }
        len = len - part_len + ELLIPSIS.len();
        parts[longest] = ELLIPSIS.to_string();
    }
    parts.join(&separator.to_string())
}

fn is_deleted_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_type().is_dir() && entry.file_name() == DELETED_DIR_NAME
}

fn is_json_file(entry: &DirEntry) -> bool {
    entry.file_type().is_file()
        && entry
            .path()
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Files before directories, then by name compared byte-wise.
fn sidecar_order(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

/// Lazily walks `dir` for `.json` sidecar candidates.
///
/// Within each directory the files are yielded in name order before any subdirectory is entered,
/// and subdirectories are visited in name order. Names compare ordinally, byte by byte, so
/// `B.jpg.json` comes before `a.jpg.json`. The deleted-items directory is pruned unless
/// `include_deleted` is set. Traversal errors are yielded in place so the caller can report them
/// and carry on.
pub fn sidecar_files(
    dir: &Path,
    include_deleted: bool,
) -> impl Iterator<Item = Result<PathBuf, walkdir::Error>> + Send + use<> {
    WalkDir::new(dir)
        .sort_by(sidecar_order)
        .into_iter()
        .filter_entry(move |e| include_deleted || !is_deleted_dir(e))
        .filter_map(|entry_result| match entry_result {
            Ok(entry) if is_json_file(&entry) => Some(Ok(entry.into_path())),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })
}
