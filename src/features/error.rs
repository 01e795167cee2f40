use crate::results::AlertKind;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    #[error("Latitude out of range: {0}")]
    LatitudeOutOfRange(f64),

    #[error("Longitude out of range: {0}")]
    LongitudeOutOfRange(f64),

    #[error("Sign mismatch for {axis} decimal degrees {decimal} and degrees {degrees}")]
    SignMismatch {
        axis: &'static str,
        decimal: f64,
        degrees: f64,
    },
}

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to read sidecar {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in sidecar {}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid timestamp '{value}' in field {field}")]
    InvalidTimestamp { field: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Metadata title without file extension in {}", .0.display())]
    MissingExtension(PathBuf),

    #[error("Failed to identify original content file for {}", sidecar.display())]
    OriginalNotFound { sidecar: PathBuf, expected: PathBuf },

    #[error("Failed to search for an edited version in {}", dir.display())]
    EditedSearch {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ExifError {
    #[error("Could not convert the location for GPS tags: {0}")]
    Location(#[from] GeoError),

    #[error("Failed to write EXIF data")]
    Write(#[source] std::io::Error),

    #[error("The EXIF library panicked while writing {}", .0.display())]
    Panicked(PathBuf),

    #[error("EXIF update task failed: {0}")]
    Task(String),
}

impl ExifError {
    /// The alert severity this failure is reported with. The byte copy survives every variant.
    pub const fn severity(&self) -> AlertKind {
        match self {
            Self::Location(_) => AlertKind::Warning,
            Self::Write(_) | Self::Panicked(_) | Self::Task(_) => AlertKind::Error,
        }
    }
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("I/O error while creating output file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Couldn't create a unique output filename in {} for {}", dir.display(), source_file.display())]
    UniquenessOverflow { dir: PathBuf, source_file: PathBuf },

    #[error("Invalid output filename format: {0}")]
    FileNameFormat(String),
}
