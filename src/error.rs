use crate::results::ExtractionResult;
use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for the takeout-extractor crate.
///
/// Every variant ends the run. Per-item problems are reported as
/// [`Alert`](crate::results::Alert)s instead.
#[derive(Error, Debug)]
pub enum TakeoutError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to walk the input directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Input directory does not exist: {}", .0.display())]
    MissingInputDir(PathBuf),

    // --- Custom Module Errors ---
    #[error("Invalid extraction options: {0}")]
    Options(#[from] OptionsError),

    #[error("Sidecar parsing failed: {0}")]
    Manifest(#[from] crate::features::error::ManifestError),

    #[error("Output file creation failed: {0}")]
    Output(#[from] crate::features::error::OutputError),

    #[error("Structured log failed: {0}")]
    Log(#[from] LogError),

    // --- Run Control ---
    #[error("Stopped on error: {0}")]
    StoppedOnError(String),

    /// The run was cancelled. Carries the partial result; output already written is kept.
    #[error("Extraction was cancelled")]
    Cancelled(Box<ExtractionResult>),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptionsError {
    #[error("Invalid output file name format: '{0}'")]
    InvalidFileNameFormat(String),

    #[error("Output file name format '{format}' produces an unusable file name '{sample}'")]
    InvalidFileName { format: String, sample: String },

    #[error("Original and edited versions need distinct, non-empty suffixes (got '{original}' and '{edited}')")]
    AmbiguousSuffixes { original: String, edited: String },

    #[error("Original and edited versions need distinct subdirectories (got '{originals}' and '{edited}')")]
    AmbiguousSubdirs { originals: String, edited: String },

    #[error("Invalid file name component: '{0}'")]
    InvalidName(String),
}

#[derive(Error, Debug)]
pub enum LogError {
    #[error("I/O error writing log: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error writing log: {0}")]
    Xml(String),

    #[error("JSON error writing log: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unbalanced log structure: {0}")]
    Unbalanced(&'static str),

    #[error("Log element inside an object needs a name")]
    MissingName,
}
