//! The individual stages of turning one sidecar into output files.
pub mod error;
pub mod exif;
pub mod geo;
pub mod manifest;
pub mod output;
pub mod placement;
pub mod resolver;
