//! # Takeout Extractor
//!
//! Turn a Google Photos Takeout export into an organised photo and video library.
//!
//! A Takeout export stores every media file next to a JSON sidecar holding the metadata the
//! service kept outside the file: when it was taken, its description and where it was taken. This
//! crate pairs each sidecar with its original file and, when there is one, the edited version,
//! then copies them into a predictable layout with that metadata written back into the copies.
//!
//! ## Key Features
//!
//! - **Original/Edited Matching**: Resolves truncated and `(n)`-suffixed names back to the files a
//!   sidecar refers to, and finds the edited copy without mixing up siblings.
//! - **Version Layouts**: Keep only the latest version, both versions side by side, or either
//!   version on its own, with optional year/month/day directories.
//! - **EXIF Rewrite**: Title, description, capture time and GPS location are written into copied
//!   images; file times are set to the sidecar's timestamps.
//! - **Results and Alerts**: Counters, coverage and an ordered alert list per run, optionally
//!   streamed to a JSON or XML log and to a progress channel.
//!
//! ## Usage
//!
//! Build a [`TakeoutExtractor`] and call [`TakeoutExtractor::extract`].
//!
//! ```rust,no_run
//! use takeout_extractor::options::{DirOrganisation, ExtractionOptions, VersionOrganisation};
//! use takeout_extractor::structured_log::{LogFormat, StructuredLog};
//! use takeout_extractor::TakeoutExtractor;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let output = Path::new("Library");
//!     std::fs::create_dir_all(output)?;
//!
//!     let options = ExtractionOptions::builder()
//!         .version_organisation(VersionOrganisation::AllVersionsOriginalsSubdir)
//!         .dir_organisation(DirOrganisation::YearMonth)
//!         .build();
//!     let log = StructuredLog::create(&output.join(LogFormat::Json.file_name()), LogFormat::Json)?;
//!
//!     let result = TakeoutExtractor::builder()
//!         .input_dir("Takeout/Google Photos")
//!         .output_dir(output)
//!         .options(options)
//!         .log(log)
//!         .build()?
//!         .extract()
//!         .await?;
//!
//!     println!("Extracted {} of {} items", result.output_file_count, result.input_group_count);
//!     for alert in result.alerts() {
//!         println!("{alert}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod events;
pub mod extractor;
pub mod features;
pub mod options;
pub mod results;
pub mod structs;
pub mod structured_log;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use error::TakeoutError;
pub use events::{CancellationToken, ExtractionEvent};
pub use extractor::TakeoutExtractor;
pub use options::ExtractionOptions;
pub use results::{Alert, AlertKind, ExtractionResult};
