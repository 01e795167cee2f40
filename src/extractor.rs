use crate::error::TakeoutError;
use crate::events::{CancellationToken, ExtractionEvent};
use crate::features::error::{OutputError, ResolveError};
use crate::features::manifest::{is_ignored_sidecar, parse_sidecar};
use crate::features::output::{OutputMetadata, create_output_file};
use crate::features::placement::{Placement, base_output_dir, plan_placement};
use crate::features::resolver::resolve_media;
use crate::options::ExtractionOptions;
use crate::results::{Alert, AlertKind, ExtractionResult, LOG_TIME_FORMAT};
use crate::structs::SidecarManifest;
use crate::structured_log::StructuredLog;
use crate::utils::{compact_path, sidecar_files};
use bon::bon;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

/// Longest path printed in tracing output before it gets shortened.
const TRACE_PATH_LEN: usize = 120;

/// Extracts one Google Photos Takeout tree into an organised library.
///
/// Sidecars are processed one at a time in a fixed order. Each run owns its result, its log and
/// its event channel.
///
/// ```rust,no_run
/// # use takeout_extractor::{TakeoutExtractor, TakeoutError};
/// # #[tokio::main]
/// # async fn main() -> Result<(), TakeoutError> {
/// let result = TakeoutExtractor::builder()
///     .input_dir("Takeout/Google Photos")
///     .output_dir("Library")
///     .build()?
///     .extract()
///     .await?;
/// println!("Coverage: {:.1}%", result.coverage_percent());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TakeoutExtractor {
    input_dir: PathBuf,
    output_dir: PathBuf,
    options: ExtractionOptions,
    log: Option<StructuredLog>,
    events: Option<UnboundedSender<ExtractionEvent>>,
    cancellation: CancellationToken,
}

/// How the walk ended when it didn't fail.
enum WalkEnd {
    Completed,
    Cancelled,
}

#[bon]
impl TakeoutExtractor {
    /// Constructs a `TakeoutExtractor` via a builder pattern.
    ///
    /// # Builder Arguments
    ///
    /// * `input_dir` - The Takeout directory holding the media files and their JSON sidecars.
    /// * `output_dir` - Root of the organised library. Created if missing.
    /// * `options` - (Default: [`ExtractionOptions::default`]) Layout and behaviour of the run.
    /// * `log` - An optional structured log that receives every extracted file, the results and
    ///   the alerts.
    /// * `events` - An optional channel for progress and alert notifications.
    /// * `cancellation` - A token the caller can trigger to stop the run between sidecars.
    ///
    /// # Errors
    ///
    /// * [`TakeoutError::Options`] if the options don't validate.
    /// * [`TakeoutError::MissingInputDir`] if `input_dir` is not a directory.
    #[builder]
    pub fn new(
        #[builder(into)] input_dir: PathBuf,
        #[builder(into)] output_dir: PathBuf,
        #[builder(default)] options: ExtractionOptions,
        log: Option<StructuredLog>,
        events: Option<UnboundedSender<ExtractionEvent>>,
        #[builder(default)] cancellation: CancellationToken,
    ) -> Result<Self, TakeoutError> {
        options.validate()?;
        if !input_dir.is_dir() {
            return Err(TakeoutError::MissingInputDir(input_dir));
        }
        Ok(Self {
            input_dir,
            output_dir,
            options,
            log,
            events,
            cancellation,
        })
    }

    /// Runs the extraction to completion.
    ///
    /// Per-item problems become alerts in the returned result. The log, if any, is closed on
    /// every exit path so it stays well-formed.
    ///
    /// # Errors
    ///
    /// * [`TakeoutError::Manifest`] for a sidecar that can't be read or isn't valid JSON.
    /// * [`TakeoutError::Output`] when no unique output name is left for a file.
    /// * [`TakeoutError::StoppedOnError`] at the first Error alert if `stop_on_error` is set.
    /// * [`TakeoutError::Cancelled`] with the partial result if the token was triggered.
    /// * [`TakeoutError::Io`], [`TakeoutError::Walk`] or [`TakeoutError::Log`] for failures of
    ///   the output root, the input root or the log.
    pub async fn extract(self) -> Result<ExtractionResult, TakeoutError> {
        let clock = Instant::now();
        let mut run = Run {
            options: self.options,
            output_dir: self.output_dir,
            log: self.log,
            events: self.events,
            result: ExtractionResult::new(Utc::now()),
        };
        info!(
            "Extracting {} into {}",
            compact_path(&self.input_dir, TRACE_PATH_LEN),
            compact_path(&run.output_dir, TRACE_PATH_LEN)
        );

        let walked = match run.start().await {
            Ok(()) => run.walk(&self.input_dir, &self.cancellation).await,
            Err(e) => Err(e),
        };
        run.result.duration = clock.elapsed();
        let finished = run.finish_log();

        let end = walked?;
        finished?;
        info!(
            input_groups = run.result.input_group_count,
            output_groups = run.result.output_file_count,
            alerts = run.result.alerts().len(),
            "Extraction finished in {}",
            run.result.time_taken()
        );
        match end {
            WalkEnd::Completed => Ok(run.result),
            WalkEnd::Cancelled => Err(TakeoutError::Cancelled(Box::new(run.result))),
        }
    }
}

/// State owned by one running extraction.
struct Run {
    options: ExtractionOptions,
    output_dir: PathBuf,
    log: Option<StructuredLog>,
    events: Option<UnboundedSender<ExtractionEvent>>,
    result: ExtractionResult,
}

impl Run {
    async fn start(&mut self) -> Result<(), TakeoutError> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        if let Some(log) = &mut self.log {
            log.start_document()?;
            log.start_object(Some("ExtractionLog"))?;
            log.write_string(
                "Started",
                &self.result.started.format(LOG_TIME_FORMAT).to_string(),
            )?;
            log.start_object(Some("PhotosAndVideos"))?;
            log.start_array(Some("ExtractedFiles"))?;
        }
        Ok(())
    }

    /// Closes the extracted files list and appends results, alerts and the finish time.
    fn finish_log(&mut self) -> Result<(), TakeoutError> {
        let Some(log) = &mut self.log else {
            return Ok(());
        };
        log.end_array()?;
        self.result.write_to(log)?;
        log.end_object()?;
        log.start_array(Some("Alerts"))?;
        for alert in self.result.alerts() {
            alert.write_to(log)?;
        }
        log.end_array()?;
        log.write_string("Finished", &Utc::now().format(LOG_TIME_FORMAT).to_string())?;
        log.end_object()?;
        log.end_document()?;
        Ok(())
    }

    async fn walk(
        &mut self,
        input_dir: &Path,
        cancellation: &CancellationToken,
    ) -> Result<WalkEnd, TakeoutError> {
        for entry in sidecar_files(input_dir, self.options.extract_deleted) {
            // Lets a canceller on the same runtime get in between sidecars.
            tokio::task::yield_now().await;
            if cancellation.is_cancelled() {
                info!("Extraction cancelled");
                return Ok(WalkEnd::Cancelled);
            }
            match entry {
                Ok(sidecar) => self.process_sidecar(&sidecar).await?,
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(e) => {
                    let mut alert = Alert::error("Failed to read part of the input directory");
                    if let Some(path) = e.path() {
                        alert = alert.with_directory(path);
                    }
                    self.raise(alert.with_error(&e))?;
                }
            }
        }
        Ok(WalkEnd::Completed)
    }

    async fn process_sidecar(&mut self, sidecar: &Path) -> Result<(), TakeoutError> {
        if is_ignored_sidecar(sidecar) {
            debug!("Skipping {}", sidecar.display());
            return Ok(());
        }
        let Some(manifest) = parse_sidecar(sidecar).await? else {
            debug!("Not a media sidecar: {}", sidecar.display());
            return Ok(());
        };
        debug!("Processing {}", compact_path(sidecar, TRACE_PATH_LEN));

        let pair = match resolve_media(sidecar, &manifest).await {
            Ok(pair) => pair,
            Err(e) => return self.raise(resolve_alert(sidecar, &e)),
        };

        self.result.input_group_count += 1;
        if pair.edited.is_some() {
            self.result.input_edited_count += 1;
        } else {
            self.result.input_unedited_count += 1;
        }

        let base = base_output_dir(
            &self.output_dir,
            &pair.original,
            manifest.taken_time,
            &self.options,
        );
        let plan = plan_placement(&pair, &base, &self.options);
        let mut written = 0;

        if let Some(placement) = &plan.original {
            let metadata = OutputMetadata {
                modified_time: Some(manifest.creation_time),
                location: manifest.exif_location,
                ..output_metadata(&manifest)
            };
            if self
                .write_output(sidecar, &pair.original, placement, &metadata)
                .await?
            {
                written += 1;
                if plan.edited.is_none() {
                    self.result.output_unedited_count += 1;
                }
            }
        }

        if let (Some(edited), Some(placement)) = (&pair.edited, &plan.edited) {
            let metadata = OutputMetadata {
                modified_time: manifest.last_modified_time,
                location: manifest.edited_or_exif_location(),
                ..output_metadata(&manifest)
            };
            if self.write_output(sidecar, edited, placement, &metadata).await? {
                written += 1;
                self.result.output_edited_count += 1;
            }
        }

        if written > 0 {
            self.result.output_file_count += 1;
        }
        Ok(())
    }

    /// Writes one output file. Returns whether a file was produced.
    async fn write_output(
        &mut self,
        sidecar: &Path,
        source: &Path,
        placement: &Placement,
        metadata: &OutputMetadata,
    ) -> Result<bool, TakeoutError> {
        match create_output_file(source, placement, metadata, &self.options).await {
            Ok(file) => {
                info!(
                    "{} -> {}",
                    compact_path(source, TRACE_PATH_LEN),
                    compact_path(&file.destination, TRACE_PATH_LEN)
                );
                if let Some(log) = &mut self.log {
                    file.write_to(log)?;
                }
                self.notify(ExtractionEvent::Progress {
                    source: file.source.clone(),
                    destination: file.destination.clone(),
                });
                if let Some(alert) = file.alert {
                    self.raise(alert)?;
                }
                Ok(true)
            }
            Err(e @ OutputError::UniquenessOverflow { .. }) => {
                let alert = Alert::error("Couldn't create a unique output filename")
                    .with_directory(&placement.dir)
                    .with_file(source)
                    .with_error(&e);
                self.record(alert);
                Err(e.into())
            }
            Err(e) => {
                let alert =
                    Alert::error(format!("Failed to create outputs for {}", sidecar.display()))
                        .with_file(source)
                        .with_error(&e);
                self.raise(alert)?;
                Ok(false)
            }
        }
    }

    /// Records an alert and, with `stop_on_error`, turns an Error alert into a fatal error.
    fn raise(&mut self, alert: Alert) -> Result<(), TakeoutError> {
        let stop = self.options.stop_on_error && alert.is_error();
        let description = alert.description.clone();
        self.record(alert);
        if stop {
            return Err(TakeoutError::StoppedOnError(description));
        }
        Ok(())
    }

    fn record(&mut self, alert: Alert) {
        let file = alert.file.as_deref().map(|f| compact_path(f, TRACE_PATH_LEN));
        match alert.kind {
            AlertKind::Error => error!(?file, error = ?alert.error, "{}", alert.description),
            AlertKind::Warning => warn!(?file, error = ?alert.error, "{}", alert.description),
            AlertKind::Information => info!(?file, "{}", alert.description),
        }
        self.notify(ExtractionEvent::Alert(alert.clone()));
        self.result.add_alert(alert);
    }

    fn notify(&self, event: ExtractionEvent) {
        if let Some(events) = &self.events {
            // A closed receiver just means nobody is listening anymore.
            let _ = events.send(event);
        }
    }
}

fn output_metadata(manifest: &SidecarManifest) -> OutputMetadata {
    OutputMetadata {
        title: manifest.title.clone(),
        description: manifest.description.clone(),
        taken_time: manifest.taken_time,
        creation_time: manifest.creation_time,
        modified_time: None,
        location: manifest.exif_location,
    }
}

fn resolve_alert(sidecar: &Path, e: &ResolveError) -> Alert {
    let alert = match e {
        ResolveError::MissingExtension(_) => {
            Alert::error("Metadata title without file extension").with_file(sidecar)
        }
        ResolveError::OriginalNotFound { expected, .. } => {
            Alert::error("Failed to identify original content file")
                .with_file(sidecar)
                .with_info(format!("Expected {}", expected.display()))
        }
        ResolveError::EditedSearch { dir, .. } => {
            Alert::error("Failed to search for an edited version").with_directory(dir)
        }
    };
    alert.with_error(e)
}
