//! Run outcome: counters plus an ordered list of alerts.

use crate::error::LogError;
use crate::structured_log::StructuredLog;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Timestamp format used in logs and alert text, e.g. `2019-05-05 10:10:10Z`.
pub const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%SZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum AlertKind {
    Error,
    Warning,
    Information,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Error => "Error",
            Self::Warning => "Warning",
            Self::Information => "Information",
        };
        f.write_str(name)
    }
}

/// Something noteworthy that happened during a run, with whatever context the caller needs to act
/// on it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Alert {
    pub timestamp: DateTime<Utc>,
    pub kind: AlertKind,
    pub description: String,
    pub file: Option<PathBuf>,
    pub directory: Option<PathBuf>,
    /// Message of the error that caused the alert.
    pub error: Option<String>,
    pub info: Vec<String>,
}

impl Alert {
    pub fn new(kind: AlertKind, description: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            description: description.into(),
            file: None,
            directory: None,
            error: None,
            info: Vec::new(),
        }
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self::new(AlertKind::Error, description)
    }

    #[must_use]
    pub fn with_file(mut self, file: impl AsRef<Path>) -> Self {
        self.file = Some(file.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub fn with_directory(mut self, directory: impl AsRef<Path>) -> Self {
        self.directory = Some(directory.as_ref().to_path_buf());
        self
    }

    /// Attaches an error message, including its chain of sources.
    #[must_use]
    pub fn with_error(mut self, error: &(dyn std::error::Error + 'static)) -> Self {
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        self.error = Some(message);
        self
    }

    #[must_use]
    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info.push(info.into());
        self
    }

    pub const fn is_error(&self) -> bool {
        matches!(self.kind, AlertKind::Error)
    }

    /// Writes an `Alert` object. The error message, if any, is the last `Info` entry.
    pub fn write_to(&self, log: &mut StructuredLog) -> Result<(), LogError> {
        log.start_object(Some("Alert"))?;
        log.write_string("Time", &self.timestamp.format(LOG_TIME_FORMAT).to_string())?;
        log.write_string("Type", &self.kind.to_string())?;
        log.write_string("Description", &self.description)?;
        if let Some(file) = &self.file {
            log.write_string("File", &file.to_string_lossy())?;
        }
        if let Some(directory) = &self.directory {
            log.write_string("Directory", &directory.to_string_lossy())?;
        }
        if !self.info.is_empty() || self.error.is_some() {
            log.start_array(Some("Info"))?;
            for info in self.info.iter().chain(self.error.iter()) {
                log.write_string("Value", info)?;
            }
            log.end_array()?;
        }
        log.end_object()
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} {} {}",
            self.timestamp.format(LOG_TIME_FORMAT),
            self.kind,
            self.description
        )?;
        if let Some(file) = &self.file {
            writeln!(f, "File: {}", file.display())?;
        }
        if let Some(directory) = &self.directory {
            writeln!(f, "Directory: {}", directory.display())?;
        }
        for info in &self.info {
            writeln!(f, "Info: {info}")?;
        }
        if let Some(error) = &self.error {
            writeln!(f, "Error: {error}")?;
        }
        Ok(())
    }
}

/// Counters and alerts for one run.
///
/// * An input group is a sidecar whose original file was found.
/// * An output group is an input group that produced at least one file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExtractionResult {
    pub started: DateTime<Utc>,
    pub duration: Duration,
    pub input_group_count: u32,
    pub input_edited_count: u32,
    pub input_unedited_count: u32,
    pub output_file_count: u32,
    pub output_edited_count: u32,
    pub output_unedited_count: u32,
    alerts: Vec<Alert>,
}

impl ExtractionResult {
    pub fn new(started: DateTime<Utc>) -> Self {
        Self {
            started,
            duration: Duration::ZERO,
            input_group_count: 0,
            input_edited_count: 0,
            input_unedited_count: 0,
            output_file_count: 0,
            output_edited_count: 0,
            output_unedited_count: 0,
            alerts: Vec::new(),
        }
    }

    /// Alerts in the order they were raised.
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn add_alert(&mut self, alert: Alert) {
        self.alerts.push(alert);
    }

    pub fn error_count(&self) -> usize {
        self.alerts.iter().filter(|a| a.is_error()).count()
    }

    /// Output groups per input group, or `0.0` when there were no input groups.
    pub fn coverage(&self) -> f64 {
        if self.input_group_count == 0 {
            0.0
        } else {
            f64::from(self.output_file_count) / f64::from(self.input_group_count)
        }
    }

    pub fn coverage_percent(&self) -> f64 {
        self.coverage() * 100.0
    }

    /// Duration as `hh:mm:ss`.
    pub fn time_taken(&self) -> String {
        let secs = self.duration.as_secs();
        format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
    }

    /// Writes the `Results` object.
    pub fn write_to(&self, log: &mut StructuredLog) -> Result<(), LogError> {
        log.start_object(Some("Results"))?;
        log.write_string("TimeTaken", &self.time_taken())?;
        log.write_u64("InputGroupTotalCount", self.input_group_count.into())?;
        log.write_u64("InputGroupEditedCount", self.input_edited_count.into())?;
        log.write_u64("InputGroupUneditedCount", self.input_unedited_count.into())?;
        log.write_u64("OutputTotalFileCount", self.output_file_count.into())?;
        log.write_u64("OutputEditedFileCount", self.output_edited_count.into())?;
        log.write_u64("OutputUneditedFileCount", self.output_unedited_count.into())?;
        log.write_f64("CoveragePercent", self.coverage_percent())?;
        log.end_object()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::error::ManifestError;
    use crate::structured_log::LogFormat;
    use chrono::TimeZone;

    #[test]
    fn test_coverage_without_input_is_zero() {
        let result = ExtractionResult::new(Utc::now());
        assert_eq!(result.coverage(), 0.0);
        assert_eq!(result.coverage_percent(), 0.0);
    }

    #[test]
    fn test_coverage_ratio() {
        let mut result = ExtractionResult::new(Utc::now());
        result.input_group_count = 4;
        result.output_file_count = 3;
        assert!((result.coverage() - 0.75).abs() < f64::EPSILON);
        assert!((result.coverage_percent() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_time_taken_format() {
        let mut result = ExtractionResult::new(Utc::now());
        result.duration = Duration::from_secs(3 * 3600 + 25 * 60 + 7);
        assert_eq!(result.time_taken(), "03:25:07");
    }

    #[test]
    fn test_alerts_keep_their_order() {
        let mut result = ExtractionResult::new(Utc::now());
        result.add_alert(Alert::error("first"));
        result.add_alert(Alert::new(AlertKind::Warning, "second"));
        result.add_alert(Alert::error("third"));

        let descriptions: Vec<_> = result.alerts().iter().map(|a| a.description.as_str()).collect();
        assert_eq!(descriptions, ["first", "second", "third"]);
        assert_eq!(result.error_count(), 2);
    }

    #[test]
    fn test_alert_text() {
        let source = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad bytes");
        let error = ManifestError::Read {
            path: PathBuf::from("in/a.json"),
            source,
        };
        let mut alert = Alert::error("Failed to read sidecar")
            .with_file("in/a.json")
            .with_info("attempt 1")
            .with_error(&error);
        alert.timestamp = Utc.with_ymd_and_hms(2022, 1, 2, 3, 4, 5).unwrap();

        let text = alert.to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "2022-01-02 03:04:05Z Error Failed to read sidecar");
        assert_eq!(lines[1], format!("File: {}", Path::new("in/a.json").display()));
        assert_eq!(lines[2], "Info: attempt 1");
        assert_eq!(lines[3], "Error: Failed to read sidecar in/a.json: bad bytes");
    }

    #[test]
    fn test_alert_log_entry() -> Result<(), Box<dyn std::error::Error>> {
        let path = tempfile::NamedTempFile::new()?.into_temp_path();
        let mut log = StructuredLog::create(&path, LogFormat::Json)?;
        log.start_document()?;
        log.start_array(Some("Alerts"))?;
        Alert::new(AlertKind::Warning, "Odd location")
            .with_directory("in")
            .with_info("lat 91")
            .write_to(&mut log)?;
        log.end_array()?;
        log.end_document()?;
        drop(log);

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        let alert = &value["Alerts"][0];
        assert_eq!(alert["Type"], "Warning");
        assert_eq!(alert["Description"], "Odd location");
        assert_eq!(alert["Directory"], "in");
        assert_eq!(alert["Info"], serde_json::json!(["lat 91"]));
        assert!(alert.get("File").is_none());
        Ok(())
    }
}
