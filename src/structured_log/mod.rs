//! A streaming log writer with one schema and two encodings, JSON and XML.
//!
//! Callers issue nested start/end calls and named scalar writes. Inside an array, JSON drops the
//! names of its elements while XML keeps them as element names, so the same call sequence
//! produces equivalent documents in both formats.

mod json;
mod xml;

use crate::error::LogError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Encoding of the structured log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum LogFormat {
    #[default]
    Json,
    Xml,
}

impl LogFormat {
    /// Default log file name for this format.
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Json => "logfile.json",
            Self::Xml => "logfile.xml",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Document,
    Object,
    Array,
}

#[derive(Debug)]
struct Scope {
    kind: ScopeKind,
    name: Option<String>,
    has_items: bool,
}

/// Position of a new item, handed to the encoder.
#[derive(Debug, Clone, Copy)]
struct Slot<'a> {
    /// Name to emit; `None` inside JSON arrays.
    name: Option<&'a str>,
    first: bool,
    depth: usize,
}

enum Sink {
    Json(json::JsonSink),
    Xml(xml::XmlSink),
}

/// Sequential, single-owner structured log. Not for concurrent use.
pub struct StructuredLog {
    sink: Sink,
    format: LogFormat,
    scopes: Vec<Scope>,
}

impl std::fmt::Debug for StructuredLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuredLog")
            .field("format", &self.format)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

impl StructuredLog {
    /// Writes the log to any byte sink.
    pub fn new<W: Write + Send + 'static>(writer: W, format: LogFormat) -> Self {
        let out: Box<dyn Write + Send> = Box::new(writer);
        let sink = match format {
            LogFormat::Json => Sink::Json(json::JsonSink::new(out)),
            LogFormat::Xml => Sink::Xml(xml::XmlSink::new(out)),
        };
        Self {
            sink,
            format,
            scopes: Vec::new(),
        }
    }

    /// Creates (or truncates) a log file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Io`] if the file can't be created.
    pub fn create(path: &Path, format: LogFormat) -> Result<Self, LogError> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file), format))
    }

    pub const fn format(&self) -> LogFormat {
        self.format
    }

    pub fn start_document(&mut self) -> Result<(), LogError> {
        if !self.scopes.is_empty() {
            return Err(LogError::Unbalanced("document started twice"));
        }
        match &mut self.sink {
            Sink::Json(s) => s.start_document()?,
            Sink::Xml(s) => s.start_document()?,
        }
        self.scopes.push(Scope {
            kind: ScopeKind::Document,
            name: None,
            has_items: false,
        });
        Ok(())
    }

    /// Closes the document and flushes the underlying writer.
    pub fn end_document(&mut self) -> Result<(), LogError> {
        let scope = self.pop(ScopeKind::Document, "end of document inside an open object or array")?;
        if !self.scopes.is_empty() {
            return Err(LogError::Unbalanced("end of document with open elements"));
        }
        match &mut self.sink {
            Sink::Json(s) => s.end_document(scope.has_items)?,
            Sink::Xml(s) => s.end_document()?,
        }
        self.flush()
    }

    pub fn start_object(&mut self, name: Option<&str>) -> Result<(), LogError> {
        self.start(ScopeKind::Object, name)
    }

    pub fn end_object(&mut self) -> Result<(), LogError> {
        self.end(ScopeKind::Object, "end of object inside an array")
    }

    pub fn start_array(&mut self, name: Option<&str>) -> Result<(), LogError> {
        self.start(ScopeKind::Array, name)
    }

    pub fn end_array(&mut self) -> Result<(), LogError> {
        self.end(ScopeKind::Array, "end of array outside an array")
    }

    pub fn write_string(&mut self, name: &str, value: &str) -> Result<(), LogError> {
        let slot = self.next_slot(Some(name))?;
        match &mut self.sink {
            Sink::Json(s) => s.write_scalar(slot, &value),
            Sink::Xml(s) => s.write_text(slot, value),
        }
    }

    pub fn write_u64(&mut self, name: &str, value: u64) -> Result<(), LogError> {
        let slot = self.next_slot(Some(name))?;
        match &mut self.sink {
            Sink::Json(s) => s.write_scalar(slot, &value),
            Sink::Xml(s) => s.write_text(slot, &value.to_string()),
        }
    }

    pub fn write_f64(&mut self, name: &str, value: f64) -> Result<(), LogError> {
        let slot = self.next_slot(Some(name))?;
        match &mut self.sink {
            Sink::Json(s) => s.write_scalar(slot, &value),
            Sink::Xml(s) => s.write_text(slot, &value.to_string()),
        }
    }

    pub fn flush(&mut self) -> Result<(), LogError> {
        match &mut self.sink {
            Sink::Json(s) => s.flush(),
            Sink::Xml(s) => s.flush(),
        }
    }

    fn start(&mut self, kind: ScopeKind, name: Option<&str>) -> Result<(), LogError> {
        let slot = self.next_slot(name)?;
        match &mut self.sink {
            Sink::Json(s) => s.start(kind, slot)?,
            Sink::Xml(s) => s.start(slot)?,
        }
        self.scopes.push(Scope {
            kind,
            name: name.map(str::to_string),
            has_items: false,
        });
        Ok(())
    }

    fn end(&mut self, kind: ScopeKind, mismatch: &'static str) -> Result<(), LogError> {
        let scope = self.pop(kind, mismatch)?;
        let depth = self.scopes.len();
        match &mut self.sink {
            Sink::Json(s) => s.end(kind, scope.has_items, depth),
            Sink::Xml(s) => s.end(scope.name.as_deref().unwrap_or_default()),
        }
    }

    fn pop(&mut self, kind: ScopeKind, mismatch: &'static str) -> Result<Scope, LogError> {
        match self.scopes.last() {
            Some(top) if top.kind == kind => {}
            Some(_) => return Err(LogError::Unbalanced(mismatch)),
            None => return Err(LogError::Unbalanced("no open document")),
        }
        self.scopes
            .pop()
            .ok_or(LogError::Unbalanced("no open document"))
    }

    /// Checks naming rules for a new item in the innermost scope and marks that scope non-empty.
    fn next_slot<'a>(&mut self, name: Option<&'a str>) -> Result<Slot<'a>, LogError> {
        let format = self.format;
        let depth = self.scopes.len();
        let Some(parent) = self.scopes.last_mut() else {
            return Err(LogError::Unbalanced("no open document"));
        };

        let in_array = parent.kind == ScopeKind::Array;
        let name = match (format, in_array) {
            (LogFormat::Json, true) => None,
            (LogFormat::Json, false) | (LogFormat::Xml, _) => Some(name.ok_or(LogError::MissingName)?),
        };
        let first = !parent.has_items;
        parent.has_items = true;
        Ok(Slot { name, first, depth })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// A `Write` handle whose bytes stay readable after the log is dropped.
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0
                .lock()
                .map_err(|_| std::io::Error::other("poisoned"))?
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn write_sample(log: &mut StructuredLog) -> Result<(), LogError> {
        log.start_document()?;
        log.start_object(Some("ExtractionLog"))?;
        log.write_string("Started", "2024-01-02 03:04:05Z")?;
        log.start_array(Some("ExtractedFiles"))?;
        log.start_object(Some("Item"))?;
        log.write_string("Type", "Photo")?;
        log.write_string("Source", "in/a&b.jpg")?;
        log.end_object()?;
        log.end_array()?;
        log.start_array(Some("Alerts"))?;
        log.end_array()?;
        log.start_object(Some("Results"))?;
        log.write_u64("InputGroupTotalCount", 1)?;
        log.write_f64("CoveragePercent", 100.0)?;
        log.end_object()?;
        log.end_object()?;
        log.end_document()
    }

    #[test]
    fn test_json_document() -> Result<(), Box<dyn std::error::Error>> {
        let buffer = SharedBuffer::default();
        let mut log = StructuredLog::new(buffer.clone(), LogFormat::Json);
        write_sample(&mut log)?;

        let value: serde_json::Value = serde_json::from_str(&buffer.contents())?;
        let root = &value["ExtractionLog"];
        assert_eq!(root["Started"], "2024-01-02 03:04:05Z");
        assert_eq!(root["ExtractedFiles"][0]["Type"], "Photo");
        assert_eq!(root["ExtractedFiles"][0]["Source"], "in/a&b.jpg");
        assert_eq!(root["Alerts"], serde_json::json!([]));
        assert_eq!(root["Results"]["InputGroupTotalCount"], 1);
        assert_eq!(root["Results"]["CoveragePercent"], 100.0);
        Ok(())
    }

    #[test]
    fn test_json_array_of_strings_drops_names() -> Result<(), Box<dyn std::error::Error>> {
        let buffer = SharedBuffer::default();
        let mut log = StructuredLog::new(buffer.clone(), LogFormat::Json);
        log.start_document()?;
        log.start_array(Some("Info"))?;
        log.write_string("Value", "one")?;
        log.write_string("Value", "two")?;
        log.end_array()?;
        log.end_document()?;

        let value: serde_json::Value = serde_json::from_str(&buffer.contents())?;
        assert_eq!(value["Info"], serde_json::json!(["one", "two"]));
        Ok(())
    }

    #[test]
    fn test_xml_document() -> Result<(), Box<dyn std::error::Error>> {
        let buffer = SharedBuffer::default();
        let mut log = StructuredLog::new(buffer.clone(), LogFormat::Xml);
        write_sample(&mut log)?;

        let xml = buffer.contents();
        assert!(xml.starts_with("<?xml"), "XML declaration first: {xml}");
        assert!(xml.contains("<ExtractionLog>"));
        assert!(xml.contains("<Started>2024-01-02 03:04:05Z</Started>"));
        assert!(xml.contains("<Item>"));
        assert!(xml.contains("<Source>in/a&amp;b.jpg</Source>"), "Text is escaped: {xml}");
        assert!(xml.contains("<InputGroupTotalCount>1</InputGroupTotalCount>"));
        assert!(xml.trim_end().ends_with("</ExtractionLog>"));
        Ok(())
    }

    #[test]
    fn test_unbalanced_calls_are_rejected() -> Result<(), LogError> {
        let mut log = StructuredLog::new(Vec::new(), LogFormat::Json);
        assert!(matches!(log.end_object(), Err(LogError::Unbalanced(_))));

        log.start_document()?;
        log.start_array(Some("Items"))?;
        assert!(matches!(log.end_object(), Err(LogError::Unbalanced(_))));
        assert!(matches!(log.end_document(), Err(LogError::Unbalanced(_))));
        log.end_array()?;
        log.end_document()?;
        Ok(())
    }

    #[test]
    fn test_names_required_where_the_format_needs_them() -> Result<(), LogError> {
        let mut json = StructuredLog::new(Vec::new(), LogFormat::Json);
        json.start_document()?;
        assert!(matches!(json.start_object(None), Err(LogError::MissingName)));
        json.start_array(Some("Items"))?;
        json.start_object(None)?;

        let mut xml = StructuredLog::new(Vec::new(), LogFormat::Xml);
        xml.start_document()?;
        xml.start_array(Some("Items"))?;
        assert!(matches!(xml.start_object(None), Err(LogError::MissingName)));
        Ok(())
    }

    #[test]
    fn test_log_file_names() {
        assert_eq!(LogFormat::Json.file_name(), "logfile.json");
        assert_eq!(LogFormat::Xml.file_name(), "logfile.xml");
    }
}
