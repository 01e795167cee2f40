use super::Slot;
use crate::error::LogError;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Write;

fn xml_error(e: impl std::fmt::Display) -> LogError {
    LogError::Xml(e.to_string())
}

/// Indented XML. Every object, array and scalar becomes an element named after its slot.
pub(super) struct XmlSink {
    writer: Writer<Box<dyn Write + Send>>,
}

impl XmlSink {
    pub(super) fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Writer::new_with_indent(out, b' ', 2),
        }
    }

    pub(super) fn start_document(&mut self) -> Result<(), LogError> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(xml_error)
    }

    pub(super) fn end_document(&mut self) -> Result<(), LogError> {
        self.writer.get_mut().write_all(b"\n")?;
        Ok(())
    }

    pub(super) fn start(&mut self, slot: Slot<'_>) -> Result<(), LogError> {
        let name = slot.name.ok_or(LogError::MissingName)?;
        self.writer
            .write_event(Event::Start(BytesStart::new(name)))
            .map_err(xml_error)
    }

    pub(super) fn end(&mut self, name: &str) -> Result<(), LogError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_error)
    }

    pub(super) fn write_text(&mut self, slot: Slot<'_>, value: &str) -> Result<(), LogError> {
        let name = slot.name.ok_or(LogError::MissingName)?;
        self.writer
            .create_element(name)
            .write_text_content(BytesText::new(value))
            .map_err(xml_error)?;
        Ok(())
    }

    pub(super) fn flush(&mut self) -> Result<(), LogError> {
        self.writer.get_mut().flush()?;
        Ok(())
    }
}
