use super::{ScopeKind, Slot};
use crate::error::LogError;
use serde::Serialize;
use std::io::Write;

const INDENT: &[u8] = b"  ";

/// Pretty-printed JSON, written as the calls arrive. Scalars go through `serde_json` for escaping.
pub(super) struct JsonSink {
    out: Box<dyn Write + Send>,
}

impl JsonSink {
    pub(super) fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out }
    }

    pub(super) fn start_document(&mut self) -> Result<(), LogError> {
        self.out.write_all(b"{")?;
        Ok(())
    }

    pub(super) fn end_document(&mut self, had_items: bool) -> Result<(), LogError> {
        if had_items {
            self.newline(0)?;
        }
        self.out.write_all(b"}\n")?;
        Ok(())
    }

    pub(super) fn start(&mut self, kind: ScopeKind, slot: Slot<'_>) -> Result<(), LogError> {
        self.prefix(slot)?;
        let open: &[u8] = if kind == ScopeKind::Array { b"[" } else { b"{" };
        self.out.write_all(open)?;
        Ok(())
    }

    pub(super) fn end(&mut self, kind: ScopeKind, had_items: bool, depth: usize) -> Result<(), LogError> {
        if had_items {
            self.newline(depth)?;
        }
        let close: &[u8] = if kind == ScopeKind::Array { b"]" } else { b"}" };
        self.out.write_all(close)?;
        Ok(())
    }

    pub(super) fn write_scalar<T: Serialize + ?Sized>(
        &mut self,
        slot: Slot<'_>,
        value: &T,
    ) -> Result<(), LogError> {
        self.prefix(slot)?;
        serde_json::to_writer(&mut self.out, value)?;
        Ok(())
    }

    pub(super) fn flush(&mut self) -> Result<(), LogError> {
        self.out.flush()?;
        Ok(())
    }

    /// Separator, line break, indentation and property name for a new item.
    fn prefix(&mut self, slot: Slot<'_>) -> Result<(), LogError> {
        if !slot.first {
            self.out.write_all(b",")?;
        }
        self.newline(slot.depth)?;
        if let Some(name) = slot.name {
            serde_json::to_writer(&mut self.out, name)?;
            self.out.write_all(b": ")?;
        }
        Ok(())
    }

    fn newline(&mut self, depth: usize) -> Result<(), LogError> {
        self.out.write_all(b"\n")?;
        for _ in 0..depth {
            self.out.write_all(INDENT)?;
        }
        Ok(())
    }
}
