//! Session-key lifecycle audit log.
//!
//! Records every successful create, export and delete. The log is
//! append-only and carries identifiers only, never key bytes. Records can
//! be forwarded to pluggable sinks (files, databases, ...).

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::keys::KeyMaterialHandle;

/// A sink that receives audit records.
pub trait AuditSink: Send {
    /// Append a record. Called once per lifecycle event.
    fn append(&mut self, record: AuditRecord);
}

/// What happened to a session key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyEvent {
    /// A key was derived straight into a caller buffer; no slot was used.
    Exported,
    /// A key was derived into a table slot.
    Created,
    /// A table slot was wiped and freed.
    Deleted,
}

/// A permanent record of a lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// The event.
    pub event: KeyEvent,
    /// Table slot involved, absent for exports.
    pub handle_index: Option<u32>,
    /// Key material the session key was derived from, absent for deletes.
    pub key_material_handle: Option<KeyMaterialHandle>,
    /// Session id used for derivation, absent for deletes.
    pub session_id: Option<u32>,
    /// Whether the receiver-specific branch was used, absent for deletes.
    pub receiver_specific: Option<bool>,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub(crate) fn derived(
        event: KeyEvent,
        handle_index: Option<u32>,
        key_material_handle: KeyMaterialHandle,
        session_id: u32,
        receiver_specific: bool,
    ) -> Self {
        Self {
            event,
            handle_index,
            key_material_handle: Some(key_material_handle),
            session_id: Some(session_id),
            receiver_specific: Some(receiver_specific),
            timestamp: Utc::now(),
        }
    }

    pub(crate) fn deleted(handle_index: u32) -> Self {
        Self {
            event: KeyEvent::Deleted,
            handle_index: Some(handle_index),
            key_material_handle: None,
            session_id: None,
            receiver_specific: None,
            timestamp: Utc::now(),
        }
    }
}

/// An append-only log of lifecycle events.
#[derive(Default)]
pub struct AuditLog {
    records: Vec<AuditRecord>,
    forward_sinks: Vec<Box<dyn AuditSink>>,
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("records", &self.records)
            .field("forward_sinks", &self.forward_sinks.len())
            .finish()
    }
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink to receive a copy of every record.
    pub fn add_forward_sink(&mut self, sink: Box<dyn AuditSink>) {
        self.forward_sinks.push(sink);
    }

    /// Append a record and forward it to every attached sink.
    pub fn append(&mut self, record: AuditRecord) {
        for sink in self.forward_sinks.iter_mut() {
            sink.append(record.clone());
        }
        self.records.push(record);
    }

    /// Return the number of records in the log.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the log is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over the records.
    pub fn iter(&self) -> std::slice::Iter<'_, AuditRecord> {
        self.records.iter()
    }
}

// ---------------------------------------------------------------------------
// Built-in sink: file
// ---------------------------------------------------------------------------

/// Writes audit records as JSON lines to a file, appending if it exists.
pub struct FileAuditSink {
    file: std::fs::File,
}

impl FileAuditSink {
    /// Open or create a file for append-only audit logging.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }
}

impl AuditSink for FileAuditSink {
    fn append(&mut self, record: AuditRecord) {
        match serde_json::to_string(&record) {
            Ok(line) => {
                if let Err(e) = writeln!(self.file, "{line}").and_then(|_| self.file.flush()) {
                    tracing::warn!(error = %e, "failed to write audit record");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to encode audit record"),
        }
    }
}
