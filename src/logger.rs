//! Append-only session logger
//!
//! Writes one tab-separated header line (field names in wire order) and
//! one line per accepted frame. Every line is flushed and fsynced so a
//! crash or power loss costs at most the line being written. Absent
//! fields are recorded with the wire sentinel, preserving the
//! distinction between "zero" and "not reported" in the log.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};

use crate::protocol::SENTINEL;
use crate::types::frame::{FrameSchema, TelemetryFrame};

pub struct SessionLogger {
    writer: csv::Writer<File>,
    // Second handle to the same file, kept for fsync after each line
    sync_handle: File,
    field_names: Vec<String>,
}

impl SessionLogger {
    /// Create the log file and write the header line.
    pub fn create(path: &Path, schema: &FrameSchema) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create session log: {:?}", path))?;
        let sync_handle = file.try_clone().context("Failed to clone log handle")?;

        let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_writer(file);

        let mut header = vec!["seq".to_string()];
        header.extend(schema.field_names.iter().cloned());
        writer.write_record(&header)?;
        writer.flush()?;
        sync_handle.sync_data()?;

        Ok(Self {
            writer,
            sync_handle,
            field_names: schema.field_names.clone(),
        })
    }

    /// Append one accepted frame in field order.
    pub fn append(&mut self, frame: &TelemetryFrame) -> Result<()> {
        let mut record = Vec::with_capacity(self.field_names.len() + 1);
        record.push(frame.seq.to_string());
        for name in &self.field_names {
            match frame.get(name) {
                Some(value) => record.push(format_value(value)),
                None => record.push(SENTINEL.to_string()),
            }
        }
        self.writer.write_record(&record)?;
        self.writer.flush()?;
        self.sync_handle.sync_data()?;
        Ok(())
    }
}

/// Plain decimal formatting; integral values lose the trailing `.0` so
/// flag fields round-trip as written by the flight computer.
fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
