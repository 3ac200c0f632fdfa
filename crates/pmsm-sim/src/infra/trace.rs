//! JSONL trace of a simulation run.
//!
//! One line per motor frame and per decoder sample, bracketed by a start
//! and end record, so runs can be plotted or diffed offline.

use pmsm_core::{DriveDuty, FrameSnapshot, PhaseReading};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    /// Configuration the run was started with
    RunStart,
    /// One motor animation frame
    MotorFrame,
    /// One phase decoder call
    DecodeSample,
    /// Run summary
    RunEnd,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Frame or sample index within its stream
    pub frame: u64,
    pub kind: TraceKind,
    pub details: serde_json::Value,
}

/// Buffered JSONL writer shared by the motor and decoder stages.
pub struct TraceWriter {
    writer: Mutex<BufWriter<File>>,
}

impl TraceWriter {
    /// Opens `path` in append mode, creating parent directories as needed.
    pub fn new(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: Mutex::new(BufWriter::with_capacity(64 * 1024, file)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, BufWriter<File>> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn log(&self, entry: &TraceEntry) -> std::io::Result<()> {
        let mut writer = self.lock();
        serde_json::to_writer(&mut *writer, entry)?;
        writer.write_all(b"\n")
    }

    pub fn log_event<T: Serialize>(
        &self,
        frame: u64,
        kind: TraceKind,
        details: &T,
    ) -> std::io::Result<()> {
        self.log(&TraceEntry {
            frame,
            kind,
            details: serde_json::to_value(details)?,
        })
    }

    pub fn flush(&self) -> std::io::Result<()> {
        self.lock().flush()
    }
}

/// Details for a motor frame.
#[derive(Debug, Clone, Serialize)]
pub struct MotorFrameDetails {
    #[serde(flatten)]
    pub snapshot: FrameSnapshot,
    pub air_gap: f64,
}

/// Details for a decoder sample, with the drive duty the decoded phase selects.
#[derive(Debug, Clone, Serialize)]
pub struct DecodeSampleDetails {
    pub adc_u: u8,
    pub adc_v: u8,
    #[serde(flatten)]
    pub reading: PhaseReading,
    pub drive: DriveDuty,
}
