// src/core/scan_log.rs

//! Durable record of scan lifecycle transitions.
//!
//! The orchestrator hands a [`ScanLogEntry`] to its [`ScanLog`] on every
//! transition. A failing sink is logged and otherwise ignored; it never
//! affects the scan.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::models::{RiskLevel, ScanCategory, ScanId, ScanRecord, ScanStatus};

#[derive(Debug, thiserror::Error)]
pub enum ScanLogError {
    #[error("Scan log I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Scan log encoding error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Scan log writer poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanLogEntry {
    pub scan_id: ScanId,
    pub target: String,
    pub category: ScanCategory,
    pub status: ScanStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub execution_time: Option<f64>,
    pub risk_level: Option<RiskLevel>,
    pub findings_count: Option<usize>,
    pub modules: Vec<String>,
    pub error: Option<String>,
}

impl From<&ScanRecord> for ScanLogEntry {
    fn from(record: &ScanRecord) -> Self {
        Self {
            scan_id: record.scan_id.clone(),
            target: record.target.clone(),
            category: record.category,
            status: record.status,
            started_at: record.started_at,
            completed_at: record.completed_at,
            execution_time: record.execution_time_secs(),
            risk_level: record.correlated.as_ref().map(|c| c.risk_level),
            findings_count: record.correlated.as_ref().map(|c| c.key_findings.len()),
            modules: record.modules_executed.clone(),
            error: record.error.clone(),
        }
    }
}

pub trait ScanLog: Send + Sync {
    fn append(&self, entry: &ScanLogEntry) -> Result<(), ScanLogError>;
}

/// Emits each entry as a structured `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingScanLog;

impl ScanLog for TracingScanLog {
    fn append(&self, entry: &ScanLogEntry) -> Result<(), ScanLogError> {
        info!(
            target: "scan_log",
            scan_id = %entry.scan_id,
            status = %entry.status,
            category = %entry.category,
            execution_time = ?entry.execution_time,
            risk_level = ?entry.risk_level,
            findings = ?entry.findings_count,
            error = ?entry.error,
            "Scan transition."
        );
        Ok(())
    }
}

/// Appends one JSON object per line to a file.
pub struct JsonlScanLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlScanLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScanLog for JsonlScanLog {
    fn append(&self, entry: &ScanLogEntry) -> Result<(), ScanLogError> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock().map_err(|_| ScanLogError::Poisoned)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ScanRequest;

    #[test]
    fn jsonl_log_appends_one_line_per_transition() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonlScanLog::new(dir.path().join("logs").join("scans.jsonl"));

        let request = ScanRequest::new("example.com", ScanCategory::Domain);
        let mut record = ScanRecord::new(ScanId::from("log-1"), &request);
        log.append(&ScanLogEntry::from(&record)).unwrap();
        record.start(0).unwrap();
        record.fail("store offline").unwrap();
        log.append(&ScanLogEntry::from(&record)).unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let entries: Vec<ScanLogEntry> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].status, ScanStatus::Pending);
        assert_eq!(entries[1].status, ScanStatus::Failed);
        assert_eq!(entries[1].error.as_deref(), Some("store offline"));
        assert!(entries[1].risk_level.is_none());
    }
}
