// src/core/error.rs

use crate::core::models::{ScanId, ScanStatus};

/// Errors surfaced by the scan engine to its callers.
///
/// Collector failures are deliberately absent: they are converted into an
/// absent fragment at the isolation boundary and never reach this type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScanError {
    #[error("Scan not found: {0}")]
    NotFound(ScanId),

    /// Malformed target or category, reported before a record exists.
    #[error("Invalid scan request: {0}")]
    Validation(String),

    /// The safety policy refused the target.
    #[error("Target validation failed: {0}")]
    Rejected(String),

    /// Failure in the orchestration spine itself; fails the scan.
    #[error("Scan failed: {0}")]
    Orchestration(String),

    #[error("Scan store unavailable: {0}")]
    Store(String),

    #[error("Illegal scan transition from {from} to {to}")]
    InvalidTransition { from: ScanStatus, to: ScanStatus },
}
