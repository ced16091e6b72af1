// src/core/mod.rs

// The scan engine. Nothing in here touches the terminal; the UI drives it
// through the `Orchestrator` alone.

/// Data structures shared by every part of the engine: fragments, the scan
/// record and the correlated result.
pub mod models;

/// The `ScanError` taxonomy returned to callers.
pub mod error;

/// Target normalization, category inference and the safety policy.
pub mod target;

/// Collector trait, registry and the bundled intelligence collectors.
pub mod collectors;

/// The pure correlation pipeline.
pub mod correlation;

/// Static explanations and remediation advice per attack-surface item type.
pub mod knowledge_base;

/// Keyed scan-record storage with per-key exclusive access.
pub mod store;

/// Durable hand-off of scan lifecycle transitions.
pub mod scan_log;

/// Scan lifecycle, collector dispatch and fan-in.
pub mod orchestrator;
