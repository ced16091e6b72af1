// src/lib.rs

//! Vanguard OSINT: passive reconnaissance scans that fan out to independent
//! intelligence collectors and correlate whatever comes back into a single
//! risk assessment.
//!
//! The engine lives under [`core`]: the [`core::orchestrator::Orchestrator`]
//! owns the scan lifecycle, the [`core::correlation`] module is the pure
//! scoring pipeline, and [`core::collectors`] holds the collector trait and
//! the bundled collectors.

pub mod config;
pub mod core;
pub mod logging;
