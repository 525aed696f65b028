//! Leadsync Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, error handling and logging for the leadsync workspace.
//!
//! # Overview
//!
//! - **Error Handling**: the [`SyncError`] taxonomy and [`Result`] alias
//! - **Types**: source units, destination entities, records and the run report
//! - **Logging**: `tracing` subscriber setup shared by the server and the CLI
//!
//! # Example
//!
//! ```no_run
//! use leadsync_common::types::{RunReport, SkipReason};
//!
//! let mut report = RunReport::default();
//! report.record_skipped("Unmapped", SkipReason::NoMatchingDestination, None);
//! assert_eq!(report.skipped.len(), 1);
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{Result, SyncError};
