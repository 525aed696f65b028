//! Common types used across leadsync
//!
//! - [`unit`]: the two collections being reconciled (source lists, destination campaigns)
//! - [`record`]: lead records before and after normalization
//! - [`report`]: the structured outcome of one synchronization run

pub mod record;
pub mod report;
pub mod unit;

pub use record::{CustomVariables, DestinationRecord, SourceRecord};
pub use report::{
    ErrorEntry, ProcessedEntry, RunDiagnostics, RunReport, SkipReason, SkippedEntry, WriteOutcome,
};
pub use unit::{DestinationEntity, SourceUnit};
