//! Run report
//!
//! Built incrementally by the orchestrator and returned whole. The JSON field
//! names are part of the entrypoint contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::unit::SourceUnit;

/// Outcome of one synchronization run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub processed: Vec<ProcessedEntry>,
    pub skipped: Vec<SkippedEntry>,
    pub errors: Vec<ErrorEntry>,
    /// Sum of `leads_count` over `processed`
    pub total_leads: usize,
    pub debug: RunDiagnostics,
}

impl RunReport {
    /// Append a processed unit and add its leads to the total
    pub fn record_processed(&mut self, entry: ProcessedEntry) {
        self.total_leads += entry.leads_count;
        self.debug.rejected_records += entry.rejected_count;
        self.processed.push(entry);
    }

    pub fn record_skipped(
        &mut self,
        list_name: impl Into<String>,
        reason: SkipReason,
        processed_at: Option<DateTime<Utc>>,
    ) {
        self.skipped.push(SkippedEntry {
            list_name: list_name.into(),
            reason,
            processed_at,
        });
    }

    pub fn record_error(&mut self, list_name: impl Into<String>, error: impl Into<String>) {
        self.errors.push(ErrorEntry {
            list_name: list_name.into(),
            error: error.into(),
        });
    }
}

/// Counters describing what the run saw
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunDiagnostics {
    pub lists_count: usize,
    pub campaigns_count: usize,
    /// Records dropped for lacking an email, across processed units
    pub rejected_records: usize,
    /// First list of the source collection, as fetched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_list: Option<SourceUnit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedEntry {
    pub list_name: String,
    pub list_id: String,
    pub campaign_name: String,
    pub campaign_id: String,
    /// Records actually sent to the destination
    pub leads_count: usize,
    pub rejected_count: usize,
    pub import_result: WriteOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedEntry {
    pub list_name: String,
    pub reason: SkipReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEntry {
    pub list_name: String,
    pub error: String,
}

/// Why a unit was not synchronized; these are not failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    #[serde(rename = "Already processed")]
    AlreadyProcessed,
    #[serde(rename = "No matching destination")]
    NoMatchingDestination,
    #[serde(rename = "No records in source list")]
    NoRecords,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SkipReason::AlreadyProcessed => "Already processed",
            SkipReason::NoMatchingDestination => "No matching destination",
            SkipReason::NoRecords => "No records in source list",
        })
    }
}

/// Result of writing one unit's records to its campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WriteOutcome {
    /// Every record was rejected; no call was made
    NothingToSend,
    Sent {
        chunks: usize,
        #[serde(rename = "totalLeads")]
        total_records: usize,
        /// Raw acknowledgment of each chunk call, in send order
        #[serde(rename = "results")]
        acknowledgments: Vec<Value>,
    },
}

impl WriteOutcome {
    pub fn records_sent(&self) -> usize {
        match self {
            WriteOutcome::NothingToSend => 0,
            WriteOutcome::Sent { total_records, .. } => *total_records,
        }
    }

    pub fn chunks(&self) -> usize {
        match self {
            WriteOutcome::NothingToSend => 0,
            WriteOutcome::Sent { chunks, .. } => *chunks,
        }
    }
}
