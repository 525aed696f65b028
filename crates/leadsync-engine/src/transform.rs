//! Source record to destination record mapping

use leadsync_common::types::{CustomVariables, DestinationRecord, SourceRecord};

const EMAIL: &[&str] = &["email", "work_email"];
const FIRST_NAME: &[&str] = &["first_name", "firstName"];
const LAST_NAME: &[&str] = &["last_name", "lastName"];
const COMPANY_NAME: &[&str] = &["company", "company_name", "organization"];
const TITLE: &[&str] = &["title", "job_title"];
const LINKEDIN_URL: &[&str] = &["linkedin", "linkedin_url", "social_url"];
const LIST_ID: &[&str] = &["list_id"];
const LEAD_ID: &[&str] = &["id"];

/// Result of mapping a single record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transformed {
    Kept(DestinationRecord),
    /// No email alias carried a value
    Rejected,
}

/// Maps source leads onto the destination shape
///
/// Each field takes the first non-empty value along its alias chain; missing
/// optional fields become empty strings.
#[derive(Debug, Clone)]
pub struct RecordTransformer {
    source_label: String,
}

impl RecordTransformer {
    pub fn new(source_label: impl Into<String>) -> Self {
        Self {
            source_label: source_label.into(),
        }
    }

    pub fn transform(&self, record: &SourceRecord, unit_id: &str) -> Transformed {
        let Some(email) = record.first_non_empty(EMAIL) else {
            return Transformed::Rejected;
        };

        let field = |aliases: &[&str]| record.first_non_empty(aliases).unwrap_or_default();

        Transformed::Kept(DestinationRecord {
            email,
            first_name: field(FIRST_NAME),
            last_name: field(LAST_NAME),
            company_name: field(COMPANY_NAME),
            title: field(TITLE),
            linkedin_url: field(LINKEDIN_URL),
            custom_variables: CustomVariables {
                source: self.source_label.clone(),
                list_id: record
                    .first_non_empty(LIST_ID)
                    .unwrap_or_else(|| unit_id.to_string()),
                lead_id: field(LEAD_ID),
            },
        })
    }

    /// Map a whole list, returning the kept records and how many were rejected
    pub fn transform_all(
        &self,
        records: &[SourceRecord],
        unit_id: &str,
    ) -> (Vec<DestinationRecord>, usize) {
        let kept: Vec<DestinationRecord> = records
            .iter()
            .filter_map(|record| match self.transform(record, unit_id) {
                Transformed::Kept(r) => Some(r),
                Transformed::Rejected => None,
            })
            .collect();

        let rejected = records.len() - kept.len();
        (kept, rejected)
    }
}
