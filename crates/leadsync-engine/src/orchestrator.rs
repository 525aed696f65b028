//! Synchronization run
//!
//! One run drains both collections, indexes campaigns by name, then walks the
//! lead lists in fetch order. Each list ends in exactly one of `processed`,
//! `skipped` or `errors`:
//!
//! 1. validate: a list without id or name is an error
//! 2. dedup: a live marker skips the list
//! 3. match: no campaign with the same name skips the list
//! 4. fetch members: an empty list is skipped, a failed fetch is an error
//! 5. transform and write: any failure is an error
//! 6. commit: the list is reported processed and a marker is written
//!
//! Failing to drain either collection aborts the run without a report.

use chrono::{DateTime, Utc};
use leadsync_common::types::{ProcessedEntry, RunReport, SkipReason, SourceUnit};
use leadsync_common::Result;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};

use crate::config::{Credentials, SyncConfig};
use crate::destination::{DestinationApi, HttpDestinationApi};
use crate::matcher::EntityMatcher;
use crate::source::{HttpSourceApi, SourceApi};
use crate::tracker::IdempotencyTracker;
use crate::transform::RecordTransformer;
use crate::writer::BatchWriter;

/// Error reported for lists that lack an id or a name
pub const MISSING_PROPERTIES: &str = "List missing required properties (id or name)";

/// Terminal state of one list
#[derive(Debug)]
enum UnitOutcome {
    Processed(ProcessedEntry),
    Skipped {
        reason: SkipReason,
        processed_at: Option<DateTime<Utc>>,
    },
    Failed(String),
}

impl UnitOutcome {
    fn skipped(reason: SkipReason) -> Self {
        Self::Skipped {
            reason,
            processed_at: None,
        }
    }

    fn fold_into(self, unit: &SourceUnit, report: &mut RunReport) {
        match self {
            Self::Processed(entry) => report.record_processed(entry),
            Self::Skipped {
                reason,
                processed_at,
            } => report.record_skipped(unit.display_name(), reason, processed_at),
            Self::Failed(message) => report.record_error(unit.display_name(), message),
        }
    }
}

/// Drives one synchronization run end to end
pub struct SyncOrchestrator {
    source: Arc<dyn SourceApi>,
    destination: Arc<dyn DestinationApi>,
    tracker: IdempotencyTracker,
    transformer: RecordTransformer,
    writer: BatchWriter,
}

impl SyncOrchestrator {
    pub fn new(
        source: Arc<dyn SourceApi>,
        destination: Arc<dyn DestinationApi>,
        tracker: IdempotencyTracker,
        transformer: RecordTransformer,
        chunk_size: usize,
    ) -> Self {
        let writer = BatchWriter::new(destination.clone(), chunk_size);
        Self {
            source,
            destination,
            tracker,
            transformer,
            writer,
        }
    }

    /// Wire the HTTP collaborators from configuration
    pub fn from_config(
        config: &SyncConfig,
        credentials: &Credentials,
        tracker: IdempotencyTracker,
    ) -> Result<Self> {
        config.validate()?;
        let client = config.http_client()?;

        let source = HttpSourceApi::new(client.clone(), config, &credentials.source_token);
        let destination = HttpDestinationApi::new(
            client,
            config,
            &credentials.destination_token,
            credentials.write_api_key(),
        );

        Ok(Self::new(
            Arc::new(source),
            Arc::new(destination),
            tracker,
            RecordTransformer::new(&config.source_label),
            config.chunk_size,
        ))
    }

    /// Run one synchronization pass
    #[instrument(skip(self), fields(dedup = self.tracker.is_enabled()))]
    pub async fn run(&self) -> Result<RunReport> {
        let units = self.source.list_units().await?;
        let entities = self.destination.list_entities().await?;

        info!(lists = units.len(), campaigns = entities.len(), "Collections fetched");

        let mut report = RunReport::default();
        report.debug.lists_count = units.len();
        report.debug.campaigns_count = entities.len();
        report.debug.sample_list = units.first().cloned();

        let matcher = EntityMatcher::new(entities);
        if matcher.is_empty() {
            warn!("No campaigns to match against; every list will be skipped");
        } else {
            debug!(names = matcher.len(), "Campaign name index built");
        }

        for unit in &units {
            let span = info_span!(
                "unit",
                list_id = unit.id.as_deref().unwrap_or_default(),
                list_name = unit.display_name()
            );
            let outcome = self
                .sync_unit(unit, &matcher)
                .instrument(span)
                .await
                .unwrap_or_else(|e| {
                    warn!(list_name = unit.display_name(), error = %e, "List failed");
                    UnitOutcome::Failed(e.to_string())
                });
            outcome.fold_into(unit, &mut report);
        }

        info!(
            processed = report.processed.len(),
            skipped = report.skipped.len(),
            errors = report.errors.len(),
            total_leads = report.total_leads,
            "Sync run complete"
        );

        Ok(report)
    }

    async fn sync_unit(&self, unit: &SourceUnit, matcher: &EntityMatcher) -> Result<UnitOutcome> {
        let Some((unit_id, unit_name)) = unit.identity() else {
            warn!("List without id or name");
            return Ok(UnitOutcome::Failed(MISSING_PROPERTIES.to_string()));
        };

        if let Some(processed_at) = self.tracker.processed_at(unit_id).await? {
            debug!(?processed_at, "Already processed");
            return Ok(UnitOutcome::Skipped {
                reason: SkipReason::AlreadyProcessed,
                processed_at,
            });
        }

        let Some(entity) = matcher.match_unit(unit) else {
            debug!("No campaign with a matching name");
            return Ok(UnitOutcome::skipped(SkipReason::NoMatchingDestination));
        };

        let records = self.source.list_records(unit_id).await?;
        if records.is_empty() {
            return Ok(UnitOutcome::skipped(SkipReason::NoRecords));
        }

        let (leads, rejected) = self.transformer.transform_all(&records, unit_id);
        if rejected > 0 {
            debug!(rejected, "Records without email dropped");
        }

        let outcome = self.writer.write(&entity.id, &leads).await?;

        if let Err(e) = self.tracker.mark_processed(unit_id, Utc::now()).await {
            error!(error = %e, "Failed to record processed marker");
        }

        info!(
            campaign_id = %entity.id,
            leads = outcome.records_sent(),
            rejected,
            "List synchronized"
        );

        Ok(UnitOutcome::Processed(ProcessedEntry {
            list_name: unit_name.to_string(),
            list_id: unit_id.to_string(),
            campaign_name: entity.name.clone(),
            campaign_id: entity.id.clone(),
            leads_count: outcome.records_sent(),
            rejected_count: rejected,
            import_result: outcome,
        }))
    }
}
