//! Chunked writes to a campaign

use leadsync_common::types::{DestinationRecord, WriteOutcome};
use leadsync_common::{Result, SyncError};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::destination::DestinationApi;

/// Splits records into chunks and writes them one after another
///
/// The first non-success response stops the write. Chunks already accepted
/// by the destination stay written.
#[derive(Clone)]
pub struct BatchWriter {
    destination: Arc<dyn DestinationApi>,
    chunk_size: usize,
}

impl BatchWriter {
    /// `chunk_size` is clamped to at least one record
    pub fn new(destination: Arc<dyn DestinationApi>, chunk_size: usize) -> Self {
        Self {
            destination,
            chunk_size: chunk_size.max(1),
        }
    }

    #[instrument(skip(self, records), fields(campaign_id = %entity_id, records = records.len()))]
    pub async fn write(
        &self,
        entity_id: &str,
        records: &[DestinationRecord],
    ) -> Result<WriteOutcome> {
        if records.is_empty() {
            debug!("Nothing to send");
            return Ok(WriteOutcome::NothingToSend);
        }

        let mut acknowledgments = Vec::new();

        for (chunk, batch) in records.chunks(self.chunk_size).enumerate() {
            let response = self.destination.add_records(entity_id, batch).await?;

            if !response.is_success() {
                warn!(chunk, status = response.status, "Chunk rejected by destination");
                return Err(SyncError::write_failure(
                    entity_id,
                    chunk,
                    response.status,
                    &response.body,
                ));
            }

            debug!(chunk, size = batch.len(), "Chunk written");
            acknowledgments.push(response.acknowledgment());
        }

        info!(chunks = acknowledgments.len(), "Records written");

        Ok(WriteOutcome::Sent {
            chunks: acknowledgments.len(),
            total_records: records.len(),
            acknowledgments,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::destination::WriteResponse;
    use async_trait::async_trait;
    use leadsync_common::types::DestinationEntity;
    use std::sync::Mutex;

    /// Records chunk sizes and fails from the given call index on
    struct RecordingDestination {
        calls: Mutex<Vec<usize>>,
        fail_from: Option<usize>,
    }

    impl RecordingDestination {
        fn new(fail_from: Option<usize>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                fail_from,
            })
        }
    }

    #[async_trait]
    impl DestinationApi for RecordingDestination {
        async fn list_entities(&self) -> Result<Vec<DestinationEntity>> {
            Ok(Vec::new())
        }

        async fn add_records(
            &self,
            _entity_id: &str,
            records: &[DestinationRecord],
        ) -> Result<WriteResponse> {
            let mut calls = self.calls.lock().unwrap();
            let index = calls.len();
            calls.push(records.len());

            if self.fail_from.is_some_and(|n| index >= n) {
                return Ok(WriteResponse {
                    status: 429,
                    body: "rate limited".into(),
                });
            }
            Ok(WriteResponse {
                status: 200,
                body: format!("{{\"uploaded\":{}}}", records.len()),
            })
        }
    }

    fn records(n: usize) -> Vec<DestinationRecord> {
        (0..n)
            .map(|i| DestinationRecord {
                email: format!("lead{}@example.com", i),
                ..Default::default()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_chunks_respect_limit() {
        let destination = RecordingDestination::new(None);
        let writer = BatchWriter::new(destination.clone(), 1000);

        let outcome = writer.write("9", &records(2500)).await.unwrap();

        assert_eq!(*destination.calls.lock().unwrap(), vec![1000, 1000, 500]);
        assert_eq!(outcome.chunks(), 3);
        assert_eq!(outcome.records_sent(), 2500);
    }

    #[tokio::test]
    async fn test_exact_multiple_of_chunk_size() {
        let destination = RecordingDestination::new(None);
        let writer = BatchWriter::new(destination.clone(), 1000);

        writer.write("9", &records(2000)).await.unwrap();
        assert_eq!(destination.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_call() {
        let destination = RecordingDestination::new(None);
        let writer = BatchWriter::new(destination.clone(), 1000);

        let outcome = writer.write("9", &[]).await.unwrap();

        assert_eq!(outcome, WriteOutcome::NothingToSend);
        assert!(destination.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_aborts_remaining_chunks() {
        let destination = RecordingDestination::new(Some(1));
        let writer = BatchWriter::new(destination.clone(), 2);

        let err = writer.write("9", &records(6)).await.unwrap_err();

        assert_eq!(destination.calls.lock().unwrap().len(), 2);
        match err {
            SyncError::WriteFailure {
                entity_id,
                chunk,
                status,
                ..
            } => {
                assert_eq!(entity_id, "9");
                assert_eq!(chunk, 1);
                assert_eq!(status, 429);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_acknowledgments_follow_send_order() {
        let destination = RecordingDestination::new(None);
        let writer = BatchWriter::new(destination, 3);

        match writer.write("9", &records(4)).await.unwrap() {
            WriteOutcome::Sent {
                acknowledgments, ..
            } => {
                assert_eq!(acknowledgments[0]["uploaded"], 3);
                assert_eq!(acknowledgments[1]["uploaded"], 1);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
