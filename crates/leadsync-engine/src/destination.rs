//! Destination API: campaigns and lead writes

use async_trait::async_trait;
use leadsync_common::types::{DestinationEntity, DestinationRecord};
use leadsync_common::Result;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{instrument, warn};

use crate::config::SyncConfig;
use crate::fetcher::{
    network_error, Auth, CollectionRequest, Envelope, PaginatedFetcher, PaginationStyle,
};

/// Campaign collection envelopes seen across API versions
pub const CAMPAIGNS_ENVELOPE: Envelope = Envelope::wrapped_under(&["items", "campaigns"]);

/// Raw answer to one write call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResponse {
    pub status: u16,
    pub body: String,
}

impl WriteResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as JSON, or as a JSON string when it does not parse
    pub fn acknowledgment(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or_else(|_| Value::String(self.body.clone()))
    }
}

/// Read and write access to the destination
#[async_trait]
pub trait DestinationApi: Send + Sync {
    /// Every campaign, in API order
    async fn list_entities(&self) -> Result<Vec<DestinationEntity>>;

    /// Send one chunk of leads to a campaign
    ///
    /// Returns the raw response; deciding what a non-success status means is
    /// left to the caller. Errors are reserved for requests that never got an
    /// answer.
    async fn add_records(&self, entity_id: &str, records: &[DestinationRecord])
        -> Result<WriteResponse>;
}

#[derive(Serialize)]
struct AddLeadsRequest<'a> {
    campaign_id: &'a str,
    leads: &'a [DestinationRecord],
    skip_if_in_workspace: bool,
}

/// HTTP client for the campaign API
///
/// Listing uses the bearer token; writes pass the API key as a query parameter.
pub struct HttpDestinationApi {
    fetcher: PaginatedFetcher,
    client: Client,
    base_url: String,
    token: String,
    api_key: String,
    page_limit: u32,
}

impl HttpDestinationApi {
    pub fn new(
        client: Client,
        config: &SyncConfig,
        token: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            fetcher: PaginatedFetcher::new(client.clone()),
            client,
            base_url: config.destination_base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            api_key: api_key.into(),
            page_limit: config.destination_page_limit,
        }
    }

    pub(crate) fn fetcher(&self) -> &PaginatedFetcher {
        &self.fetcher
    }

    pub(crate) fn campaigns_request(&self) -> CollectionRequest {
        CollectionRequest {
            collection: "Instantly campaigns".to_string(),
            url: format!("{}/api/v2/campaigns", self.base_url),
            auth: Auth::Bearer(self.token.clone()),
            envelope: CAMPAIGNS_ENVELOPE,
        }
    }
}

#[async_trait]
impl DestinationApi for HttpDestinationApi {
    #[instrument(skip(self))]
    async fn list_entities(&self) -> Result<Vec<DestinationEntity>> {
        let items = self
            .fetcher
            .fetch_all(
                &self.campaigns_request(),
                PaginationStyle::Offset {
                    limit: self.page_limit,
                },
            )
            .await?;

        let entities = items
            .iter()
            .filter_map(|item| {
                let entity = DestinationEntity::from_value(item);
                if entity.is_none() {
                    warn!(campaign = %item, "Ignoring campaign without id or name");
                }
                entity
            })
            .collect();

        Ok(entities)
    }

    #[instrument(skip(self, records), fields(records = records.len()))]
    async fn add_records(
        &self,
        entity_id: &str,
        records: &[DestinationRecord],
    ) -> Result<WriteResponse> {
        let url = format!("{}/api/v1/lead/add", self.base_url);
        let body = AddLeadsRequest {
            campaign_id: entity_id,
            leads: records,
            skip_if_in_workspace: true,
        };

        let builder = self.client.post(&url).json(&body);
        let response = Auth::QueryKey {
            name: "api_key",
            value: self.api_key.clone(),
        }
        .apply(builder)
        .send()
        .await
        .map_err(|e| network_error("Instantly lead add", e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| network_error("Instantly lead add", e))?;

        Ok(WriteResponse { status, body })
    }
}
