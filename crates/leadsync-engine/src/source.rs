//! Source API: lead lists and their members

use async_trait::async_trait;
use leadsync_common::types::{SourceRecord, SourceUnit};
use leadsync_common::Result;
use reqwest::Client;
use tracing::instrument;

use crate::config::{MemberFetchMode, SyncConfig};
use crate::fetcher::{Auth, CollectionRequest, Envelope, PaginatedFetcher, PaginationStyle};

/// Lead list collection envelopes seen across API versions
pub const LEAD_LISTS_ENVELOPE: Envelope = Envelope::wrapped_under(&["lead_lists", "items"]);

/// Member collection envelopes seen across API versions
pub const LEADS_ENVELOPE: Envelope = Envelope::wrapped_under(&["leads", "items"]);

/// Read access to the source collections
#[async_trait]
pub trait SourceApi: Send + Sync {
    /// Every lead list, in API order
    async fn list_units(&self) -> Result<Vec<SourceUnit>>;

    /// Every member record of one list, in API order
    async fn list_records(&self, unit_id: &str) -> Result<Vec<SourceRecord>>;
}

/// HTTP client for the lead list API (bearer token auth)
pub struct HttpSourceApi {
    fetcher: PaginatedFetcher,
    base_url: String,
    token: String,
    page_size: u32,
    member_fetch: MemberFetchMode,
}

impl HttpSourceApi {
    pub fn new(client: Client, config: &SyncConfig, token: impl Into<String>) -> Self {
        Self {
            fetcher: PaginatedFetcher::new(client),
            base_url: config.source_base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            page_size: config.source_page_size,
            member_fetch: config.member_fetch,
        }
    }

    pub(crate) fn fetcher(&self) -> &PaginatedFetcher {
        &self.fetcher
    }

    pub(crate) fn lists_request(&self) -> CollectionRequest {
        CollectionRequest {
            collection: "Amplemarket lead lists".to_string(),
            url: format!("{}/lead-lists", self.base_url),
            auth: Auth::Bearer(self.token.clone()),
            envelope: LEAD_LISTS_ENVELOPE,
        }
    }

    fn members_request(&self, unit_id: &str) -> (CollectionRequest, PaginationStyle) {
        let (url, style) = match self.member_fetch {
            MemberFetchMode::Paginated => (
                format!("{}/lead-lists/{}/leads", self.base_url, unit_id),
                PaginationStyle::Cursor {
                    page_size: self.page_size,
                },
            ),
            MemberFetchMode::Embedded => (
                format!("{}/lead-lists/{}", self.base_url, unit_id),
                PaginationStyle::Single,
            ),
        };

        let request = CollectionRequest {
            collection: format!("Amplemarket leads of list {}", unit_id),
            url,
            auth: Auth::Bearer(self.token.clone()),
            envelope: LEADS_ENVELOPE,
        };
        (request, style)
    }
}

#[async_trait]
impl SourceApi for HttpSourceApi {
    #[instrument(skip(self))]
    async fn list_units(&self) -> Result<Vec<SourceUnit>> {
        let items = self
            .fetcher
            .fetch_all(
                &self.lists_request(),
                PaginationStyle::Cursor {
                    page_size: self.page_size,
                },
            )
            .await?;

        Ok(items.iter().map(SourceUnit::from_value).collect())
    }

    #[instrument(skip(self), fields(mode = ?self.member_fetch))]
    async fn list_records(&self, unit_id: &str) -> Result<Vec<SourceRecord>> {
        let (request, style) = self.members_request(unit_id);
        let items = self.fetcher.fetch_all(&request, style).await?;

        Ok(items.into_iter().map(SourceRecord::from).collect())
    }
}
