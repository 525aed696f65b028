//! Connectivity probe
//!
//! Requests one small page from each API and describes what came back,
//! without running a sync. Useful when a token or an endpoint shape is in
//! doubt.

use leadsync_common::error::truncate_body;
use leadsync_common::{Result, SyncError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::config::{token_hint, Credentials, SyncConfig};
use crate::destination::HttpDestinationApi;
use crate::fetcher::{CollectionRequest, PaginatedFetcher};
use crate::source::HttpSourceApi;

/// Items requested from each API
pub const PROBE_PAGE_SIZE: u32 = 10;

/// Which APIs to probe
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeTarget {
    #[serde(alias = "test-amplemarket")]
    TestSource,
    #[serde(alias = "test-instantly")]
    TestDestination,
    #[default]
    Both,
}

impl ProbeTarget {
    fn includes_source(self) -> bool {
        matches!(self, ProbeTarget::TestSource | ProbeTarget::Both)
    }

    fn includes_destination(self) -> bool {
        matches!(self, ProbeTarget::TestDestination | ProbeTarget::Both)
    }
}

impl std::str::FromStr for ProbeTarget {
    type Err = SyncError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "test-source" | "source" | "test-amplemarket" => Ok(ProbeTarget::TestSource),
            "test-destination" | "destination" | "test-instantly" => {
                Ok(ProbeTarget::TestDestination)
            }
            "both" | "" => Ok(ProbeTarget::Both),
            _ => Err(SyncError::validation(format!("Unknown probe action: {}", s))),
        }
    }
}

/// Top-level shape of a response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseStructure {
    pub is_array: bool,
    /// Object keys, empty for arrays
    pub keys: Vec<String>,
}

/// What one API answered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_item: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_after: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_structure: Option<ResponseStructure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Raw body of a failed call, truncated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl ProbeResult {
    fn reachable(status: u16, request: &CollectionRequest, body: Value) -> Self {
        let response_structure = ResponseStructure {
            is_array: body.is_array(),
            keys: body
                .as_object()
                .map(|map| map.keys().cloned().collect())
                .unwrap_or_default(),
        };

        let (items_count, first_item, page_after) =
            match request.envelope.page(&request.collection, body) {
                Ok(page) => (page.items.len(), page.items.into_iter().next(), page.next_cursor),
                Err(e) => {
                    warn!(error = %e, "Probe response does not match a known envelope");
                    (0, None, None)
                }
            };

        Self {
            success: true,
            status: Some(status),
            items_count: Some(items_count),
            first_item,
            page_after,
            response_structure: Some(response_structure),
            error: None,
            response: None,
        }
    }

    fn failed(error: impl Into<String>, response: Option<&str>) -> Self {
        Self {
            success: false,
            status: None,
            items_count: None,
            first_item: None,
            page_after: None,
            response_structure: None,
            error: Some(error.into()),
            response: response.map(truncate_body),
        }
    }
}

/// Redacted prefixes of the tokens used
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenHints {
    pub source_token: String,
    pub destination_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ProbeResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<ProbeResult>,
    pub token_hints: TokenHints,
}

pub struct ConnectivityProbe {
    source: HttpSourceApi,
    destination: HttpDestinationApi,
    hints: TokenHints,
}

impl ConnectivityProbe {
    pub fn new(config: &SyncConfig, credentials: &Credentials) -> Result<Self> {
        let client = config.http_client()?;
        Ok(Self {
            source: HttpSourceApi::new(client.clone(), config, &credentials.source_token),
            destination: HttpDestinationApi::new(
                client,
                config,
                &credentials.destination_token,
                credentials.write_api_key(),
            ),
            hints: TokenHints {
                source_token: token_hint(&credentials.source_token),
                destination_token: token_hint(&credentials.destination_token),
            },
        })
    }

    #[instrument(skip(self))]
    pub async fn run(&self, target: ProbeTarget) -> ProbeReport {
        let source = if target.includes_source() {
            let query = [("page_size", PROBE_PAGE_SIZE.to_string())];
            Some(probe(self.source.fetcher(), &self.source.lists_request(), &query).await)
        } else {
            None
        };

        let destination = if target.includes_destination() {
            let query = [
                ("skip", "0".to_string()),
                ("limit", PROBE_PAGE_SIZE.to_string()),
            ];
            Some(
                probe(
                    self.destination.fetcher(),
                    &self.destination.campaigns_request(),
                    &query,
                )
                .await,
            )
        } else {
            None
        };

        ProbeReport {
            source,
            destination,
            token_hints: self.hints.clone(),
        }
    }
}

async fn probe(
    fetcher: &PaginatedFetcher,
    request: &CollectionRequest,
    query: &[(&str, String)],
) -> ProbeResult {
    let raw = match fetcher.get_raw(request, query).await {
        Ok(raw) => raw,
        Err(e) => return ProbeResult::failed(e.to_string(), None),
    };

    let status = raw.status.as_u16();
    info!(collection = %request.collection, status, "Probe answered");

    if !raw.status.is_success() {
        return ProbeResult::failed(format!("API returned {}", status), Some(&raw.body));
    }

    match serde_json::from_str::<Value>(&raw.body) {
        Ok(body) => ProbeResult::reachable(status, request, body),
        Err(e) => ProbeResult::failed(format!("Invalid JSON body: {}", e), Some(&raw.body)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    fn probe_for(server: &MockServer) -> ConnectivityProbe {
        let config = SyncConfig {
            source_base_url: server.uri(),
            destination_base_url: server.uri(),
            ..SyncConfig::default()
        };
        ConnectivityProbe::new(&config, &Credentials::new("am-secret", "in-secret")).unwrap()
    }

    #[tokio::test]
    async fn test_probe_describes_source_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/lead-lists"))
            .and(query_param("page_size", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "lead_lists": [{"id": "1", "name": "VPs"}],
                "page_after": "abc"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let report = probe_for(&server).run(ProbeTarget::TestSource).await;

        assert!(report.destination.is_none());
        let source = report.source.unwrap();
        assert!(source.success);
        assert_eq!(source.items_count, Some(1));
        assert_eq!(source.first_item, Some(json!({"id": "1", "name": "VPs"})));
        assert_eq!(source.page_after.as_deref(), Some("abc"));
        let structure = source.response_structure.unwrap();
        assert!(!structure.is_array);
        assert!(structure.keys.contains(&"lead_lists".to_string()));
        assert_eq!(report.token_hints.source_token, "am-se...");
    }

    #[tokio::test]
    async fn test_probe_reports_failed_destination() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v2/campaigns"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .expect(1)
            .mount(&server)
            .await;

        let report = probe_for(&server).run(ProbeTarget::TestDestination).await;

        let destination = report.destination.unwrap();
        assert!(!destination.success);
        assert_eq!(destination.error.as_deref(), Some("API returned 401"));
        assert_eq!(destination.response.as_deref(), Some("invalid key"));

        let value = serde_json::to_value(&destination).unwrap();
        assert!(value.get("itemsCount").is_none());
    }

    #[test]
    fn test_probe_target_accepts_legacy_actions() {
        assert_eq!("test-amplemarket".parse::<ProbeTarget>().unwrap(), ProbeTarget::TestSource);
        assert_eq!(
            serde_json::from_value::<ProbeTarget>(json!("test-destination")).unwrap(),
            ProbeTarget::TestDestination
        );
        assert!("ping".parse::<ProbeTarget>().is_err());
    }
}
