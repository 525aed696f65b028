//! Paginated collection fetching
//!
//! Drains a collection endpoint into one `Vec` of raw JSON items. Two paging
//! protocols are supported:
//!
//! - **cursor**: `page_size` on every call, `page_after` taken from the
//!   previous response; stops when the response carries no cursor
//! - **offset**: `skip`/`limit`; stops on a short or empty page
//!
//! A non-success status anywhere aborts the whole walk; callers never see a
//! partial collection.

use leadsync_common::types::unit::scalar_to_string;
use leadsync_common::{Result, SyncError};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, instrument, trace};

/// How a request authenticates
#[derive(Clone)]
pub enum Auth {
    Bearer(String),
    /// Secret passed as a query parameter (e.g. `api_key`)
    QueryKey { name: &'static str, value: String },
    None,
}

impl Auth {
    pub(crate) fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        match self {
            Auth::Bearer(token) => builder.bearer_auth(token),
            Auth::QueryKey { name, value } => builder.query(&[(*name, value.as_str())]),
            Auth::None => builder,
        }
    }
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::Bearer(_) => f.write_str("Bearer(***)"),
            Auth::QueryKey { name, .. } => write!(f, "QueryKey({}=***)", name),
            Auth::None => f.write_str("None"),
        }
    }
}

/// The response shapes a collection may use
///
/// A bare JSON array is always accepted. An object is accepted when it wraps
/// the array under one of `keys`; the first key present wins.
#[derive(Debug, Clone, Copy)]
pub struct Envelope {
    keys: &'static [&'static str],
}

impl Envelope {
    pub const fn wrapped_under(keys: &'static [&'static str]) -> Self {
        Self { keys }
    }

    /// Split a response body into items and the next cursor
    pub fn page(&self, collection: &str, body: Value) -> Result<Page> {
        match body {
            Value::Array(items) => Ok(Page {
                items,
                next_cursor: None,
            }),
            Value::Object(mut map) => {
                let next_cursor = map.get("page_after").and_then(scalar_to_string);
                for key in self.keys {
                    if let Some(Value::Array(items)) = map.get_mut(*key).map(Value::take) {
                        return Ok(Page { items, next_cursor });
                    }
                }
                let found: Vec<&str> = map.keys().map(String::as_str).collect();
                Err(SyncError::schema_mismatch(
                    collection,
                    format!(
                        "expected an array under one of [{}], found keys [{}]",
                        self.keys.join(", "),
                        found.join(", ")
                    ),
                ))
            }
            other => Err(SyncError::schema_mismatch(
                collection,
                format!("expected an array or an object, got {}", json_kind(&other)),
            )),
        }
    }
}

/// One decoded page
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    pub next_cursor: Option<String>,
}

/// Paging protocol of a collection endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationStyle {
    Cursor { page_size: u32 },
    Offset { limit: u32 },
    /// One request returns the whole collection
    Single,
}

/// Base request for a collection endpoint
#[derive(Debug, Clone)]
pub struct CollectionRequest {
    /// Human-readable collection name used in errors and logs
    pub collection: String,
    pub url: String,
    pub auth: Auth,
    pub envelope: Envelope,
}

/// Status and body of a response, before interpretation
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Walks paginated collection endpoints
#[derive(Debug, Clone)]
pub struct PaginatedFetcher {
    client: Client,
}

impl PaginatedFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetch every item of a collection across all pages
    #[instrument(skip(self, request), fields(collection = %request.collection))]
    pub async fn fetch_all(
        &self,
        request: &CollectionRequest,
        style: PaginationStyle,
    ) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        let mut pages = 0usize;

        match style {
            PaginationStyle::Cursor { page_size } => {
                let mut cursor: Option<String> = None;
                let mut seen = HashSet::new();
                loop {
                    let mut query = vec![("page_size", page_size.to_string())];
                    if let Some(ref after) = cursor {
                        query.push(("page_after", after.clone()));
                    }

                    let page = self.fetch_page(request, &query).await?;
                    pages += 1;
                    items.extend(page.items);

                    match page.next_cursor {
                        Some(next) if !seen.insert(next.clone()) => {
                            return Err(SyncError::schema_mismatch(
                                &request.collection,
                                format!("pagination cursor '{}' was already visited", next),
                            ));
                        }
                        Some(next) => cursor = Some(next),
                        None => break,
                    }
                }
            }
            PaginationStyle::Offset { limit } => {
                let mut skip = 0usize;
                loop {
                    let query = [("skip", skip.to_string()), ("limit", limit.to_string())];

                    let page = self.fetch_page(request, &query).await?;
                    pages += 1;
                    let received = page.items.len();
                    items.extend(page.items);
                    skip += received;

                    if received == 0 || received < limit as usize {
                        break;
                    }
                }
            }
            PaginationStyle::Single => {
                let page = self.fetch_page(request, &[]).await?;
                pages += 1;
                items = page.items;
            }
        }

        debug!(items = items.len(), pages, "Collection fetched");
        Ok(items)
    }

    /// Fetch and decode one page
    pub async fn fetch_page(
        &self,
        request: &CollectionRequest,
        query: &[(&str, String)],
    ) -> Result<Page> {
        let response = self.get_raw(request, query).await?;

        if !response.status.is_success() {
            return Err(SyncError::fetch_failure(
                &request.collection,
                response.status.as_u16(),
                &response.body,
            ));
        }

        let body: Value = serde_json::from_str(&response.body).map_err(|e| {
            SyncError::schema_mismatch(&request.collection, format!("invalid JSON body: {}", e))
        })?;

        request.envelope.page(&request.collection, body)
    }

    /// Issue a GET and return the status and body without interpreting them
    pub async fn get_raw(
        &self,
        request: &CollectionRequest,
        query: &[(&str, String)],
    ) -> Result<RawResponse> {
        trace!(url = %request.url, ?query, "GET");

        let builder = self
            .client
            .get(&request.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query);

        let response = request
            .auth
            .apply(builder)
            .send()
            .await
            .map_err(|e| network_error(&request.collection, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| network_error(&request.collection, e))?;

        Ok(RawResponse { status, body })
    }
}

/// Wrap a transport failure; the URL is dropped since it may carry an API key
pub(crate) fn network_error(collection: &str, err: reqwest::Error) -> SyncError {
    SyncError::network(format!("{} request failed: {}", collection, err.without_url()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{header, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    const LISTS: Envelope = Envelope::wrapped_under(&["lead_lists", "items"]);

    fn request(server: &MockServer, route: &str) -> CollectionRequest {
        CollectionRequest {
            collection: "Test".to_string(),
            url: format!("{}{}", server.uri(), route),
            auth: Auth::Bearer("token-123".to_string()),
            envelope: LISTS,
        }
    }

    #[test]
    fn test_envelope_accepts_bare_array() {
        let page = LISTS.page("Test", json!([{"id": 1}])).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.next_cursor, None);
    }

    #[test]
    fn test_envelope_accepts_any_known_key() {
        let page = LISTS
            .page("Test", json!({"items": [{"id": 1}, {"id": 2}], "page_after": "c1"}))
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.next_cursor.as_deref(), Some("c1"));
    }

    #[test]
    fn test_envelope_rejects_unknown_shape() {
        let err = LISTS.page("Test", json!({"data": []})).unwrap_err();
        assert!(matches!(err, SyncError::SchemaMismatch { .. }));

        let err = LISTS.page("Test", json!("nope")).unwrap_err();
        assert!(err.to_string().contains("a string"));
    }

    #[test]
    fn test_empty_cursor_ends_pagination() {
        let page = LISTS.page("Test", json!({"lead_lists": [], "page_after": ""})).unwrap();
        assert_eq!(page.next_cursor, None);
    }

    #[tokio::test]
    async fn test_cursor_pagination_follows_page_after() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/lists"))
            .and(query_param("page_after", "c1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "lead_lists": [{"id": 3}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/lists"))
            .and(query_param("page_size", "2"))
            .and(header("authorization", "Bearer token-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "lead_lists": [{"id": 1}, {"id": 2}],
                "page_after": "c1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = PaginatedFetcher::new(Client::new());
        let items = fetcher
            .fetch_all(&request(&server, "/lists"), PaginationStyle::Cursor { page_size: 2 })
            .await
            .unwrap();

        let ids: Vec<i64> = items.iter().map(|i| i["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_offset_pagination_stops_on_short_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/campaigns"))
            .and(query_param("skip", "0"))
            .and(query_param("limit", "2"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"items": [{"id": 1}, {"id": 2}]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/campaigns"))
            .and(query_param("skip", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 3}])))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = PaginatedFetcher::new(Client::new());
        let items = fetcher
            .fetch_all(&request(&server, "/campaigns"), PaginationStyle::Offset { limit: 2 })
            .await
            .unwrap();

        assert_eq!(items.len(), 3);
    }

    #[tokio::test]
    async fn test_offset_pagination_stops_on_empty_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/campaigns"))
            .and(query_param("skip", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/campaigns"))
            .and(query_param("skip", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = PaginatedFetcher::new(Client::new());
        let items = fetcher
            .fetch_all(&request(&server, "/campaigns"), PaginationStyle::Offset { limit: 1 })
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_non_success_aborts_without_partial_results() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/lists"))
            .and(query_param("page_after", "c1"))
            .respond_with(ResponseTemplate::new(503).set_body_string("x".repeat(2000)))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/lists"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "lead_lists": [{"id": 1}],
                "page_after": "c1"
            })))
            .mount(&server)
            .await;

        let fetcher = PaginatedFetcher::new(Client::new());
        let err = fetcher
            .fetch_all(&request(&server, "/lists"), PaginationStyle::Cursor { page_size: 1 })
            .await
            .unwrap_err();

        match err {
            SyncError::FetchFailure { status, body, .. } => {
                assert_eq!(status, 503);
                assert_eq!(body.len(), 500);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_repeated_cursor_is_a_schema_mismatch() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/lists"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "lead_lists": [{"id": 1}],
                "page_after": "same"
            })))
            .mount(&server)
            .await;

        let fetcher = PaginatedFetcher::new(Client::new());
        let err = fetcher
            .fetch_all(&request(&server, "/lists"), PaginationStyle::Cursor { page_size: 1 })
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::SchemaMismatch { .. }));
    }

    #[tokio::test]
    async fn test_cursor_cycle_is_a_schema_mismatch() {
        let server = MockServer::start().await;

        for (after, next) in [("a", "b"), ("b", "a")] {
            Mock::given(method("GET"))
                .and(path("/lists"))
                .and(query_param("page_after", after))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "lead_lists": [{"id": after}],
                    "page_after": next
                })))
                .mount(&server)
                .await;
        }

        Mock::given(method("GET"))
            .and(path("/lists"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "lead_lists": [{"id": "start"}],
                "page_after": "a"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = PaginatedFetcher::new(Client::new());
        let err = fetcher
            .fetch_all(&request(&server, "/lists"), PaginationStyle::Cursor { page_size: 1 })
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::SchemaMismatch { .. }));
        // start, a, b; the second visit to a is refused
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_json_is_a_schema_mismatch() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/lists"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let fetcher = PaginatedFetcher::new(Client::new());
        let err = fetcher
            .fetch_all(&request(&server, "/lists"), PaginationStyle::Single)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::SchemaMismatch { .. }));
    }
}
