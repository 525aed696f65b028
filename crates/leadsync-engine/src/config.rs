//! Engine configuration and credentials

use leadsync_common::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Engine Configuration Constants
// ============================================================================

/// Default base URL of the source (lead list) API.
pub const DEFAULT_SOURCE_BASE_URL: &str = "https://api.amplemarket.com";

/// Default base URL of the destination (campaign) API.
pub const DEFAULT_DESTINATION_BASE_URL: &str = "https://api.instantly.ai";

/// Default page size for cursor-paged source collections.
pub const DEFAULT_SOURCE_PAGE_SIZE: u32 = 100;

/// Default page limit for offset-paged destination collections.
pub const DEFAULT_DESTINATION_PAGE_LIMIT: u32 = 100;

/// Largest number of leads the destination accepts in one write call.
pub const MAX_CHUNK_SIZE: usize = 1000;

/// Default retention of processed markers, in days.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Longest accepted retention of processed markers, in days.
pub const MAX_RETENTION_DAYS: i64 = 3650;

/// Default timeout applied by the HTTP client to every request.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Default provenance label written into `custom_variables.source`.
pub const DEFAULT_SOURCE_LABEL: &str = "amplemarket";

/// How a list's members are retrieved from the source API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberFetchMode {
    /// `GET /lead-lists/{id}/leads`, cursor paged
    #[default]
    Paginated,
    /// `GET /lead-lists/{id}`, members embedded under `leads`
    Embedded,
}

impl std::str::FromStr for MemberFetchMode {
    type Err = SyncError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "paginated" | "paged" => Ok(MemberFetchMode::Paginated),
            "embedded" | "single" => Ok(MemberFetchMode::Embedded),
            _ => Err(SyncError::config(format!("Invalid member fetch mode: {}", s))),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub source_base_url: String,
    pub destination_base_url: String,
    pub source_page_size: u32,
    pub destination_page_limit: u32,
    pub chunk_size: usize,
    pub retention_days: i64,
    pub member_fetch: MemberFetchMode,
    /// SQLite file holding processed markers; `None` disables deduplication
    pub store_path: Option<PathBuf>,
    pub http_timeout_secs: u64,
    pub source_label: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            source_base_url: DEFAULT_SOURCE_BASE_URL.to_string(),
            destination_base_url: DEFAULT_DESTINATION_BASE_URL.to_string(),
            source_page_size: DEFAULT_SOURCE_PAGE_SIZE,
            destination_page_limit: DEFAULT_DESTINATION_PAGE_LIMIT,
            chunk_size: MAX_CHUNK_SIZE,
            retention_days: DEFAULT_RETENTION_DAYS,
            member_fetch: MemberFetchMode::default(),
            store_path: None,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            source_label: DEFAULT_SOURCE_LABEL.to_string(),
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment and defaults
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = SyncConfig {
            source_base_url: std::env::var("LEADSYNC_SOURCE_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_SOURCE_BASE_URL.to_string()),
            destination_base_url: std::env::var("LEADSYNC_DESTINATION_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_DESTINATION_BASE_URL.to_string()),
            source_page_size: env_parse("LEADSYNC_SOURCE_PAGE_SIZE", DEFAULT_SOURCE_PAGE_SIZE),
            destination_page_limit: env_parse(
                "LEADSYNC_DESTINATION_PAGE_LIMIT",
                DEFAULT_DESTINATION_PAGE_LIMIT,
            ),
            chunk_size: env_parse("LEADSYNC_CHUNK_SIZE", MAX_CHUNK_SIZE),
            retention_days: env_parse("LEADSYNC_RETENTION_DAYS", DEFAULT_RETENTION_DAYS),
            member_fetch: match std::env::var("LEADSYNC_MEMBER_FETCH") {
                Ok(mode) => mode.parse()?,
                Err(_) => MemberFetchMode::default(),
            },
            store_path: std::env::var("LEADSYNC_STORE_PATH")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            http_timeout_secs: env_parse("LEADSYNC_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS),
            source_label: std::env::var("LEADSYNC_SOURCE_LABEL")
                .unwrap_or_else(|_| DEFAULT_SOURCE_LABEL.to_string()),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.source_base_url.is_empty() || self.destination_base_url.is_empty() {
            return Err(SyncError::config("API base URLs cannot be empty"));
        }

        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(SyncError::config(format!(
                "Chunk size must be between 1 and {} (got {})",
                MAX_CHUNK_SIZE, self.chunk_size
            )));
        }

        if self.source_page_size == 0 || self.destination_page_limit == 0 {
            return Err(SyncError::config("Page sizes must be greater than 0"));
        }

        if self.retention_days <= 0 || self.retention_days > MAX_RETENTION_DAYS {
            return Err(SyncError::config(format!(
                "Marker retention must be between 1 and {} days (got {})",
                MAX_RETENTION_DAYS, self.retention_days
            )));
        }

        Ok(())
    }

    /// Retention horizon of processed markers
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.retention_days)
    }

    /// Build the HTTP client shared by both API collaborators
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.http_timeout_secs))
            .user_agent(concat!("leadsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::config(format!("Failed to build HTTP client: {}", e)))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Credentials for both external APIs
#[derive(Clone)]
pub struct Credentials {
    pub source_token: String,
    pub destination_token: String,
    /// Key for the destination write API; falls back to `destination_token`
    pub destination_api_key: Option<String>,
}

impl Credentials {
    pub fn new(source_token: impl Into<String>, destination_token: impl Into<String>) -> Self {
        Self {
            source_token: source_token.into(),
            destination_token: destination_token.into(),
            destination_api_key: None,
        }
    }

    /// Combine request-supplied values with environment fallbacks
    ///
    /// Fallbacks: `LEADSYNC_SOURCE_TOKEN`, `LEADSYNC_DESTINATION_TOKEN`,
    /// `LEADSYNC_DESTINATION_API_KEY`. Empty strings count as missing.
    pub fn resolve(
        source_token: Option<String>,
        destination_token: Option<String>,
        destination_api_key: Option<String>,
    ) -> Result<Self> {
        let source_token = or_env(source_token, "LEADSYNC_SOURCE_TOKEN");
        let destination_token = or_env(destination_token, "LEADSYNC_DESTINATION_TOKEN");

        match (source_token, destination_token) {
            (Some(source_token), Some(destination_token)) => Ok(Self {
                source_token,
                destination_token,
                destination_api_key: or_env(destination_api_key, "LEADSYNC_DESTINATION_API_KEY"),
            }),
            _ => Err(SyncError::validation("Missing required tokens")),
        }
    }

    /// Key sent as `api_key` on destination writes
    pub fn write_api_key(&self) -> &str {
        self.destination_api_key
            .as_deref()
            .unwrap_or(&self.destination_token)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("source_token", &token_hint(&self.source_token))
            .field("destination_token", &token_hint(&self.destination_token))
            .field(
                "destination_api_key",
                &self.destination_api_key.as_deref().map(token_hint),
            )
            .finish()
    }
}

fn or_env(value: Option<String>, key: &str) -> Option<String> {
    value
        .filter(|v| !v.is_empty())
        .or_else(|| std::env::var(key).ok().filter(|v| !v.is_empty()))
}

/// First five characters of a secret followed by `...`
pub fn token_hint(token: &str) -> String {
    let prefix: String = token.chars().take(5).collect();
    format!("{}...", prefix)
}
