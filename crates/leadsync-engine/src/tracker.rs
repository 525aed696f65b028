//! Idempotency tracking
//!
//! A unit that was synchronized gets a marker `list_{id}` holding the RFC 3339
//! time of processing. Markers expire after the retention horizon, after which
//! the unit is eligible again.
//!
//! Check and mark are separate calls, so two overlapping runs can both see a
//! unit as unprocessed and both write it. Destination-side duplicate
//! suppression covers that case.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use leadsync_common::{Result, SyncError};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};

use crate::config::{SyncConfig, MAX_RETENTION_DAYS};

/// Expiry stamps are compared as text, so they must keep a four-digit year
const MAX_MARKER_TTL_SECS: u64 = MAX_RETENTION_DAYS as u64 * 86_400;

/// Key-value store with per-entry expiry
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Value under `key`, or `None` if absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    async fn put(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()>;
}

/// SQLite-backed [`KeyValueStore`]
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a store file
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SyncError::store(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let conn = Connection::open(path)
            .map_err(|e| SyncError::store(format!("Failed to open marker database: {}", e)))?;
        Self::with_connection(conn)
    }

    /// Create a store that lives only as long as the process
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SyncError::store(format!("Failed to create in-memory database: {}", e)))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS processed_markers (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_processed_markers_expires_at
            ON processed_markers(expires_at);
            "#,
        )
        .map_err(|e| SyncError::store(format!("Failed to initialize schema: {}", e)))?;

        debug!("Marker store schema initialized");
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| SyncError::store("Marker database lock poisoned"))
    }

    /// Delete every expired marker, returning how many were removed
    pub fn cleanup_expired(&self) -> Result<usize> {
        let now = Utc::now().to_rfc3339();
        let count = self
            .conn()?
            .execute(
                "DELETE FROM processed_markers WHERE expires_at < ?1",
                params![now],
            )
            .map_err(|e| SyncError::store(format!("Failed to purge markers: {}", e)))?;

        if count > 0 {
            info!(count, "Purged expired markers");
        }
        Ok(count)
    }

    /// Store an entry with an explicit expiry
    fn put_until(&self, key: &str, value: &str, expires_at: DateTime<Utc>) -> Result<()> {
        self.conn()?
            .execute(
                r#"
                INSERT OR REPLACE INTO processed_markers (key, value, created_at, expires_at)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![key, value, Utc::now().to_rfc3339(), expires_at.to_rfc3339()],
            )
            .map_err(|e| SyncError::store(format!("Failed to write marker {}: {}", key, e)))?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT value, expires_at FROM processed_markers WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| SyncError::store(format!("Failed to read marker {}: {}", key, e)))?;

        let Some((value, expires_at)) = row else {
            return Ok(None);
        };

        let expires_at: DateTime<Utc> = expires_at
            .parse()
            .map_err(|e| SyncError::store(format!("Invalid expiry on marker {}: {}", key, e)))?;

        if Utc::now() > expires_at {
            debug!(key, "Marker expired");
            conn.execute("DELETE FROM processed_markers WHERE key = ?1", params![key])
                .map_err(|e| SyncError::store(format!("Failed to delete marker {}: {}", key, e)))?;
            return Ok(None);
        }

        Ok(Some(value))
    }

    async fn put(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let ttl = ttl_seconds.min(MAX_MARKER_TTL_SECS);
        let expires_at = i64::try_from(ttl)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| SyncError::store(format!("Marker TTL out of range: {}s", ttl)))?;
        self.put_until(key, value, expires_at)
    }
}

/// Remembers which units were already synchronized
#[derive(Clone)]
pub struct IdempotencyTracker {
    store: Option<Arc<dyn KeyValueStore>>,
    retention: Duration,
}

impl IdempotencyTracker {
    pub fn new(store: Arc<dyn KeyValueStore>, retention: Duration) -> Self {
        Self {
            store: Some(store),
            retention,
        }
    }

    /// Open the configured marker store, or disable tracking when none is set
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        match &config.store_path {
            Some(path) => {
                info!(path = %path.display(), "Using marker store");
                Ok(Self::new(Arc::new(SqliteStore::open(path)?), config.retention()))
            }
            None => {
                warn!("No marker store configured; lists will be re-sent on every run");
                Ok(Self::disabled())
            }
        }
    }

    /// Tracker without a store: nothing is ever seen as processed
    pub fn disabled() -> Self {
        Self {
            store: None,
            retention: Duration::zero(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    fn key(unit_id: &str) -> String {
        format!("list_{}", unit_id)
    }

    /// When the unit was marked, if a live marker exists
    ///
    /// A marker whose value is not a timestamp still counts as processed; the
    /// time is then reported as unknown.
    #[instrument(skip(self))]
    pub async fn processed_at(&self, unit_id: &str) -> Result<Option<Option<DateTime<Utc>>>> {
        let Some(store) = &self.store else {
            return Ok(None);
        };

        let value = store.get(&Self::key(unit_id)).await?;
        Ok(value.map(|v| match DateTime::parse_from_rfc3339(&v) {
            Ok(at) => Some(at.with_timezone(&Utc)),
            Err(e) => {
                warn!(unit_id, value = %v, error = %e, "Marker value is not a timestamp");
                None
            }
        }))
    }

    pub async fn has_processed(&self, unit_id: &str) -> Result<bool> {
        Ok(self.processed_at(unit_id).await?.is_some())
    }

    /// Record that the unit was synchronized at `when`
    #[instrument(skip(self))]
    pub async fn mark_processed(&self, unit_id: &str, when: DateTime<Utc>) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };

        let ttl = u64::try_from(self.retention.num_seconds()).unwrap_or(0);
        store
            .put(&Self::key(unit_id), &when.to_rfc3339(), ttl)
            .await
    }
}

impl std::fmt::Debug for IdempotencyTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdempotencyTracker")
            .field("enabled", &self.is_enabled())
            .field("retention_days", &self.retention.num_days())
            .finish()
    }
}
