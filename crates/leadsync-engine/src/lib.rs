//! Leadsync Engine
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Copies leads from source lead lists into destination campaigns whose name
//! matches the list's name, case-insensitively.
//!
//! # Components
//!
//! - [`fetcher`]: drains cursor- and offset-paged collection endpoints
//! - [`source`] / [`destination`]: the two APIs behind traits
//! - [`tracker`]: remembers which lists were already synchronized
//! - [`matcher`]: campaign lookup by normalized name
//! - [`transform`]: field mapping with alias fallbacks
//! - [`writer`]: chunked lead writes
//! - [`orchestrator`]: the per-list state machine producing a [`RunReport`]
//! - [`probe`]: connectivity check against both APIs
//!
//! # Example
//!
//! ```no_run
//! use leadsync_engine::{Credentials, IdempotencyTracker, SyncConfig, SyncOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SyncConfig::from_env()?;
//!     let credentials = Credentials::resolve(None, None, None)?;
//!     let tracker = IdempotencyTracker::from_config(&config)?;
//!
//!     let report = SyncOrchestrator::from_config(&config, &credentials, tracker)?
//!         .run()
//!         .await?;
//!     println!("{} leads sent", report.total_leads);
//!     Ok(())
//! }
//! ```
//!
//! [`RunReport`]: leadsync_common::types::RunReport

pub mod config;
pub mod destination;
pub mod fetcher;
pub mod matcher;
pub mod orchestrator;
pub mod probe;
pub mod source;
pub mod tracker;
pub mod transform;
pub mod writer;

pub use config::{Credentials, MemberFetchMode, SyncConfig};
pub use orchestrator::SyncOrchestrator;
pub use probe::{ConnectivityProbe, ProbeReport, ProbeTarget};
pub use tracker::{IdempotencyTracker, KeyValueStore, SqliteStore};
